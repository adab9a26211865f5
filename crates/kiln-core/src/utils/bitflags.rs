// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Declares flag sets used across the graphics API (resource access, command lists).

/// Declares a flag-set newtype over an unsigned integer.
///
/// Every declared constant becomes an associated constant of the type. `ALL`
/// is the union of the declared constants and `from_bits_truncate` drops any
/// bit outside of it, so a flag set built from untrusted bits only ever holds
/// known flags.
#[macro_export]
#[doc(hidden)]
macro_rules! kiln_bitflags {
    (
        $(#[$attr:meta])*
        $vis:vis struct $name:ident: $ty:ty {
            $(
                $(#[$flag_attr:meta])*
                const $flag_name:ident = $flag_value:expr;
            )*
        }
    ) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        $vis struct $name {
            bits: $ty,
        }

        impl $name {
            /// No flags set.
            pub const EMPTY: Self = Self { bits: 0 };

            $(
                $(#[$flag_attr])*
                pub const $flag_name: Self = Self { bits: $flag_value };
            )*

            /// Every declared flag.
            pub const ALL: Self = Self { bits: 0 $(| $flag_value)* };

            /// Builds a flag set from raw bits, discarding undeclared bits.
            pub const fn from_bits_truncate(bits: $ty) -> Self {
                Self { bits: bits & Self::ALL.bits }
            }

            /// Raw bit value.
            pub const fn bits(&self) -> $ty {
                self.bits
            }

            /// `true` when no flag is set.
            pub const fn is_empty(&self) -> bool {
                self.bits == 0
            }

            /// `true` if every flag of `other` is set in `self`.
            pub const fn contains(&self, other: Self) -> bool {
                (self.bits & other.bits) == other.bits
            }

            /// `true` if at least one flag of `other` is set in `self`.
            pub const fn intersects(&self, other: Self) -> bool {
                (self.bits & other.bits) != 0
            }

            /// Sets the flags of `other`.
            pub fn insert(&mut self, other: Self) {
                self.bits |= other.bits;
            }

            /// Clears the flags of `other`.
            pub fn remove(&mut self, other: Self) {
                self.bits &= !other.bits;
            }

            /// Sets or clears the flags of `other` depending on `value`.
            pub fn set(&mut self, other: Self, value: bool) {
                if value {
                    self.insert(other);
                } else {
                    self.remove(other);
                }
            }

            /// Copy of `self` with `other` set.
            #[must_use]
            pub const fn with(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }

            /// Copy of `self` with `other` cleared.
            #[must_use]
            pub const fn without(self, other: Self) -> Self {
                Self { bits: self.bits & !other.bits }
            }
        }

        impl core::ops::BitOr for $name {
            type Output = Self;
            fn bitor(self, other: Self) -> Self {
                Self { bits: self.bits | other.bits }
            }
        }

        impl core::ops::BitAnd for $name {
            type Output = Self;
            fn bitand(self, other: Self) -> Self {
                Self { bits: self.bits & other.bits }
            }
        }

        impl core::ops::BitOrAssign for $name {
            fn bitor_assign(&mut self, other: Self) {
                self.bits |= other.bits;
            }
        }

        impl core::ops::BitAndAssign for $name {
            fn bitand_assign(&mut self, other: Self) {
                self.bits &= other.bits;
            }
        }

        impl core::ops::Not for $name {
            type Output = Self;
            fn not(self) -> Self {
                Self { bits: !self.bits & Self::ALL.bits }
            }
        }

        impl core::fmt::Debug for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                if self.bits == 0 {
                    return write!(f, "{}(EMPTY)", stringify!($name));
                }

                write!(f, "{}(", stringify!($name))?;
                let mut first = true;
                $(
                    let flag: $ty = $flag_value;
                    if flag != 0 && (self.bits & flag) == flag {
                        if !first {
                            write!(f, " | ")?;
                        }
                        write!(f, "{}", stringify!($flag_name))?;
                        first = false;
                    }
                )*
                let _ = first;
                write!(f, ")")
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::kiln_bitflags;

    kiln_bitflags! {
        /// Access flags used only by these tests.
        pub struct AccessFlags: u32 {
            const READ = 1 << 0;
            const WRITE = 1 << 1;
            const EXECUTE = 1 << 2;
        }
    }

    #[test]
    fn test_empty_and_default() {
        assert!(AccessFlags::EMPTY.is_empty());
        assert_eq!(AccessFlags::default(), AccessFlags::EMPTY);
        assert_eq!(format!("{:?}", AccessFlags::EMPTY), "AccessFlags(EMPTY)");
    }

    #[test]
    fn test_all_is_union_of_declared_flags() {
        assert_eq!(AccessFlags::ALL.bits(), 0b111);
        assert!(AccessFlags::ALL.contains(AccessFlags::READ | AccessFlags::EXECUTE));
    }

    #[test]
    fn test_from_bits_truncate_discards_unknown_bits() {
        let flags = AccessFlags::from_bits_truncate(0b1_0011);
        assert_eq!(flags.bits(), 0b011);
        assert_eq!(format!("{:?}", flags), "AccessFlags(READ | WRITE)");
    }

    #[test]
    fn test_contains_and_intersects() {
        let rw = AccessFlags::READ | AccessFlags::WRITE;
        assert!(rw.contains(AccessFlags::READ));
        assert!(!rw.contains(AccessFlags::READ | AccessFlags::EXECUTE));
        assert!(rw.intersects(AccessFlags::READ | AccessFlags::EXECUTE));
        assert!(!rw.intersects(AccessFlags::EXECUTE));
    }

    #[test]
    fn test_insert_remove_set() {
        let mut flags = AccessFlags::READ;
        flags.insert(AccessFlags::WRITE);
        assert!(flags.contains(AccessFlags::WRITE));
        flags.remove(AccessFlags::READ);
        assert_eq!(flags, AccessFlags::WRITE);
        flags.set(AccessFlags::EXECUTE, true);
        flags.set(AccessFlags::WRITE, false);
        assert_eq!(flags, AccessFlags::EXECUTE);
    }

    #[test]
    fn test_with_and_without_leave_original_untouched() {
        let base = AccessFlags::READ;
        let extended = base.with(AccessFlags::WRITE);
        assert_eq!(base, AccessFlags::READ);
        assert_eq!(extended.without(AccessFlags::READ), AccessFlags::WRITE);
    }

    #[test]
    fn test_not_stays_within_declared_flags() {
        assert_eq!(!AccessFlags::READ, AccessFlags::WRITE | AccessFlags::EXECUTE);
        assert_eq!(!AccessFlags::ALL, AccessFlags::EMPTY);
    }
}
