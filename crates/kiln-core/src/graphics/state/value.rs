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

//! Dirty-tracked binding slots.
//!
//! Every slot holds a *requested* value, staged by the caller without side
//! effects, and a *bound* value mirroring what was last sent to the native
//! API. A native bind call is only issued when the two differ, and a group of
//! slots collapses every difference into one contiguous range so the binder
//! can emit a single ranged call.

use std::ops::{Index, IndexMut, Range};

/// A single requested/bound pair.
#[derive(Debug, Clone, Default)]
pub struct StateValue<T> {
    requested: T,
    bound: T,
}

impl<T: Clone + PartialEq + Default> StateValue<T> {
    /// A slot with both values at their default.
    pub fn new() -> Self {
        Self {
            requested: T::default(),
            bound: T::default(),
        }
    }

    /// Stages `value` for the next [`bind`](Self::bind).
    pub fn set(&mut self, value: T) {
        self.requested = value;
    }

    /// The staged value.
    pub fn requested(&self) -> &T {
        &self.requested
    }

    /// The value last sent to the native API.
    pub fn bound(&self) -> &T {
        &self.bound
    }

    /// Copies the staged value into the bound value. Returns `true` if it changed.
    pub fn bind(&mut self) -> bool {
        if self.requested == self.bound {
            return false;
        }
        self.bound = self.requested.clone();
        true
    }

    /// Resets the staged value, leaving the bound value untouched.
    pub fn reset(&mut self) {
        self.requested = T::default();
    }

    /// Forgets what was bound, so the next bind of a non-default value is reported as a change.
    pub fn invalidate(&mut self) {
        self.bound = T::default();
    }
}

/// A fixed-size array of dirty-tracked slots.
#[derive(Debug, Clone)]
pub struct StateValueGroup<T> {
    requested: Vec<T>,
    bound: Vec<T>,
    first_changed: usize,
    num_changed: usize,
}

impl<T: Clone + PartialEq + Default> StateValueGroup<T> {
    /// A group of `len` slots, all at their default.
    pub fn new(len: usize) -> Self {
        Self {
            requested: vec![T::default(); len],
            bound: vec![T::default(); len],
            first_changed: 0,
            num_changed: 0,
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.requested.len()
    }

    /// `true` for a zero-sized group.
    pub fn is_empty(&self) -> bool {
        self.requested.is_empty()
    }

    /// Stages `value` at `index`. Returns `false` if `index` is out of range.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.requested.get_mut(index) {
            Some(slot) => {
                *slot = value;
                true
            }
            None => false,
        }
    }

    /// Compares every staged slot against its bound value.
    ///
    /// When any slot differs, all staged values become bound, the tight
    /// range spanning the differing slots is recorded and `true` is returned.
    /// Otherwise nothing changes and `false` is returned.
    pub fn bind(&mut self) -> bool {
        let mut first = None;
        let mut last = 0;
        for (i, (requested, bound)) in self.requested.iter().zip(self.bound.iter_mut()).enumerate()
        {
            if requested != bound {
                first.get_or_insert(i);
                last = i;
                *bound = requested.clone();
            }
        }

        match first {
            Some(first) => {
                self.first_changed = first;
                self.num_changed = last - first + 1;
                true
            }
            None => {
                self.num_changed = 0;
                false
            }
        }
    }

    /// Clears every staged slot to its default. Bound values are untouched.
    pub fn reset(&mut self) {
        self.requested.fill(T::default());
    }

    /// Forgets every bound value.
    pub fn invalidate(&mut self) {
        self.bound.fill(T::default());
        self.num_changed = 0;
    }

    /// First slot of the range reported by the last successful [`bind`](Self::bind).
    pub fn first_changed(&self) -> usize {
        self.first_changed
    }

    /// Length of the range reported by the last [`bind`](Self::bind). Zero when nothing changed.
    pub fn num_changed(&self) -> usize {
        self.num_changed
    }

    /// The changed range as slot indices.
    pub fn changed_range(&self) -> Range<usize> {
        self.first_changed..self.first_changed + self.num_changed
    }

    /// Bound values of the changed range, ready for a ranged native call.
    pub fn changed_values(&self) -> &[T] {
        &self.bound[self.changed_range()]
    }

    /// Every bound value.
    pub fn bound_values(&self) -> &[T] {
        &self.bound
    }

    /// The bound value at `index`.
    pub fn bound(&self, index: usize) -> Option<&T> {
        self.bound.get(index)
    }
}

impl<T> Index<usize> for StateValueGroup<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.requested[index]
    }
}

impl<T> IndexMut<usize> for StateValueGroup<T> {
    fn index_mut(&mut self, index: usize) -> &mut T {
        &mut self.requested[index]
    }
}

/// A fixed-function array (viewports, scissor rectangles) tracked by a single dirty flag.
///
/// These are set rarely and read on every pass, so a flag is cheaper than a
/// full comparison.
#[derive(Debug, Clone)]
pub struct DirtyArray<T> {
    items: Vec<T>,
    active: usize,
    dirty: bool,
}

impl<T: Clone + Default> DirtyArray<T> {
    /// An array of `capacity` default items, none of them active.
    pub fn new(capacity: usize) -> Self {
        Self {
            items: vec![T::default(); capacity],
            active: 0,
            dirty: false,
        }
    }

    /// Replaces the active items. Extra values beyond capacity are ignored.
    pub fn set_all(&mut self, values: &[T]) {
        let count = values.len().min(self.items.len());
        self.items[..count].clone_from_slice(&values[..count]);
        for item in &mut self.items[count..] {
            *item = T::default();
        }
        self.active = count;
        self.dirty = true;
    }

    /// Replaces one item, growing the active range to include it.
    pub fn set(&mut self, index: usize, value: T) -> bool {
        match self.items.get_mut(index) {
            Some(item) => {
                *item = value;
                self.active = self.active.max(index + 1);
                self.dirty = true;
                true
            }
            None => false,
        }
    }

    /// The active items.
    pub fn items(&self) -> &[T] {
        &self.items[..self.active]
    }

    /// Whether the items changed since the last [`clear_dirty`](Self::clear_dirty).
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Flags the items as applied.
    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }

    /// Forces the items to be re-applied.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    /// Maximum number of items.
    pub fn capacity(&self) -> usize {
        self.items.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_value_binds_only_on_change() {
        let mut value = StateValue::<Option<u32>>::new();
        value.set(Some(3));
        assert!(value.bind());
        value.set(Some(3));
        assert!(!value.bind(), "Same value twice must not report a change");
        value.reset();
        assert_eq!(value.bound(), &Some(3), "Reset must not touch the bound value");
        assert!(value.bind());
        assert_eq!(value.bound(), &None);
    }

    #[test]
    fn test_same_values_twice_report_no_change() {
        let mut group = StateValueGroup::<Option<u32>>::new(8);
        group[2] = Some(10);
        group[5] = Some(11);
        assert!(group.bind());

        group.reset();
        group[2] = Some(10);
        group[5] = Some(11);
        assert!(!group.bind());
        assert_eq!(group.num_changed(), 0);
    }

    #[test]
    fn test_changed_range_is_tight() {
        let mut group = StateValueGroup::<Option<u32>>::new(16);
        group[3] = Some(1);
        group[9] = Some(2);
        assert!(group.bind());
        assert_eq!(group.first_changed(), 3);
        assert_eq!(group.num_changed(), 7);
        assert_eq!(group.changed_values().len(), 7);
        assert_eq!(group.changed_values()[0], Some(1));
        assert_eq!(group.changed_values()[6], Some(2));
    }

    #[test]
    fn test_single_mutation_range_covers_index_only() {
        for len in [1usize, 2, 7, 14, 128] {
            for index in [0, len / 2, len - 1] {
                let mut group = StateValueGroup::<Option<usize>>::new(len);
                for i in 0..len {
                    group[i] = Some(i);
                }
                group.bind();

                group[index] = None;
                assert!(group.bind());
                assert_eq!(group.changed_range(), index..index + 1);
            }
        }
    }

    #[test]
    fn test_reset_then_bind_unbinds_everything() {
        let mut group = StateValueGroup::<Option<u32>>::new(4);
        group[0] = Some(1);
        group[3] = Some(2);
        group.bind();

        group.reset();
        assert_eq!(group.bound_values()[3], Some(2));
        assert!(group.bind());
        assert_eq!(group.changed_range(), 0..4);
        assert!(group.bound_values().iter().all(Option::is_none));
    }

    #[test]
    fn test_out_of_range_set_is_rejected() {
        let mut group = StateValueGroup::<Option<u32>>::new(2);
        assert!(group.set(1, Some(5)));
        assert!(!group.set(2, Some(5)));
    }

    #[test]
    fn test_invalidate_forces_rebind() {
        let mut group = StateValueGroup::<Option<u32>>::new(2);
        group[1] = Some(5);
        group.bind();
        group.invalidate();
        assert!(group.bind());
        assert_eq!(group.changed_range(), 1..2);
    }

    #[test]
    fn test_dirty_array() {
        let mut viewports = DirtyArray::<u32>::new(4);
        assert!(!viewports.is_dirty());
        assert!(viewports.items().is_empty());

        viewports.set_all(&[1, 2]);
        assert!(viewports.is_dirty());
        assert_eq!(viewports.items(), &[1, 2]);
        viewports.clear_dirty();

        viewports.set(3, 9);
        assert!(viewports.is_dirty());
        assert_eq!(viewports.items(), &[1, 2, 0, 9]);
        assert!(!viewports.set(4, 1));

        viewports.set_all(&[7, 7, 7, 7, 7, 7]);
        assert_eq!(viewports.items().len(), 4);
    }
}
