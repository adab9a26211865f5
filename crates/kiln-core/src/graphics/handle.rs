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

//! Opaque native handles and the generational arena backends store them in.
//!
//! A native object is never referenced by pointer. Backends hand out a
//! [`NativeId`] (slot index plus generation); releasing bumps the slot's
//! generation, so a second release of the same id, or any use after release,
//! is reported as [`ResourceError::StaleHandle`].

use super::error::ResourceError;

/// Index and generation of a slot in a [`HandleArena`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NativeId {
    /// Slot index.
    pub index: u32,
    /// Generation of the slot when the id was issued.
    pub generation: u32,
}

impl NativeId {
    fn stale(self) -> ResourceError {
        ResourceError::StaleHandle {
            index: self.index,
            generation: self.generation,
        }
    }
}

macro_rules! native_ids {
    ($($(#[$attr:meta])* $name:ident),* $(,)?) => {
        $(
            $(#[$attr])*
            #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
            pub struct $name(pub NativeId);

            impl From<NativeId> for $name {
                fn from(id: NativeId) -> Self {
                    Self(id)
                }
            }

            impl $name {
                /// The untyped arena id.
                pub fn raw(self) -> NativeId {
                    self.0
                }
            }
        )*
    };
}

native_ids! {
    /// A native buffer or texture.
    ResourceId,
    /// A native view (shader-resource, unordered-access, render-target or depth-stencil).
    ViewId,
    /// A native sampler.
    SamplerId,
    /// A native shader program of one stage.
    ShaderProgramId,
    /// A native blend, rasterizer or depth-stencil state object.
    StateObjectId,
    /// A native vertex input layout.
    InputLayoutId,
    /// A native swap chain.
    SwapChainId,
    /// A recorded native command list.
    CommandListId,
}

/// The native objects backing one buffer or texture.
///
/// The resource exclusively owns its handle and the handle exclusively owns
/// its views; releasing the handle releases every view with it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    /// The native resource.
    pub resource: ResourceId,
    /// Shader-resource view.
    pub srv: Option<ViewId>,
    /// Unordered-access view.
    pub uav: Option<ViewId>,
    /// Render-target view.
    pub rtv: Option<ViewId>,
    /// Writable depth-stencil view.
    pub dsv: Option<ViewId>,
    /// Read-only depth-stencil view.
    pub dsv_read_only: Option<ViewId>,
}

impl ResourceHandle {
    /// A handle without any view.
    pub fn bare(resource: ResourceId) -> Self {
        Self {
            resource,
            srv: None,
            uav: None,
            rtv: None,
            dsv: None,
            dsv_read_only: None,
        }
    }

    /// Every view owned by the handle.
    pub fn views(&self) -> impl Iterator<Item = ViewId> {
        [self.srv, self.uav, self.rtv, self.dsv, self.dsv_read_only]
            .into_iter()
            .flatten()
    }
}

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// A generational slot arena.
///
/// Freed slots are reused; each reuse starts a new generation so ids of the
/// previous occupant never resolve again.
pub struct HandleArena<T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
}

impl<T> HandleArena<T> {
    /// Creates an empty arena.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
        }
    }

    /// Stores `value` and returns its id.
    pub fn insert(&mut self, value: T) -> NativeId {
        self.len += 1;
        if let Some(index) = self.free.pop() {
            let slot = &mut self.slots[index as usize];
            slot.value = Some(value);
            return NativeId {
                index,
                generation: slot.generation,
            };
        }

        let index = self.slots.len() as u32;
        self.slots.push(Slot {
            generation: 0,
            value: Some(value),
        });
        NativeId {
            index,
            generation: 0,
        }
    }

    /// Returns the value behind `id`.
    pub fn get(&self, id: NativeId) -> Result<&T, ResourceError> {
        self.slots
            .get(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or_else(|| id.stale())
    }

    /// Returns the value behind `id` mutably.
    pub fn get_mut(&mut self, id: NativeId) -> Result<&mut T, ResourceError> {
        self.slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or_else(|| id.stale())
    }

    /// Removes and returns the value behind `id`.
    ///
    /// Removing the same id twice fails with [`ResourceError::StaleHandle`].
    pub fn remove(&mut self, id: NativeId) -> Result<T, ResourceError> {
        let slot = self
            .slots
            .get_mut(id.index as usize)
            .filter(|slot| slot.generation == id.generation && slot.value.is_some())
            .ok_or_else(|| id.stale())?;

        let value = slot.value.take().ok_or_else(|| id.stale())?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index);
        self.len -= 1;
        Ok(value)
    }

    /// `true` if `id` refers to a live value.
    pub fn contains(&self, id: NativeId) -> bool {
        self.get(id).is_ok()
    }

    /// Number of live values.
    pub fn len(&self) -> usize {
        self.len
    }

    /// `true` when no value is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Iterates over live values with their ids.
    pub fn iter(&self) -> impl Iterator<Item = (NativeId, &T)> {
        self.slots.iter().enumerate().filter_map(|(index, slot)| {
            slot.value.as_ref().map(|value| {
                (
                    NativeId {
                        index: index as u32,
                        generation: slot.generation,
                    },
                    value,
                )
            })
        })
    }
}

impl<T> Default for HandleArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut arena = HandleArena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert_eq!(arena.get(a), Ok(&"a"));
        assert_eq!(arena.get(b), Ok(&"b"));
        assert_eq!(arena.len(), 2);
    }

    #[test]
    fn test_double_release_is_detected() {
        let mut arena = HandleArena::new();
        let id = arena.insert(42u32);
        assert_eq!(arena.remove(id), Ok(42));
        assert_eq!(
            arena.remove(id),
            Err(ResourceError::StaleHandle {
                index: id.index,
                generation: id.generation
            })
        );
        assert!(arena.is_empty());
    }

    #[test]
    fn test_reused_slot_rejects_old_id() {
        let mut arena = HandleArena::new();
        let old = arena.insert(1u8);
        arena.remove(old).unwrap();
        let new = arena.insert(2u8);

        assert_eq!(new.index, old.index, "The freed slot should be reused");
        assert_ne!(new.generation, old.generation);
        assert!(arena.get(old).is_err());
        assert_eq!(arena.get(new), Ok(&2));
    }

    #[test]
    fn test_get_mut_and_iter() {
        let mut arena = HandleArena::new();
        let id = arena.insert(vec![0u8; 4]);
        arena.get_mut(id).unwrap()[1] = 9;
        let all: Vec<_> = arena.iter().collect();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].0, id);
        assert_eq!(all[0].1[1], 9);
    }

    #[test]
    fn test_handle_views() {
        let mut arena = HandleArena::new();
        let resource = ResourceId(arena.insert(()));
        let mut handle = ResourceHandle::bare(resource);
        assert_eq!(handle.views().count(), 0);
        handle.srv = Some(ViewId(arena.insert(())));
        handle.dsv = Some(ViewId(arena.insert(())));
        assert_eq!(handle.views().count(), 2);
    }
}
