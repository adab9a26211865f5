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

//! A thread-safe free-list of reusable objects.
//!
//! Per-frame objects (resource tasks, buffer segments) are acquired from an
//! [`ObjectPool`] and handed back once consumed, so steady-state frames do not
//! allocate. Objects are cleared when they are returned, never when they are
//! handed out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use super::lock;

/// An object that can live in an [`ObjectPool`].
pub trait Poolable: Default + Send {
    /// Resets every field to its pristine state.
    ///
    /// Heap buffers should be cleared rather than dropped so their capacity
    /// survives into the next use.
    fn clear_for_pool(&mut self);
}

/// A free-list of `T` guarded by a mutex.
pub struct ObjectPool<T: Poolable> {
    free: Mutex<Vec<T>>,
    created: AtomicUsize,
}

impl<T: Poolable> ObjectPool<T> {
    /// Creates an empty pool.
    pub fn new() -> Self {
        Self {
            free: Mutex::new(Vec::new()),
            created: AtomicUsize::new(0),
        }
    }

    /// Pops a pooled object or creates a new one when the pool is empty.
    pub fn acquire(&self) -> T {
        match lock(&self.free).pop() {
            Some(item) => item,
            None => {
                self.created.fetch_add(1, Ordering::Relaxed);
                T::default()
            }
        }
    }

    /// Clears `item` and pushes it back onto the free-list.
    pub fn release(&self, mut item: T) {
        item.clear_for_pool();
        lock(&self.free).push(item);
    }

    /// Number of objects currently waiting in the free-list.
    pub fn available(&self) -> usize {
        lock(&self.free).len()
    }

    /// Total number of objects this pool ever had to create.
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl<T: Poolable> Default for ObjectPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Poolable> std::fmt::Debug for ObjectPool<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectPool")
            .field("available", &self.available())
            .field("created", &self.created())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Scratch {
        label: Option<String>,
        data: Vec<u8>,
    }

    impl Poolable for Scratch {
        fn clear_for_pool(&mut self) {
            self.label = None;
            self.data.clear();
        }
    }

    #[test]
    fn test_acquire_creates_when_empty() {
        let pool = ObjectPool::<Scratch>::new();
        let _a = pool.acquire();
        let _b = pool.acquire();
        assert_eq!(pool.created(), 2);
        assert_eq!(pool.available(), 0);
    }

    #[test]
    fn test_release_clears_but_keeps_capacity() {
        let pool = ObjectPool::<Scratch>::new();
        let mut item = pool.acquire();
        item.label = Some("upload".to_string());
        item.data.extend_from_slice(&[1u8; 256]);
        pool.release(item);

        let reused = pool.acquire();
        assert!(reused.label.is_none());
        assert!(reused.data.is_empty());
        assert!(reused.data.capacity() >= 256);
        assert_eq!(pool.created(), 1, "The released object should be reused");
    }
}
