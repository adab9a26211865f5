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

use std::sync::atomic::{AtomicI64, Ordering};

/// Device-owned VRAM counter.
///
/// Resources are created and destroyed from any thread, so both operations
/// are a single atomic add; the counter never goes through a lock.
#[derive(Debug, Default)]
pub struct VramCounter {
    current: AtomicI64,
    peak: AtomicI64,
}

impl VramCounter {
    /// A counter at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `bytes` and returns the new total.
    pub fn allocate(&self, bytes: u64) -> i64 {
        let delta = bytes as i64;
        let total = self.current.fetch_add(delta, Ordering::AcqRel) + delta;
        self.peak.fetch_max(total, Ordering::AcqRel);
        total
    }

    /// Subtracts `bytes` and returns the new total.
    pub fn deallocate(&self, bytes: u64) -> i64 {
        let delta = bytes as i64;
        self.current.fetch_sub(delta, Ordering::AcqRel) - delta
    }

    /// Current total. Can dip below zero only if deallocations outrun allocations.
    pub fn current(&self) -> i64 {
        self.current.load(Ordering::Acquire)
    }

    /// Highest total observed.
    pub fn peak(&self) -> i64 {
        self.peak.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::VramCounter;

    #[test]
    fn test_allocate_deallocate_and_peak() {
        let vram = VramCounter::new();
        assert_eq!(vram.allocate(1024), 1024);
        assert_eq!(vram.allocate(512), 1536);
        assert_eq!(vram.deallocate(1024), 512);
        assert_eq!(vram.current(), 512);
        assert_eq!(vram.peak(), 1536);
    }

    #[test]
    fn test_concurrent_updates_sum_exactly() {
        let vram = VramCounter::new();
        std::thread::scope(|scope| {
            for t in 0..8u64 {
                let vram = &vram;
                scope.spawn(move || {
                    for _ in 0..1000 {
                        vram.allocate(t + 1);
                        vram.deallocate(1);
                    }
                });
            }
        });
        // sum over t of 1000 * t
        assert_eq!(vram.current(), 1000 * (0..8).sum::<i64>());
    }
}
