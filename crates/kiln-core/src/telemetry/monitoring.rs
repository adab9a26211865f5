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

//! Polled snapshots of GPU memory usage.

const BYTES_PER_MB: f32 = 1024.0 * 1024.0;

/// A report of Video RAM (VRAM) usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VramReport {
    /// Bytes currently allocated by live resources.
    pub current_usage_bytes: u64,
    /// Highest value `current_usage_bytes` ever reached.
    pub peak_usage_bytes: u64,
    /// Physical capacity, when the backend knows it.
    pub total_capacity_bytes: Option<u64>,
}

impl VramReport {
    /// Current usage in megabytes.
    pub fn current_usage_mb(&self) -> f32 {
        self.current_usage_bytes as f32 / BYTES_PER_MB
    }

    /// Peak usage in megabytes.
    pub fn peak_usage_mb(&self) -> f32 {
        self.peak_usage_bytes as f32 / BYTES_PER_MB
    }
}

/// A trait for types that can provide VRAM usage statistics.
pub trait VramProvider: Send + Sync {
    /// Returns a snapshot of the VRAM counters.
    fn vram_report(&self) -> VramReport;

    /// Returns the current VRAM usage in megabytes.
    fn get_vram_usage_mb(&self) -> f32 {
        self.vram_report().current_usage_mb()
    }

    /// Returns the peak VRAM usage in megabytes.
    fn get_vram_peak_mb(&self) -> f32 {
        self.vram_report().peak_usage_mb()
    }

    /// Returns the total VRAM capacity in megabytes, if available.
    fn get_vram_capacity_mb(&self) -> Option<f32> {
        self.vram_report()
            .total_capacity_bytes
            .map(|bytes| bytes as f32 / BYTES_PER_MB)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed(VramReport);

    impl VramProvider for Fixed {
        fn vram_report(&self) -> VramReport {
            self.0
        }
    }

    #[test]
    fn test_megabyte_conversions() {
        let provider = Fixed(VramReport {
            current_usage_bytes: 2 * 1024 * 1024,
            peak_usage_bytes: 3 * 1024 * 1024,
            total_capacity_bytes: None,
        });
        assert_eq!(provider.get_vram_usage_mb(), 2.0);
        assert_eq!(provider.get_vram_peak_mb(), 3.0);
        assert_eq!(provider.get_vram_capacity_mb(), None);
    }
}
