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

//! VRAM monitor.
//!
//! Polls a device's VRAM counters through [`VramProvider`] without keeping
//! the device alive.

use kiln_core::telemetry::{VramProvider, VramReport};
use std::sync::Weak;

/// Watches the VRAM usage of one device.
#[derive(Debug)]
pub struct VramMonitor {
    /// Weak reference to the VRAM provider to avoid circular dependencies
    vram_provider: Weak<dyn VramProvider>,
    monitor_id: String,
}

impl VramMonitor {
    /// Create a new VRAM monitor
    pub fn new(vram_provider: Weak<dyn VramProvider>, monitor_id: impl Into<String>) -> Self {
        Self {
            vram_provider,
            monitor_id: monitor_id.into(),
        }
    }

    /// Name of the monitor.
    pub fn monitor_id(&self) -> &str {
        &self.monitor_id
    }

    /// `false` once the provider was dropped.
    pub fn is_alive(&self) -> bool {
        self.vram_provider.strong_count() > 0
    }

    /// Current counters, or an empty report once the provider is gone.
    pub fn report(&self) -> VramReport {
        self.vram_provider
            .upgrade()
            .map(|provider| provider.vram_report())
            .unwrap_or_default()
    }

    /// Logs the current counters at info level.
    pub fn log_report(&self) {
        let report = self.report();
        log::info!(
            "[{}] VRAM: {:.2} MB used, {:.2} MB peak",
            self.monitor_id,
            report.current_usage_mb(),
            report.peak_usage_mb()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    struct Fixed(VramReport);

    impl VramProvider for Fixed {
        fn vram_report(&self) -> VramReport {
            self.0
        }
    }

    #[test]
    fn test_report_is_empty_once_the_provider_is_dropped() {
        let report = VramReport {
            current_usage_bytes: 64,
            peak_usage_bytes: 128,
            total_capacity_bytes: None,
        };
        let provider: Arc<dyn VramProvider> = Arc::new(Fixed(report));
        let monitor = VramMonitor::new(Arc::downgrade(&provider), "gpu0");
        assert!(monitor.is_alive());
        assert_eq!(monitor.report(), report);

        drop(provider);
        assert!(!monitor.is_alive());
        assert_eq!(monitor.report(), VramReport::default());
    }
}
