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

mod common;

use anyhow::Result;
use common::headless;
use kiln_core::graphics::{
    BufferType, GraphicsBackendType, GraphicsResourceFlags, GraphicsSettings,
};
use kiln_core::telemetry::VramProvider;
use kiln_infra::telemetry::{init_test_logging, VramMonitor};
use std::sync::Arc;

#[test]
fn test_create_device_from_settings() -> Result<()> {
    init_test_logging();
    let settings = GraphicsSettings::from_json_str(r#"{ "vsync": false, "frame_buffer_size": 12 }"#)?;
    let device = kiln_infra::create_device(settings)?;

    assert_eq!(device.backend_type(), GraphicsBackendType::Headless);
    assert_eq!(device.adapter_name(), "Kiln Headless Adapter");
    assert!(!device.settings().vsync);
    assert_eq!(
        device.settings().frame_buffer_size,
        GraphicsSettings::MAX_FRAME_BUFFER_SIZE
    );
    assert_eq!(device.capabilities().max_compute_groups_per_dimension, 65535);
    Ok(())
}

#[test]
fn test_unavailable_backend_is_an_error() {
    init_test_logging();
    let settings = GraphicsSettings {
        backend: GraphicsBackendType::Vulkan,
        ..GraphicsSettings::default()
    };
    let err = kiln_infra::create_device(settings).err().map(|e| e.to_string());
    assert_eq!(
        err.as_deref(),
        Some("The Vulkan backend is not available in this build")
    );
}

#[test]
fn test_vram_monitor_follows_the_device() -> Result<()> {
    let (device, _headless) = headless()?;
    let provider: Arc<dyn VramProvider> = Arc::new(device);
    let monitor = VramMonitor::new(Arc::downgrade(&provider), "main-device");
    assert_eq!(monitor.monitor_id(), "main-device");
    assert!(monitor.is_alive());
    assert_eq!(monitor.report().current_usage_bytes, 0);

    drop(provider);
    assert!(!monitor.is_alive());
    assert_eq!(monitor.report().peak_usage_bytes, 0);
    Ok(())
}

#[test]
fn test_vram_counts_live_resources() -> Result<()> {
    let (device, _headless) = headless()?;
    let device = Arc::new(device);
    let provider: Arc<dyn VramProvider> = device.clone();
    let monitor = VramMonitor::new(Arc::downgrade(&provider), "resources");

    let buffer = device.create_buffer(
        None,
        BufferType::Structured,
        16,
        64,
        GraphicsResourceFlags::GPU_READ,
        None,
    )?;
    assert_eq!(monitor.report().current_usage_bytes, 1024);

    drop(buffer);
    device.dispose_marked_objects();
    let report = monitor.report();
    assert_eq!(report.current_usage_bytes, 0);
    assert_eq!(report.peak_usage_bytes, 1024);
    monitor.log_report();
    Ok(())
}
