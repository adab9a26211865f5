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

//! # Kiln Infra
//!
//! Concrete implementations of the native contracts defined in `kiln-core`,
//! plus logging setup and monitors.

pub mod graphics;
pub mod telemetry;

use anyhow::{bail, Context, Result};
use kiln_core::graphics::{GraphicsBackendType, GraphicsDevice, GraphicsSettings};

#[cfg(feature = "headless")]
use graphics::headless::{HeadlessConfig, HeadlessDevice};
#[cfg(feature = "headless")]
use std::sync::Arc;

/// Creates a device for the backend named in `settings`.
pub fn create_device(settings: GraphicsSettings) -> Result<GraphicsDevice> {
    match settings.backend {
        #[cfg(feature = "headless")]
        GraphicsBackendType::Headless => {
            let (device, _) = create_headless_device(settings, HeadlessConfig::default())?;
            Ok(device)
        }
        other => bail!("The {other:?} backend is not available in this build"),
    }
}

/// Creates a device on a headless backend, returning a clone of the backend
/// for inspection.
#[cfg(feature = "headless")]
pub fn create_headless_device(
    settings: GraphicsSettings,
    config: HeadlessConfig,
) -> Result<(GraphicsDevice, HeadlessDevice)> {
    let native = HeadlessDevice::new(config);
    let device = GraphicsDevice::new(Arc::new(native.clone()), settings)
        .context("Failed to create the headless graphics device")?;
    Ok((device, native))
}
