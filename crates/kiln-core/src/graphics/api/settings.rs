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

//! Device configuration and reported device limits.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The native API a device runs on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GraphicsBackendType {
    /// In-memory reference backend.
    #[default]
    Headless,
    /// Direct3D 11.
    Dx11,
    /// Direct3D 12.
    Dx12,
    /// Vulkan.
    Vulkan,
}

/// Settings used when creating a [`GraphicsDevice`](crate::graphics::GraphicsDevice).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicsSettings {
    /// Initial VSync state of new swap-chain surfaces.
    pub vsync: bool,
    /// Back buffers per swap chain, and frames a command list is kept alive after execution.
    pub frame_buffer_size: u32,
    /// Forwarded to the backend. Also enables per-iteration debug events.
    pub enable_debug_layer: bool,
    /// The backend to create.
    pub backend: GraphicsBackendType,
    /// Cap on live deferred queues. `None` means unbounded.
    pub max_deferred_queues: Option<u32>,
}

impl GraphicsSettings {
    /// Smallest accepted frame buffer size.
    pub const MIN_FRAME_BUFFER_SIZE: u32 = 1;
    /// Largest accepted frame buffer size.
    pub const MAX_FRAME_BUFFER_SIZE: u32 = 8;

    /// Parses settings from JSON. Missing fields take their default value.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: GraphicsSettings =
            serde_json::from_str(json).context("Failed to parse graphics settings")?;
        Ok(settings.sanitized())
    }

    /// Loads settings from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read graphics settings from '{}'", path.display()))?;
        Self::from_json_str(&text)
    }

    /// Serializes the settings to pretty-printed JSON.
    pub fn to_json_string(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize graphics settings")
    }

    /// Copy of the settings with every value clamped into its accepted range.
    pub fn sanitized(mut self) -> Self {
        let clamped = self
            .frame_buffer_size
            .clamp(Self::MIN_FRAME_BUFFER_SIZE, Self::MAX_FRAME_BUFFER_SIZE);
        if clamped != self.frame_buffer_size {
            log::warn!(
                "frame_buffer_size {} out of range, clamped to {}",
                self.frame_buffer_size,
                clamped
            );
            self.frame_buffer_size = clamped;
        }
        self
    }
}

impl Default for GraphicsSettings {
    fn default() -> Self {
        Self {
            vsync: true,
            frame_buffer_size: 3,
            enable_debug_layer: false,
            backend: GraphicsBackendType::Headless,
            max_deferred_queues: None,
        }
    }
}

/// Limits reported by a native device. Slot-group sizes are derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GraphicsCapabilities {
    /// Constant-buffer slots per stage.
    pub max_constant_buffers: u32,
    /// Shader-resource slots per stage.
    pub max_shader_resources: u32,
    /// Sampler slots per stage.
    pub max_samplers: u32,
    /// Unordered-access slots (compute stage and output merger).
    pub max_unordered_access_slots: u32,
    /// Simultaneous render targets.
    pub max_render_targets: u32,
    /// Vertex-buffer slots.
    pub max_vertex_buffers: u32,
    /// Viewports and scissor rectangles.
    pub max_viewports: u32,
    /// Thread groups per dispatch dimension.
    pub max_compute_groups_per_dimension: u32,
}

impl Default for GraphicsCapabilities {
    fn default() -> Self {
        Self {
            max_constant_buffers: 14,
            max_shader_resources: 128,
            max_samplers: 16,
            max_unordered_access_slots: 8,
            max_render_targets: 8,
            max_vertex_buffers: 32,
            max_viewports: 16,
            max_compute_groups_per_dimension: 65535,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = GraphicsSettings::default();
        assert!(settings.vsync);
        assert_eq!(settings.frame_buffer_size, 3);
        assert_eq!(settings.backend, GraphicsBackendType::Headless);
        assert_eq!(settings.max_deferred_queues, None);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let settings =
            GraphicsSettings::from_json_str(r#"{ "vsync": false, "max_deferred_queues": 4 }"#)
                .unwrap();
        assert!(!settings.vsync);
        assert_eq!(settings.max_deferred_queues, Some(4));
        assert_eq!(settings.frame_buffer_size, 3);
    }

    #[test]
    fn test_frame_buffer_size_is_clamped() {
        let settings = GraphicsSettings::from_json_str(r#"{ "frame_buffer_size": 42 }"#).unwrap();
        assert_eq!(settings.frame_buffer_size, GraphicsSettings::MAX_FRAME_BUFFER_SIZE);

        let settings = GraphicsSettings::from_json_str(r#"{ "frame_buffer_size": 0 }"#).unwrap();
        assert_eq!(settings.frame_buffer_size, GraphicsSettings::MIN_FRAME_BUFFER_SIZE);
    }

    #[test]
    fn test_json_round_trip_and_invalid_input() {
        let original = GraphicsSettings {
            backend: GraphicsBackendType::Vulkan,
            enable_debug_layer: true,
            ..Default::default()
        };
        let json = original.to_json_string().unwrap();
        assert_eq!(GraphicsSettings::from_json_str(&json).unwrap(), original);

        assert!(GraphicsSettings::from_json_str("{ not json").is_err());
    }

    #[test]
    fn test_capability_defaults() {
        let caps = GraphicsCapabilities::default();
        assert_eq!(caps.max_constant_buffers, 14);
        assert_eq!(caps.max_shader_resources, 128);
        assert_eq!(caps.max_compute_groups_per_dimension, 65535);
    }
}
