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

#![allow(dead_code)]

use anyhow::Result;
use kiln_core::graphics::{
    BindType, GraphicsDevice, GraphicsSettings, PrimitiveTopology, Shader, ShaderDescriptor,
    ShaderPassBuilder, ShaderStageDescriptor, ShaderStageType,
};
use kiln_infra::graphics::headless::{HeadlessConfig, HeadlessDevice};
use kiln_infra::telemetry::init_test_logging;
use std::sync::Arc;

/// A device on the headless backend with default settings.
pub fn headless() -> Result<(GraphicsDevice, HeadlessDevice)> {
    headless_with(GraphicsSettings::default())
}

pub fn headless_with(settings: GraphicsSettings) -> Result<(GraphicsDevice, HeadlessDevice)> {
    init_test_logging();
    kiln_infra::create_headless_device(settings, HeadlessConfig::default())
}

/// Stand-in bytecode; the headless backend only rejects empty programs.
pub fn bytecode() -> Vec<u8> {
    vec![0x44, 0x58, 0x42, 0x43]
}

pub fn vertex_stage() -> ShaderStageDescriptor {
    ShaderStageDescriptor::new(ShaderStageType::Vertex, bytecode())
        .bind(0, BindType::ConstantBuffer, "camera")
}

pub fn pixel_stage() -> ShaderStageDescriptor {
    ShaderStageDescriptor::new(ShaderStageType::Pixel, bytecode())
        .bind(0, BindType::Resource, "albedo")
        .bind(0, BindType::Sampler, "linear")
}

/// One triangle-list pass with a vertex stage reading `camera` and a pixel
/// stage sampling `albedo` through `linear`.
pub fn textured_shader(device: &GraphicsDevice) -> Result<Arc<Shader>> {
    let pass = ShaderPassBuilder::new("main")
        .stage(vertex_stage())
        .stage(pixel_stage())
        .topology(PrimitiveTopology::TriangleList)
        .build();
    Ok(device.create_shader(ShaderDescriptor::new("textured", vec![pass]))?)
}

/// A triangle-list pass with a vertex stage only.
pub fn depth_only_shader(device: &GraphicsDevice) -> Result<Arc<Shader>> {
    let pass = ShaderPassBuilder::new("depth")
        .stage(vertex_stage())
        .topology(PrimitiveTopology::TriangleList)
        .build();
    Ok(device.create_shader(ShaderDescriptor::new("depth-only", vec![pass]))?)
}
