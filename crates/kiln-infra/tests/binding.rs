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
use common::{bytecode, depth_only_shader, headless, textured_shader};
use kiln_core::graphics::{
    BindType, CommandListFlags, GraphicsBindResult, GraphicsDevice, GraphicsFormat,
    GraphicsResource, GraphicsResourceFlags, PrimitiveTopology, SamplerDescriptor,
    ShaderDescriptor, ShaderPassBuilder, ShaderStageDescriptor, ShaderStageType,
    TextureDimensions, TextureKind,
};
use kiln_infra::graphics::headless::NativeCall;
use std::sync::Arc;

fn texture(device: &GraphicsDevice, label: &str) -> Result<Arc<GraphicsResource>> {
    Ok(device.create_texture(
        Some(label),
        TextureKind::Texture2D,
        TextureDimensions::new_2d(4, 4),
        GraphicsFormat::R8G8B8A8Unorm,
        GraphicsResourceFlags::EMPTY,
        None,
    )?)
}

#[test]
fn test_first_draw_binds_every_declared_input() -> Result<()> {
    let (device, headless) = headless()?;
    let shader = textured_shader(&device)?;
    let camera = device.create_constant_buffer(Some("camera"), 64, GraphicsResourceFlags::CPU_WRITE)?;
    let albedo = texture(&device, "albedo")?;
    let sampler = device.create_sampler(SamplerDescriptor::default())?;
    shader.set_resource("camera", Some(camera.clone()));
    shader.set_resource("albedo", Some(albedo.clone()));
    shader.set_sampler("linear", Some(sampler.clone()));

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    headless.call_log().clear();

    assert_eq!(queue.draw(&shader, 3, 0)?, GraphicsBindResult::Successful);

    let calls = headless.call_log().calls();
    assert_eq!(calls.iter().filter(|c| c.is_stage_bind()).count(), 5);
    assert!(calls.contains(&NativeCall::SetConstantBuffers {
        stage: ShaderStageType::Vertex,
        start_slot: 0,
        buffers: vec![Some(camera.handle()?.resource)],
    }));
    assert!(calls.contains(&NativeCall::SetShaderResources {
        stage: ShaderStageType::Pixel,
        start_slot: 0,
        views: vec![albedo.handle()?.srv],
    }));
    assert!(calls.contains(&NativeCall::SetSamplers {
        stage: ShaderStageType::Pixel,
        start_slot: 0,
        samplers: vec![Some(sampler.id())],
    }));
    assert!(calls.contains(&NativeCall::SetPrimitiveTopology(PrimitiveTopology::TriangleList)));
    assert_eq!(queue.stats().stage_bind_calls(), 5);
    assert_eq!(queue.stats().draw_calls, 1);
    Ok(())
}

#[test]
fn test_redrawing_the_same_pass_binds_nothing() -> Result<()> {
    let (device, headless) = headless()?;
    let shader = textured_shader(&device)?;
    shader.set_resource("albedo", Some(texture(&device, "albedo")?));
    shader.set_sampler("linear", Some(device.create_sampler(SamplerDescriptor::default())?));

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    queue.draw(&shader, 3, 0)?;
    headless.call_log().clear();

    assert_eq!(queue.draw(&shader, 3, 0)?, GraphicsBindResult::Successful);

    let log = headless.call_log();
    assert_eq!(log.count(NativeCall::is_stage_bind), 0);
    assert_eq!(log.count(NativeCall::is_draw), 1);
    assert_eq!(
        log.count(|c| matches!(c, NativeCall::SetPrimitiveTopology(_))),
        0,
        "Topology is unchanged"
    );
    Ok(())
}

#[test]
fn test_stage_missing_from_the_next_pass_is_unbound() -> Result<()> {
    let (device, headless) = headless()?;
    let textured = textured_shader(&device)?;
    let depth_only = depth_only_shader(&device)?;
    textured.set_resource("albedo", Some(texture(&device, "albedo")?));

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    queue.draw(&textured, 3, 0)?;
    assert!(!queue.stage(ShaderStageType::Pixel).is_unbound());
    headless.call_log().clear();

    queue.draw(&depth_only, 3, 0)?;

    assert!(queue.stage(ShaderStageType::Pixel).is_unbound());
    let calls = headless.call_log().calls();
    assert!(calls.contains(&NativeCall::SetShader {
        stage: ShaderStageType::Pixel,
        program: None,
    }));
    assert!(calls.contains(&NativeCall::SetShaderResources {
        stage: ShaderStageType::Pixel,
        start_slot: 0,
        views: vec![None],
    }));
    // Each shader owns its own vertex program.
    assert!(calls
        .iter()
        .any(|c| matches!(c, NativeCall::SetShader { stage: ShaderStageType::Vertex, program: Some(_) })));
    Ok(())
}

#[test]
fn test_changed_slot_range_is_tight() -> Result<()> {
    let (device, headless) = headless()?;
    let pass = ShaderPassBuilder::new("main")
        .stage(ShaderStageDescriptor::new(ShaderStageType::Vertex, bytecode()))
        .stage(
            ShaderStageDescriptor::new(ShaderStageType::Pixel, bytecode())
                .bind(0, BindType::Resource, "base")
                .bind(3, BindType::Resource, "detail"),
        )
        .topology(PrimitiveTopology::TriangleList)
        .build();
    let shader = device.create_shader(ShaderDescriptor::new("layered", vec![pass]))?;
    let base = texture(&device, "base")?;
    let detail = texture(&device, "detail")?;
    let other = texture(&device, "other")?;
    shader.set_resource("base", Some(base.clone()));
    shader.set_resource("detail", Some(detail.clone()));

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    headless.call_log().clear();
    queue.draw(&shader, 3, 0)?;
    assert!(headless.call_log().calls().contains(&NativeCall::SetShaderResources {
        stage: ShaderStageType::Pixel,
        start_slot: 0,
        views: vec![base.handle()?.srv, None, None, detail.handle()?.srv],
    }));

    headless.call_log().clear();
    shader.set_resource("detail", Some(other.clone()));
    queue.draw(&shader, 3, 0)?;

    let resource_calls: Vec<NativeCall> = headless
        .call_log()
        .calls()
        .into_iter()
        .filter(|c| matches!(c, NativeCall::SetShaderResources { .. }))
        .collect();
    assert_eq!(
        resource_calls,
        vec![NativeCall::SetShaderResources {
            stage: ShaderStageType::Pixel,
            start_slot: 3,
            views: vec![other.handle()?.srv],
        }]
    );
    Ok(())
}

#[test]
fn test_begin_forgets_bound_state() -> Result<()> {
    let (device, headless) = headless()?;
    let shader = depth_only_shader(&device)?;

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    queue.draw(&shader, 3, 0)?;
    queue.end()?;

    queue.begin(CommandListFlags::EMPTY)?;
    assert!(headless.call_log().calls().ends_with(&[NativeCall::ClearState]));
    headless.call_log().clear();
    queue.draw(&shader, 3, 0)?;

    assert_eq!(
        headless.call_log().count(|c| matches!(c, NativeCall::SetShader { .. })),
        1,
        "The vertex program is sent again after begin"
    );
    Ok(())
}

#[test]
fn test_disposed_resource_is_bound_as_empty_slot() -> Result<()> {
    let (device, headless) = headless()?;
    let shader = textured_shader(&device)?;
    let albedo = texture(&device, "albedo")?;
    shader.set_resource("albedo", Some(albedo.clone()));

    let mut queue = device.queue();
    queue.begin(CommandListFlags::EMPTY)?;
    queue.draw(&shader, 3, 0)?;
    albedo.dispose()?;
    headless.call_log().clear();

    queue.draw(&shader, 3, 0)?;

    assert!(headless.call_log().calls().contains(&NativeCall::SetShaderResources {
        stage: ShaderStageType::Pixel,
        start_slot: 0,
        views: vec![None],
    }));
    assert_eq!(queue.stage(ShaderStageType::Pixel).bound_resource(0), None);
    Ok(())
}
