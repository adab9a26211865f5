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
    BufferType, Color, GraphicsDevice, GraphicsFormat, GraphicsResource, GraphicsResourceFlags,
    MapType, NativeMapMode, ResourceError, TaskPriority, TextureDimensions, TextureKind,
    VertexElement, VertexLayout,
};
use kiln_infra::graphics::headless::NativeCall;
use std::sync::Arc;

fn bytes(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}

fn byte_buffer(
    device: &GraphicsDevice,
    len: u32,
    flags: GraphicsResourceFlags,
) -> Result<Arc<GraphicsResource>> {
    Ok(device.create_buffer(Some("bytes"), BufferType::Structured, 1, len, flags, None)?)
}

#[test]
fn test_map_write_then_read() -> Result<()> {
    let (device, _headless) = headless()?;
    let buffer = byte_buffer(
        &device,
        8,
        GraphicsResourceFlags::CPU_READ | GraphicsResourceFlags::CPU_WRITE,
    )?;

    let mut queue = device.queue();
    {
        let mut mapped = queue.map(&buffer, 0, MapType::Write)?;
        assert!(mapped.is_writable());
        mapped[..4].copy_from_slice(&[9, 8, 7, 6]);
        mapped.unmap()?;
    }
    let mapped = queue.map(&buffer, 0, MapType::Read)?;
    assert_eq!(&mapped[..], &[9, 8, 7, 6, 0, 0, 0, 0]);
    mapped.unmap()?;
    assert_eq!(queue.stats().map_calls, 2);
    Ok(())
}

#[test]
fn test_map_read_without_cpu_read_access() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(&device, 16, GraphicsResourceFlags::CPU_WRITE)?;

    let mut queue = device.queue();
    let err = match queue.map(&buffer, 0, MapType::Read) {
        Ok(_) => anyhow::bail!("mapping a write-only buffer for reading must fail"),
        Err(err) => err,
    };
    assert_eq!(err, ResourceError::CpuReadDenied);
    assert_eq!(
        err.to_string(),
        "Cannot map a resource for reading without CPU read access"
    );
    assert_eq!(headless.call_log().count(|c| matches!(c, NativeCall::Map { .. })), 0);
    Ok(())
}

#[test]
fn test_partial_upload_and_staged_readback() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(
        &device,
        1024,
        GraphicsResourceFlags::GPU_WRITE | GraphicsResourceFlags::CPU_WRITE,
    )?;
    let data = bytes(512);

    let mut queue = device.queue();
    queue.set_data(&buffer, &data, 0, TaskPriority::Immediate);
    assert!(headless.call_log().calls().contains(&NativeCall::Map {
        resource: buffer.handle()?.resource,
        mode: NativeMapMode::WriteNoOverwrite,
    }));

    let mut readback = vec![0u8; 512];
    let staging = device.create_staging_buffer(true, false, 512)?;
    queue.read_data(&buffer, 0, &mut readback, Some(&staging))?;

    assert_eq!(readback, data);
    assert_eq!(queue.stats().tasks_processed, 1);
    assert_eq!(queue.stats().tasks_discarded, 0);
    assert_eq!(queue.stats().copy_calls, 1);
    Ok(())
}

#[test]
fn test_readback_at_an_offset() -> Result<()> {
    let (device, _headless) = headless()?;
    let data = bytes(64);
    let buffer = device.create_buffer(
        Some("source"),
        BufferType::Structured,
        1,
        64,
        GraphicsResourceFlags::GPU_READ,
        Some(&data),
    )?;
    let staging = device.create_staging_buffer(true, false, 64)?;

    let mut queue = device.queue();
    let mut readback = [0u8; 8];
    queue.read_data(&buffer, 20, &mut readback, Some(&staging))?;
    assert_eq!(&readback[..], &data[20..28]);

    let err = queue.read_data(&buffer, 60, &mut readback, Some(&staging));
    assert!(matches!(err, Err(ResourceError::OutOfBounds { .. })));
    Ok(())
}

#[test]
fn test_texture_readback_through_staging() -> Result<()> {
    let (device, _headless) = headless()?;
    let texels = bytes(16);
    let texture = device.create_texture(
        Some("tiny"),
        TextureKind::Texture2D,
        TextureDimensions::new_2d(2, 2),
        GraphicsFormat::R8G8B8A8Unorm,
        GraphicsResourceFlags::EMPTY,
        Some(&texels),
    )?;

    let mut queue = device.queue();
    let mut readback = [0u8; 8];
    let small = device.create_staging_buffer(true, false, 8)?;
    assert!(matches!(
        queue.read_data(&texture, 4, &mut readback, Some(&small)),
        Err(ResourceError::InvalidStaging(_))
    ));

    let staging = device.create_staging_buffer(true, false, 16)?;
    queue.read_data(&texture, 4, &mut readback, Some(&staging))?;
    assert_eq!(&readback[..], &texels[4..12]);
    Ok(())
}

#[test]
fn test_readback_needs_a_readable_staging_resource() -> Result<()> {
    let (device, _headless) = headless()?;
    let buffer = byte_buffer(&device, 32, GraphicsResourceFlags::GPU_WRITE)?;
    let upload_only = device.create_staging_buffer(false, true, 32)?;

    let mut queue = device.queue();
    let mut readback = [0u8; 32];
    assert_eq!(
        queue.read_data(&buffer, 0, &mut readback, None),
        Err(ResourceError::StagingRequired)
    );
    assert!(matches!(
        queue.read_data(&buffer, 0, &mut readback, Some(&upload_only)),
        Err(ResourceError::InvalidStaging(_))
    ));
    Ok(())
}

#[test]
fn test_apply_tasks_run_before_the_next_access() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(
        &device,
        4,
        GraphicsResourceFlags::CPU_READ | GraphicsResourceFlags::CPU_WRITE,
    )?;

    let mut queue = device.queue();
    queue.set_data(&buffer, &[1u8, 2, 3, 4], 0, TaskPriority::Apply);
    assert_eq!(buffer.pending_tasks(), 1);
    assert!(headless.call_log().is_empty(), "Apply tasks wait for the resource to be used");

    let mut readback = [0u8; 4];
    queue.read_data(&buffer, 0, &mut readback, None)?;
    assert_eq!(readback, [1, 2, 3, 4]);
    assert_eq!(buffer.pending_tasks(), 0);
    assert_eq!(queue.stats().tasks_processed, 1);
    Ok(())
}

#[test]
fn test_start_of_frame_tasks_run_in_begin_frame() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(&device, 4, GraphicsResourceFlags::GPU_WRITE)?;

    device
        .queue()
        .set_data(&buffer, &[5u8, 6, 7, 8], 0, TaskPriority::StartOfFrame);
    assert_eq!(device.pending_start_of_frame_tasks(), 1);
    assert_eq!(headless.resource_data(buffer.handle()?.resource)?, vec![0; 4]);

    assert_eq!(device.begin_frame(), 1);
    assert_eq!(device.pending_start_of_frame_tasks(), 0);
    assert_eq!(headless.resource_data(buffer.handle()?.resource)?, vec![5, 6, 7, 8]);
    assert_eq!(device.queue().stats().update_calls, 1);
    assert!(device.pooled_tasks() >= 1, "Processed tasks go back to the pool");
    Ok(())
}

#[test]
fn test_invalid_tasks_are_discarded() -> Result<()> {
    let (device, _headless) = headless()?;
    let small = byte_buffer(&device, 4, GraphicsResourceFlags::GPU_WRITE)?;
    let large = byte_buffer(&device, 8, GraphicsResourceFlags::GPU_WRITE)?;
    let disposed = byte_buffer(&device, 4, GraphicsResourceFlags::GPU_WRITE)?;
    disposed.dispose()?;

    let mut queue = device.queue();
    queue.set_data(&small, &[0u8; 8], 0, TaskPriority::Immediate);
    queue.set_data(&disposed, &[0u8; 4], 0, TaskPriority::Immediate);
    queue.copy_to(&small, &large, TaskPriority::Immediate);
    queue.clear_surface(&small, Color::BLACK, TaskPriority::Immediate);

    assert_eq!(queue.stats().tasks_discarded, 4);
    assert_eq!(queue.stats().tasks_processed, 0);
    Ok(())
}

#[test]
fn test_upload_past_the_address_space_is_discarded() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(&device, 16, GraphicsResourceFlags::GPU_WRITE)?;

    let mut queue = device.queue();
    queue.set_data(&buffer, &[1u8; 4], u64::MAX - 1, TaskPriority::Immediate);

    assert_eq!(queue.stats().tasks_discarded, 1);
    assert_eq!(queue.stats().update_calls, 0);
    assert_eq!(headless.resource_data(buffer.handle()?.resource)?, vec![0; 16]);
    Ok(())
}

#[test]
fn test_constant_buffer_size_is_rounded_up() -> Result<()> {
    let (device, _headless) = headless()?;
    let camera = device.create_constant_buffer(Some("camera"), 20, GraphicsResourceFlags::CPU_WRITE)?;
    assert_eq!(camera.byte_size(), 32);

    let err = device
        .create_constant_buffer(Some("huge"), u32::MAX - 3, GraphicsResourceFlags::CPU_WRITE)
        .err();
    assert_eq!(
        err,
        Some(ResourceError::OutOfBounds {
            offset: 0,
            len: (u32::MAX - 3) as u64,
            capacity: u32::MAX as u64,
        })
    );
    Ok(())
}

#[test]
fn test_clear_and_copy_tasks() -> Result<()> {
    let (device, headless) = headless()?;
    let surface = device.create_texture(
        Some("color"),
        TextureKind::RenderSurface,
        TextureDimensions::new_2d(2, 2),
        GraphicsFormat::R8G8B8A8Unorm,
        GraphicsResourceFlags::GPU_WRITE,
        None,
    )?;
    let copy = device.create_texture(
        Some("copy"),
        TextureKind::Texture2D,
        TextureDimensions::new_2d(2, 2),
        GraphicsFormat::R8G8B8A8Unorm,
        GraphicsResourceFlags::GPU_WRITE,
        None,
    )?;
    let depth = device.create_texture(
        Some("depth"),
        TextureKind::DepthSurface,
        TextureDimensions::new_2d(1, 1),
        GraphicsFormat::D32Float,
        GraphicsResourceFlags::GPU_WRITE,
        None,
    )?;

    let mut queue = device.queue();
    queue.clear_surface(&surface, Color::WHITE, TaskPriority::Immediate);
    queue.copy_to(&surface, &copy, TaskPriority::Immediate);
    queue.clear_depth(&depth, 1.0, 0, TaskPriority::Immediate);

    assert_eq!(headless.resource_data(surface.handle()?.resource)?, vec![255; 16]);
    assert_eq!(headless.resource_data(copy.handle()?.resource)?, vec![255; 16]);
    assert_eq!(
        headless.resource_data(depth.handle()?.resource)?,
        1.0f32.to_le_bytes().to_vec()
    );
    assert_eq!(queue.stats().tasks_processed, 3);
    Ok(())
}

#[test]
fn test_copy_resource_checks_sizes() -> Result<()> {
    let (device, _headless) = headless()?;
    let a = byte_buffer(&device, 16, GraphicsResourceFlags::GPU_WRITE)?;
    let b = byte_buffer(&device, 32, GraphicsResourceFlags::GPU_WRITE)?;

    let mut queue = device.queue();
    assert_eq!(
        queue.copy_resource(&a, &b),
        Err(ResourceError::SizeMismatch {
            source: 16,
            destination: 32,
        })
    );
    Ok(())
}

#[test]
fn test_dispose_is_deferred_to_the_frame_boundary() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(&device, 256, GraphicsResourceFlags::GPU_WRITE)?;
    assert_eq!(headless.live_resources(), 1);
    assert_eq!(device.allocated_vram(), 256);

    buffer.dispose()?;
    assert!(buffer.is_disposed());
    assert_eq!(buffer.dispose(), Err(ResourceError::Disposed));
    assert_eq!(buffer.handle(), Err(ResourceError::Disposed));
    assert_eq!(headless.live_resources(), 1, "Release waits for the frame boundary");

    assert_eq!(device.dispose_marked_objects(), 1);
    assert_eq!(headless.live_resources(), 0);
    assert_eq!(headless.live_views(), 0);
    assert_eq!(device.allocated_vram(), 0);
    Ok(())
}

#[test]
fn test_dropped_resources_are_released_at_present() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = byte_buffer(&device, 64, GraphicsResourceFlags::GPU_READ)?;
    assert_eq!(headless.live_views(), 1);

    drop(buffer);
    assert_eq!(headless.live_resources(), 1);
    device.present();
    assert_eq!(headless.live_resources(), 0);
    assert_eq!(device.allocated_vram(), 0);
    Ok(())
}

#[test]
fn test_resize_buffer_replaces_the_handle() -> Result<()> {
    let (device, headless) = headless()?;
    let buffer = device.create_structured_buffer(
        Some("grow"),
        4,
        16,
        GraphicsResourceFlags::GPU_WRITE,
        None,
    )?;
    let before = buffer.handle()?;

    buffer.resize_buffer(32)?;

    assert_eq!(buffer.element_count(), 32);
    assert_eq!(buffer.byte_size(), 128);
    assert_ne!(buffer.handle()?, before);
    assert_eq!(device.allocated_vram(), 64 + 128);
    device.dispose_marked_objects();
    assert_eq!(device.allocated_vram(), 128);
    assert_eq!(headless.live_resources(), 1);

    assert!(buffer
        .resize_texture(TextureDimensions::new_2d(4, 4))
        .is_err());
    Ok(())
}

#[test]
fn test_buffer_segments_are_pooled() -> Result<()> {
    let (device, _headless) = headless()?;
    let layout = VertexLayout::new(vec![VertexElement::per_vertex(
        "POSITION",
        GraphicsFormat::R32G32B32A32Float,
        0,
    )]);
    let vertices = device.create_vertex_buffer(Some("pool"), layout, 8, GraphicsResourceFlags::EMPTY, None)?;

    let segment = device.acquire_buffer_segment(&vertices, 32, 64, 16)?;
    assert_eq!(segment.element_count(), 4);
    assert!(matches!(
        device.acquire_buffer_segment(&vertices, 96, 64, 16),
        Err(ResourceError::OutOfBounds { .. })
    ));

    device.recycle_buffer_segment(segment);
    assert_eq!(device.pooled_segments(), 1);
    let reused = device.acquire_buffer_segment(&vertices, 0, 16, 16)?;
    assert_eq!(device.pooled_segments(), 0);
    assert_eq!(reused.byte_offset, 0);
    assert_eq!(reused.element_count(), 1);
    Ok(())
}

#[test]
fn test_geometry_buffers_never_get_shader_views() -> Result<()> {
    let (device, _headless) = headless()?;
    let index = device.create_index_buffer(
        None,
        kiln_core::graphics::IndexFormat::Uint32,
        3,
        GraphicsResourceFlags::GPU_READ,
        None,
    )?;
    let staging = device.create_staging_buffer(true, true, 16)?;

    assert!(index.handle()?.srv.is_none());
    assert!(index.flags().contains(GraphicsResourceFlags::DENY_SHADER_ACCESS));
    assert!(staging.handle()?.srv.is_none());
    assert_eq!(
        staging.flags(),
        GraphicsResourceFlags::CPU_READ
            | GraphicsResourceFlags::CPU_WRITE
            | GraphicsResourceFlags::GPU_WRITE
            | GraphicsResourceFlags::DENY_SHADER_ACCESS
    );
    Ok(())
}
