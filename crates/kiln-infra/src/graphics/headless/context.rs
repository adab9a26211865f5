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

//! Headless command contexts.
//!
//! Bind calls and draws are only logged. Data operations (map, update, copy,
//! clear) act on the stored bytes right away, on deferred contexts too.

use super::call_log::NativeCall;
use super::device::HeadlessShared;
use super::store::StoredResource;
use kiln_core::graphics::{
    Color, CommandListId, CommandQueueType, GraphicsFormat, IndexBufferBinding, InputLayoutId,
    NativeContext, NativeMapMode, PrimitiveTopology, Rect, ResourceError, ResourceId,
    ResourceKind, ResourceRegion, SamplerId, ShaderProgramId, ShaderStageType, StateObjectId,
    VertexBufferBinding, ViewId, Viewport,
};
use std::sync::Arc;

pub(crate) struct HeadlessContext {
    shared: Arc<HeadlessShared>,
    index: u32,
    queue_type: CommandQueueType,
    recorded: usize,
    released: bool,
}

impl HeadlessContext {
    pub(crate) fn new(shared: Arc<HeadlessShared>, index: u32, queue_type: CommandQueueType) -> Self {
        Self {
            shared,
            index,
            queue_type,
            recorded: 0,
            released: false,
        }
    }

    fn record(&mut self, call: NativeCall) {
        if self.released {
            log::warn!("Headless context {} used after release: {call:?}", self.index);
        }
        self.recorded += 1;
        self.shared.log.record(Some(self.index), call);
    }
}

fn backend(msg: impl Into<String>) -> ResourceError {
    ResourceError::BackendError(msg.into())
}

/// Bytes per addressable element of a stored resource. Buffer regions are in bytes.
fn element_size(resource: &StoredResource) -> usize {
    match resource.descriptor.kind {
        ResourceKind::Buffer { .. } => 1,
        ResourceKind::Texture { format, .. } => format.bytes_per_pixel() as usize,
    }
}

fn fill(data: &mut [u8], pattern: &[u8]) {
    for chunk in data.chunks_mut(pattern.len()) {
        chunk.copy_from_slice(&pattern[..chunk.len()]);
    }
}

impl NativeContext for HeadlessContext {
    fn queue_type(&self) -> CommandQueueType {
        self.queue_type
    }

    fn set_shader(&mut self, stage: ShaderStageType, program: Option<ShaderProgramId>) {
        self.record(NativeCall::SetShader { stage, program });
    }

    fn set_constant_buffers(
        &mut self,
        stage: ShaderStageType,
        start_slot: u32,
        buffers: &[Option<ResourceId>],
    ) {
        self.record(NativeCall::SetConstantBuffers {
            stage,
            start_slot,
            buffers: buffers.to_vec(),
        });
    }

    fn set_shader_resources(&mut self, stage: ShaderStageType, start_slot: u32, views: &[Option<ViewId>]) {
        self.record(NativeCall::SetShaderResources {
            stage,
            start_slot,
            views: views.to_vec(),
        });
    }

    fn set_samplers(&mut self, stage: ShaderStageType, start_slot: u32, samplers: &[Option<SamplerId>]) {
        self.record(NativeCall::SetSamplers {
            stage,
            start_slot,
            samplers: samplers.to_vec(),
        });
    }

    fn set_unordered_access_views(
        &mut self,
        stage: ShaderStageType,
        start_slot: u32,
        views: &[Option<ViewId>],
    ) {
        self.record(NativeCall::SetUnorderedAccessViews {
            stage,
            start_slot,
            views: views.to_vec(),
        });
    }

    fn set_output_unordered_access_views(&mut self, start_slot: u32, views: &[Option<ViewId>]) {
        self.record(NativeCall::SetOutputUnorderedAccessViews {
            start_slot,
            views: views.to_vec(),
        });
    }

    fn set_primitive_topology(&mut self, topology: PrimitiveTopology) {
        self.record(NativeCall::SetPrimitiveTopology(topology));
    }

    fn set_index_buffer(&mut self, binding: Option<IndexBufferBinding>) {
        self.record(NativeCall::SetIndexBuffer(binding));
    }

    fn set_vertex_buffers(&mut self, start_slot: u32, bindings: &[Option<VertexBufferBinding>]) {
        self.record(NativeCall::SetVertexBuffers {
            start_slot,
            count: bindings.len(),
        });
    }

    fn set_input_layout(&mut self, layout: Option<InputLayoutId>) {
        self.record(NativeCall::SetInputLayout(layout));
    }

    fn set_blend_state(&mut self, state: Option<StateObjectId>, _blend_factor: Color, _sample_mask: u32) {
        self.record(NativeCall::SetBlendState(state));
    }

    fn set_rasterizer_state(&mut self, state: Option<StateObjectId>) {
        self.record(NativeCall::SetRasterizerState(state));
    }

    fn set_depth_stencil_state(&mut self, state: Option<StateObjectId>, stencil_reference: u32) {
        self.record(NativeCall::SetDepthStencilState {
            state,
            stencil_reference,
        });
    }

    fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.record(NativeCall::SetViewports(viewports.len()));
    }

    fn set_scissor_rects(&mut self, rects: &[Rect]) {
        self.record(NativeCall::SetScissorRects(rects.len()));
    }

    fn set_render_targets(&mut self, targets: &[Option<ViewId>], depth: Option<ViewId>) {
        self.record(NativeCall::SetRenderTargets {
            targets: targets.to_vec(),
            depth,
        });
    }

    fn draw(&mut self, vertex_count: u32, start_vertex: u32) {
        self.record(NativeCall::Draw {
            vertex_count,
            start_vertex,
        });
    }

    fn draw_instanced(
        &mut self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        _start_vertex: u32,
        _start_instance: u32,
    ) {
        self.record(NativeCall::DrawInstanced {
            vertex_count_per_instance,
            instance_count,
        });
    }

    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32) {
        self.record(NativeCall::DrawIndexed {
            index_count,
            start_index,
            base_vertex,
        });
    }

    fn draw_indexed_instanced(
        &mut self,
        index_count_per_instance: u32,
        instance_count: u32,
        _start_index: u32,
        _base_vertex: i32,
        _start_instance: u32,
    ) {
        self.record(NativeCall::DrawIndexedInstanced {
            index_count_per_instance,
            instance_count,
        });
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) {
        self.record(NativeCall::Dispatch { x, y, z });
    }

    fn map(
        &mut self,
        resource: ResourceId,
        _subresource: u32,
        mode: NativeMapMode,
    ) -> Result<Vec<u8>, ResourceError> {
        let data = {
            let mut store = self.shared.store();
            let stored = store.unmapped(resource)?;
            stored.mapped = true;
            match mode {
                NativeMapMode::WriteDiscard => vec![0u8; stored.data.len()],
                NativeMapMode::Read | NativeMapMode::Write | NativeMapMode::WriteNoOverwrite => {
                    stored.data.clone()
                }
            }
        };
        self.record(NativeCall::Map { resource, mode });
        Ok(data)
    }

    fn unmap(
        &mut self,
        resource: ResourceId,
        _subresource: u32,
        written: Option<&[u8]>,
    ) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let stored = store.resource_mut(resource)?;
            if !stored.mapped {
                return Err(backend("unmap of a resource that is not mapped"));
            }
            stored.mapped = false;
            if let Some(bytes) = written {
                let len = bytes.len().min(stored.data.len());
                stored.data[..len].copy_from_slice(&bytes[..len]);
            }
        }
        self.record(NativeCall::Unmap {
            resource,
            written: written.is_some(),
        });
        Ok(())
    }

    fn update_subresource(
        &mut self,
        resource: ResourceId,
        _subresource: u32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let stored = store.unmapped(resource)?;
            let capacity = stored.data.len();
            let start = offset as usize;
            let target = stored
                .data
                .get_mut(start..start + data.len())
                .ok_or(ResourceError::OutOfBounds {
                    offset,
                    len: data.len() as u64,
                    capacity: capacity as u64,
                })?;
            target.copy_from_slice(data);
        }
        self.record(NativeCall::UpdateSubresource {
            resource,
            offset,
            len: data.len(),
        });
        Ok(())
    }

    fn copy_resource(&mut self, source: ResourceId, destination: ResourceId) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let len = store.resource(source)?.data.len();
            let capacity = store.unmapped(destination)?.data.len();
            if len != capacity {
                return Err(ResourceError::SizeMismatch {
                    source: len as u64,
                    destination: capacity as u64,
                });
            }
            store.copy_bytes(source, 0, destination, 0, len)?;
        }
        self.record(NativeCall::CopyResource {
            source,
            destination,
        });
        Ok(())
    }

    fn copy_subresource_region(
        &mut self,
        source: ResourceId,
        _source_subresource: u32,
        region: Option<ResourceRegion>,
        destination: ResourceId,
        _destination_subresource: u32,
        destination_start: [u32; 3],
    ) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let (src_start, len) = {
                let src = store.resource(source)?;
                let element = element_size(src);
                match region {
                    Some(region) => (
                        region.left as usize * element,
                        region.width() as usize * element,
                    ),
                    None => (0, src.data.len()),
                }
            };
            let dst_start = destination_start[0] as usize * element_size(store.unmapped(destination)?);
            store.copy_bytes(source, src_start, destination, dst_start, len)?;
        }
        self.record(NativeCall::CopySubresourceRegion {
            source,
            destination,
        });
        Ok(())
    }

    fn resolve_subresource(
        &mut self,
        source: ResourceId,
        _source_subresource: u32,
        destination: ResourceId,
        _destination_subresource: u32,
        _format: GraphicsFormat,
    ) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let len = store.resource(source)?.data.len();
            let capacity = store.unmapped(destination)?.data.len();
            if len != capacity {
                return Err(ResourceError::SizeMismatch {
                    source: len as u64,
                    destination: capacity as u64,
                });
            }
            store.copy_bytes(source, 0, destination, 0, len)?;
        }
        self.record(NativeCall::ResolveSubresource {
            source,
            destination,
        });
        Ok(())
    }

    fn clear_render_target(&mut self, view: ViewId, color: Color) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let stored = store.view_resource(view)?;
            match stored.format().bytes_per_pixel() {
                4 => fill(&mut stored.data, &color.to_rgba8()),
                16 => fill(&mut stored.data, bytemuck::bytes_of(&color)),
                _ => stored.data.fill(0),
            }
        }
        self.record(NativeCall::ClearRenderTarget { view, color });
        Ok(())
    }

    fn clear_depth_stencil(&mut self, view: ViewId, depth: f32, stencil: u8) -> Result<(), ResourceError> {
        {
            let mut store = self.shared.store();
            let stored = store.view_resource(view)?;
            match stored.format() {
                GraphicsFormat::D32Float => fill(&mut stored.data, &depth.to_le_bytes()),
                GraphicsFormat::D24UnormS8Uint => {
                    let depth = (depth.clamp(0.0, 1.0) * 0x00FF_FFFF as f32).round() as u32;
                    let packed = depth | (u32::from(stencil) << 24);
                    fill(&mut stored.data, &packed.to_le_bytes());
                }
                other => {
                    return Err(backend(format!(
                        "depth-stencil clear of a {other:?} resource"
                    )))
                }
            }
        }
        self.record(NativeCall::ClearDepthStencil {
            view,
            depth,
            stencil,
        });
        Ok(())
    }

    fn generate_mips(&mut self, view: ViewId) -> Result<(), ResourceError> {
        self.shared.store().view_resource(view)?;
        self.record(NativeCall::GenerateMips(view));
        Ok(())
    }

    fn finish_command_list(&mut self) -> Result<CommandListId, ResourceError> {
        if self.queue_type != CommandQueueType::Deferred {
            return Err(backend("only deferred contexts record command lists"));
        }
        let id = self.shared.store().create_command_list(self.recorded);
        self.recorded = 0;
        self.record(NativeCall::FinishCommandList(id));
        Ok(id)
    }

    fn execute_command_list(&mut self, list: CommandListId) -> Result<(), ResourceError> {
        if self.queue_type != CommandQueueType::Immediate {
            return Err(backend("command lists are executed on the immediate context"));
        }
        let recorded = self.shared.store().command_list(list)?;
        log::trace!("Executing command list {list:?} ({recorded} calls)");
        self.record(NativeCall::ExecuteCommandList(list));
        Ok(())
    }

    fn begin_event(&mut self, label: &str) {
        self.record(NativeCall::BeginEvent(label.to_string()));
    }

    fn end_event(&mut self) {
        self.record(NativeCall::EndEvent);
    }

    fn set_marker(&mut self, label: &str) {
        self.record(NativeCall::SetMarker(label.to_string()));
    }

    fn clear_state(&mut self) {
        self.record(NativeCall::ClearState);
    }

    fn release(&mut self) {
        self.record(NativeCall::Release);
        self.released = true;
    }
}

#[cfg(test)]
mod tests {
    use super::super::device::{HeadlessConfig, HeadlessDevice};
    use super::*;
    use kiln_core::graphics::{
        BufferType, GraphicsResourceFlags, NativeDevice, ResourceDescriptor, TextureDimensions,
        TextureKind,
    };

    fn buffer(bytes: u32) -> ResourceDescriptor {
        ResourceDescriptor {
            label: None,
            kind: ResourceKind::Buffer {
                buffer_type: BufferType::Staging,
                stride: 1,
                element_count: bytes,
            },
            flags: GraphicsResourceFlags::CPU_READ | GraphicsResourceFlags::CPU_WRITE,
        }
    }

    #[test]
    fn test_map_round_trip_commits_on_unmap() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ctx = device.create_context(CommandQueueType::Immediate).unwrap();
        let id = device.create_resource(&buffer(4), None).unwrap().resource;

        let mut bytes = ctx.map(id, 0, NativeMapMode::Write).unwrap();
        assert!(ctx.map(id, 0, NativeMapMode::Read).is_err());
        bytes.copy_from_slice(&[1, 2, 3, 4]);
        ctx.unmap(id, 0, Some(&bytes)).unwrap();

        assert_eq!(device.resource_data(id).unwrap(), vec![1, 2, 3, 4]);
        assert!(ctx.unmap(id, 0, None).is_err());
    }

    #[test]
    fn test_region_copy_uses_byte_offsets_for_buffers() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ctx = device.create_context(CommandQueueType::Immediate).unwrap();
        let src = device
            .create_resource(&buffer(8), Some(&[0u8, 1, 2, 3, 4, 5, 6, 7][..]))
            .unwrap()
            .resource;
        let dst = device.create_resource(&buffer(4), None).unwrap().resource;

        ctx.copy_subresource_region(src, 0, Some(ResourceRegion::span(2, 5)), dst, 0, [1, 0, 0])
            .unwrap();
        assert_eq!(device.resource_data(dst).unwrap(), vec![0, 2, 3, 4]);
    }

    #[test]
    fn test_clear_render_target_writes_rgba8() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut ctx = device.create_context(CommandQueueType::Immediate).unwrap();
        let target = device
            .create_resource(
                &ResourceDescriptor {
                    label: None,
                    kind: ResourceKind::Texture {
                        kind: TextureKind::RenderSurface,
                        dimensions: TextureDimensions::new_2d(2, 1),
                        format: GraphicsFormat::R8G8B8A8Unorm,
                    },
                    flags: GraphicsResourceFlags::GPU_READ | GraphicsResourceFlags::GPU_WRITE,
                },
                None,
            )
            .unwrap();

        ctx.clear_render_target(target.rtv.unwrap(), Color::WHITE).unwrap();
        assert_eq!(device.resource_data(target.resource).unwrap(), vec![255; 8]);
    }

    #[test]
    fn test_only_deferred_contexts_finish_lists() {
        let device = HeadlessDevice::new(HeadlessConfig::default());
        let mut immediate = device.create_context(CommandQueueType::Immediate).unwrap();
        let mut deferred = device.create_context(CommandQueueType::Deferred).unwrap();

        assert!(immediate.finish_command_list().is_err());
        deferred.draw(3, 0);
        let list = deferred.finish_command_list().unwrap();
        assert!(deferred.execute_command_list(list).is_err());
        immediate.execute_command_list(list).unwrap();
        assert_eq!(device.live_command_lists(), 1);
    }
}
