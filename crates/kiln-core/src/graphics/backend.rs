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

//! The contract every native backend must satisfy.
//!
//! [`NativeDevice`] creates and releases native objects and is shared across
//! threads. [`NativeContext`] records or submits commands and is owned by
//! exactly one [`GraphicsQueue`](super::GraphicsQueue): native contexts are
//! not thread-safe, so the trait is `Send` but not `Sync`.
//!
//! Everything above this boundary (dirty tracking, pass protocol, disposal,
//! VRAM accounting) is backend-agnostic.

use super::api::{
    Color, CommandQueueType, GraphicsBackendType, GraphicsCapabilities, GraphicsFormat,
    IndexFormat, NativeMapMode, PrimitiveTopology, Rect, ResourceDescriptor, ResourceRegion,
    SamplerDescriptor, ShaderStageType, StateDescriptor, Viewport,
};
use super::error::{DeviceError, ResourceError, ShaderError};
use super::handle::{
    CommandListId, InputLayoutId, ResourceHandle, ResourceId, SamplerId, ShaderProgramId,
    StateObjectId, SwapChainId, ViewId,
};
use super::vertex::VertexLayout;
use super::window::SurfaceWindowHandle;
use std::fmt;

/// Index buffer as seen by the input assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexBufferBinding {
    /// The buffer.
    pub resource: ResourceId,
    /// Element type.
    pub format: IndexFormat,
    /// Byte offset of the first index.
    pub offset: u32,
}

/// One vertex-buffer slot as seen by the input assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VertexBufferBinding {
    /// The buffer.
    pub resource: ResourceId,
    /// Bytes per vertex.
    pub stride: u32,
    /// Byte offset of the first vertex.
    pub offset: u32,
}

/// Parameters of a new swap chain.
#[derive(Clone)]
pub struct SwapChainDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Target window. `None` creates an offscreen chain.
    pub window: Option<SurfaceWindowHandle>,
    /// Back-buffer width.
    pub width: u32,
    /// Back-buffer height.
    pub height: u32,
    /// Back-buffer format.
    pub format: GraphicsFormat,
    /// Number of back buffers.
    pub buffer_count: u32,
}

impl fmt::Debug for SwapChainDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChainDescriptor")
            .field("label", &self.label)
            .field("has_window", &self.window.is_some())
            .field("width", &self.width)
            .field("height", &self.height)
            .field("format", &self.format)
            .field("buffer_count", &self.buffer_count)
            .finish()
    }
}

/// Native result of a present call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PresentStatus {
    /// The frame was presented.
    Ok,
    /// The window is hidden; nothing was presented.
    Occluded,
    /// The device was physically removed or its driver crashed.
    DeviceRemoved,
    /// The device was reset and must be recreated.
    DeviceReset,
    /// Any other native failure code.
    Failed(i32),
}

impl PresentStatus {
    /// `true` when the native device is unusable.
    pub fn is_device_lost(self) -> bool {
        matches!(self, PresentStatus::DeviceRemoved | PresentStatus::DeviceReset)
    }
}

/// A native graphics device.
pub trait NativeDevice: Send + Sync {
    /// The API this device runs on.
    fn backend_type(&self) -> GraphicsBackendType;

    /// Human-readable adapter name.
    fn adapter_name(&self) -> String;

    /// Limits of the device.
    fn capabilities(&self) -> GraphicsCapabilities;

    /// Creates a native context.
    ///
    /// ## Arguments
    /// * `queue_type` - [`CommandQueueType::Immediate`] for the submitting context,
    ///   [`CommandQueueType::Deferred`] for a recording one.
    fn create_context(
        &self,
        queue_type: CommandQueueType,
    ) -> Result<Box<dyn NativeContext>, DeviceError>;

    /// Creates a buffer or texture, with the views listed by
    /// [`ResourceDescriptor::views`].
    ///
    /// ## Returns
    /// The handle owning the resource and its views.
    fn create_resource(
        &self,
        descriptor: &ResourceDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<ResourceHandle, ResourceError>;

    /// Releases a resource and every view of its handle.
    fn release_resource(&self, handle: &ResourceHandle) -> Result<(), ResourceError>;

    /// Creates a shader program for one stage from its compiled bytecode.
    fn create_shader_program(
        &self,
        stage: ShaderStageType,
        bytecode: &[u8],
        label: Option<&str>,
    ) -> Result<ShaderProgramId, ShaderError>;

    /// Releases a shader program.
    fn release_shader_program(&self, id: ShaderProgramId) -> Result<(), ResourceError>;

    /// Creates a sampler.
    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError>;

    /// Releases a sampler.
    fn release_sampler(&self, id: SamplerId) -> Result<(), ResourceError>;

    /// Creates a blend, rasterizer or depth-stencil state.
    fn create_state_object(
        &self,
        descriptor: &StateDescriptor,
    ) -> Result<StateObjectId, ResourceError>;

    /// Releases a state object.
    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError>;

    /// Creates an input layout binding the given vertex layouts (one per
    /// vertex-buffer slot) to the signature of `program`.
    fn create_input_layout(
        &self,
        layouts: &[Option<&VertexLayout>],
        program: Option<ShaderProgramId>,
    ) -> Result<InputLayoutId, ResourceError>;

    /// Releases an input layout.
    fn release_input_layout(&self, id: InputLayoutId) -> Result<(), ResourceError>;

    /// Releases a recorded command list.
    fn release_command_list(&self, id: CommandListId) -> Result<(), ResourceError>;

    /// Creates a swap chain.
    fn create_swap_chain(
        &self,
        descriptor: &SwapChainDescriptor,
    ) -> Result<SwapChainId, DeviceError>;

    /// The current back buffer. Its handle changes after a resize.
    fn swap_chain_back_buffer(&self, id: SwapChainId) -> Result<ResourceHandle, ResourceError>;

    /// Resizes every back buffer, invalidating the previous back-buffer handle.
    fn resize_swap_chain(
        &self,
        id: SwapChainId,
        width: u32,
        height: u32,
    ) -> Result<(), ResourceError>;

    /// Presents the current back buffer. Failures are returned as a status, never raised.
    fn present(&self, id: SwapChainId, sync_interval: u32) -> PresentStatus;

    /// Releases a swap chain and its back buffers.
    fn release_swap_chain(&self, id: SwapChainId) -> Result<(), ResourceError>;
}

/// A native command context.
///
/// Bind calls take the first slot and the contiguous run of values to bind
/// from there; `None` unbinds a slot.
pub trait NativeContext: Send {
    /// Immediate or deferred.
    fn queue_type(&self) -> CommandQueueType;

    /// Binds (or unbinds) the program of a stage.
    fn set_shader(&mut self, stage: ShaderStageType, program: Option<ShaderProgramId>);

    /// Binds constant buffers to a stage.
    fn set_constant_buffers(
        &mut self,
        stage: ShaderStageType,
        start_slot: u32,
        buffers: &[Option<ResourceId>],
    );

    /// Binds shader-resource views to a stage.
    fn set_shader_resources(&mut self, stage: ShaderStageType, start_slot: u32, views: &[Option<ViewId>]);

    /// Binds samplers to a stage.
    fn set_samplers(&mut self, stage: ShaderStageType, start_slot: u32, samplers: &[Option<SamplerId>]);

    /// Binds unordered-access views to the compute stage.
    fn set_unordered_access_views(
        &mut self,
        stage: ShaderStageType,
        start_slot: u32,
        views: &[Option<ViewId>],
    );

    /// Binds unordered-access views to the output merger, keeping render targets.
    fn set_output_unordered_access_views(&mut self, start_slot: u32, views: &[Option<ViewId>]);

    /// Sets the primitive topology.
    fn set_primitive_topology(&mut self, topology: PrimitiveTopology);

    /// Binds or unbinds the index buffer.
    fn set_index_buffer(&mut self, binding: Option<IndexBufferBinding>);

    /// Binds vertex buffers.
    fn set_vertex_buffers(&mut self, start_slot: u32, bindings: &[Option<VertexBufferBinding>]);

    /// Binds an input layout, or the null layout.
    fn set_input_layout(&mut self, layout: Option<InputLayoutId>);

    /// Binds a blend state.
    fn set_blend_state(&mut self, state: Option<StateObjectId>, blend_factor: Color, sample_mask: u32);

    /// Binds a rasterizer state.
    fn set_rasterizer_state(&mut self, state: Option<StateObjectId>);

    /// Binds a depth-stencil state.
    fn set_depth_stencil_state(&mut self, state: Option<StateObjectId>, stencil_reference: u32);

    /// Sets the viewports.
    fn set_viewports(&mut self, viewports: &[Viewport]);

    /// Sets the scissor rectangles.
    fn set_scissor_rects(&mut self, rects: &[Rect]);

    /// Binds render targets and the depth-stencil view. An empty slice unbinds every target.
    fn set_render_targets(&mut self, targets: &[Option<ViewId>], depth: Option<ViewId>);

    /// Non-indexed, non-instanced draw.
    fn draw(&mut self, vertex_count: u32, start_vertex: u32);

    /// Non-indexed instanced draw.
    fn draw_instanced(
        &mut self,
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    );

    /// Indexed draw.
    fn draw_indexed(&mut self, index_count: u32, start_index: u32, base_vertex: i32);

    /// Indexed instanced draw.
    fn draw_indexed_instanced(
        &mut self,
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    );

    /// Dispatches compute thread groups.
    fn dispatch(&mut self, x: u32, y: u32, z: u32);

    /// Maps a subresource and returns a CPU copy of its bytes.
    ///
    /// Write-discard mappings return zeroed memory of the resource size.
    fn map(
        &mut self,
        resource: ResourceId,
        subresource: u32,
        mode: NativeMapMode,
    ) -> Result<Vec<u8>, ResourceError>;

    /// Unmaps a subresource, committing `written` when the mapping was writable.
    fn unmap(
        &mut self,
        resource: ResourceId,
        subresource: u32,
        written: Option<&[u8]>,
    ) -> Result<(), ResourceError>;

    /// Uploads `data` at a byte offset of a subresource without mapping.
    fn update_subresource(
        &mut self,
        resource: ResourceId,
        subresource: u32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError>;

    /// Copies a whole resource into another of identical size.
    fn copy_resource(&mut self, source: ResourceId, destination: ResourceId) -> Result<(), ResourceError>;

    /// Copies a region of one subresource into another.
    ///
    /// `region` of `None` copies the whole source subresource. `destination_start`
    /// is the (x, y, z) element position of the copy in the destination.
    #[allow(clippy::too_many_arguments)]
    fn copy_subresource_region(
        &mut self,
        source: ResourceId,
        source_subresource: u32,
        region: Option<ResourceRegion>,
        destination: ResourceId,
        destination_subresource: u32,
        destination_start: [u32; 3],
    ) -> Result<(), ResourceError>;

    /// Resolves a multisampled subresource into a single-sampled one.
    fn resolve_subresource(
        &mut self,
        source: ResourceId,
        source_subresource: u32,
        destination: ResourceId,
        destination_subresource: u32,
        format: GraphicsFormat,
    ) -> Result<(), ResourceError>;

    /// Clears a render-target view.
    fn clear_render_target(&mut self, view: ViewId, color: Color) -> Result<(), ResourceError>;

    /// Clears a depth-stencil view.
    fn clear_depth_stencil(&mut self, view: ViewId, depth: f32, stencil: u8) -> Result<(), ResourceError>;

    /// Generates the mip chain of a shader-resource view.
    fn generate_mips(&mut self, view: ViewId) -> Result<(), ResourceError>;

    /// Closes the recording of a deferred context.
    fn finish_command_list(&mut self) -> Result<CommandListId, ResourceError>;

    /// Replays a command list on an immediate context.
    fn execute_command_list(&mut self, list: CommandListId) -> Result<(), ResourceError>;

    /// Opens a named debug event.
    fn begin_event(&mut self, label: &str);

    /// Closes the innermost debug event.
    fn end_event(&mut self);

    /// Inserts a debug marker.
    fn set_marker(&mut self, label: &str);

    /// Resets every native binding to its default.
    fn clear_state(&mut self);

    /// Releases the native context. Called once when the owning queue is disposed.
    fn release(&mut self);
}
