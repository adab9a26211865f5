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

//! The graphics device: queues, resource creation, VRAM accounting and the
//! frame boundary where deferred work is drained.

use super::api::{
    BlendStateDescriptor, BufferType, CommandQueueType, DepthStateDescriptor,
    GraphicsBackendType, GraphicsCapabilities, GraphicsFormat, GraphicsResourceFlags,
    GraphicsSettings, IndexFormat, RasterizerStateDescriptor, ResourceDescriptor, ResourceKind,
    SamplerDescriptor, StateDescriptor, TextureDimensions, TextureKind,
};
use super::backend::{NativeDevice, SwapChainDescriptor};
use super::command_list::FrameTracker;
use super::disposal::{DisposalItem, Disposer};
use super::error::{DeviceError, QueueError, ResourceError, ShaderError};
use super::handle::{SamplerId, StateObjectId};
use super::queue::GraphicsQueue;
use super::resource::GraphicsResource;
use super::segment::BufferSegment;
use super::shader::{self, Shader, ShaderDescriptor};
use super::state::{BlendState, DepthState, RasterizerState, Sampler, StateObject};
use super::surface::SwapChainSurface;
use super::task::ResourceTask;
use super::vertex::{VertexLayout, VertexLayoutId, VertexLayoutRegistry};
use super::vram::VramCounter;
use crate::telemetry::{VramProvider, VramReport};
use crate::utils::{lock, ObjectPool};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

static NEXT_DEVICE_ID: AtomicU64 = AtomicU64::new(1);

/// Recycled ids of deferred queues.
///
/// A released id goes back to a free list and is handed out again before the
/// id space grows.
#[derive(Debug, Default)]
pub(crate) struct QueueRegistry {
    live: Vec<bool>,
    free: Vec<u32>,
    count: u32,
    limit: Option<u32>,
}

impl QueueRegistry {
    pub(crate) fn new(limit: Option<u32>) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub(crate) fn acquire(&mut self) -> Result<u32, QueueError> {
        if let Some(limit) = self.limit {
            if self.count >= limit {
                return Err(QueueError::DeferredQueueLimit { limit });
            }
        }
        let id = match self.free.pop() {
            Some(id) => id,
            None => {
                self.live.push(false);
                (self.live.len() - 1) as u32
            }
        };
        self.live[id as usize] = true;
        self.count += 1;
        Ok(id)
    }

    pub(crate) fn release(&mut self, id: u32) {
        if let Some(live) = self.live.get_mut(id as usize) {
            if *live {
                *live = false;
                self.free.push(id);
                self.count -= 1;
            }
        }
    }

    pub(crate) fn count(&self) -> u32 {
        self.count
    }
}

/// State shared by the device, its queues, resources and surfaces.
pub(crate) struct DeviceShared {
    pub id: u64,
    pub native: Arc<dyn NativeDevice>,
    pub settings: GraphicsSettings,
    pub caps: GraphicsCapabilities,
    pub vram: VramCounter,
    pub disposer: Disposer,
    pub disposals: flume::Receiver<DisposalItem>,
    pub queues: Mutex<QueueRegistry>,
    pub frames: Mutex<FrameTracker>,
    pub start_of_frame: flume::Sender<ResourceTask>,
    pub start_of_frame_rx: flume::Receiver<ResourceTask>,
    pub task_pool: ObjectPool<ResourceTask>,
    pub segment_pool: ObjectPool<BufferSegment>,
    pub vertex_layouts: VertexLayoutRegistry,
    pub surfaces: Mutex<Vec<Weak<SwapChainSurface>>>,
    next_resource_key: AtomicU64,
    frame: AtomicU64,
}

impl DeviceShared {
    pub(crate) fn next_resource_key(&self) -> u64 {
        self.next_resource_key.fetch_add(1, Ordering::Relaxed)
    }
}

/// A graphics device: one immediate queue, any number of deferred queues,
/// and every object created on them.
pub struct GraphicsDevice {
    shared: Arc<DeviceShared>,
    immediate: Mutex<GraphicsQueue>,
}

impl GraphicsDevice {
    /// Creates a device on top of a native backend.
    pub fn new(native: Arc<dyn NativeDevice>, settings: GraphicsSettings) -> Result<Self, DeviceError> {
        let settings = settings.sanitized();
        let caps = native.capabilities();
        let (disposer, disposals) = Disposer::channel();
        let (start_of_frame, start_of_frame_rx) = flume::unbounded();

        let shared = Arc::new(DeviceShared {
            id: NEXT_DEVICE_ID.fetch_add(1, Ordering::Relaxed),
            native,
            caps,
            vram: VramCounter::new(),
            disposer,
            disposals,
            queues: Mutex::new(QueueRegistry::new(settings.max_deferred_queues)),
            frames: Mutex::new(FrameTracker::new(settings.frame_buffer_size)),
            start_of_frame,
            start_of_frame_rx,
            task_pool: ObjectPool::new(),
            segment_pool: ObjectPool::new(),
            vertex_layouts: VertexLayoutRegistry::default(),
            surfaces: Mutex::new(Vec::new()),
            next_resource_key: AtomicU64::new(1),
            frame: AtomicU64::new(0),
            settings,
        });

        let immediate = GraphicsQueue::new(shared.clone(), CommandQueueType::Immediate, None)?;
        log::info!(
            "Graphics device {} created on '{}' ({:?})",
            shared.id,
            shared.native.adapter_name(),
            shared.native.backend_type()
        );

        Ok(Self {
            shared,
            immediate: Mutex::new(immediate),
        })
    }

    /// Process-unique id of the device.
    pub fn id(&self) -> u64 {
        self.shared.id
    }

    /// The sanitized settings the device was created with.
    pub fn settings(&self) -> &GraphicsSettings {
        &self.shared.settings
    }

    /// Limits of the native device.
    pub fn capabilities(&self) -> &GraphicsCapabilities {
        &self.shared.caps
    }

    /// The API the device runs on.
    pub fn backend_type(&self) -> GraphicsBackendType {
        self.shared.native.backend_type()
    }

    /// Adapter name reported by the backend.
    pub fn adapter_name(&self) -> String {
        self.shared.native.adapter_name()
    }

    /// The native backend.
    pub fn native(&self) -> &Arc<dyn NativeDevice> {
        &self.shared.native
    }

    /// Index of the current frame, advanced by [`begin_frame`](Self::begin_frame).
    pub fn frame_index(&self) -> u64 {
        self.shared.frame.load(Ordering::Relaxed)
    }

    // --- Queues ---

    /// Locks the immediate queue.
    pub fn queue(&self) -> MutexGuard<'_, GraphicsQueue> {
        lock(&self.immediate)
    }

    /// Creates a deferred queue, reusing the most recently released id first.
    pub fn get_deferred_queue(&self) -> Result<GraphicsQueue, DeviceError> {
        let id = lock(&self.shared.queues).acquire()?;
        match GraphicsQueue::new(self.shared.clone(), CommandQueueType::Deferred, Some(id)) {
            Ok(queue) => {
                log::debug!("Allocated deferred queue {id}");
                Ok(queue)
            }
            Err(err) => {
                lock(&self.shared.queues).release(id);
                Err(err)
            }
        }
    }

    /// Releases a deferred queue's native context and recycles its id.
    ///
    /// ## Errors
    /// * [`QueueError::RemoveImmediateQueue`] for the immediate queue.
    /// * [`QueueError::ForeignQueue`] for a queue of another device.
    /// * [`QueueError::QueueAlreadyDisposed`] when removed twice.
    pub fn remove_deferred_queue(&self, queue: &mut GraphicsQueue) -> Result<(), QueueError> {
        if queue.is_immediate() {
            return Err(QueueError::RemoveImmediateQueue);
        }
        if queue.device_id() != self.shared.id {
            return Err(QueueError::ForeignQueue);
        }
        if queue.is_disposed() {
            return Err(QueueError::QueueAlreadyDisposed);
        }
        queue.dispose();
        Ok(())
    }

    /// Ends a deferred queue's recording and executes the list on the immediate queue.
    pub fn submit(&self, queue: &mut GraphicsQueue) -> Result<(), QueueError> {
        if queue.is_immediate() {
            return Err(QueueError::SubmitImmediateQueue);
        }
        if queue.device_id() != self.shared.id {
            return Err(QueueError::ForeignQueue);
        }
        if queue.is_disposed() {
            return Err(QueueError::QueueAlreadyDisposed);
        }
        match queue.end()? {
            Some(list) => self.queue().execute(list),
            None => Ok(()),
        }
    }

    /// Number of live deferred queues.
    pub fn deferred_queue_count(&self) -> u32 {
        lock(&self.shared.queues).count()
    }

    // --- VRAM ---

    /// Adds `bytes` to the VRAM counter. Safe from any thread.
    pub fn allocate_vram(&self, bytes: u64) -> i64 {
        self.shared.vram.allocate(bytes)
    }

    /// Subtracts `bytes` from the VRAM counter. Safe from any thread.
    pub fn deallocate_vram(&self, bytes: u64) -> i64 {
        self.shared.vram.deallocate(bytes)
    }

    /// Bytes currently accounted for.
    pub fn allocated_vram(&self) -> i64 {
        self.shared.vram.current()
    }

    // --- Frame boundary ---

    /// Queues a native object for release at the next [`dispose_marked_objects`](Self::dispose_marked_objects).
    pub fn mark_for_disposal(&self, item: DisposalItem) {
        self.shared.disposer.mark(item);
    }

    /// Releases every marked native object. Returns how many were processed.
    pub fn dispose_marked_objects(&self) -> usize {
        let mut count = 0;
        for item in self.shared.disposals.try_iter() {
            match item.release(self.shared.native.as_ref()) {
                Ok(bytes) => {
                    if bytes > 0 {
                        self.shared.vram.deallocate(bytes);
                    }
                }
                Err(err) => log::error!("Failed to release {:?}: {}", item, err),
            }
            count += 1;
        }
        if count > 0 {
            log::debug!("Disposed {count} native object(s)");
        }
        count
    }

    /// Starts a new frame: recycles the oldest command-list slot and runs
    /// every `StartOfFrame` task on the immediate queue.
    ///
    /// Returns the number of tasks processed (discarded ones excluded).
    pub fn begin_frame(&self) -> usize {
        let frame = self.shared.frame.fetch_add(1, Ordering::Relaxed) + 1;
        let released = lock(&self.shared.frames).advance();
        if released > 0 {
            log::trace!("Frame {frame}: {released} command list(s) left the frame tracker");
        }

        let mut queue = self.queue();
        let mut processed = 0;
        for task in self.shared.start_of_frame_rx.try_iter() {
            if queue.run_task(task) {
                processed += 1;
            }
        }
        processed
    }

    /// Presents every enabled surface, then releases marked objects.
    pub fn present(&self) {
        let surfaces: Vec<Arc<SwapChainSurface>> = {
            let mut list = lock(&self.shared.surfaces);
            list.retain(|s| s.strong_count() > 0);
            list.iter().filter_map(Weak::upgrade).collect()
        };
        for surface in surfaces.iter().filter(|s| s.is_enabled()) {
            surface.present();
        }
        self.dispose_marked_objects();
    }

    /// Number of tasks waiting for the next [`begin_frame`](Self::begin_frame).
    pub fn pending_start_of_frame_tasks(&self) -> usize {
        self.shared.start_of_frame_rx.len()
    }

    /// Number of recycled tasks waiting in the pool.
    pub fn pooled_tasks(&self) -> usize {
        self.shared.task_pool.available()
    }

    // --- Resources ---

    /// Creates a buffer or texture from a raw descriptor.
    pub fn create_resource(
        &self,
        descriptor: ResourceDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        GraphicsResource::create(&self.shared, descriptor, initial_data, None)
    }

    /// Creates a buffer.
    ///
    /// Vertex and index buffers never get a shader-resource view. Staging
    /// buffers are GPU-writable copy targets and only keep the CPU flags of
    /// `flags`.
    pub fn create_buffer(
        &self,
        label: Option<&str>,
        buffer_type: BufferType,
        stride: u32,
        element_count: u32,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        self.buffer(label, buffer_type, stride, element_count, flags, initial_data, None)
    }

    #[allow(clippy::too_many_arguments)]
    fn buffer(
        &self,
        label: Option<&str>,
        buffer_type: BufferType,
        stride: u32,
        element_count: u32,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
        vertex_layout: Option<VertexLayoutId>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        let flags = match buffer_type {
            BufferType::Vertex | BufferType::Index => {
                flags | GraphicsResourceFlags::DENY_SHADER_ACCESS
            }
            BufferType::Staging => {
                (flags & (GraphicsResourceFlags::CPU_READ | GraphicsResourceFlags::CPU_WRITE))
                    | GraphicsResourceFlags::GPU_WRITE
                    | GraphicsResourceFlags::DENY_SHADER_ACCESS
            }
            BufferType::Constant | BufferType::Structured => flags,
        };
        let descriptor = ResourceDescriptor {
            label: label.map(str::to_string),
            kind: ResourceKind::Buffer {
                buffer_type,
                stride,
                element_count,
            },
            flags,
        };
        GraphicsResource::create(&self.shared, descriptor, initial_data, vertex_layout)
    }

    /// Creates a vertex buffer of `vertex_count` vertices laid out as `layout`.
    pub fn create_vertex_buffer(
        &self,
        label: Option<&str>,
        layout: VertexLayout,
        vertex_count: u32,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        let stride = layout.stride();
        let layout_id = self.register_vertex_layout(layout);
        self.buffer(
            label,
            BufferType::Vertex,
            stride,
            vertex_count,
            flags,
            initial_data,
            Some(layout_id),
        )
    }

    /// Creates an index buffer.
    pub fn create_index_buffer(
        &self,
        label: Option<&str>,
        format: IndexFormat,
        index_count: u32,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        self.create_buffer(label, BufferType::Index, format.size(), index_count, flags, initial_data)
    }

    /// Creates a constant buffer of at least `byte_size` bytes, rounded up to 16.
    pub fn create_constant_buffer(
        &self,
        label: Option<&str>,
        byte_size: u32,
        flags: GraphicsResourceFlags,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        let size = byte_size
            .div_ceil(16)
            .checked_mul(16)
            .ok_or(ResourceError::OutOfBounds {
                offset: 0,
                len: byte_size as u64,
                capacity: u32::MAX as u64,
            })?;
        self.create_buffer(label, BufferType::Constant, size, 1, flags, None)
    }

    /// Creates a structured buffer.
    pub fn create_structured_buffer(
        &self,
        label: Option<&str>,
        stride: u32,
        element_count: u32,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        self.create_buffer(label, BufferType::Structured, stride, element_count, flags, initial_data)
    }

    /// Creates a byte-addressed staging buffer for CPU readback or upload.
    pub fn create_staging_buffer(
        &self,
        cpu_read: bool,
        cpu_write: bool,
        byte_size: u32,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        let mut flags = GraphicsResourceFlags::EMPTY;
        flags.set(GraphicsResourceFlags::CPU_READ, cpu_read);
        flags.set(GraphicsResourceFlags::CPU_WRITE, cpu_write);
        self.create_buffer(Some("staging"), BufferType::Staging, 1, byte_size, flags, None)
    }

    /// Creates a texture. Textures are always GPU-readable.
    pub fn create_texture(
        &self,
        label: Option<&str>,
        kind: TextureKind,
        dimensions: TextureDimensions,
        format: GraphicsFormat,
        flags: GraphicsResourceFlags,
        initial_data: Option<&[u8]>,
    ) -> Result<Arc<GraphicsResource>, ResourceError> {
        let descriptor = ResourceDescriptor {
            label: label.map(str::to_string),
            kind: ResourceKind::Texture {
                kind,
                dimensions,
                format,
            },
            flags: flags | GraphicsResourceFlags::GPU_READ,
        };
        GraphicsResource::create(&self.shared, descriptor, initial_data, None)
    }

    /// Carves a segment out of `parent`.
    ///
    /// ## Errors
    /// [`ResourceError::OutOfBounds`] when the range exceeds the parent.
    pub fn acquire_buffer_segment(
        &self,
        parent: &Arc<GraphicsResource>,
        byte_offset: u32,
        byte_count: u32,
        stride: u32,
    ) -> Result<BufferSegment, ResourceError> {
        let end = byte_offset as u64 + byte_count as u64;
        if end > parent.byte_size() {
            return Err(ResourceError::OutOfBounds {
                offset: byte_offset as u64,
                len: byte_count as u64,
                capacity: parent.byte_size(),
            });
        }
        let mut segment = self.shared.segment_pool.acquire();
        segment.parent = Some(parent.clone());
        segment.byte_offset = byte_offset;
        segment.byte_count = byte_count;
        segment.stride = stride;
        Ok(segment)
    }

    /// Returns a segment to the pool.
    pub fn recycle_buffer_segment(&self, segment: BufferSegment) {
        self.shared.segment_pool.release(segment);
    }

    /// Number of recycled segments waiting in the pool.
    pub fn pooled_segments(&self) -> usize {
        self.shared.segment_pool.available()
    }

    // --- Pipeline objects ---

    /// Interns a vertex layout; equal layouts share one id.
    pub fn register_vertex_layout(&self, layout: VertexLayout) -> VertexLayoutId {
        self.shared.vertex_layouts.intern(layout)
    }

    /// The layout behind an id.
    pub fn vertex_layout(&self, id: VertexLayoutId) -> Option<Arc<VertexLayout>> {
        self.shared.vertex_layouts.get(id)
    }

    /// Creates a sampler.
    pub fn create_sampler(&self, descriptor: SamplerDescriptor) -> Result<Arc<Sampler>, ResourceError> {
        let id: SamplerId = self.shared.native.create_sampler(&descriptor)?;
        Ok(Arc::new(Sampler::new(id, descriptor, self.shared.disposer.clone())))
    }

    fn state_object<D>(
        &self,
        descriptor: D,
        wrap: fn(D) -> StateDescriptor,
        unwrap: fn(StateDescriptor) -> Option<D>,
    ) -> Result<Arc<StateObject<D>>, ResourceError> {
        let native = wrap(descriptor);
        let id: StateObjectId = self.shared.native.create_state_object(&native)?;
        let descriptor = unwrap(native).ok_or_else(|| {
            ResourceError::BackendError("state descriptor kind changed".to_string())
        })?;
        Ok(Arc::new(StateObject::new(id, descriptor, self.shared.disposer.clone())))
    }

    /// Creates a blend state.
    pub fn create_blend_state(
        &self,
        descriptor: BlendStateDescriptor,
    ) -> Result<Arc<BlendState>, ResourceError> {
        self.state_object(descriptor, StateDescriptor::Blend, |d| match d {
            StateDescriptor::Blend(d) => Some(d),
            _ => None,
        })
    }

    /// Creates a rasterizer state.
    pub fn create_rasterizer_state(
        &self,
        descriptor: RasterizerStateDescriptor,
    ) -> Result<Arc<RasterizerState>, ResourceError> {
        self.state_object(descriptor, StateDescriptor::Rasterizer, |d| match d {
            StateDescriptor::Rasterizer(d) => Some(d),
            _ => None,
        })
    }

    /// Creates a depth-stencil state.
    pub fn create_depth_state(
        &self,
        descriptor: DepthStateDescriptor,
    ) -> Result<Arc<DepthState>, ResourceError> {
        self.state_object(descriptor, StateDescriptor::Depth, |d| match d {
            StateDescriptor::Depth(d) => Some(d),
            _ => None,
        })
    }

    /// Creates a shader: validates every pass, then creates one native
    /// program per declared stage.
    pub fn create_shader(&self, descriptor: ShaderDescriptor) -> Result<Arc<Shader>, ShaderError> {
        for pass in &descriptor.passes {
            shader::validate_pass(pass, &self.shared.caps)?;
        }

        let mut programs = Vec::with_capacity(descriptor.passes.len());
        for pass in &descriptor.passes {
            let mut ids = Vec::with_capacity(pass.stages.len());
            for stage in &pass.stages {
                let label = format!("{}/{}/{}", descriptor.name, pass.name, stage.stage);
                match self
                    .shared
                    .native
                    .create_shader_program(stage.stage, &stage.bytecode, Some(&label))
                {
                    Ok(id) => ids.push(id),
                    Err(err) => {
                        for id in programs.iter().flatten().chain(ids.iter()) {
                            self.shared.disposer.mark(DisposalItem::ShaderProgram(*id));
                        }
                        return Err(err);
                    }
                }
            }
            programs.push(ids);
        }

        Ok(Arc::new(shader::assemble(
            descriptor,
            programs,
            &self.shared.disposer,
        )))
    }

    /// Creates a swap chain and the surface presenting it.
    pub fn create_swap_chain_surface(
        &self,
        descriptor: SwapChainDescriptor,
    ) -> Result<Arc<SwapChainSurface>, DeviceError> {
        let surface = SwapChainSurface::new(&self.shared, descriptor)?;
        lock(&self.shared.surfaces).push(Arc::downgrade(&surface));
        Ok(surface)
    }
}

impl VramProvider for GraphicsDevice {
    fn vram_report(&self) -> VramReport {
        VramReport {
            current_usage_bytes: self.shared.vram.current().max(0) as u64,
            peak_usage_bytes: self.shared.vram.peak().max(0) as u64,
            total_capacity_bytes: None,
        }
    }
}

impl fmt::Debug for GraphicsDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsDevice")
            .field("id", &self.shared.id)
            .field("backend", &self.shared.native.backend_type())
            .field("settings", &self.shared.settings)
            .finish()
    }
}

impl Drop for GraphicsDevice {
    fn drop(&mut self) {
        // Queued tasks hold resources, which hold the shared state.
        for task in self.shared.start_of_frame_rx.try_iter() {
            self.shared.task_pool.release(task);
        }
        lock(&self.shared.frames).clear();
        lock(&self.immediate).dispose();
        let disposed = self.dispose_marked_objects();
        log::info!(
            "Graphics device {} destroyed ({} object(s) released on shutdown)",
            self.shared.id,
            disposed
        );
    }
}
