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

//! The command queue: binding-state tracking, pass execution and resource
//! operations on top of one native context.
//!
//! A queue is either the device's single immediate queue or one of its
//! deferred queues. Native contexts are not thread-safe, so a queue is `Send`
//! but only ever driven by one thread at a time.

mod data;
mod pass;
mod state;

pub use self::data::MappedResource;

use self::state::{IndexStream, QueueState, VertexStream};
use super::api::{CommandListFlags, CommandQueueType, Rect, ShaderStageType, Viewport};
use super::backend::NativeContext;
use super::command_list::CommandList;
use super::device::DeviceShared;
use super::disposal::DisposalItem;
use super::error::{DeviceError, QueueError};
use super::resource::GraphicsResource;
use super::segment::BufferSegment;
use super::stage::{ShaderStage, StageBindings};
use super::vertex::{CachedInputLayout, InputLayoutKey};
use crate::telemetry::QueueStats;
use crate::utils::lock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// A command queue bound to one native context.
pub struct GraphicsQueue {
    device: Arc<DeviceShared>,
    queue_type: CommandQueueType,
    deferred_id: Option<u32>,
    ctx: Box<dyn NativeContext>,
    state: QueueState,
    recording: bool,
    flags: CommandListFlags,
    layouts: HashMap<InputLayoutKey, CachedInputLayout>,
    scratch: StageBindings,
    stats: QueueStats,
    disposed: bool,
}

impl GraphicsQueue {
    pub(crate) fn new(
        device: Arc<DeviceShared>,
        queue_type: CommandQueueType,
        deferred_id: Option<u32>,
    ) -> Result<Self, DeviceError> {
        let ctx = device.native.create_context(queue_type)?;
        let state = QueueState::new(&device.caps);
        Ok(Self {
            device,
            queue_type,
            deferred_id,
            ctx,
            state,
            recording: false,
            flags: CommandListFlags::EMPTY,
            layouts: HashMap::new(),
            scratch: StageBindings::default(),
            stats: QueueStats::default(),
            disposed: false,
        })
    }

    /// Immediate or deferred.
    pub fn queue_type(&self) -> CommandQueueType {
        self.queue_type
    }

    /// `true` for the device's immediate queue.
    pub fn is_immediate(&self) -> bool {
        self.queue_type == CommandQueueType::Immediate
    }

    /// Recycled id of a deferred queue; `None` for the immediate queue.
    pub fn deferred_id(&self) -> Option<u32> {
        self.deferred_id
    }

    /// Id of the owning device.
    pub fn device_id(&self) -> u64 {
        self.device.id
    }

    /// `true` between [`begin`](Self::begin) and [`end`](Self::end).
    pub fn is_recording(&self) -> bool {
        self.recording
    }

    /// `true` once the queue's native context was released.
    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    /// Flags given to the current or last [`begin`](Self::begin).
    pub fn flags(&self) -> CommandListFlags {
        self.flags
    }

    /// Native call counters.
    pub fn stats(&self) -> &QueueStats {
        &self.stats
    }

    /// Zeroes the native call counters.
    pub fn reset_stats(&mut self) {
        self.stats.reset();
    }

    /// Binding state of one pipeline stage.
    pub fn stage(&self, kind: ShaderStageType) -> &ShaderStage {
        self.state.stage(kind)
    }

    /// Number of input layouts memoized by this queue.
    pub fn cached_input_layouts(&self) -> usize {
        self.layouts.len()
    }

    pub(crate) fn native(&mut self) -> &mut dyn NativeContext {
        self.ctx.as_mut()
    }

    /// Starts recording.
    ///
    /// Every tracked binding is forgotten and the native context is cleared,
    /// so the first pass re-sends its full state.
    ///
    /// ## Errors
    /// * [`QueueError::AlreadyRecording`] if `begin` was already called.
    /// * [`QueueError::DeferredFlagOnImmediate`] for `DEFERRED` on the immediate queue.
    pub fn begin(&mut self, flags: CommandListFlags) -> Result<(), QueueError> {
        if self.disposed {
            return Err(QueueError::QueueAlreadyDisposed);
        }
        if self.recording {
            return Err(QueueError::AlreadyRecording);
        }
        if self.is_immediate() && flags.contains(CommandListFlags::DEFERRED) {
            return Err(QueueError::DeferredFlagOnImmediate);
        }
        self.flags = flags;
        self.recording = true;
        self.reset_state();
        Ok(())
    }

    /// Stops recording. A deferred queue returns its command list.
    pub fn end(&mut self) -> Result<Option<CommandList>, QueueError> {
        if !self.recording {
            return Err(QueueError::NotRecording);
        }
        self.recording = false;
        if self.is_immediate() {
            return Ok(None);
        }

        let id = self.ctx.finish_command_list()?;
        log::trace!(
            "Deferred queue {:?} finished command list {:?}",
            self.deferred_id,
            id
        );
        Ok(Some(CommandList::new(
            id,
            self.flags,
            self.device.id,
            self.deferred_id,
            self.device.disposer.clone(),
        )))
    }

    /// Replays a deferred command list. Only the immediate queue executes lists.
    ///
    /// After the call the device tracks the list until the GPU is done with it.
    pub fn execute(&mut self, list: CommandList) -> Result<(), QueueError> {
        if !self.is_immediate() {
            return Err(QueueError::ExecuteOnDeferredQueue);
        }
        if list.device_id() != self.device.id {
            return Err(QueueError::ForeignCommandList);
        }
        if !list.is_deferred() {
            return Err(QueueError::ExecuteNonDeferredList);
        }

        self.ctx.execute_command_list(list.id())?;
        // Replaying a list leaves the native context in its default state.
        self.state.invalidate();
        lock(&self.device.frames).track(list);
        Ok(())
    }

    /// Clears the native context and forgets every tracked binding.
    pub fn reset_state(&mut self) {
        self.ctx.clear_state();
        self.state.invalidate();
        self.state.clear_requests();
    }

    /// Requests a vertex buffer for an input slot. `None` clears the slot.
    ///
    /// Slots beyond the device's vertex-buffer count are ignored with a warning.
    pub fn set_vertex_buffer(&mut self, slot: u32, buffer: Option<&Arc<GraphicsResource>>, offset: u32) {
        let stream = buffer.map(|resource| VertexStream {
            resource: resource.clone(),
            offset,
            stride: resource.stride(),
        });
        self.set_vertex_stream(slot, stream);
    }

    /// Requests a buffer segment as the vertex buffer of an input slot.
    pub fn set_vertex_segment(&mut self, slot: u32, segment: &BufferSegment) {
        let stream = segment.parent.as_ref().map(|parent| VertexStream {
            resource: parent.clone(),
            offset: segment.byte_offset,
            stride: segment.stride,
        });
        self.set_vertex_stream(slot, stream);
    }

    fn set_vertex_stream(&mut self, slot: u32, stream: Option<VertexStream>) {
        match self.state.vertex_streams.get_mut(slot as usize) {
            Some(entry) => *entry = stream,
            None => log::warn!("Ignoring vertex buffer for slot {slot}: out of range"),
        }
    }

    /// Requests the index buffer. `None` unbinds it.
    pub fn set_index_buffer(&mut self, buffer: Option<&Arc<GraphicsResource>>, offset: u32) {
        self.state.index_stream = buffer.map(|resource| IndexStream {
            resource: resource.clone(),
            offset,
        });
    }

    /// Requests the render surface of one output slot.
    pub fn set_render_surface(&mut self, slot: u32, surface: Option<&Arc<GraphicsResource>>) {
        match self.state.render_surfaces.get_mut(slot as usize) {
            Some(entry) => *entry = surface.cloned(),
            None => log::warn!("Ignoring render surface for slot {slot}: out of range"),
        }
    }

    /// Requests the depth surface.
    pub fn set_depth_surface(&mut self, surface: Option<&Arc<GraphicsResource>>) {
        self.state.depth_surface = surface.cloned();
    }

    /// Replaces the viewports. Applied by the next pass.
    pub fn set_viewports(&mut self, viewports: &[Viewport]) {
        self.state.viewports.set_all(viewports);
    }

    /// Replaces the scissor rectangles. Applied by the next pass.
    pub fn set_scissor_rects(&mut self, rects: &[Rect]) {
        self.state.scissor_rects.set_all(rects);
    }

    /// Opens a named debug event.
    pub fn begin_event(&mut self, label: &str) {
        self.ctx.begin_event(label);
    }

    /// Closes the innermost debug event.
    pub fn end_event(&mut self) {
        self.ctx.end_event();
    }

    /// Inserts a debug marker.
    pub fn set_marker(&mut self, label: &str) {
        self.ctx.set_marker(label);
    }

    /// Releases the native context and every cached input layout.
    pub(crate) fn dispose(&mut self) {
        if self.disposed {
            return;
        }
        self.disposed = true;
        self.recording = false;
        for layout in self.layouts.drain().filter_map(|(_, cached)| cached.native) {
            self.device.disposer.mark(DisposalItem::InputLayout(layout));
        }
        self.ctx.release();
        if let Some(id) = self.deferred_id {
            lock(&self.device.queues).release(id);
            log::debug!("Released deferred queue {id}");
        }
    }
}

impl fmt::Debug for GraphicsQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GraphicsQueue")
            .field("queue_type", &self.queue_type)
            .field("deferred_id", &self.deferred_id)
            .field("device_id", &self.device.id)
            .field("recording", &self.recording)
            .field("disposed", &self.disposed)
            .finish()
    }
}

impl Drop for GraphicsQueue {
    fn drop(&mut self) {
        self.dispose();
    }
}
