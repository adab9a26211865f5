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

//! GPU buffers and textures.

use super::api::{
    BufferType, GraphicsResourceFlags, IndexFormat, ResourceDescriptor, ResourceKind,
    TextureDimensions,
};
use super::device::DeviceShared;
use super::disposal::DisposalItem;
use super::error::ResourceError;
use super::handle::ResourceHandle;
use super::task::ResourceTask;
use super::vertex::VertexLayoutId;
use crate::utils::{lock, read, write};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, RwLock};

#[derive(Debug)]
struct ResourceState {
    kind: ResourceKind,
    handle: Option<ResourceHandle>,
}

/// A GPU-visible buffer or texture.
///
/// The native handle, and every view it owns, belongs exclusively to this
/// object. Dropping the last reference (or calling [`dispose`](Self::dispose))
/// marks the handle for release at the next frame boundary; the native
/// object outlives any command list that may still reference it.
pub struct GraphicsResource {
    key: u64,
    label: Option<String>,
    flags: GraphicsResourceFlags,
    vertex_layout: Option<VertexLayoutId>,
    owned: bool,
    state: RwLock<ResourceState>,
    pending: Mutex<VecDeque<ResourceTask>>,
    device: Arc<DeviceShared>,
}

impl GraphicsResource {
    pub(crate) fn create(
        device: &Arc<DeviceShared>,
        descriptor: ResourceDescriptor,
        initial_data: Option<&[u8]>,
        vertex_layout: Option<VertexLayoutId>,
    ) -> Result<Arc<Self>, ResourceError> {
        let bytes = descriptor.kind.byte_size();
        if let Some(data) = initial_data {
            if data.len() as u64 > bytes {
                return Err(ResourceError::OutOfBounds {
                    offset: 0,
                    len: data.len() as u64,
                    capacity: bytes,
                });
            }
        }

        let handle = device.native.create_resource(&descriptor, initial_data)?;
        device.vram.allocate(bytes);
        log::trace!(
            "Created resource {:?} ({} bytes, {:?})",
            descriptor.label,
            bytes,
            descriptor.flags
        );

        Ok(Arc::new(Self {
            key: device.next_resource_key(),
            label: descriptor.label,
            flags: descriptor.flags,
            vertex_layout,
            owned: true,
            state: RwLock::new(ResourceState {
                kind: descriptor.kind,
                handle: Some(handle),
            }),
            pending: Mutex::new(VecDeque::new()),
            device: device.clone(),
        }))
    }

    /// Wraps a handle owned by someone else (a swap-chain back buffer). The
    /// handle is neither released nor counted in VRAM.
    pub(crate) fn external(
        device: &Arc<DeviceShared>,
        descriptor: ResourceDescriptor,
        handle: ResourceHandle,
    ) -> Arc<Self> {
        Arc::new(Self {
            key: device.next_resource_key(),
            label: descriptor.label,
            flags: descriptor.flags,
            vertex_layout: None,
            owned: false,
            state: RwLock::new(ResourceState {
                kind: descriptor.kind,
                handle: Some(handle),
            }),
            pending: Mutex::new(VecDeque::new()),
            device: device.clone(),
        })
    }

    /// Device-unique key of the resource.
    pub fn key(&self) -> u64 {
        self.key
    }

    /// Debug name.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// Access and usage flags.
    pub fn flags(&self) -> GraphicsResourceFlags {
        self.flags
    }

    /// Current shape; changes on resize.
    pub fn kind(&self) -> ResourceKind {
        read(&self.state).kind
    }

    /// Current byte size.
    pub fn byte_size(&self) -> u64 {
        self.kind().byte_size()
    }

    /// Bytes per element.
    pub fn stride(&self) -> u32 {
        self.kind().stride()
    }

    /// Number of elements of a buffer. Zero for textures.
    pub fn element_count(&self) -> u32 {
        match self.kind() {
            ResourceKind::Buffer { element_count, .. } => element_count,
            ResourceKind::Texture { .. } => 0,
        }
    }

    /// The buffer role, if this is a buffer.
    pub fn buffer_type(&self) -> Option<BufferType> {
        self.kind().buffer_type()
    }

    /// Index format of an index buffer.
    pub fn index_format(&self) -> Option<IndexFormat> {
        self.kind().index_format()
    }

    /// Interned layout of a vertex buffer.
    pub fn vertex_layout(&self) -> Option<VertexLayoutId> {
        self.vertex_layout
    }

    /// `true` once the native handle was released or marked for release.
    pub fn is_disposed(&self) -> bool {
        read(&self.state).handle.is_none()
    }

    /// The native handle and its views.
    pub fn handle(&self) -> Result<ResourceHandle, ResourceError> {
        read(&self.state).handle.ok_or(ResourceError::Disposed)
    }

    /// A descriptor that would re-create the resource at its current size.
    pub fn descriptor(&self) -> ResourceDescriptor {
        ResourceDescriptor {
            label: self.label.clone(),
            kind: self.kind(),
            flags: self.flags,
        }
    }

    fn disposal_item(&self, handle: ResourceHandle, kind: &ResourceKind) -> Option<DisposalItem> {
        self.owned.then(|| DisposalItem::Resource {
            handle,
            bytes: kind.byte_size(),
        })
    }

    /// Marks the native handle for release at the next frame boundary.
    ///
    /// ## Errors
    /// [`ResourceError::Disposed`] if the resource was already disposed.
    pub fn dispose(&self) -> Result<(), ResourceError> {
        let mut state = write(&self.state);
        let handle = state.handle.take().ok_or(ResourceError::Disposed)?;
        if let Some(item) = self.disposal_item(handle, &state.kind) {
            self.device.disposer.mark(item);
        }
        Ok(())
    }

    /// Releases the native handle right away. Only safe when no command list
    /// in flight references the resource.
    pub fn dispose_immediately(&self) -> Result<(), ResourceError> {
        let mut state = write(&self.state);
        let handle = state.handle.take().ok_or(ResourceError::Disposed)?;
        if self.owned {
            self.device.native.release_resource(&handle)?;
            self.device.vram.deallocate(state.kind.byte_size());
        }
        Ok(())
    }

    /// Re-creates a buffer with a new element count. The previous contents are lost.
    pub fn resize_buffer(&self, element_count: u32) -> Result<(), ResourceError> {
        let kind = match self.kind() {
            ResourceKind::Buffer {
                buffer_type,
                stride,
                ..
            } => ResourceKind::Buffer {
                buffer_type,
                stride,
                element_count,
            },
            ResourceKind::Texture { .. } => {
                return Err(ResourceError::BackendError(
                    "resize_buffer called on a texture".to_string(),
                ))
            }
        };
        self.recreate(kind)
    }

    /// Re-creates a texture with new dimensions. The previous contents are lost.
    pub fn resize_texture(&self, dimensions: TextureDimensions) -> Result<(), ResourceError> {
        let kind = match self.kind() {
            ResourceKind::Texture { kind, format, .. } => ResourceKind::Texture {
                kind,
                dimensions,
                format,
            },
            ResourceKind::Buffer { .. } => {
                return Err(ResourceError::BackendError(
                    "resize_texture called on a buffer".to_string(),
                ))
            }
        };
        self.recreate(kind)
    }

    fn recreate(&self, kind: ResourceKind) -> Result<(), ResourceError> {
        let mut state = write(&self.state);
        let old = state.handle.ok_or(ResourceError::Disposed)?;
        if state.kind == kind {
            return Ok(());
        }

        let descriptor = ResourceDescriptor {
            label: self.label.clone(),
            kind,
            flags: self.flags,
        };
        let handle = self.device.native.create_resource(&descriptor, None)?;
        self.device.vram.allocate(kind.byte_size());

        if let Some(item) = self.disposal_item(old, &state.kind) {
            self.device.disposer.mark(item);
        }
        log::debug!(
            "Resized resource {:?}: {} -> {} bytes",
            self.label,
            state.kind.byte_size(),
            kind.byte_size()
        );
        state.kind = kind;
        state.handle = Some(handle);
        Ok(())
    }

    /// Swaps in a new externally owned handle, e.g. after a swap-chain resize.
    pub(crate) fn replace_handle(&self, handle: ResourceHandle, kind: ResourceKind) {
        let mut state = write(&self.state);
        state.kind = kind;
        state.handle = Some(handle);
    }

    /// Queues an `Apply` task. The task is stored without its target, which
    /// is re-attached when the queue drains it.
    pub(crate) fn push_task(&self, mut task: ResourceTask) {
        task.target = None;
        lock(&self.pending).push_back(task);
    }

    /// Number of `Apply` tasks waiting for this resource.
    pub fn pending_tasks(&self) -> usize {
        lock(&self.pending).len()
    }

    pub(crate) fn take_pending(&self, into: &mut Vec<ResourceTask>) {
        let mut pending = lock(&self.pending);
        if !pending.is_empty() {
            into.extend(pending.drain(..));
        }
    }
}

impl fmt::Debug for GraphicsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = read(&self.state);
        f.debug_struct("GraphicsResource")
            .field("key", &self.key)
            .field("label", &self.label)
            .field("flags", &self.flags)
            .field("kind", &state.kind)
            .field("handle", &state.handle)
            .finish()
    }
}

impl Drop for GraphicsResource {
    fn drop(&mut self) {
        let state = match self.state.get_mut() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(handle) = state.handle.take() {
            if self.owned {
                self.device.disposer.mark(DisposalItem::Resource {
                    handle,
                    bytes: state.kind.byte_size(),
                });
            }
        }
        let pending = match self.pending.get_mut() {
            Ok(pending) => pending,
            Err(poisoned) => poisoned.into_inner(),
        };
        for task in pending.drain(..) {
            self.device.task_pool.release(task);
        }
    }
}
