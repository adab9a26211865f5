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

//! Deferred work applied to a resource at a well-defined point of the frame.
//!
//! Tasks are pooled: the queue acquires one from the device pool, fills it,
//! and the task goes back to the pool (cleared) once it has been processed
//! or discarded.

use super::api::{Color, ResourceKind, TaskPriority};
use super::error::ResourceError;
use super::queue::GraphicsQueue;
use super::resource::GraphicsResource;
use crate::utils::Poolable;
use std::sync::Arc;

/// What a [`ResourceTask`] does.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ResourceTaskKind {
    /// A pooled task carrying no work.
    #[default]
    Idle,
    /// Upload `data` at `offset`.
    SetData,
    /// Clear a render surface to `color`.
    ClearSurface,
    /// Clear a depth surface to `depth` and `stencil`.
    ClearDepth,
    /// Copy the whole target into `destination`.
    CopyTo,
    /// Resolve the multisampled target into `destination`.
    ResolveTo,
    /// Generate the mip chain of the target.
    GenerateMips,
}

/// A pooled unit of work on one resource.
#[derive(Debug, Default)]
pub struct ResourceTask {
    /// The operation.
    pub kind: ResourceTaskKind,
    /// When the task runs.
    pub priority: TaskPriority,
    /// The resource the task applies to.
    pub target: Option<Arc<GraphicsResource>>,
    /// Second resource of copy and resolve tasks.
    pub destination: Option<Arc<GraphicsResource>>,
    /// Payload of set-data tasks. Its capacity survives pooling.
    pub data: Vec<u8>,
    /// Byte offset of set-data tasks.
    pub offset: u64,
    /// Target subresource.
    pub subresource: u32,
    /// Destination subresource of resolve tasks.
    pub destination_subresource: u32,
    /// Clear color.
    pub color: Color,
    /// Clear depth.
    pub depth: f32,
    /// Clear stencil.
    pub stencil: u8,
}

impl Poolable for ResourceTask {
    fn clear_for_pool(&mut self) {
        self.kind = ResourceTaskKind::Idle;
        self.priority = TaskPriority::default();
        self.target = None;
        self.destination = None;
        self.data.clear();
        self.offset = 0;
        self.subresource = 0;
        self.destination_subresource = 0;
        self.color = Color::default();
        self.depth = 0.0;
        self.stencil = 0;
    }
}

impl ResourceTask {
    /// Checks the task can still run. A task failing validation is discarded.
    pub fn validate(&self) -> bool {
        let Some(target) = self.target.as_deref() else {
            log::trace!("Discarding {:?} task without target", self.kind);
            return false;
        };
        let Ok(handle) = target.handle() else {
            log::trace!("Discarding {:?} task: target was disposed", self.kind);
            return false;
        };

        match self.kind {
            ResourceTaskKind::Idle => false,
            ResourceTaskKind::SetData => self
                .offset
                .checked_add(self.data.len() as u64)
                .is_some_and(|end| end <= target.byte_size()),
            ResourceTaskKind::ClearSurface => handle.rtv.is_some(),
            ResourceTaskKind::ClearDepth => handle.dsv.is_some(),
            ResourceTaskKind::GenerateMips => handle.srv.is_some(),
            ResourceTaskKind::CopyTo => match self.live_destination() {
                Some(destination) => {
                    let same_size = destination.byte_size() == target.byte_size();
                    if !same_size {
                        log::trace!(
                            "Discarding copy: {} bytes into {} bytes",
                            target.byte_size(),
                            destination.byte_size()
                        );
                    }
                    same_size
                }
                None => false,
            },
            ResourceTaskKind::ResolveTo => self.live_destination().is_some(),
        }
    }

    fn live_destination(&self) -> Option<&GraphicsResource> {
        self.destination.as_deref().filter(|d| !d.is_disposed())
    }

    /// Runs the task on `queue`. Callers validate first.
    pub(crate) fn process(&self, queue: &mut GraphicsQueue) -> Result<(), ResourceError> {
        let target = self.target.as_ref().ok_or(ResourceError::Disposed)?;
        match self.kind {
            ResourceTaskKind::Idle => Ok(()),
            ResourceTaskKind::SetData => {
                queue.write_resource(target, self.subresource, self.offset, &self.data)
            }
            ResourceTaskKind::ClearSurface => {
                let view = target.handle()?.rtv.ok_or(ResourceError::Disposed)?;
                queue.native().clear_render_target(view, self.color)
            }
            ResourceTaskKind::ClearDepth => {
                let view = target.handle()?.dsv.ok_or(ResourceError::Disposed)?;
                queue
                    .native()
                    .clear_depth_stencil(view, self.depth, self.stencil)
            }
            ResourceTaskKind::GenerateMips => {
                let view = target.handle()?.srv.ok_or(ResourceError::Disposed)?;
                queue.native().generate_mips(view)
            }
            ResourceTaskKind::CopyTo => {
                let destination = self.destination.as_ref().ok_or(ResourceError::Disposed)?;
                queue.copy_handles(target, destination)
            }
            ResourceTaskKind::ResolveTo => {
                let destination = self.destination.as_ref().ok_or(ResourceError::Disposed)?;
                let format = match target.kind() {
                    ResourceKind::Texture { format, .. } => format,
                    ResourceKind::Buffer { .. } => Default::default(),
                };
                let source = target.handle()?.resource;
                let dest = destination.handle()?.resource;
                queue.native().resolve_subresource(
                    source,
                    self.subresource,
                    dest,
                    self.destination_subresource,
                    format,
                )
            }
        }
    }
}
