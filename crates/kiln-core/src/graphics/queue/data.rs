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

//! Mapping, copies and resource tasks.

use super::GraphicsQueue;
use crate::graphics::api::{
    Color, GraphicsResourceFlags, MapType, NativeMapMode, ResourceKind, ResourceRegion,
    TaskPriority,
};
use crate::graphics::backend::NativeContext;
use crate::graphics::error::ResourceError;
use crate::graphics::handle::ResourceId;
use crate::graphics::resource::GraphicsResource;
use crate::graphics::task::{ResourceTask, ResourceTaskKind};
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// Picks the native mapping mode for a CPU access request.
fn native_map_mode(
    flags: GraphicsResourceFlags,
    kind: &ResourceKind,
    map_type: MapType,
) -> Result<NativeMapMode, ResourceError> {
    match map_type {
        MapType::Read => {
            if !flags.contains(GraphicsResourceFlags::CPU_READ) {
                return Err(ResourceError::CpuReadDenied);
            }
            Ok(NativeMapMode::Read)
        }
        MapType::Write | MapType::Discard => {
            if !flags.contains(GraphicsResourceFlags::CPU_WRITE) {
                return Err(ResourceError::CpuWriteDenied);
            }
            if map_type == MapType::Discard {
                Ok(NativeMapMode::WriteDiscard)
            } else if kind.is_geometry_buffer() || flags.is_cpu_write_only() {
                Ok(NativeMapMode::WriteNoOverwrite)
            } else {
                Ok(NativeMapMode::Write)
            }
        }
    }
}

fn check_bounds(offset: u64, len: usize, capacity: u64) -> Result<(), ResourceError> {
    let len = len as u64;
    match offset.checked_add(len) {
        Some(end) if end <= capacity => Ok(()),
        _ => Err(ResourceError::OutOfBounds {
            offset,
            len,
            capacity,
        }),
    }
}

/// A mapped subresource. Writes are committed on [`unmap`](Self::unmap) or drop.
pub struct MappedResource<'a> {
    ctx: &'a mut dyn NativeContext,
    resource: ResourceId,
    subresource: u32,
    writable: bool,
    data: Vec<u8>,
    unmapped: bool,
}

impl MappedResource<'_> {
    /// `true` when the mapping commits writes.
    pub fn is_writable(&self) -> bool {
        self.writable
    }

    /// Unmaps the subresource, committing writes.
    pub fn unmap(mut self) -> Result<(), ResourceError> {
        self.finish()
    }

    fn finish(&mut self) -> Result<(), ResourceError> {
        if self.unmapped {
            return Ok(());
        }
        self.unmapped = true;
        let written = self.writable.then_some(self.data.as_slice());
        self.ctx.unmap(self.resource, self.subresource, written)
    }
}

impl Deref for MappedResource<'_> {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.data
    }
}

impl DerefMut for MappedResource<'_> {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

impl Drop for MappedResource<'_> {
    fn drop(&mut self) {
        if let Err(err) = self.finish() {
            log::error!("Failed to unmap resource {:?}: {}", self.resource, err);
        }
    }
}

impl GraphicsQueue {
    /// Maps a subresource for CPU access.
    ///
    /// `Read` requires `CPU_READ`; `Write` and `Discard` require `CPU_WRITE`.
    /// Writes to vertex/index buffers and to CPU-write-only resources do not
    /// wait for the GPU; `Discard` gets a fresh allocation.
    ///
    /// ## Errors
    /// [`ResourceError::CpuReadDenied`] or [`ResourceError::CpuWriteDenied`]
    /// when the resource lacks the access flag.
    pub fn map(
        &mut self,
        resource: &Arc<GraphicsResource>,
        subresource: u32,
        map_type: MapType,
    ) -> Result<MappedResource<'_>, ResourceError> {
        self.apply(resource);
        self.map_native(resource, subresource, map_type)
    }

    fn map_native(
        &mut self,
        resource: &GraphicsResource,
        subresource: u32,
        map_type: MapType,
    ) -> Result<MappedResource<'_>, ResourceError> {
        let mode = native_map_mode(resource.flags(), &resource.kind(), map_type)?;
        let id = resource.handle()?.resource;
        let data = self.ctx.map(id, subresource, mode)?;
        self.stats.map_calls += 1;
        Ok(MappedResource {
            ctx: self.ctx.as_mut(),
            resource: id,
            subresource,
            writable: map_type != MapType::Read,
            data,
            unmapped: false,
        })
    }

    /// Reads `destination.len()` bytes at `offset`.
    ///
    /// A resource without `CPU_READ` is first copied into `staging`, which
    /// must have `CPU_READ` and be large enough.
    pub fn read_data(
        &mut self,
        resource: &Arc<GraphicsResource>,
        offset: u64,
        destination: &mut [u8],
        staging: Option<&Arc<GraphicsResource>>,
    ) -> Result<(), ResourceError> {
        self.apply(resource);
        check_bounds(offset, destination.len(), resource.byte_size())?;
        let start = offset as usize;
        let end = start + destination.len();

        if resource.flags().contains(GraphicsResourceFlags::CPU_READ) {
            let mapped = self.map_native(resource, 0, MapType::Read)?;
            destination.copy_from_slice(&mapped[start..end]);
            return mapped.unmap();
        }

        let staging = staging.ok_or(ResourceError::StagingRequired)?;
        if !staging.flags().contains(GraphicsResourceFlags::CPU_READ) {
            return Err(ResourceError::InvalidStaging(
                "the staging resource lacks CPU read access".to_string(),
            ));
        }

        let source = resource.handle()?.resource;
        let target = staging.handle()?.resource;
        let read_range = match resource.kind() {
            ResourceKind::Buffer { .. } => {
                if (destination.len() as u64) > staging.byte_size() {
                    return Err(ResourceError::InvalidStaging(format!(
                        "{} bytes requested but the staging resource holds {}",
                        destination.len(),
                        staging.byte_size()
                    )));
                }
                let region = ResourceRegion::span(offset as u32, end as u32);
                self.ctx
                    .copy_subresource_region(source, 0, Some(region), target, 0, [0, 0, 0])?;
                0..destination.len()
            }
            ResourceKind::Texture { .. } => {
                if staging.byte_size() < resource.byte_size() {
                    return Err(ResourceError::InvalidStaging(format!(
                        "the staging resource holds {} bytes, {} required",
                        staging.byte_size(),
                        resource.byte_size()
                    )));
                }
                self.ctx
                    .copy_subresource_region(source, 0, None, target, 0, [0, 0, 0])?;
                start..end
            }
        };
        self.stats.copy_calls += 1;

        let mapped = self.map_native(staging, 0, MapType::Read)?;
        destination.copy_from_slice(&mapped[read_range]);
        mapped.unmap()
    }

    /// Copies a whole resource into another of the same size.
    pub fn copy_resource(
        &mut self,
        source: &Arc<GraphicsResource>,
        destination: &Arc<GraphicsResource>,
    ) -> Result<(), ResourceError> {
        self.apply(source);
        self.apply(destination);
        if source.byte_size() != destination.byte_size() {
            return Err(ResourceError::SizeMismatch {
                source: source.byte_size(),
                destination: destination.byte_size(),
            });
        }
        self.copy_handles(source, destination)
    }

    /// Copies a region of one subresource into another. `None` copies the whole subresource.
    pub fn copy_resource_region(
        &mut self,
        source: &Arc<GraphicsResource>,
        source_subresource: u32,
        region: Option<ResourceRegion>,
        destination: &Arc<GraphicsResource>,
        destination_subresource: u32,
        destination_start: [u32; 3],
    ) -> Result<(), ResourceError> {
        self.apply(source);
        self.apply(destination);
        let src = source.handle()?.resource;
        let dst = destination.handle()?.resource;
        self.ctx.copy_subresource_region(
            src,
            source_subresource,
            region,
            dst,
            destination_subresource,
            destination_start,
        )?;
        self.stats.copy_calls += 1;
        Ok(())
    }

    pub(crate) fn copy_handles(
        &mut self,
        source: &GraphicsResource,
        destination: &GraphicsResource,
    ) -> Result<(), ResourceError> {
        let src = source.handle()?.resource;
        let dst = destination.handle()?.resource;
        self.ctx.copy_resource(src, dst)?;
        self.stats.copy_calls += 1;
        Ok(())
    }

    /// Writes `data` at `offset`: through a mapping when the resource is
    /// CPU-writable, through a subresource update otherwise.
    pub(crate) fn write_resource(
        &mut self,
        resource: &GraphicsResource,
        subresource: u32,
        offset: u64,
        data: &[u8],
    ) -> Result<(), ResourceError> {
        let capacity = resource.byte_size();
        check_bounds(offset, data.len(), capacity)?;

        if resource.flags().contains(GraphicsResourceFlags::CPU_WRITE) {
            let whole = offset == 0 && data.len() as u64 == capacity;
            let map_type = if whole { MapType::Discard } else { MapType::Write };
            let mut mapped = self.map_native(resource, subresource, map_type)?;
            let start = offset as usize;
            mapped[start..start + data.len()].copy_from_slice(data);
            return mapped.unmap();
        }

        let id = resource.handle()?.resource;
        self.ctx.update_subresource(id, subresource, offset, data)?;
        self.stats.update_calls += 1;
        Ok(())
    }

    /// Processes every `Apply` task queued on `resource`.
    pub fn apply(&mut self, resource: &Arc<GraphicsResource>) {
        if resource.pending_tasks() == 0 {
            return;
        }
        let mut tasks = Vec::new();
        resource.take_pending(&mut tasks);
        for mut task in tasks {
            task.target = Some(resource.clone());
            self.run_task(task);
        }
    }

    /// Validates, processes and recycles a task. Returns `true` if it ran.
    pub(crate) fn run_task(&mut self, task: ResourceTask) -> bool {
        let ran = if task.validate() {
            match task.process(self) {
                Ok(()) => true,
                Err(err) => {
                    log::error!("Resource task {:?} failed: {}", task.kind, err);
                    false
                }
            }
        } else {
            false
        };

        if ran {
            self.stats.tasks_processed += 1;
        } else {
            self.stats.tasks_discarded += 1;
        }
        self.device.task_pool.release(task);
        ran
    }

    fn submit_task(&mut self, task: ResourceTask) {
        match task.priority {
            TaskPriority::Immediate => {
                if let Some(target) = task.target.clone() {
                    self.apply(&target);
                }
                self.run_task(task);
            }
            TaskPriority::Apply => match task.target.clone() {
                Some(target) => target.push_task(task),
                None => self.device.task_pool.release(task),
            },
            TaskPriority::StartOfFrame => {
                if let Err(flume::SendError(task)) = self.device.start_of_frame.send(task) {
                    self.device.task_pool.release(task);
                }
            }
        }
    }

    fn new_task(
        &self,
        kind: ResourceTaskKind,
        target: &Arc<GraphicsResource>,
        priority: TaskPriority,
    ) -> ResourceTask {
        let mut task = self.device.task_pool.acquire();
        task.kind = kind;
        task.priority = priority;
        task.target = Some(target.clone());
        task
    }

    /// Uploads `data` at byte `offset` of `resource`.
    pub fn set_data<T: bytemuck::Pod>(
        &mut self,
        resource: &Arc<GraphicsResource>,
        data: &[T],
        offset: u64,
        priority: TaskPriority,
    ) {
        let mut task = self.new_task(ResourceTaskKind::SetData, resource, priority);
        task.data.extend_from_slice(bytemuck::cast_slice(data));
        task.offset = offset;
        self.submit_task(task);
    }

    /// Clears a render surface.
    pub fn clear_surface(
        &mut self,
        resource: &Arc<GraphicsResource>,
        color: Color,
        priority: TaskPriority,
    ) {
        let mut task = self.new_task(ResourceTaskKind::ClearSurface, resource, priority);
        task.color = color;
        self.submit_task(task);
    }

    /// Clears a depth surface.
    pub fn clear_depth(
        &mut self,
        resource: &Arc<GraphicsResource>,
        depth: f32,
        stencil: u8,
        priority: TaskPriority,
    ) {
        let mut task = self.new_task(ResourceTaskKind::ClearDepth, resource, priority);
        task.depth = depth;
        task.stencil = stencil;
        self.submit_task(task);
    }

    /// Copies `source` into `destination`; discarded if their sizes differ.
    pub fn copy_to(
        &mut self,
        source: &Arc<GraphicsResource>,
        destination: &Arc<GraphicsResource>,
        priority: TaskPriority,
    ) {
        let mut task = self.new_task(ResourceTaskKind::CopyTo, source, priority);
        task.destination = Some(destination.clone());
        self.submit_task(task);
    }

    /// Resolves the multisampled `source` into `destination`.
    pub fn resolve_to(
        &mut self,
        source: &Arc<GraphicsResource>,
        destination: &Arc<GraphicsResource>,
        priority: TaskPriority,
    ) {
        let mut task = self.new_task(ResourceTaskKind::ResolveTo, source, priority);
        task.destination = Some(destination.clone());
        self.submit_task(task);
    }

    /// Generates the mip chain of a texture.
    pub fn generate_mips(&mut self, resource: &Arc<GraphicsResource>, priority: TaskPriority) {
        let task = self.new_task(ResourceTaskKind::GenerateMips, resource, priority);
        self.submit_task(task);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::api::{BufferType, GraphicsFormat, TextureDimensions, TextureKind};

    fn buffer(buffer_type: BufferType) -> ResourceKind {
        ResourceKind::Buffer {
            buffer_type,
            stride: 4,
            element_count: 16,
        }
    }

    #[test]
    fn test_read_requires_cpu_read() {
        let flags = GraphicsResourceFlags::CPU_WRITE | GraphicsResourceFlags::GPU_WRITE;
        let kind = buffer(BufferType::Structured);
        assert_eq!(
            native_map_mode(flags, &kind, MapType::Read),
            Err(ResourceError::CpuReadDenied)
        );
        assert_eq!(
            native_map_mode(GraphicsResourceFlags::CPU_READ, &kind, MapType::Write),
            Err(ResourceError::CpuWriteDenied)
        );
    }

    #[test]
    fn test_write_modes() {
        let rw = GraphicsResourceFlags::CPU_READ | GraphicsResourceFlags::CPU_WRITE;
        let texture = ResourceKind::Texture {
            kind: TextureKind::Texture2D,
            dimensions: TextureDimensions::new_2d(4, 4),
            format: GraphicsFormat::R8G8B8A8Unorm,
        };
        assert_eq!(
            native_map_mode(rw, &texture, MapType::Write),
            Ok(NativeMapMode::Write)
        );
        assert_eq!(
            native_map_mode(rw, &buffer(BufferType::Vertex), MapType::Write),
            Ok(NativeMapMode::WriteNoOverwrite),
            "Geometry buffers never wait for the GPU"
        );
        assert_eq!(
            native_map_mode(GraphicsResourceFlags::CPU_WRITE, &texture, MapType::Write),
            Ok(NativeMapMode::WriteNoOverwrite)
        );
        assert_eq!(
            native_map_mode(rw, &texture, MapType::Discard),
            Ok(NativeMapMode::WriteDiscard)
        );
    }

    #[test]
    fn test_bounds() {
        assert!(check_bounds(512, 512, 1024).is_ok());
        assert_eq!(
            check_bounds(600, 512, 1024),
            Err(ResourceError::OutOfBounds {
                offset: 600,
                len: 512,
                capacity: 1024
            })
        );
        assert!(check_bounds(u64::MAX, 1, 1024).is_err());
    }
}
