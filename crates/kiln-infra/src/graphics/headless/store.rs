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

//! CPU-side storage of every headless native object.
//!
//! Every resource is stored as one contiguous byte array: subresource
//! indices are accepted but all of them address the same bytes.

use kiln_core::graphics::{
    CommandListId, GraphicsFormat, HandleArena, InputLayoutId, PresentStatus, ResourceDescriptor,
    ResourceError, ResourceHandle, ResourceId, ResourceKind, SamplerDescriptor, SamplerId,
    ShaderProgramId, ShaderStageType, StateDescriptor, StateObjectId, SwapChainId, ViewId,
};
use std::collections::VecDeque;

#[derive(Debug)]
pub(crate) struct StoredResource {
    pub descriptor: ResourceDescriptor,
    pub data: Vec<u8>,
    pub mapped: bool,
}

impl StoredResource {
    pub fn format(&self) -> GraphicsFormat {
        match self.descriptor.kind {
            ResourceKind::Texture { format, .. } => format,
            ResourceKind::Buffer { .. } => GraphicsFormat::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StoredView {
    pub resource: ResourceId,
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct StoredLayout {
    pub slots: usize,
    pub is_instanced: bool,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredSwapChain {
    pub width: u32,
    pub height: u32,
    pub format: GraphicsFormat,
    pub buffer_count: u32,
    pub back_buffer: ResourceHandle,
}

/// Arenas of every live native object.
#[derive(Default)]
pub(crate) struct HeadlessStore {
    pub resources: HandleArena<StoredResource>,
    pub views: HandleArena<StoredView>,
    pub programs: HandleArena<ShaderStageType>,
    pub samplers: HandleArena<SamplerDescriptor>,
    pub states: HandleArena<StateDescriptor>,
    pub layouts: HandleArena<StoredLayout>,
    pub command_lists: HandleArena<usize>,
    pub swap_chains: HandleArena<StoredSwapChain>,
    pub present_script: VecDeque<PresentStatus>,
}

fn backend(msg: impl Into<String>) -> ResourceError {
    ResourceError::BackendError(msg.into())
}

impl HeadlessStore {
    /// Stores a resource and creates the views its descriptor asks for.
    pub fn create_resource(
        &mut self,
        descriptor: &ResourceDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<ResourceHandle, ResourceError> {
        let size = descriptor.kind.byte_size() as usize;
        let mut data = vec![0u8; size];
        if let Some(initial) = initial_data {
            if initial.len() > size {
                return Err(ResourceError::OutOfBounds {
                    offset: 0,
                    len: initial.len() as u64,
                    capacity: size as u64,
                });
            }
            data[..initial.len()].copy_from_slice(initial);
        }

        let resource = ResourceId(self.resources.insert(StoredResource {
            descriptor: descriptor.clone(),
            data,
            mapped: false,
        }));
        let views = descriptor.views();
        let mut view = |wanted: bool| {
            wanted.then(|| ViewId(self.views.insert(StoredView { resource })))
        };

        Ok(ResourceHandle {
            resource,
            srv: view(views.srv),
            uav: view(views.uav),
            rtv: view(views.rtv),
            dsv: view(views.dsv),
            dsv_read_only: view(views.dsv),
        })
    }

    /// Removes a resource and every view of its handle.
    pub fn release_resource(&mut self, handle: &ResourceHandle) -> Result<(), ResourceError> {
        self.resources.remove(handle.resource.raw())?;
        for view in handle.views() {
            self.views.remove(view.raw())?;
        }
        Ok(())
    }

    pub fn resource(&self, id: ResourceId) -> Result<&StoredResource, ResourceError> {
        self.resources.get(id.raw())
    }

    pub fn resource_mut(&mut self, id: ResourceId) -> Result<&mut StoredResource, ResourceError> {
        self.resources.get_mut(id.raw())
    }

    /// The resource a view belongs to.
    pub fn view_resource(&mut self, view: ViewId) -> Result<&mut StoredResource, ResourceError> {
        let resource = self.views.get(view.raw())?.resource;
        self.resource_mut(resource)
    }

    /// Copies `len` bytes between two resources, which may be the same one.
    pub fn copy_bytes(
        &mut self,
        source: ResourceId,
        source_offset: usize,
        destination: ResourceId,
        destination_offset: usize,
        len: usize,
    ) -> Result<(), ResourceError> {
        let bytes = {
            let src = self.resource(source)?;
            src.data
                .get(source_offset..source_offset + len)
                .ok_or_else(|| ResourceError::OutOfBounds {
                    offset: source_offset as u64,
                    len: len as u64,
                    capacity: src.data.len() as u64,
                })?
                .to_vec()
        };
        let dst = self.resource_mut(destination)?;
        let capacity = dst.data.len();
        let target = dst
            .data
            .get_mut(destination_offset..destination_offset + len)
            .ok_or(ResourceError::OutOfBounds {
                offset: destination_offset as u64,
                len: len as u64,
                capacity: capacity as u64,
            })?;
        target.copy_from_slice(&bytes);
        Ok(())
    }

    pub fn create_command_list(&mut self, recorded_calls: usize) -> CommandListId {
        CommandListId(self.command_lists.insert(recorded_calls))
    }

    pub fn command_list(&self, id: CommandListId) -> Result<usize, ResourceError> {
        self.command_lists.get(id.raw()).copied()
    }

    pub fn program(&self, id: ShaderProgramId) -> Result<ShaderStageType, ResourceError> {
        self.programs.get(id.raw()).copied()
    }

    pub fn create_input_layout(&mut self, slots: usize, is_instanced: bool) -> InputLayoutId {
        InputLayoutId(self.layouts.insert(StoredLayout {
            slots,
            is_instanced,
        }))
    }

    pub fn create_sampler(&mut self, descriptor: &SamplerDescriptor) -> SamplerId {
        SamplerId(self.samplers.insert(*descriptor))
    }

    pub fn create_state(&mut self, descriptor: &StateDescriptor) -> StateObjectId {
        StateObjectId(self.states.insert(descriptor.clone()))
    }

    pub fn swap_chain(&self, id: SwapChainId) -> Result<&StoredSwapChain, ResourceError> {
        self.swap_chains.get(id.raw())
    }

    pub fn swap_chain_mut(&mut self, id: SwapChainId) -> Result<&mut StoredSwapChain, ResourceError> {
        self.swap_chains.get_mut(id.raw())
    }

    /// Number of live native objects of any kind, views excluded.
    pub fn live_objects(&self) -> usize {
        self.resources.len()
            + self.programs.len()
            + self.samplers.len()
            + self.states.len()
            + self.layouts.len()
            + self.command_lists.len()
            + self.swap_chains.len()
    }

    pub fn unmapped(&mut self, id: ResourceId) -> Result<&mut StoredResource, ResourceError> {
        let resource = self.resource_mut(id)?;
        if resource.mapped {
            return Err(backend("resource is mapped"));
        }
        Ok(resource)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiln_core::graphics::{
        BufferType, GraphicsResourceFlags, TextureDimensions, TextureKind,
    };

    fn buffer(bytes: u32) -> ResourceDescriptor {
        ResourceDescriptor {
            label: None,
            kind: ResourceKind::Buffer {
                buffer_type: BufferType::Structured,
                stride: 1,
                element_count: bytes,
            },
            flags: GraphicsResourceFlags::GPU_READ,
        }
    }

    #[test]
    fn test_views_follow_the_descriptor() {
        let mut store = HeadlessStore::default();
        let depth = ResourceDescriptor {
            label: None,
            kind: ResourceKind::Texture {
                kind: TextureKind::DepthSurface,
                dimensions: TextureDimensions::new_2d(4, 4),
                format: GraphicsFormat::D32Float,
            },
            flags: GraphicsResourceFlags::GPU_WRITE | GraphicsResourceFlags::DENY_SHADER_ACCESS,
        };
        let handle = store.create_resource(&depth, None).unwrap();
        assert!(handle.dsv.is_some());
        assert!(handle.dsv_read_only.is_some());
        assert_ne!(handle.dsv, handle.dsv_read_only);
        assert!(handle.srv.is_none());
        assert!(handle.rtv.is_none());
        assert_eq!(store.views.len(), 2);
    }

    #[test]
    fn test_double_release_is_stale() {
        let mut store = HeadlessStore::default();
        let handle = store.create_resource(&buffer(16), Some(&[1u8, 2, 3][..])).unwrap();
        assert_eq!(&store.resource(handle.resource).unwrap().data[..4], &[1, 2, 3, 0]);

        store.release_resource(&handle).unwrap();
        assert!(matches!(
            store.release_resource(&handle),
            Err(ResourceError::StaleHandle { .. })
        ));
        assert_eq!(store.views.len(), 0);
    }

    #[test]
    fn test_copy_bytes_checks_bounds() {
        let mut store = HeadlessStore::default();
        let a = store.create_resource(&buffer(8), Some(&[7u8; 8][..])).unwrap().resource;
        let b = store.create_resource(&buffer(4), None).unwrap().resource;
        store.copy_bytes(a, 4, b, 0, 4).unwrap();
        assert_eq!(store.resource(b).unwrap().data, vec![7; 4]);
        assert!(store.copy_bytes(a, 0, b, 2, 4).is_err());
    }
}
