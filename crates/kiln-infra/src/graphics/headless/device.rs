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

use super::call_log::{CallLog, NativeCall};
use super::context::HeadlessContext;
use super::store::{HeadlessStore, StoredSwapChain};
use kiln_core::graphics::{
    CommandListId, CommandQueueType, DeviceError, GraphicsBackendType, GraphicsCapabilities,
    GraphicsFormat, GraphicsResourceFlags, InputLayoutId, NativeContext, NativeDevice,
    PresentStatus, ResourceDescriptor, ResourceError, ResourceHandle, ResourceId, ResourceKind,
    SamplerDescriptor, SamplerId, ShaderError, ShaderProgramId, ShaderStageType, StateDescriptor,
    StateObjectId, SwapChainDescriptor, SwapChainId, TextureDimensions, TextureKind, VertexLayout,
};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

/// Construction options of a [`HeadlessDevice`].
#[derive(Debug, Clone)]
pub struct HeadlessConfig {
    /// Name reported as the adapter name.
    pub adapter_name: String,
    /// Limits reported to the core.
    pub capabilities: GraphicsCapabilities,
}

impl Default for HeadlessConfig {
    fn default() -> Self {
        Self {
            adapter_name: "Kiln Headless Adapter".to_string(),
            capabilities: GraphicsCapabilities::default(),
        }
    }
}

pub(crate) struct HeadlessShared {
    pub store: Mutex<HeadlessStore>,
    pub log: CallLog,
    config: HeadlessConfig,
    next_context: AtomicU32,
    fail_input_layouts: AtomicBool,
    fail_contexts: AtomicBool,
}

impl HeadlessShared {
    pub fn store(&self) -> MutexGuard<'_, HeadlessStore> {
        self.store.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// An in-memory native device.
///
/// Resources live in CPU memory and every context call is appended to a
/// shared [`CallLog`]. Clones share the same objects, so a test can keep
/// one clone for inspection after handing another to the core.
#[derive(Clone)]
pub struct HeadlessDevice {
    shared: Arc<HeadlessShared>,
}

impl HeadlessDevice {
    /// Creates a device.
    pub fn new(config: HeadlessConfig) -> Self {
        log::debug!("Creating headless device '{}'", config.adapter_name);
        Self {
            shared: Arc::new(HeadlessShared {
                store: Mutex::new(HeadlessStore::default()),
                log: CallLog::default(),
                config,
                next_context: AtomicU32::new(0),
                fail_input_layouts: AtomicBool::new(false),
                fail_contexts: AtomicBool::new(false),
            }),
        }
    }

    /// The record of every native call.
    pub fn call_log(&self) -> &CallLog {
        &self.shared.log
    }

    /// Queues statuses returned by the next presents, in order. Once the
    /// script is exhausted presents succeed.
    pub fn script_present(&self, statuses: impl IntoIterator<Item = PresentStatus>) {
        self.shared.store().present_script.extend(statuses);
    }

    /// Makes every following input-layout creation fail.
    pub fn fail_input_layouts(&self, fail: bool) {
        self.shared.fail_input_layouts.store(fail, Ordering::Relaxed);
    }

    /// Makes every following context creation fail.
    pub fn fail_contexts(&self, fail: bool) {
        self.shared.fail_contexts.store(fail, Ordering::Relaxed);
    }

    /// Number of live resources.
    pub fn live_resources(&self) -> usize {
        self.shared.store().resources.len()
    }

    /// Number of live views.
    pub fn live_views(&self) -> usize {
        self.shared.store().views.len()
    }

    /// Number of live native objects of any kind, views excluded.
    pub fn live_objects(&self) -> usize {
        self.shared.store().live_objects()
    }

    /// Number of live input layouts.
    pub fn live_input_layouts(&self) -> usize {
        self.shared.store().layouts.len()
    }

    /// Number of live command lists.
    pub fn live_command_lists(&self) -> usize {
        self.shared.store().command_lists.len()
    }

    /// Copy of a resource's bytes.
    pub fn resource_data(&self, id: ResourceId) -> Result<Vec<u8>, ResourceError> {
        Ok(self.shared.store().resource(id)?.data.clone())
    }

    /// Back-buffer size and buffer count of a swap chain.
    pub fn swap_chain_info(&self, id: SwapChainId) -> Result<(u32, u32, u32), ResourceError> {
        let store = self.shared.store();
        let chain = store.swap_chain(id)?;
        Ok((chain.width, chain.height, chain.buffer_count))
    }
}

fn back_buffer_descriptor(width: u32, height: u32, format: GraphicsFormat) -> ResourceDescriptor {
    ResourceDescriptor {
        label: Some("back-buffer".to_string()),
        kind: ResourceKind::Texture {
            kind: TextureKind::RenderSurface,
            dimensions: TextureDimensions::new_2d(width, height),
            format,
        },
        flags: GraphicsResourceFlags::GPU_READ | GraphicsResourceFlags::GPU_WRITE,
    }
}

impl NativeDevice for HeadlessDevice {
    fn backend_type(&self) -> GraphicsBackendType {
        GraphicsBackendType::Headless
    }

    fn adapter_name(&self) -> String {
        self.shared.config.adapter_name.clone()
    }

    fn capabilities(&self) -> GraphicsCapabilities {
        self.shared.config.capabilities
    }

    fn create_context(
        &self,
        queue_type: CommandQueueType,
    ) -> Result<Box<dyn NativeContext>, DeviceError> {
        if self.shared.fail_contexts.load(Ordering::Relaxed) {
            return Err(DeviceError::InitializationFailed(
                "context creation disabled".to_string(),
            ));
        }
        let index = self.shared.next_context.fetch_add(1, Ordering::Relaxed);
        log::trace!("Headless context {index} created ({queue_type:?})");
        Ok(Box::new(HeadlessContext::new(
            self.shared.clone(),
            index,
            queue_type,
        )))
    }

    fn create_resource(
        &self,
        descriptor: &ResourceDescriptor,
        initial_data: Option<&[u8]>,
    ) -> Result<ResourceHandle, ResourceError> {
        self.shared.store().create_resource(descriptor, initial_data)
    }

    fn release_resource(&self, handle: &ResourceHandle) -> Result<(), ResourceError> {
        self.shared.store().release_resource(handle)
    }

    fn create_shader_program(
        &self,
        stage: ShaderStageType,
        bytecode: &[u8],
        label: Option<&str>,
    ) -> Result<ShaderProgramId, ShaderError> {
        if bytecode.is_empty() {
            return Err(ShaderError::BackendError(format!(
                "empty bytecode for {}",
                label.unwrap_or("unnamed program")
            )));
        }
        Ok(ShaderProgramId(self.shared.store().programs.insert(stage)))
    }

    fn release_shader_program(&self, id: ShaderProgramId) -> Result<(), ResourceError> {
        self.shared.store().programs.remove(id.raw()).map(drop)
    }

    fn create_sampler(&self, descriptor: &SamplerDescriptor) -> Result<SamplerId, ResourceError> {
        Ok(self.shared.store().create_sampler(descriptor))
    }

    fn release_sampler(&self, id: SamplerId) -> Result<(), ResourceError> {
        self.shared.store().samplers.remove(id.raw()).map(drop)
    }

    fn create_state_object(
        &self,
        descriptor: &StateDescriptor,
    ) -> Result<StateObjectId, ResourceError> {
        Ok(self.shared.store().create_state(descriptor))
    }

    fn release_state_object(&self, id: StateObjectId) -> Result<(), ResourceError> {
        self.shared.store().states.remove(id.raw()).map(drop)
    }

    fn create_input_layout(
        &self,
        layouts: &[Option<&VertexLayout>],
        program: Option<ShaderProgramId>,
    ) -> Result<InputLayoutId, ResourceError> {
        if self.shared.fail_input_layouts.load(Ordering::Relaxed) {
            return Err(ResourceError::BackendError(
                "input layout creation disabled".to_string(),
            ));
        }
        let mut store = self.shared.store();
        if let Some(program) = program {
            let stage = store.program(program)?;
            if stage != ShaderStageType::Vertex {
                return Err(ResourceError::BackendError(format!(
                    "input layouts need a vertex program, got a {stage} program"
                )));
            }
        }
        let slots = layouts.iter().flatten().count();
        let is_instanced = layouts.iter().flatten().any(|l| l.is_instanced());
        Ok(store.create_input_layout(slots, is_instanced))
    }

    fn release_input_layout(&self, id: InputLayoutId) -> Result<(), ResourceError> {
        self.shared.store().layouts.remove(id.raw()).map(drop)
    }

    fn release_command_list(&self, id: CommandListId) -> Result<(), ResourceError> {
        self.shared.store().command_lists.remove(id.raw()).map(drop)
    }

    fn create_swap_chain(&self, descriptor: &SwapChainDescriptor) -> Result<SwapChainId, DeviceError> {
        if descriptor.width == 0 || descriptor.height == 0 {
            return Err(DeviceError::SwapChain(format!(
                "invalid back-buffer size {}x{}",
                descriptor.width, descriptor.height
            )));
        }
        let mut store = self.shared.store();
        let back_buffer = store.create_resource(
            &back_buffer_descriptor(descriptor.width, descriptor.height, descriptor.format),
            None,
        )?;
        Ok(SwapChainId(store.swap_chains.insert(StoredSwapChain {
            width: descriptor.width,
            height: descriptor.height,
            format: descriptor.format,
            buffer_count: descriptor.buffer_count.max(1),
            back_buffer,
        })))
    }

    fn swap_chain_back_buffer(&self, id: SwapChainId) -> Result<ResourceHandle, ResourceError> {
        Ok(self.shared.store().swap_chain(id)?.back_buffer)
    }

    fn resize_swap_chain(&self, id: SwapChainId, width: u32, height: u32) -> Result<(), ResourceError> {
        let mut store = self.shared.store();
        let mut chain = store.swap_chain(id)?.clone();
        store.release_resource(&chain.back_buffer)?;
        chain.width = width;
        chain.height = height;
        chain.back_buffer =
            store.create_resource(&back_buffer_descriptor(width, height, chain.format), None)?;
        *store.swap_chain_mut(id)? = chain;
        Ok(())
    }

    fn present(&self, id: SwapChainId, sync_interval: u32) -> PresentStatus {
        let status = {
            let mut store = self.shared.store();
            if store.swap_chain(id).is_err() {
                return PresentStatus::Failed(-1);
            }
            store.present_script.pop_front().unwrap_or(PresentStatus::Ok)
        };
        self.shared.log.record(
            None,
            NativeCall::Present {
                swap_chain: id,
                sync_interval,
            },
        );
        status
    }

    fn release_swap_chain(&self, id: SwapChainId) -> Result<(), ResourceError> {
        let mut store = self.shared.store();
        let chain = store.swap_chains.remove(id.raw())?;
        store.release_resource(&chain.back_buffer)
    }
}

impl fmt::Debug for HeadlessDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let store = self.shared.store();
        f.debug_struct("HeadlessDevice")
            .field("adapter", &self.shared.config.adapter_name)
            .field("resources", &store.resources.len())
            .field("views", &store.views.len())
            .field("calls", &self.shared.log.len())
            .finish()
    }
}
