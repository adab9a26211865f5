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

//! The device-wide deferred-disposal channel.
//!
//! Native objects may still be referenced by a command list in flight, so
//! dropping their owner only *marks* them. The device releases everything
//! marked when it drains the channel after presenting a frame.

use super::handle::{
    CommandListId, InputLayoutId, ResourceHandle, SamplerId, ShaderProgramId, StateObjectId,
    SwapChainId,
};
use super::backend::NativeDevice;
use super::error::ResourceError;

/// A native object waiting to be released.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DisposalItem {
    /// A buffer or texture, with the VRAM it accounted for.
    Resource {
        /// The handle and its views.
        handle: ResourceHandle,
        /// Bytes to return to the VRAM counter. Zero for externally owned handles.
        bytes: u64,
    },
    /// A shader program.
    ShaderProgram(ShaderProgramId),
    /// A sampler.
    Sampler(SamplerId),
    /// A blend, rasterizer or depth state.
    StateObject(StateObjectId),
    /// A cached input layout.
    InputLayout(InputLayoutId),
    /// An executed command list.
    CommandList(CommandListId),
    /// A swap chain.
    SwapChain(SwapChainId),
}

impl DisposalItem {
    /// Releases the native object. Returns the VRAM bytes freed.
    pub(crate) fn release(self, native: &dyn NativeDevice) -> Result<u64, ResourceError> {
        match self {
            DisposalItem::Resource { handle, bytes } => {
                native.release_resource(&handle)?;
                return Ok(bytes);
            }
            DisposalItem::ShaderProgram(id) => native.release_shader_program(id)?,
            DisposalItem::Sampler(id) => native.release_sampler(id)?,
            DisposalItem::StateObject(id) => native.release_state_object(id)?,
            DisposalItem::InputLayout(id) => native.release_input_layout(id)?,
            DisposalItem::CommandList(id) => native.release_command_list(id)?,
            DisposalItem::SwapChain(id) => native.release_swap_chain(id)?,
        }
        Ok(0)
    }
}

/// Sending half of the disposal channel, cloned into every object that owns a native handle.
#[derive(Debug, Clone)]
pub struct Disposer {
    tx: flume::Sender<DisposalItem>,
}

impl Disposer {
    pub(crate) fn channel() -> (Self, flume::Receiver<DisposalItem>) {
        let (tx, rx) = flume::unbounded();
        (Self { tx }, rx)
    }

    /// Queues `item` for release at the next frame boundary.
    pub fn mark(&self, item: DisposalItem) {
        if self.tx.send(item).is_err() {
            // The device is gone and has released every native object with it.
            log::trace!("Disposal channel closed, dropping {:?}", item);
        }
    }
}
