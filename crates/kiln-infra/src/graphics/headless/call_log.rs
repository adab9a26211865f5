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

//! A shared, inspectable record of every native call.

use kiln_core::graphics::{
    Color, CommandListId, IndexBufferBinding, InputLayoutId, NativeMapMode, PrimitiveTopology,
    ResourceId, SamplerId, ShaderProgramId, ShaderStageType, StateObjectId, SwapChainId, ViewId,
};
use std::sync::{Arc, Mutex, MutexGuard};

/// One call received by a headless context or device.
///
/// Ranged bind calls keep their start slot and the bound values, so a test
/// can assert both that a call happened and how many slots it spanned.
#[derive(Debug, Clone, PartialEq)]
pub enum NativeCall {
    SetShader {
        stage: ShaderStageType,
        program: Option<ShaderProgramId>,
    },
    SetConstantBuffers {
        stage: ShaderStageType,
        start_slot: u32,
        buffers: Vec<Option<ResourceId>>,
    },
    SetShaderResources {
        stage: ShaderStageType,
        start_slot: u32,
        views: Vec<Option<ViewId>>,
    },
    SetSamplers {
        stage: ShaderStageType,
        start_slot: u32,
        samplers: Vec<Option<SamplerId>>,
    },
    SetUnorderedAccessViews {
        stage: ShaderStageType,
        start_slot: u32,
        views: Vec<Option<ViewId>>,
    },
    SetOutputUnorderedAccessViews {
        start_slot: u32,
        views: Vec<Option<ViewId>>,
    },
    SetPrimitiveTopology(PrimitiveTopology),
    SetIndexBuffer(Option<IndexBufferBinding>),
    SetVertexBuffers {
        start_slot: u32,
        count: usize,
    },
    SetInputLayout(Option<InputLayoutId>),
    SetBlendState(Option<StateObjectId>),
    SetRasterizerState(Option<StateObjectId>),
    SetDepthStencilState {
        state: Option<StateObjectId>,
        stencil_reference: u32,
    },
    SetViewports(usize),
    SetScissorRects(usize),
    SetRenderTargets {
        targets: Vec<Option<ViewId>>,
        depth: Option<ViewId>,
    },
    Draw {
        vertex_count: u32,
        start_vertex: u32,
    },
    DrawInstanced {
        vertex_count_per_instance: u32,
        instance_count: u32,
    },
    DrawIndexed {
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    },
    DrawIndexedInstanced {
        index_count_per_instance: u32,
        instance_count: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    Map {
        resource: ResourceId,
        mode: NativeMapMode,
    },
    Unmap {
        resource: ResourceId,
        written: bool,
    },
    UpdateSubresource {
        resource: ResourceId,
        offset: u64,
        len: usize,
    },
    CopyResource {
        source: ResourceId,
        destination: ResourceId,
    },
    CopySubresourceRegion {
        source: ResourceId,
        destination: ResourceId,
    },
    ResolveSubresource {
        source: ResourceId,
        destination: ResourceId,
    },
    ClearRenderTarget {
        view: ViewId,
        color: Color,
    },
    ClearDepthStencil {
        view: ViewId,
        depth: f32,
        stencil: u8,
    },
    GenerateMips(ViewId),
    FinishCommandList(CommandListId),
    ExecuteCommandList(CommandListId),
    BeginEvent(String),
    EndEvent,
    SetMarker(String),
    ClearState,
    Release,
    Present {
        swap_chain: SwapChainId,
        sync_interval: u32,
    },
}

impl NativeCall {
    /// `true` for calls binding a program or shader inputs to a stage.
    pub fn is_stage_bind(&self) -> bool {
        matches!(
            self,
            NativeCall::SetShader { .. }
                | NativeCall::SetConstantBuffers { .. }
                | NativeCall::SetShaderResources { .. }
                | NativeCall::SetSamplers { .. }
                | NativeCall::SetUnorderedAccessViews { .. }
        )
    }

    /// `true` for draws and dispatches.
    pub fn is_draw(&self) -> bool {
        matches!(
            self,
            NativeCall::Draw { .. }
                | NativeCall::DrawInstanced { .. }
                | NativeCall::DrawIndexed { .. }
                | NativeCall::DrawIndexedInstanced { .. }
                | NativeCall::Dispatch { .. }
        )
    }
}

/// A logged call and the context that received it.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggedCall {
    /// Creation index of the receiving context; `None` for device calls.
    pub context: Option<u32>,
    /// The call.
    pub call: NativeCall,
}

/// Cheaply clonable handle on the call record of one headless device.
#[derive(Debug, Clone, Default)]
pub struct CallLog {
    calls: Arc<Mutex<Vec<LoggedCall>>>,
}

impl CallLog {
    fn lock(&self) -> MutexGuard<'_, Vec<LoggedCall>> {
        self.calls.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub(crate) fn record(&self, context: Option<u32>, call: NativeCall) {
        log::trace!("[headless:{context:?}] {call:?}");
        self.lock().push(LoggedCall { context, call });
    }

    /// Every call recorded so far.
    pub fn calls(&self) -> Vec<NativeCall> {
        self.lock().iter().map(|c| c.call.clone()).collect()
    }

    /// Every call with its context.
    pub fn entries(&self) -> Vec<LoggedCall> {
        self.lock().clone()
    }

    /// Returns and forgets every call recorded so far.
    pub fn take(&self) -> Vec<NativeCall> {
        self.lock().drain(..).map(|c| c.call).collect()
    }

    /// Forgets every call.
    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Number of recorded calls.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` when no call was recorded.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Number of recorded calls matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&NativeCall) -> bool) -> usize {
        self.lock().iter().filter(|c| predicate(&c.call)).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_take_drains_the_log() {
        let log = CallLog::default();
        log.record(Some(0), NativeCall::ClearState);
        log.record(None, NativeCall::EndEvent);
        assert_eq!(log.len(), 2);
        assert_eq!(log.entries()[1].context, None);
        assert_eq!(
            log.take(),
            vec![NativeCall::ClearState, NativeCall::EndEvent]
        );
        assert!(log.is_empty());
    }

    #[test]
    fn test_clones_share_the_record() {
        let log = CallLog::default();
        let other = log.clone();
        other.record(Some(1), NativeCall::Draw {
            vertex_count: 3,
            start_vertex: 0,
        });
        assert_eq!(log.count(NativeCall::is_draw), 1);
        assert_eq!(log.count(NativeCall::is_stage_bind), 0);
    }
}
