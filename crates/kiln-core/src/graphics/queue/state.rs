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

use crate::graphics::api::{GraphicsCapabilities, PrimitiveTopology, Rect, ShaderStageType, Viewport};
use crate::graphics::backend::{IndexBufferBinding, VertexBufferBinding};
use crate::graphics::handle::{InputLayoutId, StateObjectId, ViewId};
use crate::graphics::resource::GraphicsResource;
use crate::graphics::stage::ShaderStage;
use crate::graphics::state::{DirtyArray, StateValue, StateValueGroup};
use crate::graphics::vertex::CachedInputLayout;
use std::sync::Arc;

/// A vertex buffer requested for one input slot.
#[derive(Debug, Clone)]
pub(crate) struct VertexStream {
    pub resource: Arc<GraphicsResource>,
    pub offset: u32,
    pub stride: u32,
}

/// Index buffer requested for the input assembler.
#[derive(Debug, Clone)]
pub(crate) struct IndexStream {
    pub resource: Arc<GraphicsResource>,
    pub offset: u32,
}

/// Everything a queue has bound, or been asked to bind, on its native context.
#[derive(Debug)]
pub(crate) struct QueueState {
    pub stages: Vec<ShaderStage>,
    pub output_uavs: StateValueGroup<Option<ViewId>>,

    pub vertex_streams: Vec<Option<VertexStream>>,
    pub vertex_buffers: StateValueGroup<Option<VertexBufferBinding>>,
    pub index_stream: Option<IndexStream>,
    pub index_buffer: StateValue<Option<IndexBufferBinding>>,
    pub input_layout: StateValue<Option<InputLayoutId>>,
    pub current_layout: CachedInputLayout,

    pub render_surfaces: Vec<Option<Arc<GraphicsResource>>>,
    pub depth_surface: Option<Arc<GraphicsResource>>,
    pub target_views: Vec<Option<ViewId>>,
    pub outputs_bound: bool,

    pub topology: StateValue<Option<PrimitiveTopology>>,
    pub blend_state: StateValue<Option<StateObjectId>>,
    pub rasterizer_state: StateValue<Option<StateObjectId>>,
    pub depth_state: StateValue<Option<StateObjectId>>,

    pub viewports: DirtyArray<Viewport>,
    pub scissor_rects: DirtyArray<Rect>,
}

const ALL_STAGES: [ShaderStageType; ShaderStageType::COUNT] = [
    ShaderStageType::Vertex,
    ShaderStageType::Hull,
    ShaderStageType::Domain,
    ShaderStageType::Geometry,
    ShaderStageType::Pixel,
    ShaderStageType::Compute,
];

pub(crate) const NULL_LAYOUT: CachedInputLayout = CachedInputLayout {
    native: None,
    is_instanced: false,
};

impl QueueState {
    pub fn new(caps: &GraphicsCapabilities) -> Self {
        Self {
            stages: ALL_STAGES
                .iter()
                .map(|&kind| ShaderStage::new(kind, caps))
                .collect(),
            output_uavs: StateValueGroup::new(caps.max_unordered_access_slots as usize),
            vertex_streams: vec![None; caps.max_vertex_buffers as usize],
            vertex_buffers: StateValueGroup::new(caps.max_vertex_buffers as usize),
            index_stream: None,
            index_buffer: StateValue::new(),
            input_layout: StateValue::new(),
            current_layout: NULL_LAYOUT,
            render_surfaces: vec![None; caps.max_render_targets as usize],
            depth_surface: None,
            target_views: vec![None; caps.max_render_targets as usize],
            outputs_bound: false,
            topology: StateValue::new(),
            blend_state: StateValue::new(),
            rasterizer_state: StateValue::new(),
            depth_state: StateValue::new(),
            viewports: DirtyArray::new(caps.max_viewports as usize),
            scissor_rects: DirtyArray::new(caps.max_viewports as usize),
        }
    }

    pub fn stage_mut(&mut self, kind: ShaderStageType) -> &mut ShaderStage {
        &mut self.stages[kind.index()]
    }

    pub fn stage(&self, kind: ShaderStageType) -> &ShaderStage {
        &self.stages[kind.index()]
    }

    /// Forgets every bound value, after the native context was cleared.
    ///
    /// Requested inputs and outputs set by the caller survive; they are
    /// re-sent by the next pass.
    pub fn invalidate(&mut self) {
        for stage in &mut self.stages {
            stage.invalidate();
        }
        self.output_uavs.reset();
        self.output_uavs.invalidate();
        self.vertex_buffers.reset();
        self.vertex_buffers.invalidate();
        self.index_buffer.invalidate();
        self.input_layout.invalidate();
        self.current_layout = NULL_LAYOUT;
        self.outputs_bound = false;
        self.topology.invalidate();
        self.blend_state.invalidate();
        self.rasterizer_state.invalidate();
        self.depth_state.invalidate();
        self.viewports.mark_dirty();
        self.scissor_rects.mark_dirty();
    }

    /// Drops every requested binding, back to a freshly created queue.
    pub fn clear_requests(&mut self) {
        self.vertex_streams.fill(None);
        self.index_stream = None;
        self.render_surfaces.fill(None);
        self.depth_surface = None;
        self.viewports.set_all(&[]);
        self.scissor_rects.set_all(&[]);
    }
}
