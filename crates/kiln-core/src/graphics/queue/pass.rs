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

//! Render and compute pass execution.

use super::state::NULL_LAYOUT;
use super::GraphicsQueue;
use crate::graphics::api::{
    BindType, Color, ComputeGroups, DepthWritePermission, GraphicsBindResult, IndexFormat,
    QueueValidationMode, ShaderStageType,
};
use crate::graphics::backend::{IndexBufferBinding, NativeContext, VertexBufferBinding};
use crate::graphics::error::QueueError;
use crate::graphics::shader::{Shader, ShaderPass, ShaderPassStage, ShaderValue};
use crate::graphics::stage::StageBindings;
use crate::graphics::vertex::{CachedInputLayout, InputLayoutKey, VertexLayout};
use std::sync::Arc;

impl GraphicsQueue {
    /// Draws `vertex_count` vertices with every enabled pass of `shader`.
    pub fn draw(
        &mut self,
        shader: &Shader,
        vertex_count: u32,
        start_vertex: u32,
    ) -> Result<GraphicsBindResult, QueueError> {
        self.apply_state(shader, QueueValidationMode::Unindexed, &mut |ctx: &mut dyn NativeContext| {
            ctx.draw(vertex_count, start_vertex)
        })
    }

    /// Instanced draw with every enabled pass of `shader`.
    pub fn draw_instanced(
        &mut self,
        shader: &Shader,
        vertex_count_per_instance: u32,
        instance_count: u32,
        start_vertex: u32,
        start_instance: u32,
    ) -> Result<GraphicsBindResult, QueueError> {
        self.apply_state(shader, QueueValidationMode::Instanced, &mut |ctx: &mut dyn NativeContext| {
            ctx.draw_instanced(
                vertex_count_per_instance,
                instance_count,
                start_vertex,
                start_instance,
            )
        })
    }

    /// Indexed draw with every enabled pass of `shader`.
    pub fn draw_indexed(
        &mut self,
        shader: &Shader,
        index_count: u32,
        start_index: u32,
        base_vertex: i32,
    ) -> Result<GraphicsBindResult, QueueError> {
        self.apply_state(shader, QueueValidationMode::Indexed, &mut |ctx: &mut dyn NativeContext| {
            ctx.draw_indexed(index_count, start_index, base_vertex)
        })
    }

    /// Indexed instanced draw with every enabled pass of `shader`.
    pub fn draw_indexed_instanced(
        &mut self,
        shader: &Shader,
        index_count_per_instance: u32,
        instance_count: u32,
        start_index: u32,
        base_vertex: i32,
        start_instance: u32,
    ) -> Result<GraphicsBindResult, QueueError> {
        self.apply_state(shader, QueueValidationMode::InstancedIndexed, &mut |ctx: &mut dyn NativeContext| {
            ctx.draw_indexed_instanced(
                index_count_per_instance,
                instance_count,
                start_index,
                base_vertex,
                start_instance,
            )
        })
    }

    /// Dispatches every enabled pass of `shader`.
    ///
    /// Non-zero components of `groups` override the pass defaults.
    pub fn dispatch(
        &mut self,
        shader: &Shader,
        groups: ComputeGroups,
    ) -> Result<GraphicsBindResult, QueueError> {
        if !self.recording {
            return Err(QueueError::NotRecording);
        }
        let mut ran = false;
        for pass in shader.passes().iter().filter(|p| p.is_enabled()) {
            ran = true;
            let result = self.do_compute_pass(pass, groups);
            if !result.is_successful() {
                return Ok(result);
            }
        }
        Ok(if ran {
            GraphicsBindResult::Successful
        } else {
            GraphicsBindResult::NoEnabledPass
        })
    }

    fn apply_state(
        &mut self,
        shader: &Shader,
        mode: QueueValidationMode,
        draw: &mut dyn FnMut(&mut dyn NativeContext),
    ) -> Result<GraphicsBindResult, QueueError> {
        if !self.recording {
            return Err(QueueError::NotRecording);
        }
        let mut ran = false;
        for pass in shader.passes().iter().filter(|p| p.is_enabled()) {
            ran = true;
            let result = self.do_render_pass(pass, mode, draw);
            if !result.is_successful() {
                log::trace!("Pass '{}' of '{}' failed: {:?}", pass.name(), shader.name(), result);
                return Ok(result);
            }
        }
        Ok(if ran {
            GraphicsBindResult::Successful
        } else {
            GraphicsBindResult::NoEnabledPass
        })
    }

    /// Binds everything `pass` needs and invokes `draw` once per pass iteration.
    ///
    /// Only state that differs from what is already bound reaches the native
    /// context. The callback is not invoked when binding or validation fails.
    pub fn do_render_pass(
        &mut self,
        pass: &ShaderPass,
        mode: QueueValidationMode,
        draw: &mut dyn FnMut(&mut dyn NativeContext),
    ) -> GraphicsBindResult {
        let topology = pass.topology();
        if !topology.is_supported() {
            return GraphicsBindResult::UndefinedTopology;
        }

        self.unbind_outputs();

        self.state.topology.set(Some(topology));
        if self.state.topology.bind() {
            self.ctx.set_primitive_topology(topology);
        }

        let vertex_changed = self.bind_render_stages(pass);
        self.bind_input_assembler(vertex_changed);
        self.bind_state_objects(pass);
        self.bind_fixed_function();
        self.bind_outputs(pass.depth_write());

        let result = self.validate(pass, mode);
        if !result.is_successful() {
            return result;
        }

        let debug = self.device.settings.enable_debug_layer;
        for k in 0..pass.iterations() {
            if debug {
                self.ctx.begin_event(&format!("Iteration {k}"));
            }
            draw(self.ctx.as_mut());
            self.stats.draw_calls += 1;
            if debug {
                self.ctx.end_event();
            }
        }
        GraphicsBindResult::Successful
    }

    /// Binds the compute stage of `pass` and dispatches it once per iteration.
    pub fn do_compute_pass(&mut self, pass: &ShaderPass, groups: ComputeGroups) -> GraphicsBindResult {
        let Some(stage) = pass.stage(ShaderStageType::Compute) else {
            return GraphicsBindResult::MissingComputeStage;
        };

        let mut bindings = std::mem::take(&mut self.scratch);
        self.resolve_stage(stage, &mut bindings);
        self.state
            .stage_mut(ShaderStageType::Compute)
            .bind(self.ctx.as_mut(), Some(&bindings), &mut self.stats);
        self.scratch = bindings;

        let groups = groups.or_default(pass.compute_groups());
        if !groups.is_valid(self.device.caps.max_compute_groups_per_dimension) {
            log::trace!("Invalid thread-group count {:?} for pass '{}'", groups, pass.name());
            return GraphicsBindResult::InvalidComputeGroups;
        }

        let debug = self.device.settings.enable_debug_layer;
        for k in 0..pass.iterations() {
            if debug {
                self.ctx.begin_event(&format!("Iteration {k}"));
            }
            self.ctx.dispatch(groups.x, groups.y, groups.z);
            self.stats.dispatch_calls += 1;
            if debug {
                self.ctx.end_event();
            }
        }
        GraphicsBindResult::Successful
    }

    /// Outputs must be cleared before stage binding, which may bind one of
    /// them as a shader input.
    fn unbind_outputs(&mut self) {
        if self.state.outputs_bound {
            self.ctx.set_render_targets(&[], None);
            self.state.outputs_bound = false;
        }
    }

    /// Binds every render stage, or unbinds the ones the pass lacks.
    /// Returns `true` when the vertex program changed.
    fn bind_render_stages(&mut self, pass: &ShaderPass) -> bool {
        let mut bindings = std::mem::take(&mut self.scratch);
        let mut vertex_changed = false;
        self.state.output_uavs.reset();

        for kind in ShaderStageType::RENDER_STAGES {
            let requested = match pass.stage(kind) {
                Some(stage) => {
                    self.resolve_stage(stage, &mut bindings);
                    for &(slot, view) in &bindings.unordered_access {
                        if !self.state.output_uavs.set(slot as usize, Some(view)) {
                            log::warn!("Ignoring output unordered access view at slot {slot}");
                        }
                    }
                    Some(&bindings)
                }
                None => None,
            };
            let changed = self
                .state
                .stage_mut(kind)
                .bind(self.ctx.as_mut(), requested, &mut self.stats);
            if kind == ShaderStageType::Vertex {
                vertex_changed = changed;
            }
        }
        self.scratch = bindings;

        if self.state.output_uavs.bind() {
            self.ctx.set_output_unordered_access_views(
                self.state.output_uavs.first_changed() as u32,
                self.state.output_uavs.changed_values(),
            );
            self.stats.unordered_access_binds += 1;
        }
        vertex_changed
    }

    /// Resolves the bind points of a pass stage to native objects, applying
    /// pending tasks of every resource it reads.
    fn resolve_stage(&mut self, stage: &ShaderPassStage, out: &mut StageBindings) {
        out.clear();
        out.program = Some(stage.program());

        for bind in stage.binds(BindType::ConstantBuffer) {
            if let ShaderValue::Resource(resource) = bind.variable.value() {
                self.apply(&resource);
                if let Ok(handle) = resource.handle() {
                    out.constant_buffers.push((bind.slot, handle.resource));
                }
            }
        }
        for bind in stage.binds(BindType::Resource) {
            if let ShaderValue::Resource(resource) = bind.variable.value() {
                self.apply(&resource);
                if let Some(view) = resource.handle().ok().and_then(|h| h.srv) {
                    out.resources.push((bind.slot, view));
                }
            }
        }
        for bind in stage.binds(BindType::Sampler) {
            if let ShaderValue::Sampler(sampler) = bind.variable.value() {
                out.samplers.push((bind.slot, sampler.id()));
            }
        }
        for bind in stage.binds(BindType::UnorderedAccess) {
            if let ShaderValue::Resource(resource) = bind.variable.value() {
                self.apply(&resource);
                if let Some(view) = resource.handle().ok().and_then(|h| h.uav) {
                    out.unordered_access.push((bind.slot, view));
                }
            }
        }
    }

    fn bind_input_assembler(&mut self, vertex_changed: bool) {
        let index = self.state.index_stream.clone().and_then(|stream| {
            self.apply(&stream.resource);
            let handle = stream.resource.handle().ok()?;
            Some(IndexBufferBinding {
                resource: handle.resource,
                format: stream.resource.index_format().unwrap_or(IndexFormat::Uint32),
                offset: stream.offset,
            })
        });
        self.state.index_buffer.set(index);
        if self.state.index_buffer.bind() {
            self.ctx.set_index_buffer(*self.state.index_buffer.bound());
        }

        for slot in 0..self.state.vertex_streams.len() {
            let binding = self.state.vertex_streams[slot].clone().and_then(|stream| {
                self.apply(&stream.resource);
                let handle = stream.resource.handle().ok()?;
                Some(VertexBufferBinding {
                    resource: handle.resource,
                    stride: stream.stride,
                    offset: stream.offset,
                })
            });
            self.state.vertex_buffers[slot] = binding;
        }
        let buffers_changed = self.state.vertex_buffers.bind();
        if buffers_changed {
            self.ctx.set_vertex_buffers(
                self.state.vertex_buffers.first_changed() as u32,
                self.state.vertex_buffers.changed_values(),
            );
        }

        if buffers_changed || vertex_changed {
            self.update_input_layout();
        }
    }

    fn update_input_layout(&mut self) {
        let key = InputLayoutKey {
            vertex_layouts: self
                .state
                .vertex_streams
                .iter()
                .map(|s| s.as_ref().and_then(|s| s.resource.vertex_layout()))
                .collect(),
            program: self.state.stage(ShaderStageType::Vertex).bound_program(),
        };

        let cached = match self.layouts.get(&key) {
            Some(cached) => *cached,
            None => {
                let cached = self.create_input_layout(&key);
                self.layouts.insert(key, cached);
                cached
            }
        };

        self.state.current_layout = cached;
        self.state.input_layout.set(cached.native);
        if self.state.input_layout.bind() {
            self.ctx.set_input_layout(cached.native);
        }
    }

    fn create_input_layout(&self, key: &InputLayoutKey) -> CachedInputLayout {
        if key.is_null() {
            return NULL_LAYOUT;
        }

        let layouts: Vec<Option<Arc<VertexLayout>>> = key
            .vertex_layouts
            .iter()
            .map(|id| id.and_then(|id| self.device.vertex_layouts.get(id)))
            .collect();
        let refs: Vec<Option<&VertexLayout>> = layouts.iter().map(|l| l.as_deref()).collect();
        let is_instanced = refs.iter().flatten().any(|l| l.is_instanced());

        match self.device.native.create_input_layout(&refs, key.program) {
            Ok(id) => {
                log::trace!("Created input layout {:?} for {:?}", id, key);
                CachedInputLayout {
                    native: Some(id),
                    is_instanced,
                }
            }
            Err(err) => {
                log::error!("Failed to create input layout for {:?}: {}", key, err);
                NULL_LAYOUT
            }
        }
    }

    fn bind_state_objects(&mut self, pass: &ShaderPass) {
        let blend = pass.blend_state();
        self.state.blend_state.set(blend.map(|b| b.id()));
        if self.state.blend_state.bind() {
            let (factor, mask) = blend.map_or((Color::WHITE, u32::MAX), |b| {
                (b.descriptor().blend_factor, b.descriptor().sample_mask)
            });
            self.ctx
                .set_blend_state(*self.state.blend_state.bound(), factor, mask);
        }

        self.state
            .rasterizer_state
            .set(pass.rasterizer_state().map(|r| r.id()));
        if self.state.rasterizer_state.bind() {
            self.ctx
                .set_rasterizer_state(*self.state.rasterizer_state.bound());
        }

        let depth = pass.depth_state();
        self.state.depth_state.set(depth.map(|d| d.id()));
        if self.state.depth_state.bind() {
            let reference = depth.map_or(0, |d| d.descriptor().stencil_reference);
            self.ctx
                .set_depth_stencil_state(*self.state.depth_state.bound(), reference);
        }
    }

    fn bind_fixed_function(&mut self) {
        if self.state.viewports.is_dirty() {
            self.ctx.set_viewports(self.state.viewports.items());
            self.state.viewports.clear_dirty();
        }
        if self.state.scissor_rects.is_dirty() {
            self.ctx.set_scissor_rects(self.state.scissor_rects.items());
            self.state.scissor_rects.clear_dirty();
        }
    }

    fn bind_outputs(&mut self, permission: DepthWritePermission) {
        let mut active = 0;
        for slot in 0..self.state.render_surfaces.len() {
            let view = self.state.render_surfaces[slot].clone().and_then(|surface| {
                self.apply(&surface);
                surface.handle().ok()?.rtv
            });
            if view.is_some() {
                active = slot + 1;
            }
            self.state.target_views[slot] = view;
        }

        let depth = match permission {
            DepthWritePermission::Disabled => None,
            DepthWritePermission::Enabled | DepthWritePermission::ReadOnly => {
                self.state.depth_surface.clone().and_then(|surface| {
                    self.apply(&surface);
                    let handle = surface.handle().ok()?;
                    if permission == DepthWritePermission::ReadOnly {
                        handle.dsv_read_only
                    } else {
                        handle.dsv
                    }
                })
            }
        };

        if active > 0 || depth.is_some() {
            self.ctx
                .set_render_targets(&self.state.target_views[..active], depth);
            self.state.outputs_bound = true;
            self.stats.bind_surface_calls += 1;
        }
    }

    fn validate(&self, pass: &ShaderPass, mode: QueueValidationMode) -> GraphicsBindResult {
        let indexed = matches!(
            mode,
            QueueValidationMode::Indexed | QueueValidationMode::InstancedIndexed
        );
        let instanced = matches!(
            mode,
            QueueValidationMode::Instanced | QueueValidationMode::InstancedIndexed
        );

        if mode == QueueValidationMode::Compute && !pass.is_compute() {
            return GraphicsBindResult::MissingComputeStage;
        }
        if indexed && self.state.index_buffer.bound().is_none() {
            return GraphicsBindResult::MissingIndexBuffer;
        }
        if instanced && !self.state.current_layout.is_instanced {
            return GraphicsBindResult::NonInstancedVertexLayout;
        }
        GraphicsBindResult::Successful
    }
}
