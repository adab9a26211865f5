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

//! Per-stage binding state of a queue.

use super::api::{GraphicsCapabilities, ShaderStageType};
use super::backend::NativeContext;
use super::handle::{ResourceId, SamplerId, ShaderProgramId, ViewId};
use super::state::{StateValue, StateValueGroup};
use crate::telemetry::QueueStats;

/// The native objects a pass stage wants bound, resolved from its bind points.
///
/// Filled by the queue before calling [`ShaderStage::bind`]; the vectors are
/// reused across passes.
#[derive(Debug, Clone, Default)]
pub struct StageBindings {
    /// The stage program.
    pub program: Option<ShaderProgramId>,
    /// `(slot, buffer)` pairs.
    pub constant_buffers: Vec<(u32, ResourceId)>,
    /// `(slot, shader-resource view)` pairs.
    pub resources: Vec<(u32, ViewId)>,
    /// `(slot, sampler)` pairs.
    pub samplers: Vec<(u32, SamplerId)>,
    /// `(slot, unordered-access view)` pairs.
    pub unordered_access: Vec<(u32, ViewId)>,
}

impl StageBindings {
    /// Empties every list while keeping their capacity.
    pub fn clear(&mut self) {
        self.program = None;
        self.constant_buffers.clear();
        self.resources.clear();
        self.samplers.clear();
        self.unordered_access.clear();
    }
}

/// Binding state of one pipeline stage on one queue.
#[derive(Debug)]
pub struct ShaderStage {
    kind: ShaderStageType,
    program: StateValue<Option<ShaderProgramId>>,
    constant_buffers: StateValueGroup<Option<ResourceId>>,
    resources: StateValueGroup<Option<ViewId>>,
    samplers: StateValueGroup<Option<SamplerId>>,
    unordered_access: Option<StateValueGroup<Option<ViewId>>>,
}

impl ShaderStage {
    /// A stage with slot groups sized from the device capabilities.
    /// Only the compute stage tracks unordered-access views; render stages
    /// hand theirs to the output merger.
    pub fn new(kind: ShaderStageType, caps: &GraphicsCapabilities) -> Self {
        let unordered_access = (kind == ShaderStageType::Compute)
            .then(|| StateValueGroup::new(caps.max_unordered_access_slots as usize));
        Self {
            kind,
            program: StateValue::new(),
            constant_buffers: StateValueGroup::new(caps.max_constant_buffers as usize),
            resources: StateValueGroup::new(caps.max_shader_resources as usize),
            samplers: StateValueGroup::new(caps.max_samplers as usize),
            unordered_access,
        }
    }

    /// The pipeline stage.
    pub fn kind(&self) -> ShaderStageType {
        self.kind
    }

    /// The program currently bound.
    pub fn bound_program(&self) -> Option<ShaderProgramId> {
        *self.program.bound()
    }

    /// The constant buffer currently bound at `slot`.
    pub fn bound_constant_buffer(&self, slot: usize) -> Option<ResourceId> {
        self.constant_buffers.bound(slot).copied().flatten()
    }

    /// The shader-resource view currently bound at `slot`.
    pub fn bound_resource(&self, slot: usize) -> Option<ViewId> {
        self.resources.bound(slot).copied().flatten()
    }

    /// The sampler currently bound at `slot`.
    pub fn bound_sampler(&self, slot: usize) -> Option<SamplerId> {
        self.samplers.bound(slot).copied().flatten()
    }

    /// `true` when no program and no slot is bound.
    pub fn is_unbound(&self) -> bool {
        self.program.bound().is_none()
            && self.constant_buffers.bound_values().iter().all(Option::is_none)
            && self.resources.bound_values().iter().all(Option::is_none)
            && self.samplers.bound_values().iter().all(Option::is_none)
            && self
                .unordered_access
                .as_ref()
                .is_none_or(|g| g.bound_values().iter().all(Option::is_none))
    }

    /// Binds the given stage bindings, or unbinds everything for `None`.
    ///
    /// Issues at most one native call per slot group, spanning the changed
    /// range. Returns `true` when the program changed.
    pub fn bind(
        &mut self,
        ctx: &mut dyn NativeContext,
        bindings: Option<&StageBindings>,
        stats: &mut QueueStats,
    ) -> bool {
        self.program.set(bindings.and_then(|b| b.program));
        let shader_changed = self.program.bind();
        if shader_changed {
            ctx.set_shader(self.kind, *self.program.bound());
            stats.shader_binds += 1;
        }

        self.constant_buffers.reset();
        self.resources.reset();
        self.samplers.reset();
        if let Some(uavs) = self.unordered_access.as_mut() {
            uavs.reset();
        }

        if let Some(bindings) = bindings {
            for &(slot, id) in &bindings.constant_buffers {
                stage_slot(&mut self.constant_buffers, self.kind, "constant buffer", slot, id);
            }
            for &(slot, id) in &bindings.resources {
                stage_slot(&mut self.resources, self.kind, "resource", slot, id);
            }
            for &(slot, id) in &bindings.samplers {
                stage_slot(&mut self.samplers, self.kind, "sampler", slot, id);
            }
            if let Some(uavs) = self.unordered_access.as_mut() {
                for &(slot, id) in &bindings.unordered_access {
                    stage_slot(uavs, self.kind, "unordered access", slot, id);
                }
            }
        }

        if self.constant_buffers.bind() {
            ctx.set_constant_buffers(
                self.kind,
                self.constant_buffers.first_changed() as u32,
                self.constant_buffers.changed_values(),
            );
            stats.constant_buffer_binds += 1;
        }
        if self.resources.bind() {
            ctx.set_shader_resources(
                self.kind,
                self.resources.first_changed() as u32,
                self.resources.changed_values(),
            );
            stats.resource_binds += 1;
        }
        if self.samplers.bind() {
            ctx.set_samplers(
                self.kind,
                self.samplers.first_changed() as u32,
                self.samplers.changed_values(),
            );
            stats.sampler_binds += 1;
        }
        if let Some(uavs) = self.unordered_access.as_mut() {
            if uavs.bind() {
                ctx.set_unordered_access_views(
                    self.kind,
                    uavs.first_changed() as u32,
                    uavs.changed_values(),
                );
                stats.unordered_access_binds += 1;
            }
        }

        shader_changed
    }

    /// Forgets every bound value after the native context was cleared.
    pub fn invalidate(&mut self) {
        self.program.reset();
        self.program.invalidate();
        self.constant_buffers.reset();
        self.constant_buffers.invalidate();
        self.resources.reset();
        self.resources.invalidate();
        self.samplers.reset();
        self.samplers.invalidate();
        if let Some(uavs) = self.unordered_access.as_mut() {
            uavs.reset();
            uavs.invalidate();
        }
    }
}

fn stage_slot<T: Clone + PartialEq>(
    group: &mut StateValueGroup<Option<T>>,
    stage: ShaderStageType,
    what: &str,
    slot: u32,
    value: T,
) {
    if !group.set(slot as usize, Some(value)) {
        log::warn!(
            "Ignoring {what} bind at slot {slot} of the {stage} stage: only {} slots",
            group.len()
        );
    }
}
