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

//! Shaders, their passes and the variables their bind points read from.
//!
//! Compilation and reflection happen elsewhere. A shader arrives here as
//! compiled bytecode per stage plus the list of bind points each stage
//! declares; bind points are fixed for the lifetime of the pass, only the
//! values of the variables behind them change at runtime.

use super::api::{
    BindType, ComputeGroups, DepthWritePermission, GraphicsCapabilities, PrimitiveTopology,
    ShaderStageType,
};
use super::disposal::{DisposalItem, Disposer};
use super::error::ShaderError;
use super::handle::ShaderProgramId;
use super::resource::GraphicsResource;
use super::state::{BlendState, DepthState, RasterizerState, Sampler};
use crate::utils::{read, write};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

const BIND_TYPES: [BindType; 4] = [
    BindType::ConstantBuffer,
    BindType::Resource,
    BindType::Sampler,
    BindType::UnorderedAccess,
];

fn bind_index(bind_type: BindType) -> usize {
    match bind_type {
        BindType::ConstantBuffer => 0,
        BindType::Resource => 1,
        BindType::Sampler => 2,
        BindType::UnorderedAccess => 3,
    }
}

fn capacity(caps: &GraphicsCapabilities, bind_type: BindType) -> u32 {
    match bind_type {
        BindType::ConstantBuffer => caps.max_constant_buffers,
        BindType::Resource => caps.max_shader_resources,
        BindType::Sampler => caps.max_samplers,
        BindType::UnorderedAccess => caps.max_unordered_access_slots,
    }
}

/// The runtime value of a shader variable.
#[derive(Debug, Clone, Default)]
pub enum ShaderValue {
    /// Nothing assigned; the slot is bound to null.
    #[default]
    Unset,
    /// A buffer or texture.
    Resource(Arc<GraphicsResource>),
    /// A sampler.
    Sampler(Arc<Sampler>),
}

/// A named value shared by every bind point that references it.
#[derive(Debug)]
pub struct ShaderVariable {
    name: String,
    bind_type: BindType,
    value: RwLock<ShaderValue>,
}

impl ShaderVariable {
    fn new(name: &str, bind_type: BindType) -> Self {
        Self {
            name: name.to_string(),
            bind_type,
            value: RwLock::new(ShaderValue::Unset),
        }
    }

    /// Name of the variable.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bind type of the first bind point declaring the variable.
    pub fn bind_type(&self) -> BindType {
        self.bind_type
    }

    /// Assigns a buffer or texture.
    pub fn set_resource(&self, resource: Option<Arc<GraphicsResource>>) {
        *write(&self.value) = resource.map_or(ShaderValue::Unset, ShaderValue::Resource);
    }

    /// Assigns a sampler.
    pub fn set_sampler(&self, sampler: Option<Arc<Sampler>>) {
        *write(&self.value) = sampler.map_or(ShaderValue::Unset, ShaderValue::Sampler);
    }

    /// The current value.
    pub fn value(&self) -> ShaderValue {
        read(&self.value).clone()
    }
}

/// A bind point resolved to its variable.
#[derive(Debug, Clone)]
pub struct ShaderBind {
    /// Slot index.
    pub slot: u32,
    /// Register space.
    pub space: u32,
    /// The variable read when binding.
    pub variable: Arc<ShaderVariable>,
}

/// One stage of a pass: its native program and bind points.
#[derive(Debug)]
pub struct ShaderPassStage {
    stage: ShaderStageType,
    program: ShaderProgramId,
    binds: [Vec<ShaderBind>; 4],
    disposer: Disposer,
}

impl ShaderPassStage {
    /// The pipeline stage.
    pub fn stage(&self) -> ShaderStageType {
        self.stage
    }

    /// The native program.
    pub fn program(&self) -> ShaderProgramId {
        self.program
    }

    /// Bind points of one type, in declaration order.
    pub fn binds(&self, bind_type: BindType) -> &[ShaderBind] {
        &self.binds[bind_index(bind_type)]
    }
}

impl Drop for ShaderPassStage {
    fn drop(&mut self) {
        self.disposer.mark(DisposalItem::ShaderProgram(self.program));
    }
}

/// A compiled configuration of a shader executed by one render or compute invocation.
#[derive(Debug)]
pub struct ShaderPass {
    name: String,
    stages: [Option<ShaderPassStage>; ShaderStageType::COUNT],
    topology: PrimitiveTopology,
    depth_write: DepthWritePermission,
    iterations: u32,
    compute_groups: ComputeGroups,
    blend_state: Option<Arc<BlendState>>,
    rasterizer_state: Option<Arc<RasterizerState>>,
    depth_state: Option<Arc<DepthState>>,
    enabled: AtomicBool,
}

impl ShaderPass {
    /// Name of the pass.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The stage of the given type, if the pass declares it.
    pub fn stage(&self, stage: ShaderStageType) -> Option<&ShaderPassStage> {
        self.stages[stage.index()].as_ref()
    }

    /// `true` if the pass has a compute stage.
    pub fn is_compute(&self) -> bool {
        self.stage(ShaderStageType::Compute).is_some()
    }

    /// Primitive topology.
    pub fn topology(&self) -> PrimitiveTopology {
        self.topology
    }

    /// Depth-write permission.
    pub fn depth_write(&self) -> DepthWritePermission {
        self.depth_write
    }

    /// How many times the pass runs per draw or dispatch.
    pub fn iterations(&self) -> u32 {
        self.iterations
    }

    /// Default thread-group counts.
    pub fn compute_groups(&self) -> ComputeGroups {
        self.compute_groups
    }

    /// Blend state, or `None` for the native default.
    pub fn blend_state(&self) -> Option<&Arc<BlendState>> {
        self.blend_state.as_ref()
    }

    /// Rasterizer state, or `None` for the native default.
    pub fn rasterizer_state(&self) -> Option<&Arc<RasterizerState>> {
        self.rasterizer_state.as_ref()
    }

    /// Depth-stencil state, or `None` for the native default.
    pub fn depth_state(&self) -> Option<&Arc<DepthState>> {
        self.depth_state.as_ref()
    }

    /// Whether the pass takes part in draws and dispatches.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Relaxed)
    }

    /// Enables or disables the pass.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Relaxed);
    }
}

/// A shader: named variables and ordered passes.
#[derive(Debug)]
pub struct Shader {
    name: String,
    variables: HashMap<String, Arc<ShaderVariable>>,
    passes: Vec<ShaderPass>,
}

impl Shader {
    /// Name of the shader.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Passes in execution order.
    pub fn passes(&self) -> &[ShaderPass] {
        &self.passes
    }

    /// The pass with the given name.
    pub fn pass(&self, name: &str) -> Option<&ShaderPass> {
        self.passes.iter().find(|p| p.name == name)
    }

    /// The variable with the given name.
    pub fn variable(&self, name: &str) -> Option<&Arc<ShaderVariable>> {
        self.variables.get(name)
    }

    /// Assigns a resource to a variable. Returns `false` for an unknown name.
    pub fn set_resource(&self, name: &str, resource: Option<Arc<GraphicsResource>>) -> bool {
        match self.variables.get(name) {
            Some(variable) => {
                variable.set_resource(resource);
                true
            }
            None => false,
        }
    }

    /// Assigns a sampler to a variable. Returns `false` for an unknown name.
    pub fn set_sampler(&self, name: &str, sampler: Option<Arc<Sampler>>) -> bool {
        match self.variables.get(name) {
            Some(variable) => {
                variable.set_sampler(sampler);
                true
            }
            None => false,
        }
    }
}

/// A bind point as declared by the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindPointDescriptor {
    /// Slot index.
    pub slot: u32,
    /// Register space.
    pub space: u32,
    /// Expected object kind.
    pub bind_type: BindType,
    /// Name of the variable feeding the slot.
    pub variable: String,
}

/// One stage of a pass as produced by the shader compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderStageDescriptor {
    /// Pipeline stage.
    pub stage: ShaderStageType,
    /// Compiled native program.
    pub bytecode: Vec<u8>,
    /// Declared bind points.
    pub bind_points: Vec<BindPointDescriptor>,
}

impl ShaderStageDescriptor {
    /// A stage without bind points.
    pub fn new(stage: ShaderStageType, bytecode: impl Into<Vec<u8>>) -> Self {
        Self {
            stage,
            bytecode: bytecode.into(),
            bind_points: Vec::new(),
        }
    }

    /// Adds a bind point in register space 0.
    pub fn bind(mut self, slot: u32, bind_type: BindType, variable: &str) -> Self {
        self.bind_points.push(BindPointDescriptor {
            slot,
            space: 0,
            bind_type,
            variable: variable.to_string(),
        });
        self
    }
}

/// Everything needed to create a [`ShaderPass`].
#[derive(Debug, Clone)]
pub struct ShaderPassDescriptor {
    /// Name of the pass.
    pub name: String,
    /// Declared stages.
    pub stages: Vec<ShaderStageDescriptor>,
    /// Primitive topology.
    pub topology: PrimitiveTopology,
    /// Depth-write permission.
    pub depth_write: DepthWritePermission,
    /// Iterations per draw or dispatch.
    pub iterations: u32,
    /// Default thread-group counts.
    pub compute_groups: ComputeGroups,
    /// Blend state.
    pub blend_state: Option<Arc<BlendState>>,
    /// Rasterizer state.
    pub rasterizer_state: Option<Arc<RasterizerState>>,
    /// Depth-stencil state.
    pub depth_state: Option<Arc<DepthState>>,
    /// Initial enabled flag.
    pub enabled: bool,
}

/// Fluent construction of a [`ShaderPassDescriptor`].
#[derive(Debug, Clone)]
pub struct ShaderPassBuilder {
    descriptor: ShaderPassDescriptor,
}

impl ShaderPassBuilder {
    /// A triangle-list pass with one iteration and no stage.
    pub fn new(name: &str) -> Self {
        Self {
            descriptor: ShaderPassDescriptor {
                name: name.to_string(),
                stages: Vec::new(),
                topology: PrimitiveTopology::TriangleList,
                depth_write: DepthWritePermission::Enabled,
                iterations: 1,
                compute_groups: ComputeGroups::new(1, 1, 1),
                blend_state: None,
                rasterizer_state: None,
                depth_state: None,
                enabled: true,
            },
        }
    }

    /// Adds a stage.
    pub fn stage(mut self, stage: ShaderStageDescriptor) -> Self {
        self.descriptor.stages.push(stage);
        self
    }

    /// Sets the topology.
    pub fn topology(mut self, topology: PrimitiveTopology) -> Self {
        self.descriptor.topology = topology;
        self
    }

    /// Sets the depth-write permission.
    pub fn depth_write(mut self, permission: DepthWritePermission) -> Self {
        self.descriptor.depth_write = permission;
        self
    }

    /// Sets the iteration count.
    pub fn iterations(mut self, iterations: u32) -> Self {
        self.descriptor.iterations = iterations;
        self
    }

    /// Sets the default thread-group counts.
    pub fn compute_groups(mut self, groups: ComputeGroups) -> Self {
        self.descriptor.compute_groups = groups;
        self
    }

    /// Sets the blend state.
    pub fn blend_state(mut self, state: Arc<BlendState>) -> Self {
        self.descriptor.blend_state = Some(state);
        self
    }

    /// Sets the rasterizer state.
    pub fn rasterizer_state(mut self, state: Arc<RasterizerState>) -> Self {
        self.descriptor.rasterizer_state = Some(state);
        self
    }

    /// Sets the depth-stencil state.
    pub fn depth_state(mut self, state: Arc<DepthState>) -> Self {
        self.descriptor.depth_state = Some(state);
        self
    }

    /// Sets the initial enabled flag.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.descriptor.enabled = enabled;
        self
    }

    /// Finishes the descriptor.
    pub fn build(self) -> ShaderPassDescriptor {
        self.descriptor
    }
}

/// Everything needed to create a [`Shader`].
#[derive(Debug, Clone)]
pub struct ShaderDescriptor {
    /// Name of the shader.
    pub name: String,
    /// Passes in execution order.
    pub passes: Vec<ShaderPassDescriptor>,
}

impl ShaderDescriptor {
    /// A shader with the given passes.
    pub fn new(name: &str, passes: Vec<ShaderPassDescriptor>) -> Self {
        Self {
            name: name.to_string(),
            passes,
        }
    }
}

/// Checks that a pass declares at least one stage and that every bind point
/// is unique per (stage, bind type) and fits the device's slot counts.
pub(crate) fn validate_pass(
    pass: &ShaderPassDescriptor,
    caps: &GraphicsCapabilities,
) -> Result<(), ShaderError> {
    if pass.stages.is_empty() {
        return Err(ShaderError::MissingStage);
    }

    for stage in &pass.stages {
        let mut seen = HashSet::new();
        for point in &stage.bind_points {
            let available = capacity(caps, point.bind_type);
            if point.slot >= available {
                return Err(ShaderError::BindPointOutOfRange {
                    stage: stage.stage,
                    bind_type: point.bind_type,
                    slot: point.slot,
                    capacity: available,
                });
            }
            if !seen.insert((point.bind_type, point.slot)) {
                return Err(ShaderError::DuplicateBindPoint {
                    stage: stage.stage,
                    bind_type: point.bind_type,
                    slot: point.slot,
                });
            }
        }
    }
    Ok(())
}

/// Assembles a [`Shader`] from a validated descriptor and the native programs
/// created for each of its stages (same order as the descriptor).
pub(crate) fn assemble(
    descriptor: ShaderDescriptor,
    mut programs: Vec<Vec<ShaderProgramId>>,
    disposer: &Disposer,
) -> Shader {
    let mut variables: HashMap<String, Arc<ShaderVariable>> = HashMap::new();
    let mut passes = Vec::with_capacity(descriptor.passes.len());

    for (pass_desc, pass_programs) in descriptor.passes.into_iter().zip(programs.drain(..)) {
        let mut stages: [Option<ShaderPassStage>; ShaderStageType::COUNT] = Default::default();

        for (stage_desc, program) in pass_desc.stages.into_iter().zip(pass_programs) {
            let mut binds: [Vec<ShaderBind>; 4] = Default::default();
            for point in stage_desc.bind_points {
                let variable = variables
                    .entry(point.variable.clone())
                    .or_insert_with(|| Arc::new(ShaderVariable::new(&point.variable, point.bind_type)))
                    .clone();
                binds[bind_index(point.bind_type)].push(ShaderBind {
                    slot: point.slot,
                    space: point.space,
                    variable,
                });
            }

            let stage = ShaderPassStage {
                stage: stage_desc.stage,
                program,
                binds,
                disposer: disposer.clone(),
            };
            let slot = &mut stages[stage_desc.stage.index()];
            if slot.is_some() {
                log::warn!(
                    "Pass '{}' declares the {} stage twice; keeping the first",
                    pass_desc.name,
                    stage_desc.stage
                );
                continue;
            }
            *slot = Some(stage);
        }

        passes.push(ShaderPass {
            name: pass_desc.name,
            stages,
            topology: pass_desc.topology,
            depth_write: pass_desc.depth_write,
            iterations: pass_desc.iterations,
            compute_groups: pass_desc.compute_groups,
            blend_state: pass_desc.blend_state,
            rasterizer_state: pass_desc.rasterizer_state,
            depth_state: pass_desc.depth_state,
            enabled: AtomicBool::new(pass_desc.enabled),
        });
    }

    log::debug!(
        "Assembled shader '{}' with {} pass(es) and {} variable(s)",
        descriptor.name,
        passes.len(),
        variables.len()
    );

    Shader {
        name: descriptor.name,
        variables,
        passes,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pass_with(stage: ShaderStageDescriptor) -> ShaderPassDescriptor {
        ShaderPassBuilder::new("main").stage(stage).build()
    }

    #[test]
    fn test_builder_defaults() {
        let pass = ShaderPassBuilder::new("p").build();
        assert_eq!(pass.topology, PrimitiveTopology::TriangleList);
        assert_eq!(pass.iterations, 1);
        assert!(pass.enabled);
    }

    #[test]
    fn test_pass_without_stage_is_rejected() {
        let caps = GraphicsCapabilities::default();
        let pass = ShaderPassBuilder::new("empty").build();
        assert_eq!(validate_pass(&pass, &caps), Err(ShaderError::MissingStage));
    }

    #[test]
    fn test_duplicate_bind_point_is_rejected() {
        let caps = GraphicsCapabilities::default();
        let stage = ShaderStageDescriptor::new(ShaderStageType::Pixel, vec![0u8])
            .bind(0, BindType::Resource, "albedo")
            .bind(0, BindType::Resource, "normal");
        assert_eq!(
            validate_pass(&pass_with(stage), &caps),
            Err(ShaderError::DuplicateBindPoint {
                stage: ShaderStageType::Pixel,
                bind_type: BindType::Resource,
                slot: 0
            })
        );
    }

    #[test]
    fn test_same_slot_different_bind_type_is_allowed() {
        let caps = GraphicsCapabilities::default();
        let stage = ShaderStageDescriptor::new(ShaderStageType::Pixel, vec![0u8])
            .bind(0, BindType::Resource, "albedo")
            .bind(0, BindType::Sampler, "linear");
        assert!(validate_pass(&pass_with(stage), &caps).is_ok());
    }

    #[test]
    fn test_out_of_range_bind_point_is_rejected() {
        let caps = GraphicsCapabilities::default();
        let stage = ShaderStageDescriptor::new(ShaderStageType::Vertex, vec![0u8]).bind(
            caps.max_constant_buffers,
            BindType::ConstantBuffer,
            "camera",
        );
        assert!(matches!(
            validate_pass(&pass_with(stage), &caps),
            Err(ShaderError::BindPointOutOfRange { capacity: 14, .. })
        ));
    }

    #[test]
    fn test_assemble_shares_variables_between_stages() {
        let (disposer, rx) = Disposer::channel();
        let vs = ShaderStageDescriptor::new(ShaderStageType::Vertex, vec![1u8])
            .bind(0, BindType::ConstantBuffer, "camera");
        let ps = ShaderStageDescriptor::new(ShaderStageType::Pixel, vec![2u8])
            .bind(0, BindType::ConstantBuffer, "camera")
            .bind(1, BindType::Resource, "albedo");
        let descriptor = ShaderDescriptor::new(
            "basic",
            vec![ShaderPassBuilder::new("main").stage(vs).stage(ps).build()],
        );

        let mut arena = crate::graphics::handle::HandleArena::new();
        let programs = vec![vec![
            ShaderProgramId(arena.insert(())),
            ShaderProgramId(arena.insert(())),
        ]];
        let shader = assemble(descriptor, programs, &disposer);

        let pass = shader.pass("main").unwrap();
        let vs_camera = &pass.stage(ShaderStageType::Vertex).unwrap().binds(BindType::ConstantBuffer)[0];
        let ps_camera = &pass.stage(ShaderStageType::Pixel).unwrap().binds(BindType::ConstantBuffer)[0];
        assert!(Arc::ptr_eq(&vs_camera.variable, &ps_camera.variable));
        assert!(shader.variable("albedo").is_some());
        assert!(!pass.is_compute());

        drop(shader);
        assert_eq!(rx.drain().count(), 2, "Both programs should be marked for disposal");
    }
}
