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

//! Descriptors of fixed-function state objects and samplers.

use super::types::Color;

/// Comparison used by depth, stencil and comparison samplers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ComparisonFunction {
    /// Never passes.
    Never,
    /// Passes if the new value is less.
    #[default]
    Less,
    /// Passes if the values are equal.
    Equal,
    /// Passes if the new value is less or equal.
    LessEqual,
    /// Passes if the new value is greater.
    Greater,
    /// Passes if the values differ.
    NotEqual,
    /// Passes if the new value is greater or equal.
    GreaterEqual,
    /// Always passes.
    Always,
}

/// Source or destination factor of a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    /// 0.
    Zero,
    /// 1.
    One,
    /// Source alpha.
    SourceAlpha,
    /// 1 - source alpha.
    InverseSourceAlpha,
    /// Destination alpha.
    DestinationAlpha,
    /// 1 - destination alpha.
    InverseDestinationAlpha,
    /// Source color.
    SourceColor,
    /// Destination color.
    DestinationColor,
    /// The state's blend factor.
    BlendFactor,
}

/// Operator of a blend equation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendOperation {
    /// `src + dst`.
    #[default]
    Add,
    /// `src - dst`.
    Subtract,
    /// `dst - src`.
    ReverseSubtract,
    /// `min(src, dst)`.
    Min,
    /// `max(src, dst)`.
    Max,
}

/// Blend configuration of one render target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderTargetBlend {
    /// Whether blending is enabled.
    pub enabled: bool,
    /// Color source factor.
    pub source: BlendFactor,
    /// Color destination factor.
    pub destination: BlendFactor,
    /// Color operator.
    pub operation: BlendOperation,
    /// Alpha source factor.
    pub source_alpha: BlendFactor,
    /// Alpha destination factor.
    pub destination_alpha: BlendFactor,
    /// Alpha operator.
    pub alpha_operation: BlendOperation,
    /// RGBA write mask.
    pub write_mask: u8,
}

impl Default for RenderTargetBlend {
    fn default() -> Self {
        Self {
            enabled: false,
            source: BlendFactor::One,
            destination: BlendFactor::Zero,
            operation: BlendOperation::Add,
            source_alpha: BlendFactor::One,
            destination_alpha: BlendFactor::Zero,
            alpha_operation: BlendOperation::Add,
            write_mask: 0x0F,
        }
    }
}

impl RenderTargetBlend {
    /// Standard premultiplied-free alpha blending.
    pub fn alpha_blend() -> Self {
        Self {
            enabled: true,
            source: BlendFactor::SourceAlpha,
            destination: BlendFactor::InverseSourceAlpha,
            source_alpha: BlendFactor::One,
            destination_alpha: BlendFactor::InverseSourceAlpha,
            ..Self::default()
        }
    }
}

/// Descriptor of an output-merger blend state.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendStateDescriptor {
    /// Alpha-to-coverage multisampling.
    pub alpha_to_coverage: bool,
    /// Whether each render target uses its own entry of `targets`.
    pub independent_blend: bool,
    /// Per-target configuration. Entry 0 applies to all targets when blending is not independent.
    pub targets: Vec<RenderTargetBlend>,
    /// Constant used by [`BlendFactor::BlendFactor`].
    pub blend_factor: Color,
    /// Coverage sample mask.
    pub sample_mask: u32,
}

impl Default for BlendStateDescriptor {
    fn default() -> Self {
        Self {
            alpha_to_coverage: false,
            independent_blend: false,
            targets: vec![RenderTargetBlend::default()],
            blend_factor: Color::WHITE,
            sample_mask: u32::MAX,
        }
    }
}

/// Polygon fill mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FillMode {
    /// Filled triangles.
    #[default]
    Solid,
    /// Edges only.
    Wireframe,
}

/// Which faces are culled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    /// Nothing is culled.
    None,
    /// Front faces are culled.
    Front,
    /// Back faces are culled.
    #[default]
    Back,
}

/// Descriptor of a rasterizer state.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RasterizerStateDescriptor {
    /// Fill mode.
    pub fill_mode: FillMode,
    /// Cull mode.
    pub cull_mode: CullMode,
    /// Whether counter-clockwise triangles face forward.
    pub front_counter_clockwise: bool,
    /// Constant depth bias.
    pub depth_bias: i32,
    /// Slope-scaled depth bias.
    pub slope_scaled_depth_bias: f32,
    /// Whether depth clipping is enabled.
    pub depth_clip: bool,
    /// Whether scissor testing is enabled.
    pub scissor_enabled: bool,
    /// Whether multisample antialiasing is enabled.
    pub multisample: bool,
}

/// Stencil operation applied on test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum StencilOperation {
    /// Keep the stored value.
    #[default]
    Keep,
    /// Write zero.
    Zero,
    /// Write the reference value.
    Replace,
    /// Increment with saturation.
    Increment,
    /// Decrement with saturation.
    Decrement,
    /// Bitwise invert.
    Invert,
}

/// Descriptor of a depth-stencil state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DepthStateDescriptor {
    /// Whether depth testing is enabled.
    pub depth_enabled: bool,
    /// Whether passing fragments write depth.
    pub depth_write: bool,
    /// Depth comparison.
    pub depth_comparison: ComparisonFunction,
    /// Whether stencil testing is enabled.
    pub stencil_enabled: bool,
    /// Stencil comparison.
    pub stencil_comparison: ComparisonFunction,
    /// Operation when the stencil test passes.
    pub stencil_pass: StencilOperation,
    /// Operation when the stencil test fails.
    pub stencil_fail: StencilOperation,
    /// Reference value bound alongside the state.
    pub stencil_reference: u32,
}

impl Default for DepthStateDescriptor {
    fn default() -> Self {
        Self {
            depth_enabled: true,
            depth_write: true,
            depth_comparison: ComparisonFunction::Less,
            stencil_enabled: false,
            stencil_comparison: ComparisonFunction::Always,
            stencil_pass: StencilOperation::Keep,
            stencil_fail: StencilOperation::Keep,
            stencil_reference: 0,
        }
    }
}

/// Texture filtering of a sampler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TextureFilter {
    /// Nearest texel.
    Point,
    /// Bilinear / trilinear.
    #[default]
    Linear,
    /// Anisotropic.
    Anisotropic,
}

/// Addressing outside of `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum AddressMode {
    /// Repeat.
    #[default]
    Wrap,
    /// Repeat mirrored.
    Mirror,
    /// Clamp to the edge texel.
    Clamp,
    /// Use the border color.
    Border,
}

/// Descriptor of a sampler.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplerDescriptor {
    /// Filtering.
    pub filter: TextureFilter,
    /// U addressing.
    pub address_u: AddressMode,
    /// V addressing.
    pub address_v: AddressMode,
    /// W addressing.
    pub address_w: AddressMode,
    /// Maximum anisotropy when filtering anisotropically.
    pub max_anisotropy: u32,
    /// Comparison for comparison samplers.
    pub comparison: Option<ComparisonFunction>,
    /// Border color for [`AddressMode::Border`].
    pub border_color: Color,
    /// Lowest accessible mip.
    pub min_lod: f32,
    /// Highest accessible mip.
    pub max_lod: f32,
}

impl Default for SamplerDescriptor {
    fn default() -> Self {
        Self {
            filter: TextureFilter::Linear,
            address_u: AddressMode::Wrap,
            address_v: AddressMode::Wrap,
            address_w: AddressMode::Wrap,
            max_anisotropy: 1,
            comparison: None,
            border_color: Color::TRANSPARENT,
            min_lod: 0.0,
            max_lod: f32::MAX,
        }
    }
}

/// Any fixed-function state object a backend can create.
#[derive(Debug, Clone, PartialEq)]
pub enum StateDescriptor {
    /// Output-merger blending.
    Blend(BlendStateDescriptor),
    /// Rasterization.
    Rasterizer(RasterizerStateDescriptor),
    /// Depth and stencil testing.
    Depth(DepthStateDescriptor),
}
