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

//! Enums shared by the queue, the device and every backend.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A programmable stage of the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStageType {
    /// Vertex shader.
    Vertex,
    /// Hull (tessellation control) shader.
    Hull,
    /// Domain (tessellation evaluation) shader.
    Domain,
    /// Geometry shader.
    Geometry,
    /// Pixel (fragment) shader.
    Pixel,
    /// Compute shader.
    Compute,
}

impl ShaderStageType {
    /// Number of stage types.
    pub const COUNT: usize = 6;

    /// The stages bound by a render pass, in binding order. The vertex stage comes first.
    pub const RENDER_STAGES: [ShaderStageType; 5] = [
        ShaderStageType::Vertex,
        ShaderStageType::Hull,
        ShaderStageType::Domain,
        ShaderStageType::Geometry,
        ShaderStageType::Pixel,
    ];

    /// Dense index of the stage, usable for per-stage arrays.
    pub const fn index(self) -> usize {
        match self {
            ShaderStageType::Vertex => 0,
            ShaderStageType::Hull => 1,
            ShaderStageType::Domain => 2,
            ShaderStageType::Geometry => 3,
            ShaderStageType::Pixel => 4,
            ShaderStageType::Compute => 5,
        }
    }
}

impl fmt::Display for ShaderStageType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ShaderStageType::Vertex => "vertex",
            ShaderStageType::Hull => "hull",
            ShaderStageType::Domain => "domain",
            ShaderStageType::Geometry => "geometry",
            ShaderStageType::Pixel => "pixel",
            ShaderStageType::Compute => "compute",
        };
        f.write_str(name)
    }
}

/// The kind of object a bind point expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BindType {
    /// A constant (uniform) buffer.
    ConstantBuffer,
    /// A shader-resource view of a buffer or texture.
    Resource,
    /// A sampler state.
    Sampler,
    /// An unordered-access view.
    UnorderedAccess,
}

impl fmt::Display for BindType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BindType::ConstantBuffer => "constant buffer",
            BindType::Resource => "resource",
            BindType::Sampler => "sampler",
            BindType::UnorderedAccess => "unordered access",
        };
        f.write_str(name)
    }
}

/// How vertices are assembled into primitives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    /// No topology. A render pass declaring it can never be drawn.
    Undefined,
    /// Isolated points.
    PointList,
    /// Isolated line segments.
    LineList,
    /// Connected line segments.
    LineStrip,
    /// Isolated triangles.
    #[default]
    TriangleList,
    /// Connected triangles.
    TriangleStrip,
    /// Line list with adjacency data.
    LineListWithAdjacency,
    /// Triangle list with adjacency data.
    TriangleListWithAdjacency,
    /// Tessellation patches with the given number of control points (1 to 32).
    PatchList(u8),
}

impl PrimitiveTopology {
    /// Whether a native API can draw with this topology.
    pub fn is_supported(self) -> bool {
        match self {
            PrimitiveTopology::Undefined => false,
            PrimitiveTopology::PatchList(points) => (1..=32).contains(&points),
            _ => true,
        }
    }
}

/// Outcome of binding pipeline state for a draw or dispatch.
///
/// Expected validation failures are reported through this value, never
/// through an error type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsBindResult {
    /// Everything was bound and the call was issued.
    Successful,
    /// The pass declares a topology the pipeline cannot draw.
    UndefinedTopology,
    /// An instanced draw was requested but the input layout has no per-instance elements.
    NonInstancedVertexLayout,
    /// An indexed draw was requested without a bound index buffer.
    MissingIndexBuffer,
    /// A dispatch was requested but the pass has no compute stage.
    MissingComputeStage,
    /// A thread-group dimension is zero or exceeds the device limit.
    InvalidComputeGroups,
    /// The shader has no enabled pass for the requested operation.
    NoEnabledPass,
}

impl GraphicsBindResult {
    /// `true` for [`GraphicsBindResult::Successful`].
    pub fn is_successful(self) -> bool {
        self == GraphicsBindResult::Successful
    }
}

/// The kind of call a pass is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueValidationMode {
    /// `draw_indexed`.
    Indexed,
    /// `draw_instanced`.
    Instanced,
    /// `draw`.
    Unindexed,
    /// `draw_indexed_instanced`.
    InstancedIndexed,
    /// `dispatch`.
    Compute,
}

/// How a pass may use the bound depth surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DepthWritePermission {
    /// Depth is tested and written.
    #[default]
    Enabled,
    /// Depth is tested through a read-only view, so it can be sampled in the same pass.
    ReadOnly,
    /// No depth surface is bound.
    Disabled,
}

/// CPU access requested when mapping a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapType {
    /// Read the current contents. Requires CPU read access.
    Read,
    /// Write into the existing contents. Requires CPU write access.
    Write,
    /// Write into a fresh allocation, discarding previous contents.
    Discard,
}

/// The mapping mode actually requested from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NativeMapMode {
    /// Read access.
    Read,
    /// Write access that may stall until the GPU is done with the resource.
    Write,
    /// Write access backed by a fresh allocation.
    WriteDiscard,
    /// Write access with a promise not to touch data the GPU may still be reading.
    WriteNoOverwrite,
}

/// Whether a queue talks straight to the GPU or records for later replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandQueueType {
    /// The device's single submitting queue.
    Immediate,
    /// A recording queue producing command lists.
    Deferred,
}

/// When a resource task runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum TaskPriority {
    /// Processed synchronously on the calling queue.
    Immediate,
    /// Queued on the resource and processed the next time it is applied on a queue.
    #[default]
    Apply,
    /// Queued on the device and processed at the start of the next frame.
    StartOfFrame,
}

/// API-agnostic pixel and element formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum GraphicsFormat {
    /// Typeless or raw data.
    #[default]
    Unknown,
    /// One 8-bit normalized channel.
    R8Unorm,
    /// Four 8-bit normalized channels.
    R8G8B8A8Unorm,
    /// Four 8-bit normalized channels, sRGB encoded.
    R8G8B8A8UnormSrgb,
    /// Four 8-bit normalized channels in BGRA order.
    B8G8R8A8Unorm,
    /// One 16-bit float channel.
    R16Float,
    /// Two 16-bit float channels.
    R16G16Float,
    /// Four 16-bit float channels.
    R16G16B16A16Float,
    /// One 16-bit unsigned integer channel.
    R16Uint,
    /// One 32-bit float channel.
    R32Float,
    /// Two 32-bit float channels.
    R32G32Float,
    /// Three 32-bit float channels.
    R32G32B32Float,
    /// Four 32-bit float channels.
    R32G32B32A32Float,
    /// One 32-bit unsigned integer channel.
    R32Uint,
    /// 24-bit depth with 8-bit stencil.
    D24UnormS8Uint,
    /// 32-bit float depth.
    D32Float,
}

impl GraphicsFormat {
    /// Size in bytes of one element, or 1 for [`GraphicsFormat::Unknown`].
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            GraphicsFormat::Unknown | GraphicsFormat::R8Unorm => 1,
            GraphicsFormat::R16Float | GraphicsFormat::R16Uint => 2,
            GraphicsFormat::R8G8B8A8Unorm
            | GraphicsFormat::R8G8B8A8UnormSrgb
            | GraphicsFormat::B8G8R8A8Unorm
            | GraphicsFormat::R16G16Float
            | GraphicsFormat::R32Float
            | GraphicsFormat::R32Uint
            | GraphicsFormat::D24UnormS8Uint
            | GraphicsFormat::D32Float => 4,
            GraphicsFormat::R16G16B16A16Float | GraphicsFormat::R32G32Float => 8,
            GraphicsFormat::R32G32B32Float => 12,
            GraphicsFormat::R32G32B32A32Float => 16,
        }
    }

    /// `true` for depth-stencil formats.
    pub const fn is_depth(self) -> bool {
        matches!(self, GraphicsFormat::D24UnormS8Uint | GraphicsFormat::D32Float)
    }
}

/// Element type of an index buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IndexFormat {
    /// 16-bit indices.
    Uint16,
    /// 32-bit indices.
    Uint32,
}

impl IndexFormat {
    /// Picks the index format matching an element stride in bytes.
    pub fn from_stride(stride: u32) -> Self {
        if stride == 2 {
            IndexFormat::Uint16
        } else {
            IndexFormat::Uint32
        }
    }

    /// Size in bytes of one index.
    pub const fn size(self) -> u32 {
        match self {
            IndexFormat::Uint16 => 2,
            IndexFormat::Uint32 => 4,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_indices_are_dense() {
        let mut seen = [false; ShaderStageType::COUNT];
        for stage in ShaderStageType::RENDER_STAGES
            .iter()
            .chain(std::iter::once(&ShaderStageType::Compute))
        {
            assert!(!seen[stage.index()]);
            seen[stage.index()] = true;
        }
        assert!(seen.iter().all(|s| *s));
        assert_eq!(ShaderStageType::RENDER_STAGES[0], ShaderStageType::Vertex);
    }

    #[test]
    fn test_topology_support() {
        assert!(!PrimitiveTopology::Undefined.is_supported());
        assert!(PrimitiveTopology::TriangleList.is_supported());
        assert!(PrimitiveTopology::PatchList(3).is_supported());
        assert!(!PrimitiveTopology::PatchList(0).is_supported());
        assert!(!PrimitiveTopology::PatchList(33).is_supported());
    }

    #[test]
    fn test_format_sizes() {
        assert_eq!(GraphicsFormat::R8G8B8A8Unorm.bytes_per_pixel(), 4);
        assert_eq!(GraphicsFormat::R32G32B32A32Float.bytes_per_pixel(), 16);
        assert!(GraphicsFormat::D32Float.is_depth());
        assert_eq!(IndexFormat::from_stride(2), IndexFormat::Uint16);
        assert_eq!(IndexFormat::from_stride(4).size(), 4);
    }
}
