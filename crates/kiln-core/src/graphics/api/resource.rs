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

//! Creation parameters of buffers and textures.

use super::enums::{GraphicsFormat, IndexFormat};
use super::flags::GraphicsResourceFlags;
use super::types::TextureDimensions;

/// The role of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferType {
    /// Vertex data for the input assembler.
    Vertex,
    /// Index data for the input assembler.
    Index,
    /// Shader constants.
    Constant,
    /// Structured elements readable (or writable) by shaders.
    Structured,
    /// CPU-accessible copy target.
    Staging,
}

/// The role and shape of a texture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureKind {
    /// One-dimensional texture.
    Texture1D,
    /// Two-dimensional texture.
    Texture2D,
    /// Volume texture.
    Texture3D,
    /// Six-faced cube texture.
    Cube,
    /// A 2D texture that can be rendered to.
    RenderSurface,
    /// A 2D depth-stencil texture.
    DepthSurface,
}

/// What a resource is, as far as its size and views are concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceKind {
    /// A linear buffer of `element_count` elements of `stride` bytes.
    Buffer {
        /// Role of the buffer.
        buffer_type: BufferType,
        /// Bytes per element.
        stride: u32,
        /// Number of elements.
        element_count: u32,
    },
    /// A texture.
    Texture {
        /// Role and shape.
        kind: TextureKind,
        /// Size and mip layout.
        dimensions: TextureDimensions,
        /// Texel format.
        format: GraphicsFormat,
    },
}

impl ResourceKind {
    /// Total byte size of the resource, every subresource included.
    pub fn byte_size(&self) -> u64 {
        match *self {
            ResourceKind::Buffer {
                stride,
                element_count,
                ..
            } => stride as u64 * element_count as u64,
            ResourceKind::Texture {
                kind,
                dimensions,
                format,
            } => {
                let faces = if kind == TextureKind::Cube { 6 } else { 1 };
                dimensions.byte_size(format.bytes_per_pixel()) * faces
            }
        }
    }

    /// The buffer role, if this is a buffer.
    pub fn buffer_type(&self) -> Option<BufferType> {
        match *self {
            ResourceKind::Buffer { buffer_type, .. } => Some(buffer_type),
            ResourceKind::Texture { .. } => None,
        }
    }

    /// Element size in bytes (texel size for textures).
    pub fn stride(&self) -> u32 {
        match *self {
            ResourceKind::Buffer { stride, .. } => stride,
            ResourceKind::Texture { format, .. } => format.bytes_per_pixel(),
        }
    }

    /// Index format of an index buffer.
    pub fn index_format(&self) -> Option<IndexFormat> {
        match *self {
            ResourceKind::Buffer {
                buffer_type: BufferType::Index,
                stride,
                ..
            } => Some(IndexFormat::from_stride(stride)),
            _ => None,
        }
    }

    /// `true` for vertex and index buffers.
    pub fn is_geometry_buffer(&self) -> bool {
        matches!(
            self.buffer_type(),
            Some(BufferType::Vertex) | Some(BufferType::Index)
        )
    }
}

/// Everything a backend needs to create a native resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceDescriptor {
    /// Debug name.
    pub label: Option<String>,
    /// Shape and role.
    pub kind: ResourceKind,
    /// Access and usage flags.
    pub flags: GraphicsResourceFlags,
}

impl ResourceDescriptor {
    /// The views a backend must create alongside the resource.
    pub fn views(&self) -> ViewRequirements {
        let (rtv, dsv) = match self.kind {
            ResourceKind::Texture {
                kind: TextureKind::RenderSurface,
                ..
            } => (true, false),
            ResourceKind::Texture {
                kind: TextureKind::DepthSurface,
                ..
            } => (false, true),
            _ => (false, false),
        };

        let srv = match self.kind {
            ResourceKind::Buffer { buffer_type, .. } => {
                matches!(buffer_type, BufferType::Structured)
                    && !self.flags.contains(GraphicsResourceFlags::DENY_SHADER_ACCESS)
            }
            ResourceKind::Texture { .. } => {
                !self.flags.contains(GraphicsResourceFlags::DENY_SHADER_ACCESS)
            }
        };

        ViewRequirements {
            srv,
            uav: self.flags.contains(GraphicsResourceFlags::UNORDERED_ACCESS),
            rtv,
            dsv,
        }
    }
}

/// Which views a resource handle owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ViewRequirements {
    /// Shader-resource view.
    pub srv: bool,
    /// Unordered-access view.
    pub uav: bool,
    /// Render-target view.
    pub rtv: bool,
    /// Depth-stencil view, plus its read-only twin.
    pub dsv: bool,
}
