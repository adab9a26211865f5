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

//! Vertex memory layouts and the per-queue input-layout cache.

use super::api::GraphicsFormat;
use super::handle::{InputLayoutId, ShaderProgramId};
use crate::utils::lock;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// One attribute of a vertex.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VertexElement {
    /// Semantic name matched against the vertex shader signature (e.g. `POSITION`).
    pub semantic: String,
    /// Index distinguishing elements sharing a semantic.
    pub semantic_index: u32,
    /// Element format.
    pub format: GraphicsFormat,
    /// Byte offset inside the vertex.
    pub offset: u32,
    /// Whether the element advances per instance instead of per vertex.
    pub per_instance: bool,
}

impl VertexElement {
    /// A per-vertex element.
    pub fn per_vertex(semantic: &str, format: GraphicsFormat, offset: u32) -> Self {
        Self {
            semantic: semantic.to_string(),
            semantic_index: 0,
            format,
            offset,
            per_instance: false,
        }
    }

    /// A per-instance element.
    pub fn per_instance(semantic: &str, format: GraphicsFormat, offset: u32) -> Self {
        Self {
            per_instance: true,
            ..Self::per_vertex(semantic, format, offset)
        }
    }
}

/// The memory layout of one vertex buffer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct VertexLayout {
    /// Elements in declaration order.
    pub elements: Vec<VertexElement>,
}

impl VertexLayout {
    /// A layout from its elements.
    pub fn new(elements: Vec<VertexElement>) -> Self {
        Self { elements }
    }

    /// Size of one vertex in bytes.
    pub fn stride(&self) -> u32 {
        self.elements
            .iter()
            .map(|e| e.offset + e.format.bytes_per_pixel())
            .max()
            .unwrap_or(0)
    }

    /// `true` if any element is per-instance.
    pub fn is_instanced(&self) -> bool {
        self.elements.iter().any(|e| e.per_instance)
    }
}

/// Interned id of a [`VertexLayout`], unique per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VertexLayoutId(pub u32);

/// Device-wide interning of vertex layouts, so equal layouts share one id.
#[derive(Debug, Default)]
pub(crate) struct VertexLayoutRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Debug, Default)]
struct RegistryInner {
    layouts: Vec<Arc<VertexLayout>>,
    lookup: HashMap<VertexLayout, VertexLayoutId>,
}

impl VertexLayoutRegistry {
    pub(crate) fn intern(&self, layout: VertexLayout) -> VertexLayoutId {
        let mut inner = lock(&self.inner);
        if let Some(id) = inner.lookup.get(&layout) {
            return *id;
        }
        let id = VertexLayoutId(inner.layouts.len() as u32);
        inner.layouts.push(Arc::new(layout.clone()));
        inner.lookup.insert(layout, id);
        id
    }

    pub(crate) fn get(&self, id: VertexLayoutId) -> Option<Arc<VertexLayout>> {
        lock(&self.inner).layouts.get(id.0 as usize).cloned()
    }
}

/// Cache key of a native input layout: the bound vertex layouts and the vertex program.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) struct InputLayoutKey {
    pub vertex_layouts: Vec<Option<VertexLayoutId>>,
    pub program: Option<ShaderProgramId>,
}

impl InputLayoutKey {
    /// A key with no vertex buffer bound describes the null layout.
    pub fn is_null(&self) -> bool {
        self.vertex_layouts.iter().all(Option::is_none)
    }
}

/// A memoized input layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct CachedInputLayout {
    /// `None` for the null layout.
    pub native: Option<InputLayoutId>,
    pub is_instanced: bool,
}
