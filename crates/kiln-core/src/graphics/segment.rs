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

use super::resource::GraphicsResource;
use crate::utils::Poolable;
use std::sync::Arc;

/// A byte range of a parent buffer, bound as if it were a buffer of its own.
///
/// Segments are pooled by the device; see
/// [`GraphicsDevice::acquire_buffer_segment`](super::GraphicsDevice::acquire_buffer_segment).
#[derive(Debug, Default)]
pub struct BufferSegment {
    /// The buffer the range lives in.
    pub parent: Option<Arc<GraphicsResource>>,
    /// Offset of the first byte.
    pub byte_offset: u32,
    /// Length of the range.
    pub byte_count: u32,
    /// Bytes per element.
    pub stride: u32,
}

impl BufferSegment {
    /// Number of whole elements in the range.
    pub fn element_count(&self) -> u32 {
        match self.stride {
            0 => 0,
            stride => self.byte_count / stride,
        }
    }
}

impl Poolable for BufferSegment {
    fn clear_for_pool(&mut self) {
        self.parent = None;
        self.byte_offset = 0;
        self.byte_count = 0;
        self.stride = 0;
    }
}
