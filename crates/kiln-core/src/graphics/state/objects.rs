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

use crate::graphics::api::{
    BlendStateDescriptor, DepthStateDescriptor, RasterizerStateDescriptor, SamplerDescriptor,
};
use crate::graphics::disposal::{DisposalItem, Disposer};
use crate::graphics::handle::{SamplerId, StateObjectId};

/// An immutable native state object created from a descriptor.
///
/// Queues compare state objects by native id, so two objects built from
/// equal descriptors still count as different bindings.
#[derive(Debug)]
pub struct StateObject<D> {
    id: StateObjectId,
    descriptor: D,
    disposer: Disposer,
}

/// Output-merger blend state.
pub type BlendState = StateObject<BlendStateDescriptor>;
/// Rasterizer state.
pub type RasterizerState = StateObject<RasterizerStateDescriptor>;
/// Depth-stencil state.
pub type DepthState = StateObject<DepthStateDescriptor>;

impl<D> StateObject<D> {
    pub(crate) fn new(id: StateObjectId, descriptor: D, disposer: Disposer) -> Self {
        Self {
            id,
            descriptor,
            disposer,
        }
    }

    /// The native state object.
    pub fn id(&self) -> StateObjectId {
        self.id
    }

    /// The descriptor the state was created from.
    pub fn descriptor(&self) -> &D {
        &self.descriptor
    }
}

impl<D> Drop for StateObject<D> {
    fn drop(&mut self) {
        self.disposer.mark(DisposalItem::StateObject(self.id));
    }
}

/// A native sampler.
#[derive(Debug)]
pub struct Sampler {
    id: SamplerId,
    descriptor: SamplerDescriptor,
    disposer: Disposer,
}

impl Sampler {
    pub(crate) fn new(id: SamplerId, descriptor: SamplerDescriptor, disposer: Disposer) -> Self {
        Self {
            id,
            descriptor,
            disposer,
        }
    }

    /// The native sampler.
    pub fn id(&self) -> SamplerId {
        self.id
    }

    /// The descriptor the sampler was created from.
    pub fn descriptor(&self) -> &SamplerDescriptor {
        &self.descriptor
    }
}

impl Drop for Sampler {
    fn drop(&mut self) {
        self.disposer.mark(DisposalItem::Sampler(self.id));
    }
}
