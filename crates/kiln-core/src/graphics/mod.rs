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

//! The backend-agnostic graphics layer.
//!
//! [`backend`] holds the native contract a concrete API implements. Everything
//! else is API-agnostic: the device and its queues track what is bound on each
//! native context and only emit the calls needed to reach the requested state,
//! while resources, shaders and surfaces manage their native objects' lifetime
//! through the device's deferred disposal.

pub mod api;
pub mod backend;
pub mod command_list;
pub mod device;
pub mod disposal;
pub mod error;
pub mod handle;
pub mod queue;
pub mod resource;
pub mod segment;
pub mod shader;
pub mod stage;
pub mod state;
pub mod surface;
pub mod task;
pub mod vertex;
pub mod vram;
pub mod window;

pub use self::api::*;
pub use self::backend::{
    IndexBufferBinding, NativeContext, NativeDevice, PresentStatus, SwapChainDescriptor,
    VertexBufferBinding,
};
pub use self::command_list::{CommandList, FrameTracker};
pub use self::device::GraphicsDevice;
pub use self::disposal::{DisposalItem, Disposer};
pub use self::error::{DeviceError, QueueError, ResourceError, ShaderError};
pub use self::handle::{
    CommandListId, HandleArena, InputLayoutId, NativeId, ResourceHandle, ResourceId, SamplerId,
    ShaderProgramId, StateObjectId, SwapChainId, ViewId,
};
pub use self::queue::{GraphicsQueue, MappedResource};
pub use self::resource::GraphicsResource;
pub use self::segment::BufferSegment;
pub use self::shader::{
    BindPointDescriptor, Shader, ShaderBind, ShaderDescriptor, ShaderPass, ShaderPassBuilder,
    ShaderPassDescriptor, ShaderPassStage, ShaderStageDescriptor, ShaderValue, ShaderVariable,
};
pub use self::stage::{ShaderStage, StageBindings};
pub use self::state::{
    BlendState, DepthState, DirtyArray, RasterizerState, Sampler, StateObject, StateValue,
    StateValueGroup,
};
pub use self::surface::SwapChainSurface;
pub use self::task::{ResourceTask, ResourceTaskKind};
pub use self::vertex::{VertexElement, VertexLayout, VertexLayoutId};
pub use self::vram::VramCounter;
pub use self::window::{SurfaceWindowHandle, WindowHandle};
