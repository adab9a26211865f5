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

//! # Kiln Core
//!
//! Backend-agnostic graphics contracts and the machinery that sits on top of them:
//! dirty-tracked binding state, the render/compute pass protocol, and the
//! lifecycle of GPU resources (handles, deferred disposal, VRAM accounting,
//! resource tasks and swap-chain presentation).
//!
//! Concrete backends live in `kiln-infra` and implement the traits found in
//! [`graphics::backend`].

#![warn(missing_docs)]

pub mod graphics;
pub mod telemetry;
pub mod utils;

pub use graphics::{GraphicsDevice, GraphicsQueue};
