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

//! An in-memory backend.
//!
//! [`HeadlessDevice`] implements the native contract without a GPU: resources
//! are byte arrays, and every context call lands in a [`CallLog`] that tests
//! inspect to assert which native calls the core emitted.

mod call_log;
mod context;
mod device;
mod store;

pub use call_log::{CallLog, LoggedCall, NativeCall};
pub use device::{HeadlessConfig, HeadlessDevice};
