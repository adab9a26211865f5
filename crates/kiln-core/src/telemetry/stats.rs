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

//! Per-queue call counters.

use std::ops::AddAssign;

/// Counters of the native calls a queue issued.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    /// Draw callbacks invoked (one per pass iteration).
    pub draw_calls: u64,
    /// Dispatches issued (one per pass iteration).
    pub dispatch_calls: u64,
    /// Render-target binds.
    pub bind_surface_calls: u64,
    /// Shader program binds.
    pub shader_binds: u64,
    /// Ranged shader-resource binds.
    pub resource_binds: u64,
    /// Ranged sampler binds.
    pub sampler_binds: u64,
    /// Ranged constant-buffer binds.
    pub constant_buffer_binds: u64,
    /// Ranged unordered-access binds, compute and output merger.
    pub unordered_access_binds: u64,
    /// Map calls.
    pub map_calls: u64,
    /// Whole-resource and region copies.
    pub copy_calls: u64,
    /// Subresource updates without mapping.
    pub update_calls: u64,
    /// Resource tasks that passed validation and ran.
    pub tasks_processed: u64,
    /// Resource tasks dropped by validation.
    pub tasks_discarded: u64,
}

impl QueueStats {
    /// Zeroes every counter.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Sum of every ranged bind issued by shader stages.
    pub fn stage_bind_calls(&self) -> u64 {
        self.shader_binds
            + self.resource_binds
            + self.sampler_binds
            + self.constant_buffer_binds
            + self.unordered_access_binds
    }
}

impl AddAssign for QueueStats {
    fn add_assign(&mut self, other: Self) {
        self.draw_calls += other.draw_calls;
        self.dispatch_calls += other.dispatch_calls;
        self.bind_surface_calls += other.bind_surface_calls;
        self.shader_binds += other.shader_binds;
        self.resource_binds += other.resource_binds;
        self.sampler_binds += other.sampler_binds;
        self.constant_buffer_binds += other.constant_buffer_binds;
        self.unordered_access_binds += other.unordered_access_binds;
        self.map_calls += other.map_calls;
        self.copy_calls += other.copy_calls;
        self.update_calls += other.update_calls;
        self.tasks_processed += other.tasks_processed;
        self.tasks_discarded += other.tasks_discarded;
    }
}
