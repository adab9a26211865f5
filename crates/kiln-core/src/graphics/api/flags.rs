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

//! Flag sets translated by every backend to its native usage and access bits.

use crate::kiln_bitflags;

kiln_bitflags! {
    /// Access and usage flags of a [`GraphicsResource`](crate::graphics::GraphicsResource).
    pub struct GraphicsResourceFlags: u32 {
        /// The CPU may map the resource for reading.
        const CPU_READ = 1 << 0;
        /// The CPU may map the resource for writing.
        const CPU_WRITE = 1 << 1;
        /// The GPU may read the resource.
        const GPU_READ = 1 << 2;
        /// The GPU may write the resource.
        const GPU_WRITE = 1 << 3;
        /// The resource gets an unordered-access view.
        const UNORDERED_ACCESS = 1 << 4;
        /// The resource never gets a shader-resource view.
        const DENY_SHADER_ACCESS = 1 << 5;
        /// Writes discard the previous contents.
        const DISCARD = 1 << 6;
        /// The native resource may be shared with other devices.
        const SHARED = 1 << 7;
    }
}

impl GraphicsResourceFlags {
    /// `true` when the CPU can write but not read, the typical dynamic upload resource.
    pub const fn is_cpu_write_only(&self) -> bool {
        self.contains(Self::CPU_WRITE) && !self.contains(Self::CPU_READ)
    }

    /// `true` when any CPU access is allowed.
    pub const fn has_cpu_access(&self) -> bool {
        self.intersects(Self::CPU_READ.with(Self::CPU_WRITE))
    }
}

kiln_bitflags! {
    /// Properties of a command list, set when its recording queue begins.
    pub struct CommandListFlags: u32 {
        /// Recorded on a deferred queue for later replay.
        const DEFERRED = 1 << 0;
        /// The CPU can wait for the list to finish executing.
        const CPU_SYNCABLE = 1 << 1;
        /// The list is released after its first execution.
        const SINGLE_SUBMIT = 1 << 2;
    }
}
