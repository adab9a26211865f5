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

//! Defines the hierarchy of error types for the graphics layer.
//!
//! Validation failures of a draw or dispatch are not errors; they are
//! reported through [`GraphicsBindResult`](super::api::GraphicsBindResult).

use super::api::{BindType, ShaderStageType};
use std::fmt;

/// An error related to the creation, access or release of a GPU resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceError {
    /// A read mapping was requested on a resource without CPU read access.
    CpuReadDenied,
    /// A write mapping was requested on a resource without CPU write access.
    CpuWriteDenied,
    /// The resource was already disposed.
    Disposed,
    /// The handle refers to a released slot, or was already released.
    StaleHandle {
        /// Arena slot of the handle.
        index: u32,
        /// Generation carried by the handle.
        generation: u32,
    },
    /// An access fell outside of the resource.
    OutOfBounds {
        /// Byte offset of the access.
        offset: u64,
        /// Byte length of the access.
        len: u64,
        /// Byte size of the resource.
        capacity: u64,
    },
    /// The resource cannot be read directly and no staging resource was provided.
    StagingRequired,
    /// The provided staging resource cannot be used.
    InvalidStaging(String),
    /// Source and destination of a copy have different sizes.
    SizeMismatch {
        /// Byte size of the source.
        source: u64,
        /// Byte size of the destination.
        destination: u64,
    },
    /// An error originating from the backend.
    BackendError(String),
}

impl fmt::Display for ResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceError::CpuReadDenied => {
                write!(f, "Cannot map a resource for reading without CPU read access")
            }
            ResourceError::CpuWriteDenied => {
                write!(f, "Cannot map a resource for writing without CPU write access")
            }
            ResourceError::Disposed => write!(f, "The resource has already been disposed"),
            ResourceError::StaleHandle { index, generation } => write!(
                f,
                "Stale native handle (slot {index}, generation {generation}): already released"
            ),
            ResourceError::OutOfBounds {
                offset,
                len,
                capacity,
            } => write!(
                f,
                "Access of {len} bytes at offset {offset} exceeds resource size {capacity}"
            ),
            ResourceError::StagingRequired => write!(
                f,
                "A staging resource is required to read a resource without CPU read access"
            ),
            ResourceError::InvalidStaging(msg) => write!(f, "Invalid staging resource: {msg}"),
            ResourceError::SizeMismatch {
                source,
                destination,
            } => write!(
                f,
                "Copy size mismatch: source is {source} bytes, destination is {destination} bytes"
            ),
            ResourceError::BackendError(msg) => {
                write!(f, "Backend-specific resource error: {msg}")
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// An error related to building a shader or its passes.
#[derive(Debug, Clone, PartialEq)]
pub enum ShaderError {
    /// Two bind points of one stage share a slot for the same bind type.
    DuplicateBindPoint {
        /// The stage declaring both bind points.
        stage: ShaderStageType,
        /// The shared bind type.
        bind_type: BindType,
        /// The shared slot.
        slot: u32,
    },
    /// A bind point's slot exceeds the device's slot count.
    BindPointOutOfRange {
        /// The declaring stage.
        stage: ShaderStageType,
        /// The bind type.
        bind_type: BindType,
        /// The declared slot.
        slot: u32,
        /// Slots available for that bind type.
        capacity: u32,
    },
    /// A pass declares no stage at all.
    MissingStage,
    /// An error originating from the backend.
    BackendError(String),
}

impl fmt::Display for ShaderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShaderError::DuplicateBindPoint {
                stage,
                bind_type,
                slot,
            } => write!(
                f,
                "Duplicate {bind_type} bind point at slot {slot} in {stage} stage"
            ),
            ShaderError::BindPointOutOfRange {
                stage,
                bind_type,
                slot,
                capacity,
            } => write!(
                f,
                "{bind_type} bind point {slot} in {stage} stage exceeds the {capacity} available slots"
            ),
            ShaderError::MissingStage => write!(f, "A shader pass must declare at least one stage"),
            ShaderError::BackendError(msg) => write!(f, "Backend-specific shader error: {msg}"),
        }
    }
}

impl std::error::Error for ShaderError {}

/// Misuse of a queue or a command list. These are caller bugs, not runtime conditions.
#[derive(Debug, Clone, PartialEq)]
pub enum QueueError {
    /// `execute` was given a command list that was not recorded on a deferred queue.
    ExecuteNonDeferredList,
    /// `execute` was called on a deferred queue.
    ExecuteOnDeferredQueue,
    /// `submit` was called with the immediate queue.
    SubmitImmediateQueue,
    /// The immediate queue was passed to the deferred-queue removal path.
    RemoveImmediateQueue,
    /// The queue was already released.
    QueueAlreadyDisposed,
    /// The queue belongs to another device.
    ForeignQueue,
    /// The command list was recorded on another device.
    ForeignCommandList,
    /// The operation requires the queue to be recording.
    NotRecording,
    /// `begin` was called on a queue that is already recording.
    AlreadyRecording,
    /// The immediate queue was asked to record a deferred command list.
    DeferredFlagOnImmediate,
    /// Every allowed deferred queue is in use.
    DeferredQueueLimit {
        /// The configured cap.
        limit: u32,
    },
    /// A backend failure while recording or replaying.
    Backend(ResourceError),
}

impl fmt::Display for QueueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueueError::ExecuteNonDeferredList => {
                write!(f, "Cannot execute a command list that was not recorded on a deferred queue")
            }
            QueueError::ExecuteOnDeferredQueue => {
                write!(f, "Command lists can only be executed on the immediate queue")
            }
            QueueError::SubmitImmediateQueue => {
                write!(f, "Cannot submit the immediate queue; only deferred queues are submitted")
            }
            QueueError::RemoveImmediateQueue => {
                write!(f, "Cannot remove the immediate queue from its own device")
            }
            QueueError::QueueAlreadyDisposed => write!(f, "The queue has already been disposed"),
            QueueError::ForeignQueue => write!(f, "The queue belongs to another device"),
            QueueError::ForeignCommandList => {
                write!(f, "The command list was recorded on another device")
            }
            QueueError::NotRecording => write!(f, "The queue is not recording; call begin() first"),
            QueueError::AlreadyRecording => write!(f, "The queue is already recording"),
            QueueError::DeferredFlagOnImmediate => {
                write!(f, "The immediate queue cannot record deferred command lists")
            }
            QueueError::DeferredQueueLimit { limit } => {
                write!(f, "Deferred queue limit of {limit} reached")
            }
            QueueError::Backend(err) => write!(f, "Queue backend error: {err}"),
        }
    }
}

impl std::error::Error for QueueError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            QueueError::Backend(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ResourceError> for QueueError {
    fn from(err: ResourceError) -> Self {
        QueueError::Backend(err)
    }
}

/// Top-level error of device creation and device-wide operations.
#[derive(Debug, Clone, PartialEq)]
pub enum DeviceError {
    /// The backend could not create the device.
    InitializationFailed(String),
    /// A queue error.
    Queue(QueueError),
    /// A resource error.
    Resource(ResourceError),
    /// A shader error.
    Shader(ShaderError),
    /// A swap-chain failure.
    SwapChain(String),
    /// The native device was removed or reset.
    DeviceRemoved,
}

impl fmt::Display for DeviceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceError::InitializationFailed(msg) => {
                write!(f, "Graphics device initialization failed: {msg}")
            }
            DeviceError::Queue(err) => write!(f, "Queue error: {err}"),
            DeviceError::Resource(err) => write!(f, "Resource error: {err}"),
            DeviceError::Shader(err) => write!(f, "Shader error: {err}"),
            DeviceError::SwapChain(msg) => write!(f, "Swap chain error: {msg}"),
            DeviceError::DeviceRemoved => write!(f, "The graphics device was removed"),
        }
    }
}

impl std::error::Error for DeviceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DeviceError::Queue(err) => Some(err),
            DeviceError::Resource(err) => Some(err),
            DeviceError::Shader(err) => Some(err),
            _ => None,
        }
    }
}

impl From<QueueError> for DeviceError {
    fn from(err: QueueError) -> Self {
        DeviceError::Queue(err)
    }
}

impl From<ResourceError> for DeviceError {
    fn from(err: ResourceError) -> Self {
        DeviceError::Resource(err)
    }
}

impl From<ShaderError> for DeviceError {
    fn from(err: ShaderError) -> Self {
        DeviceError::Shader(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_map_error_messages() {
        assert_eq!(
            ResourceError::CpuReadDenied.to_string(),
            "Cannot map a resource for reading without CPU read access"
        );
        assert_eq!(
            ResourceError::CpuWriteDenied.to_string(),
            "Cannot map a resource for writing without CPU write access"
        );
    }

    #[test]
    fn test_shader_error_display() {
        let err = ShaderError::DuplicateBindPoint {
            stage: ShaderStageType::Pixel,
            bind_type: BindType::Sampler,
            slot: 2,
        };
        assert_eq!(
            err.to_string(),
            "Duplicate sampler bind point at slot 2 in pixel stage"
        );
    }

    #[test]
    fn test_device_error_wraps_sources() {
        use std::error::Error;

        let err: DeviceError = QueueError::RemoveImmediateQueue.into();
        assert_eq!(
            err.to_string(),
            "Queue error: Cannot remove the immediate queue from its own device"
        );
        assert!(err.source().is_some());

        let err: DeviceError = ResourceError::Disposed.into();
        assert!(matches!(err, DeviceError::Resource(ResourceError::Disposed)));
    }

    #[test]
    fn test_queue_error_from_resource_error() {
        let err: QueueError = ResourceError::BackendError("lost".into()).into();
        assert_eq!(
            err.to_string(),
            "Queue backend error: Backend-specific resource error: lost"
        );
    }
}
