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

//! Swap-chain surfaces: back-buffer ownership and presentation.

use super::api::{
    GraphicsFormat, GraphicsResourceFlags, ResourceDescriptor, ResourceKind, TextureDimensions,
    TextureKind,
};
use super::backend::{PresentStatus, SwapChainDescriptor};
use super::device::DeviceShared;
use super::disposal::DisposalItem;
use super::error::DeviceError;
use super::handle::SwapChainId;
use super::resource::GraphicsResource;
use crate::utils::{lock, ErrorDeduper};
use std::fmt;
use std::sync::{Arc, Mutex};

type SurfaceAction = Box<dyn FnOnce(&SwapChainSurface) + Send>;

#[derive(Debug)]
struct SurfaceState {
    vsync: bool,
    enabled: bool,
    width: u32,
    height: u32,
    pending_resize: Option<(u32, u32)>,
    errors: ErrorDeduper<PresentStatus>,
    last_status: Option<PresentStatus>,
    presented: u64,
}

/// A window's swap chain and the render surface wrapping its back buffer.
///
/// Resizes and dispatched actions are deferred to the next [`present`](Self::present),
/// so any thread can request them while the presenting thread owns the chain.
pub struct SwapChainSurface {
    id: SwapChainId,
    label: Option<String>,
    format: GraphicsFormat,
    device: Arc<DeviceShared>,
    back_buffer: Arc<GraphicsResource>,
    state: Mutex<SurfaceState>,
    actions: flume::Sender<SurfaceAction>,
    pending_actions: flume::Receiver<SurfaceAction>,
}

fn back_buffer_descriptor(
    label: Option<&str>,
    width: u32,
    height: u32,
    format: GraphicsFormat,
) -> ResourceDescriptor {
    ResourceDescriptor {
        label: label.map(|l| format!("{l}/back-buffer")),
        kind: ResourceKind::Texture {
            kind: TextureKind::RenderSurface,
            dimensions: TextureDimensions::new_2d(width, height),
            format,
        },
        flags: GraphicsResourceFlags::GPU_READ | GraphicsResourceFlags::GPU_WRITE,
    }
}

impl SwapChainSurface {
    pub(crate) fn new(
        device: &Arc<DeviceShared>,
        descriptor: SwapChainDescriptor,
    ) -> Result<Arc<Self>, DeviceError> {
        let id = device.native.create_swap_chain(&descriptor)?;
        let handle = match device.native.swap_chain_back_buffer(id) {
            Ok(handle) => handle,
            Err(err) => {
                device.disposer.mark(DisposalItem::SwapChain(id));
                return Err(DeviceError::SwapChain(err.to_string()));
            }
        };
        let back_buffer = GraphicsResource::external(
            device,
            back_buffer_descriptor(
                descriptor.label.as_deref(),
                descriptor.width,
                descriptor.height,
                descriptor.format,
            ),
            handle,
        );
        let (actions, pending_actions) = flume::unbounded();

        log::debug!(
            "Created swap chain {:?} ({}x{}, {:?})",
            descriptor.label,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );

        Ok(Arc::new(Self {
            id,
            label: descriptor.label,
            format: descriptor.format,
            device: device.clone(),
            back_buffer,
            state: Mutex::new(SurfaceState {
                vsync: device.settings.vsync,
                enabled: true,
                width: descriptor.width,
                height: descriptor.height,
                pending_resize: None,
                errors: ErrorDeduper::new(),
                last_status: None,
                presented: 0,
            }),
            actions,
            pending_actions,
        }))
    }

    /// Native id of the swap chain.
    pub fn id(&self) -> SwapChainId {
        self.id
    }

    /// Debug name.
    pub fn label(&self) -> Option<&str> {
        self.label.as_deref()
    }

    /// The render surface to draw into. Its native handle changes on resize.
    pub fn back_buffer(&self) -> &Arc<GraphicsResource> {
        &self.back_buffer
    }

    /// Back-buffer format.
    pub fn format(&self) -> GraphicsFormat {
        self.format
    }

    /// Current back-buffer width.
    pub fn width(&self) -> u32 {
        lock(&self.state).width
    }

    /// Current back-buffer height.
    pub fn height(&self) -> u32 {
        lock(&self.state).height
    }

    /// Whether presents wait for the vertical blank.
    pub fn vsync(&self) -> bool {
        lock(&self.state).vsync
    }

    /// Toggles VSync. Takes effect on the next present.
    pub fn set_vsync(&self, vsync: bool) {
        lock(&self.state).vsync = vsync;
    }

    /// Disabled surfaces are skipped by [`GraphicsDevice::present`](super::GraphicsDevice::present).
    pub fn is_enabled(&self) -> bool {
        lock(&self.state).enabled
    }

    /// Enables or disables the surface.
    pub fn set_enabled(&self, enabled: bool) {
        lock(&self.state).enabled = enabled;
    }

    /// Requests a resize, applied at the start of the next present.
    ///
    /// A zero dimension (a minimized window) is ignored.
    pub fn resize(&self, width: u32, height: u32) {
        if width == 0 || height == 0 {
            log::trace!("Ignoring resize of swap chain {:?} to {width}x{height}", self.id);
            return;
        }
        lock(&self.state).pending_resize = Some((width, height));
    }

    /// Queues `action` to run on the presenting thread right after the next present.
    pub fn dispatch(&self, action: impl FnOnce(&SwapChainSurface) + Send + 'static) {
        // The receiver lives as long as `self`, so the send cannot fail.
        let _ = self.actions.send(Box::new(action));
    }

    /// Number of actions waiting for the next present.
    pub fn pending_actions(&self) -> usize {
        self.pending_actions.len()
    }

    /// Number of successful presents.
    pub fn frames_presented(&self) -> u64 {
        lock(&self.state).presented
    }

    /// Status returned by the most recent present.
    pub fn last_status(&self) -> Option<PresentStatus> {
        lock(&self.state).last_status
    }

    /// Presents the back buffer.
    ///
    /// Native failures never propagate: they are logged once per run of
    /// identical statuses and the frame goes on without output.
    pub fn present(&self) {
        self.apply_pending_resize();

        let sync_interval = if self.vsync() { 1 } else { 0 };
        let status = self.device.native.present(self.id, sync_interval);
        {
            let mut state = lock(&self.state);
            state.last_status = Some(status);
            match status {
                PresentStatus::Ok => {
                    state.errors.clear();
                    state.presented += 1;
                }
                PresentStatus::Occluded => state.errors.clear(),
                failure => {
                    if state.errors.observe(failure) {
                        if failure.is_device_lost() {
                            log::error!(
                                "Present of swap chain {:?} failed: device lost ({:?})",
                                self.id,
                                failure
                            );
                        } else {
                            log::warn!("Present of swap chain {:?} failed: {:?}", self.id, failure);
                        }
                    }
                }
            }
        }

        for action in self.pending_actions.try_iter() {
            action(self);
        }
    }

    fn apply_pending_resize(&self) {
        let (width, height) = {
            let mut state = lock(&self.state);
            match state.pending_resize.take() {
                Some(size) if size != (state.width, state.height) => size,
                _ => return,
            }
        };

        let native = &self.device.native;
        let resized = native
            .resize_swap_chain(self.id, width, height)
            .and_then(|()| native.swap_chain_back_buffer(self.id));
        match resized {
            Ok(handle) => {
                let descriptor = back_buffer_descriptor(None, width, height, self.format);
                self.back_buffer.replace_handle(handle, descriptor.kind);
                let mut state = lock(&self.state);
                state.width = width;
                state.height = height;
                log::info!("Resized swap chain {:?} to {width}x{height}", self.id);
            }
            Err(err) => log::error!("Failed to resize swap chain {:?}: {}", self.id, err),
        }
    }
}

impl fmt::Debug for SwapChainSurface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SwapChainSurface")
            .field("id", &self.id)
            .field("label", &self.label)
            .field("format", &self.format)
            .field("state", &*lock(&self.state))
            .finish()
    }
}

impl Drop for SwapChainSurface {
    fn drop(&mut self) {
        self.device.disposer.mark(DisposalItem::SwapChain(self.id));
    }
}
