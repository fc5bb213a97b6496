//! Scan-out surface descriptor snapshots
//!
//! A fetched framebuffer descriptor carries process-local GEM handle
//! references that accumulate in the kernel if not closed. [`SurfaceGuard`]
//! ties their release to scope exit so every path out of an acquisition
//! cycle, including the skip paths, returns the references.

use tracing::warn;

use crate::device::KmsDevice;
use crate::error::Result;
use crate::types::{CrtcId, FbId, SurfaceInfo};

/// A framebuffer descriptor whose handle references are released on drop
pub struct SurfaceGuard<'d, D: KmsDevice> {
    device: &'d D,
    info: SurfaceInfo,
}

impl<'d, D: KmsDevice> SurfaceGuard<'d, D> {
    /// Fetch the extended descriptor for a framebuffer
    ///
    /// Returns `None` when the framebuffer was destroyed between lookup and
    /// fetch, which happens under concurrent mode changes and simply means no
    /// frame is available this cycle.
    pub fn fetch(device: &'d D, fb: FbId) -> Result<Option<Self>> {
        Ok(device.framebuffer(fb)?.map(|info| Self { device, info }))
    }

    /// The descriptor itself
    pub fn info(&self) -> &SurfaceInfo {
        &self.info
    }
}

impl<D: KmsDevice> Drop for SurfaceGuard<'_, D> {
    fn drop(&mut self) {
        // Planes can share one backing handle; close each reference once.
        let mut closed = [0u32; 4];
        let mut n = 0;
        for layout in &self.info.planes {
            let handle = layout.handle;
            if handle == 0 || closed[..n].contains(&handle) {
                continue;
            }
            closed[n] = handle;
            n += 1;
            if let Err(e) = self.device.release_buffer(handle) {
                warn!("failed to release buffer handle {}: {}", handle, e);
            }
        }
    }
}

/// Snapshot the framebuffer currently bound to a CRTC
///
/// Used when a specific CRTC has been pinned to a named output; it skips
/// plane enumeration (and with it the placeholder heuristic) entirely.
/// `None` means the CRTC has no bound framebuffer this cycle.
pub fn crtc_surface<'d, D: KmsDevice>(
    device: &'d D,
    crtc: CrtcId,
) -> Result<Option<SurfaceGuard<'d, D>>> {
    match device.crtc_framebuffer(crtc)? {
        Some(fb) => SurfaceGuard::fetch(device, fb),
        None => Ok(None),
    }
}
