//! Active scan-out plane resolution
//!
//! Finds the hardware plane whose framebuffer currently represents visible
//! content on a CRTC. Plane assignments are stable across frames once a
//! compositor settles, so the last successful plane is cached and retried
//! first; a full scan runs only when the cached plane no longer reports an
//! active framebuffer.

use std::str::FromStr;

use tracing::{debug, trace};

use crate::capture::surface::SurfaceGuard;
use crate::device::KmsDevice;
use crate::error::Result;
use crate::types::CrtcId;

/// Surface size treated as a cursor/placeholder overlay and never selected
///
/// Cursor planes on common hardware scan out a fixed 256x256 buffer. The size
/// is configurable because it is a heuristic: unusual hardware could use a
/// different cursor size, or legitimately scan out at 256x256.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlaceholderFilter {
    pub width: u32,
    pub height: u32,
}

impl PlaceholderFilter {
    /// Whether a surface of the given size is a placeholder
    pub fn matches(&self, width: u32, height: u32) -> bool {
        width == self.width && height == self.height
    }
}

impl Default for PlaceholderFilter {
    fn default() -> Self {
        Self {
            width: 256,
            height: 256,
        }
    }
}

impl std::fmt::Display for PlaceholderFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

impl FromStr for PlaceholderFilter {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (w, h) = s
            .split_once(['x', 'X'])
            .ok_or_else(|| format!("expected WIDTHxHEIGHT, got '{}'", s))?;
        let width = w
            .trim()
            .parse()
            .map_err(|_| format!("invalid width in '{}'", s))?;
        let height = h
            .trim()
            .parse()
            .map_err(|_| format!("invalid height in '{}'", s))?;
        Ok(Self { width, height })
    }
}

/// Resolves the active scan-out surface for one CRTC
///
/// Owns the "last good plane" cache for its CRTC, so monitoring several
/// outputs keeps their caches independent.
#[derive(Debug)]
pub struct PlaneResolver {
    crtc: CrtcId,
    last_good: Option<crate::types::PlaneId>,
    placeholder: PlaceholderFilter,
}

impl PlaneResolver {
    pub fn new(crtc: CrtcId, placeholder: PlaceholderFilter) -> Self {
        Self {
            crtc,
            last_good: None,
            placeholder,
        }
    }

    /// The CRTC this resolver serves
    pub fn crtc(&self) -> CrtcId {
        self.crtc
    }

    /// Resolve the current scan-out surface, if any
    ///
    /// `Ok(None)` means no qualifying surface this cycle; the caller retries
    /// at the next frame boundary.
    pub fn resolve<'d, D: KmsDevice>(
        &mut self,
        device: &'d D,
    ) -> Result<Option<SurfaceGuard<'d, D>>> {
        // Fast path: one binding check plus one descriptor fetch.
        if let Some(plane) = self.last_good {
            let state = device.plane_state(plane)?;
            if state.crtc == Some(self.crtc) {
                if let Some(fb) = state.framebuffer {
                    return SurfaceGuard::fetch(device, fb);
                }
            }
            trace!("cached {} no longer scanning out, rescanning", plane);
            self.last_good = None;
        }

        for state in device.plane_states()? {
            if state.crtc != Some(self.crtc) {
                continue;
            }
            let Some(fb) = state.framebuffer else {
                continue;
            };
            let Some(guard) = SurfaceGuard::fetch(device, fb)? else {
                continue;
            };
            let info = guard.info();
            if self.placeholder.matches(info.width, info.height) {
                trace!(
                    "{} rejected as placeholder ({}x{})",
                    state.plane,
                    info.width,
                    info.height
                );
                continue;
            }

            debug!(
                "{} scanning out {}x{} via {}",
                self.crtc, info.width, info.height, state.plane
            );
            self.last_good = Some(state.plane);
            return Ok(Some(guard));
        }

        Ok(None)
    }
}
