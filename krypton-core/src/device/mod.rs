//! Kernel display device abstraction
//!
//! [`KmsDevice`] is the contract the acquisition pipeline consumes: resource
//! enumeration, per-CRTC sequence monitoring, plane and framebuffer queries,
//! and dma-buf export. [`Card`] implements it over a real DRM device node;
//! tests substitute a mock.

mod card;

pub use card::Card;

use std::os::fd::OwnedFd;

use crate::error::Result;
use crate::types::{
    ConnectorInfo, CrtcId, EncoderId, FbId, PlaneId, PlaneState, SequenceEvent, SurfaceInfo,
};

/// Operations the acquisition pipeline needs from the kernel display stack
///
/// Methods that can fail for a known transient reason absorb it into their
/// return value (`None` / `false`); an `Err` always means an unexplained
/// kernel failure the caller treats as fatal.
pub trait KmsDevice {
    /// All display controllers on the device
    fn crtcs(&self) -> Result<Vec<CrtcId>>;

    /// All connectors with their current associations
    fn connectors(&self) -> Result<Vec<ConnectorInfo>>;

    /// The CRTC an encoder is currently driving, if any
    fn encoder_crtc(&self, encoder: EncoderId) -> Result<Option<CrtcId>>;

    /// Current (sequence, timestamp_ns) for a CRTC
    ///
    /// Returns `None` when the CRTC is currently disabled.
    fn crtc_sequence(&self, crtc: CrtcId) -> Result<Option<(u64, u64)>>;

    /// Request delivery of the next refresh-completion event for a CRTC,
    /// relative to its current sequence, firing immediately if already past
    ///
    /// Returns `false` when the request was rejected because the CRTC is
    /// currently disabled (recoverable), `true` when armed.
    fn queue_sequence(&self, crtc: CrtcId) -> Result<bool>;

    /// Block until at least one pending event is delivered
    ///
    /// May return an empty batch when the wait was interrupted.
    fn wait_events(&self) -> Result<Vec<SequenceEvent>>;

    /// All hardware planes with their current bindings, in index order
    fn plane_states(&self) -> Result<Vec<PlaneState>>;

    /// Current binding of a single plane
    fn plane_state(&self, plane: PlaneId) -> Result<PlaneState>;

    /// Framebuffer currently bound to a CRTC, if any
    fn crtc_framebuffer(&self, crtc: CrtcId) -> Result<Option<FbId>>;

    /// Extended descriptor for a framebuffer
    ///
    /// Returns `None` when the framebuffer was destroyed between lookup and
    /// fetch. The descriptor's memory handles are process-local references;
    /// the caller owns them and must release each distinct handle via
    /// [`KmsDevice::release_buffer`].
    fn framebuffer(&self, fb: FbId) -> Result<Option<SurfaceInfo>>;

    /// Export a memory handle as a read-only dma-buf descriptor
    fn export_buffer(&self, handle: u32) -> Result<OwnedFd>;

    /// Drop a process-local memory handle reference
    fn release_buffer(&self, handle: u32) -> Result<()>;
}
