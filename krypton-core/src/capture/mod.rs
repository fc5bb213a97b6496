//! Frame acquisition from the kernel display pipeline
//!
//! This module holds the acquisition chain: refresh sequence monitoring per
//! CRTC, output-name resolution, active scan-out plane resolution, framebuffer
//! descriptor snapshots, and dma-buf handle export.

pub mod dmabuf;
pub mod monitor;
pub mod output;
pub mod plane;
pub mod surface;

pub use dmabuf::DmabufSet;
pub use monitor::{CrtcState, SequenceMonitor};
pub use output::resolve_output;
pub use plane::{PlaceholderFilter, PlaneResolver};
pub use surface::{crtc_surface, SurfaceGuard};
