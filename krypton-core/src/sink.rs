//! Frame sink seam
//!
//! The acquisition loop hands every frame to a [`FrameSink`]: geometry,
//! format, memory layout, and borrowed dma-buf descriptors. Real consumers
//! (texture importers, encoders) implement the trait outside this crate;
//! [`NullSink`] and [`StatsSink`] cover dry runs and cadence debugging.

use std::os::fd::BorrowedFd;
use std::time::Instant;

use tracing::{debug, info};

use crate::capture::DmabufSet;
use crate::error::Result;
use crate::types::{CrtcId, FrameTick, SurfaceInfo, FOURCC_XRGB8888};

/// One acquired frame, valid only for the duration of the hand-off
///
/// The descriptors are borrowed from the exporting iteration; a sink that
/// needs the buffer beyond the call must duplicate them.
#[derive(Debug)]
pub struct SharedFrame<'a> {
    /// CRTC the frame was scanned out on
    pub crtc: CrtcId,
    pub width: u32,
    pub height: u32,
    /// Hand-off pixel format fourcc, fixed to packed 32-bit XRGB
    pub fourcc: u32,
    pub pitches: [u32; 4],
    pub offsets: [u32; 4],
    pub modifier: u64,
    /// Number of populated planes
    pub plane_count: usize,
    /// dma-buf descriptor per plane slot
    pub fds: [Option<BorrowedFd<'a>>; 4],
    /// Whether the consumer must flip the image vertically
    pub y_flip: bool,
    /// Refresh timing for the boundary that produced this frame, when the
    /// event-driven discipline is in use
    pub tick: Option<FrameTick>,
}

impl<'a> SharedFrame<'a> {
    /// Assemble a frame view from a descriptor and its exported handles
    pub fn new(
        crtc: CrtcId,
        surface: &SurfaceInfo,
        dmabufs: &'a DmabufSet,
        tick: Option<FrameTick>,
    ) -> Self {
        Self {
            crtc,
            width: surface.width,
            height: surface.height,
            fourcc: FOURCC_XRGB8888,
            pitches: surface.pitches(),
            offsets: surface.offsets(),
            modifier: surface.modifier,
            plane_count: dmabufs.count(),
            fds: dmabufs.borrowed(),
            y_flip: false,
            tick,
        }
    }
}

/// Consumer of acquired frames
pub trait FrameSink {
    /// One-time setup and transport handshake
    fn start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Hand off one acquired frame
    fn push_frame(&mut self, frame: &SharedFrame<'_>) -> Result<()>;

    /// Teardown at shutdown
    fn stop(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Discards every frame
pub struct NullSink;

impl FrameSink for NullSink {
    fn push_frame(&mut self, _frame: &SharedFrame<'_>) -> Result<()> {
        Ok(())
    }
}

/// Logs frame geometry and measured cadence
pub struct StatsSink {
    frames: u64,
    started: Option<Instant>,
    window_start: Option<Instant>,
    window_frames: u64,
}

impl StatsSink {
    pub fn new() -> Self {
        Self {
            frames: 0,
            started: None,
            window_start: None,
            window_frames: 0,
        }
    }
}

impl Default for StatsSink {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSink for StatsSink {
    fn start(&mut self) -> Result<()> {
        self.started = Some(Instant::now());
        self.window_start = self.started;
        Ok(())
    }

    fn push_frame(&mut self, frame: &SharedFrame<'_>) -> Result<()> {
        self.frames += 1;
        self.window_frames += 1;

        if let Some(tick) = frame.tick {
            debug!(
                "{} seq {} (+{}), {:.3} ms since previous",
                frame.crtc,
                tick.sequence,
                tick.delta_sequence,
                tick.delta_ns as f64 / 1_000_000.0
            );
        }

        if self.window_frames >= 60 {
            let elapsed = self
                .window_start
                .map(|t| t.elapsed().as_secs_f64())
                .unwrap_or(0.0);
            let fps = if elapsed > 0.0 {
                self.window_frames as f64 / elapsed
            } else {
                0.0
            };
            info!(
                "{}: {}x{} modifier {:#x}, {} plane(s), {:.1} fps",
                frame.crtc, frame.width, frame.height, frame.modifier, frame.plane_count, fps
            );
            self.window_start = Some(Instant::now());
            self.window_frames = 0;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let elapsed = self
            .started
            .map(|t| t.elapsed().as_secs_f64())
            .unwrap_or(0.0);
        info!(
            "captured {} frames in {:.1}s ({:.1} fps)",
            self.frames,
            elapsed,
            if elapsed > 0.0 {
                self.frames as f64 / elapsed
            } else {
                0.0
            }
        );
        Ok(())
    }
}
