//! Main acquisition loop
//!
//! Ties the components together: one [`SequenceMonitor`] (or a fixed-rate
//! sleep), one [`PlaneResolver`] per monitored CRTC, descriptor snapshot,
//! dma-buf export, sink hand-off, and release before the next iteration.
//!
//! Everything runs on the calling thread. Per iteration at most four dma-buf
//! descriptors are open, and all of them plus the descriptor's handle
//! references are returned before the next wait.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, trace};

use crate::capture::{crtc_surface, dmabuf, resolve_output, PlaneResolver, SequenceMonitor};
use crate::config::{CaptureConfig, Schedule};
use crate::device::KmsDevice;
use crate::error::{KryptonError, Result};
use crate::sink::{FrameSink, SharedFrame};
use crate::types::{CrtcId, FrameTick};

#[derive(Debug)]
struct Target {
    crtc: CrtcId,
    resolver: PlaneResolver,
    /// Pinned targets came from an output name; they query the CRTC's bound
    /// framebuffer directly instead of scanning planes.
    pinned: bool,
}

/// The acquisition pipeline
///
/// Monitors either the CRTC pinned by the configured output name or every
/// CRTC on the device, with independent plane-cache state per CRTC.
#[derive(Debug)]
pub struct CapturePipeline<'d, D: KmsDevice, S: FrameSink> {
    device: &'d D,
    sink: S,
    schedule: Schedule,
    targets: Vec<Target>,
    frames: u64,
    skipped: u64,
}

impl<'d, D: KmsDevice, S: FrameSink> CapturePipeline<'d, D, S> {
    /// Resolve capture targets and assemble the pipeline
    pub fn new(device: &'d D, config: &CaptureConfig, sink: S) -> Result<Self> {
        let targets = match &config.output {
            Some(name) => {
                let crtc = resolve_output(device, Some(name))?;
                info!("capturing output {} ({})", name, crtc);
                vec![Target {
                    crtc,
                    resolver: PlaneResolver::new(crtc, config.placeholder),
                    pinned: true,
                }]
            }
            None => {
                let crtcs = device.crtcs()?;
                if crtcs.is_empty() {
                    return Err(KryptonError::NoDisplayResources);
                }
                info!("capturing all {} CRTC(s)", crtcs.len());
                crtcs
                    .into_iter()
                    .map(|crtc| Target {
                        crtc,
                        resolver: PlaneResolver::new(crtc, config.placeholder),
                        pinned: false,
                    })
                    .collect()
            }
        };

        Ok(Self {
            device,
            sink,
            schedule: config.schedule,
            targets,
            frames: 0,
            skipped: 0,
        })
    }

    /// Frames handed to the sink so far
    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// The sink, e.g. for inspecting collected statistics
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Cycles that found no scan-out surface
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Run until `stop` is raised or a fatal fault occurs
    ///
    /// The sink is started before the first frame and stopped on the way
    /// out, also when the loop exits with an error.
    pub fn run(&mut self, stop: &AtomicBool) -> Result<()> {
        self.sink.start()?;

        let result = match self.schedule {
            Schedule::Event => self.run_events(stop),
            Schedule::Poll { fps } => self.run_poll(stop, Schedule::poll_period(fps)),
        };

        let stopped = self.sink.stop();
        info!(
            "acquisition loop done: {} frames, {} skipped cycles",
            self.frames, self.skipped
        );
        result.and(stopped)
    }

    fn run_events(&mut self, stop: &AtomicBool) -> Result<()> {
        let crtcs: Vec<CrtcId> = self.targets.iter().map(|t| t.crtc).collect();
        let mut monitor = SequenceMonitor::new(self.device, &crtcs)?;

        while !stop.load(Ordering::Relaxed) {
            for tick in monitor.wait()? {
                let Some(idx) = self.targets.iter().position(|t| t.crtc == tick.crtc) else {
                    continue;
                };
                self.capture_frame(idx, Some(tick))?;
            }
        }
        Ok(())
    }

    fn run_poll(&mut self, stop: &AtomicBool, period: Duration) -> Result<()> {
        while !stop.load(Ordering::Relaxed) {
            std::thread::sleep(period);
            for idx in 0..self.targets.len() {
                self.capture_frame(idx, None)?;
            }
        }
        Ok(())
    }

    fn capture_frame(&mut self, idx: usize, tick: Option<FrameTick>) -> Result<()> {
        let device = self.device;
        let target = &mut self.targets[idx];
        let crtc = target.crtc;

        let guard = if target.pinned {
            crtc_surface(device, crtc)?
        } else {
            target.resolver.resolve(device)?
        };
        let Some(guard) = guard else {
            self.skipped += 1;
            trace!("no scan-out surface on {}, skipping cycle", crtc);
            return Ok(());
        };

        let dmabufs = dmabuf::export(device, guard.info());
        if dmabufs.count() == 0 {
            self.skipped += 1;
            trace!("descriptor on {} has no memory planes, skipping cycle", crtc);
            return Ok(());
        }
        if dmabufs.valid() == 0 {
            return Err(KryptonError::ExportDenied);
        }

        let frame = SharedFrame::new(crtc, guard.info(), &dmabufs, tick);
        self.sink.push_frame(&frame)?;

        self.frames += 1;
        if self.frames % 300 == 0 {
            debug!(
                "{} frames handed off, {} cycles skipped",
                self.frames, self.skipped
            );
        }
        Ok(())
        // dmabufs and guard drop here: descriptors close, handle
        // references are returned before the next wait.
    }
}
