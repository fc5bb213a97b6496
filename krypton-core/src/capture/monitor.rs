//! Refresh sequence monitoring
//!
//! Tracks the hardware sequence counter and timestamp per CRTC, keeps exactly
//! one completion request armed per CRTC, and turns each delivered event into
//! a [`FrameTick`] with inter-frame deltas.
//!
//! Sequence counters and timestamps are assumed non-wrapping and monotonic
//! within a session; an event that goes backwards is a hard fault.

use tracing::{debug, warn};

use crate::device::KmsDevice;
use crate::error::{KryptonError, Result};
use crate::types::{CrtcId, FrameTick};

/// Last observed sequence state for one CRTC
#[derive(Debug, Clone, Copy)]
pub struct CrtcState {
    crtc: CrtcId,
    seq: u64,
    ns: u64,
    delta_seq: u64,
    delta_ns: u64,
}

impl CrtcState {
    /// The CRTC this state belongs to
    pub fn crtc(&self) -> CrtcId {
        self.crtc
    }

    /// Last observed sequence counter
    pub fn sequence(&self) -> u64 {
        self.seq
    }

    /// Last observed timestamp in nanoseconds
    pub fn timestamp_ns(&self) -> u64 {
        self.ns
    }

    /// Sequence delta between the last two observations
    pub fn delta_sequence(&self) -> u64 {
        self.delta_seq
    }

    /// Timestamp delta between the last two observations
    pub fn delta_ns(&self) -> u64 {
        self.delta_ns
    }
}

/// Monitors refresh-completion events for a set of CRTCs
///
/// Sole writer of the per-CRTC sequence state. Each delivery re-arms its CRTC
/// before the tick is handed to the caller, so a slow consumer cannot cause a
/// missed registration.
pub struct SequenceMonitor<'d, D: KmsDevice> {
    device: &'d D,
    states: Vec<CrtcState>,
}

impl<'d, D: KmsDevice> SequenceMonitor<'d, D> {
    /// Query the initial sequence state for every CRTC and arm them all
    ///
    /// A CRTC that is currently disabled starts from (0, 0); thanks to the
    /// fire-on-miss arming semantics it still makes progress once enabled.
    pub fn new(device: &'d D, crtcs: &[CrtcId]) -> Result<Self> {
        if crtcs.is_empty() {
            return Err(KryptonError::NoDisplayResources);
        }

        let mut states = Vec::with_capacity(crtcs.len());
        for &crtc in crtcs {
            let (seq, ns) = match device.crtc_sequence(crtc)? {
                Some(pair) => pair,
                None => {
                    debug!("{} is disabled, starting sequence from zero", crtc);
                    (0, 0)
                }
            };
            states.push(CrtcState {
                crtc,
                seq,
                ns,
                delta_seq: 0,
                delta_ns: 0,
            });
            if !device.queue_sequence(crtc)? {
                debug!("{} is disabled, completion request deferred", crtc);
            }
        }

        Ok(Self { device, states })
    }

    /// Current per-CRTC states
    pub fn states(&self) -> &[CrtcState] {
        &self.states
    }

    /// Block until the next batch of refresh-completion events
    ///
    /// Returns one tick per delivered event. An empty batch means the wait
    /// was interrupted; callers just loop. Every delivered CRTC is re-armed
    /// before this returns.
    pub fn wait(&mut self) -> Result<Vec<FrameTick>> {
        let events = self.device.wait_events()?;

        let mut ticks = Vec::with_capacity(events.len());
        for event in events {
            let Some(state) = self.states.iter_mut().find(|s| s.crtc == event.crtc) else {
                warn!("sequence event for unmonitored {}", event.crtc);
                continue;
            };

            if event.sequence <= state.seq || event.timestamp_ns <= state.ns {
                return Err(KryptonError::SequenceRegression {
                    crtc: state.crtc,
                    last_seq: state.seq,
                    seq: event.sequence,
                    last_ns: state.ns,
                    ns: event.timestamp_ns,
                });
            }

            state.delta_seq = event.sequence - state.seq;
            state.delta_ns = event.timestamp_ns - state.ns;
            state.seq = event.sequence;
            state.ns = event.timestamp_ns;

            // Re-arm first; downstream frame handling can be arbitrarily slow.
            self.device.queue_sequence(event.crtc)?;

            ticks.push(FrameTick {
                crtc: state.crtc,
                sequence: state.seq,
                timestamp_ns: state.ns,
                delta_sequence: state.delta_seq,
                delta_ns: state.delta_ns,
            });
        }
        Ok(ticks)
    }
}
