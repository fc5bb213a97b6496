//! Configuration types for Krypton
//!
//! Runtime capture configuration plus the optional user configuration file.

mod file;

pub use file::{sample_config, CaptureSettings, ConfigFile};

use std::path::PathBuf;
use std::time::Duration;

use crate::capture::PlaceholderFilter;

/// Default DRM device node
pub const DEFAULT_DEVICE: &str = "/dev/dri/card0";

/// Scheduling discipline of the acquisition loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Schedule {
    /// Block on refresh-completion events, frame-accurate timing
    Event,
    /// Sleep at a fixed cadence instead of waiting for events
    Poll { fps: u32 },
}

impl Schedule {
    /// Sleep period for a polling rate, clamped to a sane minimum
    pub fn poll_period(fps: u32) -> Duration {
        Duration::from_micros(1_000_000 / u64::from(fps.max(1)))
    }
}

impl Default for Schedule {
    fn default() -> Self {
        Self::Event
    }
}

impl std::fmt::Display for Schedule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Event => write!(f, "vsync events"),
            Self::Poll { fps } => write!(f, "poll @ {} Hz", fps),
        }
    }
}

/// Runtime configuration of a capture session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// DRM device node to open
    pub device: PathBuf,
    /// Output to capture by canonical name; all outputs when absent
    pub output: Option<String>,
    /// Scheduling discipline
    pub schedule: Schedule,
    /// Placeholder-surface rejection size
    pub placeholder: PlaceholderFilter,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            device: PathBuf::from(DEFAULT_DEVICE),
            output: None,
            schedule: Schedule::default(),
            placeholder: PlaceholderFilter::default(),
        }
    }
}
