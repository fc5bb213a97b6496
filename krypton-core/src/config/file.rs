//! Configuration file loading
//!
//! Loads user configuration from `~/.config/krypton/config.toml`. Every key
//! is optional; the command line overrides anything set here.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::{CaptureConfig, Schedule, DEFAULT_DEVICE};
use crate::capture::PlaceholderFilter;
use crate::error::{KryptonError, Result};

/// Configuration file structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    /// Capture settings
    #[serde(default)]
    pub capture: CaptureSettings,
}

/// Capture defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureSettings {
    /// DRM device node
    #[serde(default = "default_device")]
    pub device: String,

    /// Output name to capture (e.g. "DP-1"); all outputs when unset
    #[serde(default)]
    pub output: Option<String>,

    /// Polling rate in Hz; 0 waits for vsync events instead
    #[serde(default)]
    pub poll_fps: u32,

    /// Placeholder (cursor plane) rejection size, "WIDTHxHEIGHT"
    #[serde(default = "default_placeholder")]
    pub placeholder: String,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            device: default_device(),
            output: None,
            poll_fps: 0,
            placeholder: default_placeholder(),
        }
    }
}

fn default_device() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_placeholder() -> String {
    PlaceholderFilter::default().to_string()
}

impl ConfigFile {
    /// Default config file path: `~/.config/krypton/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("krypton").join("config.toml"))
    }

    /// Load the user config, falling back to defaults when absent
    pub fn load() -> Self {
        let Some(path) = Self::default_path() else {
            debug!("no config directory, using built-in defaults");
            return Self::default();
        };
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(KryptonError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("no config file at {}, using built-in defaults", path.display());
                Self::default()
            }
            Err(e) => {
                warn!("ignoring config file {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Load from an explicit path
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| KryptonError::config(format!("{}: {}", path.display(), e)))
    }

    /// Turn the file settings into a runtime configuration
    pub fn to_capture_config(&self) -> Result<CaptureConfig> {
        let placeholder: PlaceholderFilter = self
            .capture
            .placeholder
            .parse()
            .map_err(KryptonError::config)?;
        let schedule = if self.capture.poll_fps > 0 {
            Schedule::Poll {
                fps: self.capture.poll_fps,
            }
        } else {
            Schedule::Event
        };
        Ok(CaptureConfig {
            device: PathBuf::from(&self.capture.device),
            output: self.capture.output.clone(),
            schedule,
            placeholder,
        })
    }
}

/// A commented sample configuration
pub fn sample_config() -> String {
    let sample = r#"# Krypton configuration
# Place this file at ~/.config/krypton/config.toml

[capture]
# DRM device node to open.
device = "/dev/dri/card0"

# Capture a single output by name (see 'krypton outputs').
# Unset captures every active CRTC.
#output = "DP-1"

# Polling rate in Hz. 0 synchronizes to vsync events instead of polling.
poll_fps = 0

# Surfaces of exactly this size are treated as cursor planes and skipped.
placeholder = "256x256"
"#;
    sample.to_string()
}
