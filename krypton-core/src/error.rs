//! Error types for Krypton

use thiserror::Error;

use crate::types::CrtcId;

/// Result type alias using KryptonError
pub type Result<T> = std::result::Result<T, KryptonError>;

/// Main error type for Krypton operations
#[derive(Debug, Error)]
pub enum KryptonError {
    /// A kernel round-trip failed with an error not explained by a known
    /// transient cause
    #[error("DRM {op} failed: {source}")]
    Device {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// Resource enumeration returned nothing at startup
    #[error("No display resources found on device")]
    NoDisplayResources,

    /// No connected output matched the request
    #[error("No matching output: {0}")]
    NoMatchingOutput(String),

    /// A delivered sequence event went backwards
    #[error(
        "Sequence regression on {crtc}: sequence {last_seq} -> {seq}, timestamp {last_ns} -> {ns}"
    )]
    SequenceRegression {
        crtc: CrtcId,
        last_seq: u64,
        seq: u64,
        last_ns: u64,
        ns: u64,
    },

    /// Handle export produced zero usable dma-buf descriptors
    #[error("Buffer handle export denied")]
    ExportDenied,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Frame sink error
    #[error("Sink error: {0}")]
    Sink(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<KryptonError>,
    },
}

impl KryptonError {
    /// Create a device error for a named kernel operation
    pub fn device(op: &'static str, source: std::io::Error) -> Self {
        Self::Device { op, source }
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a sink error
    pub fn sink(msg: impl Into<String>) -> Self {
        Self::Sink(msg.into())
    }

    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Actionable remediation for the user, when one exists
    pub fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::ExportDenied => Some(
                "Exporting scan-out buffers requires DRM privileges. Add your user to the \
                 'video' group, or run with CAP_SYS_ADMIN (e.g. sudo).",
            ),
            Self::NoMatchingOutput(_) => {
                Some("Run 'krypton outputs' to list connected outputs and their names.")
            }
            Self::Config(_) => Some("Check ~/.config/krypton/config.toml and the command line."),
            Self::Device { .. } => {
                Some("Check that the device path points at a KMS-capable DRM node.")
            }
            Self::WithContext { source, .. } => source.user_hint(),
            _ => None,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}
