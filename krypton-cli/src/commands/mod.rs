//! CLI command implementations

mod capture;
mod config;
mod info;
mod outputs;

pub use capture::{capture, CaptureArgs};
pub use config::{config, ConfigArgs};
pub use info::{info, InfoArgs};
pub use outputs::{outputs, OutputsArgs};
