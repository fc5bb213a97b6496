//! Integration tests for configuration loading

use std::io::Write;
use std::path::PathBuf;

use krypton_core::config::{sample_config, ConfigFile};
use krypton_core::error::KryptonError;
use krypton_core::{PlaceholderFilter, Schedule};

#[test]
fn defaults_without_a_file() {
    let config = ConfigFile::default().to_capture_config().unwrap();
    assert_eq!(config.device, PathBuf::from("/dev/dri/card0"));
    assert!(config.output.is_none());
    assert_eq!(config.schedule, Schedule::Event);
    assert_eq!(config.placeholder, PlaceholderFilter::default());
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
[capture]
device = "/dev/dri/card1"
output = "DP-1"
poll_fps = 30
placeholder = "128x128"
"#
    )
    .unwrap();

    let config = ConfigFile::load_from(file.path())
        .unwrap()
        .to_capture_config()
        .unwrap();
    assert_eq!(config.device, PathBuf::from("/dev/dri/card1"));
    assert_eq!(config.output.as_deref(), Some("DP-1"));
    assert_eq!(config.schedule, Schedule::Poll { fps: 30 });
    assert!(config.placeholder.matches(128, 128));
}

#[test]
fn partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[capture]\noutput = \"HDMI-A-2\"\n").unwrap();

    let config = ConfigFile::load_from(file.path())
        .unwrap()
        .to_capture_config()
        .unwrap();
    assert_eq!(config.output.as_deref(), Some("HDMI-A-2"));
    assert_eq!(config.device, PathBuf::from("/dev/dri/card0"));
    assert_eq!(config.schedule, Schedule::Event);
}

#[test]
fn malformed_toml_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "not toml at all [").unwrap();

    let err = ConfigFile::load_from(file.path()).unwrap_err();
    assert!(matches!(err, KryptonError::Config(_)));
}

#[test]
fn bad_placeholder_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[capture]\nplaceholder = \"huge\"\n").unwrap();

    let err = ConfigFile::load_from(file.path())
        .unwrap()
        .to_capture_config()
        .unwrap_err();
    assert!(matches!(err, KryptonError::Config(_)));
}

#[test]
fn missing_file_is_not_found() {
    let err = ConfigFile::load_from(std::path::Path::new("/nonexistent/config.toml")).unwrap_err();
    assert!(matches!(err, KryptonError::Io(_)));
}

#[test]
fn sample_round_trips() {
    let config: ConfigFile = toml::from_str(&sample_config()).unwrap();
    let capture = config.to_capture_config().unwrap();
    assert_eq!(capture.schedule, Schedule::Event);
    assert!(capture.placeholder.matches(256, 256));
}
