//! Config command - show or generate the configuration file

use anyhow::{Context, Result};
use clap::Args;
use krypton_core::config::{sample_config, ConfigFile};

/// Arguments for the config command
#[derive(Args)]
pub struct ConfigArgs {
    /// Print a commented sample configuration file
    #[arg(long)]
    sample: bool,
}

/// Show the effective configuration or print a sample file
pub fn config(args: ConfigArgs) -> Result<()> {
    if args.sample {
        print!("{}", sample_config());
        return Ok(());
    }

    let path = ConfigFile::default_path();
    match &path {
        Some(path) if path.exists() => println!("Config file: {}\n", path.display()),
        Some(path) => println!("Config file: {} (not present, using defaults)\n", path.display()),
        None => println!("No config directory available, using defaults\n"),
    }

    let capture = ConfigFile::load()
        .to_capture_config()
        .context("Invalid configuration file")?;

    println!("  Device:      {}", capture.device.display());
    println!(
        "  Output:      {}",
        capture.output.as_deref().unwrap_or("<all active CRTCs>")
    );
    println!("  Schedule:    {}", capture.schedule);
    println!("  Placeholder: {}", capture.placeholder);
    println!();
    println!("Use 'krypton config --sample > ~/.config/krypton/config.toml' to start a file.");

    Ok(())
}
