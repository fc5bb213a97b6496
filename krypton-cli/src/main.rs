//! Krypton CLI
//!
//! Zero-copy KMS screen capture for encoders and streamers.
//!
//! # Usage
//!
//! ```bash
//! # List connected outputs
//! krypton outputs
//!
//! # Capture the first active output, synchronized to vsync
//! krypton capture
//!
//! # Capture a specific output at a fixed rate
//! krypton capture -o DP-1 --poll 60
//! ```

mod commands;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Krypton - zero-copy KMS screen capture
#[derive(Parser)]
#[command(name = "krypton")]
#[command(version)]
#[command(about = "Zero-copy KMS screen capture for encoders and streamers", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Subcommand to run
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Start acquiring frames from the display pipeline
    Capture(commands::CaptureArgs),

    /// List connectors and the CRTCs driving them
    #[command(alias = "ls")]
    Outputs(commands::OutputsArgs),

    /// Show device resources and sequence state
    Info(commands::InfoArgs),

    /// Show or generate the configuration file
    Config(commands::ConfigArgs),
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let level = match cli.verbose {
        0 => Level::WARN,
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive(format!("krypton_core={}", level).parse().unwrap())
                .add_directive(format!("krypton_cli={}", level).parse().unwrap()),
        )
        .with_target(false)
        .init();

    match cli.command {
        Commands::Capture(args) => commands::capture(args),
        Commands::Outputs(args) => commands::outputs(args),
        Commands::Info(args) => commands::info(args),
        Commands::Config(args) => commands::config(args),
    }
}
