//! Outputs command - list connectors and their CRTCs

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use krypton_core::{Card, KmsDevice};

/// Arguments for the outputs command
#[derive(Args)]
pub struct OutputsArgs {
    /// DRM device node to open
    #[arg(short, long, value_name = "PATH", default_value = "/dev/dri/card0")]
    device: PathBuf,
}

/// List connectors and the CRTCs driving them
pub fn outputs(args: OutputsArgs) -> Result<()> {
    println!("Krypton - Outputs on {}\n", args.device.display());

    let card = Card::open(&args.device).context("Failed to open DRM device")?;
    let connectors = card.connectors()?;

    if connectors.is_empty() {
        println!("No connectors found.");
        return Ok(());
    }

    println!(
        "{:<12} {:<14} {:<10} {:<16}",
        "Name", "Status", "CRTC", "Mode"
    );
    println!("{}", "-".repeat(52));

    for info in connectors {
        let status = if info.connected {
            "connected"
        } else {
            "disconnected"
        };

        let crtc = match info.encoder {
            Some(encoder) => card
                .encoder_crtc(encoder)?
                .map(|c| c.to_string())
                .unwrap_or_else(|| "-".to_string()),
            None => "-".to_string(),
        };

        let mode = info
            .preferred_mode
            .map(|m| format!("{}x{} @ {}Hz", m.width, m.height, m.refresh))
            .unwrap_or_else(|| "-".to_string());

        println!("{:<12} {:<14} {:<10} {}", info.name(), status, crtc, mode);
    }

    println!("\nUse 'krypton capture -o <name>' to capture one output.");
    Ok(())
}
