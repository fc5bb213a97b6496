//! Info command - device resources and sequence state

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use krypton_core::{Card, KmsDevice};

/// Arguments for the info command
#[derive(Args)]
pub struct InfoArgs {
    /// DRM device node to open
    #[arg(short, long, value_name = "PATH", default_value = "/dev/dri/card0")]
    device: PathBuf,
}

/// Show device resources and per-CRTC sequence state
pub fn info(args: InfoArgs) -> Result<()> {
    println!("Krypton - Device Info\n");
    println!("  Device: {}", args.device.display());

    let card = Card::open(&args.device).context("Failed to open DRM device")?;

    let crtcs = card.crtcs()?;
    let connectors = card.connectors()?;
    let planes = card.plane_states()?;
    let connected = connectors.iter().filter(|c| c.connected).count();
    let active_planes = planes.iter().filter(|p| p.framebuffer.is_some()).count();

    println!("  CRTCs:      {}", crtcs.len());
    println!("  Connectors: {} ({} connected)", connectors.len(), connected);
    println!("  Planes:     {} ({} scanning out)", planes.len(), active_planes);
    println!(
        "  Universal plane addressing: {}",
        if card.universal_planes() { "yes" } else { "no" }
    );
    println!();

    for crtc in crtcs {
        match card.crtc_sequence(crtc)? {
            Some((seq, ns)) => {
                println!("  {}: active, sequence {} at {} ns", crtc, seq, ns)
            }
            None => println!("  {}: disabled", crtc),
        }
    }

    Ok(())
}
