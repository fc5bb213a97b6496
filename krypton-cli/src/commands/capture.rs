//! Capture command - run the acquisition loop

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{anyhow, Context, Result};
use clap::Args;
use krypton_core::{
    CaptureConfig, CapturePipeline, Card, ConfigFile, FrameSink, NullSink, Schedule, StatsSink,
};

/// Arguments for the capture command
#[derive(Args)]
pub struct CaptureArgs {
    /// DRM device node to open
    #[arg(short, long, value_name = "PATH")]
    device: Option<PathBuf>,

    /// Output to capture by name (e.g. "DP-1"); captures every CRTC when omitted
    #[arg(short, long, value_name = "NAME")]
    output: Option<String>,

    /// Poll at a fixed rate in Hz instead of waiting for vsync events
    #[arg(long, value_name = "FPS")]
    poll: Option<u32>,

    /// Placeholder (cursor plane) rejection size
    #[arg(long, value_name = "WxH")]
    placeholder: Option<String>,

    /// Log frame cadence and geometry instead of discarding frames
    #[arg(long)]
    stats: bool,
}

static STOP: AtomicBool = AtomicBool::new(false);

extern "C" fn request_stop(_signal: libc::c_int) {
    STOP.store(true, Ordering::Relaxed);
}

/// Run the acquisition loop until interrupted
pub fn capture(args: CaptureArgs) -> Result<()> {
    let mut config = ConfigFile::load()
        .to_capture_config()
        .context("Invalid configuration file")?;

    // Command line wins over the config file.
    if let Some(device) = args.device {
        config.device = device;
    }
    if args.output.is_some() {
        config.output = args.output;
    }
    if let Some(fps) = args.poll {
        config.schedule = Schedule::Poll { fps };
    }
    if let Some(placeholder) = args.placeholder {
        config.placeholder = placeholder
            .parse()
            .map_err(|e: String| anyhow!("Invalid --placeholder: {}", e))?;
    }

    println!("Krypton - Starting Capture\n");
    println!("  Device:      {}", config.device.display());
    println!(
        "  Output:      {}",
        config.output.as_deref().unwrap_or("<all active CRTCs>")
    );
    println!("  Schedule:    {}", config.schedule);
    println!("  Placeholder: {}", config.placeholder);
    println!();

    let card = Card::open(&config.device).context("Failed to open DRM device")?;

    unsafe {
        libc::signal(libc::SIGINT, request_stop as libc::sighandler_t);
        libc::signal(libc::SIGTERM, request_stop as libc::sighandler_t);
    }
    println!("Press Ctrl+C to stop...\n");

    let result = if args.stats {
        run(&card, &config, StatsSink::new())
    } else {
        run(&card, &config, NullSink)
    };

    match result {
        Ok(()) => {
            println!("Capture stopped.");
            Ok(())
        }
        Err(e) => {
            if let Some(hint) = e.user_hint() {
                eprintln!("Error: {}\n\n{}", e, hint);
                std::process::exit(1);
            }
            Err(e.into())
        }
    }
}

fn run<S: FrameSink>(card: &Card, config: &CaptureConfig, sink: S) -> krypton_core::Result<()> {
    let mut pipeline = CapturePipeline::new(card, config, sink)?;
    pipeline.run(&STOP)
}
