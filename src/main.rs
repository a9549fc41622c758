// SPDX-License-Identifier: GPL-3.0-only

use clap::{Parser, Subcommand};
use footscan::config::Config;
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "footscan")]
#[command(about = "Foot-scan capture, frame ranking and foot model export")]
#[command(version = footscan::constants::app_info::version())]
struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade an image file with the full-resolution quality checks
    Quality {
        image: PathBuf,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Pick the sharpest frames from a recorded take
    Frames {
        /// WebM/MP4/MKV take, or a raw .mjpeg stream
        video: PathBuf,

        /// Directory for the extracted JPEGs
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Frame rate of a raw MJPEG stream
        #[arg(long)]
        fps: Option<f64>,
    },

    /// Build both feet from a scan record and export GLB
    Model {
        /// Scan record as JSON
        record: PathBuf,

        /// Output file (default: foot-model.glb next to the record)
        #[arg(short, long)]
        out: Option<PathBuf>,

        /// Use the per-side tint instead of the pressure heat map
        #[arg(long)]
        solid: bool,

        /// Export area-weighted smooth normals
        #[arg(long)]
        smooth: bool,
    },

    /// Record a take from a live camera and extract its best frames
    Record {
        /// V4L2 device node (default: auto-detected camera)
        #[arg(short, long)]
        device: Option<String>,

        /// Recording duration in seconds (capped by the configured maximum)
        #[arg(long, default_value = "10")]
        duration: f64,

        /// Directory for the take and its frames
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Rehearse the guided capture flow against the virtual camera
    Simulate,

    /// Write the effective configuration to the config file
    InitConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Set RUST_LOG to control the level, e.g. RUST_LOG=footscan=debug
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_target(true)
        .with_level(true)
        .init();

    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load(),
    };

    match cli.command {
        Commands::Quality { image, json } => cli::grade_image(&config, &image, json),
        Commands::Frames { video, out, fps } => cli::extract_frames(&config, &video, out, fps),
        Commands::Model {
            record,
            out,
            solid,
            smooth,
        } => cli::export_model(&config, &record, out, solid, smooth),
        Commands::Record {
            device,
            duration,
            out,
        } => cli::record_take(&config, device, duration, out),
        Commands::Simulate => cli::simulate(&config),
        Commands::InitConfig => cli::init_config(&config, cli.config),
    }
}
