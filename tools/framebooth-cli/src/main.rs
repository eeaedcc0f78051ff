//! Framebooth CLI — composite captured media onto layouts and export.
//!
//! Usage:
//!   framebooth render <LAYOUT> [OPTIONS]   Flatten photos onto a layout
//!   framebooth export <LAYOUT> [OPTIONS]   Synthesize a video from clips
//!   framebooth info <LAYOUT>               Inspect a layout definition
//!   framebooth check                       Check encoder availability

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "framebooth",
    about = "Composite captured photos and clips onto designed layouts",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Flatten captured photos onto a layout and write a still image
    Render {
        /// Path to the layout definition JSON
        layout: PathBuf,

        /// Captured photo files, in capture order
        #[arg(short, long = "photo")]
        photos: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = "booth.png")]
        output: PathBuf,

        /// JPEG instead of PNG (quality 1-100)
        #[arg(long)]
        jpeg_quality: Option<u8>,

        /// Crop the finished canvas to this aspect ratio (w/h)
        #[arg(long)]
        crop_aspect: Option<f64>,

        /// Grayscale percentage [0, 100]
        #[arg(long, default_value = "0")]
        grayscale: f32,

        /// Brightness percentage (100 = neutral)
        #[arg(long, default_value = "100")]
        brightness: f32,

        /// Sepia percentage [0, 100]
        #[arg(long, default_value = "0")]
        sepia: f32,
    },

    /// Synthesize captured clips onto a layout and write a silent video
    Export {
        /// Path to the layout definition JSON
        layout: PathBuf,

        /// Captured clip files, in capture order
        #[arg(short, long = "clip")]
        clips: Vec<PathBuf>,

        /// Output file path
        #[arg(short, long, default_value = "booth.mp4")]
        output: PathBuf,

        /// Flip every clip horizontally (mirrored capture sessions)
        #[arg(long)]
        mirror: bool,

        /// Use the constrained-device bitrate ceiling
        #[arg(long)]
        constrained: bool,
    },

    /// Show layout information
    Info {
        /// Path to the layout definition JSON
        layout: PathBuf,

        /// Preview slot assignment for this many captured sources
        #[arg(long, default_value = "0")]
        sources: usize,
    },

    /// Check encoder availability
    Check,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "info" };
    framebooth_common::logging::init_logging(&framebooth_common::config::LoggingConfig {
        level: log_level.to_string(),
        json: false,
    });

    match cli.command {
        Commands::Render {
            layout,
            photos,
            output,
            jpeg_quality,
            crop_aspect,
            grayscale,
            brightness,
            sepia,
        } => {
            commands::render::run(
                layout,
                photos,
                output,
                jpeg_quality,
                crop_aspect,
                grayscale,
                brightness,
                sepia,
            )
        }
        Commands::Export {
            layout,
            clips,
            output,
            mirror,
            constrained,
        } => commands::export::run(layout, clips, output, mirror, constrained).await,
        Commands::Info { layout, sources } => commands::info::run(layout, sources),
        Commands::Check => commands::check::run(),
    }
}
