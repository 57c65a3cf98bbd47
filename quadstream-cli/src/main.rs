//! Quadstream CLI - Command-line interface
//!
//! Inspects tile pyramids and runs headless streaming simulations against
//! real tile sources using the quadstream library.

mod commands;
mod error;
mod logging;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use commands::common::SourceArgs;
use commands::config::ConfigCommands;
use commands::simulate::SimulateArgs;
use error::CliError;

#[derive(Parser)]
#[command(name = "quadstream")]
#[command(version)]
#[command(about = "Stream very large raster images as a quadtree of tiles", long_about = None)]
struct Cli {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Also write logs to this file
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the tile pyramid of an image source
    Inspect {
        #[command(flatten)]
        source: SourceArgs,

        /// Timeout in seconds when fetching the root tile of a single image
        #[arg(long, default_value = "30")]
        timeout: u64,
    },

    /// Fly a headless camera into an image and report streaming statistics
    Simulate {
        #[command(flatten)]
        source: SourceArgs,

        /// Number of frames to render
        #[arg(long, default_value = "240")]
        frames: u32,

        /// Wall-clock time per frame in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,

        /// Camera height above the image plane at the first frame
        #[arg(long, default_value = "2.0")]
        start_height: f64,

        /// Camera height above the image plane at the last frame
        #[arg(long, default_value = "0.005")]
        end_height: f64,

        /// Horizontal position of the point the camera descends to
        #[arg(long, default_value = "0.5")]
        target_x: f64,

        /// Vertical position of the point the camera descends to
        #[arg(long, default_value = "0.5")]
        target_y: f64,

        /// Viewport width in pixels
        #[arg(long, default_value = "1920")]
        viewport_width: u32,

        /// Viewport height in pixels
        #[arg(long, default_value = "1080")]
        viewport_height: u32,

        /// Maximum number of cached tiles
        #[arg(long)]
        cache_capacity: Option<usize>,

        /// Maximum number of concurrent tile fetches
        #[arg(long)]
        max_concurrent: Option<usize>,

        /// Maximum number of new textures shown per frame
        #[arg(long)]
        textures_per_frame: Option<usize>,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() {
    let cli = Cli::parse();

    let _log_guard = match logging::init(cli.verbose, cli.log_file.as_deref()) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(e.exit_code());
        }
    };

    if let Err(e) = run(cli) {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Inspect { source, timeout } => commands::inspect::run(config_path, source, timeout),
        Commands::Simulate {
            source,
            frames,
            frame_ms,
            start_height,
            end_height,
            target_x,
            target_y,
            viewport_width,
            viewport_height,
            cache_capacity,
            max_concurrent,
            textures_per_frame,
        } => commands::simulate::run(
            config_path,
            SimulateArgs {
                source,
                frames,
                frame_ms,
                start_height,
                end_height,
                target_x,
                target_y,
                viewport_width,
                viewport_height,
                cache_capacity,
                max_concurrent,
                textures_per_frame,
            },
        ),
        Commands::Config { command } => commands::config::run(config_path, command),
    }
}
