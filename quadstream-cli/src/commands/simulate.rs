//! Simulate command - headless fly-in over a real tile source.
//!
//! A camera looking straight down descends from above the whole image
//! towards a target point. Tiles are fetched over HTTP and registered in a
//! headless texture registry, so the run exercises the full streaming loop
//! without a GPU.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use glam::DVec3;
use indicatif::{ProgressBar, ProgressStyle};
use quadstream::config::ConfigFile;
use quadstream::provider::{AsyncReqwestClient, HttpTileFetcher};
use quadstream::refine::ViewParams;
use quadstream::streamer::TileStreamer;
use quadstream::texture::HeadlessTextureRegistry;
use tracing::{debug, info};

use super::common::{apply_source_args, build_runtime, load_config, SourceArgs};
use crate::error::CliError;

/// Vertical field of view of the simulated camera.
const FOV_Y_DEGREES: f64 = 60.0;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub source: SourceArgs,
    pub frames: u32,
    pub frame_ms: u64,
    pub start_height: f64,
    pub end_height: f64,
    pub target_x: f64,
    pub target_y: f64,
    pub viewport_width: u32,
    pub viewport_height: u32,
    pub cache_capacity: Option<usize>,
    pub max_concurrent: Option<usize>,
    pub textures_per_frame: Option<usize>,
}

/// Run the simulate command.
pub fn run(config_path: Option<&Path>, args: SimulateArgs) -> Result<(), CliError> {
    if args.frames == 0 {
        return Err(CliError::Config("--frames must be at least 1".to_string()));
    }
    if args.start_height <= 0.0 || args.end_height <= 0.0 {
        return Err(CliError::Config(
            "Camera heights must be positive".to_string(),
        ));
    }

    let mut config = load_config(config_path)?;
    apply_source_args(&mut config, &args.source);
    apply_stream_args(&mut config, &args);
    let hierarchy = config.to_hierarchy()?;

    let timeout_secs = config.stream.fetch.timeout.as_secs().max(1);
    let client = AsyncReqwestClient::with_timeout(timeout_secs)?;
    let fetcher = Arc::new(HttpTileFetcher::new(client));
    let runtime = build_runtime()?;

    let mut streamer = TileStreamer::new(
        hierarchy,
        config.stream.clone(),
        fetcher,
        HeadlessTextureRegistry::new(),
        runtime.handle().clone(),
    )?;

    info!(
        frames = args.frames,
        target_x = args.target_x,
        target_y = args.target_y,
        "Starting fly-in"
    );

    let progress = ProgressBar::new(args.frames as u64);
    progress.set_style(
        ProgressStyle::with_template("{spinner} [{bar:40}] {pos}/{len} frames  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("=> "),
    );

    let frame_interval = Duration::from_millis(args.frame_ms);
    let mut redraws = 0u32;
    for index in 0..args.frames {
        let height = camera_height(args.start_height, args.end_height, index, args.frames);
        let view = ViewParams::look_at(
            DVec3::new(args.target_x, args.target_y, height),
            DVec3::new(args.target_x, args.target_y, 0.0),
            FOV_Y_DEGREES.to_radians(),
            args.viewport_width as f64,
            args.viewport_height as f64,
        );

        let frame = streamer.update(&view);
        if frame.changed {
            redraws += 1;
        }
        let deepest = frame.commands.iter().map(|c| c.tile.level).max().unwrap_or(0);
        debug!(
            frame = index,
            height,
            quads = frame.len(),
            fallback = frame.fallback_count(),
            in_flight = streamer.in_flight(),
            deepest,
            changed = frame.changed,
            "Frame"
        );
        progress.set_message(format!(
            "{} quads, {} fallback, {} in flight, level {}",
            frame.len(),
            frame.fallback_count(),
            streamer.in_flight(),
            deepest
        ));
        progress.inc(1);

        // Fetches progress on the runtime's workers while the frame "renders"
        runtime.block_on(tokio::time::sleep(frame_interval));
    }
    progress.finish_with_message("done");

    let released = streamer.teardown();
    let snapshot = streamer.snapshot();
    info!(released, "Fly-in finished");

    println!();
    println!("Simulation Summary");
    println!("==================");
    println!("Redrawn frames:        {}", redraws);
    print!("{}", snapshot);
    println!(
        "Live textures:         {}",
        streamer.registry().live_count()
    );

    Ok(())
}

fn apply_stream_args(config: &mut ConfigFile, args: &SimulateArgs) {
    if let Some(capacity) = args.cache_capacity {
        config.stream.cache_capacity = capacity;
    }
    if let Some(limit) = args.max_concurrent {
        config.stream.max_concurrent_requests = limit;
    }
    if let Some(budget) = args.textures_per_frame {
        config.stream.new_textures_per_frame = budget;
    }
}

/// Camera height at frame `index`, interpolated geometrically so the zoom
/// rate stays constant.
fn camera_height(start: f64, end: f64, index: u32, frames: u32) -> f64 {
    if frames <= 1 {
        return end;
    }
    let t = index as f64 / (frames - 1) as f64;
    start * (end / start).powf(t)
}
