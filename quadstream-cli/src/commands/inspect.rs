//! Inspect command - print the tile pyramid for an image source.

use std::path::Path;

use quadstream::coord::TileCoord;
use quadstream::hierarchy::{Extents, HierarchyConfig};
use quadstream::provider::{AsyncReqwestClient, Credentials, HttpTileFetcher, TileFetcher};
use tracing::info;

use super::common::{apply_source_args, build_runtime, load_config, SourceArgs};
use crate::error::CliError;

/// Run the inspect command.
pub fn run(config_path: Option<&Path>, source: SourceArgs, timeout_secs: u64) -> Result<(), CliError> {
    let mut config = load_config(config_path)?;
    apply_source_args(&mut config, &source);
    let mut hierarchy = config.to_hierarchy()?;

    if hierarchy.is_deferred() {
        probe_root(&mut hierarchy, timeout_secs)?;
    }
    let extents = hierarchy
        .extents()
        .ok_or_else(|| CliError::Config("Image dimensions could not be determined".to_string()))?;

    print_pyramid(&hierarchy, &extents);
    Ok(())
}

/// Fetches the root tile to learn the size of a single-image source.
fn probe_root(hierarchy: &mut HierarchyConfig, timeout_secs: u64) -> Result<(), CliError> {
    let url = hierarchy.tile_url(&TileCoord::ROOT);
    println!("Fetching root tile to determine image size...");
    info!(url = %url, "Probing root tile");

    let client = AsyncReqwestClient::with_timeout(timeout_secs)?;
    let fetcher = HttpTileFetcher::new(client);
    let credentials = hierarchy.session_id().map(Credentials::new);
    let runtime = build_runtime()?;
    let image = runtime.block_on(fetcher.fetch_tile(&url, credentials.as_ref()))?;

    hierarchy.resolve_from_root(image.width, image.height);
    println!();
    Ok(())
}

fn print_pyramid(hierarchy: &HierarchyConfig, extents: &Extents) {
    let bbox = extents.bounding_box();

    println!("Image Source");
    println!("============");
    println!("  URL pattern:     {}", hierarchy.url_pattern());
    println!("  Image size:      {} x {} px", extents.width, extents.height);
    println!("  Tile size:       {} px", extents.tile_size);
    println!("  Max level:       {}", extents.max_level);
    println!("  Level offset:    {}", hierarchy.level_offset());
    println!("  Root tile size:  {} px", extents.root_tile_size());
    println!(
        "  Quad extents:    {:.6} x {:.6}",
        extents.quad_width(),
        extents.quad_height()
    );
    println!(
        "  Bounding box:    ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bbox.min.x, bbox.min.y, bbox.max.x, bbox.max.y
    );
    println!();

    println!("{:>5}  {:>9}  {:>12}  {:>14}", "Level", "Grid", "Tiles", "Level size");
    let mut total: u64 = 0;
    for level in 0..=extents.max_level {
        let (cols, rows) = extents.grid_size(level);
        let tiles = cols as u64 * rows as u64;
        total += tiles;
        println!(
            "{:>5}  {:>9}  {:>12}  {:>14}",
            level,
            format!("{}x{}", cols, rows),
            tiles,
            format!(
                "{:.0}x{:.0}",
                extents.level_width(level).ceil(),
                extents.level_height(level).ceil()
            )
        );
    }
    println!("Total tiles: {}", total);
    println!();

    let sample = TileCoord::new(extents.max_level, 0, 0);
    println!("Sample URL ({}): {}", sample, hierarchy.tile_url(&sample));
}
