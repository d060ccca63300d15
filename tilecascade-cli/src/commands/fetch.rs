//! Fetch command - load every tile of a view from a tile server.

use bytes::Bytes;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tilecascade::active::ActiveTiles;
use tilecascade::coord::TileAddress;
use tilecascade::engine::TileEngine;
use tilecascade::source::HttpTileSource;
use tilecascade::tile::Tile;
use tilecascade::viewport::{enumerate_tiles, VisibleRegion};

use super::common::{print_stats, wait_for_exact};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Used when neither `--url` nor `[source] url_template` is set.
pub const DEFAULT_URL_TEMPLATE: &str = "https://tile.openstreetmap.org/{z}/{x}/{y}.png";

/// Arguments for the fetch command.
pub struct FetchArgs {
    pub lat: f64,
    pub lon: f64,
    pub zoom: u8,
    pub width: u32,
    pub height: u32,
    pub url: Option<String>,
    pub deadline_secs: u64,
    pub output_dir: Option<PathBuf>,
}

/// Run the fetch command.
pub async fn run(args: FetchArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("fetch");
    let config = runner.config();
    let engine_config = config.engine_config();
    let tile_size = config.viewport.tile_size;

    let url = args
        .url
        .or_else(|| config.source.url_template.clone())
        .unwrap_or_else(|| DEFAULT_URL_TEMPLATE.to_string());
    let source = match &config.source.user_agent {
        Some(user_agent) => HttpTileSource::with_user_agent(url.clone(), user_agent)?,
        None => HttpTileSource::new(url.clone())?,
    };

    let region = VisibleRegion::around_lat_lon(
        args.lat,
        args.lon,
        args.zoom,
        args.width,
        args.height,
        tile_size,
    )?;
    let required = enumerate_tiles(&region, args.zoom, engine_config.out_of_bounds())?;
    let total = distinct_tiles(&required);

    println!("Fetching view:");
    println!("  Location: {}, {}", args.lat, args.lon);
    println!("  Zoom: {}", args.zoom);
    println!("  Viewport: {}x{} px ({} tiles)", args.width, args.height, total);
    println!("  Source: {}", url);
    println!();

    let engine = TileEngine::spawn(engine_config, source);
    let start = Instant::now();
    engine.render_tiles(required.clone(), args.zoom)?;

    let missing = wait_for_exact(&engine, &required, Duration::from_secs(args.deadline_secs)).await?;
    println!(
        "Finished in {:.2}s: {} of {} tiles loaded",
        start.elapsed().as_secs_f64(),
        total - missing,
        total
    );
    println!();

    let active = engine.active_tiles();
    let origin = view_origin(&region, args.zoom, tile_size);
    for line in placement_lines(&active, &required, tile_size, origin) {
        println!("  {}", line);
    }
    println!();

    if let Some(dir) = &args.output_dir {
        let saved = save_tiles(dir, active.tiles(), args.zoom, &url)?;
        println!("Saved {} tiles to {}", saved, dir.display());
        println!();
    }

    print_stats(&engine.stats().await?);
    engine.shutdown().await;

    if missing > 0 {
        return Err(CliError::Incomplete { missing, total });
    }
    Ok(())
}

/// Number of distinct tiles behind `required` once wrapped aliases are merged.
pub fn distinct_tiles(required: &[TileAddress]) -> usize {
    required
        .iter()
        .map(TileAddress::normalized)
        .collect::<HashSet<_>>()
        .len()
}

/// One line per drawn tile copy: stored address, size and screen position.
///
/// Wrapped copies are positioned at the raw address the view asked for.
pub fn placement_lines(
    active: &ActiveTiles<Bytes>,
    required: &[TileAddress],
    tile_size: u32,
    origin: (f64, f64),
) -> Vec<String> {
    active
        .placements(required, tile_size, origin)
        .into_iter()
        .map(|placed| {
            format!(
                "{:<14} {:>7} bytes  at ({:>6.0}, {:>6.0})  scale {}",
                placed.tile.address().to_string(),
                placed.tile.content().len(),
                placed.placement.x,
                placed.placement.y,
                placed.placement.scale
            )
        })
        .collect()
}

/// Pixel offset that puts the region's top-left corner at screen (0, 0).
pub fn view_origin(region: &VisibleRegion, zoom: u8, tile_size: u32) -> (f64, f64) {
    let world_px = tile_size as f64 * TileAddress::tiles_per_side(zoom) as f64;
    (-region.min_x * world_px, -region.min_y * world_px)
}

/// Writes the exact-zoom tiles to `dir`. Returns how many were written.
fn save_tiles(
    dir: &Path,
    tiles: &[Tile<Bytes>],
    zoom: u8,
    url_template: &str,
) -> Result<usize, CliError> {
    std::fs::create_dir_all(dir).map_err(|error| CliError::FileWrite {
        path: dir.display().to_string(),
        error,
    })?;

    let extension = file_extension(url_template);
    let mut saved = 0;
    for tile in tiles.iter().filter(|t| t.zoom() == zoom) {
        let path = dir.join(tile_file_name(&tile.address(), extension));
        std::fs::write(&path, tile.content()).map_err(|error| CliError::FileWrite {
            path: path.display().to_string(),
            error,
        })?;
        saved += 1;
    }
    Ok(saved)
}

/// `{zoom}_{row}_{col}.{extension}`
pub fn tile_file_name(address: &TileAddress, extension: &str) -> String {
    format!(
        "{}_{}_{}.{}",
        address.zoom, address.row, address.col, extension
    )
}

/// Extension of the URL template's last path segment, `tile` if none.
pub fn file_extension(url_template: &str) -> &str {
    let path = url_template.split(['?', '#']).next().unwrap_or(url_template);
    let segment = path.rsplit('/').next().unwrap_or(path);
    match segment.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()) => ext,
        _ => "tile",
    }
}
