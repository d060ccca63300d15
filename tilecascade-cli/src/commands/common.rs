//! Helpers shared across CLI commands.

use std::collections::HashSet;
use std::time::Duration;
use tilecascade::active::ActiveTiles;
use tilecascade::coord::TileAddress;
use tilecascade::engine::{EngineError, EngineStats, TileEngine};
use tilecascade::viewport::VisibleRegion;

/// How often to check whether any fetch is still running.
const IDLE_CHECK_INTERVAL: Duration = Duration::from_millis(100);

/// Screen region of `width` x `height` pixels centered on a world position.
pub fn region_around(
    center: (f64, f64),
    zoom: u8,
    width: u32,
    height: u32,
    tile_size: u32,
) -> VisibleRegion {
    let world_px = tile_size as f64 * TileAddress::tiles_per_side(zoom) as f64;
    VisibleRegion::from_pixel_rect(
        center.0 * world_px - width as f64 / 2.0,
        center.1 * world_px - height as f64 / 2.0,
        width as f64,
        height as f64,
        zoom,
        tile_size,
    )
}

/// Number of `wanted` addresses without an exact tile in `active`.
pub fn count_missing<C>(active: &ActiveTiles<C>, wanted: &HashSet<TileAddress>) -> usize {
    wanted.iter().filter(|a| !active.contains(a)).count()
}

/// Waits until every required address is drawn exactly, no fetch is left
/// running, or `deadline` passes. Returns how many are still missing.
pub async fn wait_for_exact<C: Send + Sync + 'static>(
    engine: &TileEngine<C>,
    required: &[TileAddress],
    deadline: Duration,
) -> Result<usize, EngineError> {
    let wanted: HashSet<TileAddress> = required.iter().map(TileAddress::normalized).collect();
    let mut updates = engine.subscribe();
    let mut idle_check = tokio::time::interval(IDLE_CHECK_INTERVAL);
    let expiry = tokio::time::sleep(deadline);
    tokio::pin!(expiry);

    loop {
        let missing = count_missing(&engine.active_tiles(), &wanted);
        if missing == 0 {
            return Ok(0);
        }

        tokio::select! {
            _ = &mut expiry => return Ok(missing),
            changed = updates.changed() => changed.map_err(|_| EngineError::Shutdown)?,
            _ = idle_check.tick() => {
                if engine.stats().await?.in_flight == 0 {
                    return Ok(count_missing(&engine.active_tiles(), &wanted));
                }
            }
        }
    }
}

/// Print engine statistics.
pub fn print_stats(stats: &EngineStats) {
    println!("Engine statistics:");
    println!("  Fetches dispatched: {}", stats.fetches_dispatched);
    println!("  Fetches succeeded:  {}", stats.fetches_succeeded);
    println!("  Fetches failed:     {}", stats.fetches_failed);
    println!("  Stale results:      {}", stats.stale_results);
    println!("  In flight:          {}", stats.in_flight);
    println!(
        "  Cache:              {}/{} tiles, {} evictions, {:.1}% hit rate",
        stats.cache.entries,
        stats.cache.capacity,
        stats.cache.evictions,
        stats.cache.hit_rate() * 100.0
    );
}
