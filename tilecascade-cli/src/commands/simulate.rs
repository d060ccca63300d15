//! Simulate command - drive the engine along a scripted pan/zoom path.
//!
//! Uses an in-process synthetic tile source with configurable latency and a
//! deterministic failure pattern, so fallback behavior can be observed
//! without a tile server.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tilecascade::coord::{to_world_position, MAX_ZOOM};
use tilecascade::engine::TileEngine;
use tilecascade::source::{SourceError, TileSource};
use tracing::info;

use super::common::{print_stats, region_around};
use crate::error::CliError;
use crate::runner::CliRunner;

/// Arguments for the simulate command.
pub struct SimulateArgs {
    pub lat: f64,
    pub lon: f64,
    pub start_zoom: u8,
    pub steps: u32,
    pub width: u32,
    pub height: u32,
    pub latency_ms: u64,
    /// Every Nth source call fails (0 = never)
    pub fail_every: u64,
    /// Time spent at each step before moving on
    pub dwell_ms: u64,
}

// =============================================================================
// Synthetic source
// =============================================================================

/// Tile source that answers after a fixed delay with a label.
pub struct SyntheticSource {
    latency: Duration,
    fail_every: u64,
    calls: AtomicU64,
}

impl SyntheticSource {
    pub fn new(latency: Duration, fail_every: u64) -> Self {
        Self {
            latency,
            fail_every,
            calls: AtomicU64::new(0),
        }
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl TileSource for SyntheticSource {
    type Content = String;

    async fn fetch(&self, zoom: u8, row: i64, col: i64) -> Result<String, SourceError> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every > 0 && call % self.fail_every == 0 {
            return Err(SourceError::Other(format!("synthetic failure on call {}", call)));
        }

        Ok(format!("synthetic {}/{}/{}", zoom, row, col))
    }

    fn name(&self) -> &str {
        "synthetic"
    }
}

// =============================================================================
// Script
// =============================================================================

/// One camera move in the scripted path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Move {
    Start,
    ZoomIn,
    PanEast,
    ZoomOut,
    PanSouth,
}

impl Move {
    fn label(&self) -> &'static str {
        match self {
            Move::Start => "start",
            Move::ZoomIn => "zoom in",
            Move::PanEast => "pan east",
            Move::ZoomOut => "zoom out",
            Move::PanSouth => "pan south",
        }
    }
}

/// Camera position for one step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Step {
    pub movement: Move,
    pub zoom: u8,
    /// World-fraction center
    pub center: (f64, f64),
}

const CYCLE: [Move; 4] = [Move::ZoomIn, Move::PanEast, Move::ZoomOut, Move::PanSouth];

/// Builds `steps` camera positions starting at `center`.
///
/// The path cycles zoom in, pan east, zoom out, pan south. Pans move half a
/// tile at the current zoom; x wraps around the antimeridian.
pub fn script(center: (f64, f64), start_zoom: u8, steps: u32) -> Vec<Step> {
    let mut current = Step {
        movement: Move::Start,
        zoom: start_zoom.min(MAX_ZOOM),
        center,
    };
    let mut path = Vec::with_capacity(steps as usize);

    for i in 0..steps as usize {
        if i > 0 {
            let movement = CYCLE[(i - 1) % CYCLE.len()];
            let half_tile = 0.5 / (1u64 << current.zoom) as f64;
            current.movement = movement;
            match movement {
                Move::ZoomIn => current.zoom = (current.zoom + 1).min(MAX_ZOOM),
                Move::ZoomOut => current.zoom = current.zoom.saturating_sub(1),
                Move::PanEast => current.center.0 = (current.center.0 + half_tile).rem_euclid(1.0),
                Move::PanSouth => current.center.1 = (current.center.1 + half_tile).min(1.0),
                Move::Start => {}
            }
        }
        path.push(current);
    }

    path
}

// =============================================================================
// Command
// =============================================================================

/// Run the simulate command.
pub async fn run(args: SimulateArgs, runner: &CliRunner) -> Result<(), CliError> {
    runner.log_startup("simulate");
    let config = runner.config();
    let tile_size = config.viewport.tile_size;

    let center = to_world_position(args.lat, args.lon)?;
    let path = script(center, args.start_zoom, args.steps);

    let source = SyntheticSource::new(Duration::from_millis(args.latency_ms), args.fail_every);
    let engine = TileEngine::spawn(config.engine_config(), source);
    let dwell = Duration::from_millis(args.dwell_ms);

    println!("Simulating {} steps from {}, {}", path.len(), args.lat, args.lon);
    println!(
        "  Viewport: {}x{} px, latency {} ms, fail every {}",
        args.width,
        args.height,
        args.latency_ms,
        match args.fail_every {
            0 => "never".to_string(),
            n => format!("{} calls", n),
        }
    );
    println!();

    for (i, step) in path.iter().enumerate() {
        let region = region_around(step.center, step.zoom, args.width, args.height, tile_size);
        let required = engine.render_region(&region, step.zoom)?;

        // Stats are answered after the render is applied
        engine.stats().await?;
        let immediate = engine.active_tiles().composition();

        tokio::time::sleep(dwell).await;
        let settled = engine.active_tiles().composition();

        info!(step = i, zoom = step.zoom, required, %immediate, %settled, "Simulation step");
        println!(
            "Step {:>2} {:<9} zoom {:>2}: {:>3} required | now: {} | after {} ms: {}",
            i,
            step.movement.label(),
            step.zoom,
            required,
            immediate,
            args.dwell_ms,
            settled
        );
    }

    println!();
    print_stats(&engine.stats().await?);
    engine.shutdown().await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_script_cycle() {
        let path = script((0.5, 0.5), 3, 6);
        let moves: Vec<Move> = path.iter().map(|s| s.movement).collect();
        assert_eq!(
            moves,
            vec![
                Move::Start,
                Move::ZoomIn,
                Move::PanEast,
                Move::ZoomOut,
                Move::PanSouth,
                Move::ZoomIn
            ]
        );
        let zooms: Vec<u8> = path.iter().map(|s| s.zoom).collect();
        assert_eq!(zooms, vec![3, 4, 4, 3, 3, 4]);
    }

    #[test]
    fn test_script_pans_half_a_tile() {
        let path = script((0.5, 0.5), 2, 3);
        // Pan east happens at zoom 3: half of a 1/8 tile
        assert!((path[2].center.0 - (0.5 + 1.0 / 16.0)).abs() < 1e-12);
        assert_eq!(path[2].center.1, 0.5);
    }

    #[test]
    fn test_script_wraps_east() {
        let path = script((0.99, 0.5), 0, 3);
        assert!(path[2].center.0 < 0.5, "x wraps past the antimeridian");
    }

    #[test]
    fn test_script_respects_zoom_limits() {
        let path = script((0.5, 0.5), MAX_ZOOM, 2);
        assert_eq!(path[1].zoom, MAX_ZOOM);

        let path = script((0.5, 0.5), 0, 4);
        assert_eq!(path[3].zoom, 0, "Zoom out returns to the start level");
    }

    #[test]
    fn test_zero_steps_is_empty() {
        assert!(script((0.5, 0.5), 3, 0).is_empty());
    }

    #[tokio::test]
    async fn test_synthetic_source_fails_deterministically() {
        let source = SyntheticSource::new(Duration::ZERO, 3);
        let mut results = Vec::new();
        for col in 0..6 {
            results.push(source.fetch(4, 0, col).await.is_ok());
        }

        assert_eq!(results, vec![true, true, false, true, true, false]);
        assert_eq!(source.calls(), 6);
    }

    #[tokio::test]
    async fn test_synthetic_source_never_fails_when_disabled() {
        let source = SyntheticSource::new(Duration::ZERO, 0);
        assert_eq!(
            source.fetch(1, 0, 1).await.unwrap(),
            "synthetic 1/0/1".to_string()
        );
    }
}
