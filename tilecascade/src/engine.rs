//! Public engine handle.
//!
//! [`TileEngine`] is what an application holds. It forwards render requests
//! to the coordinator task and exposes the published [`ActiveTiles`]
//! snapshot. All methods return immediately; fetching happens in the
//! background.
//!
//! # Example
//!
//! ```no_run
//! use tilecascade::config::EngineConfig;
//! use tilecascade::coord::TileAddress;
//! use tilecascade::engine::TileEngine;
//! use tilecascade::source::{FnTileSource, SourceError};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let source = FnTileSource::new("labels", |address: TileAddress| async move {
//!     Ok::<_, SourceError>(address.to_string())
//! });
//! let engine = TileEngine::spawn(EngineConfig::default(), source);
//!
//! let mut updates = engine.subscribe();
//! engine.render_tiles(vec![TileAddress::new(2, 1, 1)], 2)?;
//!
//! updates.changed().await?;
//! for tile in engine.active_tiles().tiles() {
//!     println!("{} -> {}", tile.address(), tile.content());
//! }
//!
//! engine.shutdown().await;
//! # Ok(())
//! # }
//! ```

use crate::active::ActiveTiles;
use crate::config::EngineConfig;
use crate::coord::{CoordError, TileAddress, MAX_ZOOM};
use crate::coordinator::{Coordinator, EngineCommand};
use crate::source::TileSource;
use crate::viewport::{enumerate_tiles, VisibleRegion};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

pub use crate::coordinator::EngineStats;

/// Errors returned by [`TileEngine`] methods.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// The coordinator task has stopped
    #[error("Tile engine has shut down")]
    Shutdown,
    /// An address or zoom outside the supported pyramid
    #[error("Invalid tile address: {0}")]
    InvalidAddress(#[from] CoordError),
}

/// Handle to a running tile engine.
///
/// Dropping the handle stops the engine and cancels outstanding fetches.
pub struct TileEngine<C> {
    config: EngineConfig,
    commands: mpsc::UnboundedSender<EngineCommand>,
    active: watch::Receiver<Arc<ActiveTiles<C>>>,
    shutdown: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl<C: Send + Sync + 'static> TileEngine<C> {
    /// Starts an engine backed by `source`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<S>(config: EngineConfig, source: S) -> Self
    where
        S: TileSource<Content = C>,
    {
        let (commands, commands_rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let (coordinator, active) =
            Coordinator::new(&config, Arc::new(source), commands_rx, shutdown.clone());
        let task = tokio::spawn(coordinator.run());

        Self {
            config,
            commands,
            active,
            shutdown,
            task: Some(task),
        }
    }

    /// Requests the tiles needed for the current view.
    ///
    /// Addresses may be out of range; they are normalized for lookup and
    /// fetching. Returns as soon as the request is queued.
    pub fn render_tiles(&self, addresses: Vec<TileAddress>, zoom: u8) -> Result<(), EngineError> {
        if zoom > MAX_ZOOM {
            return Err(CoordError::InvalidZoom(zoom).into());
        }
        if let Some(bad) = addresses.iter().find(|a| a.zoom > MAX_ZOOM) {
            return Err(CoordError::InvalidZoom(bad.zoom).into());
        }

        self.commands
            .send(EngineCommand::Render { addresses, zoom })
            .map_err(|_| EngineError::Shutdown)
    }

    /// Enumerates `region` at `zoom` with the configured edge policy and
    /// renders the result. Returns the number of addresses requested.
    pub fn render_region(&self, region: &VisibleRegion, zoom: u8) -> Result<usize, EngineError> {
        let addresses = enumerate_tiles(region, zoom, self.config.out_of_bounds())?;
        let count = addresses.len();
        self.render_tiles(addresses, zoom)?;
        Ok(count)
    }

    /// The most recently published snapshot.
    pub fn active_tiles(&self) -> Arc<ActiveTiles<C>> {
        Arc::clone(&self.active.borrow())
    }

    /// A receiver notified each time a new snapshot is published.
    pub fn subscribe(&self) -> watch::Receiver<Arc<ActiveTiles<C>>> {
        self.active.clone()
    }

    /// Counters from the coordinator.
    ///
    /// Answered after every command queued before it, so it also serves as
    /// a barrier for earlier `render_tiles` calls.
    pub async fn stats(&self) -> Result<EngineStats, EngineError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(EngineCommand::Stats(reply))
            .map_err(|_| EngineError::Shutdown)?;
        response.await.map_err(|_| EngineError::Shutdown)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Whether the coordinator is still accepting requests.
    pub fn is_running(&self) -> bool {
        !self.commands.is_closed()
    }

    /// Stops the coordinator and waits for it to exit.
    ///
    /// Running fetches are cancelled; results that arrive later are dropped.
    pub async fn shutdown(mut self) {
        self.shutdown.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(error = %e, "Coordinator task ended abnormally");
            }
        }
    }
}

impl<C> Drop for TileEngine<C> {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FnTileSource, SourceError};
    use crate::viewport::OutOfBoundsPolicy;

    fn echo_engine(config: EngineConfig) -> TileEngine<String> {
        let source = FnTileSource::new("echo", |address: TileAddress| async move {
            Ok::<_, SourceError>(address.to_string())
        });
        TileEngine::spawn(config, source)
    }

    #[tokio::test]
    async fn test_starts_empty() {
        let engine = echo_engine(EngineConfig::default());
        assert!(engine.active_tiles().is_empty());
        assert!(engine.is_running());

        let stats = engine.stats().await.unwrap();
        assert_eq!(stats.fetches_dispatched, 0);
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.cache.capacity, 256);
    }

    #[tokio::test]
    async fn test_rejects_zoom_above_max() {
        let engine = echo_engine(EngineConfig::default());
        assert_eq!(
            engine.render_tiles(vec![], MAX_ZOOM + 1),
            Err(EngineError::InvalidAddress(CoordError::InvalidZoom(MAX_ZOOM + 1)))
        );
        assert_eq!(
            engine.render_tiles(vec![TileAddress::new(40, 0, 0)], 3),
            Err(EngineError::InvalidAddress(CoordError::InvalidZoom(40)))
        );
    }

    #[tokio::test]
    async fn test_render_eventually_shows_tile() {
        let engine = echo_engine(EngineConfig::default());
        let mut updates = engine.subscribe();
        let target = TileAddress::new(2, 1, 3);

        engine.render_tiles(vec![target], 2).unwrap();

        while !updates.borrow_and_update().contains(&target) {
            updates.changed().await.unwrap();
        }
        let active = engine.active_tiles();
        assert_eq!(active.get(&target).unwrap().content(), "2/1/3");
        assert_eq!(active.current_zoom(), 2);
    }

    #[tokio::test]
    async fn test_render_region_counts_addresses() {
        let engine = echo_engine(EngineConfig::default());
        let region = VisibleRegion::new(0.0, 0.0, 0.49, 0.49);

        let count = engine.render_region(&region, 2).unwrap();
        assert_eq!(count, 4, "Top-left quarter at zoom 2 spans a 2x2 grid");
    }

    #[tokio::test]
    async fn test_render_region_rejects_oversized_region() {
        let engine = echo_engine(EngineConfig::new().with_out_of_bounds(OutOfBoundsPolicy::Wrap));
        let region = VisibleRegion::new(-1e30, 0.1, 1e30, 0.2);

        assert_eq!(engine.render_region(&region, 1).unwrap(), 6);
        assert!(matches!(
            engine.render_region(&region, MAX_ZOOM),
            Err(EngineError::InvalidAddress(CoordError::RegionTooLarge { .. }))
        ));
        assert!(engine.is_running());
    }

    #[tokio::test]
    async fn test_methods_fail_after_shutdown() {
        let engine = echo_engine(EngineConfig::default());
        let commands = engine.commands.clone();
        engine.shutdown().await;

        assert!(commands.is_closed());
        assert!(commands
            .send(EngineCommand::Render {
                addresses: vec![],
                zoom: 0
            })
            .is_err());
    }

    #[tokio::test]
    async fn test_stats_after_shutdown_is_error() {
        let engine = echo_engine(EngineConfig::default());
        engine.shutdown.cancel();
        // Wait for the coordinator to observe cancellation
        while engine.is_running() {
            tokio::task::yield_now().await;
        }
        assert_eq!(engine.stats().await, Err(EngineError::Shutdown));
        assert_eq!(
            engine.render_tiles(vec![TileAddress::new(1, 0, 0)], 1),
            Err(EngineError::Shutdown)
        );
    }
}
