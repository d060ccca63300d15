//! The single-owner coordinator task.
//!
//! The [`Coordinator`] owns every piece of mutable engine state: the tile
//! cache, the set of requested raw addresses, the in-flight fetch table and
//! the published [`ActiveTiles`] snapshot. It processes one event at a time:
//!
//! ```text
//!   render_tiles ──► EngineCommand::Render ──┐
//!   stats        ──► EngineCommand::Stats  ──┤
//!                                            ▼
//!                                    ┌──────────────┐   spawn    ┌────────────┐
//!                                    │ Coordinator  │ ─────────► │ fetch task │
//!                                    │              │ ◄───────── │            │
//!                                    └──────┬───────┘ FetchReport└────────────┘
//!                                           │ watch
//!                                           ▼
//!                                  Arc<ActiveTiles<C>>
//! ```
//!
//! Each dispatched fetch is tagged with a fresh `fetch_id`. A report is only
//! applied if the in-flight entry for its address still carries that id;
//! anything else is stale and dropped.

use crate::active::ActiveTiles;
use crate::cache::{CacheStats, TileCache};
use crate::config::EngineConfig;
use crate::coord::TileAddress;
use crate::fetch::{spawn_fetch, FetchOutcome, FetchPolicy, FetchReport};
use crate::resolver::{refresh, resolve};
use crate::source::TileSource;
use crate::tile::Tile;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot, watch, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace};

// =============================================================================
// Messages
// =============================================================================

/// Requests sent from engine handles to the coordinator.
#[derive(Debug)]
pub(crate) enum EngineCommand {
    /// A new set of required addresses at a zoom level.
    Render {
        addresses: Vec<TileAddress>,
        zoom: u8,
    },
    /// Snapshot of the engine counters.
    Stats(oneshot::Sender<EngineStats>),
}

/// Engine counters, taken from the coordinator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EngineStats {
    /// Fetch tasks spawned since start
    pub fetches_dispatched: u64,
    /// Fetches whose content entered the cache
    pub fetches_succeeded: u64,
    /// Fetches that exhausted their attempts
    pub fetches_failed: u64,
    /// Reports discarded because their fetch was no longer current
    pub stale_results: u64,
    /// Normalized addresses with a fetch currently running
    pub in_flight: usize,
    /// Raw addresses waiting on a fetch
    pub requested: usize,
    pub cache: CacheStats,
}

/// Bookkeeping for one running fetch.
#[derive(Debug)]
struct InFlight {
    fetch_id: u64,
    cancel: CancellationToken,
}

// =============================================================================
// Coordinator
// =============================================================================

pub(crate) struct Coordinator<S: TileSource> {
    source: Arc<S>,
    policy: FetchPolicy,
    limiter: Option<Arc<Semaphore>>,

    cache: TileCache<S::Content>,
    /// Raw addresses from render requests that are waiting on a fetch
    requested: HashSet<TileAddress>,
    /// Normalized address -> running fetch
    dispatched: HashMap<TileAddress, InFlight>,
    next_fetch_id: u64,

    /// Latest required addresses and zoom, replayed when new tiles arrive
    required: Vec<TileAddress>,
    zoom: u8,

    active: Arc<ActiveTiles<S::Content>>,
    active_tx: watch::Sender<Arc<ActiveTiles<S::Content>>>,

    commands: mpsc::UnboundedReceiver<EngineCommand>,
    reports_tx: mpsc::UnboundedSender<FetchReport<S::Content>>,
    reports_rx: mpsc::UnboundedReceiver<FetchReport<S::Content>>,
    shutdown: CancellationToken,

    stats: EngineStats,
}

impl<S: TileSource> Coordinator<S> {
    /// Creates a coordinator and the receiver for its snapshots.
    pub(crate) fn new(
        config: &EngineConfig,
        source: Arc<S>,
        commands: mpsc::UnboundedReceiver<EngineCommand>,
        shutdown: CancellationToken,
    ) -> (Self, watch::Receiver<Arc<ActiveTiles<S::Content>>>) {
        let active = Arc::new(ActiveTiles::empty());
        let (active_tx, active_rx) = watch::channel(Arc::clone(&active));
        let (reports_tx, reports_rx) = mpsc::unbounded_channel();

        let coordinator = Self {
            source,
            policy: FetchPolicy::from_config(config),
            limiter: config
                .max_concurrent_fetches()
                .map(|n| Arc::new(Semaphore::new(n))),
            cache: TileCache::new(config.max_cache_tiles()),
            requested: HashSet::new(),
            dispatched: HashMap::new(),
            next_fetch_id: 0,
            required: Vec::new(),
            zoom: 0,
            active,
            active_tx,
            commands,
            reports_tx,
            reports_rx,
            shutdown,
            stats: EngineStats::default(),
        };

        (coordinator, active_rx)
    }

    /// Runs until the shutdown token fires or every handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(
            source = self.source.name(),
            max_cache_tiles = self.cache.capacity(),
            max_tries = self.policy.max_tries,
            "Tile engine starting"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    debug!("Shutdown requested");
                    break;
                }

                command = self.commands.recv() => match command {
                    Some(command) => self.handle_command(command),
                    None => {
                        debug!("All engine handles dropped");
                        break;
                    }
                },

                Some(report) = self.reports_rx.recv() => {
                    self.handle_report(report);
                }
            }
        }

        self.stop();
    }

    pub(crate) fn handle_command(&mut self, command: EngineCommand) {
        match command {
            EngineCommand::Render { addresses, zoom } => self.render(addresses, zoom),
            EngineCommand::Stats(reply) => {
                // Caller may have given up waiting
                let _ = reply.send(self.snapshot_stats());
            }
        }
    }

    /// Resolves a new view and dispatches fetches for what is missing.
    fn render(&mut self, addresses: Vec<TileAddress>, zoom: u8) {
        self.required = addresses;
        self.zoom = zoom;

        let resolution = resolve(&self.required, zoom, &self.active, &self.cache);
        self.publish(resolution.active);

        if resolution.missing.is_empty() {
            return;
        }

        let missing: HashSet<TileAddress> = resolution.missing.into_iter().collect();
        let pending: Vec<TileAddress> = self
            .required
            .iter()
            .copied()
            .filter(|raw| missing.contains(&raw.normalized()))
            .collect();

        for raw in pending {
            if !self.requested.insert(raw) {
                continue;
            }
            let address = raw.normalized();
            if !self.dispatched.contains_key(&address) {
                self.dispatch(address);
            }
        }
    }

    /// Spawns one fetch for a normalized address.
    fn dispatch(&mut self, address: TileAddress) {
        self.next_fetch_id += 1;
        let fetch_id = self.next_fetch_id;
        let cancel = self.shutdown.child_token();

        spawn_fetch(
            Arc::clone(&self.source),
            address,
            fetch_id,
            self.policy,
            self.limiter.clone(),
            cancel.clone(),
            self.reports_tx.clone(),
        );

        self.dispatched.insert(address, InFlight { fetch_id, cancel });
        self.stats.fetches_dispatched += 1;

        debug!(
            zoom = address.zoom,
            row = address.row,
            col = address.col,
            fetch_id,
            "Fetch dispatched"
        );
    }

    pub(crate) fn handle_report(&mut self, report: FetchReport<S::Content>) {
        let FetchReport {
            address,
            fetch_id,
            outcome,
        } = report;

        let current = self.dispatched.get(&address).map(|f| f.fetch_id);
        if current != Some(fetch_id) {
            self.stats.stale_results += 1;
            debug!(
                zoom = address.zoom,
                row = address.row,
                col = address.col,
                fetch_id,
                current_fetch_id = ?current,
                "Discarding stale fetch result"
            );
            return;
        }

        self.dispatched.remove(&address);
        self.requested.retain(|raw| raw.normalized() != address);

        match outcome {
            FetchOutcome::Fetched(content) => {
                self.stats.fetches_succeeded += 1;
                let tile = Tile::new(address, content);
                self.cache.insert(tile.clone());
                self.refresh_with(tile);
            }
            FetchOutcome::Failed { attempts, .. } => {
                self.stats.fetches_failed += 1;
                debug!(
                    zoom = address.zoom,
                    row = address.row,
                    col = address.col,
                    fetch_id,
                    attempts,
                    "Fetch failed, address eligible for re-fetch"
                );
            }
            FetchOutcome::Cancelled => {}
        }
    }

    /// Re-resolves the current view after `tile` arrived.
    ///
    /// The new tile is carried alongside the current snapshot so it is shown
    /// even when the cache cannot hold it. Cache hit/miss counters are left
    /// to render requests.
    fn refresh_with(&mut self, tile: Tile<S::Content>) {
        let mut carried = self.active.tiles().to_vec();
        carried.push(tile);
        let previous = ActiveTiles::new(self.active.current_zoom(), carried);

        let resolution = refresh(&self.required, self.zoom, &previous, &self.cache);
        self.publish(resolution.active);
    }

    fn publish(&mut self, active: ActiveTiles<S::Content>) {
        trace!(
            zoom = active.current_zoom(),
            tiles = active.len(),
            composition = %active.composition(),
            "Publishing active tiles"
        );
        self.active = Arc::new(active);
        self.active_tx.send_replace(Arc::clone(&self.active));
    }

    fn snapshot_stats(&self) -> EngineStats {
        EngineStats {
            in_flight: self.dispatched.len(),
            requested: self.requested.len(),
            cache: self.cache.stats(),
            ..self.stats
        }
    }

    /// Cancels every running fetch and closes the report channel.
    fn stop(&mut self) {
        let cancelled = self.dispatched.len();
        for (_, in_flight) in self.dispatched.drain() {
            in_flight.cancel.cancel();
        }
        self.requested.clear();
        self.reports_rx.close();

        info!(
            cancelled_fetches = cancelled,
            fetches_succeeded = self.stats.fetches_succeeded,
            fetches_failed = self.stats.fetches_failed,
            "Tile engine stopped"
        );
    }

    #[cfg(test)]
    fn in_flight_id(&self, address: &TileAddress) -> Option<u64> {
        self.dispatched.get(address).map(|f| f.fetch_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{FnTileSource, SourceError};

    type PendingSource =
        FnTileSource<fn(TileAddress) -> std::future::Pending<Result<u32, SourceError>>>;

    fn pending_fetch(_address: TileAddress) -> std::future::Pending<Result<u32, SourceError>> {
        std::future::pending()
    }

    /// A coordinator whose fetches never complete on their own.
    fn idle_coordinator(
        config: EngineConfig,
    ) -> (
        Coordinator<PendingSource>,
        watch::Receiver<Arc<ActiveTiles<u32>>>,
        mpsc::UnboundedSender<EngineCommand>,
    ) {
        let source = FnTileSource::new("pending", pending_fetch as fn(_) -> _);
        let (tx, rx) = mpsc::unbounded_channel();
        let (coordinator, active) =
            Coordinator::new(&config, Arc::new(source), rx, CancellationToken::new());
        (coordinator, active, tx)
    }

    fn addr(zoom: u8, row: i64, col: i64) -> TileAddress {
        TileAddress::new(zoom, row, col)
    }

    fn render(coordinator: &mut Coordinator<PendingSource>, addresses: &[TileAddress], zoom: u8) {
        coordinator.handle_command(EngineCommand::Render {
            addresses: addresses.to_vec(),
            zoom,
        });
    }

    fn fetched(address: TileAddress, fetch_id: u64, content: u32) -> FetchReport<u32> {
        FetchReport {
            address,
            fetch_id,
            outcome: FetchOutcome::Fetched(content),
        }
    }

    #[tokio::test]
    async fn test_render_dispatches_missing_once() {
        let (mut coordinator, _active, _tx) = idle_coordinator(EngineConfig::default());

        render(&mut coordinator, &[addr(2, 0, 0), addr(2, 0, 1)], 2);
        render(&mut coordinator, &[addr(2, 0, 0), addr(2, 0, 1)], 2);

        let stats = coordinator.snapshot_stats();
        assert_eq!(stats.fetches_dispatched, 2, "Second render must not re-dispatch");
        assert_eq!(stats.in_flight, 2);
        assert_eq!(stats.requested, 2);
    }

    #[tokio::test]
    async fn test_raw_aliases_share_one_fetch() {
        let (mut coordinator, _active, _tx) = idle_coordinator(EngineConfig::default());

        // (2, -1, 4) and (2, 3, 0) both normalize to (2, 3, 0)
        render(&mut coordinator, &[addr(2, -1, 4), addr(2, 3, 0)], 2);

        let stats = coordinator.snapshot_stats();
        assert_eq!(stats.fetches_dispatched, 1);
        assert_eq!(stats.requested, 2, "Both raw addresses are tracked");
        assert!(coordinator.in_flight_id(&addr(2, 3, 0)).is_some());
    }

    #[tokio::test]
    async fn test_success_publishes_and_clears_tracking() {
        let (mut coordinator, active, _tx) = idle_coordinator(EngineConfig::default());
        let target = addr(3, 1, 2);

        render(&mut coordinator, &[target], 3);
        let fetch_id = coordinator.in_flight_id(&target).unwrap();
        coordinator.handle_report(fetched(target, fetch_id, 42));

        let snapshot = active.borrow().clone();
        assert_eq!(snapshot.get(&target).map(|t| *t.content()), Some(42));
        let stats = coordinator.snapshot_stats();
        assert_eq!(stats.in_flight, 0);
        assert_eq!(stats.requested, 0);
        assert_eq!(stats.fetches_succeeded, 1);
        assert_eq!(stats.cache.entries, 1);
    }

    #[tokio::test]
    async fn test_refresh_leaves_cache_counters_alone() {
        let (mut coordinator, _active, _tx) = idle_coordinator(EngineConfig::default());
        let a = addr(3, 1, 2);
        let b = addr(3, 1, 3);

        render(&mut coordinator, &[a, b], 3);
        let before = coordinator.snapshot_stats().cache;
        assert_eq!((before.hits, before.misses), (0, 2));

        let fetch_id = coordinator.in_flight_id(&a).unwrap();
        coordinator.handle_report(fetched(a, fetch_id, 1));

        let after = coordinator.snapshot_stats().cache;
        assert_eq!((after.hits, after.misses), (0, 2), "Refresh must not count lookups");
    }

    #[tokio::test]
    async fn test_stale_fetch_id_is_discarded() {
        let (mut coordinator, active, _tx) = idle_coordinator(EngineConfig::default());
        let target = addr(3, 1, 2);

        render(&mut coordinator, &[target], 3);
        let fetch_id = coordinator.in_flight_id(&target).unwrap();

        coordinator.handle_report(fetched(target, fetch_id + 100, 7));

        let stats = coordinator.snapshot_stats();
        assert_eq!(stats.stale_results, 1);
        assert_eq!(stats.cache.entries, 0, "Stale result must not touch the cache");
        assert_eq!(stats.in_flight, 1, "Current fetch stays in flight");
        assert!(active.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_report_for_unknown_address_is_stale() {
        let (mut coordinator, _active, _tx) = idle_coordinator(EngineConfig::default());

        coordinator.handle_report(fetched(addr(1, 0, 0), 1, 1));

        assert_eq!(coordinator.snapshot_stats().stale_results, 1);
        assert_eq!(coordinator.snapshot_stats().cache.entries, 0);
    }

    #[tokio::test]
    async fn test_failure_allows_refetch() {
        let (mut coordinator, _active, _tx) = idle_coordinator(EngineConfig::default());
        let target = addr(4, 5, 6);

        render(&mut coordinator, &[target], 4);
        let first = coordinator.in_flight_id(&target).unwrap();
        coordinator.handle_report(FetchReport {
            address: target,
            fetch_id: first,
            outcome: FetchOutcome::Failed {
                attempts: 3,
                error: "boom".to_string(),
            },
        });
        assert_eq!(coordinator.snapshot_stats().in_flight, 0);

        render(&mut coordinator, &[target], 4);
        let second = coordinator.in_flight_id(&target).unwrap();
        assert!(second > first, "Re-fetch gets a fresh fetch id");
        assert_eq!(coordinator.snapshot_stats().fetches_dispatched, 2);
    }

    #[tokio::test]
    async fn test_zero_capacity_cache_still_shows_fetched_tile() {
        let config = EngineConfig::new().with_max_cache_tiles(0);
        let (mut coordinator, active, _tx) = idle_coordinator(config);
        let target = addr(2, 1, 1);

        render(&mut coordinator, &[target], 2);
        let fetch_id = coordinator.in_flight_id(&target).unwrap();
        coordinator.handle_report(fetched(target, fetch_id, 9));

        assert!(active.borrow().contains(&target));
        assert_eq!(coordinator.snapshot_stats().cache.entries, 0);

        // Continuity keeps it on the next identical render
        render(&mut coordinator, &[target], 2);
        assert!(active.borrow().contains(&target));
        assert_eq!(coordinator.snapshot_stats().fetches_dispatched, 1);
    }

    #[tokio::test]
    async fn test_run_exits_on_shutdown_and_cancels_fetches() {
        let source = FnTileSource::new("pending", pending_fetch as fn(_) -> _);
        let (tx, rx) = mpsc::unbounded_channel();
        let shutdown = CancellationToken::new();
        let (coordinator, _active) =
            Coordinator::new(&EngineConfig::default(), Arc::new(source), rx, shutdown.clone());
        let task = tokio::spawn(coordinator.run());

        tx.send(EngineCommand::Render {
            addresses: vec![addr(1, 0, 0)],
            zoom: 1,
        })
        .unwrap();
        let (reply_tx, reply_rx) = oneshot::channel();
        tx.send(EngineCommand::Stats(reply_tx)).unwrap();
        assert_eq!(reply_rx.await.unwrap().in_flight, 1);

        shutdown.cancel();
        task.await.unwrap();
        assert!(tx.is_closed(), "Command receiver dropped after shutdown");
    }

    #[tokio::test]
    async fn test_run_exits_when_handles_dropped() {
        let (coordinator, _active, tx) = idle_coordinator(EngineConfig::default());
        let task = tokio::spawn(coordinator.run());

        drop(tx);
        task.await.unwrap();
    }
}
