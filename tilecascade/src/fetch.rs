//! Fetch tasks.
//!
//! A fetch calls the tile source up to `max_tries` times with no delay
//! between attempts. Each attempt may be bounded by a timeout and by a
//! shared concurrency permit. Errors, timeouts and panics raised by the
//! source all count as a failed attempt; the task itself never fails.
//!
//! Spawned fetches report back to the coordinator over a channel. A fetch
//! whose token is cancelled stops calling the source and reports nothing.

use crate::config::EngineConfig;
use crate::coord::TileAddress;
use crate::source::TileSource;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Retry and timeout settings for one fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchPolicy {
    /// Source calls before giving up (at least 1)
    pub max_tries: u32,
    /// Per-attempt timeout
    pub timeout: Option<Duration>,
}

impl FetchPolicy {
    pub fn new(max_tries: u32, timeout: Option<Duration>) -> Self {
        Self {
            max_tries: max_tries.max(1),
            timeout,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self::new(config.max_tries(), config.fetch_timeout())
    }
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

/// How a fetch ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome<C> {
    /// The source produced content.
    Fetched(C),
    /// Every attempt failed; `error` describes the last one.
    Failed { attempts: u32, error: String },
    /// The fetch was cancelled before it finished.
    Cancelled,
}

/// Message sent from a fetch task to the coordinator.
#[derive(Debug)]
pub(crate) struct FetchReport<C> {
    pub address: TileAddress,
    pub fetch_id: u64,
    pub outcome: FetchOutcome<C>,
}

/// Fetches one tile, retrying failed attempts.
///
/// `address` must already be normalized.
pub async fn fetch_tile<S: TileSource>(
    source: &S,
    address: TileAddress,
    policy: FetchPolicy,
    limiter: Option<&Semaphore>,
    cancel: &CancellationToken,
) -> FetchOutcome<S::Content> {
    let max_tries = policy.max_tries.max(1);
    let mut last_error = String::new();

    for attempt in 1..=max_tries {
        let result = tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                trace!(tile = %address, attempt, "Fetch cancelled");
                return FetchOutcome::Cancelled;
            }

            result = attempt_fetch(source, address, policy.timeout, limiter) => result,
        };

        match result {
            Ok(content) => {
                debug!(
                    zoom = address.zoom,
                    row = address.row,
                    col = address.col,
                    attempt,
                    "Tile fetched"
                );
                return FetchOutcome::Fetched(content);
            }
            Err(error) => {
                debug!(
                    zoom = address.zoom,
                    row = address.row,
                    col = address.col,
                    attempt,
                    max_tries,
                    error = %error,
                    "Fetch attempt failed"
                );
                last_error = error;
            }
        }
    }

    warn!(
        zoom = address.zoom,
        row = address.row,
        col = address.col,
        attempts = max_tries,
        source = source.name(),
        error = %last_error,
        "Tile fetch failed"
    );
    FetchOutcome::Failed {
        attempts: max_tries,
        error: last_error,
    }
}

/// One call to the source, bounded by the permit and the timeout.
async fn attempt_fetch<S: TileSource>(
    source: &S,
    address: TileAddress,
    timeout: Option<Duration>,
    limiter: Option<&Semaphore>,
) -> Result<S::Content, String> {
    // Held for this attempt only
    let _permit = match limiter {
        Some(semaphore) => Some(
            semaphore
                .acquire()
                .await
                .map_err(|_| "fetch limiter closed".to_string())?,
        ),
        None => None,
    };

    // The source is called inside the guarded future so a panic raised
    // before its first await is caught as well.
    let call = AssertUnwindSafe(async {
        source.fetch(address.zoom, address.row, address.col).await
    })
    .catch_unwind();

    let result = match timeout {
        Some(limit) => tokio::time::timeout(limit, call)
            .await
            .map_err(|_| format!("timed out after {:?}", limit))?,
        None => call.await,
    };

    match result {
        Ok(Ok(content)) => Ok(content),
        Ok(Err(e)) => Err(e.to_string()),
        Err(panic) => Err(format!("tile source panicked: {}", panic_message(&*panic))),
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&'static str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.as_str()
    } else {
        "non-string panic payload"
    }
}

/// Spawns a fetch task that reports its outcome on `reports`.
///
/// Cancelled fetches send nothing. A closed report channel (engine shut
/// down) silently drops the result.
pub(crate) fn spawn_fetch<S: TileSource>(
    source: Arc<S>,
    address: TileAddress,
    fetch_id: u64,
    policy: FetchPolicy,
    limiter: Option<Arc<Semaphore>>,
    cancel: CancellationToken,
    reports: mpsc::UnboundedSender<FetchReport<S::Content>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let outcome = fetch_tile(source.as_ref(), address, policy, limiter.as_deref(), &cancel).await;

        if matches!(outcome, FetchOutcome::Cancelled) {
            return;
        }

        if reports
            .send(FetchReport {
                address,
                fetch_id,
                outcome,
            })
            .is_err()
        {
            trace!(tile = %address, fetch_id, "Coordinator gone, dropping fetch result");
        }
    })
}
