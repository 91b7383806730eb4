//! The two walk queues and their shared counters
//!
//! Traversal state lives in two unbounded FIFO channels: pending-paths
//! (directories waiting to be listed) and listing-results (completed listings
//! waiting for the driver). The driver holds one end of each through
//! `DriverHandle`; every worker holds the other end through a cloned
//! `WorkerHandle`.
//!
//! Alongside the channels sits an in-flight counter. A worker increments it
//! the moment it takes a path and decrements it only after the result has
//! been published, via the RAII `InFlightGuard`. Termination detection reads
//! all three: the walk is settled when both channels are empty AND nothing is
//! in flight. Without the counter, a worker holding a path between dequeue
//! and publish would be invisible to an emptiness check.

use crate::api::DirListing;
use crate::error::WorkerError;
use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// What a worker publishes: a listing, or the failure that ends the run
pub type ListingResult = std::result::Result<DirListing, WorkerError>;

/// Counters shared by both queue ends
#[derive(Debug, Default)]
pub struct QueueStats {
    /// Paths pushed onto pending-paths
    pub paths_enqueued: AtomicU64,

    /// Paths taken off pending-paths by workers
    pub paths_taken: AtomicU64,

    /// Results published to listing-results
    pub results_published: AtomicU64,

    /// Results consumed by the driver
    pub results_consumed: AtomicU64,

    /// Listings currently between dequeue and publish
    in_flight: AtomicUsize,
}

impl QueueStats {
    /// Listings currently being fetched by workers
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// Point-in-time queue depths, for settle checks and progress display
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueDepths {
    /// Paths waiting to be listed
    pub pending: usize,

    /// Listings waiting for the driver
    pub results: usize,

    /// Listings in flight inside workers
    pub in_flight: usize,
}

impl QueueDepths {
    /// True when nothing is queued anywhere and nothing is in flight
    pub fn is_settled(&self) -> bool {
        self.pending == 0 && self.results == 0 && self.in_flight == 0
    }
}

/// Create the connected pair of queue handles
pub fn walk_queues() -> (DriverHandle, WorkerHandle) {
    let (paths_tx, paths_rx) = unbounded();
    let (results_tx, results_rx) = unbounded();
    let stats = Arc::new(QueueStats::default());

    let driver = DriverHandle {
        paths_tx,
        results_rx,
        stats: Arc::clone(&stats),
    };
    let worker = WorkerHandle {
        paths_rx,
        results_tx,
        stats,
    };
    (driver, worker)
}

/// Driver end: pushes paths, drains results, owns the settle check.
///
/// Dropping this handle closes the pending-path channel, which is how the
/// worker pool learns the walk is over.
pub struct DriverHandle {
    paths_tx: Sender<String>,
    results_rx: Receiver<ListingResult>,
    stats: Arc<QueueStats>,
}

impl DriverHandle {
    /// Push one directory path onto pending-paths
    pub fn push_path(&self, path: String) {
        self.stats.paths_enqueued.fetch_add(1, Ordering::Relaxed);
        // Send on an unbounded channel only fails when all receivers are
        // gone, which means the pool already exited; the settle check ends
        // the walk shortly after.
        let _ = self.paths_tx.send(path);
    }

    /// Wait up to `timeout` for the next published result
    pub fn next_result(&self, timeout: Duration) -> Option<ListingResult> {
        match self.results_rx.recv_timeout(timeout) {
            Ok(result) => {
                self.stats.results_consumed.fetch_add(1, Ordering::Relaxed);
                Some(result)
            }
            Err(_) => None,
        }
    }

    /// Snapshot current depths
    pub fn depths(&self) -> QueueDepths {
        QueueDepths {
            pending: self.paths_tx.len(),
            results: self.results_rx.len(),
            in_flight: self.stats.in_flight(),
        }
    }

    /// True when both queues are empty and no listing is in flight
    pub fn is_settled(&self) -> bool {
        self.depths().is_settled()
    }

    /// Shared counters
    pub fn stats(&self) -> Arc<QueueStats> {
        Arc::clone(&self.stats)
    }
}

/// Outcome of polling pending-paths
pub enum PathPoll<'a> {
    /// A path to list, plus the guard holding the in-flight counter
    Taken(String, InFlightGuard<'a>),

    /// Nothing arrived within the timeout
    Idle,

    /// Driver hung up; no more paths will come
    Closed,
}

/// Worker end: takes paths, publishes results. Clone one per worker.
#[derive(Clone)]
pub struct WorkerHandle {
    paths_rx: Receiver<String>,
    results_tx: Sender<ListingResult>,
    stats: Arc<QueueStats>,
}

impl WorkerHandle {
    /// Poll pending-paths; a taken path holds the in-flight counter until
    /// its guard is consumed by `publish` or dropped on failure
    pub fn take_path(&self, timeout: Duration) -> PathPoll<'_> {
        match self.paths_rx.recv_timeout(timeout) {
            Ok(path) => {
                self.stats.paths_taken.fetch_add(1, Ordering::Relaxed);
                PathPoll::Taken(path, InFlightGuard::new(&self.stats))
            }
            Err(RecvTimeoutError::Timeout) => PathPoll::Idle,
            Err(RecvTimeoutError::Disconnected) => PathPoll::Closed,
        }
    }

    /// Publish a result and release the in-flight counter.
    ///
    /// The guard is consumed here rather than earlier so the counter stays
    /// raised until the result is actually visible to the driver; releasing
    /// it before the send would reopen the termination race the counter
    /// exists to close.
    pub fn publish(&self, result: ListingResult, guard: InFlightGuard<'_>) -> bool {
        let sent = self.results_tx.send(result).is_ok();
        if sent {
            self.stats.results_published.fetch_add(1, Ordering::Relaxed);
        }
        drop(guard);
        sent
    }
}

/// RAII holder of the in-flight counter
pub struct InFlightGuard<'a> {
    stats: &'a QueueStats,
}

impl<'a> InFlightGuard<'a> {
    fn new(stats: &'a QueueStats) -> Self {
        stats.in_flight.fetch_add(1, Ordering::SeqCst);
        Self { stats }
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.stats.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}
