//! The listing worker pool
//!
//! Each worker:
//! - Takes one pending path at a time off the walk queue
//! - Lists it through the shared `ListDirectory` seam (two REST calls)
//! - Publishes the listing, or the failure, back to the driver
//!
//! Workers never decide traversal policy. Exclusions, depth limits and
//! recursion all belong to the driver; a worker's whole job is turning a path
//! into a `DirListing`. A listing failure is published like a listing so the
//! driver can fail the run - there is no per-worker restart.

use crate::api::{DirListing, ListDirectory};
use crate::error::WorkerError;
use crate::walk::queue::{PathPoll, WorkerHandle};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, trace, warn};

/// How long a worker waits on pending-paths before re-checking shutdown
const PATH_POLL: Duration = Duration::from_millis(100);

/// Statistics collected by a worker
#[derive(Debug, Default)]
pub struct WorkerStats {
    /// Directories listed
    pub dirs_listed: AtomicU64,

    /// Child files returned across those listings
    pub files_listed: AtomicU64,

    /// Bytes across those child files
    pub bytes_listed: AtomicU64,
}

impl WorkerStats {
    fn record_listing(&self, listing: &DirListing) {
        self.dirs_listed.fetch_add(1, Ordering::Relaxed);
        self.files_listed
            .fetch_add(listing.file_count() as u64, Ordering::Relaxed);
        self.bytes_listed
            .fetch_add(listing.file_bytes(), Ordering::Relaxed);
    }
}

/// A worker thread that turns pending paths into listings
pub struct ListingWorker {
    /// Worker ID
    id: usize,

    /// Thread handle
    handle: Option<JoinHandle<()>>,

    /// Worker statistics
    stats: Arc<WorkerStats>,
}

impl ListingWorker {
    /// Spawn a new listing worker thread
    pub fn spawn(
        id: usize,
        lister: Arc<dyn ListDirectory>,
        queue: WorkerHandle,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, WorkerError> {
        let stats = Arc::new(WorkerStats::default());
        let stats_clone = Arc::clone(&stats);

        let handle = thread::Builder::new()
            .name(format!("lister-{}", id))
            .spawn(move || worker_loop(id, lister, queue, shutdown, stats_clone))
            .map_err(|e| WorkerError::SpawnFailed {
                id,
                reason: e.to_string(),
            })?;

        Ok(Self {
            id,
            handle: Some(handle),
            stats,
        })
    }

    /// Get worker ID
    pub fn id(&self) -> usize {
        self.id
    }

    /// Get worker statistics
    pub fn stats(&self) -> &WorkerStats {
        &self.stats
    }

    /// Wait for the worker to finish
    pub fn join(mut self) -> Result<(), WorkerError> {
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                return Err(WorkerError::Panicked {
                    id: self.id,
                    message: "listing thread panicked".into(),
                });
            }
        }
        Ok(())
    }
}

/// Main worker loop
fn worker_loop(
    id: usize,
    lister: Arc<dyn ListDirectory>,
    queue: WorkerHandle,
    shutdown: Arc<AtomicBool>,
    stats: Arc<WorkerStats>,
) {
    debug!(worker = id, "listing worker starting");

    while !shutdown.load(Ordering::Relaxed) {
        let (path, guard) = match queue.take_path(PATH_POLL) {
            PathPoll::Taken(path, guard) => (path, guard),
            PathPoll::Idle => continue,
            PathPoll::Closed => break,
        };

        let published = match lister.list_directory(&path) {
            Ok(listing) => {
                stats.record_listing(&listing);
                trace!(
                    worker = id,
                    path = %path,
                    dirs = listing.dirs.len(),
                    files = listing.files.len(),
                    "listed directory"
                );
                queue.publish(Ok(listing), guard)
            }
            Err(e) => {
                warn!(worker = id, path = %path, error = %e, "listing failed");
                queue.publish(
                    Err(WorkerError::ListingFailed {
                        id,
                        path,
                        source: e,
                    }),
                    guard,
                )
            }
        };

        // Driver hung up; the walk is over one way or the other.
        if !published {
            break;
        }
    }

    debug!(
        worker = id,
        dirs = stats.dirs_listed.load(Ordering::Relaxed),
        files = stats.files_listed.load(Ordering::Relaxed),
        "listing worker stopping"
    );
}

/// Aggregate statistics from multiple workers
pub fn aggregate_stats(workers: &[ListingWorker]) -> (u64, u64, u64) {
    let mut dirs = 0u64;
    let mut files = 0u64;
    let mut bytes = 0u64;

    for worker in workers {
        dirs += worker.stats.dirs_listed.load(Ordering::Relaxed);
        files += worker.stats.files_listed.load(Ordering::Relaxed);
        bytes += worker.stats.bytes_listed.load(Ordering::Relaxed);
    }

    (dirs, files, bytes)
}
