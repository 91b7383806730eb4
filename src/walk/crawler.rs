//! Crawl orchestration
//!
//! `Crawler::run` wires one crawl end to end: build the walk queues, spawn
//! the listing workers, seed the driver, then pump listings from the driver
//! into the batch dispatcher until the walk settles. The pump is the
//! single-threaded consumer loop; nothing downstream of the workers needs
//! locking.
//!
//! Completion handling:
//! - settled walk: flush the final partial batch, report `completed`
//! - interrupt: stop pumping, skip the flush, report a partial run
//! - worker or queue fault: surface the directories walked so far, then
//!   propagate the error; batches already dispatched stay valid on the queue

use crate::api::ListDirectory;
use crate::config::CrawlConfig;
use crate::dispatch::{BatchDispatcher, CrawlContext, DispatchQueue};
use crate::error::{CrawlerError, Result};
use crate::walk::driver::WalkDriver;
use crate::walk::queue::walk_queues;
use crate::walk::worker::{aggregate_stats, ListingWorker};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Result of a completed (or stopped) crawl
#[derive(Debug, Clone)]
pub struct CrawlStats {
    /// Directories walked (one listing each)
    pub dirs_walked: u64,

    /// Files seen across those listings
    pub files_seen: u64,

    /// Bytes across those files
    pub bytes_seen: u64,

    /// Batches dispatched to the external queue
    pub batches_dispatched: u64,

    /// Wall time of the crawl
    pub duration: Duration,

    /// Whether the walk settled (vs was interrupted)
    pub completed: bool,
}

impl CrawlStats {
    /// Directories walked per second over the whole run
    pub fn dirs_per_second(&self) -> f64 {
        let secs = self.duration.as_secs_f64();
        if secs > 0.0 {
            self.dirs_walked as f64 / secs
        } else {
            0.0
        }
    }
}

/// Live snapshot handed to the progress callback after each listing
#[derive(Debug, Clone)]
pub struct CrawlProgress {
    /// Directories walked so far
    pub dirs: u64,

    /// Files seen so far
    pub files: u64,

    /// Bytes seen so far
    pub bytes: u64,

    /// Batches dispatched so far
    pub batches: u64,

    /// External queue depth as of the last dispatch
    pub queue_depth: usize,

    /// Paths waiting to be listed
    pub pending: usize,

    /// Listings currently in flight inside workers
    pub in_flight: usize,

    /// Elapsed wall time
    pub elapsed: Duration,
}

/// Runs one crawl over a cluster tree
pub struct Crawler {
    config: Arc<CrawlConfig>,
    shutdown: Arc<AtomicBool>,
}

impl Crawler {
    /// Create a crawler for the given configuration
    pub fn new(config: CrawlConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Get a clone of the shutdown flag (for signal handlers)
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.shutdown)
    }

    /// Run the crawl to completion, interruption, or fault.
    ///
    /// `on_progress` is called once per consumed listing; it must not block.
    pub fn run<Q, F>(
        self,
        lister: Arc<dyn ListDirectory>,
        queue: Q,
        mut on_progress: F,
    ) -> Result<CrawlStats>
    where
        Q: DispatchQueue,
        F: FnMut(&CrawlProgress),
    {
        let start = Instant::now();
        let context = CrawlContext::new(&self.config);
        info!(
            run_id = %context.run_id,
            root = %self.config.root,
            workers = self.config.worker_count,
            "starting crawl"
        );

        let (driver_queues, worker_queues) = walk_queues();

        let mut workers = Vec::with_capacity(self.config.worker_count);
        for id in 0..self.config.worker_count {
            workers.push(ListingWorker::spawn(
                id,
                Arc::clone(&lister),
                worker_queues.clone(),
                Arc::clone(&self.shutdown),
            )?);
        }
        drop(worker_queues);
        debug!(count = workers.len(), "listing workers spawned");

        let mut driver = WalkDriver::new(
            Arc::clone(&self.config),
            driver_queues,
            Arc::clone(&self.shutdown),
        );
        driver.seed();
        let mut dispatcher = BatchDispatcher::new(Arc::clone(&self.config), queue, context);

        let mut failure: Option<CrawlerError> = None;
        let mut completed = loop {
            match driver.next() {
                Ok(Some(listing)) => {
                    if let Err(e) = dispatcher.process(listing) {
                        failure = Some(e);
                        break false;
                    }
                    on_progress(&snapshot(&driver, &dispatcher, start));
                }
                Ok(None) => break true,
                Err(CrawlerError::Interrupted) => {
                    warn!("interrupt received, stopping crawl");
                    break false;
                }
                Err(e) => {
                    failure = Some(e);
                    break false;
                }
            }
        };

        if completed {
            if let Err(e) = dispatcher.finish() {
                failure = Some(e);
                completed = false;
            }
        }

        // Tear the pool down: the flag stops busy workers, dropping the
        // driver closes pending-paths for idle ones.
        self.shutdown.store(true, Ordering::SeqCst);
        let dirs_walked = driver.dirs_walked();
        let (dirs_listed, files_listed, bytes_listed) = aggregate_stats(&workers);
        drop(driver);
        for worker in workers {
            if let Err(e) = worker.join() {
                warn!(error = %e, "worker failed to join cleanly");
            }
        }
        debug!(
            dirs = dirs_listed,
            files = files_listed,
            bytes = bytes_listed,
            "worker pool drained"
        );

        let duration = start.elapsed();
        if let Some(e) = failure {
            error!(
                dirs = dirs_walked,
                elapsed_secs = duration.as_secs(),
                error = %e,
                "crawl failed; dispatched batches remain on the queue"
            );
            return Err(e);
        }

        let dstats = dispatcher.stats();
        info!(
            dirs = dirs_walked,
            files = dstats.files,
            batches = dstats.batches,
            elapsed_secs = duration.as_secs(),
            completed = completed,
            "crawl finished"
        );

        Ok(CrawlStats {
            dirs_walked,
            files_seen: dstats.files,
            bytes_seen: dstats.bytes,
            batches_dispatched: dstats.batches,
            duration,
            completed,
        })
    }
}

fn snapshot<Q: DispatchQueue>(
    driver: &WalkDriver,
    dispatcher: &BatchDispatcher<Q>,
    start: Instant,
) -> CrawlProgress {
    let depths = driver.depths();
    let dstats = dispatcher.stats();
    CrawlProgress {
        dirs: driver.dirs_walked(),
        files: dstats.files,
        bytes: dstats.bytes,
        batches: dstats.batches,
        queue_depth: dstats.queue_depth,
        pending: depths.pending,
        in_flight: depths.in_flight,
        elapsed: start.elapsed(),
    }
}
