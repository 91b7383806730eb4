//! Batch envelope and the dispatcher that fills it
//!
//! A `Batch` is the wire unit the indexing bots consume: a uuid, the crawl
//! context it belongs to, and up to `batch_size` directory listings. The
//! `BatchDispatcher` sits between the walk driver and the queue, applying
//! the batching filters (exclusion, empty-dir skip, depth window) before a
//! listing is admitted.
//!
//! The final partial batch is flushed by `finish()`, and only when it is
//! non-empty; consumers never see a batch with zero listings.

use crate::api::DirListing;
use crate::config::CrawlConfig;
use crate::dispatch::adaptive::AdaptiveBatch;
use crate::dispatch::DispatchQueue;
use crate::error::{QueueResult, Result};
use crate::fspath;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, trace};
use uuid::Uuid;

/// Identity of one crawl run, stamped into every batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlContext {
    /// Unique id of this run
    pub run_id: String,

    /// Producing process, as `<hostname>.<pid>`
    pub worker: String,

    /// Root path the run walks
    pub root: String,

    /// When the run started
    pub started_at: DateTime<Utc>,
}

impl CrawlContext {
    /// Create a context for a new run
    pub fn new(config: &CrawlConfig) -> Self {
        Self {
            run_id: Uuid::new_v4().to_string(),
            worker: config.worker_name.clone(),
            root: config.root.clone(),
            started_at: Utc::now(),
        }
    }
}

/// One unit of dispatched work
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Batch {
    /// Unique batch id; also the payload key suffix on the queue
    pub id: String,

    /// Run this batch belongs to
    pub context: CrawlContext,

    /// How long the bots should keep results for this batch, in seconds
    pub result_ttl_secs: u64,

    /// The listings to index
    pub listings: Vec<DirListing>,
}

impl Batch {
    /// Create a batch with a fresh id
    pub fn new(context: CrawlContext, result_ttl_secs: u64, listings: Vec<DirListing>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            context,
            result_ttl_secs,
            listings,
        }
    }

    /// Serialize to the queue's JSON payload form
    pub fn to_json(&self) -> QueueResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize from the queue's JSON payload form
    pub fn from_json(json: &str) -> QueueResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Counters kept by the dispatcher across one run
#[derive(Debug, Clone, Copy, Default)]
pub struct DispatchStats {
    /// Listings offered to the dispatcher (excluded ones not counted)
    pub listings: u64,

    /// Listings admitted into batches
    pub batched: u64,

    /// Files across offered listings
    pub files: u64,

    /// Bytes across offered listings
    pub bytes: u64,

    /// Batches pushed to the queue
    pub batches: u64,

    /// Listings dropped for having no children
    pub skipped_empty: u64,

    /// Listings dropped for sitting above the minimum depth
    pub skipped_shallow: u64,

    /// Listings dropped by an exclusion pattern
    pub excluded: u64,

    /// Queue depth observed after the most recent push
    pub queue_depth: usize,
}

/// Groups listings into batches and pushes them to the queue
pub struct BatchDispatcher<Q: DispatchQueue> {
    config: Arc<CrawlConfig>,
    queue: Q,
    context: CrawlContext,
    pending: Vec<DirListing>,
    batch_size: usize,
    adaptive: Option<AdaptiveBatch>,
    files_accrued: u64,
    root_separators: usize,
    stats: DispatchStats,
}

impl<Q: DispatchQueue> BatchDispatcher<Q> {
    /// Create a dispatcher for one run
    pub fn new(config: Arc<CrawlConfig>, queue: Q, context: CrawlContext) -> Self {
        let batch_size = config.batch_size;
        let adaptive = config
            .adaptive_batch
            .then(|| AdaptiveBatch::new(batch_size));
        let root_separators = fspath::separator_count(&config.root);
        Self {
            config,
            queue,
            context,
            pending: Vec::with_capacity(batch_size),
            batch_size,
            adaptive,
            files_accrued: 0,
            root_separators,
            stats: DispatchStats::default(),
        }
    }

    /// Offer one listing; dispatches when the current batch fills up.
    ///
    /// Max-depth listings have their child lists cleared before batching so
    /// the bots never index entries the walk did not descend into.
    pub fn process(&mut self, mut listing: DirListing) -> Result<()> {
        if self.config.is_excluded(listing.path()) {
            trace!(path = %listing.path(), "listing excluded from batching");
            self.stats.excluded += 1;
            return Ok(());
        }

        self.stats.listings += 1;
        self.stats.files += listing.file_count() as u64;
        self.stats.bytes += listing.file_bytes();
        self.files_accrued += listing.file_count() as u64;

        let depth = self.depth(listing.path());
        let was_empty = listing.is_empty();
        if let Some(max) = self.config.max_depth {
            if depth >= max {
                listing.clear_children();
            }
        }

        if was_empty && !self.config.index_empty_dirs {
            trace!(path = %listing.path(), "empty directory skipped");
            self.stats.skipped_empty += 1;
            return Ok(());
        }
        if depth < self.config.min_depth {
            trace!(path = %listing.path(), depth, "listing above minimum depth");
            self.stats.skipped_shallow += 1;
            return Ok(());
        }

        self.pending.push(listing);
        self.stats.batched += 1;

        let over_ceiling =
            self.adaptive.is_some() && self.files_accrued >= self.config.max_batch_files;
        if self.pending.len() >= self.batch_size || over_ceiling {
            self.dispatch()?;
        }
        Ok(())
    }

    /// Flush the final partial batch, if any
    pub fn finish(&mut self) -> Result<()> {
        if !self.pending.is_empty() {
            self.dispatch()?;
        }
        Ok(())
    }

    /// Snapshot of the dispatcher's counters
    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    fn dispatch(&mut self) -> Result<()> {
        let listings = std::mem::take(&mut self.pending);
        let batch = Batch::new(
            self.context.clone(),
            self.config.result_ttl_secs,
            listings,
        );
        debug!(
            batch = %batch.id,
            listings = batch.listings.len(),
            "dispatching batch"
        );
        self.queue.push(&batch)?;
        self.stats.batches += 1;

        let depth = self.queue.depth()?;
        self.stats.queue_depth = depth;
        if let Some(adaptive) = self.adaptive.as_mut() {
            self.batch_size = adaptive.resize(depth);
        }
        Ok(())
    }

    fn depth(&self, path: &str) -> usize {
        fspath::separator_count(path).saturating_sub(self.root_separators)
    }
}
