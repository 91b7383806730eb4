//! The walk driver state machine
//!
//! The driver is the single consumer of listing-results and the only place
//! recursion and termination are decided. One call to `next` blocks until it
//! can hand the caller a listing, or until the walk is over:
//!
//! ```text
//!  SEEDED ──seed()──► DRAINING ──queues look empty──► SETTLING ──► DONE
//!                        ▲                               │
//!                        └────────result arrived─────────┘
//! ```
//!
//! For every listing that arrives, the driver pushes the listing's child
//! directories back onto pending-paths (skipping excluded paths and branches
//! at the depth limit) before handing the listing to the caller, so the
//! worker pool stays busy while the caller batches.
//!
//! Termination is a settle check, not a proof: when both queues are empty and
//! nothing is in flight, the driver waits half a second and re-checks before
//! declaring `DONE`. The in-flight counter closes the dequeue-to-publish
//! window the bare emptiness test would miss; the residual risk is the
//! non-atomic read of the three depths, which the delayed re-check covers.

use crate::api::DirListing;
use crate::config::CrawlConfig;
use crate::error::{CrawlerError, Result};
use crate::fspath;
use crate::walk::queue::{DriverHandle, QueueDepths};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

/// How long the driver waits for a result before re-evaluating the walk
const RESULT_POLL: Duration = Duration::from_millis(100);

/// Delay between the first and second settle check
const SETTLE_DELAY: Duration = Duration::from_millis(500);

/// Where the walk is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WalkState {
    /// Created; the root has not been pushed yet
    Seeded,

    /// Listings are flowing
    Draining,

    /// Queues looked empty at `since`; confirming before declaring done
    Settling { since: Instant },

    /// Settle check confirmed; no more listings will come
    Done,
}

/// Single-threaded owner of recursion and termination
pub struct WalkDriver {
    config: Arc<CrawlConfig>,
    queues: DriverHandle,
    shutdown: Arc<AtomicBool>,
    state: WalkState,
    root_separators: usize,
    dirs_walked: u64,
}

impl WalkDriver {
    /// Create a driver over the driver end of the walk queues
    pub fn new(config: Arc<CrawlConfig>, queues: DriverHandle, shutdown: Arc<AtomicBool>) -> Self {
        let root_separators = fspath::separator_count(&config.root);
        Self {
            config,
            queues,
            shutdown,
            state: WalkState::Seeded,
            root_separators,
            dirs_walked: 0,
        }
    }

    /// Push the root path onto pending-paths. Call once, before pumping.
    ///
    /// The root bypasses the exclusion filter so that a run whose root
    /// matches an exclusion pattern still produces one listing; the
    /// dispatcher drops it from batching and `recurse` stops its subtree.
    pub fn seed(&mut self) {
        debug!(root = %self.config.root, "seeding walk");
        self.queues.push_path(self.config.root.clone());
        self.state = WalkState::Draining;
    }

    /// Block until the next listing, the end of the walk, or a fault.
    ///
    /// Returns `Ok(Some(listing))` once per walked directory, with the
    /// listing's children already re-enqueued; `Ok(None)` exactly when the
    /// walk settles into `DONE`; `Err` on a worker fault or interrupt.
    pub fn next(&mut self) -> Result<Option<DirListing>> {
        loop {
            if self.shutdown.load(Ordering::Relaxed) {
                return Err(CrawlerError::Interrupted);
            }
            if self.state == WalkState::Done {
                return Ok(None);
            }

            if let Some(result) = self.queues.next_result(RESULT_POLL) {
                self.state = WalkState::Draining;
                let listing = result?;
                let pushed = self.recurse(&listing);
                self.dirs_walked += 1;
                trace!(
                    path = %listing.path(),
                    children_pushed = pushed,
                    walked = self.dirs_walked,
                    "listing consumed"
                );
                return Ok(Some(listing));
            }

            // Nothing arrived within the poll window; evaluate termination.
            match self.state {
                WalkState::Settling { since } => {
                    if !self.queues.is_settled() {
                        self.state = WalkState::Draining;
                    } else if since.elapsed() >= SETTLE_DELAY {
                        debug!(dirs = self.dirs_walked, "walk settled");
                        self.state = WalkState::Done;
                        return Ok(None);
                    }
                }
                WalkState::Seeded | WalkState::Draining => {
                    if self.queues.is_settled() {
                        self.state = WalkState::Settling {
                            since: Instant::now(),
                        };
                    }
                }
                WalkState::Done => {}
            }
        }
    }

    /// Push a listing's child directories onto pending-paths.
    ///
    /// An excluded listing (only the root seed can be one) pushes nothing,
    /// cutting off its whole subtree. A listing at or beyond the depth limit
    /// pushes nothing. Excluded children are filtered here so their listings
    /// are never requested at all.
    fn recurse(&self, listing: &DirListing) -> usize {
        if self.config.is_excluded(listing.path()) {
            return 0;
        }
        if let Some(max) = self.config.max_depth {
            if self.depth(listing.path()) >= max {
                return 0;
            }
        }

        let mut pushed = 0;
        for child in &listing.dirs {
            let child_path = fspath::join(listing.path(), child);
            if self.config.is_excluded(&child_path) {
                debug!(path = %child_path, "excluding directory from walk");
                continue;
            }
            self.queues.push_path(child_path);
            pushed += 1;
        }
        pushed
    }

    /// Separator count of `path` relative to the root
    pub fn depth(&self, path: &str) -> usize {
        fspath::separator_count(path).saturating_sub(self.root_separators)
    }

    /// Directories walked so far
    pub fn dirs_walked(&self) -> u64 {
        self.dirs_walked
    }

    /// True once the settle check has confirmed the walk is over
    pub fn is_done(&self) -> bool {
        self.state == WalkState::Done
    }

    /// Snapshot of current queue depths
    pub fn depths(&self) -> QueueDepths {
        self.queues.depths()
    }
}
