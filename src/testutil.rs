//! Shared test fixtures
//!
//! In-memory stand-ins for the three external systems the crawler touches:
//! the cluster API (`FakeTree`), the redis dispatch queue (`MemoryQueue`),
//! and the redis dir-times cache (`MemoryDirTimes`). All state is behind
//! mutexes so fixtures can cross the thread boundary the real walk has.

use crate::api::{DirListing, EntryAttributes, ListDirectory};
use crate::config::{CliArgs, CrawlConfig};
use crate::dispatch::{Batch, DispatchQueue};
use crate::error::{ApiError, ApiResult, QueueResult};
use crate::meta::DirTimesCache;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Attributes for a path with fixed timestamps
pub fn attrs(path: &str, size: u64) -> EntryAttributes {
    EntryAttributes {
        id: format!("id-{}", path.len()),
        name: path.rsplit('/').next().unwrap_or("").to_string(),
        path: path.to_string(),
        size,
        owner: "500".to_string(),
        group: "500".to_string(),
        creation_time: "2024-03-01T08:00:00".to_string(),
        modification_time: "2024-03-02T09:30:00".to_string(),
        change_time: "2024-03-02T09:45:00".to_string(),
        num_links: 1,
    }
}

/// Listing for `path` with child directory paths and `(name, size)` files
pub fn listing(path: &str, dirs: &[&str], files: &[(&str, u64)]) -> DirListing {
    DirListing {
        attrs: attrs(path, 0),
        dirs: dirs.iter().map(|d| d.to_string()).collect(),
        files: files
            .iter()
            .map(|(name, size)| {
                let file_path = if path == "/" {
                    format!("/{name}")
                } else {
                    format!("{path}/{name}")
                };
                attrs(&file_path, *size)
            })
            .collect(),
    }
}

/// CLI arguments a test can adjust before validation
pub fn test_args() -> CliArgs {
    CliArgs {
        root: "/data".to_string(),
        host: "qumulo.test".to_string(),
        port: 8000,
        username: "admin".to_string(),
        password: "secret".to_string(),
        workers: 2,
        batch_size: 50,
        adaptive_batch: false,
        max_batch_files: 50_000,
        min_depth: 0,
        max_depth: None,
        index_empty_dirs: false,
        exclude_patterns: vec![],
        exclude_file_patterns: vec![],
        min_size: 0,
        min_mtime_days: 0,
        redis_url: "redis://127.0.0.1:6379/".to_string(),
        queue_prefix: "qumulo_crawler".to_string(),
        result_ttl: 604_800,
        cache_dir_times: false,
        dir_times_ttl: 604_800,
        request_timeout: None,
        quiet: true,
        verbose: false,
    }
}

/// Validated configuration from `test_args`
pub fn test_config() -> CrawlConfig {
    CrawlConfig::from_args(test_args()).expect("test args must validate")
}

/// Scripted directory tree answering list calls from memory.
///
/// Unknown paths fail the way a bad API call would, and every requested
/// path is recorded so tests can assert what the walk asked for.
pub struct FakeTree {
    listings: HashMap<String, DirListing>,
    requested: Mutex<Vec<String>>,
}

impl FakeTree {
    pub fn new() -> Self {
        Self {
            listings: HashMap::new(),
            requested: Mutex::new(Vec::new()),
        }
    }

    /// Script one listing
    pub fn with(mut self, listing: DirListing) -> Self {
        self.listings.insert(listing.path().to_string(), listing);
        self
    }

    /// Paths requested so far, in request order
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl ListDirectory for FakeTree {
    fn list_directory(&self, path: &str) -> ApiResult<DirListing> {
        self.requested.lock().unwrap().push(path.to_string());
        self.listings
            .get(path)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                url: format!("https://qumulo.test:8000/v1/files/{path}/entries/"),
            })
    }
}

#[derive(Default)]
struct MemoryQueueState {
    batches: Vec<Batch>,
    depth: usize,
}

/// Dispatch queue collecting batches in memory.
///
/// Clones share state, so a test can hand one clone to the dispatcher and
/// inspect pushes through another. The reported depth is fixed by
/// `set_depth` rather than derived from pushes, letting tests steer the
/// adaptive sizing.
#[derive(Clone, Default)]
pub struct MemoryQueue {
    state: Arc<Mutex<MemoryQueueState>>,
}

impl MemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fix the depth reported to the dispatcher
    pub fn set_depth(&self, depth: usize) {
        self.state.lock().unwrap().depth = depth;
    }

    /// Snapshot of pushed batches in dispatch order
    pub fn batches(&self) -> Vec<Batch> {
        self.state.lock().unwrap().batches.clone()
    }
}

impl DispatchQueue for MemoryQueue {
    fn push(&mut self, batch: &Batch) -> QueueResult<()> {
        self.state.lock().unwrap().batches.push(batch.clone());
        Ok(())
    }

    fn depth(&mut self) -> QueueResult<usize> {
        Ok(self.state.lock().unwrap().depth)
    }
}

/// Dir-times cache in a plain map
#[derive(Default)]
pub struct MemoryDirTimes {
    entries: HashMap<String, i64>,
}

impl MemoryDirTimes {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DirTimesCache for MemoryDirTimes {
    fn get(&mut self, path: &str) -> QueueResult<Option<i64>> {
        Ok(self.entries.get(path).copied())
    }

    fn put(&mut self, path: &str, fingerprint: i64) -> QueueResult<()> {
        self.entries.insert(path.to_string(), fingerprint);
        Ok(())
    }
}
