//! Configuration types for qumulo-crawler
//!
//! This module defines:
//! - CLI argument parsing using clap derive macros
//! - Runtime configuration with validation
//! - Exclusion predicates for directories and file names

use crate::error::{ConfigError, ConfigResult};
use crate::fspath;
use clap::Parser;
use regex::Regex;
use std::time::Duration;

/// Maximum reasonable worker count
const MAX_WORKERS: usize = 512;

/// Batch size limits (listings per dispatched batch)
const MIN_BATCH_SIZE: usize = 1;
const MAX_BATCH_SIZE: usize = 10_000;

/// Connection-pool floor; the original ran a fixed pool of 100
const MIN_POOL_SIZE: usize = 100;

/// Parallel Qumulo REST crawler feeding a redis work queue
#[derive(Parser, Debug, Clone)]
#[command(
    name = "qumulo-crawler",
    version,
    about = "Parallel Qumulo REST crawler feeding a redis work queue",
    long_about = "Walks a Qumulo cluster's directory tree over its REST API using a pool of\n\
                  listing workers, then batches the listings onto a redis queue for the\n\
                  downstream indexing bots.\n\n\
                  Termination is detected by a settle check over the two walk queues plus an\n\
                  in-flight request counter; no coordinator process is needed.",
    after_help = "EXAMPLES:\n    \
        qumulo-crawler --host qumulo.example.com --user admin --password secret /\n    \
        qumulo-crawler --host 10.1.0.20 --user ro --password p /projects -w 16 -b 100\n    \
        qumulo-crawler --host q --user u --password p / --adaptive --exclude '\\.snapshot'\n    \
        qumulo-crawler --host q --user u --password p / --max-depth 4 --cache-dir-times"
)]
pub struct CliArgs {
    /// Root directory on the cluster to start crawling from
    #[arg(value_name = "ROOT_PATH", default_value = "/")]
    pub root: String,

    /// Qumulo cluster hostname or address
    #[arg(long, value_name = "HOST")]
    pub host: String,

    /// Qumulo REST API port
    #[arg(long, default_value = "8000", value_name = "PORT")]
    pub port: u16,

    /// API user name
    #[arg(long = "user", value_name = "NAME")]
    pub username: String,

    /// API password
    #[arg(long, value_name = "PASSWORD")]
    pub password: String,

    /// Number of listing worker threads
    #[arg(
        short = 'w',
        long,
        default_value_t = default_workers(),
        value_name = "NUM"
    )]
    pub workers: usize,

    /// Directory listings per dispatched batch
    #[arg(short = 'b', long, default_value = "50", value_name = "NUM")]
    pub batch_size: usize,

    /// Adapt batch size to queue depth after each dispatch
    #[arg(long = "adaptive")]
    pub adaptive_batch: bool,

    /// Cumulative file-count ceiling forcing a dispatch (adaptive mode)
    #[arg(long, default_value = "50000", value_name = "COUNT")]
    pub max_batch_files: u64,

    /// Minimum directory depth to include in batches
    #[arg(long, default_value = "0", value_name = "NUM")]
    pub min_depth: usize,

    /// Maximum directory depth (unlimited if not set)
    #[arg(short = 'd', long, value_name = "NUM")]
    pub max_depth: Option<usize>,

    /// Include directories with no children in batches
    #[arg(long)]
    pub index_empty_dirs: bool,

    /// Exclude directories matching pattern (can be repeated)
    #[arg(long = "exclude", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_patterns: Vec<String>,

    /// Exclude file names matching pattern (can be repeated)
    #[arg(long = "exclude-file", value_name = "PATTERN", action = clap::ArgAction::Append)]
    pub exclude_file_patterns: Vec<String>,

    /// Skip files smaller than this many bytes
    #[arg(long, default_value = "0", value_name = "BYTES")]
    pub min_size: u64,

    /// Skip files modified more recently than this many days ago
    #[arg(long = "mtime", default_value = "0", value_name = "DAYS")]
    pub min_mtime_days: u64,

    /// Redis connection URL for the dispatch queue
    #[arg(long, default_value = "redis://127.0.0.1:6379/", value_name = "URL")]
    pub redis_url: String,

    /// Key prefix for dispatch queue entries
    #[arg(long, default_value = "qumulo_crawler", value_name = "PREFIX")]
    pub queue_prefix: String,

    /// Result expiry carried on each dispatched batch, in seconds
    #[arg(long, default_value = "604800", value_name = "SECS")]
    pub result_ttl: u64,

    /// Cache directory mtimes+ctimes in redis to skip unchanged dirs on re-runs
    #[arg(long)]
    pub cache_dir_times: bool,

    /// Expiry for cached directory times, in seconds
    #[arg(long, default_value = "604800", value_name = "SECS")]
    pub dir_times_ttl: u64,

    /// Per-request timeout in seconds (no timeout if not set)
    #[arg(long, value_name = "SECS")]
    pub request_timeout: Option<u64>,

    /// Quiet mode - suppress progress output
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Verbose output (debug logging; disables the progress spinner)
    #[arg(short = 'v', long)]
    pub verbose: bool,
}

fn default_workers() -> usize {
    // Listing calls are network bound, so oversubscribe the cores
    num_cpus::get() * 2
}

/// Name stamped into run context and metadata documents
pub fn worker_name() -> String {
    let host = hostname::get()
        .ok()
        .and_then(|h| h.into_string().ok())
        .unwrap_or_else(|| "localhost".to_string());
    format!("{}.{}", host, std::process::id())
}

/// Validated runtime configuration
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Cluster hostname or address
    pub host: String,

    /// REST API port
    pub port: u16,

    /// API user name
    pub username: String,

    /// API password
    pub password: String,

    /// Normalized root path to crawl
    pub root: String,

    /// Number of listing worker threads
    pub worker_count: usize,

    /// Listings per dispatched batch
    pub batch_size: usize,

    /// Adaptive batch sizing enabled
    pub adaptive_batch: bool,

    /// Cumulative file-count ceiling (adaptive mode)
    pub max_batch_files: u64,

    /// Minimum depth for batching (shallower listings still recurse)
    pub min_depth: usize,

    /// Maximum traversal depth
    pub max_depth: Option<usize>,

    /// Batch directories with no children
    pub index_empty_dirs: bool,

    /// Compiled directory exclusion patterns
    pub exclude_patterns: Vec<Regex>,

    /// Compiled file-name exclusion patterns
    pub exclude_file_patterns: Vec<Regex>,

    /// Minimum file size for metadata documents
    pub min_size: u64,

    /// Minimum file age in days for metadata documents
    pub min_mtime_days: u64,

    /// Redis URL for the dispatch queue
    pub redis_url: String,

    /// Key prefix for dispatch queue entries
    pub queue_prefix: String,

    /// Result expiry carried on each batch
    pub result_ttl_secs: u64,

    /// Directory-times caching enabled
    pub cache_dir_times: bool,

    /// Expiry for cached directory times
    pub dir_times_ttl_secs: u64,

    /// Optional per-request timeout
    pub request_timeout: Option<Duration>,

    /// Show progress spinner
    pub show_progress: bool,

    /// Verbose logging
    pub verbose: bool,

    /// Worker name stamped into run context and documents
    pub worker_name: String,
}

impl CrawlConfig {
    /// Create and validate configuration from CLI arguments
    pub fn from_args(args: CliArgs) -> ConfigResult<Self> {
        if !args.root.starts_with('/') {
            return Err(ConfigError::InvalidRootPath { path: args.root });
        }

        if args.username.trim().is_empty() || args.password.is_empty() {
            return Err(ConfigError::MissingCredentials {
                reason: "user and password are required".to_string(),
            });
        }

        if args.workers == 0 || args.workers > MAX_WORKERS {
            return Err(ConfigError::InvalidWorkerCount {
                count: args.workers,
                max: MAX_WORKERS,
            });
        }

        if args.batch_size < MIN_BATCH_SIZE || args.batch_size > MAX_BATCH_SIZE {
            return Err(ConfigError::InvalidBatchSize {
                size: args.batch_size,
                min: MIN_BATCH_SIZE,
                max: MAX_BATCH_SIZE,
            });
        }

        if let Some(max) = args.max_depth {
            if args.min_depth > max {
                return Err(ConfigError::InvalidDepthRange {
                    min: args.min_depth,
                    max,
                });
            }
        }

        let exclude_patterns = compile_patterns(&args.exclude_patterns)?;
        let exclude_file_patterns = compile_patterns(&args.exclude_file_patterns)?;

        Ok(Self {
            host: args.host,
            port: args.port,
            username: args.username,
            password: args.password,
            root: fspath::normalize(&args.root),
            worker_count: args.workers,
            batch_size: args.batch_size,
            adaptive_batch: args.adaptive_batch,
            max_batch_files: args.max_batch_files,
            min_depth: args.min_depth,
            max_depth: args.max_depth,
            index_empty_dirs: args.index_empty_dirs,
            exclude_patterns,
            exclude_file_patterns,
            min_size: args.min_size,
            min_mtime_days: args.min_mtime_days,
            redis_url: args.redis_url,
            queue_prefix: args.queue_prefix,
            result_ttl_secs: args.result_ttl,
            cache_dir_times: args.cache_dir_times,
            dir_times_ttl_secs: args.dir_times_ttl,
            request_timeout: args.request_timeout.map(Duration::from_secs),
            show_progress: !args.quiet && !args.verbose,
            verbose: args.verbose,
            worker_name: worker_name(),
        })
    }

    /// Check if a directory path should be excluded from the walk
    pub fn is_excluded(&self, path: &str) -> bool {
        self.exclude_patterns.iter().any(|re| re.is_match(path))
    }

    /// Check if a file name should be excluded from metadata documents
    pub fn is_file_excluded(&self, name: &str) -> bool {
        self.exclude_file_patterns.iter().any(|re| re.is_match(name))
    }

    /// HTTP connection pool size; must exceed the worker count
    pub fn pool_size(&self) -> usize {
        (self.worker_count * 2).max(MIN_POOL_SIZE)
    }
}

fn compile_patterns(patterns: &[String]) -> ConfigResult<Vec<Regex>> {
    patterns
        .iter()
        .map(|p| {
            Regex::new(p).map_err(|e| ConfigError::InvalidExcludePattern {
                pattern: p.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_args() -> CliArgs {
        CliArgs {
            root: "/data/".to_string(),
            host: "qumulo.example.com".to_string(),
            port: 8000,
            username: "admin".to_string(),
            password: "secret".to_string(),
            workers: 8,
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
            quiet: false,
            verbose: false,
        }
    }

    #[test]
    fn test_valid_config() {
        let config = CrawlConfig::from_args(base_args()).unwrap();
        assert_eq!(config.root, "/data");
        assert_eq!(config.worker_count, 8);
        assert!(config.show_progress);
    }

    #[test]
    fn test_invalid_worker_count() {
        let mut args = base_args();
        args.workers = 0;
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));

        let mut args = base_args();
        args.workers = 10_000;
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidWorkerCount { .. })
        ));
    }

    #[test]
    fn test_invalid_batch_size() {
        let mut args = base_args();
        args.batch_size = 0;
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidBatchSize { .. })
        ));
    }

    #[test]
    fn test_relative_root_rejected() {
        let mut args = base_args();
        args.root = "data".to_string();
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidRootPath { .. })
        ));
    }

    #[test]
    fn test_depth_range_validation() {
        let mut args = base_args();
        args.min_depth = 5;
        args.max_depth = Some(2);
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidDepthRange { .. })
        ));
    }

    #[test]
    fn test_bad_exclude_pattern() {
        let mut args = base_args();
        args.exclude_patterns = vec!["[unclosed".to_string()];
        assert!(matches!(
            CrawlConfig::from_args(args),
            Err(ConfigError::InvalidExcludePattern { .. })
        ));
    }

    #[test]
    fn test_exclusion_predicates() {
        let mut args = base_args();
        args.exclude_patterns = vec![r"\.snapshot".to_string()];
        args.exclude_file_patterns = vec![r"^Thumbs\.db$".to_string()];
        let config = CrawlConfig::from_args(args).unwrap();

        assert!(config.is_excluded("/data/.snapshot/hourly.0"));
        assert!(!config.is_excluded("/data/projects"));
        assert!(config.is_file_excluded("Thumbs.db"));
        assert!(!config.is_file_excluded("report.pdf"));
    }

    #[test]
    fn test_pool_size_floor() {
        let config = CrawlConfig::from_args(base_args()).unwrap();
        assert_eq!(config.pool_size(), 100);

        let mut args = base_args();
        args.workers = 128;
        let config = CrawlConfig::from_args(args).unwrap();
        assert_eq!(config.pool_size(), 256);
    }
}
