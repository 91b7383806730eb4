//! Error types for qumulo-crawler
//!
//! This module defines the error hierarchy that covers:
//! - Qumulo REST API errors (login, cluster discovery, directory listings)
//! - Redis dispatch queue errors
//! - Configuration and CLI errors
//! - Worker thread errors
//! - Metadata document errors
//!
//! Design philosophy:
//! - Use thiserror for structured error types in library code
//! - Errors should be actionable - include context about what to do
//! - Preserve error chains for debugging

use thiserror::Error;

/// Top-level error type for the qumulo-crawler application
#[derive(Error, Debug)]
pub enum CrawlerError {
    /// Qumulo REST API errors
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Dispatch queue errors
    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Worker/concurrency errors
    #[error("Worker error: {0}")]
    Worker(#[from] WorkerError),

    /// Metadata document errors
    #[error("Metadata error: {0}")]
    Meta(#[from] MetaError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Interrupted by signal
    #[error("Crawl interrupted by signal")]
    Interrupted,
}

/// Qumulo REST API errors
#[derive(Error, Debug)]
pub enum ApiError {
    /// HTTP transport or body-decode failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Login rejected by the cluster
    #[error("Authentication failed for user '{user}': {status}")]
    AuthenticationFailed { user: String, status: u16 },

    /// Non-success status on an API call
    #[error("API returned {status} for {url}")]
    Status { status: u16, url: String },

    /// Response body did not match the expected shape
    #[error("Unexpected response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// Cluster reported no reachable node addresses
    #[error("Cluster '{cluster}' reported no reachable node addresses")]
    NoAddresses { cluster: String },
}

impl ApiError {
    /// Check if this error aborts the run before traversal starts
    pub fn is_auth_failure(&self) -> bool {
        matches!(self, ApiError::AuthenticationFailed { .. })
    }
}

/// Dispatch queue errors
#[derive(Error, Debug)]
pub enum QueueError {
    /// Redis command failed
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Batch payload failed to serialize
    #[error("Batch serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Queue connection string rejected
    #[error("Invalid redis URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },
}

/// Configuration and CLI errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid worker count
    #[error("Invalid worker count {count}: must be between 1 and {max}")]
    InvalidWorkerCount { count: usize, max: usize },

    /// Invalid batch size
    #[error("Invalid batch size {size}: must be between {min} and {max}")]
    InvalidBatchSize { size: usize, min: usize, max: usize },

    /// Invalid exclude pattern
    #[error("Invalid exclude pattern '{pattern}': {reason}")]
    InvalidExcludePattern { pattern: String, reason: String },

    /// Root path must be absolute
    #[error("Invalid root path '{path}': must start with '/'")]
    InvalidRootPath { path: String },

    /// Min depth cannot exceed max depth
    #[error("Invalid depth range: min {min} exceeds max {max}")]
    InvalidDepthRange { min: usize, max: usize },

    /// Missing API credentials
    #[error("Missing API credentials: {reason}")]
    MissingCredentials { reason: String },
}

/// Worker thread errors
#[derive(Error, Debug)]
pub enum WorkerError {
    /// Listing a path failed; fails the run (no per-worker restart)
    #[error("Worker {id} failed to list '{path}': {source}")]
    ListingFailed {
        id: usize,
        path: String,
        source: ApiError,
    },

    /// Worker panicked
    #[error("Worker {id} panicked: {message}")]
    Panicked { id: usize, message: String },

    /// Worker initialization failed
    #[error("Failed to spawn worker {id}: {reason}")]
    SpawnFailed { id: usize, reason: String },

    /// Results channel closed while the driver still expected listings
    #[error("Listing-result channel closed unexpectedly")]
    ResultChannelClosed,
}

/// Metadata document errors
#[derive(Error, Debug)]
pub enum MetaError {
    /// Timestamp did not parse as seconds-precision naive time
    #[error("Invalid timestamp '{value}'")]
    InvalidTimestamp { value: String },

    /// Directory-times cache operation failed
    #[error("Directory-times cache error: {0}")]
    Cache(#[from] QueueError),

    /// Plugin contribution failed
    #[error("Plugin '{name}' failed: {reason}")]
    Plugin { name: String, reason: String },
}

/// Result type alias for CrawlerError
pub type Result<T> = std::result::Result<T, CrawlerError>;

/// Result type alias for ApiError
pub type ApiResult<T> = std::result::Result<T, ApiError>;

/// Result type alias for QueueError
pub type QueueResult<T> = std::result::Result<T, QueueError>;

/// Result type alias for ConfigError
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for MetaError
pub type MetaResult<T> = std::result::Result<T, MetaError>;
