//! qumulo-crawler - Parallel Qumulo REST crawler
//!
//! Walks a Qumulo cluster's directory tree over its REST API with a pool
//! of listing workers, batches the listings, and pushes the batches onto a
//! redis queue for downstream indexing bots.
//!
//! # Features
//!
//! - **REST-only traversal**: No mounts; directories are listed through the
//!   cluster's `/v1/files` entries endpoint over a pooled HTTPS session.
//!
//! - **Parallel listing**: A fixed pool of worker threads keeps many
//!   listing requests in flight while a single driver owns traversal order
//!   and recursion.
//!
//! - **Settle-based termination**: The walk ends when both internal queues
//!   are empty and no request is in flight, re-checked after a delay; no
//!   sentinel messages or coordinator process.
//!
//! - **Adaptive batching**: Batch size can track the external queue's
//!   depth so the indexing bots neither starve nor drown.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                        Qumulo Cluster                           │
//! │                     (REST API, port 8000)                       │
//! └─────────────────────────────┬───────────────────────────────────┘
//!                               │
//!                               │ GET /v1/files/.../entries/
//!                               ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                       Listing Workers                           │
//! │   ┌──────────┐  ┌──────────┐  ┌──────────┐    ┌──────────┐     │
//! │   │ Lister 1 │  │ Lister 2 │  │ Lister 3 │ .. │ Lister N │     │
//! │   └────┬─────┘  └────┬─────┘  └────┬─────┘    └────┬─────┘     │
//! │        │             │             │               │            │
//! │        └─────────────┴──────┬──────┴───────────────┘            │
//! │                             │ listings                          │
//! │                             ▼                                   │
//! │               ┌──────────────────────────┐                      │
//! │               │        WalkDriver        │                      │
//! │               │  - recursion + settle    │                      │
//! │               └────────────┬─────────────┘                      │
//! │                            │                                    │
//! │                            ▼                                    │
//! │               ┌──────────────────────────┐                      │
//! │               │      BatchDispatcher     │                      │
//! │               │  - filters + batching    │                      │
//! │               └────────────┬─────────────┘                      │
//! └────────────────────────────┼────────────────────────────────────┘
//!                              │ RPUSH batch ids
//!                              ▼
//!                   ┌──────────────────┐
//!                   │   redis queue    │
//!                   │  (indexing bots) │
//!                   └──────────────────┘
//! ```
//!
//! # Example
//!
//! ```bash
//! # Crawl a whole cluster
//! qumulo-crawler --host qumulo.example.com --user admin --password s3cret /
//!
//! # Crawl one share with more workers and adaptive batching
//! qumulo-crawler --host 10.1.0.20 --user ro --password p /projects -w 16 --adaptive
//! ```

pub mod api;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod fspath;
pub mod meta;
pub mod progress;
pub mod walk;

#[cfg(test)]
mod testutil;

pub use config::{CliArgs, CrawlConfig};
pub use dispatch::{Batch, BatchDispatcher, CrawlContext, DispatchQueue, RedisDispatchQueue};
pub use error::{CrawlerError, Result};
pub use meta::{MetaBuilder, PluginRegistry};
pub use walk::{CrawlProgress, CrawlStats, Crawler};
