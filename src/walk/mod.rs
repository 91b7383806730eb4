//! Parallel directory-tree walk
//!
//! The walk is a pull pipeline over two unbounded channels. A single driver
//! thread owns traversal order and recursion; a pool of listing workers
//! owns the REST calls. Workers never decide anything about the tree shape,
//! they only turn paths into listings.
//!
//! # Architecture
//!
//! ```text
//!                     ┌─────────────────────────┐
//!                     │        WalkDriver       │
//!                     │  - seeds the root       │
//!                     │  - consumes listings    │
//!                     │  - pushes child dirs    │
//!                     │  - detects settle       │
//!                     └───────────┬─────────────┘
//!                   pending paths │ listing results
//!       ┌─────────────────────────┼─────────────────────────┐
//!       │                         │                         │
//! ┌─────▼─────┐             ┌─────▼─────┐             ┌─────▼─────┐
//! │  Lister 1 │             │  Lister 2 │             │  Lister N │
//! │  REST API │             │  REST API │             │  REST API │
//! └───────────┘             └───────────┘             └───────────┘
//! ```
//!
//! Termination has no sentinel messages: the driver declares the walk done
//! when both channels are empty and no worker holds a listing in flight,
//! re-checked after a settle delay.

pub mod crawler;
pub mod driver;
pub mod queue;
pub mod worker;

pub use crawler::{CrawlProgress, CrawlStats, Crawler};
pub use driver::WalkDriver;
pub use queue::{walk_queues, DriverHandle, PathPoll, QueueDepths, QueueStats, WorkerHandle};
pub use worker::{ListingWorker, WorkerStats};
