//! Batch dispatch onto the external work queue
//!
//! Listings consumed from the walk are grouped into batches and pushed to a
//! redis list that the downstream indexing bots pop from. The dispatcher
//! also reads the list's depth back after each push; adaptive mode uses it
//! to resize batches so the bots neither starve nor drown.

mod adaptive;
mod batch;
mod redis_queue;

pub use adaptive::AdaptiveBatch;
pub use batch::{Batch, BatchDispatcher, CrawlContext, DispatchStats};
pub use redis_queue::RedisDispatchQueue;

use crate::error::QueueResult;

/// A queue that accepts dispatched batches
pub trait DispatchQueue {
    /// Push one batch
    fn push(&mut self, batch: &Batch) -> QueueResult<()>;

    /// Number of batches currently waiting on the queue
    fn depth(&mut self) -> QueueResult<usize>;
}
