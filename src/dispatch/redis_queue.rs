//! Redis-backed dispatch queue
//!
//! Key layout under the configured prefix:
//! - `{prefix}:queue`    list of batch ids, RPUSHed in dispatch order
//! - `{prefix}:job:{id}` JSON batch payload, expiring key
//! - `{prefix}:stats`    hash of running counters for the whole queue
//!
//! Bots BLPOP an id off the list and fetch the payload by key. The payload
//! expiry is a safety net for ids that are popped and never processed; a
//! week is far beyond any realistic backlog.

use crate::dispatch::{Batch, DispatchQueue};
use crate::error::{QueueError, QueueResult};
use redis::{Client, Commands, Connection};
use tracing::debug;

/// Expiry on stored batch payloads
const PAYLOAD_TTL_SECS: u64 = 86_400 * 7;

/// Dispatch queue on a redis list
pub struct RedisDispatchQueue {
    connection: Connection,
    prefix: String,
    queue_key: String,
    stats_key: String,
}

impl RedisDispatchQueue {
    /// Connect to redis and bind the key namespace
    pub fn connect(url: &str, prefix: &str) -> QueueResult<Self> {
        let client = Client::open(url).map_err(|e| QueueError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let connection = client.get_connection()?;
        debug!(url, prefix, "connected to dispatch queue");
        Ok(Self {
            connection,
            prefix: prefix.to_string(),
            queue_key: format!("{prefix}:queue"),
            stats_key: format!("{prefix}:stats"),
        })
    }
}

impl DispatchQueue for RedisDispatchQueue {
    fn push(&mut self, batch: &Batch) -> QueueResult<()> {
        let payload = batch.to_json()?;
        let job_key = format!("{}:job:{}", self.prefix, batch.id);
        let files: usize = batch.listings.iter().map(|l| l.file_count()).sum();

        let _: () = self
            .connection
            .set_ex(&job_key, &payload, PAYLOAD_TTL_SECS)?;
        let _: () = self.connection.rpush(&self.queue_key, &batch.id)?;
        let _: () = self.connection.hincr(&self.stats_key, "batches", 1i64)?;
        let _: () = self
            .connection
            .hincr(&self.stats_key, "listings", batch.listings.len() as i64)?;
        let _: () = self.connection.hincr(&self.stats_key, "files", files as i64)?;
        Ok(())
    }

    fn depth(&mut self) -> QueueResult<usize> {
        let depth: usize = self.connection.llen(&self.queue_key)?;
        Ok(depth)
    }
}
