//! Caches used while shaping metadata documents
//!
//! Two concerns live here. The identity cache memoizes owner and group
//! resolution per raw identity value. The dir-times cache remembers each
//! directory's mtime+ctime fingerprint between runs so unchanged
//! directories can be skipped on a re-crawl.

use crate::error::{QueueError, QueueResult};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use redis::{Client, Commands, Connection};
use std::collections::HashMap;
use tracing::debug;

/// Memoized owner/group resolution.
///
/// The cluster reports identities as auth values; today they pass through
/// unchanged, but every resolution goes through here so a directory-service
/// lookup can be added without touching the builders.
#[derive(Debug, Default)]
pub struct IdentityCache {
    owners: HashMap<String, String>,
    groups: HashMap<String, String>,
}

impl IdentityCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve an owner identity value
    pub fn resolve_owner(&mut self, raw: &str) -> String {
        self.owners
            .entry(raw.to_string())
            .or_insert_with(|| raw.to_string())
            .clone()
    }

    /// Resolve a group identity value
    pub fn resolve_group(&mut self, raw: &str) -> String {
        self.groups
            .entry(raw.to_string())
            .or_insert_with(|| raw.to_string())
            .clone()
    }
}

/// Per-directory change fingerprints surviving between runs
pub trait DirTimesCache {
    /// Fetch the stored fingerprint for a path, if any
    fn get(&mut self, path: &str) -> QueueResult<Option<i64>>;

    /// Store a path's fingerprint
    fn put(&mut self, path: &str, fingerprint: i64) -> QueueResult<()>;
}

/// Dir-times cache in redis.
///
/// Keys are the base64 of the raw path so any byte sequence a path can
/// contain stays a single flat key. Values are the decimal fingerprint.
pub struct RedisDirTimes {
    connection: Connection,
    ttl_secs: u64,
}

impl RedisDirTimes {
    /// Connect to redis; entries expire after `ttl_secs`
    pub fn connect(url: &str, ttl_secs: u64) -> QueueResult<Self> {
        let client = Client::open(url).map_err(|e| QueueError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        let connection = client.get_connection()?;
        debug!(url, ttl_secs, "connected to dir-times cache");
        Ok(Self {
            connection,
            ttl_secs,
        })
    }

    fn key(path: &str) -> String {
        STANDARD.encode(path)
    }
}

impl DirTimesCache for RedisDirTimes {
    fn get(&mut self, path: &str) -> QueueResult<Option<i64>> {
        let stored: Option<String> = self.connection.get(Self::key(path))?;
        match stored {
            Some(value) => match value.parse::<i64>() {
                Ok(fingerprint) => Ok(Some(fingerprint)),
                Err(_) => {
                    debug!(path, value = %value, "unparseable dir-times entry, treating as changed");
                    Ok(None)
                }
            },
            None => Ok(None),
        }
    }

    fn put(&mut self, path: &str, fingerprint: i64) -> QueueResult<()> {
        let _: () = self
            .connection
            .set_ex(Self::key(path), fingerprint.to_string(), self.ttl_secs)?;
        Ok(())
    }
}
