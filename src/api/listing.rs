//! Directory listing over the files API
//!
//! `ListDirectory` is the seam the worker pool calls through; the session
//! implements it with two requests per directory: one entries page (requested
//! with a page limit large enough to never truncate) and one self-attributes
//! lookup, because the entries call does not return the directory's own
//! metadata.
//!
//! Children are partitioned by wire type: an entry counts as a subdirectory
//! or file only when it is not a symlink in disguise
//! (`symlink_target_type` must be `FS_FILE_TYPE_UNKNOWN`); everything else is
//! silently dropped. Transport and decode failures propagate to the caller
//! untouched - there is no retry at this layer.

use crate::api::session::ApiSession;
use crate::api::types::{DirListing, EntryAttributes};
use crate::error::{ApiError, ApiResult};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::Deserialize;

/// Large enough that one page always holds a full directory
const ENTRY_PAGE_LIMIT: u32 = 1_000_000;

const TYPE_DIRECTORY: &str = "FS_FILE_TYPE_DIRECTORY";
const TYPE_FILE: &str = "FS_FILE_TYPE_FILE";
const SYMLINK_NONE: &str = "FS_FILE_TYPE_UNKNOWN";

/// Empty safe set: every byte outside `A-Za-z0-9_.-` is escaped, `/` included
const PATH_ENCODE: &AsciiSet = &NON_ALPHANUMERIC.remove(b'_').remove(b'.').remove(b'-');

/// Lists one remote directory; the seam between workers and the REST layer
pub trait ListDirectory: Send + Sync {
    /// List `path`: self attributes plus children split into dirs and files
    fn list_directory(&self, path: &str) -> ApiResult<DirListing>;
}

#[derive(Debug, Deserialize)]
struct EntriesResponse {
    files: Vec<RawEntry>,
}

#[derive(Debug, Deserialize)]
struct RawEntry {
    id: String,
    name: String,
    path: String,
    size: String,
    #[serde(default, rename = "type")]
    kind: Option<String>,
    #[serde(default)]
    symlink_target_type: Option<String>,
    owner_details: IdentityDetail,
    group_details: IdentityDetail,
    creation_time: String,
    modification_time: String,
    change_time: String,
    num_links: u64,
}

#[derive(Debug, Deserialize)]
struct IdentityDetail {
    id_value: String,
}

impl RawEntry {
    fn is_directory(&self) -> bool {
        self.kind.as_deref() == Some(TYPE_DIRECTORY)
            && self.symlink_target_type.as_deref() == Some(SYMLINK_NONE)
    }

    fn is_file(&self) -> bool {
        self.kind.as_deref() == Some(TYPE_FILE)
            && self.symlink_target_type.as_deref() == Some(SYMLINK_NONE)
    }

    fn into_attributes(self, route: &str) -> ApiResult<EntryAttributes> {
        let size = self.size.parse::<u64>().map_err(|_| ApiError::Decode {
            url: route.to_string(),
            reason: format!("non-numeric size '{}' for '{}'", self.size, self.path),
        })?;
        Ok(EntryAttributes {
            id: self.id,
            name: self.name,
            path: self.path,
            size,
            owner: self.owner_details.id_value,
            group: self.group_details.id_value,
            creation_time: normalize_timestamp(&self.creation_time),
            modification_time: normalize_timestamp(&self.modification_time),
            change_time: normalize_timestamp(&self.change_time),
            num_links: self.num_links,
        })
    }
}

/// Percent-encode a remote path for use as one URL segment
pub(crate) fn encode_path(path: &str) -> String {
    utf8_percent_encode(path, PATH_ENCODE).to_string()
}

/// Truncate at the first `.` and strip the trailing zone marker
pub(crate) fn normalize_timestamp(ts: &str) -> String {
    let head = match ts.split_once('.') {
        Some((head, _)) => head,
        None => ts,
    };
    head.trim_end_matches('Z').to_string()
}

fn partition_entries(
    entries: Vec<RawEntry>,
    route: &str,
) -> ApiResult<(Vec<String>, Vec<EntryAttributes>)> {
    let mut dirs = Vec::new();
    let mut files = Vec::new();
    for entry in entries {
        if entry.is_directory() {
            dirs.push(entry.path);
        } else if entry.is_file() {
            files.push(entry.into_attributes(route)?);
        }
        // symlinks and special types are dropped from both lists
    }
    Ok((dirs, files))
}

impl ApiSession {
    /// Child entries of `path`: subdirectory paths and file records
    pub fn child_entries(&self, path: &str) -> ApiResult<(Vec<String>, Vec<EntryAttributes>)> {
        let route = format!(
            "/v1/files/{}/entries/?limit={}",
            encode_path(path),
            ENTRY_PAGE_LIMIT
        );
        let page: EntriesResponse = self.get(&route)?;
        partition_entries(page.files, &route)
    }

    /// Attributes of `path` itself
    pub fn path_attributes(&self, path: &str) -> ApiResult<EntryAttributes> {
        let route = format!("/v1/files/{}/info/attributes", encode_path(path));
        let raw: RawEntry = self.get(&route)?;
        raw.into_attributes(&route)
    }
}

impl ListDirectory for ApiSession {
    fn list_directory(&self, path: &str) -> ApiResult<DirListing> {
        let (dirs, files) = self.child_entries(path)?;
        let attrs = self.path_attributes(path)?;
        Ok(DirListing { attrs, dirs, files })
    }
}
