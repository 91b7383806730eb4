//! Metadata documents for the downstream index
//!
//! The indexing bots pop batches off the queue and turn each listing into
//! documents with `MetaBuilder`. Field names and shapes here are the index
//! schema the bots feed; renaming a field is a schema migration, not a
//! refactor.
//!
//! Directory documents start with `items` counts of a bare directory; the
//! bots accumulate real counts as file documents land. File documents carry
//! a size+mtime hash used for cross-run change detection and dupe grouping.

use crate::api::{DirListing, EntryAttributes};
use crate::config::CrawlConfig;
use crate::error::{MetaError, MetaResult};
use crate::fspath;
use crate::meta::cache::{DirTimesCache, IdentityCache, RedisDirTimes};
use crate::meta::plugin::{DocKind, MetaPlugin, PluginRegistry};
use chrono::{NaiveDateTime, Utc};
use md5::{Digest, Md5};
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, trace};

/// Timestamp format used on the wire and in documents
const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Index document for one directory
#[derive(Debug, Clone, Serialize)]
pub struct DirDoc {
    pub filename: String,
    pub path_parent: String,
    pub filesize: u64,
    pub items: u64,
    pub items_files: u64,
    pub items_subdirs: u64,
    pub last_modified: String,
    pub creation_time: String,
    pub last_change: String,
    pub hardlinks: u64,
    pub inode: String,
    pub owner: String,
    pub group: String,
    pub tag: String,
    pub tag_custom: String,
    pub indexing_date: String,
    pub worker_name: String,
    pub change_percent_filesize: String,
    pub change_percent_items: String,
    pub change_percent_items_files: String,
    pub change_percent_items_subdirs: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Index document for one file
#[derive(Debug, Clone, Serialize)]
pub struct FileDoc {
    pub filename: String,
    pub extension: String,
    pub path_parent: String,
    pub filesize: u64,
    pub owner: String,
    pub group: String,
    pub last_modified: String,
    pub creation_time: String,
    pub last_change: String,
    pub hardlinks: u64,
    pub inode: String,
    pub filehash: String,
    pub tag: String,
    pub tag_custom: String,
    pub dupe_md5: String,
    pub indexing_date: String,
    pub worker_name: String,
    #[serde(rename = "_type")]
    pub doc_type: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// What building a directory document produced
#[derive(Debug)]
pub enum DirOutcome {
    /// Fresh document to index
    Built(DirDoc),

    /// Dir-times fingerprint matched the previous run; nothing to index
    Unchanged,
}

/// Documents produced from one listing
#[derive(Debug)]
pub struct ListingDocs {
    pub dir: DirOutcome,
    pub files: Vec<FileDoc>,
}

/// Builds index documents from listed attributes
pub struct MetaBuilder {
    config: Arc<CrawlConfig>,
    identities: IdentityCache,
    plugins: PluginRegistry,
    dir_times: Option<Box<dyn DirTimesCache>>,
}

impl MetaBuilder {
    /// Builder with no dir-times cache and no plugins
    pub fn new(config: Arc<CrawlConfig>) -> Self {
        Self {
            config,
            identities: IdentityCache::new(),
            plugins: PluginRegistry::new(),
            dir_times: None,
        }
    }

    /// Builder wired per the configuration; connects the redis dir-times
    /// cache when enabled
    pub fn from_config(config: Arc<CrawlConfig>) -> MetaResult<Self> {
        let mut builder = Self::new(Arc::clone(&config));
        if config.cache_dir_times {
            let cache = RedisDirTimes::connect(&config.redis_url, config.dir_times_ttl_secs)?;
            builder.dir_times = Some(Box::new(cache));
        }
        Ok(builder)
    }

    /// Attach a dir-times cache
    pub fn with_dir_times(mut self, cache: Box<dyn DirTimesCache>) -> Self {
        self.dir_times = Some(cache);
        self
    }

    /// Register a plugin
    pub fn with_plugin(mut self, plugin: Box<dyn MetaPlugin>) -> Self {
        self.plugins.register(plugin);
        self
    }

    /// Build the directory document for listed directory attributes.
    ///
    /// With a dir-times cache attached, a directory whose mtime+ctime
    /// fingerprint matches the stored one comes back `Unchanged`.
    pub fn build_dir_doc(&mut self, attrs: &EntryAttributes) -> MetaResult<DirOutcome> {
        let path = fspath::normalize(&attrs.path);
        let mtime = timestamp_unix(&attrs.modification_time)?;
        let ctime = timestamp_unix(&attrs.change_time)?;
        let fingerprint = mtime + ctime;

        if let Some(cache) = self.dir_times.as_mut() {
            if cache.get(&path)? == Some(fingerprint) {
                trace!(path = %path, "directory unchanged since last run");
                return Ok(DirOutcome::Unchanged);
            }
        }

        let doc = DirDoc {
            filename: attrs.name.clone(),
            path_parent: fspath::parent(&path),
            filesize: 0,
            items: 1,
            items_files: 0,
            items_subdirs: 0,
            last_modified: attrs.modification_time.clone(),
            creation_time: attrs.creation_time.clone(),
            last_change: attrs.change_time.clone(),
            hardlinks: attrs.num_links,
            inode: attrs.id.clone(),
            owner: self.identities.resolve_owner(&attrs.owner),
            group: self.identities.resolve_group(&attrs.group),
            tag: String::new(),
            tag_custom: String::new(),
            indexing_date: index_date(),
            worker_name: self.config.worker_name.clone(),
            change_percent_filesize: String::new(),
            change_percent_items: String::new(),
            change_percent_items_files: String::new(),
            change_percent_items_subdirs: String::new(),
            doc_type: "directory".to_string(),
            extra: self.plugins.contribute_all(DocKind::Directory, &path),
        };

        if let Some(cache) = self.dir_times.as_mut() {
            cache.put(&path, fingerprint)?;
        }
        Ok(DirOutcome::Built(doc))
    }

    /// Build a file document, or `None` when the file is filtered out.
    ///
    /// Filters apply in order: excluded name, below minimum size, modified
    /// more recently than the mtime floor. A future-dated mtime never
    /// passes the floor.
    pub fn build_file_doc(&mut self, attrs: &EntryAttributes) -> MetaResult<Option<FileDoc>> {
        if self.config.is_file_excluded(&attrs.name) {
            trace!(name = %attrs.name, "file name excluded");
            return Ok(None);
        }
        if attrs.size < self.config.min_size {
            return Ok(None);
        }
        let mtime = timestamp_unix(&attrs.modification_time)?;
        let age_secs = Utc::now().timestamp() - mtime;
        if age_secs < self.config.min_mtime_days as i64 * 86_400 {
            return Ok(None);
        }

        let doc = FileDoc {
            filename: attrs.name.clone(),
            extension: extension_of(&attrs.name),
            path_parent: fspath::parent(&attrs.path),
            filesize: attrs.size,
            owner: self.identities.resolve_owner(&attrs.owner),
            group: self.identities.resolve_group(&attrs.group),
            last_modified: attrs.modification_time.clone(),
            creation_time: attrs.creation_time.clone(),
            last_change: attrs.change_time.clone(),
            hardlinks: attrs.num_links,
            inode: attrs.id.clone(),
            filehash: filehash(attrs.size, mtime),
            tag: String::new(),
            tag_custom: String::new(),
            dupe_md5: String::new(),
            indexing_date: index_date(),
            worker_name: self.config.worker_name.clone(),
            doc_type: "file".to_string(),
            extra: self.plugins.contribute_all(DocKind::File, &attrs.path),
        };
        Ok(Some(doc))
    }

    /// Build every document for one listing.
    ///
    /// An unchanged directory skips its files too; their documents from the
    /// previous run are still current.
    pub fn listing_docs(&mut self, listing: &DirListing) -> MetaResult<ListingDocs> {
        let dir = self.build_dir_doc(&listing.attrs)?;
        if matches!(dir, DirOutcome::Unchanged) {
            debug!(path = %listing.path(), "skipping files of unchanged directory");
            return Ok(ListingDocs {
                dir,
                files: Vec::new(),
            });
        }

        let mut files = Vec::with_capacity(listing.files.len());
        for attrs in &listing.files {
            if let Some(doc) = self.build_file_doc(attrs)? {
                files.push(doc);
            }
        }
        Ok(ListingDocs { dir, files })
    }

    /// Merged index-mapping properties contributed by plugins
    pub fn schema_properties(&self, kind: DocKind) -> Map<String, Value> {
        self.plugins.schema_for(kind)
    }
}

/// Parse a wire timestamp into unix seconds
pub fn timestamp_unix(value: &str) -> MetaResult<i64> {
    let parsed = NaiveDateTime::parse_from_str(value, TIME_FORMAT).map_err(|_| {
        MetaError::InvalidTimestamp {
            value: value.to_string(),
        }
    })?;
    Ok(parsed.and_utc().timestamp())
}

/// Lowercased extension without the dot; dotfiles and extensionless names
/// yield the empty string
pub fn extension_of(name: &str) -> String {
    match name.rfind('.') {
        Some(idx) if idx > 0 => name[idx + 1..].trim().to_lowercase(),
        _ => String::new(),
    }
}

/// Size+mtime content fingerprint carried on file documents
pub fn filehash(size: u64, mtime_unix: i64) -> String {
    let mut hasher = Md5::new();
    hasher.update(format!("{size}{mtime_unix}"));
    format!("{:x}", hasher.finalize())
}

/// Indexing timestamp, microsecond precision
fn index_date() -> String {
    Utc::now().naive_utc().format("%Y-%m-%dT%H:%M:%S%.6f").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CrawlConfig;
    use crate::testutil::{attrs, listing, test_args, MemoryDirTimes};

    fn builder_with(adjust: impl FnOnce(&mut crate::config::CliArgs)) -> MetaBuilder {
        let mut args = test_args();
        adjust(&mut args);
        MetaBuilder::new(Arc::new(CrawlConfig::from_args(args).unwrap()))
    }

    #[test]
    fn test_timestamp_unix() {
        assert_eq!(timestamp_unix("1970-01-01T00:00:10").unwrap(), 10);
        assert_eq!(timestamp_unix("2024-03-02T09:30:00").unwrap(), 1_709_371_800);
        assert!(matches!(
            timestamp_unix("2024-03-02 09:30:00"),
            Err(MetaError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("report.PDF"), "pdf");
        assert_eq!(extension_of("archive.tar.gz"), "gz");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("README"), "");
    }

    #[test]
    fn test_filehash_depends_on_size_and_mtime() {
        let a = filehash(100, 1_700_000_000);
        assert_eq!(a.len(), 32);
        assert!(a.bytes().all(|b| b.is_ascii_hexdigit()));
        assert_eq!(a, filehash(100, 1_700_000_000));
        assert_ne!(a, filehash(101, 1_700_000_000));
        assert_ne!(a, filehash(100, 1_700_000_001));
    }

    #[test]
    fn test_dir_doc_fields() {
        let mut builder = builder_with(|_| {});
        let outcome = builder.build_dir_doc(&attrs("/data/projects", 0)).unwrap();
        let DirOutcome::Built(doc) = outcome else {
            panic!("expected a built document");
        };

        assert_eq!(doc.filename, "projects");
        assert_eq!(doc.path_parent, "/data");
        assert_eq!(doc.filesize, 0);
        assert_eq!(doc.items, 1);
        assert_eq!(doc.items_files, 0);
        assert_eq!(doc.items_subdirs, 0);
        assert_eq!(doc.change_percent_filesize, "");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_type"], "directory");
        assert!(json["indexing_date"].as_str().unwrap().contains('.'));
    }

    #[test]
    fn test_file_doc_fields() {
        let mut builder = builder_with(|_| {});
        let doc = builder
            .build_file_doc(&attrs("/data/report.pdf", 2048))
            .unwrap()
            .unwrap();

        assert_eq!(doc.filename, "report.pdf");
        assert_eq!(doc.extension, "pdf");
        assert_eq!(doc.path_parent, "/data");
        assert_eq!(doc.filesize, 2048);
        assert_eq!(doc.filehash.len(), 32);
        assert_eq!(doc.dupe_md5, "");

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["_type"], "file");
    }

    #[test]
    fn test_file_excluded_by_name() {
        let mut builder =
            builder_with(|args| args.exclude_file_patterns = vec![r"^Thumbs\.db$".to_string()]);
        let doc = builder.build_file_doc(&attrs("/data/Thumbs.db", 10)).unwrap();
        assert!(doc.is_none());
    }

    #[test]
    fn test_file_below_min_size() {
        let mut builder = builder_with(|args| args.min_size = 1024);
        assert!(builder
            .build_file_doc(&attrs("/data/small.txt", 100))
            .unwrap()
            .is_none());
        assert!(builder
            .build_file_doc(&attrs("/data/big.txt", 4096))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_file_newer_than_mtime_floor() {
        let mut builder = builder_with(|args| args.min_mtime_days = 1);
        let mut recent = attrs("/data/fresh.txt", 10);
        recent.modification_time = Utc::now()
            .naive_utc()
            .format("%Y-%m-%dT%H:%M:%S")
            .to_string();
        assert!(builder.build_file_doc(&recent).unwrap().is_none());
    }

    #[test]
    fn test_future_dated_file_skipped() {
        let mut builder = builder_with(|_| {});
        let mut future = attrs("/data/clock-skew.txt", 10);
        future.modification_time = "2100-01-01T00:00:00".to_string();
        assert!(builder.build_file_doc(&future).unwrap().is_none());
    }

    #[test]
    fn test_bad_timestamp_is_an_error() {
        let mut builder = builder_with(|_| {});
        let mut bad = attrs("/data/f", 10);
        bad.modification_time = "yesterday".to_string();
        assert!(matches!(
            builder.build_file_doc(&bad),
            Err(MetaError::InvalidTimestamp { .. })
        ));
    }

    #[test]
    fn test_dir_times_skip_on_second_run() {
        let mut builder =
            builder_with(|_| {}).with_dir_times(Box::new(MemoryDirTimes::new()));
        let dir = attrs("/data/projects", 0);

        assert!(matches!(
            builder.build_dir_doc(&dir).unwrap(),
            DirOutcome::Built(_)
        ));
        assert!(matches!(
            builder.build_dir_doc(&dir).unwrap(),
            DirOutcome::Unchanged
        ));

        // A later mtime changes the fingerprint.
        let mut touched = dir.clone();
        touched.modification_time = "2024-04-01T00:00:00".to_string();
        assert!(matches!(
            builder.build_dir_doc(&touched).unwrap(),
            DirOutcome::Built(_)
        ));
    }

    #[test]
    fn test_unchanged_dir_skips_its_files() {
        let mut builder =
            builder_with(|_| {}).with_dir_times(Box::new(MemoryDirTimes::new()));
        let l = listing("/data/projects", &[], &[("report.pdf", 100)]);

        let first = builder.listing_docs(&l).unwrap();
        assert!(matches!(first.dir, DirOutcome::Built(_)));
        assert_eq!(first.files.len(), 1);

        let second = builder.listing_docs(&l).unwrap();
        assert!(matches!(second.dir, DirOutcome::Unchanged));
        assert!(second.files.is_empty());
    }

    #[test]
    fn test_plugin_fields_flattened_into_doc() {
        use serde_json::json;

        struct Media;
        impl MetaPlugin for Media {
            fn name(&self) -> &str {
                "media"
            }
            fn kind(&self) -> DocKind {
                DocKind::File
            }
            fn contribute_fields(&self, _path: &str) -> MetaResult<Map<String, Value>> {
                let mut fields = Map::new();
                fields.insert("media_type".to_string(), json!("video"));
                Ok(fields)
            }
        }

        let mut builder = builder_with(|_| {}).with_plugin(Box::new(Media));
        let doc = builder
            .build_file_doc(&attrs("/data/clip.mp4", 500))
            .unwrap()
            .unwrap();
        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["media_type"], "video");
        assert_eq!(json["_type"], "file");
    }
}
