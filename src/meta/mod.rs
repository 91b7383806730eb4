//! Document shaping for the downstream index
//!
//! The crawler side of the pipeline stops at dispatched batches; this
//! module is the consumer side. An indexing bot deserializes a `Batch`,
//! walks its listings through a `MetaBuilder`, and ships the resulting
//! documents to the index. Owner/group resolution, cross-run change
//! skipping, and plugin fields all hang off the builder.

pub mod cache;
pub mod doc;
pub mod plugin;

pub use cache::{DirTimesCache, IdentityCache, RedisDirTimes};
pub use doc::{
    extension_of, filehash, timestamp_unix, DirDoc, DirOutcome, FileDoc, ListingDocs, MetaBuilder,
};
pub use plugin::{DocKind, MetaPlugin, PluginRegistry};
