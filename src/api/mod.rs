//! Qumulo REST API layer
//!
//! Everything the crawl needs from the cluster goes through here:
//!
//! - `session` - login, node discovery and the pooled HTTPS client
//! - `listing` - the `ListDirectory` seam the workers call, plus its REST
//!   implementation (children partition, self-attributes, timestamp
//!   normalization)
//! - `types` - decoded attribute and listing records
//!
//! The session is created once per run and shared read-only by every worker;
//! requests carry a bearer token and the client skips TLS verification for
//! the cluster's internal certificate.

pub mod listing;
pub mod session;
pub mod types;

pub use listing::ListDirectory;
pub use session::{connect, ApiSession};
pub use types::{DirListing, EntryAttributes};
