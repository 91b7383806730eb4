//! Typed forms of the cluster API's attribute and listing payloads
//!
//! These are the records the walk moves around: one `EntryAttributes` per
//! file-system object and one `DirListing` per listed directory. Both are
//! immutable once decoded from the wire, except that the dispatcher may clear
//! a listing's child lists to prune recursion.

use serde::{Deserialize, Serialize};

/// Attributes of one file-system object (directory or file)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryAttributes {
    /// File id assigned by the cluster
    pub id: String,

    /// Base name of the object
    pub name: String,

    /// Full absolute path
    pub path: String,

    /// Size in bytes
    pub size: u64,

    /// Owner identity value
    pub owner: String,

    /// Group identity value
    pub group: String,

    /// Creation timestamp, seconds precision, zone marker stripped
    pub creation_time: String,

    /// Modification timestamp, seconds precision, zone marker stripped
    pub modification_time: String,

    /// Attribute-change timestamp, seconds precision, zone marker stripped
    pub change_time: String,

    /// Hard-link count
    pub num_links: u64,
}

/// One listed directory: its own attributes plus its immediate children,
/// partitioned into subdirectory paths and file records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DirListing {
    /// Attributes of the listed directory itself
    pub attrs: EntryAttributes,

    /// Full paths of child subdirectories, in API return order
    pub dirs: Vec<String>,

    /// Child file records, in API return order
    pub files: Vec<EntryAttributes>,
}

impl DirListing {
    /// Full path of the listed directory
    pub fn path(&self) -> &str {
        &self.attrs.path
    }

    /// True when the directory has no children of either kind
    pub fn is_empty(&self) -> bool {
        self.dirs.is_empty() && self.files.is_empty()
    }

    /// Number of child files
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Total bytes across child files
    pub fn file_bytes(&self) -> u64 {
        self.files.iter().map(|f| f.size).sum()
    }

    /// Drop both child lists, pruning recursion below this directory
    pub fn clear_children(&mut self) {
        self.dirs.clear();
        self.files.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn attrs(path: &str, size: u64) -> EntryAttributes {
        EntryAttributes {
            id: "10001".to_string(),
            name: path.rsplit('/').next().unwrap_or("").to_string(),
            path: path.to_string(),
            size,
            owner: "500".to_string(),
            group: "500".to_string(),
            creation_time: "2024-03-01T08:00:00".to_string(),
            modification_time: "2024-03-02T09:30:00".to_string(),
            change_time: "2024-03-02T09:30:00".to_string(),
            num_links: 1,
        }
    }

    #[test]
    fn test_listing_accessors() {
        let listing = DirListing {
            attrs: attrs("/data", 0),
            dirs: vec!["/data/a".to_string()],
            files: vec![attrs("/data/f1", 100), attrs("/data/f2", 250)],
        };
        assert_eq!(listing.path(), "/data");
        assert!(!listing.is_empty());
        assert_eq!(listing.file_count(), 2);
        assert_eq!(listing.file_bytes(), 350);
    }

    #[test]
    fn test_clear_children() {
        let mut listing = DirListing {
            attrs: attrs("/data", 0),
            dirs: vec!["/data/a".to_string()],
            files: vec![attrs("/data/f1", 100)],
        };
        listing.clear_children();
        assert!(listing.is_empty());
        assert_eq!(listing.path(), "/data");
    }

    #[test]
    fn test_listing_serde_round_trip() {
        let listing = DirListing {
            attrs: attrs("/data", 0),
            dirs: vec![],
            files: vec![attrs("/data/f1", 100)],
        };
        let json = serde_json::to_string(&listing).unwrap();
        let back: DirListing = serde_json::from_str(&json).unwrap();
        assert_eq!(back, listing);
    }
}
