//! Remote-path string helpers
//!
//! Paths on the cluster are absolute, slash-separated strings and are never
//! touched by the local filesystem layer, so these helpers implement POSIX
//! path semantics directly on strings. Two behaviors matter to the walk:
//!
//! - `join` follows POSIX join rules: an absolute second component replaces
//!   the first. The entries endpoint returns full paths for child
//!   directories, so joining them against the parent yields the child path
//!   unchanged.
//! - depth comparisons use raw separator counts relative to the root, which
//!   makes the bare root `/` and its immediate children count the same. The
//!   depth-limit policy inherits that arithmetic.

/// Strip trailing separators; the bare root stays `/`.
pub fn normalize(path: &str) -> String {
    if path == "/" {
        return path.to_string();
    }
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() {
        "/".to_string()
    } else {
        trimmed.to_string()
    }
}

/// POSIX join: an absolute child replaces the parent entirely.
pub fn join(parent: &str, child: &str) -> String {
    if child.starts_with('/') {
        return child.to_string();
    }
    if child.is_empty() {
        return parent.to_string();
    }
    if parent.ends_with('/') {
        format!("{parent}{child}")
    } else {
        format!("{parent}/{child}")
    }
}

/// Number of `/` separators in the path.
pub fn separator_count(path: &str) -> usize {
    path.bytes().filter(|b| *b == b'/').count()
}

/// Parent directory of an absolute path; the root is its own parent.
pub fn parent(path: &str) -> String {
    let norm = normalize(path);
    match norm.rfind('/') {
        Some(0) => "/".to_string(),
        Some(idx) => norm[..idx].to_string(),
        None => norm,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("/data/"), "/data");
        assert_eq!(normalize("/data//"), "/data");
        assert_eq!(normalize("/data/projects"), "/data/projects");
        assert_eq!(normalize("//"), "/");
    }

    #[test]
    fn test_join_absolute_child_wins() {
        assert_eq!(join("/data", "/data/projects"), "/data/projects");
        assert_eq!(join("/", "/archive"), "/archive");
    }

    #[test]
    fn test_join_relative_child() {
        assert_eq!(join("/data", "projects"), "/data/projects");
        assert_eq!(join("/", "projects"), "/projects");
        assert_eq!(join("/data", ""), "/data");
    }

    #[test]
    fn test_separator_count() {
        // "/" and "/a" both count 1; depth arithmetic relative to the bare
        // root inherits this quirk.
        assert_eq!(separator_count("/"), 1);
        assert_eq!(separator_count("/a"), 1);
        assert_eq!(separator_count("/a/b"), 2);
        assert_eq!(separator_count("/a/b/c"), 3);
    }

    #[test]
    fn test_parent() {
        assert_eq!(parent("/data/projects"), "/data");
        assert_eq!(parent("/data"), "/");
        assert_eq!(parent("/"), "/");
        assert_eq!(parent("/data/projects/"), "/data");
    }
}
