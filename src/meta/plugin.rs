//! Plugin seam for extra document fields
//!
//! A plugin contributes fields that ride along on directory or file
//! documents, plus the index-mapping properties those fields need. Plugins
//! are best effort: a failing plugin is logged and its fields omitted, the
//! document itself still ships.

use crate::error::MetaResult;
use serde_json::{Map, Value};
use tracing::warn;

/// Which document kind a plugin targets
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocKind {
    Directory,
    File,
}

/// Contributes fields to metadata documents
pub trait MetaPlugin {
    /// Plugin name, used in logs
    fn name(&self) -> &str;

    /// Document kind this plugin contributes to
    fn kind(&self) -> DocKind;

    /// Index-mapping properties for the contributed fields
    fn schema_properties(&self) -> Map<String, Value> {
        Map::new()
    }

    /// Fields for the document describing `path`
    fn contribute_fields(&self, path: &str) -> MetaResult<Map<String, Value>>;
}

/// Ordered set of registered plugins
#[derive(Default)]
pub struct PluginRegistry {
    plugins: Vec<Box<dyn MetaPlugin>>,
}

impl PluginRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a plugin; contribution order follows registration order
    pub fn register(&mut self, plugin: Box<dyn MetaPlugin>) {
        self.plugins.push(plugin);
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    /// Merge the fields of every plugin targeting `kind`.
    ///
    /// Later registrations win on key collision. A plugin error drops that
    /// plugin's fields only.
    pub fn contribute_all(&self, kind: DocKind, path: &str) -> Map<String, Value> {
        let mut merged = Map::new();
        for plugin in self.plugins.iter().filter(|p| p.kind() == kind) {
            match plugin.contribute_fields(path) {
                Ok(fields) => merged.extend(fields),
                Err(e) => {
                    warn!(plugin = plugin.name(), path, error = %e, "plugin failed, fields omitted");
                }
            }
        }
        merged
    }

    /// Merged index-mapping properties for `kind`
    pub fn schema_for(&self, kind: DocKind) -> Map<String, Value> {
        let mut merged = Map::new();
        for plugin in self.plugins.iter().filter(|p| p.kind() == kind) {
            merged.extend(plugin.schema_properties());
        }
        merged
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MetaError;
    use serde_json::json;

    struct TagPlugin;

    impl MetaPlugin for TagPlugin {
        fn name(&self) -> &str {
            "tagger"
        }

        fn kind(&self) -> DocKind {
            DocKind::File
        }

        fn schema_properties(&self) -> Map<String, Value> {
            let mut props = Map::new();
            props.insert("media_type".to_string(), json!({"type": "keyword"}));
            props
        }

        fn contribute_fields(&self, _path: &str) -> MetaResult<Map<String, Value>> {
            let mut fields = Map::new();
            fields.insert("media_type".to_string(), json!("video"));
            Ok(fields)
        }
    }

    struct BrokenPlugin;

    impl MetaPlugin for BrokenPlugin {
        fn name(&self) -> &str {
            "broken"
        }

        fn kind(&self) -> DocKind {
            DocKind::File
        }

        fn contribute_fields(&self, _path: &str) -> MetaResult<Map<String, Value>> {
            Err(MetaError::Plugin {
                name: "broken".to_string(),
                reason: "backend unreachable".to_string(),
            })
        }
    }

    #[test]
    fn test_contributions_filtered_by_kind() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TagPlugin));

        let fields = registry.contribute_all(DocKind::File, "/data/clip.mp4");
        assert_eq!(fields.get("media_type"), Some(&json!("video")));

        let fields = registry.contribute_all(DocKind::Directory, "/data");
        assert!(fields.is_empty());
    }

    #[test]
    fn test_failing_plugin_skipped() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(BrokenPlugin));
        registry.register(Box::new(TagPlugin));

        let fields = registry.contribute_all(DocKind::File, "/data/clip.mp4");
        assert_eq!(fields.len(), 1);
        assert_eq!(fields.get("media_type"), Some(&json!("video")));
    }

    #[test]
    fn test_schema_merge() {
        let mut registry = PluginRegistry::new();
        registry.register(Box::new(TagPlugin));
        registry.register(Box::new(BrokenPlugin));

        let schema = registry.schema_for(DocKind::File);
        assert_eq!(schema.get("media_type"), Some(&json!({"type": "keyword"})));
        assert_eq!(schema.len(), 1);
    }

    #[test]
    fn test_empty_registry() {
        let registry = PluginRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.contribute_all(DocKind::File, "/x").is_empty());
    }
}
