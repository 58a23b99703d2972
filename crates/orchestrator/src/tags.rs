//! In-process Tag table (§3 Tag / DocumentTag) backing `extract_tags`'s
//! `find_or_create_with_hierarchy` (§4.6). Serialized behind a single
//! mutex — §5 calls for chain-creation along one root path to be
//! serialized so two concurrent writers can't create duplicate
//! ancestors; a process-wide lock is the simplest thing that satisfies
//! that for the in-memory reference store.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use textmeta::hierarchy_chain;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagRecord {
    pub name: String,
    pub parent_name: Option<String>,
    pub depth: usize,
    pub usage_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagSource {
    Auto,
    Manual,
}

#[derive(Default)]
pub struct TagRegistry {
    tags: Mutex<HashMap<String, TagRecord>>,
    associations: Mutex<HashSet<(String, String)>>,
}

impl TagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create every missing ancestor of `normalized_tag` (already
    /// validated by [`textmeta::normalize_tag`]) and return the leaf's
    /// full name (§4.6).
    pub fn find_or_create_with_hierarchy(&self, normalized_tag: &str) -> String {
        let chain = hierarchy_chain(normalized_tag);
        let mut tags = self.tags.lock().unwrap();
        for node in &chain {
            tags.entry(node.name.clone()).or_insert_with(|| TagRecord {
                name: node.name.clone(),
                parent_name: node.parent_name.clone(),
                depth: node.depth,
                usage_count: 0,
            });
        }
        chain.last().map(|n| n.name.clone()).unwrap_or_default()
    }

    /// Associate `owner_id` (a Document or ChunkEmbedding id) with
    /// `tag_name`, incrementing `usage_count` exactly once per
    /// `(owner_id, tag_name)` pair (§3 DocumentTag/ChunkTag invariant).
    /// `_confidence`/`_source` are recorded at the call site's
    /// discretion; the in-memory reference only tracks the dedup set.
    pub fn associate(&self, owner_id: &str, tag_name: &str, _confidence: f32, _source: TagSource) -> bool {
        let mut associations = self.associations.lock().unwrap();
        let key = (owner_id.to_string(), tag_name.to_string());
        if associations.insert(key) {
            if let Some(tag) = self.tags.lock().unwrap().get_mut(tag_name) {
                tag.usage_count += 1;
            }
            true
        } else {
            false
        }
    }

    pub fn get(&self, name: &str) -> Option<TagRecord> {
        self.tags.lock().unwrap().get(name).cloned()
    }

    pub fn tags_for(&self, owner_id: &str) -> Vec<String> {
        self.associations
            .lock()
            .unwrap()
            .iter()
            .filter(|(owner, _)| owner == owner_id)
            .map(|(_, tag)| tag.clone())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn find_or_create_builds_missing_ancestors() {
        let registry = TagRegistry::new();
        let leaf = registry.find_or_create_with_hierarchy("topic:database:postgres");
        assert_eq!(leaf, "topic:database:postgres");
        assert!(registry.get("topic").is_some());
        assert!(registry.get("topic:database").is_some());
        assert_eq!(registry.get("topic:database").unwrap().parent_name.as_deref(), Some("topic"));
        assert_eq!(registry.get("topic:database:postgres").unwrap().depth, 2);
    }

    #[test]
    fn associate_increments_usage_count_once() {
        let registry = TagRegistry::new();
        registry.find_or_create_with_hierarchy("topic:database");
        assert!(registry.associate("doc-1", "topic:database", 1.0, TagSource::Auto));
        assert!(!registry.associate("doc-1", "topic:database", 1.0, TagSource::Auto));
        assert_eq!(registry.get("topic:database").unwrap().usage_count, 1);
    }

    #[test]
    fn tags_for_returns_associated_names() {
        let registry = TagRegistry::new();
        registry.find_or_create_with_hierarchy("topic:database");
        registry.associate("doc-1", "topic:database", 1.0, TagSource::Auto);
        assert_eq!(registry.tags_for("doc-1"), vec!["topic:database".to_string()]);
    }
}
