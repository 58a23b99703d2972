//! Tag Normalizer (§4.6): validates and singularizes colon-hierarchical
//! tags (`"topic:database:postgres"`) produced by an external tag
//! extractor before they are persisted against a Document.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

/// Maximum colon-separated levels a tag may have by default.
pub const DEFAULT_MAX_DEPTH: usize = 4;

static TAG_SHAPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9-]+(:[a-z0-9-]+)*$").expect("static regex"));

/// Levels kept as-is even when they'd otherwise be singularized.
const PROTECTED_WORDS: &[&str] = &[
    "news", "analytics", "metrics", "status", "address", "series", "species", "postgres",
];

/// Normalize and validate one raw tag. Returns `None` if it fails any
/// rejection rule in §4.6 steps 4-7.
pub fn normalize_tag(raw: &str) -> Option<String> {
    let levels: Vec<String> = raw
        .split(':')
        .map(|level| singularize_level(&level.to_lowercase()))
        .collect();
    let recomposed = levels.join(":");

    if !TAG_SHAPE.is_match(&recomposed) {
        return None;
    }

    let depth = levels.len();
    if depth > DEFAULT_MAX_DEPTH {
        return None;
    }

    let unique: HashSet<&str> = levels.iter().map(String::as_str).collect();
    if unique.len() != levels.len() {
        return None;
    }

    if depth > 1 && levels.first() == levels.last() {
        return None;
    }

    Some(recomposed)
}

/// Normalize a batch of raw tags, dropping invalid ones and de-duplicating
/// survivors while preserving first-seen order.
pub fn normalize_tags<I, S>(raw_tags: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();
    for raw in raw_tags {
        if let Some(tag) = normalize_tag(raw.as_ref()) {
            if seen.insert(tag.clone()) {
                out.push(tag);
            }
        }
    }
    out
}

/// One level of a normalized tag hierarchy, as produced by splitting a
/// normalized tag on `:`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagNode {
    pub name: String,
    pub depth: usize,
    pub parent_name: Option<String>,
}

/// Expand a normalized tag into the chain of prefixes that
/// `find_or_create_with_hierarchy` must create-if-missing, root first,
/// leaf last. `depth` is 0-based (the number of colons in `name`, root
/// is 0); `parent_name` is the full dotted-colon name of the level above.
pub fn hierarchy_chain(normalized_tag: &str) -> Vec<TagNode> {
    let levels: Vec<&str> = normalized_tag.split(':').collect();
    let mut chain = Vec::with_capacity(levels.len());
    let mut prefix = String::new();
    for (i, level) in levels.iter().enumerate() {
        let parent_name = if prefix.is_empty() {
            None
        } else {
            Some(prefix.clone())
        };
        if !prefix.is_empty() {
            prefix.push(':');
        }
        prefix.push_str(level);
        chain.push(TagNode {
            name: prefix.clone(),
            depth: i,
            parent_name,
        });
    }
    chain
}

/// §4.6 step 2: singularize one level if it's a plain plural, leaving
/// protected words, short words, and `ics`/`ous`/`ss` endings untouched.
fn singularize_level(level: &str) -> String {
    if PROTECTED_WORDS.contains(&level) {
        return level.to_string();
    }
    if level.len() <= 2 || !level.ends_with('s') {
        return level.to_string();
    }
    if level.ends_with("ics") || level.ends_with("ous") || level.ends_with("ss") {
        return level.to_string();
    }

    let without_final_s = &level[..level.len() - 1];
    let singular = if level.ends_with("ies") && level.len() > 4 {
        format!("{}y", &level[..level.len() - 3])
    } else if level.ends_with("es")
        && level.len() > 3
        && matches!(level.as_bytes()[level.len() - 3], b'x' | b'z' | b's' | b'h')
        && !ends_in_vowel_se(without_final_s)
    {
        level[..level.len() - 2].to_string()
    } else {
        without_final_s.to_string()
    };

    // the singular form must not be "much shorter" than the original — a
    // crude truncation is worse than keeping the plural.
    if level.len().saturating_sub(singular.len()) > 2 || singular.is_empty() {
        level.to_string()
    } else {
        singular
    }
}

/// True for words like `database`, `case`, `phase` that already end in a
/// vowel + `se` and pluralize by appending a bare `s` (`databases`), as
/// opposed to `x`/`z`/`ch`/`sh`-ending words that pluralize with `es`
/// (`boxes`, `churches`).
fn ends_in_vowel_se(word: &str) -> bool {
    if word.len() < 3 || !word.ends_with("se") {
        return false;
    }
    matches!(word.as_bytes()[word.len() - 3], b'a' | b'e' | b'i' | b'o' | b'u')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_tag_passes_through() {
        assert_eq!(normalize_tag("database").as_deref(), Some("database"));
    }

    #[test]
    fn plural_level_is_singularized() {
        assert_eq!(
            normalize_tag("topic:databases:postgres").as_deref(),
            Some("topic:database:postgres")
        );
    }

    #[test]
    fn protected_word_is_kept_plural() {
        assert_eq!(normalize_tag("news").as_deref(), Some("news"));
    }

    #[test]
    fn ics_ous_ss_suffixes_are_kept() {
        assert_eq!(normalize_tag("topic:physics").as_deref(), Some("topic:physics"));
        assert_eq!(normalize_tag("topic:famous").as_deref(), Some("topic:famous"));
        assert_eq!(normalize_tag("topic:process").as_deref(), Some("topic:process"));
    }

    #[test]
    fn mixed_case_input_is_lowercased() {
        assert_eq!(normalize_tag("Topic:Database").as_deref(), Some("topic:database"));
    }

    #[test]
    fn rejects_invalid_characters() {
        assert_eq!(normalize_tag("topic database"), None);
    }

    #[test]
    fn spec_scenario_5_survivors() {
        let survivors = normalize_tags([
            "Database:PostgreSQL:JSONB",
            "ai:llm:llm",
            "ai:ai",
            "ai:llm:embeddings",
            "bad tag",
        ]);
        assert_eq!(
            survivors,
            vec!["database:postgresql:jsonb".to_string(), "ai:llm:embedding".to_string()]
        );
    }

    #[test]
    fn rejects_too_deep() {
        assert_eq!(normalize_tag("a:b:c:d:e"), None);
    }

    #[test]
    fn rejects_duplicate_levels() {
        assert_eq!(normalize_tag("topic:topic"), None);
    }

    #[test]
    fn rejects_self_containing_chain() {
        assert_eq!(normalize_tag("topic:database:topic"), None);
    }

    #[test]
    fn normalize_tags_dedupes_preserving_order() {
        let tags = normalize_tags(["topic:databases", "topic:database", "status"]);
        assert_eq!(tags, vec!["topic:database".to_string(), "status".to_string()]);
    }

    #[test]
    fn hierarchy_chain_builds_prefixes_with_parents() {
        let chain = hierarchy_chain("topic:database:postgres");
        assert_eq!(chain.len(), 3);
        assert_eq!(chain[0].name, "topic");
        assert_eq!(chain[0].parent_name, None);
        assert_eq!(chain[0].depth, 0);
        assert_eq!(chain[1].name, "topic:database");
        assert_eq!(chain[1].parent_name.as_deref(), Some("topic"));
        assert_eq!(chain[1].depth, 1);
        assert_eq!(chain[2].name, "topic:database:postgres");
        assert_eq!(chain[2].parent_name.as_deref(), Some("topic:database"));
        assert_eq!(chain[2].depth, 2);
    }
}
