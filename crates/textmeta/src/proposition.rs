//! Proposition Parser (§4.8): splits an extractor's raw output into
//! candidate propositions, strips list markup, and validates each
//! candidate before it is persisted.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

pub const MIN_LENGTH: usize = 10;
pub const MAX_LENGTH: usize = 1000;
pub const MIN_WORDS: usize = 5;

static BULLET_OR_NUMBER_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\s*(?:[-*\u{2022}]\s*|\d+\.\s*)").expect("static regex"));

static RUN_OF_ALPHA: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z]{3,}").expect("static regex"));

/// Case-insensitive fragments that mark a "candidate" as the extractor
/// complaining rather than producing a proposition.
static META_RESPONSE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"please\s+provide",
        r"i\s+need\s+the\s+text",
        r"waiting\s+for",
        r"no\s+text\s+provided",
        r"i\s+don'?t\s+have\s+(?:access\s+to\s+)?(?:the\s+)?(?:text|content)",
        r"as\s+an\s+ai\s+language\s+model",
        r"i\s+cannot\s+(?:generate|extract|provide)",
        r"please\s+share",
    ]
    .iter()
    .map(|pat| Regex::new(&format!("(?i){pat}")).expect("static regex"))
    .collect()
});

/// Raw extractor output: either one string to split on newlines, or an
/// already-split list of candidate lines.
pub enum PropositionInput {
    Text(String),
    Lines(Vec<String>),
}

/// Parse, clean, validate, and de-duplicate proposition candidates.
pub fn parse_propositions(input: PropositionInput) -> Vec<String> {
    let lines: Vec<String> = match input {
        PropositionInput::Text(text) => text.lines().map(str::to_string).collect(),
        PropositionInput::Lines(lines) => lines,
    };

    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for line in lines {
        let stripped = BULLET_OR_NUMBER_PREFIX.replace(&line, "");
        let candidate = stripped.trim().to_string();
        if candidate.is_empty() {
            continue;
        }
        if !is_valid_proposition(&candidate) {
            continue;
        }
        if seen.insert(candidate.clone()) {
            out.push(candidate);
        }
    }

    out
}

fn is_valid_proposition(candidate: &str) -> bool {
    let len = candidate.len();
    if len < MIN_LENGTH || len > MAX_LENGTH {
        return false;
    }
    if !RUN_OF_ALPHA.is_match(candidate) {
        return false;
    }
    if candidate.split_whitespace().count() < MIN_WORDS {
        return false;
    }
    if META_RESPONSE_PATTERNS.iter().any(|re| re.is_match(candidate)) {
        return false;
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_bullet_and_numeric_prefixes() {
        let input = PropositionInput::Text(
            "- The server restarts automatically on crash\n\
             2. Postgres is the primary datastore for the service\n\
             \u{2022} All requests are logged with a correlation id"
                .to_string(),
        );
        let result = parse_propositions(input);
        assert_eq!(result.len(), 3);
        assert!(!result[0].starts_with('-'));
        assert!(!result[1].starts_with(char::is_numeric));
    }

    #[test]
    fn rejects_too_short_candidate() {
        let result = parse_propositions(PropositionInput::Lines(vec!["too short".into()]));
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_below_min_word_count() {
        let result = parse_propositions(PropositionInput::Lines(vec![
            "aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa".into(),
        ]));
        assert!(result.is_empty());
    }

    #[test]
    fn rejects_meta_response_lines() {
        let result = parse_propositions(PropositionInput::Lines(vec![
            "Please provide the text you would like summarized".into(),
            "I need the text to extract propositions from it".into(),
        ]));
        assert!(result.is_empty());
    }

    #[test]
    fn deduplicates_preserving_order() {
        let input = PropositionInput::Lines(vec![
            "Postgres is the primary datastore for the service".into(),
            "Postgres is the primary datastore for the service".into(),
            "Redis caches session tokens for fast lookups".into(),
        ]);
        let result = parse_propositions(input);
        assert_eq!(result.len(), 2);
    }

    #[test]
    fn requires_alphabetic_run() {
        let result = parse_propositions(PropositionInput::Lines(vec![
            "12345 67890 11111 22222 33333".into(),
        ]));
        assert!(result.is_empty());
    }
}
