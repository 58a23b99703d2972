//! Text cleaning applied before every embed call (§4.3).
//!
//! Cleaning is intentionally dumb and cheap: strip, collapse runs of
//! whitespace to a single space, fold tabs to spaces, collapse multiple
//! newlines to one, then truncate. It is idempotent by construction —
//! `clean(clean(x)) == clean(x)` — since a second pass finds nothing left
//! to collapse or trim.

const DEFAULT_MAX_CHARS: usize = 8000;

/// Clean `text` per the embedding client's cleaning rule, truncating to
/// `max_chars`. Returns `None` when the cleaned result is empty.
pub fn clean(text: &str, max_chars: usize) -> Option<String> {
    let folded: String = text
        .chars()
        .map(|c| if c == '\t' { ' ' } else { c })
        .collect();

    let mut out = String::with_capacity(folded.len());
    let mut last_was_space = false;
    let mut pending_newlines = 0usize;

    for c in folded.trim().chars() {
        if c == '\n' {
            pending_newlines += 1;
            continue;
        }
        if pending_newlines > 0 {
            out.push('\n');
            pending_newlines = 0;
            last_was_space = false;
        }
        if c.is_whitespace() {
            if !last_was_space {
                out.push(' ');
                last_was_space = true;
            }
        } else {
            out.push(c);
            last_was_space = false;
        }
    }

    let truncated: String = out.chars().take(max_chars).collect();
    let trimmed = truncated.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

pub fn clean_default(text: &str) -> Option<String> {
    clean(text, DEFAULT_MAX_CHARS)
}
