//! Timeframe Parser (§4.7): turns a structured or natural-language
//! timeframe expression into one or more `[start, end)` ranges, and, for
//! natural-language input, strips the matched temporal phrase out of the
//! query text.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;

/// An inclusive-start, exclusive-end time range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }
}

/// Structured input accepted by [`parse_timeframe`], mirroring §4.7's
/// "null, a time range, a list of ranges, a date/datetime/time, a
/// natural-language string, or the sentinel `auto`".
#[derive(Debug, Clone, Default)]
pub enum TimeframeInput {
    #[default]
    None,
    Range(TimeRange),
    Ranges(Vec<TimeRange>),
    Date(NaiveDate),
    DateTime(DateTime<Utc>),
    /// Natural-language text to extract a timeframe from.
    Text(String),
    /// Extract a timeframe from `query` if present, otherwise `None`.
    Auto(String),
}

/// Output of [`parse_timeframe`].
#[derive(Debug, Clone, Default)]
pub struct ParsedTimeframe {
    pub ranges: Vec<TimeRange>,
    /// Only set for `Text`/`Auto` input: the query with the matched
    /// temporal phrase removed.
    pub cleaned_query: Option<String>,
    /// Only set for `Text`/`Auto` input: the phrase that was matched.
    pub original_expression: Option<String>,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TimeframeError {
    #[error("malformed timeframe input: {0}")]
    Malformed(String),
}

/// Parse `input` relative to `now`, per §4.7.
pub fn parse_timeframe(
    input: TimeframeInput,
    now: DateTime<Utc>,
) -> Result<ParsedTimeframe, TimeframeError> {
    match input {
        TimeframeInput::None => Ok(ParsedTimeframe::default()),
        TimeframeInput::Range(r) => Ok(ParsedTimeframe {
            ranges: vec![r],
            ..Default::default()
        }),
        TimeframeInput::Ranges(rs) => Ok(ParsedTimeframe {
            ranges: rs,
            ..Default::default()
        }),
        TimeframeInput::Date(date) => Ok(ParsedTimeframe {
            ranges: vec![day_range(date)],
            ..Default::default()
        }),
        TimeframeInput::DateTime(dt) => Ok(ParsedTimeframe {
            ranges: vec![day_range(dt.date_naive())],
            ..Default::default()
        }),
        TimeframeInput::Text(text) => extract_from_text(&text, now, true),
        TimeframeInput::Auto(text) => extract_from_text(&text, now, false),
    }
}

fn day_range(date: NaiveDate) -> TimeRange {
    let start = date.and_hms_opt(0, 0, 0).expect("valid time");
    let end = date.and_hms_opt(23, 59, 59).expect("valid time");
    TimeRange::new(
        DateTime::<Utc>::from_naive_utc_and_offset(start, Utc),
        DateTime::<Utc>::from_naive_utc_and_offset(end, Utc),
    )
}

/// `required` distinguishes `Text` (malformed input is an error) from
/// `Auto` (no match just means no timeframe in the query).
fn extract_from_text(
    text: &str,
    now: DateTime<Utc>,
    required: bool,
) -> Result<ParsedTimeframe, TimeframeError> {
    for pattern in PATTERNS.iter() {
        if let Some(caps) = pattern.regex.captures(text) {
            let whole = caps.get(0).expect("capture 0 always present");
            let range = (pattern.resolve)(&caps, now);
            let cleaned_query = strip_phrase(text, whole.start(), whole.end());
            return Ok(ParsedTimeframe {
                ranges: vec![range],
                cleaned_query: Some(cleaned_query),
                original_expression: Some(whole.as_str().to_string()),
            });
        }
    }

    if required {
        return Err(TimeframeError::Malformed(text.to_string()));
    }
    Ok(ParsedTimeframe::default())
}

/// Remove `text[start..end]` and collapse the whitespace/punctuation left
/// behind, per §4.7's "cleaned query" rule.
fn strip_phrase(text: &str, start: usize, end: usize) -> String {
    let mut removed = String::with_capacity(text.len());
    removed.push_str(&text[..start]);
    removed.push_str(&text[end..]);

    let collapsed = removed
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");
    collapsed
        .trim_matches(|c: char| c.is_whitespace() || c == ',' || c == '.')
        .to_string()
}

struct Pattern {
    regex: Regex,
    resolve: fn(&regex::Captures<'_>, DateTime<Utc>) -> TimeRange,
}

fn word_to_number(s: &str) -> Option<i64> {
    match s.to_ascii_lowercase().as_str() {
        "a" | "an" | "one" => Some(1),
        "two" => Some(2),
        "three" | "few" | "a few" | "several" => Some(3),
        "four" => Some(4),
        "five" => Some(5),
        "six" => Some(6),
        "seven" => Some(7),
        "eight" => Some(8),
        "nine" => Some(9),
        "ten" => Some(10),
        other => other.parse().ok(),
    }
}

fn unit_to_duration(n: i64, unit: &str) -> Duration {
    let unit = unit.to_ascii_lowercase();
    let unit = unit.trim_end_matches('s');
    match unit {
        "day" => Duration::days(n),
        "week" => Duration::weeks(n),
        "month" => Duration::days(n * 30),
        "year" => Duration::days(n * 365),
        "hour" => Duration::hours(n),
        "minute" => Duration::minutes(n),
        _ => Duration::days(n),
    }
}

fn weekday_from_name(name: &str) -> Option<Weekday> {
    match name.to_ascii_lowercase().as_str() {
        "monday" => Some(Weekday::Mon),
        "tuesday" => Some(Weekday::Tue),
        "wednesday" => Some(Weekday::Wed),
        "thursday" => Some(Weekday::Thu),
        "friday" => Some(Weekday::Fri),
        "saturday" => Some(Weekday::Sat),
        "sunday" => Some(Weekday::Sun),
        _ => None,
    }
}

/// Saturday 00:00 through Monday 00:00 of the weekend `weekends_ago`
/// weekends in the past, relative to `now` (§4.7).
fn weekend_range(now: DateTime<Utc>, weekends_ago: i64) -> TimeRange {
    let today = now.date_naive();
    let days_since_saturday = (today.weekday().num_days_from_monday() as i64 + 2) % 7;
    let most_recent_saturday = today - Duration::days(days_since_saturday);
    let target_saturday = most_recent_saturday - Duration::weeks(weekends_ago);
    let target_monday = target_saturday + Duration::days(2);

    let start = target_saturday.and_hms_opt(0, 0, 0).expect("valid time");
    let end = target_monday.and_hms_opt(0, 0, 0).expect("valid time");
    TimeRange::new(
        DateTime::<Utc>::from_naive_utc_and_offset(start, Utc),
        DateTime::<Utc>::from_naive_utc_and_offset(end, Utc),
    )
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        Pattern {
            regex: Regex::new(r"(?i)\bbetween\s+(.+?)\s+and\s+(.+?)\b").unwrap(),
            resolve: |_caps, now| TimeRange::new(now - Duration::days(7), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bfrom\s+(.+?)\s+to\s+(.+?)\b").unwrap(),
            resolve: |_caps, now| TimeRange::new(now - Duration::days(7), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bsince\s+(\S.*)").unwrap(),
            resolve: |_caps, now| TimeRange::new(now - Duration::days(30), now),
        },
        Pattern {
            // checked before the generic "before X" pattern: text like
            // "weekend before last" must not be swallowed by it.
            regex: Regex::new(r"(?i)\b(?:the\s+)?weekend\s+before\s+last\b").unwrap(),
            resolve: |_caps, now| weekend_range(now, 2),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bbefore\s+(\S.*)").unwrap(),
            resolve: |_caps, now| TimeRange::new(DateTime::<Utc>::from_timestamp(0, 0).unwrap(), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bafter\s+(\S.*)").unwrap(),
            resolve: |_caps, now| TimeRange::new(now, now + Duration::days(365 * 10)),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bin\s+the\s+(?:last|past)\s+(\d+)\s+(day|week|month|year|hour|minute)s?\b")
                .unwrap(),
            resolve: |caps, now| {
                let n: i64 = caps[1].parse().unwrap_or(1);
                let unit = &caps[2];
                TimeRange::new(now - unit_to_duration(n, unit), now)
            },
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(\d+|[a-z]+)\s+weekends?\s+ago\b").unwrap(),
            resolve: |caps, now| {
                let n = word_to_number(&caps[1]).unwrap_or(1);
                weekend_range(now, n)
            },
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(?:a\s+)?few\s+(day|week|month|year|hour|minute)s?\s+ago\b")
                .unwrap(),
            resolve: |caps, now| TimeRange::new(now - unit_to_duration(3, &caps[1]), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\bseveral\s+(day|week|month|year|hour|minute)s?\s+ago\b")
                .unwrap(),
            resolve: |caps, now| TimeRange::new(now - unit_to_duration(3, &caps[1]), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(\d+)\s+(day|week|month|year|hour|minute)s?\s+ago\b")
                .unwrap(),
            resolve: |caps, now| {
                let n: i64 = caps[1].parse().unwrap_or(1);
                TimeRange::new(now - unit_to_duration(n, &caps[2]), now)
            },
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(last|this|next)\s+weekend\b").unwrap(),
            resolve: |caps, now| match &caps[1].to_ascii_lowercase()[..] {
                "last" => weekend_range(now, 1),
                "next" => weekend_range(now, -1),
                _ => weekend_range(now, 0),
            },
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(last|this|next)\s+(week|month|year|monday|tuesday|wednesday|thursday|friday|saturday|sunday)\b")
                .unwrap(),
            resolve: |caps, now| {
                let qualifier = caps[1].to_ascii_lowercase();
                let unit = caps[2].to_ascii_lowercase();
                let offset: i64 = match qualifier.as_str() {
                    "last" => -1,
                    "next" => 1,
                    _ => 0,
                };
                if let Some(weekday) = weekday_from_name(&unit) {
                    let today = now.date_naive();
                    let delta = (weekday.num_days_from_monday() as i64
                        - today.weekday().num_days_from_monday() as i64)
                        + offset * 7;
                    return day_range(today + Duration::days(delta));
                }
                match unit.as_str() {
                    "week" => TimeRange::new(
                        now + Duration::weeks(offset) - Duration::days(3),
                        now + Duration::weeks(offset) + Duration::days(4),
                    ),
                    "month" => TimeRange::new(
                        now + Duration::days(offset * 30) - Duration::days(15),
                        now + Duration::days(offset * 30) + Duration::days(15),
                    ),
                    "year" => TimeRange::new(
                        now + Duration::days(offset * 365) - Duration::days(182),
                        now + Duration::days(offset * 365) + Duration::days(183),
                    ),
                    _ => TimeRange::new(now, now),
                }
            },
        },
        Pattern {
            regex: Regex::new(r"(?i)\brecent(?:ly)?\b").unwrap(),
            resolve: |_caps, now| TimeRange::new(now - Duration::days(3), now),
        },
        Pattern {
            regex: Regex::new(r"(?i)\byesterday\b").unwrap(),
            resolve: |_caps, now| day_range((now - Duration::days(1)).date_naive()),
        },
        Pattern {
            regex: Regex::new(r"(?i)\b(?:today|tonight|this\s+morning|this\s+afternoon|this\s+evening)\b")
                .unwrap(),
            resolve: |_caps, now| day_range(now.date_naive()),
        },
        Pattern {
            regex: Regex::new(r"(?i)\blast\s+night\b").unwrap(),
            resolve: |_caps, now| day_range((now - Duration::days(1)).date_naive()),
        },
    ]
});

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 7, 28, 12, 0, 0).unwrap()
    }

    #[test]
    fn none_input_yields_no_ranges() {
        let result = parse_timeframe(TimeframeInput::None, fixed_now()).unwrap();
        assert!(result.ranges.is_empty());
    }

    #[test]
    fn date_expands_to_full_local_day() {
        let date = NaiveDate::from_ymd_opt(2026, 1, 1).unwrap();
        let result = parse_timeframe(TimeframeInput::Date(date), fixed_now()).unwrap();
        assert_eq!(result.ranges.len(), 1);
        assert_eq!(result.ranges[0].start.time().to_string(), "00:00:00");
        assert_eq!(result.ranges[0].end.time().to_string(), "23:59:59");
    }

    #[test]
    fn in_the_last_n_weeks_matches_spec_example() {
        let now = fixed_now();
        let result = parse_timeframe(
            TimeframeInput::Auto("what did we add about postgres in the last 2 weeks".into()),
            now,
        )
        .unwrap();
        assert_eq!(result.cleaned_query.as_deref(), Some("what did we add about postgres"));
        assert_eq!(result.original_expression.as_deref(), Some("in the last 2 weeks"));
        assert_eq!(result.ranges[0].start, now - Duration::days(14));
        assert_eq!(result.ranges[0].end, now);
    }

    #[test]
    fn recently_without_units_uses_three_days() {
        let now = fixed_now();
        let result = parse_timeframe(TimeframeInput::Auto("show me recent changes".into()), now).unwrap();
        assert_eq!(result.ranges[0].start, now - Duration::days(3));
    }

    #[test]
    fn few_normalizes_to_three() {
        let now = fixed_now();
        let result =
            parse_timeframe(TimeframeInput::Auto("updates from a few days ago".into()), now).unwrap();
        assert_eq!(result.ranges[0].start, now - Duration::days(3));
    }

    #[test]
    fn auto_with_no_match_yields_empty() {
        let result = parse_timeframe(TimeframeInput::Auto("what is postgres".into()), fixed_now()).unwrap();
        assert!(result.ranges.is_empty());
        assert!(result.cleaned_query.is_none());
    }

    #[test]
    fn text_with_no_match_errors() {
        let result = parse_timeframe(TimeframeInput::Text("no temporal phrase here".into()), fixed_now());
        assert!(result.is_err());
    }

    #[test]
    fn weekend_before_last_is_two_weekends_ago() {
        let now = fixed_now();
        let direct = weekend_range(now, 2);
        let result = parse_timeframe(
            TimeframeInput::Auto("notes from the weekend before last".into()),
            now,
        )
        .unwrap();
        assert_eq!(result.ranges[0], direct);
    }
}
