//! Tag normalization (§4.6), timeframe parsing (§4.7), and proposition
//! parsing (§4.8) — the three small, pure text-metadata transforms the
//! enrichment DAG and query orchestrator lean on. Each is a function of
//! its string input alone: no I/O, no shared state, no clock reliance
//! beyond the `now` the timeframe parser is explicitly handed.

pub mod proposition;
pub mod tag;
pub mod timeframe;

pub use crate::proposition::{parse_propositions, PropositionInput};
pub use crate::tag::{hierarchy_chain, normalize_tag, normalize_tags, TagNode};
pub use crate::timeframe::{parse_timeframe, ParsedTimeframe, TimeRange, TimeframeError, TimeframeInput};
