//! # Log Triage Matcher
//!
//! Looks up a canonical cause/solution for an error string in a curated knowledge base.
//!
//! Lookup is graduated and stops at the first stage that yields an entry:
//!
//! 1. **Exact**: trimmed, case-folded equality with a stored pattern (hash lookup)
//! 2. **Normalized**: equality of normalized forms (hash lookup)
//! 3. **Fuzzy**: linear scan scoring block-matching similarity, accepted at or above the
//!    configured threshold
//!
//! ## Example
//!
//! ```rust
//! use logtriage_matcher::{KnowledgeRow, MatchConfig, MatchEngine, MatchStage};
//!
//! let engine = MatchEngine::new(MatchConfig::default()).unwrap();
//! engine.load([KnowledgeRow::new("Connection failed").cause("Network down")]);
//!
//! let result = engine.match_text("17x Connection failed");
//! assert_eq!(result.stage, MatchStage::Normalized);
//! assert_eq!(result.score, Some(1.0));
//! ```

mod config;
mod engine;
mod error;
mod knowledge;
mod similarity;

pub use config::{MatchConfig, DEFAULT_FUZZY_THRESHOLD};
pub use engine::{
    checked_threshold, parse_threshold, EngineCacheStats, MatchEngine, MatchResult, MatchStage,
};
pub use error::{MatcherError, Result};
pub use knowledge::{
    KnowledgeBase, KnowledgeEntry, KnowledgeRow, LoadReport, SharedKnowledgeBase,
};
pub use similarity::{ratio, SimilarityScorer};
