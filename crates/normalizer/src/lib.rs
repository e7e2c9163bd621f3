//! # Log Triage Normalizer
//!
//! Turns free-form error strings into canonical keys, so that messages differing only in
//! paths, addresses, counts or identifiers collapse onto one error class.
//!
//! ## Architecture
//!
//! ```text
//! raw error text
//!     │
//!     ├──> CountPrefixStripper   "17x ..." / "9x similar to '...'"
//!     │
//!     ├──> TEMPLATE_RULES        known message shapes → fixed templates
//!     │
//!     ├──> PathGeneralizer       URL → UNC → URI → drive → IP → file id → hash
//!     │
//!     └──> GENERIC_RULES         GUIDs, addresses, whitespace
//!              │
//!              └──> normalized key (memoized, LRU-bounded)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use logtriage_normalizer::TextNormalizer;
//!
//! let normalizer = TextNormalizer::new().unwrap();
//! assert_eq!(
//!     normalizer.normalize(r"17x loading 'D:\media\clip.mov' failed"),
//!     "loading '<DRIVE_PATH>' failed"
//! );
//! ```

mod cache;
mod count;
mod dedup;
mod error;
mod normalizer;
mod paths;
pub mod rules;

pub use cache::{CacheStats, MemoCache};
pub use count::{CountPrefix, CountPrefixStripper};
pub use dedup::{DedupGroup, Deduplicator, ErrorRecord};
pub use error::{NormalizerError, Result};
pub use normalizer::{NormalizerConfig, TextNormalizer, DEFAULT_CACHE_CAPACITY};
pub use paths::PathGeneralizer;
pub use rules::{RewriteRule, RuleSet, RuleSpec};
