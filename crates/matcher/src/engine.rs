use crate::config::MatchConfig;
use crate::error::{MatcherError, Result};
use crate::knowledge::{raw_key, KnowledgeBase, KnowledgeEntry, KnowledgeRow, SharedKnowledgeBase};
use crate::similarity::SimilarityScorer;
use logtriage_normalizer::{CacheStats, TextNormalizer};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Which lookup strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStage {
    Exact,
    Normalized,
    Fuzzy,
    None,
}

impl MatchStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Exact => "exact",
            Self::Normalized => "normalized",
            Self::Fuzzy => "fuzzy",
            Self::None => "none",
        }
    }
}

impl std::fmt::Display for MatchStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of one lookup. `score` is `None` exactly when `stage` is [`MatchStage::None`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatchResult {
    pub stage: MatchStage,
    pub score: Option<f64>,
    pub entry: Option<Arc<KnowledgeEntry>>,
}

impl MatchResult {
    pub fn none() -> Self {
        Self {
            stage: MatchStage::None,
            score: None,
            entry: None,
        }
    }

    fn found(stage: MatchStage, score: f64, entry: Arc<KnowledgeEntry>) -> Self {
        Self {
            stage,
            score: Some(score),
            entry: Some(entry),
        }
    }

    pub fn is_match(&self) -> bool {
        self.entry.is_some()
    }
}

/// Cache counters for both memo layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EngineCacheStats {
    pub normalize: CacheStats,
    pub similarity: CacheStats,
}

/// Graduated exact → normalized → fuzzy lookup against a reloadable knowledge base.
///
/// The engine owns its caches; two engines never share memoized state. Matching is
/// `&self` and safe to call from many threads while another thread reloads.
#[derive(Debug)]
pub struct MatchEngine {
    normalizer: TextNormalizer,
    scorer: SimilarityScorer,
    knowledge: SharedKnowledgeBase,
    threshold: f64,
}

impl MatchEngine {
    pub fn new(config: MatchConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            normalizer: TextNormalizer::with_config(config.normalizer_config())?,
            scorer: SimilarityScorer::new(config.similarity_cache_capacity),
            knowledge: SharedKnowledgeBase::default(),
            threshold: config.fuzzy_threshold,
        })
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn normalizer(&self) -> &TextNormalizer {
        &self.normalizer
    }

    /// Build a knowledge base with this engine's normalizer without installing it.
    pub fn build_knowledge<I>(&self, rows: I) -> KnowledgeBase
    where
        I: IntoIterator<Item = KnowledgeRow>,
    {
        KnowledgeBase::build(rows, &self.normalizer)
    }

    /// Build from rows and atomically swap in the result.
    pub fn load<I>(&self, rows: I) -> Arc<KnowledgeBase>
    where
        I: IntoIterator<Item = KnowledgeRow>,
    {
        let kb = self.build_knowledge(rows);
        self.install(kb)
    }

    /// Swap in an already built knowledge base, returning the previous snapshot.
    pub fn install(&self, kb: KnowledgeBase) -> Arc<KnowledgeBase> {
        self.knowledge.replace(kb)
    }

    pub fn load_json_file(&self, path: &Path) -> Result<Arc<KnowledgeBase>> {
        let kb = KnowledgeBase::from_json_file(path, &self.normalizer)?;
        Ok(self.install(kb))
    }

    pub fn knowledge(&self) -> Arc<KnowledgeBase> {
        self.knowledge.snapshot()
    }

    pub fn normalize(&self, text: &str) -> String {
        self.normalizer.normalize(text)
    }

    /// Match against the installed knowledge base at the configured threshold.
    pub fn match_text(&self, text: &str) -> MatchResult {
        let kb = self.knowledge.snapshot();
        self.match_in(text, &kb, self.threshold)
    }

    /// Match against an explicit knowledge base and threshold.
    ///
    /// `kb` must have been built with a normalizer configured like this engine's.
    pub fn match_in(&self, text: &str, kb: &KnowledgeBase, threshold: f64) -> MatchResult {
        if kb.is_empty() || text.trim().is_empty() {
            return MatchResult::none();
        }

        if let Some(entry) = kb.lookup_raw(text) {
            log::trace!("exact match for {text:?}");
            return MatchResult::found(MatchStage::Exact, 1.0, Arc::clone(entry));
        }

        let normalized = self.normalizer.normalize(text);
        if normalized.is_empty() {
            return MatchResult::none();
        }

        if let Some(entry) = kb.lookup_normalized(&normalized) {
            log::trace!("normalized match for {text:?}");
            return MatchResult::found(MatchStage::Normalized, 1.0, Arc::clone(entry));
        }

        let query = normalized.to_lowercase();
        let mut best: Option<(f64, &Arc<KnowledgeEntry>)> = None;
        for entry in kb.entries() {
            let score = self.scorer.similarity(&query, entry.fuzzy_key());
            // Strictly greater keeps the earliest entry among equal scores.
            if best.map_or(true, |(top, _)| score > top) {
                best = Some((score, entry));
            }
        }

        match best {
            Some((score, entry)) if score >= threshold => {
                log::trace!("fuzzy match for {text:?} at {score:.3}");
                MatchResult::found(MatchStage::Fuzzy, score, Arc::clone(entry))
            }
            Some((score, _)) => {
                log::trace!("no match for {text:?}, best fuzzy score {score:.3}");
                MatchResult::none()
            }
            None => MatchResult::none(),
        }
    }

    /// Case-insensitive, trimmed equality of `text` and `pattern`.
    pub fn match_exact(&self, text: &str, pattern: &str) -> bool {
        let key = raw_key(text);
        !key.is_empty() && key == raw_key(pattern)
    }

    /// Equality of normalized forms. Two inputs that normalize to nothing do not match.
    pub fn match_normalized(&self, text: &str, pattern: &str) -> bool {
        let left = self.normalizer.normalize(text).to_lowercase();
        !left.is_empty() && left == self.normalizer.normalize(pattern).to_lowercase()
    }

    /// Similarity of normalized forms and whether it reaches `threshold`.
    pub fn match_fuzzy(&self, text: &str, pattern: &str, threshold: f64) -> (bool, f64) {
        let left = self.normalizer.normalize(text).to_lowercase();
        if left.is_empty() {
            return (false, 0.0);
        }
        let right = self.normalizer.normalize(pattern).to_lowercase();
        let score = self.scorer.similarity(&left, &right);
        (score >= threshold, score)
    }

    pub fn clear_caches(&self) {
        self.normalizer.clear_cache();
        self.scorer.clear_cache();
    }

    pub fn cache_stats(&self) -> EngineCacheStats {
        EngineCacheStats {
            normalize: self.normalizer.cache_stats(),
            similarity: self.scorer.cache_stats(),
        }
    }
}

/// Parse a threshold override leniently: blank or unparseable input is ignored and
/// finite values are clamped into `[0, 1]`.
pub fn parse_threshold(raw: &str) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    value.is_finite().then(|| value.clamp(0.0, 1.0))
}

/// Validate a caller-supplied threshold.
pub fn checked_threshold(threshold: f64) -> Result<f64> {
    if (0.0..=1.0).contains(&threshold) {
        Ok(threshold)
    } else {
        Err(MatcherError::invalid_config(format!(
            "threshold ({threshold}) must be within [0, 1]"
        )))
    }
}
