use crate::error::{MatcherError, Result};
use logtriage_normalizer::{NormalizerConfig, DEFAULT_CACHE_CAPACITY};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Minimum similarity for a fuzzy match to be accepted
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.85;

/// Engine configuration. Threshold and cache sizes are the only recognized options.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct MatchConfig {
    /// Fuzzy stage acceptance threshold in `[0, 1]`
    pub fuzzy_threshold: f64,

    /// Memoized normalizations (0 disables)
    pub normalize_cache_capacity: usize,

    /// Memoized similarity ratios (0 disables)
    pub similarity_cache_capacity: usize,
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            normalize_cache_capacity: DEFAULT_CACHE_CAPACITY,
            similarity_cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl MatchConfig {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            fuzzy_threshold: threshold,
            ..Default::default()
        }
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.fuzzy_threshold) {
            return Err(MatcherError::invalid_config(format!(
                "fuzzy_threshold ({}) must be within [0, 1]",
                self.fuzzy_threshold
            )));
        }
        self.normalizer_config().validate()?;
        NormalizerConfig::with_cache_capacity(self.similarity_cache_capacity).validate()?;
        Ok(())
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig::with_cache_capacity(self.normalize_cache_capacity)
    }
}
