use crate::cache::{CacheStats, MemoCache};
use crate::count::{CountPrefix, CountPrefixStripper};
use crate::error::{NormalizerError, Result};
use crate::paths::PathGeneralizer;
use crate::rules::{RuleSet, GENERIC_RULES, TEMPLATE_RULES};
use serde::{Deserialize, Serialize};

/// Default number of memoized normalizations
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

/// Upper bound on cascade passes; every marker is stripped within one pass, so real
/// inputs settle in two.
const MAX_PASSES: usize = 8;

/// Configuration for [`TextNormalizer`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    /// Maximum memoized inputs (0 disables the cache)
    pub cache_capacity: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

impl NormalizerConfig {
    pub fn with_cache_capacity(cache_capacity: usize) -> Self {
        Self { cache_capacity }
    }

    pub fn validate(&self) -> Result<()> {
        // Guards against nonsense like usize::MAX from a bad config file.
        if self.cache_capacity > 1 << 24 {
            return Err(NormalizerError::invalid_config(format!(
                "cache_capacity ({}) is unreasonably large",
                self.cache_capacity
            )));
        }
        Ok(())
    }
}

/// Canonicalizes error text into the key used for deduplication and knowledge lookup.
///
/// One pass runs, in order:
/// 1. count-prefix removal (`17x ...`, `9x similar to '...'`)
/// 2. structural templates from [`TEMPLATE_RULES`]
/// 3. [`PathGeneralizer`]
/// 4. generic leftovers from [`GENERIC_RULES`] plus whitespace collapse
///
/// Passes repeat until the text stops changing, which makes the result idempotent even
/// when one stage exposes a shape an earlier stage recognizes. Results are memoized per
/// exact input.
#[derive(Debug)]
pub struct TextNormalizer {
    count_prefix: CountPrefixStripper,
    templates: RuleSet,
    paths: PathGeneralizer,
    generic: RuleSet,
    cache: MemoCache<String, String>,
}

impl TextNormalizer {
    pub fn new() -> Result<Self> {
        Self::with_config(NormalizerConfig::default())
    }

    pub fn with_config(config: NormalizerConfig) -> Result<Self> {
        config.validate()?;
        let normalizer = Self {
            count_prefix: CountPrefixStripper::new()?,
            templates: RuleSet::compile(TEMPLATE_RULES)?,
            paths: PathGeneralizer::new()?,
            generic: RuleSet::compile(GENERIC_RULES)?,
            cache: MemoCache::new(config.cache_capacity),
        };
        log::debug!(
            "Normalizer ready: {} template rules, {} path rules, {} generic rules, cache capacity {}",
            normalizer.templates.len(),
            normalizer.paths.rules().len(),
            normalizer.generic.len(),
            config.cache_capacity
        );
        Ok(normalizer)
    }

    /// Normalized form of `text`. Never fails; may return an empty string.
    #[must_use]
    pub fn normalize(&self, text: &str) -> String {
        self.cache
            .get_or_insert_with(text, || self.normalize_uncached(text))
    }

    /// Normalize raw bytes, replacing invalid UTF-8 sequences first.
    #[must_use]
    pub fn normalize_lossy(&self, bytes: &[u8]) -> String {
        self.normalize(&String::from_utf8_lossy(bytes))
    }

    #[must_use]
    pub fn normalize_uncached(&self, text: &str) -> String {
        let mut current = self.pass(text);
        for passes in 1..MAX_PASSES {
            let next = self.pass(&current);
            if next == current {
                return current;
            }
            if passes + 1 == MAX_PASSES {
                log::trace!("normalization did not settle after {MAX_PASSES} passes: {text:?}");
            }
            current = next;
        }
        current
    }

    fn pass(&self, text: &str) -> String {
        let body = self.count_prefix.strip(text).trim();
        let templated = self.templates.apply(body);
        let generalized = self.paths.generalize(&templated);
        self.generic.apply(&generalized).trim().to_string()
    }

    /// Split off the repetition marker without normalizing the rest.
    pub fn count_prefix<'a>(&self, text: &'a str) -> CountPrefix<'a> {
        self.count_prefix.split(text)
    }

    pub fn generalizer(&self) -> &PathGeneralizer {
        &self.paths
    }

    pub fn templates(&self) -> &RuleSet {
        &self.templates
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    fn normalizer() -> TextNormalizer {
        TextNormalizer::new().expect("builtin rules compile")
    }

    #[test]
    fn count_prefix_variants_share_a_key() {
        let n = normalizer();
        assert_eq!(n.normalize("17x Connection failed"), n.normalize("Connection failed"));
        assert_eq!(n.normalize("9x similar to 'End of file'"), n.normalize("End of file"));
        assert_eq!(n.normalize("123 x Network timeout"), "Network timeout");
    }

    #[test]
    fn drive_paths_generalize_inside_messages() {
        let n = normalizer();
        assert_eq!(
            n.normalize(r"loading 'D:\a\b.mp4' failed"),
            "loading '<DRIVE_PATH>' failed"
        );
        assert_eq!(
            n.normalize(r"loading 'C:\x\y.mp4' failed"),
            "loading '<DRIVE_PATH>' failed"
        );
    }

    #[test]
    fn quoted_paths_with_spaces_share_a_key() {
        let n = normalizer();
        let renders = n.normalize(r"loading 'E:\Renders Final\b.mov' failed");
        assert_eq!(renders, n.normalize(r"loading 'D:\My Media\a.mov' failed"));
        assert_eq!(renders, "loading '<DRIVE_PATH>' failed");
        assert_eq!(
            n.normalize(r"open '\\nas\Shared Media\clip.mov' failed"),
            "open '<UNC_PATH>' failed"
        );
    }

    #[test]
    fn stacked_and_nested_markers_collapse() {
        let n = normalizer();
        let stacked = format!("{}Connection failed", "1x ".repeat(10));
        assert_eq!(n.normalize(&stacked), "Connection failed");

        let nested = (1..=10).fold("End of file".to_string(), |inner, count| {
            format!("{count}x similar to '{inner}'")
        });
        let once = n.normalize(&nested);
        assert_eq!(once, "End of file");
        assert_eq!(n.normalize(&once), once);
    }

    #[test]
    fn unc_path_alone() {
        let n = normalizer();
        assert_eq!(n.normalize(r"\\192.168.1.5\share\f.mov"), "<UNC_PATH>");
        assert_eq!(
            n.normalize(r"Error on \\192.168.1.5\share"),
            n.normalize(r"Error on \\10.0.0.1\data")
        );
    }

    #[test]
    fn structural_templates() {
        let n = normalizer();
        let cases = [
            (
                r"transferring file from 'D:\Projects\Logs\192.168.210.2_preview.log' to '<bundling>D:\Projects\Logs\192.168.210.2_preview.log' failed: copying failed (LocalHost: error reading src file)",
                "transferring file from '<SOURCE>' to '<DEST>' failed: <ERROR>",
            ),
            (
                "transferring file from 'SHM/warp_24984_104.pfm' to 'srv://192.168.210.2/SHM/warp_24984_104.pfm' failed",
                "transferring file from '<SOURCE>' to '<DEST>' failed: <ERROR>",
            ),
            (
                r"loading '<?>\\10.0.0.10\share_0\cms-media\LOOP_5476x1416.mov' failed: opening file '\\10.0.0.10\share_0\cms-media\LOOP_5476x1416.mov' failed",
                "loading '<FILE>' failed: opening file '<FILE>' failed",
            ),
            (
                "error while enumerating Data/...* : The network path was not found. (53)",
                "error while enumerating <PATH> : <ERROR>",
            ),
            (
                r"decoding 'Data/...%3A\Delivery\STILLS\DP1_STILL.jpg' failed",
                "decoding '<FILE>' failed: <ERROR>",
            ),
            (
                r#"create_directories: The system cannot find the path specified.: "Content/...""#,
                "create_directories: <ERROR>",
            ),
            (
                r#"directory_iterator::directory_iterator: The system cannot find the path specified.: "Data/...""#,
                "directory_iterator: <ERROR>",
            ),
            (
                r"authenticating on '\\10.0.0.6\share_0' failed: Multiple connections to a server are not allowed.",
                "authenticating on '<PATH>' failed: <ERROR>",
            ),
            (
                "updating render task failed: importing semaphore failed",
                "updating render task failed: <ERROR>",
            ),
            (
                "encoding frame failed: software scaling failed",
                "encoding frame failed: <ERROR>",
            ),
            (
                "assertion 'referenced' failed in graph::GraphImpl::create_referenced_node",
                "assertion failed in <LOCATION>",
            ),
            (
                "loading module 'ModDatapath' failed: linking shared object failed",
                "loading module failed: <ERROR>",
            ),
            (
                "invalid projection matrix (LRTB: -nan(ind), -nan(ind), -nan(ind), -nan(ind) / Z-NF: 10, 5e+13)",
                "invalid projection matrix",
            ),
            (
                "automatically reloaded texture 'srv:Data/.../*.pfm' disappeared",
                "automatically reloaded texture disappeared",
            ),
            (
                "display sync timed out (10.0.0.3 / Output 1)",
                "display sync timed out",
            ),
        ];

        for (input, expected) in cases {
            assert_eq!(n.normalize(input), expected, "input: {input}");
        }
    }

    #[test]
    fn similar_to_collapses_with_its_plain_form() {
        let n = normalizer();
        assert_eq!(
            n.normalize("335x similar to 'invalid projection matrix (LRTB: -0.04, -0.04, 0, 0 / Z-NF: 10, 5e+13)'"),
            n.normalize("invalid projection matrix (LRTB: 0, 0, 0, 0 / Z-NF: 10, 5e+13)")
        );
    }

    #[test]
    fn span_rules_and_leftovers() {
        let n = normalizer();
        assert_eq!(
            n.normalize("signal lost on Output 3"),
            "signal lost on Output <NUM>"
        );
        assert_eq!(
            n.normalize("panic in engine::render::graph::Node::build"),
            "panic in Node::build"
        );
        assert_eq!(
            n.normalize("session 3f2504e0-4f89-11d3-9a0c-0305e82c3301 expired at 0x7ffde000"),
            "session <GUID> expired at <ADDR>"
        );
        assert_eq!(n.normalize("  spaced \t out\nmessage  "), "spaced out message");
    }

    #[test]
    fn total_on_odd_input() {
        let n = normalizer();
        assert_eq!(n.normalize(""), "");
        assert_eq!(n.normalize("   "), "");
        assert_eq!(n.normalize("17x "), "");
        assert_eq!(n.normalize_lossy(b"bad \xff byte"), "bad \u{fffd} byte");
    }

    #[test]
    fn cache_is_keyed_by_exact_input() {
        let n = normalizer();
        let _ = n.normalize("Connection failed");
        let _ = n.normalize("Connection failed");
        let _ = n.normalize("connection failed");

        let stats = n.cache_stats();
        assert_eq!(stats.len, 2);
        assert_eq!(stats.hits, 1);

        n.clear_cache();
        assert_eq!(n.cache_stats().len, 0);
    }

    #[test]
    fn disabled_cache_gives_identical_output() {
        let cached = normalizer();
        let uncached =
            TextNormalizer::with_config(NormalizerConfig::with_cache_capacity(0)).expect("build");
        let input = r"17x loading 'D:\media\clip.mov' failed on 10.0.0.5";
        assert_eq!(cached.normalize(input), uncached.normalize(input));
        assert_eq!(uncached.cache_stats().len, 0);
    }

    #[test]
    fn rejects_absurd_cache_capacity() {
        let err = TextNormalizer::with_config(NormalizerConfig::with_cache_capacity(usize::MAX))
            .unwrap_err();
        assert!(matches!(err, NormalizerError::InvalidConfig(_)));
    }

    proptest! {
        #[test]
        fn proptest_normalize_is_idempotent(
            prefix in prop::sample::select(vec!["", "17x ", "3 x ", "9x similar to "]),
            body in r#"[a-zA-Z0-9:\\/.%' <>()_\-]{0,48}"#,
        ) {
            let n = normalizer();
            let text = format!("{prefix}{body}");
            let once = n.normalize(&text);
            prop_assert_eq!(n.normalize(&once), once);
        }

        #[test]
        fn proptest_stacked_markers_are_idempotent(
            markers in prop::collection::vec((1u32..1000, any::<bool>()), 0..20),
            body in r#"[a-zA-Z0-9:\\/.%' <>()_\-]{0,48}"#,
            plain in "[A-Za-z][A-Za-z ]{0,30}[A-Za-z]",
        ) {
            let n = normalizer();
            let wrap = |text: &str| {
                markers.iter().fold(text.to_string(), |inner, &(count, nested)| {
                    if nested {
                        format!("{count}x similar to '{inner}'")
                    } else {
                        format!("{count}x {inner}")
                    }
                })
            };

            let once = n.normalize(&wrap(&body));
            prop_assert_eq!(n.normalize(&once), once);
            prop_assert_eq!(n.normalize(&wrap(&plain)), n.normalize(&plain));
        }

        #[test]
        fn proptest_count_prefix_is_transparent(
            count in 1u32..100_000u32,
            body in "[A-Za-z][A-Za-z ]{0,30}[A-Za-z]",
        ) {
            let n = normalizer();
            let marked = format!("{count}x {body}");
            prop_assert_eq!(n.normalize(&marked), n.normalize(&body));
        }

        #[test]
        fn proptest_unc_never_tagged_as_drive(
            host in "[a-z0-9]{1,12}",
            share in "[A-Za-z]{1,2}[$:]?",
            file in "[a-z]{1,8}",
        ) {
            let n = normalizer();
            let out = n.normalize(&format!(r"open \\{host}\{share}\{file}.mov"));
            prop_assert!(!out.contains("<DRIVE_PATH>"));
            prop_assert!(out.contains("<UNC_PATH>"));
        }
    }
}
