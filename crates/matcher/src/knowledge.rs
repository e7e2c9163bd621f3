use crate::error::Result;
use logtriage_normalizer::TextNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

/// One knowledge row as supplied by storage, with every accepted header spelling.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KnowledgeRow {
    #[serde(
        default,
        alias = "error_text",
        alias = "Type/Source",
        alias = "error",
        alias = "Pattern"
    )]
    pub pattern: Option<String>,
    #[serde(default, alias = "Cause")]
    pub cause: Option<String>,
    #[serde(default, alias = "Solution")]
    pub solution: Option<String>,
    #[serde(default, alias = "Severity")]
    pub severity: Option<String>,
    #[serde(default, alias = "Fehler-Kategorie", alias = "Category")]
    pub category: Option<String>,
}

impl KnowledgeRow {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self {
            pattern: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn cause(mut self, cause: impl Into<String>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    pub fn solution(mut self, solution: impl Into<String>) -> Self {
        self.solution = Some(solution.into());
        self
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum KnowledgeFile {
    Rows(Vec<KnowledgeRow>),
    Wrapped { entries: Vec<KnowledgeRow> },
}

/// A documented error pattern. `normalized_pattern` is derived once, with the same
/// normalizer that is later applied to queries.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct KnowledgeEntry {
    pattern: String,
    normalized_pattern: String,
    cause: Option<String>,
    solution: Option<String>,
    severity: Option<String>,
    category: Option<String>,
    #[serde(skip)]
    fuzzy_key: String,
}

impl KnowledgeEntry {
    /// Resolve a storage row. Rows without a usable pattern yield `None`.
    pub fn from_row(row: KnowledgeRow, normalizer: &TextNormalizer) -> Option<Self> {
        let pattern = non_blank(row.pattern)?;
        let normalized_pattern = normalizer.normalize(&pattern);
        let fuzzy_key = normalized_pattern.to_lowercase();
        Some(Self {
            pattern,
            normalized_pattern,
            cause: non_blank(row.cause),
            solution: non_blank(row.solution),
            severity: non_blank(row.severity),
            category: non_blank(row.category),
            fuzzy_key,
        })
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn normalized_pattern(&self) -> &str {
        &self.normalized_pattern
    }

    pub fn cause(&self) -> Option<&str> {
        self.cause.as_deref()
    }

    pub fn solution(&self) -> Option<&str> {
        self.solution.as_deref()
    }

    pub fn severity(&self) -> Option<&str> {
        self.severity.as_deref()
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    /// True when cause or solution is missing.
    pub fn is_partial(&self) -> bool {
        self.cause.is_none() || self.solution.is_none()
    }

    pub(crate) fn fuzzy_key(&self) -> &str {
        &self.fuzzy_key
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Key of the raw index: case-folded and trimmed.
pub(crate) fn raw_key(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Key of the normalized index: the normalized form, case-folded.
pub(crate) fn normalized_key(normalized: &str) -> String {
    normalized.to_lowercase()
}

/// Counters gathered while building a [`KnowledgeBase`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct LoadReport {
    pub loaded: usize,
    pub partial: usize,
    pub skipped_blank: usize,
    pub duplicate_raw: usize,
    pub duplicate_normalized: usize,
}

/// Immutable, fully indexed knowledge snapshot.
///
/// Both indexes point at the earliest-loaded entry for a key; later duplicates stay
/// in `entries` (and so remain visible to the fuzzy scan) but never shadow it.
#[derive(Debug, Default)]
pub struct KnowledgeBase {
    entries: Vec<Arc<KnowledgeEntry>>,
    raw_index: HashMap<String, usize>,
    normalized_index: HashMap<String, usize>,
    report: LoadReport,
}

impl KnowledgeBase {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build<I>(rows: I, normalizer: &TextNormalizer) -> Self
    where
        I: IntoIterator<Item = KnowledgeRow>,
    {
        let mut kb = Self::empty();
        for row in rows {
            let Some(entry) = KnowledgeEntry::from_row(row, normalizer) else {
                log::warn!("Skipping knowledge row without an error pattern");
                kb.report.skipped_blank += 1;
                continue;
            };
            kb.push(entry);
        }
        log::debug!(
            "Knowledge base built: {} entries ({} partial, {} blank rows skipped, {} duplicate raw keys, {} duplicate normalized keys)",
            kb.report.loaded,
            kb.report.partial,
            kb.report.skipped_blank,
            kb.report.duplicate_raw,
            kb.report.duplicate_normalized
        );
        kb
    }

    fn push(&mut self, entry: KnowledgeEntry) {
        let idx = self.entries.len();

        let raw = raw_key(&entry.pattern);
        if self.raw_index.contains_key(&raw) {
            self.report.duplicate_raw += 1;
        } else {
            self.raw_index.insert(raw, idx);
        }

        // Patterns that normalize to nothing stay reachable only through the raw index.
        let normalized = normalized_key(&entry.normalized_pattern);
        if !normalized.is_empty() {
            if self.normalized_index.contains_key(&normalized) {
                self.report.duplicate_normalized += 1;
            } else {
                self.normalized_index.insert(normalized, idx);
            }
        }

        if entry.is_partial() {
            self.report.partial += 1;
        }
        self.report.loaded += 1;
        self.entries.push(Arc::new(entry));
    }

    pub fn from_json_str(raw: &str, normalizer: &TextNormalizer) -> Result<Self> {
        let rows = match serde_json::from_str::<KnowledgeFile>(raw)? {
            KnowledgeFile::Rows(rows) | KnowledgeFile::Wrapped { entries: rows } => rows,
        };
        Ok(Self::build(rows, normalizer))
    }

    pub fn from_json_file(path: &Path, normalizer: &TextNormalizer) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        Self::from_json_str(&raw, normalizer)
    }

    pub fn entries(&self) -> &[Arc<KnowledgeEntry>] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn report(&self) -> LoadReport {
        self.report
    }

    /// Entry whose trimmed, case-folded pattern equals the trimmed, case-folded `text`.
    pub fn lookup_raw(&self, text: &str) -> Option<&Arc<KnowledgeEntry>> {
        self.raw_index
            .get(&raw_key(text))
            .map(|&idx| &self.entries[idx])
    }

    /// Entry whose normalized pattern equals `normalized` (case-insensitively).
    pub fn lookup_normalized(&self, normalized: &str) -> Option<&Arc<KnowledgeEntry>> {
        self.normalized_index
            .get(&normalized_key(normalized))
            .map(|&idx| &self.entries[idx])
    }
}

/// Knowledge base behind an atomic pointer swap.
///
/// Readers take an `Arc` snapshot and keep using it for the whole request, so a reload
/// is observed either entirely or not at all.
#[derive(Debug)]
pub struct SharedKnowledgeBase {
    current: RwLock<Arc<KnowledgeBase>>,
    generation: AtomicU64,
}

impl SharedKnowledgeBase {
    pub fn new(kb: KnowledgeBase) -> Self {
        Self {
            current: RwLock::new(Arc::new(kb)),
            generation: AtomicU64::new(0),
        }
    }

    pub fn snapshot(&self) -> Arc<KnowledgeBase> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Install a fully built knowledge base, returning the previous one.
    pub fn replace(&self, kb: KnowledgeBase) -> Arc<KnowledgeBase> {
        let next = Arc::new(kb);
        let new_len = next.len();
        let previous = {
            let mut guard = self
                .current
                .write()
                .unwrap_or_else(PoisonError::into_inner);
            std::mem::replace(&mut *guard, next)
        };
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        log::debug!(
            "Knowledge base reloaded: generation {generation}, {} -> {new_len} entries",
            previous.len()
        );
        previous
    }

    /// Number of reloads since construction.
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for SharedKnowledgeBase {
    fn default() -> Self {
        Self::new(KnowledgeBase::empty())
    }
}
