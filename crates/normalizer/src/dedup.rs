use crate::normalizer::TextNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One error line handed over by a log parser. Only `text` matters to normalization.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

impl ErrorRecord {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn severity(mut self, severity: impl Into<String>) -> Self {
        self.severity = Some(severity.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self
    }

    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// All records sharing one normalized key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DedupGroup {
    pub key: String,
    /// First record seen with this key
    pub representative: ErrorRecord,
    /// Total occurrences, honoring `17x` repetition markers
    pub occurrences: u64,
    /// Number of records folded into this group
    pub records: usize,
    /// Distinct sources in first-seen order
    pub sources: Vec<String>,
}

/// Groups records by normalized text across any number of inputs, keeping first-seen order.
pub struct Deduplicator<'n> {
    normalizer: &'n TextNormalizer,
    groups: Vec<DedupGroup>,
    index: HashMap<String, usize>,
}

impl<'n> Deduplicator<'n> {
    pub fn new(normalizer: &'n TextNormalizer) -> Self {
        Self {
            normalizer,
            groups: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Add a record. Returns `true` when it opened a new group.
    pub fn push(&mut self, record: ErrorRecord) -> bool {
        let key = self.normalizer.normalize(&record.text);
        let count = self.normalizer.count_prefix(&record.text).count.max(1);

        if let Some(&idx) = self.index.get(&key) {
            let group = &mut self.groups[idx];
            group.occurrences = group.occurrences.saturating_add(count);
            group.records += 1;
            if let Some(source) = record.source {
                if !group.sources.contains(&source) {
                    group.sources.push(source);
                }
            }
            return false;
        }

        let sources = record.source.iter().cloned().collect();
        self.index.insert(key.clone(), self.groups.len());
        self.groups.push(DedupGroup {
            key,
            representative: record,
            occurrences: count,
            records: 1,
            sources,
        });
        true
    }

    pub fn groups(&self) -> &[DedupGroup] {
        &self.groups
    }

    pub fn into_groups(self) -> Vec<DedupGroup> {
        self.groups
    }

    /// Records folded into an existing group
    pub fn duplicates(&self) -> usize {
        self.groups.iter().map(|g| g.records - 1).sum()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl Extend<ErrorRecord> for Deduplicator<'_> {
    fn extend<I: IntoIterator<Item = ErrorRecord>>(&mut self, iter: I) {
        for record in iter {
            self.push(record);
        }
    }
}
