use crate::error::{NormalizerError, Result};
use regex::Regex;

const COUNT_MARKER: &str = r"^\s*(?P<count>\d+)\s*[xX]\s+";
const SIMILAR_TO: &str = "similar to ";

/// A message split into its repetition count and the text that was repeated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountPrefix<'a> {
    /// Number of occurrences the log line stands for (1 when there is no marker).
    pub count: u64,
    /// Message with the marker removed.
    pub body: &'a str,
}

/// Recognizes `17x message` and `9x similar to 'message'` repetition markers.
#[derive(Debug, Clone)]
pub struct CountPrefixStripper {
    marker: Regex,
}

impl CountPrefixStripper {
    pub fn new() -> Result<Self> {
        let marker = Regex::new(COUNT_MARKER)
            .map_err(|err| NormalizerError::invalid_rule("count_prefix", err))?;
        Ok(Self { marker })
    }

    pub fn split<'a>(&self, text: &'a str) -> CountPrefix<'a> {
        let Some(caps) = self.marker.captures(text) else {
            return CountPrefix {
                count: 1,
                body: text,
            };
        };
        // Absurdly long counts saturate instead of failing.
        let count = caps
            .name("count")
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(u64::MAX);
        let rest = &text[caps.get(0).map_or(0, |m| m.end())..];

        let body = match rest.strip_prefix(SIMILAR_TO) {
            Some(similar) => unquote(similar.trim_end()),
            None => rest,
        };
        CountPrefix { count, body }
    }

    /// Message with every leading repetition marker removed, including markers stacked
    /// or nested inside `similar to '...'`.
    pub fn strip<'a>(&self, text: &'a str) -> &'a str {
        let mut body = text;
        // Each split that finds a marker returns a strictly shorter body.
        while self.marker.is_match(body) {
            body = self.split(body).body;
        }
        body
    }
}

fn unquote(text: &str) -> &str {
    text.strip_prefix('\'')
        .and_then(|inner| inner.strip_suffix('\''))
        .unwrap_or(text)
}
