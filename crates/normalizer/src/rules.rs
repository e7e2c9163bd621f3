//! Ordered rewrite tables.
//!
//! Every table is a plain slice of [`RuleSpec`] consumed front to back by [`RuleSet::apply`].
//! Each rule scans the output of the rule before it, so precedence lives in the slice order
//! and nowhere else.

use crate::error::{NormalizerError, Result};
use regex::Regex;
use std::borrow::Cow;

/// Placeholders emitted by the rule tables.
pub mod placeholder {
    pub const URL_PATH: &str = "<URL_PATH>";
    pub const UNC_PATH: &str = "<UNC_PATH>";
    pub const SRV_PATH: &str = "<SRV_PATH>";
    pub const DRIVE_PATH: &str = "<DRIVE_PATH>";
    pub const IP: &str = "<IP>";
    pub const FILE_ID: &str = "<FILE_ID>";
    pub const HASH: &str = "<HASH>";
    pub const GUID: &str = "<GUID>";
    pub const ADDR: &str = "<ADDR>";
    pub const NUM: &str = "<NUM>";
}

/// Uncompiled rule description.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleSpec {
    pub name: &'static str,
    pub pattern: &'static str,
    pub replacement: &'static str,
}

impl RuleSpec {
    pub const fn new(name: &'static str, pattern: &'static str, replacement: &'static str) -> Self {
        Self {
            name,
            pattern,
            replacement,
        }
    }
}

/// Concrete path and address shapes, most specific first.
///
/// Quoted paths are taken up to the closing quote, so paths containing spaces collapse to
/// one placeholder; the bare-token rules after them stop at whitespace. UNC must precede
/// the drive-letter rule so `\\host\c$\x` is never read as a drive path, and URIs must
/// precede the bare IP rule so a host inside a URI is consumed with it.
pub const PATH_RULES: &[RuleSpec] = &[
    RuleSpec::new(
        "quoted_url_path",
        r#"(?P<sq>')(?:<[a-z?]+>)?[^'\s][^'\n]*%[0-9A-Fa-f]{2}[^'\n]*'|(?P<dq>")(?:<[a-z?]+>)?[^"\s][^"\n]*%[0-9A-Fa-f]{2}[^"\n]*""#,
        "${sq}${dq}<URL_PATH>${sq}${dq}",
    ),
    RuleSpec::new(
        "quoted_unc_path",
        r#"(?P<sq>')(?:<[a-z?]+>)?\\\\+[^\\'\s][^'\n]*'|(?P<dq>")(?:<[a-z?]+>)?\\\\+[^\\"\s][^"\n]*""#,
        "${sq}${dq}<UNC_PATH>${sq}${dq}",
    ),
    RuleSpec::new(
        "quoted_srv_path",
        r#"(?P<sq>')(?:<[a-z?]+>)?[A-Za-z][A-Za-z0-9+.\-]*://[^'\n]*'|(?P<dq>")(?:<[a-z?]+>)?[A-Za-z][A-Za-z0-9+.\-]*://[^"\n]*""#,
        "${sq}${dq}<SRV_PATH>${sq}${dq}",
    ),
    RuleSpec::new(
        "quoted_drive_path",
        r#"(?P<sq>')(?:<[a-z?]+>)?[A-Za-z]:\\[^'\n]*'|(?P<dq>")(?:<[a-z?]+>)?[A-Za-z]:\\[^"\n]*""#,
        "${sq}${dq}<DRIVE_PATH>${sq}${dq}",
    ),
    RuleSpec::new(
        "url_path",
        r#"(?:<[a-z?]+>)?[^\s'"<>]*%[0-9A-Fa-f]{2}[^\s'"<>]*"#,
        placeholder::URL_PATH,
    ),
    RuleSpec::new(
        "unc_path",
        r#"(?:<[a-z?]+>)?\\\\[^\\\s'"<>]+(?:\\[^\s'"<>]*)?"#,
        placeholder::UNC_PATH,
    ),
    RuleSpec::new(
        "srv_path",
        r#"(?:<[a-z?]+>)?\b[A-Za-z][A-Za-z0-9+.\-]*://[^\s'"<>]*"#,
        placeholder::SRV_PATH,
    ),
    RuleSpec::new(
        "drive_path",
        r#"(?:<[a-z?]+>)?\b[A-Za-z]:\\[^\s'"<>]*"#,
        placeholder::DRIVE_PATH,
    ),
    RuleSpec::new(
        "ip",
        r"\b(?:\d{1,3}\.){3}\d{1,3}(?::\d{1,5})?\b",
        placeholder::IP,
    ),
    RuleSpec::new("file_id", r"\b\d{14,}\b", placeholder::FILE_ID),
    RuleSpec::new("hash", r"\b[0-9A-Fa-f]{16,}\b", placeholder::HASH),
];

/// Known error shapes. Anchored templates come first and replace the whole message; the
/// two span rules at the end rewrite fragments in place.
pub const TEMPLATE_RULES: &[RuleSpec] = &[
    RuleSpec::new(
        "transfer_from_to",
        r"(?s)^transferring file from '[^']*' to '[^']*' failed(?::.*)?$",
        "transferring file from '<SOURCE>' to '<DEST>' failed: <ERROR>",
    ),
    RuleSpec::new(
        "transfer_from",
        r"(?s)^transferring file from '[^']*' failed(?::.*)?$",
        "transferring file from '<SOURCE>' failed",
    ),
    RuleSpec::new(
        "loading_opening_file",
        r"(?s)^loading '[^']*' failed: opening file '[^']*' failed$",
        "loading '<FILE>' failed: opening file '<FILE>' failed",
    ),
    RuleSpec::new(
        "loading_module",
        r"(?s)^loading module '[^']*' failed: .*$",
        "loading module failed: <ERROR>",
    ),
    RuleSpec::new(
        "enumerating",
        r"(?s)^error while enumerating .*? : .*$",
        "error while enumerating <PATH> : <ERROR>",
    ),
    RuleSpec::new(
        "decoding",
        r"(?s)^decoding '[^']*' failed(?::.*)?$",
        "decoding '<FILE>' failed: <ERROR>",
    ),
    RuleSpec::new(
        "create_directories",
        r"(?s)^create_directories: .*$",
        "create_directories: <ERROR>",
    ),
    RuleSpec::new(
        "directory_iterator",
        r"(?s)^directory_iterator(?:::directory_iterator)?: .*$",
        "directory_iterator: <ERROR>",
    ),
    RuleSpec::new(
        "authenticating",
        r"(?s)^authenticating on '[^']*' failed(?::.*)?$",
        "authenticating on '<PATH>' failed: <ERROR>",
    ),
    RuleSpec::new(
        "render_task",
        r"(?s)^updating render task failed: .*$",
        "updating render task failed: <ERROR>",
    ),
    RuleSpec::new(
        "encoding_frame",
        r"(?s)^encoding frame failed: .*$",
        "encoding frame failed: <ERROR>",
    ),
    RuleSpec::new(
        "assertion",
        r"(?s)^assertion '[^']*' failed in .*$",
        "assertion failed in <LOCATION>",
    ),
    RuleSpec::new(
        "projection_matrix",
        r"(?s)^invalid projection matrix \(.*\)$",
        "invalid projection matrix",
    ),
    RuleSpec::new(
        "texture_disappeared",
        r"(?s)^automatically reloaded texture '[^']*' disappeared$",
        "automatically reloaded texture disappeared",
    ),
    RuleSpec::new(
        "display_sync",
        r"(?s)^display sync timed out \(.*\)$",
        "display sync timed out",
    ),
    RuleSpec::new(
        "numbered_channel",
        r"(?i)\b(?P<name>output|channel|layer|module|port|display|screen|device|track|slot)(?:\s*#\s*|\s+)?\d+(?P<tail>[^\w.]|$)",
        "${name} <NUM>${tail}",
    ),
    RuleSpec::new(
        "namespace_path",
        r"\b(?:[A-Za-z_][A-Za-z0-9_]*::)+(?P<tail>[A-Za-z_][A-Za-z0-9_]*::[A-Za-z_][A-Za-z0-9_]*)\b",
        "${tail}",
    ),
];

/// Leftovers that survive templates and path generalization.
pub const GENERIC_RULES: &[RuleSpec] = &[
    RuleSpec::new(
        "guid",
        r"\b[0-9A-Fa-f]{8}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{4}-[0-9A-Fa-f]{12}\b",
        placeholder::GUID,
    ),
    RuleSpec::new("address", r"\b0[xX][0-9A-Fa-f]+\b", placeholder::ADDR),
    RuleSpec::new("whitespace", r"\s+", " "),
];

/// A compiled rule: every match of `pattern` is replaced with `replacement`.
#[derive(Debug, Clone)]
pub struct RewriteRule {
    name: &'static str,
    pattern: Regex,
    replacement: &'static str,
}

impl RewriteRule {
    pub fn compile(spec: &RuleSpec) -> Result<Self> {
        let pattern =
            Regex::new(spec.pattern).map_err(|err| NormalizerError::invalid_rule(spec.name, err))?;
        Ok(Self {
            name: spec.name,
            pattern,
            replacement: spec.replacement,
        })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.pattern.is_match(text)
    }

    pub fn apply<'t>(&self, text: &'t str) -> Cow<'t, str> {
        self.pattern.replace_all(text, self.replacement)
    }
}

/// An ordered, compiled rule table.
#[derive(Debug, Clone)]
pub struct RuleSet {
    rules: Vec<RewriteRule>,
}

impl RuleSet {
    pub fn compile(specs: &[RuleSpec]) -> Result<Self> {
        let rules = specs
            .iter()
            .map(RewriteRule::compile)
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { rules })
    }

    /// Run every rule in order, each over the previous rule's output.
    pub fn apply(&self, text: &str) -> String {
        let mut current = text.to_string();
        for rule in &self.rules {
            let rewritten = match rule.apply(&current) {
                Cow::Borrowed(_) => continue,
                Cow::Owned(rewritten) => rewritten,
            };
            current = rewritten;
        }
        current
    }

    pub fn rules(&self) -> &[RewriteRule] {
        &self.rules
    }

    pub fn get(&self, name: &str) -> Option<&RewriteRule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
