use thiserror::Error;

/// Result type for normalizer construction
pub type Result<T> = std::result::Result<T, NormalizerError>;

/// Errors that can occur while building a normalizer.
///
/// Normalizing text never fails; these only surface while compiling rule tables
/// or validating configuration.
#[derive(Error, Debug)]
pub enum NormalizerError {
    /// A rewrite rule has a pattern the regex engine rejects
    #[error("Invalid rewrite rule '{name}': {source}")]
    InvalidRule {
        name: String,
        #[source]
        source: regex::Error,
    },

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl NormalizerError {
    /// Create an invalid rule error
    pub fn invalid_rule(name: impl Into<String>, source: regex::Error) -> Self {
        Self::InvalidRule {
            name: name.into(),
            source,
        }
    }

    /// Create an invalid config error
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
