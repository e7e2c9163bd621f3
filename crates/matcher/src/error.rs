use thiserror::Error;

pub type Result<T> = std::result::Result<T, MatcherError>;

/// Errors raised while configuring the engine or loading knowledge.
///
/// Matching itself never fails: an unmatched query yields `MatchStage::None`.
#[derive(Error, Debug)]
pub enum MatcherError {
    #[error("Normalizer error: {0}")]
    Normalizer(#[from] logtriage_normalizer::NormalizerError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid knowledge file: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
}

impl MatcherError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }
}
