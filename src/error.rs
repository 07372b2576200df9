//! Engine errors and per-result warnings.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use yaoline_config::ConfigError;

/// Errors that stop the engine from producing a result.
///
/// Every variant is a configuration problem: retrying the same call will not
/// help until the setup is fixed.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("engine not initialized: call initialize() first")]
    NotInitialized,

    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("failed to read corpus source {path}: {source}")]
    CorpusRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed corpus source: {0}")]
    CorpusFormat(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Non-fatal conditions attached to a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// The morphological analyzer failed or returned nothing; the built-in
    /// tokenizer was used instead.
    DegradedAnalysis,
    /// The input was empty or whitespace only; the default line was returned.
    EmptyInput,
}

impl std::fmt::Display for AnalysisWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DegradedAnalysis => write!(f, "degraded analysis: fallback tokenizer used"),
            Self::EmptyInput => write!(f, "empty input: default line returned"),
        }
    }
}
