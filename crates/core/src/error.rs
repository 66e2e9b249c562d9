//! Error types for regscout.
//!
//! A single error enum covers configuration, I/O, LLM, search backend,
//! retrieval orchestration, prompt and serialization failures.

use thiserror::Error;

/// Unified error type for regscout.
///
/// All fallible functions return `Result<T, AppError>`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O and filesystem errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// LLM provider errors
    #[error("LLM error: {0}")]
    Llm(String),

    /// A single partition search failed
    #[error("Search error: {0}")]
    Search(String),

    /// The search backend cannot be reached at all
    #[error("Search backend unavailable: {0}")]
    SearchUnavailable(String),

    /// Retrieval orchestration errors (decomposition, reasoning, assembly)
    #[error("Retrieval error: {0}")]
    Retrieval(String),

    /// Prompt system errors
    #[error("Prompt error: {0}")]
    Prompt(String),

    /// Serialization/deserialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Generic errors
    #[error("{0}")]
    Other(String),
}

impl AppError {
    /// Whether this error means no partial result is possible.
    ///
    /// Only an unreachable search backend qualifies; every other failure is
    /// recovered locally with degraded output.
    pub fn is_catastrophic(&self) -> bool {
        matches!(self, AppError::SearchUnavailable(_))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(err: serde_yaml::Error) -> Self {
        AppError::Serialization(err.to_string())
    }
}

/// Convenience type alias for Results with AppError.
pub type AppResult<T> = Result<T, AppError>;
