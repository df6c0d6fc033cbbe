use thiserror::Error;

/// Failure taxonomy for the detection pipeline.
///
/// None of these are fatal: every variant has a recovery rule at the layer
/// that observes it (empty text, rule-based fallback, skip to next cycle).
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("failed to parse message: {0}")]
    ParseFailure(String),

    #[error("model artifact unavailable: {0}")]
    ModelUnavailable(String),

    #[error("statistical classification failed: {0}")]
    ClassificationFailure(String),

    #[error("persistence write failed: {0}")]
    PersistenceFailure(String),
}

impl From<rusqlite::Error> for PipelineError {
    fn from(e: rusqlite::Error) -> Self {
        PipelineError::PersistenceFailure(e.to_string())
    }
}
