use keeper_types::CanonicalPath;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    /// Enumeration, fetch, or upload failed upstream. Retrying later may succeed.
    #[error("upstream unavailable ({target}): {reason}")]
    Unavailable { target: String, reason: String },

    #[error("object not found: {0}")]
    NotFound(CanonicalPath),

    #[error("invalid scope: {0}")]
    InvalidScope(String),

    #[error("invalid glob pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SourceError {
    pub(crate) fn unavailable(target: impl ToString, reason: impl ToString) -> Self {
        Self::Unavailable {
            target: target.to_string(),
            reason: reason.to_string(),
        }
    }
}

pub type SourceResult<T> = Result<T, SourceError>;
