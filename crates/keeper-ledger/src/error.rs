use keeper_types::CanonicalPath;

/// Errors produced by ledger operations.
///
/// Lookups of unknown keys are not errors: readers return `Ok(None)`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    #[error("no tracked file at {0}")]
    UnknownFile(CanonicalPath),

    #[error("invalid transition for {path}: {reason}")]
    InvalidTransition { path: CanonicalPath, reason: String },

    #[error("integrity violation at {path}: {reason}")]
    IntegrityViolation { path: CanonicalPath, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(String),

    #[error("ledger lock poisoned")]
    LockPoisoned,
}

impl From<rusqlite::Error> for LedgerError {
    fn from(error: rusqlite::Error) -> Self {
        Self::Persistence(error.to_string())
    }
}

/// Result alias for ledger operations.
pub type LedgerResult<T> = Result<T, LedgerError>;
