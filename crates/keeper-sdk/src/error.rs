use std::fmt;

use serde::Serialize;
use thiserror::Error;

use keeper_ledger::LedgerError;
use keeper_source::SourceError;
use keeper_types::{CanonicalPath, TypeError, VersionId};

/// Failure classes reported to API callers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    NotFound,
    InvalidInput,
    UpstreamUnavailable,
    IntegrityViolation,
    PersistenceFailure,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::InvalidInput => "invalid_input",
            Self::UpstreamUnavailable => "upstream_unavailable",
            Self::IntegrityViolation => "integrity_violation",
            Self::PersistenceFailure => "persistence_failure",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("file not tracked: {0}")]
    FileNotFound(CanonicalPath),

    #[error("version not found: v{0}")]
    VersionNotFound(VersionId),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream error: {0}")]
    Upstream(#[from] SourceError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

impl From<TypeError> for VaultError {
    fn from(error: TypeError) -> Self {
        Self::InvalidInput(error.to_string())
    }
}

impl VaultError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::FileNotFound(_) | Self::VersionNotFound(_) => ErrorKind::NotFound,
            Self::InvalidInput(_) => ErrorKind::InvalidInput,
            Self::Upstream(SourceError::InvalidScope(_) | SourceError::InvalidPattern { .. }) => {
                ErrorKind::InvalidInput
            }
            Self::Upstream(_) => ErrorKind::UpstreamUnavailable,
            Self::Ledger(LedgerError::UnknownFile(_)) => ErrorKind::NotFound,
            Self::Ledger(LedgerError::InvalidTransition { .. }) => ErrorKind::InvalidInput,
            Self::Ledger(LedgerError::IntegrityViolation { .. }) => ErrorKind::IntegrityViolation,
            Self::Ledger(LedgerError::Persistence(_) | LedgerError::LockPoisoned) => {
                ErrorKind::PersistenceFailure
            }
        }
    }
}

pub type VaultResult<T> = Result<T, VaultError>;
