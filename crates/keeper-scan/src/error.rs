use keeper_ledger::LedgerError;
use keeper_source::SourceError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("source error: {0}")]
    Source(#[from] SourceError),

    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("invalid scanner configuration: {0}")]
    InvalidConfig(String),

    #[error("scan task failed: {0}")]
    Task(String),
}

pub type ScanResult<T> = Result<T, ScanError>;
