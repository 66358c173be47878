use thiserror::Error;

/// Errors produced when parsing or constructing Keeper types.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid byte length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("invalid canonical path {path:?}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid identifier: {0:?}")]
    InvalidId(String),

    #[error("unknown change kind: {0:?}")]
    UnknownChangeKind(String),
}
