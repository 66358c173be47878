use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde_json::json;
use thiserror::Error;

use keeper_scan::ScanError;
use keeper_sdk::{ErrorKind, VaultError};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error(transparent)]
    Vault(#[from] VaultError),

    #[error("scan failed: {0}")]
    Scan(#[from] ScanError),

    #[error("no scanner is running in this process")]
    ScannerDisabled,

    #[error("no route for {0}")]
    NoRoute(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Vault(e) => match e.kind() {
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::InvalidInput => StatusCode::BAD_REQUEST,
                ErrorKind::UpstreamUnavailable => StatusCode::BAD_GATEWAY,
                ErrorKind::IntegrityViolation | ErrorKind::PersistenceFailure => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            Self::NoRoute(_) => StatusCode::NOT_FOUND,
            Self::ScannerDisabled => StatusCode::SERVICE_UNAVAILABLE,
            Self::Scan(_) | Self::Io(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            Self::Vault(e) => e.kind().as_str(),
            Self::Scan(ScanError::Ledger(_)) => ErrorKind::PersistenceFailure.as_str(),
            Self::NoRoute(_) => ErrorKind::NotFound.as_str(),
            Self::ScannerDisabled => "scanner_disabled",
            Self::Scan(_) | Self::Io(_) | Self::Internal(_) => "internal",
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        } else {
            tracing::debug!(error = %self, "request rejected");
        }
        let body = Json(json!({
            "error": self.code(),
            "message": self.to_string(),
        }));
        (status, body).into_response()
    }
}

pub type ServerResult<T> = Result<T, ServerError>;
