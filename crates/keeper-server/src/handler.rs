use axum::extract::{Path, State};
use axum::response::Json;
use serde::Serialize;
use serde_json::{json, Value};

use keeper_scan::CycleReport;
use keeper_sdk::{
    CanonicalPath, FileSummary, SplitRow, TrackedFile, Vault, VaultResult, VersionDiff, VersionId,
    VersionView,
};

use crate::error::{ServerError, ServerResult};
use crate::state::AppState;

/// A file route, decoded from the path tail after `/api/files/`.
///
/// Canonical paths contain `/`, so the operation is recognised by its
/// suffix. A suffix only counts when what precedes it is a valid canonical
/// path; otherwise the whole tail is taken as the file path.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileRoute {
    File(CanonicalPath),
    Versions(CanonicalPath),
    Version(CanonicalPath, VersionId),
    Diff(CanonicalPath, VersionId, VersionId),
    Restore(CanonicalPath, VersionId),
}

impl FileRoute {
    /// Decode a `GET` tail.
    pub fn parse_get(tail: &str) -> ServerResult<Self> {
        let tail = tail.trim_matches('/');
        let parts: Vec<&str> = tail.split('/').collect();
        let n = parts.len();

        if n >= 4 && parts[n - 1] == "versions" {
            if let Some(path) = prefix_path(&parts[..n - 1]) {
                return Ok(Self::Versions(path));
            }
        }
        if n >= 5 && parts[n - 2] == "versions" {
            if let Some(path) = prefix_path(&parts[..n - 2]) {
                return Ok(Self::Version(path, version_id(parts[n - 1])?));
            }
        }
        if n >= 6 && parts[n - 3] == "diff" {
            if let Some(path) = prefix_path(&parts[..n - 3]) {
                return Ok(Self::Diff(
                    path,
                    version_id(parts[n - 2])?,
                    version_id(parts[n - 1])?,
                ));
            }
        }
        Ok(Self::File(file_path(tail)?))
    }

    /// Decode a `POST` tail. Only restore is accepted.
    pub fn parse_post(tail: &str) -> ServerResult<Self> {
        let tail = tail.trim_matches('/');
        let parts: Vec<&str> = tail.split('/').collect();
        let n = parts.len();
        if n >= 5 && parts[n - 2] == "restore" {
            if let Some(path) = prefix_path(&parts[..n - 2]) {
                return Ok(Self::Restore(path, version_id(parts[n - 1])?));
            }
        }
        Err(ServerError::NoRoute(format!("POST /api/files/{tail}")))
    }
}

fn prefix_path(parts: &[&str]) -> Option<CanonicalPath> {
    CanonicalPath::parse(&parts.join("/")).ok()
}

fn file_path(s: &str) -> ServerResult<CanonicalPath> {
    CanonicalPath::parse(s).map_err(|e| ServerError::Vault(e.into()))
}

fn version_id(s: &str) -> ServerResult<VersionId> {
    s.parse::<VersionId>().map_err(|e| ServerError::Vault(e.into()))
}

/// Diff response: the diff result plus the side-by-side projection.
#[derive(Clone, Debug, Serialize)]
pub struct DiffView {
    #[serde(flatten)]
    pub diff: VersionDiff,
    pub split: Vec<SplitRow>,
}

/// Health check handler.
pub async fn health_handler() -> Json<Value> {
    Json(json!({ "status": "healthy" }))
}

/// Info handler.
pub async fn info_handler(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "name": "keeper-server",
        "version": env!("CARGO_PKG_VERSION"),
        "scanner": state.scanner.is_some(),
    }))
}

pub async fn list_files_handler(State(state): State<AppState>) -> ServerResult<Json<Vec<FileSummary>>> {
    Ok(Json(blocking(&state, |vault| vault.list_tracked_files()).await?))
}

/// `GET /api/files/*tail`
pub async fn file_get_handler(
    State(state): State<AppState>,
    Path(tail): Path<String>,
) -> ServerResult<Json<Value>> {
    let value = match FileRoute::parse_get(&tail)? {
        FileRoute::File(path) => {
            to_json::<TrackedFile>(blocking(&state, move |vault| vault.get_file(&path)).await?)?
        }
        FileRoute::Versions(path) => {
            let versions: Vec<VersionView> = blocking(&state, move |vault| vault.list_versions(&path))
                .await?
                .into_iter()
                .map(VersionView::summary)
                .collect();
            to_json(versions)?
        }
        FileRoute::Version(path, id) => {
            let version = blocking(&state, move |vault| vault.get_file_version(&path, id)).await?;
            to_json(VersionView::full(version))?
        }
        FileRoute::Diff(path, old, new) => {
            let diff =
                blocking(&state, move |vault| vault.compute_file_diff(&path, old, new)).await?;
            let split = diff.result.split_rows();
            to_json(DiffView { diff, split })?
        }
        FileRoute::Restore(..) => return Err(no_route(&tail)),
    };
    Ok(Json(value))
}

/// `POST /api/files/*tail`
pub async fn file_post_handler(
    State(state): State<AppState>,
    Path(tail): Path<String>,
) -> ServerResult<Json<Value>> {
    let FileRoute::Restore(path, id) = FileRoute::parse_post(&tail)? else {
        return Err(no_route(&tail));
    };
    let receipt = state.vault.restore(&path, id).await?;
    Ok(Json(json!({
        "success": true,
        "message": format!("restored {} to version {}", receipt.path, receipt.version),
        "path": receipt.path,
        "version": receipt.version,
        "content_hash": receipt.content_hash,
        "bytes": receipt.bytes,
    })))
}

/// `POST /api/scan`: run one cycle now and return its report.
pub async fn scan_handler(State(state): State<AppState>) -> ServerResult<Json<CycleReport>> {
    let scanner = state.scanner.ok_or(ServerError::ScannerDisabled)?;
    Ok(Json(scanner.run_cycle().await?))
}

/// Run a ledger query on the blocking pool; SQLite reads block.
async fn blocking<T, F>(state: &AppState, query: F) -> ServerResult<T>
where
    T: Send + 'static,
    F: FnOnce(&Vault) -> VaultResult<T> + Send + 'static,
{
    let vault = state.vault.clone();
    tokio::task::spawn_blocking(move || query(&vault))
        .await
        .map_err(|e| ServerError::Internal(e.to_string()))?
        .map_err(ServerError::from)
}

fn no_route(tail: &str) -> ServerError {
    ServerError::NoRoute(format!("/api/files/{tail}"))
}

fn to_json<T: Serialize>(value: T) -> ServerResult<Value> {
    serde_json::to_value(value).map_err(|e| ServerError::Internal(e.to_string()))
}
