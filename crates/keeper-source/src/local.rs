use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use std::time::UNIX_EPOCH;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};
use walkdir::WalkDir;

use keeper_types::{CanonicalPath, ChangeToken};

use crate::error::{SourceError, SourceResult};
use crate::scope::StorageScope;
use crate::source::{FetchedObject, ObjectListing, ObjectSource};

/// Blob store emulated by a directory tree: `<root>/<account>/<container>/<path>`.
///
/// The change token is derived from modification time and size, so it moves
/// on every write even when the bytes are unchanged.
#[derive(Clone, Debug)]
pub struct LocalDirSource {
    root: PathBuf,
}

impl LocalDirSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &CanonicalPath) -> SourceResult<PathBuf> {
        let relative = Path::new(path.object_path());
        if !relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)))
        {
            return Err(SourceError::InvalidScope(format!(
                "object path {path} escapes its container"
            )));
        }
        Ok(self
            .root
            .join(path.account())
            .join(path.container())
            .join(relative))
    }

    fn list_blocking(&self, scope: &StorageScope) -> SourceResult<Vec<ObjectListing>> {
        let account_dir = self.root.join(scope.account());
        let containers = match scope.containers() {
            Some(list) => list.to_vec(),
            None => container_dirs(&account_dir)?,
        };

        let mut listings = Vec::new();
        for container in containers {
            let container_dir = account_dir.join(&container);
            if !container_dir.is_dir() {
                return Err(SourceError::unavailable(
                    container_dir.display(),
                    "container directory does not exist",
                ));
            }
            for entry in WalkDir::new(&container_dir).follow_links(false).sort_by_file_name() {
                let entry = entry.map_err(|e| SourceError::unavailable(container_dir.display(), e))?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let Some(object_path) = object_path(&container_dir, entry.path()) else {
                    warn!(path = %entry.path().display(), "skipping object with non UTF-8 name");
                    continue;
                };
                if !scope.matches_object(&object_path) {
                    continue;
                }
                let metadata = entry
                    .metadata()
                    .map_err(|e| SourceError::unavailable(entry.path().display(), e))?;
                let (change_token, last_modified) = stamp(&metadata);
                let path = CanonicalPath::new(scope.account(), &container, &object_path)
                    .map_err(|e| SourceError::unavailable(entry.path().display(), e))?;
                listings.push(ObjectListing {
                    path,
                    change_token,
                    last_modified,
                    size: metadata.len(),
                });
            }
        }
        debug!(scope = %scope, objects = listings.len(), "listed local objects");
        Ok(listings)
    }
}

fn container_dirs(account_dir: &Path) -> SourceResult<Vec<String>> {
    let entries = std::fs::read_dir(account_dir)
        .map_err(|e| SourceError::unavailable(account_dir.display(), e))?;
    let mut containers = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| SourceError::unavailable(account_dir.display(), e))?;
        if entry.file_type()?.is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                containers.push(name.to_string());
            }
        }
    }
    containers.sort();
    Ok(containers)
}

/// Container-relative path with `/` separators.
fn object_path(container_dir: &Path, file: &Path) -> Option<String> {
    let relative = file.strip_prefix(container_dir).ok()?;
    let parts: Option<Vec<&str>> = relative.components().map(|c| c.as_os_str().to_str()).collect();
    Some(parts?.join("/"))
}

fn stamp(metadata: &std::fs::Metadata) -> (ChangeToken, DateTime<Utc>) {
    let modified = metadata.modified().unwrap_or(UNIX_EPOCH);
    let nanos = modified
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or_default();
    let token = ChangeToken::new(format!("\"{nanos:x}-{:x}\"", metadata.len()));
    (token, DateTime::<Utc>::from(modified))
}

#[async_trait]
impl ObjectSource for LocalDirSource {
    async fn list_objects(&self, scope: &StorageScope) -> SourceResult<Vec<ObjectListing>> {
        let this = self.clone();
        let scope = scope.clone();
        tokio::task::spawn_blocking(move || this.list_blocking(&scope))
            .await
            .map_err(|e| SourceError::unavailable(self.root.display(), e))?
    }

    async fn fetch_object(&self, path: &CanonicalPath) -> SourceResult<FetchedObject> {
        let file = self.resolve(path)?;
        let not_found = |e: std::io::Error| match e.kind() {
            ErrorKind::NotFound => SourceError::NotFound(path.clone()),
            _ => SourceError::unavailable(path, e),
        };
        let content = tokio::fs::read(&file).await.map_err(not_found)?;
        let metadata = tokio::fs::metadata(&file).await.map_err(not_found)?;
        let (change_token, last_modified) = stamp(&metadata);
        Ok(FetchedObject {
            path: path.clone(),
            content: Bytes::from(content),
            change_token,
            last_modified,
        })
    }

    async fn upload_object(&self, path: &CanonicalPath, content: &[u8]) -> SourceResult<()> {
        let file = self.resolve(path)?;
        let parent = file
            .parent()
            .ok_or_else(|| SourceError::InvalidScope(format!("no parent directory for {path}")))?;
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| SourceError::unavailable(path, e))?;

        // Write beside the target, then rename, so readers never see a partial object.
        let staging = parent.join(format!(
            ".{}.keeper-upload",
            file.file_name().and_then(|n| n.to_str()).unwrap_or("object")
        ));
        tokio::fs::write(&staging, content)
            .await
            .map_err(|e| SourceError::unavailable(path, e))?;
        tokio::fs::rename(&staging, &file)
            .await
            .map_err(|e| SourceError::unavailable(path, e))?;
        debug!(path = %path, bytes = content.len(), "uploaded object");
        Ok(())
    }
}
