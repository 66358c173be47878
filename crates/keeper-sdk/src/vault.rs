use std::sync::Arc;

use serde::Serialize;
use tracing::{info, warn};

use keeper_diff::{diff_bytes, DiffResult};
use keeper_ledger::{Ledger, LedgerError, LedgerValidator, ValidationReport};
use keeper_source::ObjectSource;
use keeper_types::{
    CanonicalPath, ChangeKind, ContentHash, FileSummary, TrackedFile, Version, VersionId,
};

use crate::error::{VaultError, VaultResult};

/// Diff between two stored versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct VersionDiff {
    pub old_version: VersionId,
    pub new_version: VersionId,
    pub old_label: String,
    pub new_label: String,
    #[serde(flatten)]
    pub result: DiffResult,
    /// `diff -u` style text with `<path> (v<id>)` labels. Empty without changes.
    pub unified_diff: String,
}

/// Outcome of a successful restore.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct RestoreReceipt {
    pub path: CanonicalPath,
    pub version: VersionId,
    pub content_hash: ContentHash,
    pub bytes: usize,
}

/// Query, diff, and restore API over a ledger and its object source.
#[derive(Clone)]
pub struct Vault {
    ledger: Arc<dyn Ledger>,
    source: Arc<dyn ObjectSource>,
}

impl Vault {
    pub fn new(ledger: Arc<dyn Ledger>, source: Arc<dyn ObjectSource>) -> Self {
        Self { ledger, source }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    pub fn source(&self) -> &Arc<dyn ObjectSource> {
        &self.source
    }

    // ---- Queries ----

    /// Every tracked file, deleted ones included, ordered by path.
    pub fn list_tracked_files(&self) -> VaultResult<Vec<FileSummary>> {
        Ok(self.ledger.list_files()?)
    }

    pub fn get_file(&self, path: &CanonicalPath) -> VaultResult<TrackedFile> {
        self.ledger
            .get_file(path)?
            .ok_or_else(|| VaultError::FileNotFound(path.clone()))
    }

    /// Versions of a tracked file, newest first.
    pub fn list_versions(&self, path: &CanonicalPath) -> VaultResult<Vec<Version>> {
        self.get_file(path)?;
        Ok(self.ledger.list_versions(path)?)
    }

    /// Fetch a version and check its stored content against its hash.
    pub fn get_version(&self, id: VersionId) -> VaultResult<Version> {
        let version = self
            .ledger
            .get_version(id)?
            .ok_or(VaultError::VersionNotFound(id))?;
        if !version.verify() {
            warn!(path = %version.path, version = %id, "stored content fails hash check");
            return Err(LedgerError::IntegrityViolation {
                path: version.path.clone(),
                reason: format!(
                    "version v{id} content does not hash to {}",
                    version.content_hash
                ),
            }
            .into());
        }
        Ok(version)
    }

    /// Like [`get_version`](Self::get_version), but the version must belong
    /// to `path`.
    pub fn get_file_version(&self, path: &CanonicalPath, id: VersionId) -> VaultResult<Version> {
        let version = self.get_version(id)?;
        if &version.path != path {
            return Err(VaultError::InvalidInput(format!(
                "version v{id} belongs to {}, not {path}",
                version.path
            )));
        }
        Ok(version)
    }

    // ---- Diff ----

    /// Diff the content of version `old` against version `new`.
    pub fn compute_diff(&self, old: VersionId, new: VersionId) -> VaultResult<VersionDiff> {
        let old = self.get_version(old)?;
        let new = self.get_version(new)?;
        Ok(diff_versions(&old, &new))
    }

    /// [`compute_diff`](Self::compute_diff) restricted to versions of one file.
    pub fn compute_file_diff(
        &self,
        path: &CanonicalPath,
        old: VersionId,
        new: VersionId,
    ) -> VaultResult<VersionDiff> {
        let old = self.get_file_version(path, old)?;
        let new = self.get_file_version(path, new)?;
        Ok(diff_versions(&old, &new))
    }

    // ---- Restore ----

    /// Upload the content of a stored version back to `path`.
    ///
    /// The ledger is not written: the next scan cycle observes the upload and
    /// records it as `modified`, or `created` if the file had been deleted.
    pub async fn restore(&self, path: &CanonicalPath, id: VersionId) -> VaultResult<RestoreReceipt> {
        let version = self.get_file_version(path, id)?;
        if version.change == ChangeKind::Deleted {
            return Err(VaultError::InvalidInput(format!(
                "version v{id} is a deletion marker and has no content to restore"
            )));
        }

        if let Err(e) = self.source.upload_object(path, &version.content).await {
            warn!(path = %path, version = %id, error = %e, "restore upload failed");
            return Err(e.into());
        }
        info!(path = %path, version = %id, bytes = version.content.len(), "version restored upstream");
        Ok(RestoreReceipt {
            path: path.clone(),
            version: id,
            content_hash: version.content_hash,
            bytes: version.content.len(),
        })
    }

    // ---- Integrity ----

    /// Audit every file and version in the ledger.
    pub fn verify_integrity(&self) -> VaultResult<ValidationReport> {
        Ok(LedgerValidator::validate(self.ledger.as_ref())?)
    }
}

fn diff_versions(old: &Version, new: &Version) -> VersionDiff {
    let result = diff_bytes(&old.content, &new.content);
    let (old_label, new_label) = (old.label(), new.label());
    let unified_diff = result.unified(&old_label, &new_label);
    VersionDiff {
        old_version: old.id,
        new_version: new.id,
        old_label,
        new_label,
        result,
        unified_diff,
    }
}

impl std::fmt::Debug for Vault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Vault").finish_non_exhaustive()
    }
}
