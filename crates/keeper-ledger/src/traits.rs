use keeper_types::{CanonicalPath, FileSummary, TrackedFile, Version, VersionId};

use crate::error::LedgerResult;
use crate::records::{FileRecord, NewVersion, Transition};

/// Write boundary of the ledger. Only the scanner holds a writer.
pub trait LedgerWriter: Send + Sync {
    /// Insert or update the file row keyed by canonical path. Idempotent.
    fn upsert_file(&self, file: &FileRecord) -> LedgerResult<TrackedFile>;

    /// Set `is_deleted`; versions are untouched. Returns `false` for an
    /// unknown path.
    fn mark_deleted(&self, path: &CanonicalPath) -> LedgerResult<bool>;

    /// Append a version to an existing file and return its new id.
    ///
    /// The content hash and capture time are assigned by the ledger.
    fn append_version(&self, version: &NewVersion) -> LedgerResult<VersionId>;

    /// Apply one classification outcome as a single atomic unit.
    ///
    /// Returns the id of the appended version, or `None` for metadata-only
    /// updates. Either every write of the transition is visible or none is.
    fn apply(&self, transition: &Transition) -> LedgerResult<Option<VersionId>>;
}

/// Read boundary of the ledger. Safe to use while a writer is active.
pub trait LedgerReader: Send + Sync {
    fn get_file(&self, path: &CanonicalPath) -> LedgerResult<Option<TrackedFile>>;

    /// All tracked files ordered by canonical path, with derived
    /// `version_count` / `latest_change` / `latest_change_type`.
    fn list_files(&self) -> LedgerResult<Vec<FileSummary>>;

    fn get_version(&self, id: VersionId) -> LedgerResult<Option<Version>>;

    /// Versions of a file, newest first. Empty for an unknown path.
    fn list_versions(&self, path: &CanonicalPath) -> LedgerResult<Vec<Version>>;

    fn latest_version(&self, path: &CanonicalPath) -> LedgerResult<Option<Version>>;
}

/// A full ledger backend.
pub trait Ledger: LedgerReader + LedgerWriter {}

impl<T: LedgerReader + LedgerWriter> Ledger for T {}
