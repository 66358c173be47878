use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use keeper_types::{
    CanonicalPath, ContentHash, FileId, FileSummary, TrackedFile, Version, VersionId,
};

use crate::error::{LedgerError, LedgerResult};
use crate::records::{next_capture_time, plan, truncate_micros, FileRecord, NewVersion, Transition};
use crate::traits::{LedgerReader, LedgerWriter};

/// In-memory ledger for tests, local demos, and embedding.
///
/// All state lives behind one `RwLock`, so every transition is applied
/// under a single write guard and readers never observe half of one.
pub struct InMemoryLedger {
    inner: RwLock<LedgerState>,
}

#[derive(Default)]
struct LedgerState {
    files: BTreeMap<CanonicalPath, TrackedFile>,
    paths: HashMap<FileId, CanonicalPath>,
    /// Append order; `versions[i]` has id `i + 1`.
    versions: Vec<Version>,
    by_file: HashMap<FileId, Vec<usize>>,
}

impl LedgerState {
    fn upsert(&mut self, record: &FileRecord) -> TrackedFile {
        let next_id = FileId::new(self.files.len() as u64 + 1);
        let file = self
            .files
            .entry(record.path.clone())
            .or_insert_with(|| TrackedFile {
                id: next_id,
                path: record.path.clone(),
                change_token: record.change_token.clone(),
                content_hash: record.content_hash,
                last_modified: record.last_modified,
                is_deleted: record.is_deleted,
            });
        file.change_token = record.change_token.clone();
        file.content_hash = record.content_hash;
        file.last_modified = truncate_micros(record.last_modified);
        file.is_deleted = record.is_deleted;
        self.paths.insert(file.id, record.path.clone());
        file.clone()
    }

    fn append(&mut self, version: &NewVersion) -> LedgerResult<VersionId> {
        let file_id = self
            .files
            .get(&version.path)
            .map(|f| f.id)
            .ok_or_else(|| LedgerError::UnknownFile(version.path.clone()))?;

        let indices = self.by_file.entry(file_id).or_default();
        let previous = indices.last().map(|&i| self.versions[i].captured_at);
        let id = VersionId::new(self.versions.len() as u64 + 1);

        self.versions.push(Version {
            id,
            file_id,
            path: version.path.clone(),
            content: version.content.clone(),
            content_hash: ContentHash::of(&version.content),
            previous_hash: version.previous_hash,
            change: version.change,
            captured_at: next_capture_time(previous),
            upstream_token: version.upstream_token.clone(),
            upstream_modified: version.upstream_modified.map(truncate_micros),
        });
        indices.push(self.versions.len() - 1);
        Ok(id)
    }

    fn file_versions(&self, file_id: FileId) -> impl DoubleEndedIterator<Item = &Version> {
        self.by_file
            .get(&file_id)
            .into_iter()
            .flatten()
            .map(|&i| &self.versions[i])
    }
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(LedgerState::default()),
        }
    }

    /// Total number of versions across all files.
    pub fn version_count(&self) -> usize {
        self.read().map(|s| s.versions.len()).unwrap_or(0)
    }

    fn read(&self) -> LedgerResult<RwLockReadGuard<'_, LedgerState>> {
        self.inner.read().map_err(|_| LedgerError::LockPoisoned)
    }

    fn write(&self) -> LedgerResult<RwLockWriteGuard<'_, LedgerState>> {
        self.inner.write().map_err(|_| LedgerError::LockPoisoned)
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl LedgerWriter for InMemoryLedger {
    fn upsert_file(&self, file: &FileRecord) -> LedgerResult<TrackedFile> {
        Ok(self.write()?.upsert(file))
    }

    fn mark_deleted(&self, path: &CanonicalPath) -> LedgerResult<bool> {
        let mut state = self.write()?;
        Ok(match state.files.get_mut(path) {
            Some(file) => {
                file.is_deleted = true;
                true
            }
            None => false,
        })
    }

    fn append_version(&self, version: &NewVersion) -> LedgerResult<VersionId> {
        self.write()?.append(version)
    }

    fn apply(&self, transition: &Transition) -> LedgerResult<Option<VersionId>> {
        let mut state = self.write()?;
        let plan = plan(transition, state.files.get(transition.path()))?;
        state.upsert(&plan.file);
        plan.version.as_ref().map(|v| state.append(v)).transpose()
    }
}

impl LedgerReader for InMemoryLedger {
    fn get_file(&self, path: &CanonicalPath) -> LedgerResult<Option<TrackedFile>> {
        Ok(self.read()?.files.get(path).cloned())
    }

    fn list_files(&self) -> LedgerResult<Vec<FileSummary>> {
        let state = self.read()?;
        Ok(state
            .files
            .values()
            .map(|file| {
                let latest = state.file_versions(file.id).next_back();
                FileSummary {
                    file: file.clone(),
                    version_count: state.file_versions(file.id).count() as u64,
                    latest_change: latest.map_or(file.last_modified, |v| v.captured_at),
                    latest_change_type: latest.map(|v| v.change),
                }
            })
            .collect())
    }

    fn get_version(&self, id: VersionId) -> LedgerResult<Option<Version>> {
        let state = self.read()?;
        let index = (id.get() as usize).checked_sub(1);
        Ok(index.and_then(|i| state.versions.get(i)).cloned())
    }

    fn list_versions(&self, path: &CanonicalPath) -> LedgerResult<Vec<Version>> {
        let state = self.read()?;
        let Some(file) = state.files.get(path) else {
            return Ok(vec![]);
        };
        Ok(state.file_versions(file.id).rev().cloned().collect())
    }

    fn latest_version(&self, path: &CanonicalPath) -> LedgerResult<Option<Version>> {
        let state = self.read()?;
        Ok(state
            .files
            .get(path)
            .and_then(|file| state.file_versions(file.id).next_back())
            .cloned())
    }
}

impl std::fmt::Debug for InMemoryLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryLedger")
            .field("version_count", &self.version_count())
            .finish()
    }
}
