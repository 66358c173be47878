use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use keeper_types::{CanonicalPath, ChangeKind, ChangeToken, ContentHash, TrackedFile};

use crate::error::{LedgerError, LedgerResult};

/// Input row for [`LedgerWriter::upsert_file`](crate::LedgerWriter::upsert_file).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: CanonicalPath,
    pub change_token: ChangeToken,
    pub content_hash: ContentHash,
    pub last_modified: DateTime<Utc>,
    pub is_deleted: bool,
}

impl From<&TrackedFile> for FileRecord {
    fn from(file: &TrackedFile) -> Self {
        Self {
            path: file.path.clone(),
            change_token: file.change_token.clone(),
            content_hash: file.content_hash,
            last_modified: file.last_modified,
            is_deleted: file.is_deleted,
        }
    }
}

/// Input for [`LedgerWriter::append_version`](crate::LedgerWriter::append_version).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewVersion {
    pub path: CanonicalPath,
    pub content: Vec<u8>,
    pub previous_hash: Option<ContentHash>,
    pub change: ChangeKind,
    pub upstream_token: Option<ChangeToken>,
    pub upstream_modified: Option<DateTime<Utc>>,
}

/// Content fetched from upstream, as the scanner hands it to the ledger.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Snapshot {
    pub path: CanonicalPath,
    pub content: Vec<u8>,
    pub change_token: ChangeToken,
    pub last_modified: DateTime<Utc>,
}

impl Snapshot {
    pub fn content_hash(&self) -> ContentHash {
        ContentHash::of(&self.content)
    }
}

/// The ledger mutation of one classification outcome.
///
/// The file row and the version are derived from the same input, so a file
/// can never claim a hash that no version carries.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Transition {
    /// First sighting, or resurrection of a deleted file.
    Created(Snapshot),
    /// Content changed under a live file.
    Modified(Snapshot),
    /// Change token moved but content did not; no version is written.
    Touched {
        path: CanonicalPath,
        change_token: ChangeToken,
        last_modified: DateTime<Utc>,
    },
    /// File vanished from a complete listing.
    Deleted { path: CanonicalPath },
}

impl Transition {
    pub fn path(&self) -> &CanonicalPath {
        match self {
            Self::Created(s) | Self::Modified(s) => &s.path,
            Self::Touched { path, .. } | Self::Deleted { path } => path,
        }
    }

    pub fn change(&self) -> Option<ChangeKind> {
        match self {
            Self::Created(_) => Some(ChangeKind::Created),
            Self::Modified(_) => Some(ChangeKind::Modified),
            Self::Touched { .. } => None,
            Self::Deleted { .. } => Some(ChangeKind::Deleted),
        }
    }
}

/// Writes a backend performs for one transition, checked against the
/// current file row.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct Plan {
    pub file: FileRecord,
    pub version: Option<NewVersion>,
}

pub(crate) fn plan(transition: &Transition, existing: Option<&TrackedFile>) -> LedgerResult<Plan> {
    let live = existing.filter(|f| !f.is_deleted);
    match transition {
        Transition::Created(snapshot) => {
            if live.is_some() {
                return Err(rejected(&snapshot.path, "file is already tracked and live"));
            }
            Ok(snapshot_plan(snapshot, ChangeKind::Created))
        }
        Transition::Modified(snapshot) => {
            let Some(file) = live else {
                return Err(rejected(&snapshot.path, "modified requires a live file"));
            };
            if file.content_hash == snapshot.content_hash() {
                return Err(rejected(&snapshot.path, "content hash is unchanged"));
            }
            Ok(snapshot_plan(snapshot, ChangeKind::Modified))
        }
        Transition::Touched {
            path,
            change_token,
            last_modified,
        } => {
            let file = live.ok_or_else(|| missing_live(path, existing))?;
            Ok(Plan {
                file: FileRecord {
                    change_token: change_token.clone(),
                    last_modified: *last_modified,
                    ..FileRecord::from(file)
                },
                version: None,
            })
        }
        Transition::Deleted { path } => {
            let file = live.ok_or_else(|| missing_live(path, existing))?;
            Ok(Plan {
                file: FileRecord {
                    is_deleted: true,
                    ..FileRecord::from(file)
                },
                version: Some(NewVersion {
                    path: path.clone(),
                    content: Vec::new(),
                    previous_hash: Some(file.content_hash),
                    change: ChangeKind::Deleted,
                    upstream_token: None,
                    upstream_modified: None,
                }),
            })
        }
    }
}

fn snapshot_plan(snapshot: &Snapshot, change: ChangeKind) -> Plan {
    Plan {
        file: FileRecord {
            path: snapshot.path.clone(),
            change_token: snapshot.change_token.clone(),
            content_hash: snapshot.content_hash(),
            last_modified: snapshot.last_modified,
            is_deleted: false,
        },
        version: Some(NewVersion {
            path: snapshot.path.clone(),
            content: snapshot.content.clone(),
            previous_hash: None,
            change,
            upstream_token: Some(snapshot.change_token.clone()),
            upstream_modified: Some(snapshot.last_modified),
        }),
    }
}

fn missing_live(path: &CanonicalPath, existing: Option<&TrackedFile>) -> LedgerError {
    match existing {
        None => LedgerError::UnknownFile(path.clone()),
        Some(_) => rejected(path, "file is deleted"),
    }
}

fn rejected(path: &CanonicalPath, reason: &str) -> LedgerError {
    LedgerError::InvalidTransition {
        path: path.clone(),
        reason: reason.to_string(),
    }
}

/// Capture time for the next version of a file: now at microsecond
/// precision, strictly after the file's previous capture.
pub(crate) fn next_capture_time(previous: Option<DateTime<Utc>>) -> DateTime<Utc> {
    let now = truncate_micros(Utc::now());
    match previous {
        Some(prev) if prev >= now => truncate_micros(prev) + Duration::microseconds(1),
        _ => now,
    }
}

pub(crate) fn truncate_micros(at: DateTime<Utc>) -> DateTime<Utc> {
    DateTime::from_timestamp_micros(at.timestamp_micros()).unwrap_or(at)
}
