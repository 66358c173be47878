use serde::Serialize;

use keeper_types::{CanonicalPath, ChangeKind, TrackedFile, Version, VersionId};

use crate::error::{LedgerError, LedgerResult};
use crate::traits::LedgerReader;

/// Result of a ledger integrity audit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ValidationReport {
    pub files_checked: u64,
    pub versions_checked: u64,
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    /// Returns `true` if all checks passed.
    pub fn is_valid(&self) -> bool {
        self.violations.is_empty()
    }

    /// Turn the first violation into an error.
    pub fn into_result(self) -> LedgerResult<Self> {
        match self.violations.first() {
            None => Ok(self),
            Some(v) => Err(LedgerError::IntegrityViolation {
                path: v.path.clone(),
                reason: v.description.clone(),
            }),
        }
    }
}

/// A specific integrity violation detected during validation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Violation {
    pub path: CanonicalPath,
    pub version: Option<VersionId>,
    pub kind: ViolationKind,
    pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationKind {
    /// Stored content does not hash to the recorded content hash.
    HashMismatch,
    /// Version points at a different file than the one listing it.
    Misattributed,
    /// Capture times or ids are not strictly increasing.
    OutOfOrder,
    /// Classification sequence impossible for the scanner to produce.
    InvalidLifecycle,
    /// File is deleted but its newest version is not an empty tombstone.
    TombstoneMismatch,
    /// File hash differs from its newest non-deleted version.
    StaleFileHash,
    /// File row without any version.
    EmptyHistory,
}

/// Ledger integrity auditor.
pub struct LedgerValidator;

impl LedgerValidator {
    /// Audit every file and version visible through `reader`.
    pub fn validate<R: LedgerReader + ?Sized>(reader: &R) -> LedgerResult<ValidationReport> {
        let mut report = ValidationReport::default();
        for summary in reader.list_files()? {
            let mut versions = reader.list_versions(&summary.file.path)?;
            versions.reverse();
            report.files_checked += 1;
            report.versions_checked += versions.len() as u64;
            Self::check_file(&summary.file, &versions, &mut report.violations);
        }
        Ok(report)
    }

    /// Check one file against its versions, oldest first.
    fn check_file(file: &TrackedFile, versions: &[Version], out: &mut Vec<Violation>) {
        let mut flag = |version: Option<VersionId>, kind: ViolationKind, description: String| {
            out.push(Violation {
                path: file.path.clone(),
                version,
                kind,
                description,
            })
        };

        let Some(latest) = versions.last() else {
            flag(None, ViolationKind::EmptyHistory, "file has no versions".into());
            return;
        };

        let mut previous: Option<&Version> = None;
        for version in versions {
            let id = Some(version.id);
            if !version.verify() {
                flag(
                    id,
                    ViolationKind::HashMismatch,
                    format!("recomputed hash differs from recorded {}", version.content_hash),
                );
            }
            if version.file_id != file.id || version.path != file.path {
                flag(
                    id,
                    ViolationKind::Misattributed,
                    format!("version belongs to {} (file {})", version.path, version.file_id),
                );
            }
            if version.change == ChangeKind::Deleted && !version.content.is_empty() {
                flag(
                    id,
                    ViolationKind::InvalidLifecycle,
                    "deleted version carries content".into(),
                );
            }
            if let Some(prev) = previous {
                if version.captured_at <= prev.captured_at || version.id <= prev.id {
                    flag(
                        id,
                        ViolationKind::OutOfOrder,
                        format!("not strictly after version {}", prev.id),
                    );
                }
            }
            let allowed = match (previous.map(|p| p.change), version.change) {
                (None | Some(ChangeKind::Deleted), ChangeKind::Created) => true,
                (Some(ChangeKind::Created | ChangeKind::Modified), kind) => {
                    kind != ChangeKind::Created
                }
                _ => false,
            };
            if !allowed {
                flag(
                    id,
                    ViolationKind::InvalidLifecycle,
                    format!(
                        "{} cannot follow {}",
                        version.change,
                        previous.map_or("nothing", |p| p.change.as_str())
                    ),
                );
            }
            previous = Some(version);
        }

        if file.is_deleted && latest.change != ChangeKind::Deleted {
            flag(
                Some(latest.id),
                ViolationKind::TombstoneMismatch,
                format!("file is deleted but newest version is {}", latest.change),
            );
        }
        if !file.is_deleted && latest.change == ChangeKind::Deleted {
            flag(
                Some(latest.id),
                ViolationKind::TombstoneMismatch,
                "newest version is deleted but file is live".into(),
            );
        }

        if let Some(live) = versions.iter().rev().find(|v| v.change != ChangeKind::Deleted) {
            if live.content_hash != file.content_hash {
                flag(
                    Some(live.id),
                    ViolationKind::StaleFileHash,
                    format!(
                        "file hash {} differs from version hash {}",
                        file.content_hash.short_hex(),
                        live.content_hash.short_hex()
                    ),
                );
            }
        }
    }
}
