use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::hash::ContentHash;
use crate::path::CanonicalPath;

/// Opaque, storage-assigned change marker (an entity tag).
///
/// Changes whenever the object's metadata or content is touched, so it is a
/// cheap pre-filter only; equal content may carry different tokens.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChangeToken(String);

impl ChangeToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ChangeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

macro_rules! ledger_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            pub const fn new(raw: u64) -> Self {
                Self(raw)
            }

            pub const fn get(self) -> u64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = TypeError;

            /// Accepts `42` as well as the `v42` form used in diff labels.
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s.strip_prefix('v').unwrap_or(s);
                match digits.parse::<u64>() {
                    Ok(raw) if raw > 0 => Ok(Self(raw)),
                    _ => Err(TypeError::InvalidId(s.to_string())),
                }
            }
        }
    };
}

ledger_id!(
    /// Ledger-assigned identifier of a tracked file.
    FileId
);

ledger_id!(
    /// Monotonically increasing identifier of a version, usable for ordering
    /// and external reference.
    VersionId
);

/// Classification the scanner assigns to each new version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Created,
    Modified,
    Deleted,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeKind {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "modified" => Ok(Self::Modified),
            "deleted" => Ok(Self::Deleted),
            other => Err(TypeError::UnknownChangeKind(other.to_string())),
        }
    }
}

/// One ledger row per canonical path.
///
/// Never removed: a file that disappears upstream is tombstoned with
/// `is_deleted` so its history stays addressable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedFile {
    pub id: FileId,
    pub path: CanonicalPath,
    pub change_token: ChangeToken,
    /// Hash of the most recent non-deleted version.
    pub content_hash: ContentHash,
    pub last_modified: DateTime<Utc>,
    pub is_deleted: bool,
}

/// An immutable snapshot of a tracked file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub id: VersionId,
    pub file_id: FileId,
    pub path: CanonicalPath,
    pub content: Vec<u8>,
    /// Hash of `content`. For `deleted` versions this is the hash of the
    /// empty content.
    pub content_hash: ContentHash,
    /// For `deleted` versions: hash of the content the file last had.
    pub previous_hash: Option<ContentHash>,
    pub change: ChangeKind,
    pub captured_at: DateTime<Utc>,
    pub upstream_token: Option<ChangeToken>,
    pub upstream_modified: Option<DateTime<Utc>>,
}

impl Version {
    /// Recompute the hash of the stored content and compare.
    pub fn verify(&self) -> bool {
        self.content_hash.verify(&self.content)
    }

    /// Content as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }

    /// Label used in diff headers, e.g. `acct/config/a.yaml (v3)`.
    pub fn label(&self) -> String {
        format!("{} (v{})", self.path, self.id)
    }
}

/// Read-side aggregate: a tracked file plus figures derived from its versions.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    #[serde(flatten)]
    pub file: TrackedFile,
    pub version_count: u64,
    /// Capture time of the newest version, or the file's last-modified time.
    pub latest_change: DateTime<Utc>,
    pub latest_change_type: Option<ChangeKind>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn change_kind_round_trips_through_str() {
        for kind in [ChangeKind::Created, ChangeKind::Modified, ChangeKind::Deleted] {
            assert_eq!(kind.as_str().parse::<ChangeKind>().unwrap(), kind);
        }
        assert!("renamed".parse::<ChangeKind>().is_err());
    }

    #[test]
    fn change_kind_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&ChangeKind::Modified).unwrap(),
            "\"modified\""
        );
    }

    #[test]
    fn version_id_parsing() {
        assert_eq!("7".parse::<VersionId>().unwrap(), VersionId::new(7));
        assert_eq!("v7".parse::<VersionId>().unwrap(), VersionId::new(7));
        for bad in ["", "0", "-1", "seven", "v"] {
            assert_eq!(
                bad.parse::<VersionId>(),
                Err(TypeError::InvalidId(bad.to_string()))
            );
        }
    }

    #[test]
    fn version_verify_and_label() {
        let content = b"x: 1\n".to_vec();
        let mut version = Version {
            id: VersionId::new(3),
            file_id: FileId::new(1),
            path: CanonicalPath::parse("acct/config/a.yaml").unwrap(),
            content_hash: ContentHash::of(&content),
            content,
            previous_hash: None,
            change: ChangeKind::Created,
            captured_at: Utc::now(),
            upstream_token: Some(ChangeToken::new("0x1")),
            upstream_modified: None,
        };
        assert!(version.verify());
        assert_eq!(version.label(), "acct/config/a.yaml (v3)");
        assert_eq!(version.text(), "x: 1\n");

        version.content = b"x: 2\n".to_vec();
        assert!(!version.verify());
    }
}
