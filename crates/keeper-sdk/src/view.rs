//! JSON projections of ledger records for API and CLI output.

use chrono::{DateTime, Utc};
use serde::Serialize;

use keeper_types::{CanonicalPath, ChangeKind, ChangeToken, ContentHash, FileId, Version, VersionId};

/// Version as shown to callers. Content is decoded as (lossy) UTF-8 text
/// and omitted from listings.
#[derive(Clone, Debug, Serialize)]
pub struct VersionView {
    pub id: VersionId,
    pub file_id: FileId,
    pub path: CanonicalPath,
    pub content_hash: ContentHash,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_hash: Option<ContentHash>,
    pub change_type: ChangeKind,
    pub captured_at: DateTime<Utc>,
    pub upstream_token: Option<ChangeToken>,
    pub upstream_modified: Option<DateTime<Utc>>,
    pub size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl VersionView {
    /// Metadata only.
    pub fn summary(version: Version) -> Self {
        Self {
            id: version.id,
            file_id: version.file_id,
            size: version.content.len(),
            path: version.path,
            content_hash: version.content_hash,
            previous_hash: version.previous_hash,
            change_type: version.change,
            captured_at: version.captured_at,
            upstream_token: version.upstream_token,
            upstream_modified: version.upstream_modified,
            content: None,
        }
    }

    /// Metadata plus content.
    pub fn full(version: Version) -> Self {
        let content = version.text().into_owned();
        Self {
            content: Some(content),
            ..Self::summary(version)
        }
    }
}
