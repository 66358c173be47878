use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keeper_types::{CanonicalPath, ChangeToken};

use crate::error::SourceResult;
use crate::scope::StorageScope;

/// One entry of a scope listing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectListing {
    pub path: CanonicalPath,
    pub change_token: ChangeToken,
    pub last_modified: DateTime<Utc>,
    pub size: u64,
}

/// Downloaded object content with the metadata observed at fetch time.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FetchedObject {
    pub path: CanonicalPath,
    pub content: Bytes,
    pub change_token: ChangeToken,
    pub last_modified: DateTime<Utc>,
}

/// Adapter interface to the remote blob store.
#[async_trait]
pub trait ObjectSource: Send + Sync {
    /// Enumerate every object the scope covers.
    ///
    /// A listing is all or nothing: if any container of the scope cannot be
    /// enumerated the whole call fails, so callers can treat `Ok` as a
    /// complete picture of the scope.
    async fn list_objects(&self, scope: &StorageScope) -> SourceResult<Vec<ObjectListing>>;

    async fn fetch_object(&self, path: &CanonicalPath) -> SourceResult<FetchedObject>;

    /// Write `content` to the object at `path`, creating or replacing it.
    async fn upload_object(&self, path: &CanonicalPath, content: &[u8]) -> SourceResult<()>;
}
