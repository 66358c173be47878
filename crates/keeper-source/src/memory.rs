use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};

use keeper_types::{CanonicalPath, ChangeToken};

use crate::error::{SourceError, SourceResult};
use crate::scope::StorageScope;
use crate::source::{FetchedObject, ObjectListing, ObjectSource};

#[derive(Clone, Debug)]
struct StoredObject {
    content: Bytes,
    change_token: ChangeToken,
    last_modified: DateTime<Utc>,
}

type ContainerKey = (String, String);

#[derive(Default)]
struct SourceState {
    containers: BTreeMap<ContainerKey, BTreeMap<String, StoredObject>>,
    failing_listings: HashSet<ContainerKey>,
    failing_fetches: HashSet<CanonicalPath>,
    fail_uploads: bool,
    next_token: u64,
}

impl SourceState {
    fn issue_token(&mut self) -> ChangeToken {
        self.next_token += 1;
        ChangeToken::new(format!("0x{:08X}", self.next_token))
    }
}

/// In-process blob store.
///
/// Every write issues a fresh change token, like an entity tag. Listing,
/// fetch, and upload failures can be injected per container or object.
pub struct InMemoryObjectSource {
    state: RwLock<SourceState>,
    fetches: AtomicUsize,
}

fn key(account: &str, container: &str) -> ContainerKey {
    (account.to_string(), container.to_string())
}

impl InMemoryObjectSource {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(SourceState::default()),
            fetches: AtomicUsize::new(0),
        }
    }

    /// Create or replace an object. Returns its new change token.
    pub fn put(&self, path: &CanonicalPath, content: impl Into<Bytes>) -> ChangeToken {
        let mut state = self.state.write().expect("source lock poisoned");
        let change_token = state.issue_token();
        state
            .containers
            .entry(key(path.account(), path.container()))
            .or_default()
            .insert(
                path.object_path().to_string(),
                StoredObject {
                    content: content.into(),
                    change_token: change_token.clone(),
                    last_modified: Utc::now(),
                },
            );
        change_token
    }

    /// Issue a new change token without changing content, as a metadata
    /// update would. Returns `None` for a missing object.
    pub fn touch(&self, path: &CanonicalPath) -> Option<ChangeToken> {
        let mut state = self.state.write().expect("source lock poisoned");
        let change_token = state.issue_token();
        let object = state
            .containers
            .get_mut(&key(path.account(), path.container()))?
            .get_mut(path.object_path())?;
        object.change_token = change_token.clone();
        object.last_modified = Utc::now();
        Some(change_token)
    }

    pub fn remove(&self, path: &CanonicalPath) -> bool {
        let mut state = self.state.write().expect("source lock poisoned");
        state
            .containers
            .get_mut(&key(path.account(), path.container()))
            .and_then(|objects| objects.remove(path.object_path()))
            .is_some()
    }

    /// Register an empty container so that listings of it succeed.
    pub fn create_container(&self, account: &str, container: &str) {
        let mut state = self.state.write().expect("source lock poisoned");
        state.containers.entry(key(account, container)).or_default();
    }

    pub fn content(&self, path: &CanonicalPath) -> Option<Bytes> {
        let state = self.state.read().expect("source lock poisoned");
        state
            .containers
            .get(&key(path.account(), path.container()))?
            .get(path.object_path())
            .map(|o| o.content.clone())
    }

    pub fn fail_listing(&self, account: &str, container: &str, fail: bool) {
        let mut state = self.state.write().expect("source lock poisoned");
        if fail {
            state.failing_listings.insert(key(account, container));
        } else {
            state.failing_listings.remove(&key(account, container));
        }
    }

    pub fn fail_fetch(&self, path: &CanonicalPath, fail: bool) {
        let mut state = self.state.write().expect("source lock poisoned");
        if fail {
            state.failing_fetches.insert(path.clone());
        } else {
            state.failing_fetches.remove(path);
        }
    }

    pub fn fail_uploads(&self, fail: bool) {
        self.state.write().expect("source lock poisoned").fail_uploads = fail;
    }

    /// Number of successful `fetch_object` calls so far.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::Relaxed)
    }
}

impl Default for InMemoryObjectSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ObjectSource for InMemoryObjectSource {
    async fn list_objects(&self, scope: &StorageScope) -> SourceResult<Vec<ObjectListing>> {
        let state = self.state.read().expect("source lock poisoned");

        let containers: Vec<String> = match scope.containers() {
            Some(list) => list.to_vec(),
            None => state
                .containers
                .keys()
                .filter(|(account, _)| account == scope.account())
                .map(|(_, container)| container.clone())
                .collect(),
        };

        let mut listings = Vec::new();
        for container in containers {
            let container_key = key(scope.account(), &container);
            if state.failing_listings.contains(&container_key) {
                return Err(SourceError::unavailable(
                    format!("{}/{}", scope.account(), container),
                    "listing failed (injected)",
                ));
            }
            let Some(objects) = state.containers.get(&container_key) else {
                return Err(SourceError::unavailable(
                    format!("{}/{}", scope.account(), container),
                    "container does not exist",
                ));
            };
            for (object_path, object) in objects {
                if !scope.matches_object(object_path) {
                    continue;
                }
                let path = CanonicalPath::new(scope.account(), &container, object_path)
                    .map_err(|e| SourceError::unavailable(object_path, e))?;
                listings.push(ObjectListing {
                    path,
                    change_token: object.change_token.clone(),
                    last_modified: object.last_modified,
                    size: object.content.len() as u64,
                });
            }
        }
        Ok(listings)
    }

    async fn fetch_object(&self, path: &CanonicalPath) -> SourceResult<FetchedObject> {
        let state = self.state.read().expect("source lock poisoned");
        if state.failing_fetches.contains(path) {
            return Err(SourceError::unavailable(path, "fetch failed (injected)"));
        }
        let object = state
            .containers
            .get(&key(path.account(), path.container()))
            .and_then(|objects| objects.get(path.object_path()))
            .ok_or_else(|| SourceError::NotFound(path.clone()))?;
        self.fetches.fetch_add(1, Ordering::Relaxed);
        Ok(FetchedObject {
            path: path.clone(),
            content: object.content.clone(),
            change_token: object.change_token.clone(),
            last_modified: object.last_modified,
        })
    }

    async fn upload_object(&self, path: &CanonicalPath, content: &[u8]) -> SourceResult<()> {
        if self.state.read().expect("source lock poisoned").fail_uploads {
            return Err(SourceError::unavailable(path, "upload failed (injected)"));
        }
        self.put(path, Bytes::copy_from_slice(content));
        Ok(())
    }
}

impl std::fmt::Debug for InMemoryObjectSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let containers = self.state.read().map(|s| s.containers.len()).unwrap_or(0);
        f.debug_struct("InMemoryObjectSource")
            .field("containers", &containers)
            .field("fetches", &self.fetch_count())
            .finish()
    }
}
