use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use keeper_types::CanonicalPath;

/// A scope whose listing failed. Its files were neither classified nor
/// considered for deletion in that cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScopeFailure {
    pub scope: String,
    pub error: String,
}

/// An object whose fetch or ledger write failed. It is retried next cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectFailure {
    pub path: CanonicalPath,
    pub error: String,
}

/// Summary of one scan cycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleReport {
    pub cycle: u64,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scopes_listed: usize,
    pub scope_failures: Vec<ScopeFailure>,
    pub objects_seen: usize,
    pub created: usize,
    pub modified: usize,
    pub deleted: usize,
    /// Token moved, content did not.
    pub metadata_only: usize,
    pub unchanged: usize,
    pub object_failures: Vec<ObjectFailure>,
}

impl CycleReport {
    pub(crate) fn start(cycle: u64) -> Self {
        let now = Utc::now();
        Self {
            cycle,
            started_at: now,
            finished_at: now,
            scopes_listed: 0,
            scope_failures: Vec::new(),
            objects_seen: 0,
            created: 0,
            modified: 0,
            deleted: 0,
            metadata_only: 0,
            unchanged: 0,
            object_failures: Vec::new(),
        }
    }

    /// Versions appended to the ledger during the cycle.
    pub fn versions_appended(&self) -> usize {
        self.created + self.modified + self.deleted
    }

    pub fn is_clean(&self) -> bool {
        self.scope_failures.is_empty() && self.object_failures.is_empty()
    }
}
