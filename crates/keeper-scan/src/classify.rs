//! Per-path classification.

use keeper_ledger::{Snapshot, Transition};
use keeper_source::{FetchedObject, ObjectListing};
use keeper_types::{ContentHash, TrackedFile};

/// What a listing entry requires, given the ledger's view of its path.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Action {
    /// Token unchanged on a live file: nothing to download or write.
    Skip,
    Fetch(Expect),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Expect {
    /// First sighting, or a deleted file seen again.
    Created,
    /// Token moved on a live file whose recorded hash is given.
    Changed(ContentHash),
}

pub(crate) fn action(listing: &ObjectListing, existing: Option<&TrackedFile>) -> Action {
    match existing {
        None => Action::Fetch(Expect::Created),
        Some(file) if file.is_deleted => Action::Fetch(Expect::Created),
        Some(file) if file.change_token == listing.change_token => Action::Skip,
        Some(file) => Action::Fetch(Expect::Changed(file.content_hash)),
    }
}

/// Ledger transition for fetched content. The hash decides between a new
/// version and a metadata-only update.
pub(crate) fn transition(expect: Expect, fetched: FetchedObject) -> Transition {
    let snapshot = Snapshot {
        path: fetched.path,
        content: fetched.content.to_vec(),
        change_token: fetched.change_token,
        last_modified: fetched.last_modified,
    };
    match expect {
        Expect::Created => Transition::Created(snapshot),
        Expect::Changed(recorded) if snapshot.content_hash() == recorded => Transition::Touched {
            path: snapshot.path,
            change_token: snapshot.change_token,
            last_modified: snapshot.last_modified,
        },
        Expect::Changed(_) => Transition::Modified(snapshot),
    }
}
