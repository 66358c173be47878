//! Foundation types for Keeper.
//!
//! Keeper keeps an audit trail over flat files living in a remote blob store.
//! Every other Keeper crate depends on `keeper-types`.
//!
//! # Key Types
//!
//! - [`CanonicalPath`]: Globally unique `account/container/path` key for a tracked object
//! - [`ContentHash`]: BLAKE3 hash of stored content, always recomputed locally
//! - [`ChangeToken`]: Opaque upstream change marker (entity tag)
//! - [`ChangeKind`]: `created | modified | deleted` classification of a version
//! - [`TrackedFile`]: One ledger row per canonical path
//! - [`Version`]: Immutable snapshot of a tracked file
//! - [`FileSummary`]: Read-side aggregate of a file and its version history

pub mod error;
pub mod hash;
pub mod path;
pub mod record;

pub use error::TypeError;
pub use hash::ContentHash;
pub use path::CanonicalPath;
pub use record::{ChangeKind, ChangeToken, FileId, FileSummary, TrackedFile, Version, VersionId};
