//! High-level SDK for Keeper.
//!
//! [`Vault`] is the entry point for applications and the HTTP layer: it
//! answers queries from the ledger, computes diffs between stored versions,
//! and restores old content upstream. It never writes to the ledger; the
//! scanner remains its only writer.

pub mod error;
pub mod vault;
pub mod view;

pub use error::{ErrorKind, VaultError, VaultResult};
pub use vault::{RestoreReceipt, Vault, VersionDiff};
pub use view::VersionView;

// Re-export key types
pub use keeper_diff::{DiffLine, DiffResult, DiffStats, LineKind, SplitRow};
pub use keeper_ledger::{ValidationReport, Violation, ViolationKind};
pub use keeper_types::{
    CanonicalPath, ChangeKind, ContentHash, FileSummary, TrackedFile, Version, VersionId,
};
