//! Append-only version ledger for Keeper.
//!
//! The ledger is the durable record of every snapshot the scanner has
//! observed. It provides:
//! - `LedgerReader` / `LedgerWriter` trait boundaries
//! - [`Transition`]: the atomic unit a single classification outcome writes
//! - [`InMemoryLedger`] for tests and embedding
//! - [`SqliteLedger`], a WAL-mode SQLite backend (single writer, concurrent readers)
//! - [`LedgerValidator`] for integrity audits over any reader
//!
//! # Invariants
//!
//! 1. Exactly one tracked file per canonical path; every version references one.
//! 2. Versions are never updated or removed once appended.
//! 3. A deleted file's newest version is an empty `deleted` version.
//! 4. A deleted file only comes back through a `created` version.
//! 5. A file's content hash equals that of its newest non-deleted version.

pub mod error;
pub mod memory;
pub mod records;
pub mod sqlite;
pub mod traits;
pub mod validation;

#[cfg(test)]
mod conformance;

pub use error::{LedgerError, LedgerResult};
pub use memory::InMemoryLedger;
pub use records::{FileRecord, NewVersion, Snapshot, Transition};
pub use sqlite::SqliteLedger;
pub use traits::{Ledger, LedgerReader, LedgerWriter};
pub use validation::{LedgerValidator, ValidationReport, Violation, ViolationKind};
