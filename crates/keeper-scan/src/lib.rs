//! Change-detection engine for Keeper.
//!
//! A [`Scanner`] owns its source, ledger, and scopes. Each cycle lists every
//! scope, classifies each listed object against the ledger, and finally infers
//! deletions from the scopes that listed completely.
//!
//! | Observed | Ledger | Outcome |
//! |---|---|---|
//! | present | absent | `created` |
//! | present | deleted | `created` (resurrection) |
//! | present, same token | live | nothing |
//! | present, new token, same hash | live | token and timestamp updated |
//! | present, new token, new hash | live | `modified` |
//! | absent from a complete listing | live | `deleted` |

mod classify;
pub mod config;
pub mod error;
pub mod report;
pub mod scanner;

pub use config::ScanConfig;
pub use error::{ScanError, ScanResult};
pub use report::{CycleReport, ObjectFailure, ScopeFailure};
pub use scanner::Scanner;
