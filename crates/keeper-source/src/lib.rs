//! Object source adapters for Keeper.
//!
//! The scanner sees the remote blob store only through [`ObjectSource`]:
//! enumerate a [`StorageScope`], fetch one object, upload bytes back.
//!
//! # Key Types
//!
//! - [`ObjectSource`] -- Async adapter interface
//! - [`StorageScope`] / [`ScopeConfig`] -- Account, containers, prefix, and filename globs to watch
//! - [`InMemoryObjectSource`] -- In-process store with failure injection, for tests and demos
//! - [`LocalDirSource`] -- Directory tree laid out as `<root>/<account>/<container>/<path>`

pub mod error;
pub mod local;
pub mod memory;
pub mod scope;
pub mod source;

pub use error::{SourceError, SourceResult};
pub use local::LocalDirSource;
pub use memory::InMemoryObjectSource;
pub use scope::{ScopeConfig, StorageScope};
pub use source::{FetchedObject, ObjectListing, ObjectSource};
