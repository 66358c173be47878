//! HTTP server for Keeper.
//!
//! Serves the [`Vault`](keeper_sdk::Vault) query, diff, and restore API as
//! JSON under `/api`, and optionally triggers scan cycles on demand.

pub mod config;
pub mod error;
pub mod handler;
pub mod router;
pub mod server;
pub mod state;

pub use config::ServerConfig;
pub use error::{ServerError, ServerResult};
pub use server::KeeperServer;
pub use state::AppState;
