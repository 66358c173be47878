use std::sync::Arc;

use keeper_scan::Scanner;
use keeper_sdk::Vault;

/// Shared handler state.
#[derive(Clone, Debug)]
pub struct AppState {
    pub vault: Vault,
    /// Present when the process runs a scanner; enables `POST /api/scan`.
    pub scanner: Option<Arc<Scanner>>,
}

impl AppState {
    pub fn new(vault: Vault) -> Self {
        Self {
            vault,
            scanner: None,
        }
    }

    pub fn with_scanner(mut self, scanner: Arc<Scanner>) -> Self {
        self.scanner = Some(scanner);
        self
    }
}
