use std::fmt;
use std::sync::Arc;

use rounds_core::{DirectoryStore, InspectionService, SessionStore};

/// Shared handler state. Everything is `Arc`'d so the router clone per
/// request stays cheap.
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<InspectionService>,
    pub directory: Arc<dyn DirectoryStore>,
    pub sessions: Arc<dyn SessionStore>,
}

impl fmt::Debug for AppState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppState").finish_non_exhaustive()
    }
}
