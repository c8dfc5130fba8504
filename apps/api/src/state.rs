use std::sync::Arc;

use crate::deletion::orchestrator::AccountDeleter;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Account deletion orchestrator. Holds the resource store and identity
    /// service behind trait objects so tests can substitute in-memory
    /// backends.
    pub deleter: Arc<AccountDeleter>,
}
