//! Shared application context.
//!
//! [`AppContext`] is handed to every route handler via Axum state. It wraps
//! the immutable configuration and the upload store in `Arc`s so cloning it
//! per request is cheap.

use std::sync::Arc;

use pd_core::config::Config;
use pd_store::UploadStore;

/// State shared across all route handlers.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub config: Arc<Config>,
    pub store: Arc<UploadStore>,
}

impl AppContext {
    /// Build a context from a loaded config and an opened store.
    pub fn new(config: Config, store: UploadStore) -> Self {
        Self {
            config: Arc::new(config),
            store: Arc::new(store),
        }
    }
}
