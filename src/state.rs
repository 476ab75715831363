//! Shared application state for all routes.

use crate::model::ResolvedModel;
use crate::store::RowStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RowStore>,
    /// Route-registration table: every exposed path segment resolves through it.
    pub model: Arc<ResolvedModel>,
    /// Drop credential columns from responses.
    pub redact_credentials: bool,
}

impl AppState {
    pub fn new(store: Arc<dyn RowStore>, model: Arc<ResolvedModel>, redact_credentials: bool) -> Self {
        AppState {
            store,
            model,
            redact_credentials,
        }
    }
}
