//! Router assembly.

pub mod common;
pub mod entity;

pub use common::{common_routes, health, ready, HealthBody, ReadyBody};
pub use entity::{entity_routes, lookup_routes};

use crate::settings::Settings;
use crate::state::AppState;
use axum::Router;
use tower::Layer;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::normalize_path::{NormalizePath, NormalizePathLayer};
use tower_http::trace::TraceLayer;

/// Every route of the service with tracing and the body limit applied.
/// Static routes are merged before the generic resource table.
pub fn router(state: AppState, body_limit_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(lookup_routes(state.clone()))
        .merge(entity_routes(state))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
}

/// The router wrapped so `/clientes/` and `/clientes` reach the same handler.
/// Path normalization has to run before routing, hence outside the Router.
pub fn app(state: AppState, settings: &Settings) -> NormalizePath<Router> {
    NormalizePathLayer::trim_trailing_slash().layer(router(state, settings.body_limit_bytes))
}
