//! Entity CRUD routes built from the resolved model.
//! Parameterized paths hand the segment and id to the handlers, which resolve the entity by path.

use crate::handlers::entity::{create, delete, list, partial_update, read, update};
use crate::handlers::{conductor_paquetes, usuario_por_uid};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/:path_segment", get(list).post(create))
        .route(
            "/:path_segment/:id",
            get(read).put(update).patch(partial_update).delete(delete),
        )
        .route("/:path_segment/:id/paquetes", get(conductor_paquetes))
        .with_state(state)
}

/// Routes outside the generic resource table.
pub fn lookup_routes(state: AppState) -> Router {
    Router::new()
        .route("/usuario_por_uid/:uid", get(usuario_por_uid))
        .with_state(state)
}
