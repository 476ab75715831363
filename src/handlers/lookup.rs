//! GET /usuario_por_uid/:uid

use crate::error::AppError;
use crate::response::error_body;
use crate::service::{resolve_by_external_id, UsuarioPorUid};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

pub const NOT_FOUND_MESSAGE: &str = "Usuario no encontrado";

/// Resolve an external-auth id to the conductor, despachador or cliente carrying it.
#[utoipa::path(
    get,
    path = "/usuario_por_uid/{uid}",
    tags = ["lookup"],
    params(("uid" = String, Path, description = "External-auth id")),
    responses(
        (status = 200, description = "Account found", body = UsuarioPorUid),
        (status = 404, description = "No account carries this id")
    )
)]
pub async fn usuario_por_uid(
    State(state): State<AppState>,
    Path(uid): Path<String>,
) -> Result<Response, AppError> {
    match resolve_by_external_id(state.store.as_ref(), &state.model, &uid).await? {
        Some(found) => Ok(Json(found).into_response()),
        None => Ok((StatusCode::NOT_FOUND, Json(error_body(NOT_FOUND_MESSAGE))).into_response()),
    }
}
