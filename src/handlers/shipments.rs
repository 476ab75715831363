//! GET /conductores/:id/paquetes

use super::entity::parse_id;
use crate::error::AppError;
use crate::response::ok;
use crate::service::driver_packages;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    response::IntoResponse,
};

/// Only drivers carry a package listing; the route shares the generic `/:path_segment/:id` prefix.
pub const DRIVER_SEGMENT: &str = "conductores";

/// Packages of every shipment assigned to the driver, with the assigning dispatcher.
#[utoipa::path(
    get,
    path = "/conductores/{id}/paquetes",
    tags = ["shipments"],
    params(("id" = i64, Path, description = "Driver id")),
    responses(
        (status = 200, description = "Packages with despachador_id and despachador_nombre"),
        (status = 400, description = "Id is not an integer"),
        (status = 404, description = "Unknown driver")
    )
)]
pub async fn conductor_paquetes(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    if path_segment != DRIVER_SEGMENT {
        return Err(AppError::NotFound(format!("{}/{}/paquetes", path_segment, id_str)));
    }
    let id = parse_id(&id_str)?;
    let packages = driver_packages(state.store.as_ref(), &state.model, id).await?;
    Ok(ok(packages))
}
