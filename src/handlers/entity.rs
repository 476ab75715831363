//! Entity CRUD handlers: list, create, read, update (PUT), partial update (PATCH), delete.

use crate::error::AppError;
use crate::model::{Operation, ResolvedEntity};
use crate::response::{created, no_content, ok};
use crate::service::CrudService;
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

pub(crate) fn parse_id(id_str: &str) -> Result<i64, AppError> {
    id_str
        .parse()
        .map_err(|_| AppError::BadRequest(format!("invalid id: {}", id_str)))
}

fn body(payload: Result<Json<Value>, JsonRejection>) -> Result<Value, AppError> {
    payload
        .map(|Json(v)| v)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

fn entity<'s>(
    state: &'s AppState,
    path_segment: &str,
    op: Operation,
) -> Result<&'s ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(path_segment.to_string()))?;
    if !entity.allows(op) {
        return Err(AppError::BadRequest(format!(
            "{} not allowed on {}",
            op.as_str(),
            path_segment
        )));
    }
    Ok(entity)
}

fn crud<'s>(state: &'s AppState, entity: &'s ResolvedEntity) -> CrudService<'s> {
    CrudService::new(state.store.as_ref(), entity, state.redact_credentials)
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::List)?;
    let rows = crud(&state, entity).list().await?;
    Ok(ok(rows))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::Create)?;
    let body = body(payload)?;
    let row = crud(&state, entity).create(&body).await?;
    Ok(created(row))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id_str)?;
    let row = crud(&state, entity).retrieve(id).await?;
    Ok(ok(row))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id_str)?;
    let body = body(payload)?;
    let row = crud(&state, entity).update(id, &body).await?;
    Ok(ok(row))
}

pub async fn partial_update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id_str)?;
    let body = body(payload)?;
    let row = crud(&state, entity).partial_update(id, &body).await?;
    Ok(ok(row))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = entity(&state, &path_segment, Operation::Delete)?;
    let id = parse_id(&id_str)?;
    crud(&state, entity).destroy(id).await?;
    Ok(no_content())
}
