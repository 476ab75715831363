//! Resolve an external-auth id to the account that carries it.

use crate::error::AppError;
use crate::model::ResolvedModel;
use crate::store::RowStore;
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

/// Column holding the external-auth id on every account table.
pub const EXTERNAL_ID_COLUMN: &str = "firebase_uid";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Rol {
    Conductor,
    Despachador,
    Cliente,
}

/// Tables searched, first hit wins.
pub const PRECEDENCE: [(&str, Rol); 3] = [
    ("conductor", Rol::Conductor),
    ("despachador", Rol::Despachador),
    ("cliente", Rol::Cliente),
];

#[derive(Clone, Debug, PartialEq, Serialize, ToSchema)]
pub struct UsuarioPorUid {
    pub id: i64,
    pub nombre: String,
    pub correo: String,
    pub rol: Rol,
}

/// Walk [`PRECEDENCE`] and return the first account whose external id equals `uid`.
/// Duplicates inside one table resolve to the lowest id.
pub async fn resolve_by_external_id(
    store: &dyn RowStore,
    model: &ResolvedModel,
    uid: &str,
) -> Result<Option<UsuarioPorUid>, AppError> {
    let key = [Value::String(uid.to_string())];
    for (table_id, rol) in PRECEDENCE {
        let entity = model.entity_by_table(table_id).ok_or_else(|| {
            AppError::NotFound(format!("account table {} is not in the model", table_id))
        })?;
        let rows = store.fetch_where_in(entity, EXTERNAL_ID_COLUMN, &key).await?;
        if let Some(row) = rows.first() {
            tracing::debug!(%uid, rol = ?rol, "external id resolved");
            let text = |name: &str| row.get(name).and_then(Value::as_str).unwrap_or_default().to_string();
            return Ok(Some(UsuarioPorUid {
                id: row.get(&entity.pk_column).and_then(Value::as_i64).unwrap_or_default(),
                nombre: text("nombre"),
                correo: text("correo"),
                rol,
            }));
        }
    }
    Ok(None)
}
