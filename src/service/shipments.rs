//! Packages a driver has to deliver, joined with the dispatcher who assigned them.

use super::serializer::RecordSerializer;
use crate::error::AppError;
use crate::model::{ResolvedEntity, ResolvedModel};
use crate::store::{Record, RowStore};
use serde_json::Value;
use std::collections::HashMap;

pub const UNKNOWN_DISPATCHER: &str = "Desconocido";

fn table<'m>(model: &'m ResolvedModel, table_id: &str) -> Result<&'m ResolvedEntity, AppError> {
    model
        .entity_by_table(table_id)
        .ok_or_else(|| AppError::NotFound(format!("table {} is not in the model", table_id)))
}

/// Every package in a shipment assigned to `driver_id`, each carrying
/// `despachador_id` and `despachador_nombre` of the first assignment of its shipment.
pub async fn driver_packages(
    store: &dyn RowStore,
    model: &ResolvedModel,
    driver_id: i64,
) -> Result<Vec<Value>, AppError> {
    let conductor = table(model, "conductor")?;
    if store.fetch(conductor, driver_id).await?.is_none() {
        return Err(AppError::NotFound(format!("{} {}", conductor.label(), driver_id)));
    }

    let asignacion = table(model, "asignacion")?;
    let assignments = store
        .fetch_where_in(asignacion, "conductor", &[Value::from(driver_id)])
        .await?;
    if assignments.is_empty() {
        return Ok(Vec::new());
    }

    // envio id -> dispatcher id, first assignment wins
    let mut dispatcher_of: HashMap<i64, Option<i64>> = HashMap::new();
    let mut envio_ids = Vec::new();
    for a in &assignments {
        let Some(envio) = a.get("envio").and_then(Value::as_i64) else {
            continue;
        };
        if !dispatcher_of.contains_key(&envio) {
            dispatcher_of.insert(envio, a.get("despachador").and_then(Value::as_i64));
            envio_ids.push(Value::from(envio));
        }
    }

    let despachador = table(model, "despachador")?;
    let dispatcher_ids: Vec<Value> = {
        let mut ids: Vec<i64> = dispatcher_of.values().flatten().copied().collect();
        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(Value::from).collect()
    };
    let names: HashMap<i64, String> = store
        .fetch_where_in(despachador, &despachador.pk_column, &dispatcher_ids)
        .await?
        .into_iter()
        .filter_map(|d| {
            let id = d.get(&despachador.pk_column).and_then(Value::as_i64)?;
            let nombre = d.get("nombre").and_then(Value::as_str)?.to_string();
            Some((id, nombre))
        })
        .collect();

    let paquete = table(model, "paquete")?;
    let packages = store.fetch_where_in(paquete, "envio", &envio_ids).await?;
    tracing::debug!(driver_id, assignments = assignments.len(), packages = packages.len(), "driver packages");

    Ok(packages
        .into_iter()
        .map(|pkg| {
            let dispatcher = pkg
                .get("envio")
                .and_then(Value::as_i64)
                .and_then(|e| dispatcher_of.get(&e).copied().flatten());
            with_dispatcher(paquete, pkg, dispatcher, &names)
        })
        .collect())
}

fn with_dispatcher(
    paquete: &ResolvedEntity,
    mut pkg: Record,
    dispatcher: Option<i64>,
    names: &HashMap<i64, String>,
) -> Value {
    let nombre = dispatcher
        .and_then(|id| names.get(&id).cloned())
        .unwrap_or_else(|| UNKNOWN_DISPATCHER.to_string());
    // No assignment dispatcher: the key is left out rather than sent as null.
    if let Some(id) = dispatcher {
        pkg.insert("despachador_id".into(), Value::from(id));
    }
    pkg.insert("despachador_nombre".into(), Value::String(nombre));
    RecordSerializer::to_wire(paquete, pkg, false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::builtin_model;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    async fn insert(store: &MemoryStore, model: &ResolvedModel, table: &str, body: Value) -> i64 {
        let entity = model.entity_by_table(table).unwrap();
        store.insert(entity, body.as_object().unwrap()).await.unwrap()["id"]
            .as_i64()
            .unwrap()
    }

    #[tokio::test]
    async fn lists_packages_of_assigned_shipments() {
        let model = Arc::new(builtin_model().unwrap());
        let store = MemoryStore::new(model.clone());
        let m = &model;
        let conductor = insert(&store, m, "conductor", json!({"nombre": "K", "contraseña": "x", "correo": "k@x.cl",
            "telefono": "1", "estado": "activo", "licencia": "B", "vehiculo": "van", "firebase_uid": null})).await;
        let otro = insert(&store, m, "conductor", json!({"nombre": "L", "contraseña": "x", "correo": "l@x.cl",
            "telefono": "1", "estado": "activo", "licencia": "B", "vehiculo": "van", "firebase_uid": null})).await;
        let despachador = insert(&store, m, "despachador", json!({"nombre": "Diego", "correo": "d@x.cl",
            "contraseña": "x", "telefono": "1", "firebase_uid": null})).await;
        let cliente = insert(&store, m, "cliente", json!({"nombre": "C", "contraseña": "x", "correo": "c@x.cl",
            "telefono": "1", "direccion": "Calle", "preferencia_notificacion": "sms", "firebase_uid": null})).await;
        let ruta = insert(&store, m, "ruta", json!({"distancia": 3.0, "puntos_referencia": "-", "origen": "B", "informe": null})).await;
        let mine = insert(&store, m, "envio", json!({"paquetes_totales": 1, "ruta": ruta})).await;
        let theirs = insert(&store, m, "envio", json!({"paquetes_totales": 1, "ruta": ruta})).await;
        insert(&store, m, "asignacion", json!({"despachador": despachador, "conductor": conductor, "envio": mine})).await;
        insert(&store, m, "asignacion", json!({"despachador": despachador, "conductor": otro, "envio": theirs})).await;
        for envio in [mine, theirs] {
            insert(&store, m, "paquete", json!({"fecha_e": "2024-05-01", "direccion_entrega": "Calle 9",
                "estado": "en camino", "envio": envio, "cliente": cliente, "peso": 2.5, "dimensiones": "1x1"})).await;
        }

        let out = driver_packages(&store, m, conductor).await.unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0]["envio"], json!(mine));
        assert_eq!(out[0]["despachador_id"], json!(despachador));
        assert_eq!(out[0]["despachador_nombre"], json!("Diego"));
    }

    #[tokio::test]
    async fn driver_without_assignments_gets_empty_list() {
        let model = Arc::new(builtin_model().unwrap());
        let store = MemoryStore::new(model.clone());
        let conductor = insert(&store, &model, "conductor", json!({"nombre": "K", "contraseña": "x", "correo": "k@x.cl",
            "telefono": "1", "estado": "activo", "licencia": "B", "vehiculo": "van", "firebase_uid": null})).await;
        assert!(driver_packages(&store, &model, conductor).await.unwrap().is_empty());
        assert!(matches!(
            driver_packages(&store, &model, conductor + 1).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[test]
    fn missing_dispatcher_name_falls_back() {
        let model = builtin_model().unwrap();
        let paquete = model.entity_by_table("paquete").unwrap();
        let out = with_dispatcher(paquete, Record::new(), Some(4), &HashMap::new());
        assert_eq!(out["despachador_nombre"], json!(UNKNOWN_DISPATCHER));
        assert_eq!(out["despachador_id"], json!(4));
    }

    #[test]
    fn absent_dispatcher_omits_the_id() {
        let model = builtin_model().unwrap();
        let paquete = model.entity_by_table("paquete").unwrap();
        let out = with_dispatcher(paquete, Record::new(), None, &HashMap::new());
        assert!(out.get("despachador_id").is_none());
        assert_eq!(out["despachador_nombre"], json!(UNKNOWN_DISPATCHER));
    }
}
