//! In-process RowStore. Enforces the same constraints the PostgreSQL schema does:
//! not-null, unique (single and composite), foreign-key existence, and
//! CASCADE / SET NULL propagation on delete.

use super::{Record, RowStore};
use crate::error::AppError;
use crate::model::{OnDelete, ResolvedEntity, ResolvedModel};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Default)]
struct Table {
    last_id: i64,
    rows: BTreeMap<i64, Record>,
}

type Tables = HashMap<String, Table>;

pub struct MemoryStore {
    model: Arc<ResolvedModel>,
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new(model: Arc<ResolvedModel>) -> Self {
        let tables = model
            .entities
            .iter()
            .map(|e| (e.table_id.clone(), Table::default()))
            .collect();
        MemoryStore {
            model,
            tables: RwLock::new(tables),
        }
    }

    fn check_row(
        &self,
        tables: &Tables,
        entity: &ResolvedEntity,
        row: &Record,
        own_id: Option<i64>,
    ) -> Result<(), AppError> {
        for col in entity.writable_columns() {
            if !col.nullable && row.get(&col.name).map(Value::is_null).unwrap_or(true) {
                return Err(AppError::invalid(&col.name, format!("{} may not be null", col.name)));
            }
        }

        for fk in &entity.foreign_keys {
            let Some(target_id) = row.get(&fk.column).and_then(Value::as_i64) else {
                continue;
            };
            let exists = tables
                .get(&fk.target)
                .map(|t| t.rows.contains_key(&target_id))
                .unwrap_or(false);
            if !exists {
                return Err(AppError::invalid(
                    &fk.column,
                    format!("{} references a row that does not exist", fk.column),
                ));
            }
        }

        let Some(table) = tables.get(&entity.table_id) else {
            return Ok(());
        };
        for group in &entity.unique {
            let key: Vec<&Value> = group.iter().map(|c| row.get(c).unwrap_or(&Value::Null)).collect();
            if key.iter().any(|v| v.is_null()) {
                continue;
            }
            let clash = table.rows.iter().any(|(id, other)| {
                Some(*id) != own_id
                    && group
                        .iter()
                        .zip(&key)
                        .all(|(c, v)| other.get(c) == Some(*v))
            });
            if clash {
                return Err(AppError::Conflict(format!(
                    "{} with this {} already exists",
                    entity.label(),
                    group.join(", ")
                )));
            }
        }
        Ok(())
    }

    /// Rows removed and rows nulled when `(table_id, id)` is deleted.
    fn plan_delete(
        &self,
        tables: &Tables,
        table_id: &str,
        id: i64,
        doomed: &mut HashSet<(String, i64)>,
        nulled: &mut Vec<(String, i64, String)>,
    ) {
        if !doomed.insert((table_id.to_string(), id)) {
            return;
        }
        for (dependent, fk) in self.model.referencing(table_id) {
            let Some(table) = tables.get(&dependent.table_id) else {
                continue;
            };
            let hits: Vec<i64> = table
                .rows
                .iter()
                .filter(|(_, row)| row.get(&fk.column).and_then(Value::as_i64) == Some(id))
                .map(|(row_id, _)| *row_id)
                .collect();
            for row_id in hits {
                match fk.on_delete {
                    OnDelete::Cascade => {
                        self.plan_delete(tables, &dependent.table_id, row_id, doomed, nulled)
                    }
                    OnDelete::SetNull => {
                        nulled.push((dependent.table_id.clone(), row_id, fk.column.clone()))
                    }
                }
            }
        }
    }
}

fn missing_table(entity: &ResolvedEntity) -> AppError {
    AppError::NotFound(format!("table {}", entity.table_id))
}

#[async_trait]
impl RowStore for MemoryStore {
    async fn list(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError> {
        let tables = self.tables.read().await;
        let table = tables.get(&entity.table_id).ok_or_else(|| missing_table(entity))?;
        Ok(table.rows.values().cloned().collect())
    }

    async fn fetch(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError> {
        let tables = self.tables.read().await;
        let table = tables.get(&entity.table_id).ok_or_else(|| missing_table(entity))?;
        Ok(table.rows.get(&id).cloned())
    }

    async fn fetch_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, AppError> {
        if entity.column(column).is_none() {
            return Err(AppError::BadRequest(format!("unknown column {}", column)));
        }
        let tables = self.tables.read().await;
        let table = tables.get(&entity.table_id).ok_or_else(|| missing_table(entity))?;
        Ok(table
            .rows
            .values()
            .filter(|row| row.get(column).map(|v| values.contains(v)).unwrap_or(false))
            .cloned()
            .collect())
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Record) -> Result<Record, AppError> {
        let mut tables = self.tables.write().await;
        let mut row = Record::new();
        for col in &entity.columns {
            if col.is_identity() {
                continue;
            }
            row.insert(col.name.clone(), values.get(&col.name).cloned().unwrap_or(Value::Null));
        }
        self.check_row(&tables, entity, &row, None)?;

        let table = tables.get_mut(&entity.table_id).ok_or_else(|| missing_table(entity))?;
        table.last_id += 1;
        let id = table.last_id;
        row.insert(entity.pk_column.clone(), Value::from(id));
        let stored = order_like(entity, row);
        table.rows.insert(id, stored.clone());
        tracing::debug!(table = %entity.table_id, id, "memory insert");
        Ok(stored)
    }

    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        values: &Record,
    ) -> Result<Option<Record>, AppError> {
        let mut tables = self.tables.write().await;
        let current = match tables.get(&entity.table_id).and_then(|t| t.rows.get(&id)) {
            Some(row) => row.clone(),
            None => return Ok(None),
        };
        let mut row = current;
        for col in entity.writable_columns() {
            if let Some(v) = values.get(&col.name) {
                row.insert(col.name.clone(), v.clone());
            }
        }
        self.check_row(&tables, entity, &row, Some(id))?;

        let table = tables.get_mut(&entity.table_id).ok_or_else(|| missing_table(entity))?;
        table.rows.insert(id, row.clone());
        tracing::debug!(table = %entity.table_id, id, "memory update");
        Ok(Some(row))
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let exists = tables
            .get(&entity.table_id)
            .map(|t| t.rows.contains_key(&id))
            .unwrap_or(false);
        if !exists {
            return Ok(false);
        }

        let mut doomed = HashSet::new();
        let mut nulled = Vec::new();
        self.plan_delete(&tables, &entity.table_id, id, &mut doomed, &mut nulled);

        for (table_id, row_id) in &doomed {
            if let Some(t) = tables.get_mut(table_id) {
                t.rows.remove(row_id);
            }
        }
        for (table_id, row_id, column) in &nulled {
            if let Some(row) = tables.get_mut(table_id).and_then(|t| t.rows.get_mut(row_id)) {
                row.insert(column.clone(), Value::Null);
            }
        }
        tracing::debug!(
            table = %entity.table_id,
            id,
            removed = doomed.len(),
            nulled = nulled.len(),
            "memory delete"
        );
        Ok(true)
    }

    async fn ping(&self) -> Result<(), AppError> {
        Ok(())
    }
}

/// Rebuild a row with keys in column order, so responses match the SQL column list.
fn order_like(entity: &ResolvedEntity, mut row: Record) -> Record {
    let mut out = Record::new();
    for col in &entity.columns {
        out.insert(col.name.clone(), row.remove(&col.name).unwrap_or(Value::Null));
    }
    out
}
