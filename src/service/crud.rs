//! Generic CRUD over a RowStore: the five resource operations for one entity.

use super::serializer::{Mode, RecordSerializer};
use crate::error::AppError;
use crate::model::ResolvedEntity;
use crate::store::RowStore;
use serde_json::Value;

pub struct CrudService<'a> {
    store: &'a dyn RowStore,
    entity: &'a ResolvedEntity,
    redact_credentials: bool,
}

impl<'a> CrudService<'a> {
    pub fn new(store: &'a dyn RowStore, entity: &'a ResolvedEntity, redact_credentials: bool) -> Self {
        CrudService {
            store,
            entity,
            redact_credentials,
        }
    }

    /// Every row, ordered by id.
    pub async fn list(&self) -> Result<Vec<Value>, AppError> {
        let rows = self.store.list(self.entity).await?;
        Ok(rows.into_iter().map(|r| self.wire(r)).collect())
    }

    pub async fn retrieve(&self, id: i64) -> Result<Value, AppError> {
        match self.store.fetch(self.entity, id).await? {
            Some(row) => Ok(self.wire(row)),
            None => Err(self.not_found(id)),
        }
    }

    pub async fn create(&self, body: &Value) -> Result<Value, AppError> {
        let values = RecordSerializer::from_wire(self.entity, body, Mode::Create)?;
        let row = self.store.insert(self.entity, &values).await?;
        tracing::info!(resource = %self.entity.label(), id = ?row.get(&self.entity.pk_column), "created");
        Ok(self.wire(row))
    }

    /// Full replacement (PUT).
    pub async fn update(&self, id: i64, body: &Value) -> Result<Value, AppError> {
        self.write(id, body, Mode::Replace).await
    }

    /// Partial replacement (PATCH).
    pub async fn partial_update(&self, id: i64, body: &Value) -> Result<Value, AppError> {
        self.write(id, body, Mode::Partial).await
    }

    pub async fn destroy(&self, id: i64) -> Result<(), AppError> {
        if !self.store.delete(self.entity, id).await? {
            return Err(self.not_found(id));
        }
        tracing::info!(resource = %self.entity.label(), id, "deleted");
        Ok(())
    }

    async fn write(&self, id: i64, body: &Value, mode: Mode) -> Result<Value, AppError> {
        // Missing rows answer 404 before the body is looked at.
        if self.store.fetch(self.entity, id).await?.is_none() {
            return Err(self.not_found(id));
        }
        let values = RecordSerializer::from_wire(self.entity, body, mode)?;
        match self.store.update(self.entity, id, &values).await? {
            Some(row) => Ok(self.wire(row)),
            None => Err(self.not_found(id)),
        }
    }

    fn wire(&self, row: crate::store::Record) -> Value {
        RecordSerializer::to_wire(self.entity, row, self.redact_credentials)
    }

    fn not_found(&self, id: i64) -> AppError {
        AppError::NotFound(format!("{} {}", self.entity.label(), id))
    }
}
