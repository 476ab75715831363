//! Row storage behind the resource layer: PostgreSQL in production, in-process tables otherwise.

mod database;
mod memory;
mod postgres;

pub use database::{connect, ensure_database_exists};
pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::AppError;
use crate::model::ResolvedEntity;
use async_trait::async_trait;
use serde_json::{Map, Value};

/// One row keyed by column name. Values use the wire representation.
pub type Record = Map<String, Value>;

/// Persistence for rows of any resolved entity.
///
/// Constraint enforcement (unique keys, foreign keys, cascade and set-null
/// on delete) belongs to the implementation, never to callers.
#[async_trait]
pub trait RowStore: Send + Sync {
    /// Every row, ordered by primary key.
    async fn list(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError>;

    async fn fetch(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError>;

    /// Rows whose `column` equals any of `values`, ordered by primary key.
    async fn fetch_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, AppError>;

    /// Insert one row; the identity is assigned by the store. Returns the stored row.
    async fn insert(&self, entity: &ResolvedEntity, values: &Record) -> Result<Record, AppError>;

    /// Overwrite the given columns of one row. `None` when the id does not exist.
    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        values: &Record,
    ) -> Result<Option<Record>, AppError>;

    /// Delete one row and propagate to dependents. `false` when the id does not exist.
    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError>;

    /// Cheap liveness probe for readiness checks.
    async fn ping(&self) -> Result<(), AppError>;
}
