//! RowStore over PostgreSQL. Constraints and delete propagation are enforced by the schema.

use super::{Record, RowStore};
use crate::error::AppError;
use crate::model::duration::format_micros;
use crate::model::{ColumnKind, ResolvedEntity};
use crate::sql::{self, PgBindValue, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::error::ErrorKind;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
    schema: String,
}

impl PgStore {
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        PgStore {
            pool,
            schema: schema.into(),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    async fn fetch_all(&self, entity: &ResolvedEntity, q: &QueryBuf) -> Result<Vec<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_db_error(entity, e))?;
        rows.iter().map(|r| decode_row(entity, r)).collect()
    }

    async fn fetch_optional(
        &self,
        entity: &ResolvedEntity,
        q: &QueryBuf,
    ) -> Result<Option<Record>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(entity, e))?;
        row.map(|r| decode_row(entity, &r)).transpose()
    }
}

#[async_trait]
impl RowStore for PgStore {
    async fn list(&self, entity: &ResolvedEntity) -> Result<Vec<Record>, AppError> {
        let q = sql::select_all(entity, &self.schema);
        self.fetch_all(entity, &q).await
    }

    async fn fetch(&self, entity: &ResolvedEntity, id: i64) -> Result<Option<Record>, AppError> {
        let q = sql::select_by_id(entity, &self.schema, id);
        self.fetch_optional(entity, &q).await
    }

    async fn fetch_where_in(
        &self,
        entity: &ResolvedEntity,
        column: &str,
        values: &[Value],
    ) -> Result<Vec<Record>, AppError> {
        let col = entity
            .column(column)
            .ok_or_else(|| AppError::BadRequest(format!("unknown column {}", column)))?;
        let q = sql::select_by_column_in(entity, &self.schema, col, values);
        self.fetch_all(entity, &q).await
    }

    async fn insert(&self, entity: &ResolvedEntity, values: &Record) -> Result<Record, AppError> {
        let q = sql::insert(entity, &self.schema, values);
        self.fetch_optional(entity, &q)
            .await?
            .ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    async fn update(
        &self,
        entity: &ResolvedEntity,
        id: i64,
        values: &Record,
    ) -> Result<Option<Record>, AppError> {
        let q = sql::update(entity, &self.schema, id, values);
        self.fetch_optional(entity, &q).await
    }

    async fn delete(&self, entity: &ResolvedEntity, id: i64) -> Result<bool, AppError> {
        let q = sql::delete(entity, &self.schema, id);
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let row = bind_all(sqlx::query(&q.sql), &q.params)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_db_error(entity, e))?;
        Ok(row.is_some())
    }

    async fn ping(&self) -> Result<(), AppError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

fn bind_all<'q>(
    mut query: sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments>,
    params: &[Value],
) -> sqlx::query::Query<'q, sqlx::Postgres, sqlx::postgres::PgArguments> {
    for p in params {
        query = query.bind(PgBindValue::from_json(p));
    }
    query
}

fn decode_row(entity: &ResolvedEntity, row: &PgRow) -> Result<Record, AppError> {
    let mut out = Record::new();
    for col in &entity.columns {
        let name = col.name.as_str();
        let value = match &col.kind {
            ColumnKind::Identity | ColumnKind::BigInt => {
                row.try_get::<Option<i64>, _>(name)?.map(Value::from)
            }
            ColumnKind::Integer => row.try_get::<Option<i32>, _>(name)?.map(Value::from),
            ColumnKind::Varchar { .. } | ColumnKind::Enum { .. } => {
                row.try_get::<Option<String>, _>(name)?.map(Value::String)
            }
            ColumnKind::Float => row
                .try_get::<Option<f64>, _>(name)?
                .and_then(serde_json::Number::from_f64)
                .map(Value::Number),
            ColumnKind::Boolean => row.try_get::<Option<bool>, _>(name)?.map(Value::Bool),
            ColumnKind::Date => row
                .try_get::<Option<chrono::NaiveDate>, _>(name)?
                .map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
            ColumnKind::Duration => row
                .try_get::<Option<i64>, _>(name)?
                .map(|micros| Value::String(format_micros(micros))),
        };
        out.insert(col.name.clone(), value.unwrap_or(Value::Null));
    }
    Ok(out)
}

/// Constraint violations are the caller's fault; everything else stays a database error.
fn map_db_error(entity: &ResolvedEntity, err: sqlx::Error) -> AppError {
    let Some(db) = err.as_database_error() else {
        return AppError::Db(err);
    };
    let constraint = db.constraint().unwrap_or("").to_string();
    match db.kind() {
        ErrorKind::UniqueViolation => {
            let columns = entity
                .unique
                .iter()
                .find(|group| group.iter().all(|c| constraint.contains(c.as_str())))
                .map(|group| group.join(", "))
                .unwrap_or(constraint);
            AppError::Conflict(format!("{} with this {} already exists", entity.label(), columns))
        }
        ErrorKind::ForeignKeyViolation => {
            let field = entity
                .foreign_keys
                .iter()
                .find(|fk| constraint.contains(fk.column.as_str()))
                .map(|fk| fk.column.clone());
            AppError::Validation {
                message: match &field {
                    Some(f) => format!("{} references a row that does not exist", f),
                    None => db.message().to_string(),
                },
                field,
            }
        }
        ErrorKind::NotNullViolation | ErrorKind::CheckViolation => {
            AppError::validation(db.message().to_string())
        }
        _ if db.code().map(|c| c.starts_with("22")).unwrap_or(false) => {
            AppError::validation(db.message().to_string())
        }
        _ => AppError::Db(err),
    }
}
