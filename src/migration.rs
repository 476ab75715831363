//! Apply the resolved model to the database: schema, enum types, tables, foreign-key indexes.
//! Statements are idempotent so the server can run them on every start.

use crate::error::{AppError, ConfigError};
use crate::model::{ColumnInfo, ColumnKind, ResolvedEntity, ResolvedModel};
use crate::sql::quoted;
use sqlx::PgPool;

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

fn column_type(col: &ColumnInfo, schema: &str) -> String {
    match &col.kind {
        ColumnKind::Varchar { max_length: Some(n) } => format!("varchar({})", n),
        kind => kind.sql_type(schema),
    }
}

fn column_def(col: &ColumnInfo, schema: &str) -> String {
    let mut def = format!("{} {}", quoted(&col.name), column_type(col, schema));
    if col.is_identity() {
        def.push_str(" GENERATED BY DEFAULT AS IDENTITY PRIMARY KEY");
    } else if !col.nullable {
        def.push_str(" NOT NULL");
    }
    def
}

fn create_table(model: &ResolvedModel, entity: &ResolvedEntity) -> Result<String, AppError> {
    let schema = &model.schema_name;
    let mut defs: Vec<String> = entity.columns.iter().map(|c| column_def(c, schema)).collect();

    for group in &entity.unique {
        let cols: Vec<String> = group.iter().map(|c| quoted(c)).collect();
        defs.push(format!(
            "CONSTRAINT {} UNIQUE ({})",
            quoted(&format!("{}_{}_key", entity.table_name, group.join("_"))),
            cols.join(", ")
        ));
    }

    for fk in &entity.foreign_keys {
        let target = model.entity_by_table(&fk.target).ok_or_else(|| {
            AppError::Config(ConfigError::MissingReference {
                kind: "table",
                id: fk.target.clone(),
            })
        })?;
        defs.push(format!(
            "CONSTRAINT {} FOREIGN KEY ({}) REFERENCES {}.{} ({}) ON DELETE {}",
            quoted(&format!("{}_{}_fkey", entity.table_name, fk.column)),
            quoted(&fk.column),
            quoted(schema),
            quoted(&target.table_name),
            quoted(&target.pk_column),
            fk.on_delete.as_sql()
        ));
    }

    Ok(format!(
        "CREATE TABLE IF NOT EXISTS {}.{} (\n    {}\n)",
        quoted(schema),
        quoted(&entity.table_name),
        defs.join(",\n    ")
    ))
}

/// Every DDL statement for the model, in execution order.
pub fn ddl_statements(model: &ResolvedModel) -> Result<Vec<String>, AppError> {
    let schema = &model.schema_name;
    let mut out = vec![format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(schema))];

    for (name, values) in &model.enums {
        let values: Vec<String> = values.iter().map(|v| literal(v)).collect();
        out.push(format!(
            "DO $$ BEGIN CREATE TYPE {}.{} AS ENUM ({}); EXCEPTION WHEN duplicate_object THEN NULL; END $$",
            quoted(schema),
            quoted(name),
            values.join(", ")
        ));
    }

    for entity in &model.entities {
        out.push(create_table(model, entity)?);
    }

    // PostgreSQL does not index the referencing side of a foreign key.
    for entity in &model.entities {
        for fk in &entity.foreign_keys {
            out.push(format!(
                "CREATE INDEX IF NOT EXISTS {} ON {}.{} ({})",
                quoted(&format!("{}_{}_idx", entity.table_name, fk.column)),
                quoted(schema),
                quoted(&entity.table_name),
                quoted(&fk.column)
            ));
        }
    }
    Ok(out)
}

/// Create everything the model needs. Existing objects are left untouched.
pub async fn apply_migrations(pool: &PgPool, model: &ResolvedModel) -> Result<(), AppError> {
    let statements = ddl_statements(model)?;
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(%sql, "ddl");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(
        schema = %model.schema_name,
        tables = model.entities.len(),
        statements = statements.len(),
        "migrations applied"
    );
    Ok(())
}
