//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::model::{ColumnInfo, ColumnKind, ResolvedEntity};
use serde_json::{Map, Value};

/// Quote identifier for PostgreSQL (safe: only from the catalog).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Debug)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    fn push_param(&mut self, v: Value) -> usize {
        self.params.push(v);
        self.params.len()
    }
}

/// Placeholder cast to the column's type so text and numeric params bind correctly.
fn placeholder(col: &ColumnInfo, n: usize, schema: &str) -> String {
    format!("${}::{}", n, col.kind.sql_type(schema))
}

/// SELECT list: enums come back as text, durations as whole microseconds.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            match c.kind {
                ColumnKind::Enum { .. } => format!("{}::text AS {}", q, q),
                ColumnKind::Duration => {
                    format!("(EXTRACT(EPOCH FROM {}) * 1000000)::bigint AS {}", q, q)
                }
                _ => q,
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT every row ordered by primary key.
pub fn select_all(entity: &ResolvedEntity, schema: &str) -> QueryBuf {
    let mut q = QueryBuf::new();
    q.sql = format!(
        "SELECT {} FROM {} ORDER BY {}",
        select_column_list(entity),
        qualified_table(schema, &entity.table_name),
        quoted(&entity.pk_column)
    );
    q
}

/// SELECT by primary key.
pub fn select_by_id(entity: &ResolvedEntity, schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = ${}",
        select_column_list(entity),
        qualified_table(schema, &entity.table_name),
        quoted(&entity.pk_column),
        n
    );
    q
}

/// SELECT rows WHERE column IN ($1, $2, ...) ORDER BY pk.
/// Callers must pass a column that exists on the entity.
pub fn select_by_column_in(
    entity: &ResolvedEntity,
    schema: &str,
    column: &ColumnInfo,
    values: &[Value],
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let table = qualified_table(schema, &entity.table_name);
    let cols = select_column_list(entity);
    if values.is_empty() {
        q.sql = format!("SELECT {} FROM {} WHERE 1 = 0", cols, table);
        return q;
    }
    let placeholders: Vec<String> = values
        .iter()
        .map(|v| {
            let n = q.push_param(v.clone());
            placeholder(column, n, schema)
        })
        .collect();
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} IN ({}) ORDER BY {}",
        cols,
        table,
        quoted(&column.name),
        placeholders.join(", "),
        quoted(&entity.pk_column)
    );
    q
}

/// INSERT the writable columns present in `values`; the identity is generated.
pub fn insert(entity: &ResolvedEntity, schema: &str, values: &Map<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in entity.writable_columns() {
        let Some(val) = values.get(&c.name) else { continue };
        let n = q.push_param(val.clone());
        cols.push(quoted(&c.name));
        placeholders.push(placeholder(c, n, schema));
    }
    let table = qualified_table(schema, &entity.table_name);
    let returning = select_column_list(entity);
    q.sql = if cols.is_empty() {
        format!("INSERT INTO {} DEFAULT VALUES RETURNING {}", table, returning)
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table,
            cols.join(", "),
            placeholders.join(", "),
            returning
        )
    };
    q
}

/// UPDATE by id: SET only writable columns present in `values`.
/// With nothing to set this degrades to a SELECT by id.
pub fn update(
    entity: &ResolvedEntity,
    schema: &str,
    id: i64,
    values: &Map<String, Value>,
) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut sets = Vec::new();
    for c in entity.writable_columns() {
        let Some(val) = values.get(&c.name) else { continue };
        let n = q.push_param(val.clone());
        sets.push(format!("{} = {}", quoted(&c.name), placeholder(c, n, schema)));
    }
    if sets.is_empty() {
        return select_by_id(entity, schema, id);
    }
    let id_param = q.push_param(Value::from(id));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = ${} RETURNING {}",
        qualified_table(schema, &entity.table_name),
        sets.join(", "),
        quoted(&entity.pk_column),
        id_param,
        select_column_list(entity)
    );
    q
}

/// DELETE by id.
pub fn delete(entity: &ResolvedEntity, schema: &str, id: i64) -> QueryBuf {
    let mut q = QueryBuf::new();
    let n = q.push_param(Value::from(id));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = ${} RETURNING {}",
        qualified_table(schema, &entity.table_name),
        quoted(&entity.pk_column),
        n,
        quoted(&entity.pk_column)
    );
    q
}
