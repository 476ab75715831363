//! Resolved model: catalog validated and flattened for runtime use.

use crate::model::{OnDelete, ValidationRule};
use std::collections::{HashMap, HashSet};

/// Storage and wire type of a column.
#[derive(Clone, Debug, PartialEq)]
pub enum ColumnKind {
    /// Generated identity, read-only on the wire.
    Identity,
    BigInt,
    Integer,
    Varchar { max_length: Option<u32> },
    Float,
    Boolean,
    /// Calendar date, `YYYY-MM-DD` on the wire.
    Date,
    /// Elapsed time, `[D ]HH:MM:SS[.ffffff]` on the wire.
    Duration,
    Enum { name: String, values: Vec<String> },
}

impl ColumnKind {
    /// SQL type used in DDL and parameter casts.
    pub fn sql_type(&self, schema: &str) -> String {
        match self {
            ColumnKind::Identity | ColumnKind::BigInt => "bigint".into(),
            ColumnKind::Integer => "integer".into(),
            ColumnKind::Varchar { .. } => "varchar".into(),
            ColumnKind::Float => "double precision".into(),
            ColumnKind::Boolean => "boolean".into(),
            ColumnKind::Date => "date".into(),
            ColumnKind::Duration => "interval".into(),
            ColumnKind::Enum { name, .. } => format!("\"{}\".\"{}\"", schema, name),
        }
    }
}

/// Outgoing many-to-one reference.
#[derive(Clone, Debug)]
pub struct ForeignKey {
    pub column: String,
    /// Table id of the referenced entity.
    pub target: String,
    pub on_delete: OnDelete,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
}

impl ColumnInfo {
    pub fn is_identity(&self) -> bool {
        self.kind == ColumnKind::Identity
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "list" => Some(Operation::List),
            "read" => Some(Operation::Read),
            "create" => Some(Operation::Create),
            "update" => Some(Operation::Update),
            "delete" => Some(Operation::Delete),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        }
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    pub table_id: String,
    pub table_name: String,
    /// Present when the table is exposed as a REST resource.
    pub path_segment: Option<String>,
    pub pk_column: String,
    pub columns: Vec<ColumnInfo>,
    /// Every unique constraint, single-column ones included.
    pub unique: Vec<Vec<String>>,
    pub foreign_keys: Vec<ForeignKey>,
    pub operations: HashSet<Operation>,
    pub credential_columns: HashSet<String>,
    pub write_only_columns: HashSet<String>,
    pub validation: HashMap<String, ValidationRule>,
}

impl ResolvedEntity {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    /// Columns accepted on input (everything except the identity).
    pub fn writable_columns(&self) -> impl Iterator<Item = &ColumnInfo> {
        self.columns.iter().filter(|c| !c.is_identity())
    }

    pub fn foreign_key(&self, column: &str) -> Option<&ForeignKey> {
        self.foreign_keys.iter().find(|fk| fk.column == column)
    }

    /// Name used in log lines and error messages.
    pub fn label(&self) -> &str {
        self.path_segment.as_deref().unwrap_or(&self.table_name)
    }
}

#[derive(Clone, Debug)]
pub struct ResolvedModel {
    pub schema_name: String,
    pub enums: Vec<(String, Vec<String>)>,
    /// Tables in dependency order (referenced tables first).
    pub entities: Vec<ResolvedEntity>,
    by_path: HashMap<String, usize>,
    by_table: HashMap<String, usize>,
}

impl ResolvedModel {
    pub(crate) fn new(
        schema_name: String,
        enums: Vec<(String, Vec<String>)>,
        entities: Vec<ResolvedEntity>,
    ) -> Self {
        let by_path = entities
            .iter()
            .enumerate()
            .filter_map(|(i, e)| e.path_segment.clone().map(|p| (p, i)))
            .collect();
        let by_table = entities
            .iter()
            .enumerate()
            .map(|(i, e)| (e.table_id.clone(), i))
            .collect();
        ResolvedModel {
            schema_name,
            enums,
            entities,
            by_path,
            by_table,
        }
    }

    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.by_path.get(path).map(|&i| &self.entities[i])
    }

    pub fn entity_by_table(&self, table_id: &str) -> Option<&ResolvedEntity> {
        self.by_table.get(table_id).map(|&i| &self.entities[i])
    }

    /// Every (entity, foreign key) pair pointing at `table_id`.
    pub fn referencing<'a>(
        &'a self,
        table_id: &'a str,
    ) -> impl Iterator<Item = (&'a ResolvedEntity, &'a ForeignKey)> + 'a {
        self.entities.iter().flat_map(move |e| {
            e.foreign_keys
                .iter()
                .filter(move |fk| fk.target == table_id)
                .map(move |fk| (e, fk))
        })
    }

    /// Same model placed in another database schema.
    pub fn with_schema(mut self, schema_name: &str) -> Self {
        self.schema_name = schema_name.to_string();
        self
    }
}
