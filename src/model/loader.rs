//! Load the embedded catalog and resolve it into a runtime model.

use crate::error::ConfigError;
use crate::model::resolved::{ColumnInfo, ColumnKind, ForeignKey, Operation, ResolvedEntity, ResolvedModel};
use crate::model::types::*;
use crate::model::validate;
use std::collections::{HashMap, HashSet};

const BUILTIN_CATALOG: &str = include_str!("catalog.json");

/// Parse the data model shipped with the crate.
pub fn builtin_catalog() -> Result<Catalog, ConfigError> {
    serde_json::from_str(BUILTIN_CATALOG).map_err(|e| ConfigError::Load(e.to_string()))
}

/// Build the resolved model from a catalog (validates first).
pub fn resolve(catalog: &Catalog) -> Result<ResolvedModel, ConfigError> {
    validate(catalog)?;

    let schema_name = catalog.schemas[0].name.clone();
    let enums_by_name: HashMap<&str, &EnumConfig> =
        catalog.enums.iter().map(|e| (e.name.as_str(), e)).collect();
    let api_by_table: HashMap<&str, &ApiEntityConfig> = catalog
        .api_entities
        .iter()
        .map(|a| (a.entity_id.as_str(), a))
        .collect();
    let columns_by_table: HashMap<&str, Vec<&ColumnConfig>> =
        catalog.columns.iter().fold(HashMap::new(), |mut m, c| {
            m.entry(c.table_id.as_str()).or_default().push(c);
            m
        });

    let mut entities = Vec::with_capacity(catalog.tables.len());
    for table in dependency_order(catalog)? {
        let table_columns = columns_by_table
            .get(table.id.as_str())
            .map(|v| v.as_slice())
            .unwrap_or(&[]);

        let columns: Vec<ColumnInfo> = table_columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                kind: if c.name == table.primary_key {
                    ColumnKind::Identity
                } else {
                    column_kind(&c.type_, &enums_by_name)
                },
                nullable: c.nullable,
                unique: c.unique,
            })
            .collect();

        let mut unique: Vec<Vec<String>> = columns
            .iter()
            .filter(|c| c.unique)
            .map(|c| vec![c.name.clone()])
            .collect();
        unique.extend(table.unique.iter().cloned());

        let foreign_keys = catalog
            .relationships
            .iter()
            .filter(|r| r.from_table_id == table.id)
            .map(|r| ForeignKey {
                column: r.from_column.clone(),
                target: r.to_table_id.clone(),
                on_delete: r.on_delete,
            })
            .collect();

        let api = api_by_table.get(table.id.as_str());
        let entity = ResolvedEntity {
            table_id: table.id.clone(),
            table_name: table.name.clone(),
            path_segment: api.map(|a| a.path_segment.clone()),
            pk_column: table.primary_key.clone(),
            columns,
            unique,
            foreign_keys,
            operations: api
                .map(|a| a.operations.iter().filter_map(|o| Operation::parse(o)).collect())
                .unwrap_or_default(),
            credential_columns: api
                .map(|a| a.credential_columns.iter().cloned().collect())
                .unwrap_or_default(),
            write_only_columns: api
                .map(|a| a.write_only_columns.iter().cloned().collect())
                .unwrap_or_default(),
            validation: api.map(|a| a.validation.clone()).unwrap_or_default(),
        };
        entities.push(entity);
    }

    let enums = catalog
        .enums
        .iter()
        .map(|e| (e.name.clone(), e.values.clone()))
        .collect();
    Ok(ResolvedModel::new(schema_name, enums, entities))
}

/// Load and resolve the built-in catalog.
pub fn builtin_model() -> Result<ResolvedModel, ConfigError> {
    resolve(&builtin_catalog()?)
}

fn column_kind(ty: &ColumnTypeConfig, enums: &HashMap<&str, &EnumConfig>) -> ColumnKind {
    match ty.name() {
        "bigint" => ColumnKind::BigInt,
        "integer" => ColumnKind::Integer,
        "double precision" => ColumnKind::Float,
        "boolean" => ColumnKind::Boolean,
        "date" => ColumnKind::Date,
        "interval" => ColumnKind::Duration,
        name => match enums.get(name) {
            Some(e) => ColumnKind::Enum {
                name: e.name.clone(),
                values: e.values.clone(),
            },
            None => ColumnKind::Varchar {
                max_length: ty.first_param(),
            },
        },
    }
}

/// Tables sorted so that every referenced table precedes the tables pointing at it.
fn dependency_order(catalog: &Catalog) -> Result<Vec<&TableConfig>, ConfigError> {
    let mut placed: HashSet<&str> = HashSet::new();
    let mut ordered = Vec::with_capacity(catalog.tables.len());
    while ordered.len() < catalog.tables.len() {
        let before = ordered.len();
        for t in &catalog.tables {
            if placed.contains(t.id.as_str()) {
                continue;
            }
            let ready = catalog
                .relationships
                .iter()
                .filter(|r| r.from_table_id == t.id && r.to_table_id != t.id)
                .all(|r| placed.contains(r.to_table_id.as_str()));
            if ready {
                placed.insert(t.id.as_str());
                ordered.push(t);
            }
        }
        if ordered.len() == before {
            return Err(ConfigError::Validation("foreign keys form a cycle".into()));
        }
    }
    Ok(ordered)
}
