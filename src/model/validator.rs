//! Catalog validation: referential integrity and API consistency.

use crate::error::ConfigError;
use crate::model::Catalog;
use std::collections::{HashMap, HashSet};

const OPERATIONS: &[&str] = &["list", "read", "create", "update", "delete"];

pub fn validate(catalog: &Catalog) -> Result<(), ConfigError> {
    if catalog.schemas.is_empty() {
        return Err(ConfigError::Validation("at least one schema required".into()));
    }

    let table_ids: HashSet<&str> = catalog.tables.iter().map(|t| t.id.as_str()).collect();
    if table_ids.len() != catalog.tables.len() {
        return Err(ConfigError::Validation("duplicate table id".into()));
    }
    let enum_names: HashSet<&str> = catalog.enums.iter().map(|e| e.name.as_str()).collect();

    let mut columns_by_table: HashMap<&str, HashSet<&str>> = HashMap::new();
    for c in &catalog.columns {
        if !table_ids.contains(c.table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: c.table_id.clone(),
            });
        }
        if !columns_by_table
            .entry(c.table_id.as_str())
            .or_default()
            .insert(c.name.as_str())
        {
            return Err(ConfigError::Validation(format!(
                "duplicate column {}.{}",
                c.table_id, c.name
            )));
        }
        let type_name = c.type_.name();
        if !is_builtin_type(type_name) && !enum_names.contains(type_name) {
            return Err(ConfigError::MissingReference {
                kind: "type",
                id: type_name.to_string(),
            });
        }
    }

    for e in &catalog.enums {
        if e.values.is_empty() {
            return Err(ConfigError::Validation(format!("enum {} has no values", e.name)));
        }
    }

    for t in &catalog.tables {
        let cols = columns_by_table.get(t.id.as_str());
        let has = |name: &str| cols.map(|c| c.contains(name)).unwrap_or(false);
        if !has(&t.primary_key) {
            return Err(ConfigError::InvalidPrimaryKey {
                table_id: t.id.clone(),
                column: t.primary_key.clone(),
            });
        }
        for group in &t.unique {
            for col in group {
                if !has(col) {
                    return Err(ConfigError::MissingReference {
                        kind: "unique column",
                        id: format!("{}.{}", t.id, col),
                    });
                }
            }
        }
    }

    for r in &catalog.relationships {
        let from_ok = columns_by_table
            .get(r.from_table_id.as_str())
            .map(|c| c.contains(r.from_column.as_str()))
            .unwrap_or(false);
        if !from_ok || !table_ids.contains(r.to_table_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "relationship",
                id: r.id.clone(),
            });
        }
        if r.on_delete == crate::model::OnDelete::SetNull {
            let nullable = catalog
                .columns
                .iter()
                .any(|c| c.table_id == r.from_table_id && c.name == r.from_column && c.nullable);
            if !nullable {
                return Err(ConfigError::Validation(format!(
                    "relationship {} is SET NULL on a non-nullable column",
                    r.id
                )));
            }
        }
    }

    let mut path_segments = HashSet::new();
    for api in &catalog.api_entities {
        if !table_ids.contains(api.entity_id.as_str()) {
            return Err(ConfigError::MissingReference {
                kind: "table",
                id: api.entity_id.clone(),
            });
        }
        if !path_segments.insert(api.path_segment.as_str()) {
            return Err(ConfigError::DuplicatePathSegment(api.path_segment.clone()));
        }
        if let Some(op) = api.operations.iter().find(|o| !OPERATIONS.contains(&o.as_str())) {
            return Err(ConfigError::Validation(format!(
                "unknown operation '{}' on {}",
                op, api.path_segment
            )));
        }
        let cols = columns_by_table.get(api.entity_id.as_str());
        for col in api
            .credential_columns
            .iter()
            .chain(&api.write_only_columns)
            .chain(api.validation.keys())
        {
            if !cols.map(|c| c.contains(col.as_str())).unwrap_or(false) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: format!("{}.{}", api.entity_id, col),
                });
            }
        }
    }

    Ok(())
}

fn is_builtin_type(name: &str) -> bool {
    matches!(
        name,
        "bigint" | "integer" | "varchar" | "double precision" | "boolean" | "date" | "interval"
    )
}
