//! Record <-> wire conversion. Every column is exposed under its own name.

use super::validation::RequestValidator;
use crate::error::AppError;
use crate::model::duration::{format_micros, parse_micros};
use crate::model::{ColumnInfo, ColumnKind, ResolvedEntity};
use crate::store::Record;
use chrono::NaiveDate;
use serde_json::{Number, Value};

/// How much of the record a write must carry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    /// POST: every non-nullable column is required, absent nullable ones are stored as null.
    Create,
    /// PUT: every non-nullable column is required, absent nullable ones keep their stored value.
    Replace,
    /// PATCH: only the fields present are touched.
    Partial,
}

pub struct RecordSerializer;

impl RecordSerializer {
    /// Stored row to response body. Write-only columns never leave; credential
    /// columns are dropped only when `redact` is set.
    pub fn to_wire(entity: &ResolvedEntity, mut row: Record, redact: bool) -> Value {
        row.retain(|col, _| {
            !entity.write_only_columns.contains(col)
                && !(redact && entity.credential_columns.contains(col))
        });
        Value::Object(row)
    }

    /// Request body to column values ready for the store. The identity and
    /// unknown fields are ignored.
    pub fn from_wire(entity: &ResolvedEntity, body: &Value, mode: Mode) -> Result<Record, AppError> {
        let body = body
            .as_object()
            .ok_or_else(|| AppError::BadRequest("request body must be a JSON object".into()))?;

        let mut out = Record::new();
        for col in entity.writable_columns() {
            let value = match (body.get(&col.name), mode) {
                (None, Mode::Partial) => continue,
                (None, Mode::Replace) if col.nullable => continue,
                (None, Mode::Create) if col.nullable => Value::Null,
                (None, _) => {
                    return Err(AppError::invalid(&col.name, "This field is required."))
                }
                (Some(Value::Null), _) if col.nullable => Value::Null,
                (Some(Value::Null), _) => {
                    return Err(AppError::invalid(&col.name, "This field may not be null."))
                }
                (Some(v), _) => coerce(entity, col, v)?,
            };
            out.insert(col.name.clone(), value);
        }

        match mode {
            Mode::Create | Mode::Replace => RequestValidator::validate(&out, &entity.validation)?,
            Mode::Partial => RequestValidator::validate_partial(&out, &entity.validation)?,
        }
        Ok(out)
    }
}

fn coerce(entity: &ResolvedEntity, col: &ColumnInfo, v: &Value) -> Result<Value, AppError> {
    let name = col.name.as_str();
    match &col.kind {
        ColumnKind::Identity => Ok(v.clone()),
        ColumnKind::BigInt => {
            let n = as_integer(v).ok_or_else(|| AppError::invalid(name, "A valid integer is required."))?;
            if entity.foreign_key(name).is_some() && n < 1 {
                return Err(AppError::invalid(
                    name,
                    format!("Invalid pk \"{}\" - object does not exist.", n),
                ));
            }
            Ok(Value::from(n))
        }
        ColumnKind::Integer => {
            let n = as_integer(v)
                .and_then(|n| i32::try_from(n).ok())
                .ok_or_else(|| AppError::invalid(name, "A valid integer is required."))?;
            Ok(Value::from(n))
        }
        ColumnKind::Varchar { max_length } => {
            let s = as_text(v).ok_or_else(|| AppError::invalid(name, "Not a valid string."))?;
            if let Some(max) = max_length {
                if s.chars().count() > *max as usize {
                    return Err(AppError::invalid(
                        name,
                        format!("Ensure this field has no more than {} characters.", max),
                    ));
                }
            }
            Ok(Value::String(s))
        }
        ColumnKind::Float => {
            let f = match v {
                Value::Number(n) => n.as_f64(),
                Value::String(s) => s.trim().parse::<f64>().ok(),
                _ => None,
            };
            f.and_then(Number::from_f64)
                .map(Value::Number)
                .ok_or_else(|| AppError::invalid(name, "A valid number is required."))
        }
        ColumnKind::Boolean => {
            let b = match v {
                Value::Bool(b) => Some(*b),
                Value::Number(n) => match n.as_i64() {
                    Some(1) => Some(true),
                    Some(0) => Some(false),
                    _ => None,
                },
                Value::String(s) => match s.to_ascii_lowercase().as_str() {
                    "true" | "1" => Some(true),
                    "false" | "0" => Some(false),
                    _ => None,
                },
                _ => None,
            };
            b.map(Value::Bool)
                .ok_or_else(|| AppError::invalid(name, "Must be a valid boolean."))
        }
        ColumnKind::Date => v
            .as_str()
            .and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok())
            .map(|d| Value::String(d.format("%Y-%m-%d").to_string()))
            .ok_or_else(|| {
                AppError::invalid(name, "Date has wrong format. Use one of these formats instead: YYYY-MM-DD.")
            }),
        ColumnKind::Duration => as_text(v)
            .and_then(|s| parse_micros(&s))
            .map(|micros| Value::String(format_micros(micros)))
            .ok_or_else(|| {
                AppError::invalid(
                    name,
                    "Duration has wrong format. Use one of these formats instead: [DD] [HH:[MM:]]ss[.uuuuuu].",
                )
            }),
        ColumnKind::Enum { values, .. } => match v.as_str() {
            Some(s) if values.iter().any(|allowed| allowed == s) => Ok(Value::String(s.to_string())),
            _ => Err(AppError::invalid(name, format!("\"{}\" is not a valid choice.", display(v)))),
        },
    }
}

fn as_integer(v: &Value) -> Option<i64> {
    match v {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15).map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Strings pass through; numbers are accepted as their decimal text.
fn as_text(v: &Value) -> Option<String> {
    match v {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn display(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
