//! Runtime settings read from the process environment.

use crate::error::ConfigError;
use std::net::SocketAddr;

/// Where rows are kept.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Postgres,
    /// In-process tables; nothing survives a restart.
    Memory,
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub database_url: String,
    pub bind_addr: SocketAddr,
    pub max_connections: u32,
    /// Database schema holding the tables. From `GESTION_SCHEMA`, default `gestion`.
    pub schema: String,
    pub storage: StorageBackend,
    /// Strip credential columns (passwords) from responses.
    pub redact_credentials: bool,
    pub body_limit_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            database_url: "postgres://localhost/gestion".into(),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            max_connections: 5,
            schema: "gestion".into(),
            storage: StorageBackend::Postgres,
            redact_credentials: false,
            body_limit_bytes: 1024 * 1024,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from any key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut s = Settings::default();
        if let Some(v) = lookup("DATABASE_URL") {
            s.database_url = v;
        }
        if let Some(v) = lookup("BIND_ADDR") {
            s.bind_addr = parse("BIND_ADDR", &v)?;
        }
        if let Some(v) = lookup("DB_MAX_CONNECTIONS") {
            s.max_connections = parse("DB_MAX_CONNECTIONS", &v)?;
        }
        if let Some(v) = lookup("GESTION_SCHEMA") {
            if !is_identifier(&v) {
                return Err(ConfigError::Setting {
                    name: "GESTION_SCHEMA",
                    message: format!("'{}' is not a valid identifier", v),
                });
            }
            s.schema = v;
        }
        if let Some(v) = lookup("STORAGE_BACKEND") {
            s.storage = match v.to_ascii_lowercase().as_str() {
                "postgres" | "postgresql" => StorageBackend::Postgres,
                "memory" => StorageBackend::Memory,
                other => {
                    return Err(ConfigError::Setting {
                        name: "STORAGE_BACKEND",
                        message: format!("expected 'postgres' or 'memory', got '{}'", other),
                    })
                }
            };
        }
        if let Some(v) = lookup("REDACT_CREDENTIALS") {
            s.redact_credentials = parse_bool("REDACT_CREDENTIALS", &v)?;
        }
        if let Some(v) = lookup("BODY_LIMIT_BYTES") {
            s.body_limit_bytes = parse("BODY_LIMIT_BYTES", &v)?;
        }
        Ok(s)
    }
}

fn parse<T>(name: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| ConfigError::Setting {
        name,
        message: e.to_string(),
    })
}

fn parse_bool(name: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(ConfigError::Setting {
            name,
            message: format!("expected a boolean, got '{}'", other),
        }),
    }
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
