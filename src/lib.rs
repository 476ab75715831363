//! DdS gestion: logistics REST backend (accounts, routes, shipments, packages) over PostgreSQL.

pub mod doc;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod model;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;
pub mod store;

pub use error::{AppError, ConfigError};
pub use migration::apply_migrations;
pub use model::{builtin_model, resolve, ResolvedEntity, ResolvedModel};
pub use routes::{app, router};
pub use service::{resolve_by_external_id, CrudService};
pub use settings::{Settings, StorageBackend};
pub use state::AppState;
pub use store::{connect, ensure_database_exists, MemoryStore, PgStore, RowStore};
