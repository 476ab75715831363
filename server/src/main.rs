//! gestion-server: serves the dds-gestion REST API.
//!
//! Run from repo root: `cargo run -p gestion-server`
//! `STORAGE_BACKEND=memory` starts without a database.

use axum::extract::Request;
use axum::ServiceExt;
use dds_gestion::{
    app, apply_migrations, builtin_model, connect, ensure_database_exists, AppState, MemoryStore,
    PgStore, RowStore, Settings, StorageBackend,
};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("dds_gestion=info,gestion_server=info,tower_http=info")
            }),
        )
        .init();

    let settings = Settings::from_env()?;
    let model = Arc::new(builtin_model()?.with_schema(&settings.schema));

    let store: Arc<dyn RowStore> = match settings.storage {
        StorageBackend::Postgres => {
            ensure_database_exists(&settings.database_url).await?;
            let pool = connect(&settings).await?;
            apply_migrations(&pool, &model).await?;
            Arc::new(PgStore::new(pool, settings.schema.clone()))
        }
        StorageBackend::Memory => {
            tracing::info!("using in-memory storage; data is lost on exit");
            Arc::new(MemoryStore::new(model.clone()))
        }
    };

    if !settings.redact_credentials {
        tracing::warn!("credential columns are returned verbatim; set REDACT_CREDENTIALS=true to hide them");
    }

    let state = AppState::new(store, model, settings.redact_credentials);
    let app = app(state, &settings);

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!("gestion-server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, ServiceExt::<Request>::into_make_service(app)).await?;
    Ok(())
}
