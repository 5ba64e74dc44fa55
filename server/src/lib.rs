pub mod auth;
pub mod config;
pub mod database;
pub mod models;
pub mod remote;
pub mod security;
pub mod server;
pub mod service;
pub mod state;
pub mod store;

use std::sync::Arc;

use config::{Config, StoreKind};
use database::Database;
use remote::{PostgrestClient, SharedRemote};
use store::{MemoryRecordStore, SharedStore, SqliteRecordStore};

/// Build the application state described by `config`.
pub fn build_state(config: &Config) -> anyhow::Result<state::AppState> {
    let db = Arc::new(Database::open(&config.database)?);
    db.seed_users(config.password_rounds)?;

    let store: SharedStore = match (config.store, config.memory_capacity) {
        (StoreKind::Sqlite, _) => Arc::new(SqliteRecordStore::new(db.clone())),
        (StoreKind::Memory, Some(capacity)) => Arc::new(MemoryRecordStore::with_capacity(capacity)),
        (StoreKind::Memory, None) => Arc::new(MemoryRecordStore::new()),
    };

    let remote: Option<SharedRemote> = match config.remote() {
        Some((url, key)) => match PostgrestClient::new(url, key, config.remote_timeout()) {
            Ok(client) => {
                tracing::info!(url, "Remote mirror enabled");
                Some(Arc::new(client))
            }
            Err(e) => {
                tracing::warn!(error = %e, "Remote mirror disabled");
                None
            }
        },
        None => {
            tracing::info!("No remote backend configured, using local storage only");
            None
        }
    };

    Ok(state::AppState::new(
        service::PhotoService::new(store, remote),
        auth::Authenticator::new(db, config.password_rounds),
    ))
}

pub async fn run(config: Config) -> anyhow::Result<()> {
    tracing::debug!(?config, "Starting");
    let state = build_state(&config)?;
    let photos = state.photos.clone();

    let app = server::router(state, config.body_limit_bytes, config.static_dir.as_deref());
    server::start_server(config.bind, app, server::shutdown_signal()).await?;

    tracing::info!("Waiting for pending remote mirrors");
    photos.flush().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}
