pub mod config;
pub mod db;
pub mod logging;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;

use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::Config;
use crate::db::config::StoreKind;
use crate::db::{LearningUnitStore, SqliteInitError, SqliteStore};
use crate::state::AppState;

/// Open the store selected by the configuration.
pub async fn open_store(config: &Config) -> Result<LearningUnitStore, SqliteInitError> {
    match config.store {
        StoreKind::Memory => Ok(LearningUnitStore::memory()),
        StoreKind::Sqlite => Ok(LearningUnitStore::Sqlite(
            SqliteStore::open(&config.sqlite).await?,
        )),
    }
}

pub fn build_router(state: AppState) -> axum::Router {
    routes::router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

pub async fn create_app(config: Config) -> Result<axum::Router, SqliteInitError> {
    let store = open_store(&config).await?;
    Ok(build_router(AppState::new(store, config)))
}
