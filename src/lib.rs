pub mod config;
pub mod controllers;
pub mod database;
pub mod error;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;

use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use services::BookingService;
use storage::PgBookingStore;

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub db: database::Database,
    pub booking: BookingService,
    pub config: config::Config,
}

impl AppState {
    pub async fn new(config: config::Config) -> anyhow::Result<Arc<Self>> {
        let db = database::Database::new(&config.database).await?;

        db.run_migrations().await?;

        Ok(Arc::new(Self::with_database(db, config)))
    }

    pub fn with_database(db: database::Database, config: config::Config) -> Self {
        let booking = BookingService::new(Arc::new(PgBookingStore::new(db.pool.clone())));
        Self { db, booking, config }
    }
}

pub fn app(state: Arc<AppState>) -> Router {
    let cors = if state.config.app.cors_allow_any_origin {
        CorsLayer::permissive()
    } else {
        CorsLayer::new()
    };

    Router::new()
        .route("/", get(|| async { "Planetarium API v1.0" }))
        .route("/health", get(|| async { "OK" }))
        .nest("/api/planetarium", controllers::planetarium_routes())
        .nest("/api/user", controllers::user_routes())
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}
