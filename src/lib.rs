pub mod config;
pub mod db;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, Method},
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use services::{whatsapp::WhatsAppService, ServiceError};

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// `None` when no `DATABASE_URL` is configured.
    pub db: Option<PgPool>,
    pub config: Arc<Config>,
    pub whatsapp: Arc<WhatsAppService>,
}

impl AppState {
    pub fn new(db: Option<PgPool>, config: Config) -> anyhow::Result<Self> {
        let whatsapp = WhatsAppService::new(config.whatsapp.clone())?;
        Ok(Self {
            db,
            config: Arc::new(config),
            whatsapp: Arc::new(whatsapp),
        })
    }

    pub fn pool(&self) -> Result<&PgPool, ServiceError> {
        self.db.as_ref().ok_or(ServiceError::NoDatabase)
    }
}

/// The full HTTP surface. CORS is open to any origin.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        .route(
            "/api/students",
            get(routes::students::get_students)
                .post(routes::students::create_student)
                .put(routes::students::update_student)
                .delete(routes::students::delete_student),
        )
        .route(
            "/api/payments",
            get(routes::payments::list_payments)
                .post(routes::payments::create_payment)
                .put(routes::payments::update_payment),
        )
        .route("/api/seats", get(routes::seats::list_seats))
        .route("/api/seats-availability", get(routes::seats::seat_availability))
        .route(
            "/api/settings",
            get(routes::settings::get_settings).put(routes::settings::update_settings),
        )
        .route("/api/whatsapp", post(routes::whatsapp::send_message))
        .route("/api/whatsapp/reminders", post(routes::whatsapp::send_reminders))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
