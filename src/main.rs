use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use library_seats_api::{config::Config, db, router, services, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = match config.database_url.as_deref() {
        Some(url) => {
            let pool = db::create_pool(url)?;
            match db::run_migrations(&pool).await {
                Ok(()) => info!("Database connected and migrations applied"),
                Err(e) => warn!("Database unavailable at startup, continuing: {e}"),
            }
            services::metrics::start(pool.clone());
            Some(pool)
        }
        None => {
            warn!("DATABASE_URL not set, every read serves fallback data");
            None
        }
    };

    if config.whatsapp.username.is_none() || config.whatsapp.secret.is_none() {
        info!("WhatsApp gateway credentials not configured, sending is disabled");
    }

    let addr = format!("{}:{}", config.host, config.port);
    let state = AppState::new(pool, config)?;
    let app = router(state);

    info!("library seats API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
