//! Greengrocer storefront - Backend Server

use std::{net::SocketAddr, sync::Arc, time::Duration};

use greengrocer_backend::{
    config::{Config, StorageBackend},
    create_app,
    store::{MemoryStore, PgStore, Store},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_FILTER: &str =
    "greengrocer_server=debug,greengrocer_backend=debug,tower_http=debug,sqlx=warn";

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| DEFAULT_FILTER.into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn connect_store(config: &Config) -> anyhow::Result<Arc<dyn Store>> {
    match config.storage.backend {
        StorageBackend::Memory => {
            tracing::warn!("Using the in-memory store; data is lost on restart");
            Ok(Arc::new(MemoryStore::new()))
        }
        StorageBackend::Postgres => {
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await?;
            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            Ok(Arc::new(PgStore::new(db_pool)))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    init_tracing(config.logging.json);

    tracing::info!("Starting Greengrocer Server");
    tracing::info!("Environment: {}", config.environment);

    let store = connect_store(&config).await?;
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    // Build application
    let app = create_app(AppState::new(store, config));

    // Start server
    tracing::info!("Listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
