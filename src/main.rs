use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tower_sessions::ExpiredDeletion;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod database;
mod forecast;
mod routes;
mod service;
mod session;

use config::Config;
use database::Database;
use forecast::{autocomplete::PlaceSearchClient, openmeteo::OpenMeteoClient};
use routes::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "weather_lookup=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let pool = sqlx::SqlitePool::connect(&config.database_url).await?;
    let database = Arc::new(Database::new(pool.clone()));
    database.init_tables().await?;

    let weather_client = Arc::new(OpenMeteoClient::new(config.clone())?);
    let place_client = Arc::new(PlaceSearchClient::new(config.clone())?);

    let (session_layer, session_store) =
        session::sqlite_session_layer(pool, config.session_inactivity()).await?;
    tokio::spawn(async move {
        if let Err(e) = session_store
            .continuously_delete_expired(tokio::time::Duration::from_secs(60))
            .await
        {
            tracing::error!("Expired session sweep stopped: {}", e);
        }
    });

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        config: Arc::new(config),
        database,
        weather_client,
        place_client,
    };

    let app = create_router(state)
        .layer(session_layer)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Server starting on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
