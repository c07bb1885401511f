use anyhow::Context;
use std::net::SocketAddr;

use skyledger_api::{app, state::{AppState, AuthConfig}};
use skyledger_store::app_config::Config;
use skyledger_store::database::is_memory_url;
use skyledger_store::DbClient;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "skyledger_api=debug,skyledger_booking=info,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load().context("Failed to load config")?;
    tracing::info!("Starting SkyLedger API on port {}", config.server.port);

    let db = DbClient::connect(&config.database)
        .await
        .with_context(|| format!("Failed to open {}", config.database.url))?;
    // An in-memory database starts empty on every boot.
    if is_memory_url(&config.database.url) {
        db.migrate().await.context("Failed to apply migrations")?;
    }

    let app_state = AppState::new(
        &db,
        &config.booking,
        AuthConfig {
            secret: config.auth.jwt_secret.clone(),
            expiration: config.auth.jwt_expiration_seconds,
        },
    );

    let app = app(app_state);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    axum::serve(listener, app).await.context("Server error")?;

    Ok(())
}
