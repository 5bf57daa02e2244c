//! Panel server: loads settings from the environment and serves the SDK routes.
//!
//! Run from repo root: `cargo run -p panel-server`

use panel_sdk::actions::IntegrationRegistry;
use panel_sdk::data::SqlxConnectionFactory;
use panel_sdk::{app_router, AppState, Settings};
use std::sync::Arc;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("panel_sdk=info,panel_server=info")),
        )
        .init();

    let settings = Settings::from_env()?;
    let state = AppState::from_settings(
        &settings,
        Arc::new(SqlxConnectionFactory::default()),
        IntegrationRegistry::new(),
    )
    .await?;
    state.bootstrap().await?;
    if let Err(e) = state.data.bootstrap().await {
        tracing::warn!(error = %e, "data source not connected yet; will retry on first request");
    }

    let app = app_router(state);
    let listener = TcpListener::bind(&settings.bind_addr).await?;
    tracing::info!("panel server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;
    Ok(())
}
