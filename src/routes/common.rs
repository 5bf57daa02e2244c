//! Common routes: health, readiness, version.

use crate::persistence::domains;
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use serde::Serialize;

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct ReadyBody {
    status: &'static str,
    config: &'static str,
    database: &'static str,
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

/// 503 only when config storage is unreachable; an unconfigured data source is reported, not fatal.
async fn ready(State(state): State<AppState>) -> (StatusCode, Json<ReadyBody>) {
    if state.persistence.list(domains::APP_CONSTANTS).await.is_err() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ReadyBody {
                status: "degraded",
                config: "unavailable",
                database: "unknown",
            }),
        );
    }
    let database = match state.data.bootstrap().await {
        Ok(()) => "ok",
        Err(e) => {
            tracing::warn!(error = %e, "data source not ready");
            "unavailable"
        }
    };
    (
        StatusCode::OK,
        Json(ReadyBody {
            status: "ok",
            config: "ok",
            database,
        }),
    )
}

async fn version() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "name": env!("CARGO_PKG_NAME"),
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// GET /health, GET /version.
pub fn common_routes() -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/version", get(version))
}

/// Adds GET /ready.
pub fn common_routes_with_ready(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ready", get(ready))
        .route("/version", get(version))
        .with_state(state)
}
