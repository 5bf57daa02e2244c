use crate::error::AppError;
use crate::preferences::UserPreferenceKey;
use crate::response::success_one;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::IntoResponse,
    Json,
};
use serde_json::Value;

/// Set by the upstream auth layer.
pub const USERNAME_HEADER: &str = "x-username";

fn username(headers: &HeaderMap) -> Result<String, AppError> {
    headers
        .get(USERNAME_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .ok_or_else(|| AppError::BadRequest("missing X-Username header".into()))
}

pub async fn show(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, AppError> {
    let username = username(&headers)?;
    let key: UserPreferenceKey = key.parse()?;
    Ok(success_one(state.preferences.show(&username, key).await?))
}

pub async fn upsert(
    State(state): State<AppState>,
    Path(key): Path<String>,
    headers: HeaderMap,
    Json(value): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let username = username(&headers)?;
    let key: UserPreferenceKey = key.parse()?;
    state.preferences.upsert(&username, key, value.clone()).await?;
    Ok(success_one(value))
}
