use crate::handlers::preferences::{show, upsert};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn account_routes(state: AppState) -> Router {
    Router::new()
        .route("/preferences/:key", get(show).put(upsert))
        .with_state(state)
}
