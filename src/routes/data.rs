//! Entity CRUD routes. `/:entity/count` takes precedence over `/:entity/:id`.

use crate::handlers::data::{count, create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, Router};

pub fn data_routes(state: AppState) -> Router {
    Router::new()
        .route("/:entity", get(list).post(create))
        .route("/:entity/count", get(count))
        .route("/:entity/:id", get(read).patch(update).delete(delete))
        .with_state(state)
}
