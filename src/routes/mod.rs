mod account;
mod common;
mod data;

pub use account::account_routes;
pub use common::{common_routes, common_routes_with_ready};
pub use data::data_routes;

use crate::state::AppState;
use axum::Router;
use tower_http::limit::RequestBodyLimitLayer;

pub const DEFAULT_BODY_LIMIT: usize = 1024 * 1024;

/// Full HTTP surface: common routes, `/data`, `/account`.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .merge(common_routes_with_ready(state.clone()))
        .nest("/data", data_routes(state.clone()))
        .nest("/account", account_routes(state))
        .layer(RequestBodyLimitLayer::new(DEFAULT_BODY_LIMIT))
}
