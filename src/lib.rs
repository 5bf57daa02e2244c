//! Panel SDK: filter-tree SQL compilation, relational data access, and key/value config persistence
//! for admin panels.

pub mod actions;
pub mod credentials;
pub mod data;
pub mod error;
pub mod handlers;
pub mod persistence;
pub mod preferences;
pub mod query;
pub mod response;
pub mod routes;
pub mod settings;
pub mod state;
pub mod temp_storage;

pub use error::{AppError, ConfigError};
pub use persistence::{ConfigDomainPersistenceService, ConfigDomainServiceFactory, PersistenceAdaptor};
pub use query::{compile, Dialect, QueryFilterSchema, SqlRenderer, WhereClause};
pub use routes::{app_router, common_routes, common_routes_with_ready};
pub use settings::Settings;
pub use state::AppState;
