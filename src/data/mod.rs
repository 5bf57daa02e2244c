//! Relational data access: credentials-driven connection, entity CRUD, raw queries.

mod connection;
mod credentials;
mod pagination;
mod service;

pub use connection::{ConnectionFactory, DbConnection, ExecResult, SqlxConnection, SqlxConnectionFactory};
pub use credentials::{
    database_credential_group, DataSourceCredentials, DATABASE_CREDENTIAL_FIELDS, DATABASE_CREDENTIAL_GROUP_KEY,
};
pub use pagination::PaginationFilters;
pub use service::RdbmsDataService;
