//! Key/value config persistence: adaptor contract, domain-scoped typed service, and shipped adaptors.

mod database;
mod domain;
mod json_file;
mod memory;

pub use database::DatabaseAdaptor;
pub use domain::{ConfigDomainPersistenceService, ConfigDomainServiceFactory, SECONDARY_KEY_DELIMITER};
pub use json_file::JsonFileAdaptor;
pub use memory::MemoryAdaptor;

use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;

/// Well-known domain names.
pub mod domains {
    pub const ACTIVATED_ACTIONS: &str = "activated-actions";
    pub const ACTION_INSTANCES: &str = "action-instances";
    pub const TEMP_STORAGE: &str = "temp-storage";
    pub const USERS_PREFERENCES: &str = "users-preferences";
    pub const CREDENTIALS: &str = "credentials";
    pub const APP_CONSTANTS: &str = "app-constants";
}

/// Backing store for all config domains. Values are JSON; typing happens in
/// [`ConfigDomainPersistenceService`]. Concurrent writers to one key are not coordinated.
#[async_trait]
pub trait PersistenceAdaptor: Send + Sync {
    /// Idempotent: ensure the table/file exists.
    async fn setup(&self) -> Result<(), AppError>;

    async fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AppError>;

    /// Every (key, value) in the domain. Order unspecified.
    async fn list(&self, domain: &str) -> Result<Vec<(String, Value)>, AppError>;

    /// Fails with `Conflict` when the key exists.
    async fn insert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError>;

    async fn upsert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError>;

    /// No-op when absent.
    async fn remove(&self, domain: &str, key: &str) -> Result<(), AppError>;
}

pub(crate) fn conflict(domain: &str, key: &str) -> AppError {
    AppError::Conflict(format!("{} / {} already exists", domain, key))
}
