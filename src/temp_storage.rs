//! Short-lived values with an expiry. Expired entries are dropped on read.

use crate::error::AppError;
use crate::persistence::ConfigDomainPersistenceService;
use chrono::{DateTime, Duration, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TempStorageItem {
    /// JSON-encoded payload.
    pub data: String,
    pub expiry_date: DateTime<Utc>,
}

#[derive(Clone)]
pub struct TempStorageService {
    store: ConfigDomainPersistenceService<TempStorageItem>,
}

impl TempStorageService {
    pub fn new(store: ConfigDomainPersistenceService<TempStorageItem>) -> Self {
        TempStorageService { store }
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.store.setup().await
    }

    pub async fn persist_item<T: Serialize>(&self, key: &str, data: &T, seconds: i64) -> Result<(), AppError> {
        let out_of_range = || AppError::BadRequest(format!("expiry of {} seconds is out of range", seconds));
        let ttl = Duration::try_seconds(seconds).ok_or_else(out_of_range)?;
        let expiry_date = Utc::now().checked_add_signed(ttl).ok_or_else(out_of_range)?;
        let item = TempStorageItem {
            data: serde_json::to_string(data)?,
            expiry_date,
        };
        self.store.persist_item(key, item).await
    }

    pub async fn get_item<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, AppError> {
        let Some(item) = self.store.get_item(key).await? else {
            return Ok(None);
        };
        if item.expiry_date <= Utc::now() {
            tracing::warn!(key = %key, expired_at = %item.expiry_date, "temp item expired");
            self.store.remove_item(key).await?;
            return Ok(None);
        }
        Ok(Some(serde_json::from_str(&item.data)?))
    }

    pub async fn clear_item(&self, key: &str) -> Result<(), AppError> {
        self.store.remove_item(key).await
    }
}
