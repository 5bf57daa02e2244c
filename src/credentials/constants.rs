use super::KeyValue;
use crate::error::AppError;
use crate::persistence::ConfigDomainPersistenceService;

/// Plaintext app-wide constants, exposed to action templates as `CONSTANTS`.
#[derive(Clone)]
pub struct AppConstantsService {
    store: ConfigDomainPersistenceService<String>,
}

impl AppConstantsService {
    pub fn new(store: ConfigDomainPersistenceService<String>) -> Self {
        AppConstantsService { store }
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.store.setup().await
    }

    pub async fn upsert(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.store.upsert_item(key, value.to_string()).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.store.remove_item(key).await
    }

    pub async fn list(&self) -> Result<Vec<KeyValue>, AppError> {
        let mut rows: Vec<KeyValue> = self
            .store
            .get_all_as_key_value()
            .await?
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }
}
