//! Typed, domain-scoped view over a [`PersistenceAdaptor`].

use super::PersistenceAdaptor;
use crate::error::AppError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use std::sync::Arc;

/// Joins a primary and secondary key into one storage key.
pub const SECONDARY_KEY_DELIMITER: &str = "__";

pub struct ConfigDomainPersistenceService<T> {
    adaptor: Arc<dyn PersistenceAdaptor>,
    domain: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for ConfigDomainPersistenceService<T> {
    fn clone(&self) -> Self {
        ConfigDomainPersistenceService {
            adaptor: Arc::clone(&self.adaptor),
            domain: self.domain.clone(),
            _marker: PhantomData,
        }
    }
}

impl<T> ConfigDomainPersistenceService<T>
where
    T: Serialize + DeserializeOwned + Send,
{
    pub fn domain(&self) -> &str {
        &self.domain
    }

    pub async fn setup(&self) -> Result<(), AppError> {
        self.adaptor.setup().await
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<T>, AppError> {
        match self.adaptor.get(&self.domain, key).await? {
            Some(v) => Ok(Some(serde_json::from_value(v)?)),
            None => Ok(None),
        }
    }

    pub async fn get_item_or_fail(&self, key: &str) -> Result<T, AppError> {
        self.get_item(key)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("{} / {}", self.domain, key)))
    }

    pub async fn get_all_items(&self) -> Result<Vec<T>, AppError> {
        Ok(self
            .get_all_as_key_value()
            .await?
            .into_iter()
            .map(|(_, v)| v)
            .collect())
    }

    pub async fn get_all_as_key_value(&self) -> Result<Vec<(String, T)>, AppError> {
        let rows = self.adaptor.list(&self.domain).await?;
        let mut out = Vec::with_capacity(rows.len());
        for (k, v) in rows {
            out.push((k, serde_json::from_value(v)?));
        }
        Ok(out)
    }

    pub async fn create_item(&self, key: &str, value: T) -> Result<(), AppError> {
        self.adaptor
            .insert(&self.domain, key, serde_json::to_value(value)?)
            .await
    }

    pub async fn upsert_item(&self, key: &str, value: T) -> Result<(), AppError> {
        self.adaptor
            .upsert(&self.domain, key, serde_json::to_value(value)?)
            .await
    }

    /// Same as [`Self::upsert_item`]; used for time-bound data.
    pub async fn persist_item(&self, key: &str, value: T) -> Result<(), AppError> {
        self.upsert_item(key, value).await
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.adaptor.remove(&self.domain, key).await
    }

    pub fn merge_key_with_secondary_key(&self, primary: &str, secondary: &str) -> String {
        format!("{}{}{}", primary, SECONDARY_KEY_DELIMITER, secondary)
    }
}

/// Hands out domain-scoped services over one shared adaptor.
#[derive(Clone)]
pub struct ConfigDomainServiceFactory {
    adaptor: Arc<dyn PersistenceAdaptor>,
}

impl ConfigDomainServiceFactory {
    pub fn new(adaptor: Arc<dyn PersistenceAdaptor>) -> Self {
        ConfigDomainServiceFactory { adaptor }
    }

    /// No I/O; each call returns an independent instance.
    pub fn create_config_domain_persistence_service<T>(
        &self,
        domain: &str,
    ) -> ConfigDomainPersistenceService<T> {
        ConfigDomainPersistenceService {
            adaptor: Arc::clone(&self.adaptor),
            domain: domain.to_string(),
            _marker: PhantomData,
        }
    }
}
