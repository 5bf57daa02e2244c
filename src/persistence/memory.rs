//! In-process adaptor. Default for tests and single-node demos.

use super::{conflict, PersistenceAdaptor};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryAdaptor {
    domains: RwLock<HashMap<String, HashMap<String, Value>>>,
}

impl MemoryAdaptor {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PersistenceAdaptor for MemoryAdaptor {
    async fn setup(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AppError> {
        let guard = self.domains.read().await;
        Ok(guard.get(domain).and_then(|d| d.get(key)).cloned())
    }

    async fn list(&self, domain: &str) -> Result<Vec<(String, Value)>, AppError> {
        let guard = self.domains.read().await;
        Ok(guard
            .get(domain)
            .map(|d| d.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
            .unwrap_or_default())
    }

    async fn insert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let mut guard = self.domains.write().await;
        let items = guard.entry(domain.to_string()).or_default();
        if items.contains_key(key) {
            return Err(conflict(domain, key));
        }
        items.insert(key.to_string(), value);
        Ok(())
    }

    async fn upsert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let mut guard = self.domains.write().await;
        guard
            .entry(domain.to_string())
            .or_default()
            .insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, domain: &str, key: &str) -> Result<(), AppError> {
        let mut guard = self.domains.write().await;
        if let Some(items) = guard.get_mut(domain) {
            items.remove(key);
        }
        Ok(())
    }
}
