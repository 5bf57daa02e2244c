//! One JSON object file per domain: `<dir>/<domain>.json`.

use super::{conflict, PersistenceAdaptor};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

pub struct JsonFileAdaptor {
    dir: PathBuf,
    /// Readers share; read-modify-write of a domain file is exclusive within this process.
    lock: RwLock<()>,
}

impl JsonFileAdaptor {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        JsonFileAdaptor {
            dir: dir.into(),
            lock: RwLock::new(()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_for(&self, domain: &str) -> PathBuf {
        self.dir.join(format!("{}.json", domain))
    }

    async fn read_domain(&self, domain: &str) -> Result<Map<String, Value>, AppError> {
        let path = self.file_for(domain);
        match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => Ok(Map::new()),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(m) => Ok(m),
                _ => Err(AppError::Internal(format!(
                    "{} does not hold a JSON object",
                    path.display()
                ))),
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Map::new()),
            Err(e) => Err(e.into()),
        }
    }

    async fn write_domain(&self, domain: &str, items: &Map<String, Value>) -> Result<(), AppError> {
        let bytes = serde_json::to_vec_pretty(items)?;
        let target = self.file_for(domain);
        // Staged beside the target: rename replaces it atomically.
        let staging = self.dir.join(format!(".{}.json.{}.tmp", domain, uuid::Uuid::new_v4().simple()));
        if let Err(e) = tokio::fs::write(&staging, bytes).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        if let Err(e) = tokio::fs::rename(&staging, &target).await {
            let _ = tokio::fs::remove_file(&staging).await;
            return Err(e.into());
        }
        Ok(())
    }
}

#[async_trait]
impl PersistenceAdaptor for JsonFileAdaptor {
    async fn setup(&self) -> Result<(), AppError> {
        tokio::fs::create_dir_all(&self.dir).await?;
        tracing::info!(dir = %self.dir.display(), "json file config adaptor ready");
        Ok(())
    }

    async fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AppError> {
        let _guard = self.lock.read().await;
        Ok(self.read_domain(domain).await?.remove(key))
    }

    async fn list(&self, domain: &str) -> Result<Vec<(String, Value)>, AppError> {
        let _guard = self.lock.read().await;
        Ok(self.read_domain(domain).await?.into_iter().collect())
    }

    async fn insert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let _guard = self.lock.write().await;
        let mut items = self.read_domain(domain).await?;
        if items.contains_key(key) {
            return Err(conflict(domain, key));
        }
        items.insert(key.to_string(), value);
        self.write_domain(domain, &items).await
    }

    async fn upsert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let _guard = self.lock.write().await;
        let mut items = self.read_domain(domain).await?;
        items.insert(key.to_string(), value);
        self.write_domain(domain, &items).await
    }

    async fn remove(&self, domain: &str, key: &str) -> Result<(), AppError> {
        let _guard = self.lock.write().await;
        let mut items = self.read_domain(domain).await?;
        if items.remove(key).is_some() {
            self.write_domain(domain, &items).await?;
        }
        Ok(())
    }
}
