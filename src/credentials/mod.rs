//! Credentials: encrypted key/value storage with grouped field sets, plus plaintext app constants.

mod cipher;
mod constants;

pub use cipher::ValueCipher;
pub use constants::AppConstantsService;

use crate::error::AppError;
use crate::persistence::ConfigDomainPersistenceService;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// A named set of fields read and written together.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialGroup {
    pub key: String,
    pub fields: Vec<String>,
}

impl CredentialGroup {
    pub fn new(key: impl Into<String>, fields: &[&str]) -> Self {
        CredentialGroup {
            key: key.into(),
            fields: fields.iter().map(|f| f.to_string()).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

/// Encrypting decorator over a string-valued domain service.
#[derive(Clone)]
pub struct EncryptedPersistence {
    inner: ConfigDomainPersistenceService<String>,
    cipher: ValueCipher,
}

impl EncryptedPersistence {
    pub fn new(inner: ConfigDomainPersistenceService<String>, cipher: ValueCipher) -> Self {
        EncryptedPersistence { inner, cipher }
    }

    pub async fn setup(&self) -> Result<(), AppError> {
        self.inner.setup().await
    }

    pub async fn get_item(&self, key: &str) -> Result<Option<String>, AppError> {
        match self.inner.get_item(key).await? {
            Some(stored) => Ok(Some(self.cipher.decrypt(&stored)?)),
            None => Ok(None),
        }
    }

    pub async fn upsert_item(&self, key: &str, plaintext: &str) -> Result<(), AppError> {
        let stored = self.cipher.encrypt(plaintext)?;
        self.inner.upsert_item(key, stored).await
    }

    pub async fn remove_item(&self, key: &str) -> Result<(), AppError> {
        self.inner.remove_item(key).await
    }

    /// Stored (still encrypted) entries.
    pub async fn list_raw(&self) -> Result<Vec<(String, String)>, AppError> {
        self.inner.get_all_as_key_value().await
    }

    pub fn decrypt(&self, stored: &str) -> Result<String, AppError> {
        self.cipher.decrypt(stored)
    }

    pub fn merge_key_with_secondary_key(&self, primary: &str, secondary: &str) -> String {
        self.inner.merge_key_with_secondary_key(primary, secondary)
    }
}

#[derive(Clone)]
pub struct CredentialsService {
    store: EncryptedPersistence,
}

impl CredentialsService {
    pub fn new(store: EncryptedPersistence) -> Self {
        CredentialsService { store }
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.store.setup().await
    }

    fn field_key(&self, group: &CredentialGroup, field: &str) -> String {
        self.store.merge_key_with_secondary_key(&group.key, field)
    }

    /// Replaces the whole group: fields missing from `values` are written as empty strings.
    pub async fn upsert_group(
        &self,
        group: &CredentialGroup,
        values: &HashMap<String, String>,
    ) -> Result<(), AppError> {
        for field in &group.fields {
            let value = values.get(field).map(String::as_str).unwrap_or("");
            self.store.upsert_item(&self.field_key(group, field), value).await?;
        }
        tracing::debug!(group = %group.key, fields = group.fields.len(), "credential group upserted");
        Ok(())
    }

    /// Missing fields come back as empty strings.
    pub async fn use_group_value(&self, group: &CredentialGroup) -> Result<BTreeMap<String, String>, AppError> {
        let mut out = BTreeMap::new();
        for field in &group.fields {
            let value = self
                .store
                .get_item(&self.field_key(group, field))
                .await?
                .unwrap_or_default();
            out.insert(field.clone(), value);
        }
        Ok(out)
    }

    pub async fn delete_group(&self, group: &CredentialGroup) -> Result<(), AppError> {
        for field in &group.fields {
            self.store.remove_item(&self.field_key(group, field)).await?;
        }
        Ok(())
    }

    pub async fn upsert(&self, key: &str, value: &str) -> Result<(), AppError> {
        self.store.upsert_item(key, value).await
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, AppError> {
        self.store.get_item(key).await
    }

    pub async fn delete(&self, key: &str) -> Result<(), AppError> {
        self.store.remove_item(key).await
    }

    /// Values are still encrypted; pass them through [`Self::process_data_after_fetch`] at point of use.
    pub async fn list(&self) -> Result<Vec<KeyValue>, AppError> {
        let mut rows: Vec<KeyValue> = self
            .store
            .list_raw()
            .await?
            .into_iter()
            .map(|(key, value)| KeyValue { key, value })
            .collect();
        rows.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(rows)
    }

    pub fn process_data_after_fetch(&self, value: &str) -> Result<String, AppError> {
        self.store.decrypt(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{domains, ConfigDomainServiceFactory, MemoryAdaptor, PersistenceAdaptor};
    use std::sync::Arc;

    fn service() -> (CredentialsService, Arc<MemoryAdaptor>) {
        let adaptor = Arc::new(MemoryAdaptor::new());
        let factory = ConfigDomainServiceFactory::new(adaptor.clone());
        let store = EncryptedPersistence::new(
            factory.create_config_domain_persistence_service(domains::CREDENTIALS),
            ValueCipher::new([3u8; 32]),
        );
        (CredentialsService::new(store), adaptor)
    }

    fn values(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[tokio::test]
    async fn group_upsert_replaces_whole_group() {
        let (svc, _) = service();
        let group = CredentialGroup::new("MAILER", &["a", "b"]);
        svc.upsert_group(&group, &values(&[("a", "1"), ("b", "2")])).await.unwrap();
        svc.upsert_group(&group, &values(&[("a", "x")])).await.unwrap();

        let got = svc.use_group_value(&group).await.unwrap();
        assert_eq!(got.get("a").map(String::as_str), Some("x"));
        assert_eq!(got.get("b").map(String::as_str), Some(""));
    }

    #[tokio::test]
    async fn ciphertext_at_rest() {
        let (svc, adaptor) = service();
        let group = CredentialGroup::new("DATABASE", &["password"]);
        svc.upsert_group(&group, &values(&[("password", "hunter2")])).await.unwrap();

        let raw = adaptor
            .get(domains::CREDENTIALS, "DATABASE__password")
            .await
            .unwrap()
            .unwrap();
        let raw = raw.as_str().unwrap();
        assert!(ValueCipher::is_encrypted(raw));
        assert_eq!(svc.process_data_after_fetch(raw).unwrap(), "hunter2");
    }

    #[tokio::test]
    async fn missing_fields_read_as_empty_and_delete_removes_all() {
        let (svc, adaptor) = service();
        let group = CredentialGroup::new("SLACK", &["token", "channel"]);
        assert_eq!(
            svc.use_group_value(&group).await.unwrap().get("token").map(String::as_str),
            Some("")
        );

        svc.upsert_group(&group, &values(&[("token", "t")])).await.unwrap();
        let partial = CredentialGroup::new("SLACK", &["token", "channel", "never-written"]);
        svc.delete_group(&partial).await.unwrap();
        assert!(adaptor.list(domains::CREDENTIALS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_keeps_values_encrypted() {
        let (svc, _) = service();
        svc.upsert("STRIPE_KEY", "sk_live").await.unwrap();
        let rows = svc.list().await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "STRIPE_KEY");
        assert_ne!(rows[0].value, "sk_live");
        assert_eq!(svc.get("STRIPE_KEY").await.unwrap().as_deref(), Some("sk_live"));
    }
}
