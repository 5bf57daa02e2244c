use crate::error::AppError;
use crate::persistence::ConfigDomainPersistenceService;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserPreferenceKey {
    Theme,
}

impl UserPreferenceKey {
    pub fn as_str(self) -> &'static str {
        match self {
            UserPreferenceKey::Theme => "theme",
        }
    }

    pub fn default_value(self) -> Value {
        match self {
            UserPreferenceKey::Theme => Value::String("light".into()),
        }
    }
}

impl std::str::FromStr for UserPreferenceKey {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "theme" => Ok(UserPreferenceKey::Theme),
            other => Err(AppError::BadRequest(format!("unknown preference: {}", other))),
        }
    }
}

/// Per-user settings keyed `<username>__<preference>`.
#[derive(Clone)]
pub struct UserPreferencesService {
    store: ConfigDomainPersistenceService<Value>,
}

impl UserPreferencesService {
    pub fn new(store: ConfigDomainPersistenceService<Value>) -> Self {
        UserPreferencesService { store }
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.store.setup().await
    }

    fn key(&self, username: &str, key: UserPreferenceKey) -> String {
        self.store.merge_key_with_secondary_key(username, key.as_str())
    }

    pub async fn show(&self, username: &str, key: UserPreferenceKey) -> Result<Value, AppError> {
        Ok(self
            .store
            .get_item(&self.key(username, key))
            .await?
            .unwrap_or_else(|| key.default_value()))
    }

    pub async fn upsert(&self, username: &str, key: UserPreferenceKey, value: Value) -> Result<(), AppError> {
        self.store.upsert_item(&self.key(username, key), value).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistence::{domains, ConfigDomainServiceFactory, MemoryAdaptor, PersistenceAdaptor};
    use serde_json::json;
    use std::sync::Arc;

    #[tokio::test]
    async fn defaults_then_stored_value() {
        let adaptor = Arc::new(MemoryAdaptor::new());
        let factory = ConfigDomainServiceFactory::new(adaptor.clone());
        let svc = UserPreferencesService::new(
            factory.create_config_domain_persistence_service(domains::USERS_PREFERENCES),
        );
        assert_eq!(svc.show("ada", UserPreferenceKey::Theme).await.unwrap(), json!("light"));
        svc.upsert("ada", UserPreferenceKey::Theme, json!("dark")).await.unwrap();
        assert_eq!(svc.show("ada", UserPreferenceKey::Theme).await.unwrap(), json!("dark"));
        assert_eq!(svc.show("bob", UserPreferenceKey::Theme).await.unwrap(), json!("light"));
        assert_eq!(
            adaptor.get(domains::USERS_PREFERENCES, "ada__theme").await.unwrap(),
            Some(json!("dark"))
        );
    }

    #[test]
    fn parses_known_keys_only() {
        assert_eq!("theme".parse::<UserPreferenceKey>().unwrap(), UserPreferenceKey::Theme);
        assert!("font".parse::<UserPreferenceKey>().is_err());
    }
}
