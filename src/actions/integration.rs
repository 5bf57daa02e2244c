//! Pluggable action connectors and the registry that names them.

use crate::error::AppError;
use async_trait::async_trait;
use serde::Serialize;
use std::any::Any;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

/// Opaque client handed from `connect` to `perform`.
pub type ActionConnection = Box<dyn Any + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ConfigField {
    pub key: &'static str,
    pub required: bool,
}

impl ConfigField {
    pub const fn required(key: &'static str) -> Self {
        ConfigField { key, required: true }
    }

    pub const fn optional(key: &'static str) -> Self {
        ConfigField { key, required: false }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ImplementationDescriptor {
    pub key: &'static str,
    pub label: &'static str,
    pub configuration_schema: &'static [ConfigField],
}

#[async_trait]
pub trait ActionIntegration: Send + Sync {
    fn title(&self) -> &str;

    fn description(&self) -> &str;

    /// Fields stored in the integration's credential group.
    fn configuration_schema(&self) -> &[ConfigField];

    fn implementations(&self) -> &[ImplementationDescriptor];

    async fn connect(&self, config: &BTreeMap<String, String>) -> Result<ActionConnection, AppError>;

    async fn perform(
        &self,
        implementation: &str,
        connection: &ActionConnection,
        config: &BTreeMap<String, String>,
    ) -> Result<(), AppError>;
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationListing {
    pub key: String,
    pub title: String,
    pub description: String,
    pub configuration_schema: Vec<ConfigField>,
}

#[derive(Clone, Default)]
pub struct IntegrationRegistry {
    integrations: HashMap<String, Arc<dyn ActionIntegration>>,
}

impl IntegrationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, key: impl Into<String>, integration: Arc<dyn ActionIntegration>) -> Self {
        self.integrations.insert(key.into(), integration);
        self
    }

    pub fn get(&self, key: &str) -> Result<&Arc<dyn ActionIntegration>, AppError> {
        self.integrations
            .get(key)
            .ok_or_else(|| AppError::BadRequest(format!("unknown integration: {}", key)))
    }

    /// Sorted by key.
    pub fn listings(&self) -> Vec<IntegrationListing> {
        let mut out: Vec<IntegrationListing> = self
            .integrations
            .iter()
            .map(|(key, i)| IntegrationListing {
                key: key.clone(),
                title: i.title().to_string(),
                description: i.description().to_string(),
                configuration_schema: i.configuration_schema().to_vec(),
            })
            .collect();
        out.sort_by(|a, b| a.key.cmp(&b.key));
        out
    }
}
