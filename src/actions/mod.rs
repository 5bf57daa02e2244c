//! Form-triggered actions: activating integrations, wiring instances to entities, and running them.

mod integration;
mod template;

pub use integration::{
    ActionConnection, ActionIntegration, ConfigField, ImplementationDescriptor, IntegrationListing,
    IntegrationRegistry,
};
pub use template::compile_template;

use crate::credentials::{AppConstantsService, CredentialGroup, CredentialsService};
use crate::error::AppError;
use crate::persistence::{ConfigDomainPersistenceService, SECONDARY_KEY_DELIMITER};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, HashMap};

/// Built-in activation that needs no stored configuration.
pub const HTTP_ACTIVATION_ID: &str = "http";
pub const HTTP_INTEGRATION_KEY: &str = "http";

/// Template context prefixes.
pub const CONSTANTS_PREFIX: &str = "CONSTANTS";
pub const CREDENTIALS_PREFIX: &str = "CREDENTIALS";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivatedAction {
    pub activation_id: String,
    pub integration_key: String,
    pub credentials_group_key: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionInstance {
    pub instance_id: String,
    pub activated_action_id: String,
    pub integration_key: String,
    pub entity: String,
    pub form_action: String,
    pub implementation_key: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

/// An instance before it is stored; the integration key is resolved from the activation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewActionInstance {
    pub activated_action_id: String,
    pub entity: String,
    pub form_action: String,
    pub implementation_key: String,
    #[serde(default)]
    pub configuration: BTreeMap<String, String>,
}

#[derive(Clone)]
pub struct ActionsService {
    activated: ConfigDomainPersistenceService<ActivatedAction>,
    instances: ConfigDomainPersistenceService<ActionInstance>,
    credentials: CredentialsService,
    constants: AppConstantsService,
    registry: IntegrationRegistry,
}

fn credentials_group_key(integration_key: &str) -> String {
    format!("ACTION__{}", integration_key)
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '-' })
        .collect::<String>()
        .to_uppercase()
}

fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

impl ActionsService {
    pub fn new(
        activated: ConfigDomainPersistenceService<ActivatedAction>,
        instances: ConfigDomainPersistenceService<ActionInstance>,
        credentials: CredentialsService,
        constants: AppConstantsService,
        registry: IntegrationRegistry,
    ) -> Self {
        ActionsService {
            activated,
            instances,
            credentials,
            constants,
            registry,
        }
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.activated.setup().await?;
        self.instances.setup().await
    }

    fn group_for(&self, action: &ActivatedAction) -> Result<CredentialGroup, AppError> {
        let integration = self.registry.get(&action.integration_key)?;
        let fields: Vec<&str> = integration.configuration_schema().iter().map(|f| f.key).collect();
        Ok(CredentialGroup::new(action.credentials_group_key.clone(), &fields))
    }

    fn validate_configuration(
        &self,
        integration_key: &str,
        configuration: &HashMap<String, String>,
    ) -> Result<(), AppError> {
        let missing: Vec<&str> = self
            .registry
            .get(integration_key)?
            .configuration_schema()
            .iter()
            .filter(|f| f.required)
            .filter(|f| configuration.get(f.key).map_or(true, |v| v.trim().is_empty()))
            .map(|f| f.key)
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(AppError::Validation(format!("missing configuration: {}", missing.join(", "))))
        }
    }

    pub fn list_action_integrations(&self) -> Vec<IntegrationListing> {
        self.registry.listings()
    }

    pub fn list_integration_implementations(
        &self,
        integration_key: &str,
    ) -> Result<Vec<ImplementationDescriptor>, AppError> {
        Ok(self.registry.get(integration_key)?.implementations().to_vec())
    }

    /// Stored activations plus the built-in HTTP one.
    pub async fn list_activated_actions(&self) -> Result<Vec<ActivatedAction>, AppError> {
        let mut out = self.activated.get_all_items().await?;
        out.sort_by(|a, b| a.activation_id.cmp(&b.activation_id));
        out.push(ActivatedAction {
            activation_id: HTTP_ACTIVATION_ID.to_string(),
            integration_key: HTTP_INTEGRATION_KEY.to_string(),
            credentials_group_key: "none-existent".to_string(),
        });
        Ok(out)
    }

    /// Returns the new activation id.
    pub async fn activate_action(
        &self,
        integration_key: &str,
        configuration: &HashMap<String, String>,
    ) -> Result<String, AppError> {
        self.validate_configuration(integration_key, configuration)?;
        let action = ActivatedAction {
            activation_id: new_id(),
            integration_key: integration_key.to_string(),
            credentials_group_key: credentials_group_key(integration_key),
        };
        self.activated.create_item(&action.activation_id, action.clone()).await?;
        self.credentials
            .upsert_group(&self.group_for(&action)?, configuration)
            .await?;
        tracing::info!(integration = %integration_key, activation_id = %action.activation_id, "action activated");
        Ok(action.activation_id)
    }

    pub async fn show_action_config(&self, activation_id: &str) -> Result<BTreeMap<String, String>, AppError> {
        if activation_id == HTTP_ACTIVATION_ID {
            return Ok(BTreeMap::new());
        }
        let action = self.activated.get_item_or_fail(activation_id).await?;
        self.credentials.use_group_value(&self.group_for(&action)?).await
    }

    pub async fn update_action_config(
        &self,
        activation_id: &str,
        configuration: &HashMap<String, String>,
    ) -> Result<(), AppError> {
        let action = self.activated.get_item_or_fail(activation_id).await?;
        self.validate_configuration(&action.integration_key, configuration)?;
        self.credentials
            .upsert_group(&self.group_for(&action)?, configuration)
            .await
    }

    /// Removes the credential group, the activation, then every instance bound to it.
    pub async fn deactivate_action(&self, activation_id: &str) -> Result<(), AppError> {
        let action = self.activated.get_item_or_fail(activation_id).await?;
        self.credentials.delete_group(&self.group_for(&action)?).await?;
        self.activated.remove_item(activation_id).await?;
        for instance in self.instances.get_all_items().await? {
            if instance.activated_action_id == activation_id {
                self.instances.remove_item(&instance.instance_id).await?;
            }
        }
        Ok(())
    }

    async fn resolve_integration_key(&self, activated_action_id: &str) -> Result<String, AppError> {
        self.list_activated_actions()
            .await?
            .into_iter()
            .find(|a| a.activation_id == activated_action_id)
            .map(|a| a.integration_key)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "integration key not found for activatedActionId '{}'",
                    activated_action_id
                ))
            })
    }

    fn into_instance(instance_id: String, integration_key: String, action: NewActionInstance) -> ActionInstance {
        ActionInstance {
            instance_id,
            activated_action_id: action.activated_action_id,
            integration_key,
            entity: action.entity,
            form_action: action.form_action,
            implementation_key: action.implementation_key,
            configuration: action.configuration,
        }
    }

    /// Returns the new instance id.
    pub async fn instantiate_action(&self, action: NewActionInstance) -> Result<String, AppError> {
        let integration_key = self.resolve_integration_key(&action.activated_action_id).await?;
        let instance_id = new_id();
        let instance = Self::into_instance(instance_id.clone(), integration_key, action);
        self.instances.create_item(&instance_id, instance).await?;
        Ok(instance_id)
    }

    pub async fn update_action_instance(&self, instance_id: &str, action: NewActionInstance) -> Result<(), AppError> {
        let integration_key = self.resolve_integration_key(&action.activated_action_id).await?;
        let instance = Self::into_instance(instance_id.to_string(), integration_key, action);
        self.instances.upsert_item(instance_id, instance).await
    }

    pub async fn delete_action_instance(&self, instance_id: &str) -> Result<(), AppError> {
        self.instances.remove_item(instance_id).await
    }

    pub async fn list_entity_action_instances(&self, entity: &str) -> Result<Vec<ActionInstance>, AppError> {
        let mut out: Vec<ActionInstance> = self
            .instances
            .get_all_items()
            .await?
            .into_iter()
            .filter(|i| i.entity == entity)
            .collect();
        out.sort_by(|a, b| a.instance_id.cmp(&b.instance_id));
        Ok(out)
    }

    pub async fn list_integration_actions(&self, integration_key: &str) -> Result<Vec<ActionInstance>, AppError> {
        Ok(self
            .instances
            .get_all_items()
            .await?
            .into_iter()
            .filter(|i| i.integration_key == integration_key)
            .collect())
    }

    /// Template context: `data`, `CONSTANTS`, `CREDENTIALS` (standalone keys only, decrypted here) and `auth`.
    async fn template_context(&self, data: &Value, auth: &Value) -> Result<Value, AppError> {
        let constants: Map<String, Value> = self
            .constants
            .list()
            .await?
            .into_iter()
            .map(|kv| (kv.key, Value::String(kv.value)))
            .collect();
        let mut credentials = Map::new();
        for kv in self.credentials.list().await? {
            if kv.key.contains(SECONDARY_KEY_DELIMITER) {
                continue;
            }
            let plain = self.credentials.process_data_after_fetch(&kv.value)?;
            credentials.insert(kv.key, Value::String(plain));
        }
        let mut ctx = Map::new();
        ctx.insert("data".into(), data.clone());
        ctx.insert(CONSTANTS_PREFIX.into(), Value::Object(constants));
        ctx.insert(CREDENTIALS_PREFIX.into(), Value::Object(credentials));
        ctx.insert("auth".into(), auth.clone());
        Ok(Value::Object(ctx))
    }

    /// Runs every instance bound to `(entity, form_action)` in order. A failure stops the run;
    /// actions already performed stay performed. Returns how many ran.
    pub async fn run_action(
        &self,
        entity: &str,
        form_action: &str,
        data: &Value,
        auth: &Value,
    ) -> Result<usize, AppError> {
        let to_run: Vec<ActionInstance> = self
            .list_entity_action_instances(entity)
            .await?
            .into_iter()
            .filter(|i| i.form_action == form_action)
            .collect();
        if to_run.is_empty() {
            return Ok(0);
        }
        let ctx = self.template_context(data, auth).await?;
        for instance in &to_run {
            let integration_key = if instance.activated_action_id == HTTP_ACTIVATION_ID {
                HTTP_INTEGRATION_KEY.to_string()
            } else {
                self.activated
                    .get_item_or_fail(&instance.activated_action_id)
                    .await?
                    .integration_key
            };
            let integration = self.registry.get(&integration_key)?;
            let config = self.show_action_config(&instance.activated_action_id).await?;
            let connection = integration.connect(&config).await?;
            let mut compiled = BTreeMap::new();
            for (key, value) in &instance.configuration {
                compiled.insert(key.clone(), compile_template(value, &ctx)?);
            }
            integration
                .perform(&instance.implementation_key, &connection, &compiled)
                .await?;
            tracing::info!(
                entity = %entity,
                form_action = %form_action,
                instance_id = %instance.instance_id,
                "action performed"
            );
        }
        Ok(to_run.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{EncryptedPersistence, ValueCipher};
    use crate::persistence::{domains, ConfigDomainServiceFactory, MemoryAdaptor, PersistenceAdaptor};
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::{Arc, Mutex};

    const SMTP_FIELDS: &[ConfigField] = &[ConfigField::required("host"), ConfigField::optional("port")];
    const SMTP_IMPLEMENTATIONS: &[ImplementationDescriptor] = &[ImplementationDescriptor {
        key: "send_mail",
        label: "Send Mail",
        configuration_schema: &[ConfigField::required("to"), ConfigField::required("body")],
    }];

    #[derive(Default)]
    struct RecordingSmtp {
        performed: Mutex<Vec<(String, String, BTreeMap<String, String>)>>,
    }

    #[async_trait]
    impl ActionIntegration for RecordingSmtp {
        fn title(&self) -> &str {
            "SMTP"
        }

        fn description(&self) -> &str {
            "Send mail"
        }

        fn configuration_schema(&self) -> &[ConfigField] {
            SMTP_FIELDS
        }

        fn implementations(&self) -> &[ImplementationDescriptor] {
            SMTP_IMPLEMENTATIONS
        }

        async fn connect(&self, config: &BTreeMap<String, String>) -> Result<ActionConnection, AppError> {
            Ok(Box::new(config.get("host").cloned().unwrap_or_default()))
        }

        async fn perform(
            &self,
            implementation: &str,
            connection: &ActionConnection,
            config: &BTreeMap<String, String>,
        ) -> Result<(), AppError> {
            let host = connection
                .downcast_ref::<String>()
                .cloned()
                .ok_or_else(|| AppError::Internal("bad connection".into()))?;
            self.performed
                .lock()
                .unwrap()
                .push((implementation.to_string(), host, config.clone()));
            Ok(())
        }
    }

    struct Fixture {
        adaptor: Arc<MemoryAdaptor>,
        smtp: Arc<RecordingSmtp>,
        credentials: CredentialsService,
        constants: AppConstantsService,
        actions: ActionsService,
    }

    fn fixture() -> Fixture {
        let adaptor = Arc::new(MemoryAdaptor::new());
        let factory = ConfigDomainServiceFactory::new(adaptor.clone());
        let credentials = CredentialsService::new(EncryptedPersistence::new(
            factory.create_config_domain_persistence_service(domains::CREDENTIALS),
            ValueCipher::new([7u8; 32]),
        ));
        let constants =
            AppConstantsService::new(factory.create_config_domain_persistence_service(domains::APP_CONSTANTS));
        let smtp = Arc::new(RecordingSmtp::default());
        let registry = IntegrationRegistry::new().register("smtp", smtp.clone());
        let actions = ActionsService::new(
            factory.create_config_domain_persistence_service(domains::ACTIVATED_ACTIONS),
            factory.create_config_domain_persistence_service(domains::ACTION_INSTANCES),
            credentials.clone(),
            constants.clone(),
            registry,
        );
        Fixture {
            adaptor,
            smtp,
            credentials,
            constants,
            actions,
        }
    }

    fn config(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    fn instance(activation_id: &str, form_action: &str) -> NewActionInstance {
        NewActionInstance {
            activated_action_id: activation_id.to_string(),
            entity: "users".into(),
            form_action: form_action.into(),
            implementation_key: "send_mail".into(),
            configuration: [
                ("to".to_string(), "{{ data.email }}".to_string()),
                (
                    "body".to_string(),
                    "Welcome to {{ CONSTANTS.SITE }}, {{ auth.name }} ({{ CREDENTIALS.API_TOKEN }})".to_string(),
                ),
            ]
            .into_iter()
            .collect(),
        }
    }

    #[test]
    fn group_key_is_uppercased_slug() {
        assert_eq!(credentials_group_key("smtp"), "ACTION__SMTP");
        assert_eq!(credentials_group_key("send in blue"), "ACTION__SEND-IN-BLUE");
    }

    #[tokio::test]
    async fn activation_validates_and_stores_group() {
        let f = fixture();
        let err = f.actions.activate_action("smtp", &config(&[("port", "25")])).await;
        assert!(matches!(err, Err(AppError::Validation(_))));
        assert!(matches!(
            f.actions.activate_action("fax", &config(&[])).await,
            Err(AppError::BadRequest(_))
        ));

        let id = f
            .actions
            .activate_action("smtp", &config(&[("host", "mail.local")]))
            .await
            .unwrap();
        let shown = f.actions.show_action_config(&id).await.unwrap();
        assert_eq!(shown.get("host").map(String::as_str), Some("mail.local"));
        assert_eq!(shown.get("port").map(String::as_str), Some(""));

        let listed = f.actions.list_activated_actions().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(listed[0].credentials_group_key, "ACTION__SMTP");
        assert_eq!(listed[1].activation_id, HTTP_ACTIVATION_ID);
        assert!(f.actions.show_action_config(HTTP_ACTIVATION_ID).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn instantiate_requires_known_activation() {
        let f = fixture();
        let res = f.actions.instantiate_action(instance("missing", "create")).await;
        assert!(matches!(res, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn deactivation_cascades() {
        let f = fixture();
        let id = f
            .actions
            .activate_action("smtp", &config(&[("host", "mail.local")]))
            .await
            .unwrap();
        f.actions.instantiate_action(instance(&id, "create")).await.unwrap();
        f.actions.instantiate_action(instance(&id, "update")).await.unwrap();
        assert_eq!(f.actions.list_integration_actions("smtp").await.unwrap().len(), 2);

        f.actions.deactivate_action(&id).await.unwrap();
        assert!(f.actions.list_entity_action_instances("users").await.unwrap().is_empty());
        assert!(f.adaptor.list(domains::CREDENTIALS).await.unwrap().is_empty());
        assert!(matches!(
            f.actions.show_action_config(&id).await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn run_action_compiles_templates() {
        let f = fixture();
        f.constants.upsert("SITE", "panel.dev").await.unwrap();
        f.credentials.upsert("API_TOKEN", "tok-1").await.unwrap();
        let id = f
            .actions
            .activate_action("smtp", &config(&[("host", "mail.local")]))
            .await
            .unwrap();
        f.actions.instantiate_action(instance(&id, "create")).await.unwrap();
        f.actions.instantiate_action(instance(&id, "delete")).await.unwrap();

        let ran = f
            .actions
            .run_action("users", "create", &json!({ "email": "ada@x.io" }), &json!({ "name": "Ada" }))
            .await
            .unwrap();
        assert_eq!(ran, 1);

        let performed = f.smtp.performed.lock().unwrap();
        assert_eq!(performed.len(), 1);
        let (implementation, host, compiled) = &performed[0];
        assert_eq!(implementation, "send_mail");
        assert_eq!(host, "mail.local");
        assert_eq!(compiled["to"], "ada@x.io");
        assert_eq!(compiled["body"], "Welcome to panel.dev, Ada (tok-1)");
    }

    #[tokio::test]
    async fn run_action_without_instances_is_noop() {
        let f = fixture();
        let ran = f
            .actions
            .run_action("users", "create", &json!({}), &json!({}))
            .await
            .unwrap();
        assert_eq!(ran, 0);
    }
}
