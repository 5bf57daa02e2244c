//! Shared application state: every service, wired over one persistence adaptor.

use crate::actions::{ActionsService, IntegrationRegistry};
use crate::credentials::{AppConstantsService, CredentialsService, EncryptedPersistence, ValueCipher};
use crate::data::{ConnectionFactory, RdbmsDataService};
use crate::error::AppError;
use crate::persistence::{
    domains, ConfigDomainServiceFactory, DatabaseAdaptor, JsonFileAdaptor, MemoryAdaptor, PersistenceAdaptor,
};
use crate::preferences::UserPreferencesService;
use crate::settings::{AdaptorKind, Settings};
use crate::temp_storage::TempStorageService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub persistence: Arc<dyn PersistenceAdaptor>,
    pub credentials: CredentialsService,
    pub constants: AppConstantsService,
    pub temp_storage: TempStorageService,
    pub preferences: UserPreferencesService,
    pub actions: ActionsService,
    pub data: Arc<RdbmsDataService>,
}

impl AppState {
    pub fn new(
        persistence: Arc<dyn PersistenceAdaptor>,
        cipher: ValueCipher,
        connections: Arc<dyn ConnectionFactory>,
        registry: IntegrationRegistry,
    ) -> Self {
        let factory = ConfigDomainServiceFactory::new(Arc::clone(&persistence));
        let credentials = CredentialsService::new(EncryptedPersistence::new(
            factory.create_config_domain_persistence_service(domains::CREDENTIALS),
            cipher,
        ));
        let constants =
            AppConstantsService::new(factory.create_config_domain_persistence_service(domains::APP_CONSTANTS));
        let actions = ActionsService::new(
            factory.create_config_domain_persistence_service(domains::ACTIVATED_ACTIONS),
            factory.create_config_domain_persistence_service(domains::ACTION_INSTANCES),
            credentials.clone(),
            constants.clone(),
            registry,
        );
        AppState {
            temp_storage: TempStorageService::new(
                factory.create_config_domain_persistence_service(domains::TEMP_STORAGE),
            ),
            preferences: UserPreferencesService::new(
                factory.create_config_domain_persistence_service(domains::USERS_PREFERENCES),
            ),
            data: Arc::new(RdbmsDataService::new(credentials.clone(), connections)),
            persistence,
            credentials,
            constants,
            actions,
        }
    }

    /// Opens the adaptor named by `settings` and wires every service over it.
    pub async fn from_settings(
        settings: &Settings,
        connections: Arc<dyn ConnectionFactory>,
        registry: IntegrationRegistry,
    ) -> Result<Self, AppError> {
        let persistence: Arc<dyn PersistenceAdaptor> = match settings.adaptor {
            AdaptorKind::Memory => Arc::new(MemoryAdaptor::new()),
            AdaptorKind::JsonFile => Arc::new(JsonFileAdaptor::new(settings.config_file_dir.clone())),
            AdaptorKind::Database => {
                let url = settings
                    .config_database_url
                    .as_deref()
                    .ok_or(crate::error::ConfigError::Missing("CONFIG_DATABASE_URL"))?;
                let pool = sqlx::postgres::PgPoolOptions::new()
                    .max_connections(5)
                    .connect(url)
                    .await?;
                Arc::new(DatabaseAdaptor::new(pool, settings.config_schema.clone()))
            }
        };
        let cipher = ValueCipher::from_base64(&settings.credentials_encryption_key)?;
        tracing::info!(adaptor = ?settings.adaptor, "config persistence selected");
        Ok(Self::new(persistence, cipher, connections, registry))
    }

    /// Prepares storage for every service. The data source itself stays lazy.
    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.credentials.bootstrap().await?;
        self.constants.bootstrap().await?;
        self.temp_storage.bootstrap().await?;
        self.preferences.bootstrap().await?;
        self.actions.bootstrap().await
    }
}
