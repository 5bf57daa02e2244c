//! Data-source credentials, stored as the `DATABASE` credential group.

use crate::credentials::CredentialGroup;
use crate::error::AppError;
use crate::query::Dialect;
use std::collections::{BTreeMap, HashMap};
use url::Url;

pub const DATABASE_CREDENTIAL_GROUP_KEY: &str = "DATABASE";

pub const DATABASE_CREDENTIAL_FIELDS: &[&str] = &[
    "dataSourceType",
    "connectionString",
    "host",
    "port",
    "database",
    "user",
    "password",
    "filename",
    "ssl",
];

pub fn database_credential_group() -> CredentialGroup {
    CredentialGroup::new(DATABASE_CREDENTIAL_GROUP_KEY, DATABASE_CREDENTIAL_FIELDS)
}

#[derive(Clone, PartialEq, Eq)]
pub struct DataSourceCredentials {
    pub data_source_type: Dialect,
    pub connection_string: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Sqlite only.
    pub filename: Option<String>,
    pub ssl: bool,
}

impl std::fmt::Debug for DataSourceCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataSourceCredentials")
            .field("data_source_type", &self.data_source_type)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("filename", &self.filename)
            .field("ssl", &self.ssl)
            .finish_non_exhaustive()
    }
}

fn non_empty(values: &BTreeMap<String, String>, field: &str) -> Option<String> {
    values
        .get(field)
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn invalid_field(field: &str) -> AppError {
    AppError::BadRequest(format!("invalid database {}", field))
}

impl DataSourceCredentials {
    /// Blank fields are treated as absent. Fails with `BadRequest` when no data source type is stored.
    pub fn from_group_values(values: &BTreeMap<String, String>) -> Result<Self, AppError> {
        let data_source_type = non_empty(values, "dataSourceType")
            .ok_or_else(|| AppError::BadRequest("database credentials are not configured".into()))?
            .parse::<Dialect>()?;
        let port = match non_empty(values, "port") {
            Some(p) => Some(
                p.parse::<u16>()
                    .map_err(|_| AppError::BadRequest(format!("invalid database port: {}", p)))?,
            ),
            None => None,
        };
        let ssl = non_empty(values, "ssl")
            .map(|s| matches!(s.to_lowercase().as_str(), "true" | "1" | "yes"))
            .unwrap_or(false);
        Ok(DataSourceCredentials {
            data_source_type,
            connection_string: non_empty(values, "connectionString"),
            host: non_empty(values, "host"),
            port,
            database: non_empty(values, "database"),
            user: non_empty(values, "user"),
            password: non_empty(values, "password"),
            filename: non_empty(values, "filename"),
            ssl,
        })
    }

    pub fn to_group_values(&self) -> HashMap<String, String> {
        let fields: [(&str, Option<String>); 9] = [
            ("dataSourceType", Some(self.data_source_type.to_string())),
            ("connectionString", self.connection_string.clone()),
            ("host", self.host.clone()),
            ("port", self.port.map(|p| p.to_string())),
            ("database", self.database.clone()),
            ("user", self.user.clone()),
            ("password", self.password.clone()),
            ("filename", self.filename.clone()),
            ("ssl", Some(self.ssl.to_string())),
        ];
        fields
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k.to_string(), v)))
            .collect()
    }

    /// `connectionString` wins when set; otherwise built from the discrete fields.
    pub fn connection_url(&self) -> Result<String, AppError> {
        if let Some(url) = &self.connection_string {
            return Ok(url.clone());
        }
        let scheme = match self.data_source_type {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::MsSql => "mssql",
            Dialect::Sqlite => {
                let filename = self
                    .filename
                    .as_deref()
                    .ok_or_else(|| AppError::BadRequest("sqlite credentials require a filename".into()))?;
                return Ok(format!("sqlite://{}?mode=rwc", filename));
            }
        };
        let host = self
            .host
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("database credentials require a host".into()))?;
        let mut url = Url::parse(&format!("{}://localhost", scheme))
            .map_err(|e| AppError::Internal(format!("connection url: {}", e)))?;
        url.set_host(Some(host)).map_err(|_| invalid_field("host"))?;
        url.set_port(self.port.or(self.data_source_type.default_port()))
            .map_err(|_| invalid_field("port"))?;
        if let Some(user) = &self.user {
            url.set_username(user).map_err(|_| invalid_field("user"))?;
            url.set_password(self.password.as_deref())
                .map_err(|_| invalid_field("password"))?;
        }
        if let Some(database) = &self.database {
            url.set_path(&format!("/{}", database));
        }
        if self.ssl {
            match self.data_source_type {
                Dialect::MySql => url.query_pairs_mut().append_pair("ssl-mode", "REQUIRED"),
                _ => url.query_pairs_mut().append_pair("sslmode", "require"),
            };
        }
        Ok(url.into())
    }
}
