//! Environment-driven settings. Binaries load `.env` (dotenvy) before calling [`Settings::from_env`].

use crate::error::ConfigError;
use std::path::PathBuf;

/// Which backing store holds config domains.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AdaptorKind {
    Memory,
    JsonFile,
    Database,
}

impl std::str::FromStr for AdaptorKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "memory" => Ok(AdaptorKind::Memory),
            "json-file" | "json_file" | "file" => Ok(AdaptorKind::JsonFile),
            "database" | "db" => Ok(AdaptorKind::Database),
            other => Err(ConfigError::Invalid {
                name: "CONFIG_ADAPTOR",
                reason: format!("{} (expected memory, json-file or database)", other),
            }),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Settings {
    pub adaptor: AdaptorKind,
    /// Directory for the JSON file adaptor.
    pub config_file_dir: PathBuf,
    /// Required when `adaptor` is `Database`.
    pub config_database_url: Option<String>,
    /// Schema holding the `_sys_config` table. Must be a valid PostgreSQL identifier.
    pub config_schema: String,
    /// Base64 32-byte key for credential values.
    pub credentials_encryption_key: String,
    pub bind_addr: String,
}

fn var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        let adaptor = match var("CONFIG_ADAPTOR") {
            Some(s) => s.parse()?,
            None => AdaptorKind::JsonFile,
        };
        let config_database_url = var("CONFIG_DATABASE_URL");
        if adaptor == AdaptorKind::Database && config_database_url.is_none() {
            return Err(ConfigError::Missing("CONFIG_DATABASE_URL"));
        }
        let config_schema = var("CONFIG_SCHEMA").unwrap_or_else(|| "panel".into());
        if !config_schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(ConfigError::Invalid {
                name: "CONFIG_SCHEMA",
                reason: format!("'{}' is not a plain identifier", config_schema),
            });
        }
        let credentials_encryption_key =
            var("CREDENTIALS_ENCRYPTION_KEY").ok_or(ConfigError::Missing("CREDENTIALS_ENCRYPTION_KEY"))?;

        Ok(Settings {
            adaptor,
            config_file_dir: var("CONFIG_FILE_DIR").map(PathBuf::from).unwrap_or_else(|| ".config-data".into()),
            config_database_url,
            config_schema,
            credentials_encryption_key,
            bind_addr: var("BIND_ADDR").unwrap_or_else(|| "127.0.0.1:3000".into()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_adaptor_kinds() {
        assert_eq!("memory".parse::<AdaptorKind>().unwrap(), AdaptorKind::Memory);
        assert_eq!("JSON-FILE".parse::<AdaptorKind>().unwrap(), AdaptorKind::JsonFile);
        assert_eq!("database".parse::<AdaptorKind>().unwrap(), AdaptorKind::Database);
        assert!("redis".parse::<AdaptorKind>().is_err());
    }
}
