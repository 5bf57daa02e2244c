//! Supported engines and their raw-response shapes.

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Dialect {
    #[serde(rename = "postgres")]
    Postgres,
    #[serde(rename = "mysql")]
    MySql,
    #[serde(rename = "mssql")]
    MsSql,
    #[serde(rename = "sqlite")]
    Sqlite,
}

impl std::str::FromStr for Dialect {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Dialect::Postgres),
            "mysql" => Ok(Dialect::MySql),
            "mssql" | "sqlserver" => Ok(Dialect::MsSql),
            "sqlite" => Ok(Dialect::Sqlite),
            other => Err(AppError::BadRequest(format!(
                "unknown data source type: {} (expected postgres, mysql, mssql or sqlite)",
                other
            ))),
        }
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Dialect::Postgres => "postgres",
            Dialect::MySql => "mysql",
            Dialect::MsSql => "mssql",
            Dialect::Sqlite => "sqlite",
        })
    }
}

impl Dialect {
    pub fn default_port(self) -> Option<u16> {
        match self {
            Dialect::Postgres => Some(5432),
            Dialect::MySql => Some(3306),
            Dialect::MsSql => Some(1433),
            Dialect::Sqlite => None,
        }
    }

    pub fn adapter(self) -> &'static dyn DialectAdapter {
        match self {
            Dialect::Postgres => &RowsField,
            Dialect::MsSql => &FirstElement,
            Dialect::MySql | Dialect::Sqlite => &BareArray,
        }
    }
}

/// Pulls the row array out of a driver's raw-SQL response.
pub trait DialectAdapter: Send + Sync {
    fn extract_rows(&self, raw: Value) -> Result<Vec<Value>, AppError>;
}

/// `{ "rows": [...] }`
struct RowsField;
/// `[[...rows], metadata]`
struct FirstElement;
/// `[...rows]`
struct BareArray;

fn unexpected(shape: &str, raw: &Value) -> AppError {
    AppError::Internal(format!("raw query response is not {}: {}", shape, raw))
}

impl DialectAdapter for RowsField {
    fn extract_rows(&self, raw: Value) -> Result<Vec<Value>, AppError> {
        match raw {
            Value::Object(mut obj) => match obj.remove("rows") {
                Some(Value::Array(rows)) => Ok(rows),
                _ => Err(unexpected("an object with rows", &Value::Object(obj))),
            },
            other => Err(unexpected("an object with rows", &other)),
        }
    }
}

impl DialectAdapter for FirstElement {
    fn extract_rows(&self, raw: Value) -> Result<Vec<Value>, AppError> {
        match raw {
            Value::Array(mut parts) if !parts.is_empty() => match parts.swap_remove(0) {
                Value::Array(rows) => Ok(rows),
                other => Err(unexpected("[rows, metadata]", &other)),
            },
            other => Err(unexpected("[rows, metadata]", &other)),
        }
    }
}

impl DialectAdapter for BareArray {
    fn extract_rows(&self, raw: Value) -> Result<Vec<Value>, AppError> {
        match raw {
            Value::Array(rows) => Ok(rows),
            other => Err(unexpected("an array", &other)),
        }
    }
}
