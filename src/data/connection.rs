//! Driver seam: statements go through [`DbConnection`]; [`ConnectionFactory`] opens one from credentials.

use super::credentials::DataSourceCredentials;
use crate::error::AppError;
use crate::query::{Dialect, QueryBuf};
use async_trait::async_trait;
use serde_json::Value;
use sqlx::any::{AnyArguments, AnyPoolOptions, AnyRow};
use sqlx::AnyPool;
use sqlx::query::Query;
use sqlx::Any;
use std::sync::Arc;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecResult {
    pub rows_affected: u64,
    pub last_insert_id: Option<i64>,
}

#[async_trait]
pub trait DbConnection: Send + Sync {
    /// Rows as JSON objects keyed by column name.
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError>;

    async fn execute(&self, q: &QueryBuf) -> Result<ExecResult, AppError>;

    /// Driver-native response for unparameterized SQL; see [`crate::query::DialectAdapter`].
    async fn raw(&self, sql: &str) -> Result<Value, AppError>;
}

#[async_trait]
pub trait ConnectionFactory: Send + Sync {
    async fn connect(&self, credentials: &DataSourceCredentials) -> Result<Arc<dyn DbConnection>, AppError>;
}

/// sqlx `Any` driver: postgres, mysql, sqlite.
#[derive(Clone, Debug)]
pub struct SqlxConnectionFactory {
    pub max_connections: u32,
}

impl Default for SqlxConnectionFactory {
    fn default() -> Self {
        SqlxConnectionFactory { max_connections: 5 }
    }
}

#[async_trait]
impl ConnectionFactory for SqlxConnectionFactory {
    async fn connect(&self, credentials: &DataSourceCredentials) -> Result<Arc<dyn DbConnection>, AppError> {
        if credentials.data_source_type == Dialect::MsSql {
            return Err(AppError::BadRequest("mssql data sources have no sqlx driver".into()));
        }
        sqlx::any::install_default_drivers();
        let url = credentials.connection_url()?;
        let pool = AnyPoolOptions::new()
            .max_connections(self.max_connections)
            .connect(&url)
            .await?;
        Ok(Arc::new(SqlxConnection {
            pool,
            dialect: credentials.data_source_type,
        }))
    }
}

pub struct SqlxConnection {
    pool: AnyPool,
    dialect: Dialect,
}

/// A value that can be bound through the `Any` driver. Converts from serde_json::Value.
#[derive(Clone, Debug, PartialEq)]
enum BindValue {
    Null,
    Bool(bool),
    I64(i64),
    F64(f64),
    String(String),
}

impl BindValue {
    fn from_json(v: &Value) -> Self {
        match v {
            Value::Null => BindValue::Null,
            Value::Bool(b) => BindValue::Bool(*b),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    BindValue::I64(i)
                } else if let Some(f) = n.as_f64() {
                    BindValue::F64(f)
                } else {
                    BindValue::String(n.to_string())
                }
            }
            Value::String(s) => BindValue::String(s.clone()),
            Value::Array(_) | Value::Object(_) => BindValue::String(v.to_string()),
        }
    }
}

fn bind_params<'q>(mut query: Query<'q, Any, AnyArguments<'q>>, params: &[Value]) -> Query<'q, Any, AnyArguments<'q>> {
    for p in params {
        query = match BindValue::from_json(p) {
            BindValue::Null => query.bind(Option::<String>::None),
            BindValue::Bool(b) => query.bind(b),
            BindValue::I64(n) => query.bind(n),
            BindValue::F64(n) => query.bind(n),
            BindValue::String(s) => query.bind(s),
        };
    }
    query
}

#[async_trait]
impl DbConnection for SqlxConnection {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "query");
        let rows = bind_params(sqlx::query(&q.sql), &q.params)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.iter().map(row_to_json).collect())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<ExecResult, AppError> {
        tracing::debug!(sql = %q.sql, params = ?q.params, "execute");
        let result = bind_params(sqlx::query(&q.sql), &q.params)
            .execute(&self.pool)
            .await?;
        Ok(ExecResult {
            rows_affected: result.rows_affected(),
            last_insert_id: result.last_insert_id(),
        })
    }

    /// Mirrors the native client shapes: `{rows, rowCount}` for postgres, a bare array otherwise.
    async fn raw(&self, sql: &str) -> Result<Value, AppError> {
        tracing::debug!(sql = %sql, "raw query");
        let rows: Vec<Value> = sqlx::query(sql)
            .fetch_all(&self.pool)
            .await?
            .iter()
            .map(row_to_json)
            .collect();
        Ok(match self.dialect {
            Dialect::Postgres => serde_json::json!({ "rowCount": rows.len(), "rows": rows }),
            Dialect::MsSql => serde_json::json!([rows, {}]),
            Dialect::MySql | Dialect::Sqlite => Value::Array(rows),
        })
    }
}

fn row_to_json(row: &AnyRow) -> Value {
    use sqlx::{Column, Row};
    let mut map = serde_json::Map::new();
    for col in row.columns() {
        map.insert(col.name().to_string(), cell_to_value(row, col.ordinal()));
    }
    Value::Object(map)
}

fn cell_to_value(row: &AnyRow, idx: usize) -> Value {
    use sqlx::Row;
    if let Ok(Some(n)) = row.try_get::<Option<i64>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i32>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<i16>, _>(idx) {
        return Value::Number(n.into());
    }
    if let Ok(Some(n)) = row.try_get::<Option<f64>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(n)) = row.try_get::<Option<f32>, _>(idx) {
        if let Some(n) = serde_json::Number::from_f64(n as f64) {
            return Value::Number(n);
        }
    }
    if let Ok(Some(b)) = row.try_get::<Option<bool>, _>(idx) {
        return Value::Bool(b);
    }
    if let Ok(Some(s)) = row.try_get::<Option<String>, _>(idx) {
        return Value::String(s);
    }
    Value::Null
}
