//! Config domains in one PostgreSQL table: `<schema>._sys_config (domain, key, value JSONB)`.

use super::{conflict, PersistenceAdaptor};
use crate::error::AppError;
use async_trait::async_trait;
use serde_json::Value;
use sqlx::PgPool;

pub struct DatabaseAdaptor {
    pool: PgPool,
    schema: String,
}

impl DatabaseAdaptor {
    /// `schema` must be a plain identifier (checked by `Settings`).
    pub fn new(pool: PgPool, schema: impl Into<String>) -> Self {
        DatabaseAdaptor {
            pool,
            schema: schema.into(),
        }
    }

    fn table(&self) -> String {
        format!("{}._sys_config", self.schema)
    }
}

#[async_trait]
impl PersistenceAdaptor for DatabaseAdaptor {
    async fn setup(&self) -> Result<(), AppError> {
        sqlx::query(&format!("CREATE SCHEMA IF NOT EXISTS {}", self.schema))
            .execute(&self.pool)
            .await?;
        let ddl = format!(
            r#"
            CREATE TABLE IF NOT EXISTS {} (
                domain TEXT NOT NULL,
                key TEXT NOT NULL,
                value JSONB NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                PRIMARY KEY (domain, key)
            )
            "#,
            self.table()
        );
        sqlx::query(&ddl).execute(&self.pool).await?;
        tracing::info!(table = %self.table(), "database config adaptor ready");
        Ok(())
    }

    async fn get(&self, domain: &str, key: &str) -> Result<Option<Value>, AppError> {
        let sql = format!("SELECT value FROM {} WHERE domain = $1 AND key = $2", self.table());
        tracing::debug!(sql = %sql, domain, key, "query");
        let row: Option<(Value,)> = sqlx::query_as(&sql)
            .bind(domain)
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.0))
    }

    async fn list(&self, domain: &str) -> Result<Vec<(String, Value)>, AppError> {
        let sql = format!("SELECT key, value FROM {} WHERE domain = $1 ORDER BY key", self.table());
        tracing::debug!(sql = %sql, domain, "query");
        let rows: Vec<(String, Value)> = sqlx::query_as(&sql)
            .bind(domain)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows)
    }

    async fn insert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let sql = format!(
            "INSERT INTO {} (domain, key, value, updated_at) VALUES ($1, $2, $3, NOW()) ON CONFLICT (domain, key) DO NOTHING",
            self.table()
        );
        tracing::debug!(sql = %sql, domain, key, "query");
        let result = sqlx::query(&sql)
            .bind(domain)
            .bind(key)
            .bind(&value)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(conflict(domain, key));
        }
        Ok(())
    }

    async fn upsert(&self, domain: &str, key: &str, value: Value) -> Result<(), AppError> {
        let sql = format!(
            r#"
            INSERT INTO {} (domain, key, value, updated_at)
            VALUES ($1, $2, $3, NOW())
            ON CONFLICT (domain, key)
            DO UPDATE SET value = $3, updated_at = NOW()
            "#,
            self.table()
        );
        tracing::debug!(sql = %sql, domain, key, "query");
        sqlx::query(&sql)
            .bind(domain)
            .bind(key)
            .bind(&value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn remove(&self, domain: &str, key: &str) -> Result<(), AppError> {
        let sql = format!("DELETE FROM {} WHERE domain = $1 AND key = $2", self.table());
        tracing::debug!(sql = %sql, domain, key, "query");
        sqlx::query(&sql)
            .bind(domain)
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
