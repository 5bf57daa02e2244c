use super::connection::{ConnectionFactory, DbConnection};
use super::credentials::{database_credential_group, DataSourceCredentials};
use super::pagination::PaginationFilters;
use crate::credentials::CredentialsService;
use crate::error::AppError;
use crate::query::{compile, QueryFilterSchema, SqlRenderer, WhereClause};
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::OnceCell;

struct DbInstance {
    credentials: DataSourceCredentials,
    connection: Arc<dyn DbConnection>,
    renderer: SqlRenderer,
}

/// Entity CRUD over the configured data source. The driver is opened on first use and
/// shared for the lifetime of the service.
pub struct RdbmsDataService {
    credentials: CredentialsService,
    factory: Arc<dyn ConnectionFactory>,
    instance: OnceCell<DbInstance>,
}

fn coerce_count(v: Option<&Value>) -> u64 {
    match v {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}

impl RdbmsDataService {
    pub fn new(credentials: CredentialsService, factory: Arc<dyn ConnectionFactory>) -> Self {
        RdbmsDataService {
            credentials,
            factory,
            instance: OnceCell::new(),
        }
    }

    async fn instance(&self) -> Result<&DbInstance, AppError> {
        self.instance
            .get_or_try_init(|| async {
                let values = self.credentials.use_group_value(&database_credential_group()).await?;
                let credentials = DataSourceCredentials::from_group_values(&values)?;
                let connection = self.factory.connect(&credentials).await?;
                tracing::info!(dialect = %credentials.data_source_type, "data source connected");
                Ok::<_, AppError>(DbInstance {
                    renderer: SqlRenderer::new(credentials.data_source_type),
                    credentials,
                    connection,
                })
            })
            .await
    }

    pub async fn bootstrap(&self) -> Result<(), AppError> {
        self.instance().await.map(|_| ())
    }

    pub async fn db_credentials(&self) -> Result<DataSourceCredentials, AppError> {
        Ok(self.instance().await?.credentials.clone())
    }

    pub async fn count(&self, entity: &str, filter: &QueryFilterSchema) -> Result<u64, AppError> {
        let db = self.instance().await?;
        let clause = compile(WhereClause::new(), filter)?;
        let rows = db.connection.fetch_all(&db.renderer.count(entity, &clause)).await?;
        Ok(coerce_count(rows.first().and_then(|row| row.get("count"))))
    }

    pub async fn list(
        &self,
        entity: &str,
        select: &[String],
        filter: &QueryFilterSchema,
        pagination: &PaginationFilters,
    ) -> Result<Vec<Value>, AppError> {
        let db = self.instance().await?;
        let clause = compile(WhereClause::new(), filter)?;
        let order = pagination.order();
        let q = db
            .renderer
            .select(entity, select, &clause, order.as_ref(), pagination.page());
        db.connection.fetch_all(&q).await
    }

    pub async fn read(
        &self,
        entity: &str,
        select: &[String],
        equality: &Map<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let db = self.instance().await?;
        let rows = db
            .connection
            .fetch_all(&db.renderer.select_first(entity, select, equality))
            .await?;
        Ok(rows.into_iter().next())
    }

    /// Returns the new row's primary key; `Null` when the driver cannot report one.
    pub async fn create(
        &self,
        entity: &str,
        data: &Map<String, Value>,
        primary_field: &str,
    ) -> Result<Value, AppError> {
        let db = self.instance().await?;
        let q = db.renderer.insert(entity, data, primary_field);
        if db.renderer.supports_returning() {
            let rows = db.connection.fetch_all(&q).await?;
            return Ok(rows
                .first()
                .and_then(|row| row.get(primary_field))
                .cloned()
                .unwrap_or(Value::Null));
        }
        let result = db.connection.execute(&q).await?;
        if let Some(given) = data.get(primary_field) {
            return Ok(given.clone());
        }
        Ok(result.last_insert_id.map(Value::from).unwrap_or(Value::Null))
    }

    pub async fn update(
        &self,
        entity: &str,
        equality: &Map<String, Value>,
        data: &Map<String, Value>,
    ) -> Result<u64, AppError> {
        let db = self.instance().await?;
        let q = db.renderer.update(entity, equality, data)?;
        Ok(db.connection.execute(&q).await?.rows_affected)
    }

    pub async fn delete(&self, entity: &str, equality: &Map<String, Value>) -> Result<u64, AppError> {
        let db = self.instance().await?;
        Ok(db
            .connection
            .execute(&db.renderer.delete(entity, equality))
            .await?
            .rows_affected)
    }

    /// Trusted SQL only: nothing is escaped.
    pub async fn run_query(&self, sql: &str) -> Result<Vec<Value>, AppError> {
        let db = self.instance().await?;
        let raw = db.connection.raw(sql).await?;
        db.renderer.dialect().adapter().extract_rows(raw)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn count_coercion() {
        assert_eq!(coerce_count(Some(&json!(12))), 12);
        assert_eq!(coerce_count(Some(&json!("7"))), 7);
        assert_eq!(coerce_count(Some(&json!("many"))), 0);
        assert_eq!(coerce_count(Some(&Value::Null)), 0);
        assert_eq!(coerce_count(None), 0);
    }
}
