#![allow(dead_code)]

use async_trait::async_trait;
use panel_sdk::actions::IntegrationRegistry;
use panel_sdk::credentials::ValueCipher;
use panel_sdk::data::{database_credential_group, ConnectionFactory, DataSourceCredentials, DbConnection, ExecResult};
use panel_sdk::persistence::MemoryAdaptor;
use panel_sdk::query::QueryBuf;
use panel_sdk::{AppError, AppState};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Returns canned rows and records every statement it receives.
#[derive(Default)]
pub struct RecordingConnection {
    pub rows: Mutex<Vec<Value>>,
    pub raw: Mutex<Value>,
    pub exec: Mutex<ExecResult>,
    pub log: Mutex<Vec<QueryBuf>>,
}

impl RecordingConnection {
    pub fn statements(&self) -> Vec<QueryBuf> {
        self.log.lock().unwrap().clone()
    }

    pub fn last(&self) -> QueryBuf {
        self.log.lock().unwrap().last().cloned().expect("no statement recorded")
    }

    pub fn set_rows(&self, rows: Vec<Value>) {
        *self.rows.lock().unwrap() = rows;
    }
}

#[async_trait]
impl DbConnection for RecordingConnection {
    async fn fetch_all(&self, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
        self.log.lock().unwrap().push(q.clone());
        Ok(self.rows.lock().unwrap().clone())
    }

    async fn execute(&self, q: &QueryBuf) -> Result<ExecResult, AppError> {
        self.log.lock().unwrap().push(q.clone());
        Ok(*self.exec.lock().unwrap())
    }

    async fn raw(&self, sql: &str) -> Result<Value, AppError> {
        self.log.lock().unwrap().push(QueryBuf {
            sql: sql.to_string(),
            params: Vec::new(),
        });
        Ok(self.raw.lock().unwrap().clone())
    }
}

/// Hands out one shared [`RecordingConnection`] and counts how often it was asked.
#[derive(Default)]
pub struct CountingFactory {
    pub connection: Arc<RecordingConnection>,
    pub connects: AtomicUsize,
}

impl CountingFactory {
    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ConnectionFactory for CountingFactory {
    async fn connect(&self, _credentials: &DataSourceCredentials) -> Result<Arc<dyn DbConnection>, AppError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        let connection: Arc<dyn DbConnection> = self.connection.clone();
        Ok(connection)
    }
}

pub fn state_with(factory: Arc<CountingFactory>) -> AppState {
    AppState::new(
        Arc::new(MemoryAdaptor::new()),
        ValueCipher::new([9u8; 32]),
        factory,
        IntegrationRegistry::new(),
    )
}

pub async fn configure_database(state: &AppState, dialect: &str) {
    let values: HashMap<String, String> = [
        ("dataSourceType", dialect),
        ("host", "db.local"),
        ("database", "shop"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    state
        .credentials
        .upsert_group(&database_credential_group(), &values)
        .await
        .unwrap();
}
