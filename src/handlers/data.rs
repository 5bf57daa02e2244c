//! Entity CRUD handlers over the configured data source.

use crate::data::PaginationFilters;
use crate::error::AppError;
use crate::query::{QueryFilterSchema, SortDirection};
use crate::response::{success_created, success_many, success_one};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::{Map, Value};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u64>,
    pub take: Option<u64>,
    pub sort_by: Option<String>,
    pub order_by: Option<SortDirection>,
    /// Comma-separated.
    pub columns: Option<String>,
    /// JSON filter tree.
    pub filters: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct FilterParams {
    pub filters: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyParams {
    pub primary_key: Option<String>,
    pub columns: Option<String>,
}

fn parse_filters(raw: Option<&str>) -> Result<QueryFilterSchema, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(QueryFilterSchema::default()),
        Some(s) => serde_json::from_str(s).map_err(|e| AppError::BadRequest(format!("invalid filters: {}", e))),
    }
}

fn parse_columns(raw: Option<&str>) -> Vec<String> {
    raw.map(|s| {
        s.split(',')
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from)
            .collect()
    })
    .unwrap_or_default()
}

/// Path ids that parse as integers are bound as numbers.
fn id_value(id: &str) -> Value {
    match id.parse::<i64>() {
        Ok(n) => Value::Number(n.into()),
        Err(_) => Value::String(id.to_string()),
    }
}

fn key_equality(params: &KeyParams, id: &str) -> Map<String, Value> {
    let mut equality = Map::new();
    equality.insert(primary_key(params).to_string(), id_value(id));
    equality
}

fn primary_key(params: &KeyParams) -> &str {
    params
        .primary_key
        .as_deref()
        .filter(|s| !s.is_empty())
        .unwrap_or("id")
}

fn body_to_map(value: Value) -> Result<Map<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(m),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<ListParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filters(params.filters.as_deref())?;
    let pagination = PaginationFilters {
        page: params.page,
        take: params.take,
        sort_by: params.sort_by.clone(),
        order_by: params.order_by,
    };
    let columns = parse_columns(params.columns.as_deref());
    let rows = state.data.list(&entity, &columns, &filter, &pagination).await?;
    Ok(success_many(rows))
}

pub async fn count(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<FilterParams>,
) -> Result<impl IntoResponse, AppError> {
    let filter = parse_filters(params.filters.as_deref())?;
    let count = state.data.count(&entity, &filter).await?;
    Ok(success_one(serde_json::json!({ "count": count })))
}

pub async fn read(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    Query(params): Query<KeyParams>,
) -> Result<impl IntoResponse, AppError> {
    let columns = parse_columns(params.columns.as_deref());
    let row = state
        .data
        .read(&entity, &columns, &key_equality(&params, &id))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("{} / {}", entity, id)))?;
    Ok(success_one(row))
}

pub async fn create(
    State(state): State<AppState>,
    Path(entity): Path<String>,
    Query(params): Query<KeyParams>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let pk = primary_key(&params);
    let id = state.data.create(&entity, &body, pk).await?;
    let mut created = Map::new();
    created.insert(pk.to_string(), id);
    Ok(success_created(Value::Object(created)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    Query(params): Query<KeyParams>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let body = body_to_map(body)?;
    let affected = state.data.update(&entity, &key_equality(&params, &id), &body).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("{} / {}", entity, id)));
    }
    Ok(success_one(serde_json::json!({ "updated": affected })))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((entity, id)): Path<(String, String)>,
    Query(params): Query<KeyParams>,
) -> Result<impl IntoResponse, AppError> {
    let affected = state.data.delete(&entity, &key_equality(&params, &id)).await?;
    if affected == 0 {
        return Err(AppError::NotFound(format!("{} / {}", entity, id)));
    }
    Ok(success_one(serde_json::json!({ "deleted": affected })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filters_parse_from_query_json() {
        let f = parse_filters(Some(r#"{"operator":"or","children":[{"id":"age","operator":"g","value":18}]}"#))
            .unwrap();
        assert_eq!(f.children.len(), 1);
        assert!(parse_filters(Some("  ")).unwrap().children.is_empty());
        assert!(matches!(parse_filters(Some("{")), Err(AppError::BadRequest(_))));
    }

    #[test]
    fn columns_and_ids() {
        assert_eq!(parse_columns(Some("id, name,,")), vec!["id".to_string(), "name".to_string()]);
        assert!(parse_columns(None).is_empty());
        assert_eq!(id_value("42"), Value::from(42));
        assert_eq!(id_value("abc"), Value::from("abc"));
        let params = KeyParams {
            primary_key: Some("uuid".into()),
            columns: None,
        };
        assert_eq!(key_equality(&params, "x").get("uuid"), Some(&Value::from("x")));
    }
}
