mod common;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use common::{configure_database, state_with, CountingFactory};
use panel_sdk::app_router;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

async fn send(app: axum::Router, req: Request<Body>) -> (StatusCode, Value) {
    let res = app.oneshot(req).await.unwrap();
    let status = res.status();
    let bytes = to_bytes(res.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_and_version() {
    let app = app_router(state_with(Arc::new(CountingFactory::default())));
    let (status, body) = send(app.clone(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));

    let (_, body) = send(app, get("/version")).await;
    assert_eq!(body["name"], "panel-sdk");
}

#[tokio::test]
async fn ready_reports_unconfigured_data_source() {
    let app = app_router(state_with(Arc::new(CountingFactory::default())));
    let (status, body) = send(app, get("/ready")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["database"], "unavailable");
}

#[tokio::test]
async fn preferences_round_trip() {
    let app = app_router(state_with(Arc::new(CountingFactory::default())));

    let req = Request::builder()
        .uri("/account/preferences/theme")
        .header("X-Username", "ada")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(app.clone(), req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], "light");

    let req = Request::builder()
        .method("PUT")
        .uri("/account/preferences/theme")
        .header("X-Username", "ada")
        .header("content-type", "application/json")
        .body(Body::from("\"dark\""))
        .unwrap();
    send(app.clone(), req).await;

    let req = Request::builder()
        .uri("/account/preferences/theme")
        .header("X-Username", "ada")
        .body(Body::empty())
        .unwrap();
    let (_, body) = send(app.clone(), req).await;
    assert_eq!(body["data"], "dark");

    let (status, body) = send(app, get("/account/preferences/theme")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn data_list_count_and_read() {
    let factory = Arc::new(CountingFactory::default());
    let state = state_with(factory.clone());
    configure_database(&state, "postgres").await;
    let app = app_router(state);

    factory.connection.set_rows(vec![json!({ "id": 1 }), json!({ "id": 2 })]);
    let filters = r#"{"operator":"and","children":[{"id":"name","operator":"c","value":"an"}]}"#;
    let query = url::form_urlencoded::Serializer::new(String::new())
        .extend_pairs([
            ("page", "2"),
            ("take", "2"),
            ("sortBy", "id"),
            ("orderBy", "desc"),
            ("columns", "id"),
            ("filters", filters),
        ])
        .finish();
    let uri = format!("/data/users?{}", query);
    let (status, body) = send(app.clone(), get(&uri)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["meta"]["count"], 2);
    assert_eq!(
        factory.connection.last().sql,
        "SELECT \"id\" FROM \"users\" WHERE \"name\" ILIKE $1 ORDER BY \"id\" DESC LIMIT 2 OFFSET 2"
    );

    factory.connection.set_rows(vec![json!({ "count": 5 })]);
    let (_, body) = send(app.clone(), get("/data/users/count")).await;
    assert_eq!(body["data"]["count"], 5);

    factory.connection.set_rows(vec![]);
    let (status, body) = send(app.clone(), get("/data/users/9")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");

    let (status, _) = send(app, get("/data/users?filters=%7Bnope")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn data_create_returns_key() {
    let factory = Arc::new(CountingFactory::default());
    let state = state_with(factory.clone());
    configure_database(&state, "postgres").await;
    let app = app_router(state);

    factory.connection.set_rows(vec![json!({ "id": 7 })]);
    let req = Request::builder()
        .method("POST")
        .uri("/data/users")
        .header("content-type", "application/json")
        .body(Body::from(r#"{"name":"Ada"}"#))
        .unwrap();
    let (status, body) = send(app, req).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"], json!({ "id": 7 }));
}
