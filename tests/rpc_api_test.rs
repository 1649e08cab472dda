use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;
use users_backend::{
    database::InMemoryUserGateway, middleware::cors::permissive_cors, routes, AppState,
};

fn setup_app() -> (Router, InMemoryUserGateway) {
    let store = InMemoryUserGateway::new();
    let state = AppState::new(Arc::new(store.clone())).expect("registry");
    (routes::build_router(state, permissive_cors()), store)
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, JsonValue) {
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        JsonValue::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn query(app: &Router, procedure: &str) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/rpc/{}", procedure))
        .body(Body::empty())
        .unwrap();
    send(app, req).await
}

async fn mutate(app: &Router, procedure: &str, input: JsonValue) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/rpc/{}", procedure))
        .header("content-type", "application/json")
        .body(Body::from(input.to_string()))
        .unwrap();
    send(app, req).await
}

async fn list(app: &Router) -> Vec<JsonValue> {
    let (status, body) = query(app, "user.list").await;
    assert_eq!(status, StatusCode::OK);
    body["result"]["data"].as_array().cloned().unwrap()
}

#[tokio::test]
async fn create_list_delete_scenario() {
    let (app, store) = setup_app();

    let (status, body) = mutate(
        &app,
        "user.create",
        json!({ "name": "Ada", "email": "ada@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ada = &body["result"]["data"];
    assert_eq!(ada["id"], 1);
    assert_eq!(ada["name"], "Ada");
    assert_eq!(ada["email"], "ada@x.com");
    assert!(ada["createdAt"].is_string());

    let (status, body) = mutate(
        &app,
        "user.create",
        json!({ "name": "Ada2", "email": "ada@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONSTRAINT_VIOLATION");
    assert_eq!(list(&app).await.len(), 1);

    let (status, body) = mutate(
        &app,
        "user.create",
        json!({ "name": "", "email": "b@x.com" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert!(body["error"]["fields"]["name"].is_array());
    assert_eq!(store.row_count().unwrap(), 1);

    let (status, body) = mutate(&app, "user.delete", json!({ "id": 1 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"], json!({ "success": true }));
    assert!(list(&app).await.is_empty());

    let (status, body) = mutate(&app, "user.delete", json!({ "id": 999 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"], json!({ "success": true }));
}

#[tokio::test]
async fn list_returns_users_in_creation_order() {
    let (app, _) = setup_app();
    for i in 0..4 {
        let (status, _) = mutate(
            &app,
            "user.create",
            json!({ "name": format!("User {}", i), "email": format!("u{}@x.com", i) }),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    let users = list(&app).await;
    let ids: Vec<i64> = users.iter().map(|u| u["id"].as_i64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4]);
    let created: Vec<&str> = users
        .iter()
        .map(|u| u["createdAt"].as_str().unwrap())
        .collect();
    let parsed: Vec<chrono::DateTime<chrono::Utc>> = created
        .iter()
        .map(|s| s.parse().unwrap())
        .collect();
    assert!(parsed.windows(2).all(|pair| pair[0] <= pair[1]));
}

#[tokio::test]
async fn malformed_email_is_rejected_without_side_effects() {
    let (app, store) = setup_app();
    for email in ["not-an-email", "ada@localhost", "@x.com"] {
        let (status, body) = mutate(
            &app,
            "user.create",
            json!({ "name": "Ada", "email": email }),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{}", email);
        assert!(body["error"]["fields"]["email"].is_array());
    }
    assert_eq!(store.row_count().unwrap(), 0);
}

#[tokio::test]
async fn deleting_twice_is_a_no_op() {
    let (app, _) = setup_app();
    mutate(&app, "user.create", json!({ "name": "A", "email": "a@x.com" })).await;
    mutate(&app, "user.create", json!({ "name": "B", "email": "b@x.com" })).await;

    for _ in 0..2 {
        let (status, body) = mutate(&app, "user.delete", json!({ "id": 1 })).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["result"]["data"]["success"], true);
    }

    let users = list(&app).await;
    assert_eq!(users.len(), 1);
    assert_eq!(users[0]["id"], 2);
}

#[tokio::test]
async fn delete_accepts_ids_beyond_32_bits() {
    let (app, store) = setup_app();
    mutate(&app, "user.create", json!({ "name": "A", "email": "a@x.com" })).await;

    let (status, body) = mutate(&app, "user.delete", json!({ "id": 9999999999_i64 })).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"], json!({ "success": true }));
    assert_eq!(store.row_count().unwrap(), 1);
}

#[tokio::test]
async fn verbs_follow_procedure_kind() {
    let (app, _) = setup_app();

    let (status, body) = query(&app, "user.create").await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "METHOD_NOT_SUPPORTED");

    let (status, body) = mutate(&app, "user.list", JsonValue::Null).await;
    assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(body["error"]["code"], "METHOD_NOT_SUPPORTED");
}

#[tokio::test]
async fn unknown_procedure_and_bad_input() {
    let (app, _) = setup_app();

    let (status, body) = query(&app, "user.find").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PROCEDURE_NOT_FOUND");

    let (status, body) = mutate(&app, "user.delete", json!({ "id": "one" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = mutate(&app, "user.create", json!({ "name": "Ada" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn query_input_is_read_from_the_query_string() {
    let (app, _) = setup_app();
    let req = Request::builder()
        .method("GET")
        .uri("/api/rpc/user.list?input=%7B%7D")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["result"]["data"], json!([]));
}

#[tokio::test]
async fn unreachable_store_is_connection_error() {
    let (app, store) = setup_app();
    store.set_unavailable(true);

    let (status, body) = query(&app, "user.list").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "CONNECTION_ERROR");

    let (status, body) = mutate(&app, "user.delete", json!({ "id": 1 })).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"]["code"], "CONNECTION_ERROR");

    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&app, req).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    store.set_unavailable(false);
    assert!(list(&app).await.is_empty());
}

#[tokio::test]
async fn manifest_and_openapi_are_served() {
    let (app, _) = setup_app();

    let req = Request::builder().uri("/api/rpc").body(Body::empty()).unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!([
            { "name": "user.create", "kind": "mutation" },
            { "name": "user.delete", "kind": "mutation" },
            { "name": "user.list", "kind": "query" },
        ])
    );

    let req = Request::builder()
        .uri("/api-docs/openapi.json")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, req).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/rpc/{procedure}"].is_object());
}
