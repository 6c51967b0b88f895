//! End-to-end tests for the gateway over a temporary store.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum_test::TestServer;
use murmur_core::{DocumentStore, StorageConfig};
use murmur_gateway::{
    create_router, AppState, BroadcastPublisher, GatewayConfig, NotificationEventKind,
};
use serde_json::{json, Value};
use tower::util::ServiceExt;

struct TestContext {
    server: TestServer,
    publisher: Arc<BroadcastPublisher>,
}

impl TestContext {
    fn new() -> Self {
        Self::with_config(GatewayConfig {
            temporary: true,
            ..GatewayConfig::default()
        })
    }

    fn with_config(config: GatewayConfig) -> Self {
        let store = DocumentStore::open(StorageConfig::temporary()).unwrap();
        let publisher = Arc::new(BroadcastPublisher::new(16));
        let state = AppState::new(store, config, publisher.clone()).unwrap();
        let server = TestServer::new(create_router(state)).unwrap();
        Self { server, publisher }
    }

    async fn create_user(&self, name: &str) -> Value {
        let response = self
            .server
            .post("/users")
            .json(&json!({
                "name": name,
                "email": format!("{}@example.com", name.to_lowercase()),
                "username": name.to_lowercase(),
            }))
            .await;
        response.assert_status(StatusCode::CREATED);
        response.json::<Value>()["data"].clone()
    }
}

fn id_of(doc: &Value) -> String {
    doc["_id"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn test_health() {
    let ctx = TestContext::new();

    let body: Value = ctx.server.get("/health").await.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["collections"], json!(["notifications", "users"]));
}

#[tokio::test]
async fn test_list_users_envelope_and_defaults() {
    let ctx = TestContext::new();
    for i in 0..12 {
        ctx.create_user(&format!("User{i:02}")).await;
    }

    let response = ctx.server.get("/users").await;
    response.assert_status_ok();
    let body: Value = response.json();

    assert_eq!(body["success"], true);
    assert_eq!(body["data"].as_array().unwrap().len(), 10);
    assert_eq!(
        body["meta"],
        json!({"page": 1, "limit": 10, "total": 12, "totalPages": 2})
    );
}

#[tokio::test]
async fn test_list_users_search_sort_and_window() {
    let ctx = TestContext::new();
    for name in ["Alice", "Bob", "Carol", "Alina"] {
        ctx.create_user(name).await;
    }

    let body: Value = ctx
        .server
        .get("/users")
        .add_query_params(&[
            ("searchTerm", "ALI"),
            ("sort", "-name"),
            ("fields", "name"),
        ])
        .await
        .json();

    let names: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|d| d["name"].as_str().unwrap())
        .collect();
    assert_eq!(names, vec!["Alina", "Alice"]);
    assert!(body["data"][0].get("email").is_none());
    assert_eq!(body["meta"]["total"], 2);
}

#[tokio::test]
async fn test_users_and_admins_are_scoped() {
    let ctx = TestContext::new();
    ctx.create_user("Dana").await;
    ctx.server
        .post("/admins")
        .json(&json!({"name": "Root", "email": "root@example.com"}))
        .await
        .assert_status(StatusCode::CREATED);

    let users: Value = ctx.server.get("/users").await.json();
    let admins: Value = ctx.server.get("/admins").await.json();

    assert_eq!(users["meta"]["total"], 1);
    assert_eq!(admins["meta"]["total"], 1);
    assert_eq!(admins["data"][0]["role"], "admin");
}

#[tokio::test]
async fn test_invalid_query_returns_error_envelope() {
    let ctx = TestContext::new();
    ctx.create_user("Eve").await;

    for params in [
        vec![("createdAt[bogus]", "5")],
        vec![("page", "abc")],
        vec![("limit", "all")],
        vec![("sort", "name,,email")],
    ] {
        let response = ctx.server.get("/users").add_query_params(&params).await;
        response.assert_status(StatusCode::BAD_REQUEST);
        let body: Value = response.json();
        assert_eq!(body["error"], true);
        assert_eq!(body["code"], "INVALID_QUERY");
    }
}

#[tokio::test]
async fn test_limit_all_when_unbounded_allowed() {
    let ctx = TestContext::with_config(GatewayConfig {
        allow_unbounded: true,
        ..GatewayConfig::default()
    });
    for i in 0..15 {
        ctx.create_user(&format!("U{i:02}")).await;
    }

    let body: Value = ctx
        .server
        .get("/users")
        .add_query_params(&[("limit", "all"), ("page", "4")])
        .await
        .json();

    assert_eq!(body["data"].as_array().unwrap().len(), 15);
    assert_eq!(body["meta"]["total"], 15);
    assert_eq!(body["meta"]["totalPages"], 1);
}

#[tokio::test]
async fn test_limit_is_clamped_to_max() {
    let ctx = TestContext::with_config(GatewayConfig {
        max_limit: 3,
        ..GatewayConfig::default()
    });
    for i in 0..5 {
        ctx.create_user(&format!("C{i}")).await;
    }

    let body: Value = ctx
        .server
        .get("/users")
        .add_query_params(&[("limit", "50")])
        .await
        .json();

    assert_eq!(body["meta"]["limit"], 3);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
}

#[tokio::test]
async fn test_create_account_validation() {
    let ctx = TestContext::new();
    ctx.create_user("Finn").await;

    let duplicate = ctx
        .server
        .post("/users")
        .json(&json!({"name": "Other", "email": "FINN@example.com"}))
        .await;
    duplicate.assert_status(StatusCode::CONFLICT);
    assert_eq!(duplicate.json::<Value>()["code"], "CONFLICT");

    ctx.server
        .post("/users")
        .json(&json!({"name": "Mallory", "email": "m@example.com", "role": "admin"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    ctx.server
        .post("/users")
        .json(&json!({"email": "nameless@example.com"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_and_soft_delete() {
    let ctx = TestContext::new();
    let user = ctx.create_user("Gus").await;
    let id = id_of(&user);

    let updated: Value = ctx
        .server
        .patch(&format!("/users/{id}"))
        .json(&json!({"bio": "hello"}))
        .await
        .json();
    assert_eq!(updated["data"]["bio"], "hello");
    assert_eq!(updated["data"]["createdAt"], user["createdAt"]);

    ctx.server
        .patch(&format!("/users/{id}"))
        .json(&json!({"role": "admin"}))
        .await
        .assert_status(StatusCode::BAD_REQUEST);

    ctx.server
        .delete(&format!("/users/{id}"))
        .await
        .assert_status_ok();
    ctx.server
        .get(&format!("/users/{id}"))
        .await
        .assert_status(StatusCode::NOT_FOUND);

    let list: Value = ctx.server.get("/users").await.json();
    assert_eq!(list["meta"]["total"], 0);

    // The email is free again once the account is gone
    ctx.create_user("Gus").await;
}

#[tokio::test]
async fn test_toggle_saved_post() {
    let ctx = TestContext::new();
    let id = id_of(&ctx.create_user("Hana").await);
    let path = format!("/users/{id}/saved-posts/post-1");

    let first: Value = ctx.server.post(&path).await.json();
    assert_eq!(first["data"], json!({"saved": true, "savedPosts": ["post-1"]}));

    let second: Value = ctx.server.post(&path).await.json();
    assert_eq!(second["data"], json!({"saved": false, "savedPosts": []}));

    let list: Value = ctx
        .server
        .get(&format!("/users/{id}/saved-posts"))
        .await
        .json();
    assert_eq!(list["data"], json!([]));
}

#[tokio::test]
async fn test_notifications_create_publish_and_read() {
    let ctx = TestContext::new();
    let mut events = ctx.publisher.subscribe();

    let response = ctx
        .server
        .post("/notifications")
        .json(&json!({"receiver": "u1", "title": "New follower", "message": "Ivy followed you"}))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created = response.json::<Value>()["data"].clone();
    assert_eq!(created["read"], false);

    let event = events.recv().await.unwrap();
    assert_eq!(event.kind, NotificationEventKind::Created);
    assert_eq!(event.receiver, "u1");

    let id = id_of(&created);
    let read: Value = ctx
        .server
        .patch(&format!("/notifications/{id}/read"))
        .await
        .json();
    assert_eq!(read["data"]["read"], true);
    assert_eq!(events.recv().await.unwrap().kind, NotificationEventKind::Read);

    let list: Value = ctx
        .server
        .get("/notifications")
        .add_query_params(&[("read", "true"), ("searchTerm", "follower")])
        .await
        .json();
    assert_eq!(list["meta"]["total"], 1);
}

#[tokio::test]
async fn test_notification_requires_fields() {
    let ctx = TestContext::new();

    let response = ctx
        .server
        .post("/notifications")
        .json(&json!({"receiver": "u1", "title": "Missing message"}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(response.json::<Value>()["code"], "BAD_REQUEST");

    ctx.server
        .patch("/notifications/not-an-id/read")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_created_at_range() {
    let ctx = TestContext::new();
    ctx.create_user("Jo").await;
    ctx.create_user("Kai").await;

    let future: Value = ctx
        .server
        .get("/users")
        .add_query_params(&[("createdAtMin", "2999-01-01T00:00:00.000Z")])
        .await
        .json();
    assert_eq!(future["meta"]["total"], 0);

    let past: Value = ctx
        .server
        .get("/users")
        .add_query_params(&[
            ("createdAtMin", "2000-01-01T00:00:00.000Z"),
            ("createdAtMax", "2999-01-01T00:00:00.000Z"),
        ])
        .await
        .json();
    assert_eq!(past["meta"]["total"], 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_signups_with_same_email_store_one() {
    let store = DocumentStore::open(StorageConfig::temporary()).unwrap();
    let publisher = Arc::new(BroadcastPublisher::new(16));
    let state = AppState::new(store, GatewayConfig::default(), publisher).unwrap();
    for n in 0..300 {
        let filler = json!({"name": format!("filler{n}"), "role": "user"});
        state.users.insert(filler.as_object().cloned().unwrap()).unwrap();
    }
    let app = create_router(state.clone());

    for round in 0..3 {
        let body = json!({"name": "Dup", "email": format!("dup{round}@example.com")});
        let mut tasks = tokio::task::JoinSet::new();
        for i in 0..16 {
            let app = app.clone();
            let path = if i % 2 == 0 { "/users" } else { "/admins" };
            let request = Request::builder()
                .method("POST")
                .uri(path)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap();
            tasks.spawn(async move { app.oneshot(request).await.unwrap().status() });
        }

        let mut statuses = Vec::new();
        while let Some(status) = tasks.join_next().await {
            statuses.push(status.unwrap());
        }
        let created = statuses.iter().filter(|s| **s == StatusCode::CREATED).count();
        assert_eq!(created, 1, "round {round}");
        assert!(statuses
            .iter()
            .all(|s| *s == StatusCode::CREATED || *s == StatusCode::CONFLICT));
    }

    assert_eq!(state.users.len(), 303);
}
