//! Integration tests for userd
//!
//! These exercise the full HTTP -> registry -> SQLite path and the
//! bootstrap-from-store sequence across a simulated restart.

use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use userd::registry::UserRegistry;
use userd::server;
use userstore::{User, UserStore};

/// Bind an ephemeral port, serve the router, return the base URL.
async fn spawn_server(registry: UserRegistry) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let app = server::router(registry);
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    format!("http://{addr}")
}

/// Mirroring and bootstrap are asynchronous; poll instead of sleeping once.
async fn wait_for(pred: impl AsyncFn() -> bool) {
    for _ in 0..200 {
        if pred().await {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached");
}

// =============================================================================
// HTTP surface
// =============================================================================

#[tokio::test]
async fn test_http_crud_round_trip() {
    let store = Arc::new(UserStore::in_memory().unwrap());
    let registry = UserRegistry::spawn(store);
    let base = spawn_server(registry).await;
    let client = reqwest::Client::new();

    // Create
    let resp = client
        .post(format!("{base}/users"))
        .json(&serde_json::json!({"name": "A", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    let user_id = body["userId"].as_str().unwrap().to_string();
    assert!(!user_id.is_empty());

    // Get
    let resp = client.get(format!("{base}/users/{user_id}")).send().await.unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["name"], "A");
    assert_eq!(body["user"]["lastName"], "B");
    assert_eq!(body["user"]["id"], user_id.as_str());

    // Update
    let resp = client
        .put(format!("{base}/users"))
        .json(&serde_json::json!({"id": user_id, "name": "C", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{base}/users/{user_id}")).send().await.unwrap();
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_eq!(body["user"]["name"], "C");

    // Remove
    let resp = client.delete(format!("{base}/users/{user_id}")).send().await.unwrap();
    assert_eq!(resp.status(), 200);

    let resp = client.get(format!("{base}/users/{user_id}")).send().await.unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_http_validation_and_not_found_mapping() {
    let store = Arc::new(UserStore::in_memory().unwrap());
    let registry = UserRegistry::spawn(store);
    let base = spawn_server(registry.clone()).await;
    let client = reqwest::Client::new();

    // Empty required field -> 400 with an error body
    let resp = client
        .post(format!("{base}/users"))
        .json(&serde_json::json!({"name": "", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("name"));

    // Missing field entirely -> still a validation 400, not a decode error
    let resp = client
        .post(format!("{base}/users"))
        .json(&serde_json::json!({"lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 400);

    // Nothing was created
    assert_eq!(registry.count().await.unwrap(), 0);

    // Unknown ids
    let resp = client.get(format!("{base}/users/nonexistent-id")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client.delete(format!("{base}/users/nonexistent-id")).send().await.unwrap();
    assert_eq!(resp.status(), 404);

    let resp = client
        .put(format!("{base}/users"))
        .json(&serde_json::json!({"id": "nonexistent-id", "name": "A", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 404);
}

#[tokio::test]
async fn test_http_create_ignores_supplied_id() {
    let store = Arc::new(UserStore::in_memory().unwrap());
    let registry = UserRegistry::spawn(store);
    let base = spawn_server(registry).await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/users"))
        .json(&serde_json::json!({"id": "chosen-by-caller", "name": "A", "lastName": "B"}))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);
    let body: serde_json::Value = resp.json().await.unwrap();
    assert_ne!(body["userId"], "chosen-by-caller");
}

// =============================================================================
// Bootstrap across restart
// =============================================================================

#[tokio::test]
async fn test_bootstrap_restores_state_after_restart() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("users.db");

    // First life: create two users and wait for the mirror to catch up.
    let (id1, id2) = {
        let store = Arc::new(UserStore::open(&db_path).unwrap());
        let registry = UserRegistry::spawn(Arc::clone(&store));

        let id1 = registry.create("A", "B").await.unwrap();
        let id2 = registry.create("C", "D").await.unwrap();

        let store = Arc::clone(&store);
        wait_for(async move || store.count().unwrap() == 2).await;

        (id1, id2)
    };

    // Second life: a fresh registry over the same database.
    let store = Arc::new(UserStore::open(&db_path).unwrap());
    let registry = UserRegistry::spawn(store);

    {
        let registry = registry.clone();
        wait_for(async move || registry.count().await.unwrap() == 2).await;
    }

    // Ids survived verbatim, no regeneration.
    let user = registry.get(&id1).await.unwrap();
    assert_eq!((user.name.as_str(), user.last_name.as_str()), ("A", "B"));

    let user = registry.get(&id2).await.unwrap();
    assert_eq!((user.name.as_str(), user.last_name.as_str()), ("C", "D"));
}

#[tokio::test]
async fn test_removed_user_does_not_come_back_after_restart() {
    let temp = TempDir::new().unwrap();
    let db_path = temp.path().join("users.db");

    let kept = {
        let store = Arc::new(UserStore::open(&db_path).unwrap());
        let registry = UserRegistry::spawn(Arc::clone(&store));

        let kept = registry.create("Keep", "Me").await.unwrap();
        let doomed = registry.create("Drop", "Me").await.unwrap();
        assert!(registry.remove(&doomed).await.unwrap());

        let store = Arc::clone(&store);
        wait_for(async move || store.count().unwrap() == 1).await;

        kept
    };

    let store = Arc::new(UserStore::open(&db_path).unwrap());
    let registry = UserRegistry::spawn(store);

    {
        let registry = registry.clone();
        wait_for(async move || registry.count().await.unwrap() == 1).await;
    }

    assert_eq!(registry.get(&kept).await.unwrap().name, "Keep");
}
