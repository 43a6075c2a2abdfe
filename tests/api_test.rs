use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use notes_dock::auth::{password_digest, AdminCredential};
use notes_dock::config::Config;
use notes_dock::router::app_router;
use notes_dock::state::AppState;
use notes_dock::storage::MemoryObjectStore;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn test_config(dir: &TempDir) -> Config {
    let mut admins = HashMap::new();
    admins.insert(
        2,
        AdminCredential {
            username: "year2admin".to_string(),
            password_digest: password_digest("hunter2"),
        },
    );
    Config {
        storage_url: "http://localhost".to_string(),
        storage_bucket: "test".to_string(),
        storage_key: "test-key".to_string(),
        admins,
        max_upload_bytes: 1024 * 1024,
        registry_path: dir.path().join("users.db"),
        port: 0,
    }
}

fn app(dir: &TempDir) -> (Arc<MemoryObjectStore>, Router) {
    let store = Arc::new(MemoryObjectStore::new());
    let state = AppState::new(test_config(dir), store.clone());
    (store, app_router(state))
}

fn json_request(method: &str, uri: &str, token: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn login(router: &Router) -> String {
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/login",
            None,
            &json!({ "year": 2, "username": "year2admin", "password": "hunter2" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn admin_endpoints_reject_missing_or_unknown_tokens_uniformly() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);

    for token in [None, Some("not-a-real-token")] {
        let response = router
            .clone()
            .oneshot(json_request(
                "POST",
                "/admin/add_subject",
                token,
                &json!({ "semester": 1, "subject_name": "DBMS" }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = body_json(response).await;
        assert_eq!(body["message"], json!("Not authorized"));
    }
}

#[tokio::test]
async fn wrong_credentials_do_not_mint_a_token() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);

    let response = router
        .oneshot(json_request(
            "POST",
            "/admin/login",
            None,
            &json!({ "year": 2, "username": "year2admin", "password": "wrong" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Invalid credentials"));
}

#[tokio::test]
async fn subject_lifecycle_over_http() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/add_subject",
            Some(&token),
            &json!({ "semester": 1, "subject_name": "DBMS" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["subject"]["name"], json!("DBMS"));

    // Case-variant duplicate is rejected
    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/add_subject",
            Some(&token),
            &json!({ "semester": 1, "subject_name": "dbms" }),
        ))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(false));
    assert_eq!(body["message"], json!("Subject already exists"));

    // The subject shows up for students browsing the scope
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/subjects?year=2&semester=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["subjects"][0]["name"], json!("DBMS"));
    assert_eq!(body["stats"]["total_subjects"], json!(1));
}

#[tokio::test]
async fn logout_revokes_admin_access() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);
    let token = login(&router).await;

    let response = router
        .clone()
        .oneshot(json_request("POST", "/admin/logout", Some(&token), &json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/admin/add_subject",
            Some(&token),
            &json!({ "semester": 1, "subject_name": "DBMS" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn register_user_validates_and_counts_repeat_visits() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);

    let response = router
        .clone()
        .oneshot(json_request(
            "POST",
            "/api/register-user",
            None,
            &json!({ "department": "CSE", "year": 2, "section": "A", "name": "Asha" }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("Missing required field: email"));

    let full = json!({
        "department": "CSE", "year": 2, "section": "a",
        "name": "Asha", "email": "A@x.com"
    });
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/register-user", None, &full))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("New user created"));

    // Case variants and a string year hit the same row
    let repeat = json!({
        "department": "cse", "year": "2", "section": "A",
        "name": "asha", "email": "a@x.com"
    });
    let response = router
        .clone()
        .oneshot(json_request("POST", "/api/register-user", None, &repeat))
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["message"], json!("User updated"));

    let token = login(&router).await;
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/api/get-users")
                .header(header::AUTHORIZATION, format!("Bearer {}", token))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let body = body_json(response).await;
    assert_eq!(body["users"].as_array().unwrap().len(), 1);
    assert_eq!(body["users"][0]["count"], json!(2));
}

#[tokio::test]
async fn user_listing_requires_admin() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/api/get-users")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn contact_reports_success_even_when_the_log_write_fails() {
    let dir = tempfile::tempdir().unwrap();
    let (store, router) = app(&dir);
    store.set_fail_writes(true);

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/contact",
            None,
            &json!({
                "name": "Asha", "email": "a@x.com", "year": "2", "section": "A",
                "subject": "Missing notes", "message": "Unit 3 file is absent"
            }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["success"], json!(true));
}

#[tokio::test]
async fn download_never_reaches_keys_outside_the_scope() {
    use notes_dock::storage::{ObjectStore, REGISTRY_KEY};

    let dir = tempfile::tempdir().unwrap();
    let (store, router) = app(&dir);

    // Bucket keys a student must never fetch through /download
    store
        .put(REGISTRY_KEY, b"registry bytes".to_vec(), "application/octet-stream")
        .await
        .unwrap();
    store
        .put("year_2/1sem/notes.pdf", b"pdf bytes".to_vec(), "application/octet-stream")
        .await
        .unwrap();

    // Percent-decoding turns this into ../../users/users.db
    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/download/..%2F..%2Fusers%2Fusers.db?year=2&semester=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    // A plain filename in the scope still downloads
    let response = router
        .oneshot(
            Request::builder()
                .uri("/download/notes.pdf?year=2&semester=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"pdf bytes");
}

#[tokio::test]
async fn download_requires_a_scope_and_reports_missing_files() {
    let dir = tempfile::tempdir().unwrap();
    let (_store, router) = app(&dir);

    let response = router
        .clone()
        .oneshot(
            Request::builder()
                .uri("/download/notes.pdf")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = router
        .oneshot(
            Request::builder()
                .uri("/download/notes.pdf?year=2&semester=1")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
