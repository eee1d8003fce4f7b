//! Integration tests for docdrop-import API endpoints

mod helpers;

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use docdrop_common::config::UploadMode;
use docdrop_import::models::{ImportOption, Invocation, OperationChain, CHAIN_ID_PROPERTY};
use docdrop_import::{build_router, AppState, DispatcherConfig, Services};
use helpers::{doc, MemoryBatchStore, MemoryRepository, RecordingRunner, StaticRegistry};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tower::util::ServiceExt;

const BOUNDARY: &str = "docdrop-test-boundary";

struct TestApp {
    router: Router,
    state: AppState,
    batch_store: Arc<MemoryBatchStore>,
    runner: Arc<RecordingRunner>,
    _staging: TempDir,
}

/// Test helper: app over in-memory collaborators, repository holding a
/// writable workspace `ws` under the root
fn create_test_app(options: Vec<ImportOption>) -> TestApp {
    let staging = tempfile::tempdir().expect("Failed to create temp dir");
    let batch_store = Arc::new(MemoryBatchStore::default());
    let runner = Arc::new(RecordingRunner::default());
    let repository = MemoryRepository::default()
        .with_document(doc("root", "/", true), &[])
        .with_document(doc("ws", "/ws", true), &["root"])
        .with_document(doc("contract", "/ws/contract", false), &["root", "ws"])
        .writable("ws");

    let services = Services {
        batch_store: batch_store.clone(),
        runner: runner.clone(),
        registry: Arc::new(StaticRegistry::new(options)),
        repository: Arc::new(repository),
    };
    let config = DispatcherConfig {
        upload_mode: UploadMode::Batch,
        drop_context: "import".to_string(),
        staging_root: staging.path().to_path_buf(),
    };
    let state = AppState::new(services, config, 10 * 1024 * 1024);

    TestApp {
        router: build_router(state.clone()),
        state,
        batch_store,
        runner,
        _staging: staging,
    }
}

impl TestApp {
    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let json = if body.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body).unwrap()
        };
        (status, json)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
    }

    async fn send_json(&self, method: &str, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
    }

    async fn post_empty(&self, uri: &str) -> (StatusCode, Value) {
        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
    }

    async fn post_files(&self, uri: &str, files: &[(&str, &str)]) -> (StatusCode, Value) {
        let mut body = String::new();
        for (name, content) in files {
            body.push_str(&format!(
                "--{}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{}\"\r\nContent-Type: text/plain\r\n\r\n{}\r\n",
                BOUNDARY, name, content
            ));
        }
        body.push_str(&format!("--{}--\r\n", BOUNDARY));

        self.send(
            Request::builder()
                .method("POST")
                .uri(uri)
                .header("content-type", format!("multipart/form-data; boundary={}", BOUNDARY))
                .body(Body::from(body))
                .unwrap(),
        )
        .await
    }

    async fn open_session(&self, body: Value) -> String {
        let (status, json) = self.send_json("POST", "/sessions", body).await;
        assert_eq!(status, StatusCode::CREATED);
        json["session_id"].as_str().unwrap().to_string()
    }
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_app(Vec::new());

    let (status, json) = app.get("/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "ok");
    assert_eq!(json["module"], "docdrop-import");
    assert_eq!(json["sessions"], 0);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);

    let (status, json) = app.send_json("POST", "/sessions", json!({"current_document": "ws"})).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["upload_mode"], "batch");
    let id = json["session_id"].as_str().unwrap().to_string();

    let (status, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["uploaded_files"], 0);

    let (status, _) = app
        .send(
            Request::builder()
                .method("DELETE")
                .uri(format!("/sessions/{}", id))
                .body(Body::empty())
                .unwrap(),
        )
        .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_option_selection() {
    let app = create_test_app(vec![
        ImportOption::new("opt1", "Import"),
        ImportOption::new("opt2", "Import as invoice"),
    ]);
    let id = app.open_session(json!({})).await;

    let (status, json) = app.get(&format!("/sessions/{}/options", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["options"].as_array().unwrap().len(), 2);
    assert_eq!(json["selected"], "opt1");

    let uri = format!("/sessions/{}/options/selected", id);
    let (status, json) = app.send_json("PUT", &uri, json!({"id": "opt2"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["selected"], "opt2");

    let (status, json) = app.send_json("PUT", &uri, json!({"id": "nope"})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "UNKNOWN_OPTION");
}

#[tokio::test]
async fn test_folder_resolution_and_override() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({"current_document": "contract"})).await;

    let (status, json) = app.get(&format!("/sessions/{}/folder", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["folder_id"], "ws");

    let uri = format!("/sessions/{}/folder", id);
    let (status, _) = app.send_json("PUT", &uri, json!({"folder_id": "elsewhere"})).await;
    assert_eq!(status, StatusCode::OK);
    let (_, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(json["folder_id"], "elsewhere");

    let (status, _) = app.post_empty(&format!("/sessions/{}/folder/invalidate", id)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(json["folder_id"], Value::Null);
}

#[tokio::test]
async fn test_batch_upload_import_flow() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({"current_document": "ws"})).await;

    let (_, json) = app.get(&format!("/sessions/{}/uploads", id)).await;
    assert_eq!(json["has_uploaded_files"], false);

    let (status, json) = app.post_empty(&format!("/sessions/{}/batch", id)).await;
    assert_eq!(status, StatusCode::OK);
    let batch_id = json["batch_id"].as_str().unwrap().to_string();
    assert!(batch_id.starts_with("batch-"));

    let (status, json) = app
        .post_files(
            &format!("/sessions/{}/batch/files", id),
            &[("one.txt", "first"), ("two.txt", "second")],
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["batch_id"], batch_id);
    assert_eq!(json["staged"], 2);

    let (_, json) = app.get(&format!("/sessions/{}/uploads", id)).await;
    assert_eq!(json["has_uploaded_files"], true);

    let (status, json) = app
        .send_json(
            "PUT",
            &format!("/sessions/{}/metadata", id),
            json!({"schema": "dublincore", "fields": {"title": "Scans"}}),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["metadata"]["dublincore:title"], "Scans");

    let (status, json) = app.post_empty(&format!("/sessions/{}/import", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["state"], "IDLE");
    assert_eq!(json["navigation"]["document_id"], "ws");
    assert_eq!(json["navigation"]["view"], "view_documents");

    let executions = app.batch_store.executions();
    assert_eq!(executions.len(), 1);
    assert_eq!(executions[0].batch_id, batch_id);
    assert_eq!(executions[0].files, vec!["one.txt", "two.txt"]);

    let (_, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(json["batch_id"], Value::Null);
    assert_eq!(json["metadata"], json!({}));
}

#[tokio::test]
async fn test_direct_upload_import_flow() {
    let option = ImportOption::new("zip", "Import archive").with_property(CHAIN_ID_PROPERTY, "Chain.unzip");
    let app = create_test_app(vec![option, ImportOption::new("opt1", "Import")]);
    let id = app
        .open_session(json!({"current_document": "ws", "upload_mode": "direct"}))
        .await;

    let (status, json) = app
        .post_files(&format!("/sessions/{}/files", id), &[("a.zip", "zipped")])
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["uploaded_files"], 1);

    let (_, json) = app.get(&format!("/sessions/{}/uploads", id)).await;
    assert_eq!(json["has_uploaded_files"], true);

    let (status, _) = app.post_empty(&format!("/sessions/{}/import", id)).await;
    assert_eq!(status, StatusCode::OK);

    let calls = app.runner.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].invocation, Invocation::Chain("unzip".to_string()));
    assert_eq!(calls[0].input[0].0, "a.zip");
    assert_eq!(calls[0].input[0].2, b"zipped".to_vec());

    let (_, json) = app.get(&format!("/sessions/{}/uploads", id)).await;
    assert_eq!(json["has_uploaded_files"], false);
}

#[tokio::test]
async fn test_mode_switch_changes_import_path() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({"current_document": "ws"})).await;

    let (status, json) = app
        .send_json("PUT", &format!("/sessions/{}/mode", id), json!({"mode": "direct"}))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["mode"], "direct");

    app.post_files(&format!("/sessions/{}/files", id), &[("x.txt", "x")])
        .await;
    app.post_empty(&format!("/sessions/{}/import", id)).await;

    assert!(app.batch_store.executions().is_empty());
    assert_eq!(
        app.runner.calls()[0].invocation,
        Invocation::Operation(OperationChain::single("opt1"))
    );
}

#[tokio::test]
async fn test_import_without_options_conflicts() {
    let app = create_test_app(Vec::new());
    let id = app.open_session(json!({"current_document": "ws"})).await;

    let (status, json) = app.post_empty(&format!("/sessions/{}/import", id)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(json["error"]["code"], "NO_IMPORT_OPTION");
}

#[tokio::test]
async fn test_upload_without_file_parts_rejected() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({})).await;

    let (status, json) = app.post_files(&format!("/sessions/{}/files", id), &[]).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"]["code"], "BAD_REQUEST");
}

#[tokio::test]
async fn test_cancel_endpoint_resets_session() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({"current_document": "ws"})).await;

    app.post_files(&format!("/sessions/{}/batch/files", id), &[("a.txt", "a")])
        .await;

    let (status, json) = app.post_empty(&format!("/sessions/{}/cancel", id)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["batch_id"], Value::Null);
    assert_eq!(app.batch_store.cleaned().len(), 1);
}

#[tokio::test]
async fn test_idle_sessions_expire_and_release_batches() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({"current_document": "ws"})).await;
    app.post_files(&format!("/sessions/{}/batch/files", id), &[("a.txt", "a")])
        .await;

    // Recently used sessions survive a sweep
    assert_eq!(app.state.expire_idle_sessions(Duration::from_secs(3600)).await, 0);
    let (status, _) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(app.state.expire_idle_sessions(Duration::ZERO).await, 1);
    assert_eq!(app.batch_store.cleaned().len(), 1);
    assert!(app.state.sessions.read().await.is_empty());

    let (status, json) = app.get(&format!("/sessions/{}", id)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(json["error"]["code"], "NOT_FOUND");
}

#[tokio::test]
async fn test_busy_session_survives_sweep() {
    let app = create_test_app(vec![ImportOption::new("opt1", "Import")]);
    let id = app.open_session(json!({})).await;

    let handle = app.state.session(id.parse().unwrap()).await.unwrap();
    let _busy = handle.lock().await;

    assert_eq!(app.state.expire_idle_sessions(Duration::ZERO).await, 0);
    assert_eq!(app.state.sessions.read().await.len(), 1);
}
