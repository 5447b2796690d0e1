//! End-to-end route tests against an in-process fake SDK

use axum::body::{to_bytes, Body};
use axum::http::{header, Method, Request, StatusCode};
use axum::Router;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use sms_pipeline::{ExternalPipelineAdapter, PipelineGate};
use sms_server::{build_router, AppState};
use sms_test_utils::{write_tree, FakeLibrary, TemplateFixture, RAISE_MARKER};
use sms_workspace::{TemplateMaterializer, WorkspaceStore};
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

struct TestApp {
    base: TempDir,
    _template: TemplateFixture,
    router: Router,
}

impl TestApp {
    fn new() -> Self {
        let base = TempDir::new().unwrap();
        let template = TemplateFixture::new();
        let pipeline = ExternalPipelineAdapter::with_gate(FakeLibrary::new().shared(), Arc::new(PipelineGate::new()));
        let state = AppState::new(
            WorkspaceStore::new(base.path()),
            TemplateMaterializer::new(template.path()),
            pipeline,
        );
        Self {
            base,
            _template: template,
            router: build_router(state),
        }
    }

    async fn send(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Vec<u8>) {
        let mut request = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(value) => {
                request = request.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let response = self.router.clone().oneshot(request.body(body).unwrap()).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, bytes.to_vec())
    }

    async fn json(&self, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let (status, bytes) = self.send(method, uri, body).await;
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, value)
    }

    async fn workspace(&self) -> String {
        let (status, body) = self.json(Method::POST, "/v1/workspaces", None).await;
        assert_eq!(status, StatusCode::OK);
        body["workspaceId"].as_str().unwrap().to_owned()
    }

    async fn workspace_with_game(&self, game: &str) -> String {
        let ws = self.workspace().await;
        let (status, _) = self
            .json(Method::POST, &format!("/v1/workspaces/{ws}/games"), Some(json!({ "gameId": game })))
            .await;
        assert_eq!(status, StatusCode::OK);
        ws
    }
}

#[tokio::test]
async fn test_health() {
    let app = TestApp::new();
    let (status, body) = app.json(Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn test_create_workspace_lays_out_games_package() {
    let app = TestApp::new();
    let ws = app.workspace().await;
    assert_eq!(ws.len(), 32);

    let (status, body) = app.json(Method::GET, &format!("/v1/workspaces/{ws}/tree"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "workspaceId": ws,
            "entries": [
                { "type": "dir", "path": "games" },
                { "type": "file", "path": "games/__init__.py", "size": 26 },
            ],
        })
    );
}

#[tokio::test]
async fn test_create_game_conflict_and_overwrite() {
    let app = TestApp::new();
    let ws = app.workspace_with_game("foo").await;
    let uri = format!("/v1/workspaces/{ws}/games");

    let (status, body) = app.json(Method::POST, &uri, Some(json!({ "gameId": "foo" }))).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["detail"].is_string());

    let (status, body) = app
        .json(Method::POST, &uri, Some(json!({ "gameId": "foo", "overwrite": true })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["gameId"], "foo");
    assert!(body["root"].as_str().unwrap().ends_with("games/foo"));

    let (status, body) = app.json(Method::GET, &format!("/v1/workspaces/{ws}/file?path=games/foo/reels/BR0.csv"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["content"], "A,A,A,A,A\n");
}

#[tokio::test]
async fn test_create_game_with_bad_id_is_bad_request() {
    let app = TestApp::new();
    let ws = app.workspace().await;
    let (status, _) = app
        .json(Method::POST, &format!("/v1/workspaces/{ws}/games"), Some(json!({ "gameId": "../x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_workspace_is_not_found() {
    let app = TestApp::new();
    let missing = "0123456789abcdef0123456789abcdef";
    for uri in [
        format!("/v1/workspaces/{missing}/tree"),
        format!("/v1/workspaces/{missing}/file?path=a.txt"),
        format!("/v1/workspaces/{missing}/download?path=a.txt"),
    ] {
        let (status, _) = app.send(Method::GET, &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{uri}");
    }
    let (status, _) = app
        .json(Method::POST, &format!("/v1/workspaces/{missing}/validate"), Some(json!({ "gameId": "foo" })))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_file_round_trip_and_errors() {
    let app = TestApp::new();
    let ws = app.workspace().await;
    let uri = format!("/v1/workspaces/{ws}/file?path=notes/deep/a.txt");

    let (status, body) = app.json(Method::PUT, &uri, Some(json!({ "content": "hello" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "path": "notes/deep/a.txt" }));

    let (status, body) = app.json(Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "path": "notes/deep/a.txt", "content": "hello" }));

    let (status, _) = app
        .json(Method::PUT, &format!("/v1/workspaces/{ws}/file?path=notes"), Some(json!({ "content": "x" })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app.json(Method::GET, &format!("/v1/workspaces/{ws}/file?path=notes"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.json(Method::GET, &format!("/v1/workspaces/{ws}/file?path="), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = app
        .json(Method::GET, &format!("/v1/workspaces/{ws}/file?path=../../etc/passwd"), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_validate_good_and_raising_project() {
    let app = TestApp::new();
    let ws = app.workspace_with_game("foo").await;
    let uri = format!("/v1/workspaces/{ws}/validate");

    let (status, body) = app.json(Method::POST, &uri, Some(json!({ "gameId": "foo" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["error"], Value::Null);

    write_tree(
        &app.base.path().join(&ws),
        "games/foo/game_config.py",
        &format!("{RAISE_MARKER}('broken')\n"),
    );
    let (status, body) = app.json(Method::POST, &uri, Some(json!({ "gameId": "foo" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], false);
    assert!(!body["error"].as_str().unwrap().is_empty());
    assert!(!body["traceback"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn test_run_reports_artifacts_or_failure() {
    let app = TestApp::new();
    let ws = app.workspace_with_game("foo").await;
    let uri = format!("/v1/workspaces/{ws}/run");

    let (status, body) = app
        .json(Method::POST, &uri, Some(json!({ "gameId": "foo", "runSims": false })))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    let library = body["artifacts"]["library"].as_str().unwrap().to_owned();
    assert!(library.ends_with("games/foo/library"));
    assert_eq!(body["artifacts"]["books"], format!("{library}/books"));
    assert!(std::path::Path::new(&library).join("generate_configs.txt").is_file());

    let (status, body) = app.json(Method::POST, &uri, Some(json!({ "gameId": "nope" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["detail"]["error"].as_str().unwrap().contains("nope"));
    assert!(body["detail"]["traceback"].is_string());
}

#[tokio::test]
async fn test_download_sets_attachment_headers() {
    let app = TestApp::new();
    let ws = app.workspace().await;
    write_tree(&app.base.path().join(&ws), "out/stats.json", "{\"rtp\": 0.97}");

    let request = Request::builder()
        .uri(format!("/v1/workspaces/{ws}/download?path=out/stats.json"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/json");
    assert_eq!(
        response.headers()[header::CONTENT_DISPOSITION],
        "attachment; filename=\"stats.json\""
    );
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"{\"rtp\": 0.97}");
}

#[tokio::test]
async fn test_delete_workspace() {
    let app = TestApp::new();
    let ws = app.workspace().await;
    let uri = format!("/v1/workspaces/{ws}");

    let (status, body) = app.json(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["workspaceId"], ws.as_str());
    assert!(!app.base.path().join(&ws).exists());

    let (status, _) = app.json(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_body_answers_with_detail() {
    let app = TestApp::new();
    let ws = app.workspace().await;

    let request = Request::builder()
        .method(Method::POST)
        .uri(format!("/v1/workspaces/{ws}/validate"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].is_string());

    let (status, body) = app
        .json(Method::POST, &format!("/v1/workspaces/{ws}/run"), Some(json!({ "runSims": false })))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("gameId"));
}
