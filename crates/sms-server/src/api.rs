//! HTTP routes
//!
//! Filesystem work runs on the blocking pool; pipeline work goes through the
//! adapter, which serializes invocations on its own.

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;
use axum::body::Body;
use axum::extract::rejection::JsonRejection;
use axum::extract::{FromRequest, Path, Query, Request, State};
use axum::http::{header, HeaderValue};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use sms_pipeline::{RunOptions, ValidateResult};
use sms_workspace::{list_tree, locate_file, read_file, write_file, GameId, TreeEntry, WorkspaceError, WorkspaceId};
use std::path::PathBuf;
use std::sync::Arc;
use tower::ServiceExt;
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

type Shared = State<Arc<AppState>>;

/// Build the service router (CORS is layered on by the caller)
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/v1/workspaces", post(create_workspace))
        .route("/v1/workspaces/{workspace_id}", delete(delete_workspace))
        .route("/v1/workspaces/{workspace_id}/games", post(create_game))
        .route("/v1/workspaces/{workspace_id}/tree", get(tree))
        .route("/v1/workspaces/{workspace_id}/file", get(get_file).put(put_file))
        .route("/v1/workspaces/{workspace_id}/validate", post(validate))
        .route("/v1/workspaces/{workspace_id}/run", post(run))
        .route("/v1/workspaces/{workspace_id}/download", get(download))
        .with_state(Arc::new(state))
        .layer(TraceLayer::new_for_http())
}

async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    F: FnOnce() -> sms_workspace::Result<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

/// `Json` whose rejections answer with the usual `{"detail": ...}` body
struct JsonBody<T>(T);

impl<S, T> FromRequest<S> for JsonBody<T>
where
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

#[derive(Debug, Deserialize)]
struct PathQuery {
    path: Option<String>,
}

impl PathQuery {
    fn required(self) -> ApiResult<String> {
        match self.path {
            Some(path) if !path.is_empty() => Ok(path),
            _ => Err(ApiError::BadRequest("query parameter `path` must be non-empty".into())),
        }
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WorkspaceBody {
    workspace_id: WorkspaceId,
}

async fn create_workspace(State(state): Shared) -> ApiResult<Json<WorkspaceBody>> {
    let store = state.store.clone();
    let workspace_id = blocking(move || store.create_workspace()).await?;
    Ok(Json(WorkspaceBody { workspace_id }))
}

async fn delete_workspace(State(state): Shared, Path(raw): Path<String>) -> ApiResult<Json<WorkspaceBody>> {
    let workspace_id = WorkspaceId::parse(&raw)?;
    let store = state.store.clone();
    let id = workspace_id.clone();
    blocking(move || store.remove_workspace(&id)).await?;
    Ok(Json(WorkspaceBody { workspace_id }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameRequest {
    game_id: String,
    #[serde(default)]
    overwrite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateGameResponse {
    workspace_id: WorkspaceId,
    game_id: GameId,
    root: PathBuf,
}

async fn create_game(
    State(state): Shared,
    Path(raw): Path<String>,
    JsonBody(req): JsonBody<CreateGameRequest>,
) -> ApiResult<Json<CreateGameResponse>> {
    let outcome = async {
        let workspace_id = WorkspaceId::parse(&raw)?;
        let game_id = GameId::parse(&req.game_id)?;
        let (ws, game) = (workspace_id.clone(), game_id.clone());
        let (store, materializer) = (state.store.clone(), state.materializer.clone());
        let root = blocking(move || materializer.materialize(&store, &ws, &game, req.overwrite)).await?;
        tracing::info!(workspace = %workspace_id, game = %game_id, overwrite = req.overwrite, "materialized game");
        Ok::<_, ApiError>(CreateGameResponse {
            workspace_id,
            game_id,
            root,
        })
    };

    match outcome.await {
        Ok(body) => Ok(Json(body)),
        Err(ApiError::Workspace(e @ WorkspaceError::AlreadyExists(_))) => Err(e.into()),
        Err(ApiError::Workspace(e)) => Err(ApiError::BadRequest(e.to_string())),
        Err(other) => Err(other),
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct TreeResponse {
    workspace_id: WorkspaceId,
    entries: Vec<TreeEntry>,
}

async fn tree(State(state): Shared, Path(raw): Path<String>) -> ApiResult<Json<TreeResponse>> {
    let workspace_id = WorkspaceId::parse(&raw)?;
    let store = state.store.clone();
    let id = workspace_id.clone();
    let entries = blocking(move || {
        let root = store.existing_workspace_root(&id)?;
        list_tree(&root).collect::<sms_workspace::Result<Vec<_>>>()
    })
    .await?;
    Ok(Json(TreeResponse { workspace_id, entries }))
}

#[derive(Debug, Serialize)]
struct FileBody {
    path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
}

async fn get_file(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(query): Query<PathQuery>,
) -> ApiResult<Json<FileBody>> {
    let rel = query.required()?;
    let workspace_id = WorkspaceId::parse(&raw)?;
    let store = state.store.clone();
    let path = rel.clone();
    let content = blocking(move || {
        let root = store.existing_workspace_root(&workspace_id)?;
        read_file(&root, &path)
    })
    .await?;
    Ok(Json(FileBody {
        path: rel,
        content: Some(content),
    }))
}

#[derive(Debug, Deserialize)]
struct WriteFileRequest {
    content: String,
}

async fn put_file(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(query): Query<PathQuery>,
    JsonBody(req): JsonBody<WriteFileRequest>,
) -> ApiResult<Json<FileBody>> {
    let rel = query.required()?;
    let workspace_id = WorkspaceId::parse(&raw)?;
    let store = state.store.clone();
    let path = rel.clone();
    blocking(move || {
        let root = store.existing_workspace_root(&workspace_id)?;
        write_file(&root, &path, &req.content)
    })
    .await?;
    Ok(Json(FileBody {
        path: rel,
        content: None,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateRequest {
    game_id: String,
}

async fn existing_games_root(state: &AppState, raw: &str) -> ApiResult<PathBuf> {
    let workspace_id = WorkspaceId::parse(raw)?;
    let store = state.store.clone();
    blocking(move || store.existing_games_root(&workspace_id)).await
}

async fn validate(
    State(state): Shared,
    Path(raw): Path<String>,
    JsonBody(req): JsonBody<ValidateRequest>,
) -> ApiResult<Json<ValidateResult>> {
    let games_root = existing_games_root(&state, &raw).await?;
    let game = GameId::parse(&req.game_id)?;
    Ok(Json(state.pipeline.validate(&games_root, &game).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RunRequest {
    game_id: String,
    #[serde(flatten)]
    options: RunOptions,
}

#[derive(Debug, Serialize)]
struct Artifacts {
    library: PathBuf,
    configs: PathBuf,
    publish_files: PathBuf,
    books: PathBuf,
    lookup_tables: PathBuf,
    forces: PathBuf,
}

impl Artifacts {
    fn under(library: PathBuf) -> Self {
        Self {
            configs: library.join("configs"),
            publish_files: library.join("publish_files"),
            books: library.join("books"),
            lookup_tables: library.join("lookup_tables"),
            forces: library.join("forces"),
            library,
        }
    }
}

#[derive(Debug, Serialize)]
struct RunResponse {
    ok: bool,
    artifacts: Artifacts,
}

async fn run(State(state): Shared, Path(raw): Path<String>, JsonBody(req): JsonBody<RunRequest>) -> ApiResult<Json<RunResponse>> {
    let games_root = existing_games_root(&state, &raw).await?;
    let game = GameId::parse(&req.game_id)?;

    let result = state.pipeline.run(&games_root, &game, &req.options).await;
    if !result.is_ok() {
        return Err(ApiError::Pipeline(result));
    }

    let library = sms_workspace::resolve(&games_root, [game.as_str(), "library"])?;
    Ok(Json(RunResponse {
        ok: true,
        artifacts: Artifacts::under(library),
    }))
}

async fn download(
    State(state): Shared,
    Path(raw): Path<String>,
    Query(query): Query<PathQuery>,
    request: Request,
) -> ApiResult<Response> {
    let rel = query.required()?;
    let workspace_id = WorkspaceId::parse(&raw)?;
    let store = state.store.clone();
    let file = blocking(move || {
        let root = store.existing_workspace_root(&workspace_id)?;
        locate_file(&root, &rel)
    })
    .await?;

    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().replace(['"', '\\'], "_"))
        .unwrap_or_default();
    let response = match ServeFile::new(&file).oneshot(request).await {
        Ok(response) => response,
        Err(never) => match never {},
    };

    let mut response = response.map(Body::new).into_response();
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    response.headers_mut().insert(header::CONTENT_DISPOSITION, disposition);
    Ok(response)
}
