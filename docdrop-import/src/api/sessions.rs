//! Import session API handlers
//!
//! Session lifecycle, option selection, destination folder, upload mode and
//! metadata of one conversation.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use super::find_session;
use crate::error::ApiResult;
use crate::models::{ImportOption, RepositorySession};
use crate::{AppState, DispatcherState, ImportDispatcher};
use docdrop_common::config::UploadMode;

/// POST /sessions request
#[derive(Debug, Default, Deserialize)]
pub struct CreateSessionRequest {
    /// Document the user dropped onto
    pub current_document: Option<String>,
    pub repository: Option<String>,
    pub principal: Option<String>,
    /// Overrides the configured default mode
    pub upload_mode: Option<UploadMode>,
}

/// Snapshot of one session (no collaborator calls)
#[derive(Debug, Serialize)]
pub struct SessionStatusResponse {
    pub session_id: Uuid,
    pub state: DispatcherState,
    pub upload_mode: UploadMode,
    pub folder_id: Option<String>,
    pub batch_id: Option<String>,
    pub uploaded_files: usize,
    pub metadata: Value,
}

impl SessionStatusResponse {
    pub(crate) fn of(session_id: Uuid, dispatcher: &ImportDispatcher) -> Self {
        Self {
            session_id,
            state: dispatcher.state(),
            upload_mode: dispatcher.upload_mode(),
            folder_id: dispatcher.cached_import_folder_id().map(str::to_string),
            batch_id: dispatcher.current_batch_id().map(str::to_string),
            uploaded_files: dispatcher.uploaded_files().len(),
            metadata: dispatcher.document_model().properties(),
        }
    }
}

/// GET /sessions/:id/options response
#[derive(Debug, Serialize)]
pub struct OptionsResponse {
    pub options: Vec<ImportOption>,
    pub selected: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SelectOptionRequest {
    pub id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FolderBody {
    pub folder_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ModeBody {
    pub mode: UploadMode,
}

/// PUT /sessions/:id/metadata request: fields of one schema
#[derive(Debug, Deserialize)]
pub struct MetadataRequest {
    pub schema: String,
    pub fields: Map<String, Value>,
}

/// POST /sessions
pub async fn create_session(
    State(state): State<AppState>,
    Json(request): Json<CreateSessionRequest>,
) -> ApiResult<(StatusCode, Json<SessionStatusResponse>)> {
    let defaults = RepositorySession::default();
    let session = RepositorySession {
        repository: request.repository.unwrap_or(defaults.repository),
        principal: request.principal.unwrap_or(defaults.principal),
    };

    let (session_id, handle) = state
        .open_session(session, request.current_document.clone())
        .await;

    let mut dispatcher = handle.lock().await;
    if let Some(mode) = request.upload_mode {
        dispatcher.set_upload_mode(mode);
    }

    tracing::info!(
        session_id = %session_id,
        current_document = ?request.current_document,
        principal = %dispatcher.session().principal,
        "Import session opened"
    );

    Ok((
        StatusCode::CREATED,
        Json(SessionStatusResponse::of(session_id, &dispatcher)),
    ))
}

/// GET /sessions/:id
pub async fn get_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let handle = find_session(&state, session_id).await?;
    let dispatcher = handle.lock().await;
    Ok(Json(SessionStatusResponse::of(session_id, &dispatcher)))
}

/// DELETE /sessions/:id
///
/// Cancels pending work before forgetting the session.
pub async fn delete_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let handle = find_session(&state, session_id).await?;
    handle.lock().await.cancel().await;
    state.close_session(session_id).await;

    tracing::info!(session_id = %session_id, "Import session closed");
    Ok(StatusCode::NO_CONTENT)
}

/// POST /sessions/:id/cancel
pub async fn cancel_session(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let handle = find_session(&state, session_id).await?;
    let mut dispatcher = handle.lock().await;
    dispatcher.cancel().await;

    tracing::info!(session_id = %session_id, "Import session reset");
    Ok(Json(SessionStatusResponse::of(session_id, &dispatcher)))
}

/// GET /sessions/:id/options
pub async fn list_options(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<OptionsResponse>> {
    let handle = find_session(&state, session_id).await?;
    let mut dispatcher = handle.lock().await;

    let options = dispatcher.import_options().await?.to_vec();
    let selected = dispatcher.selected_import_option_id().await?;
    Ok(Json(OptionsResponse { options, selected }))
}

/// PUT /sessions/:id/options/selected
pub async fn select_option(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<SelectOptionRequest>,
) -> ApiResult<Json<OptionsResponse>> {
    let handle = find_session(&state, session_id).await?;
    let mut dispatcher = handle.lock().await;

    dispatcher.set_selected_import_option_id(&request.id).await?;
    tracing::debug!(session_id = %session_id, option = %request.id, "Import option selected");

    let options = dispatcher.import_options().await?.to_vec();
    Ok(Json(OptionsResponse {
        options,
        selected: Some(request.id),
    }))
}

/// GET /sessions/:id/folder
///
/// Resolves (and caches) the destination folder on first call.
pub async fn get_folder(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<FolderBody>> {
    let handle = find_session(&state, session_id).await?;
    let folder_id = handle.lock().await.selected_import_folder_id().await?;
    Ok(Json(FolderBody { folder_id }))
}

/// PUT /sessions/:id/folder
pub async fn set_folder(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<FolderBody>,
) -> ApiResult<Json<FolderBody>> {
    let handle = find_session(&state, session_id).await?;
    handle
        .lock()
        .await
        .set_selected_import_folder_id(body.folder_id.clone());
    Ok(Json(body))
}

/// POST /sessions/:id/folder/invalidate
pub async fn invalidate_folder(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    let handle = find_session(&state, session_id).await?;
    handle.lock().await.invalidate_folder_cache();
    Ok(StatusCode::NO_CONTENT)
}

/// PUT /sessions/:id/mode
pub async fn set_mode(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(body): Json<ModeBody>,
) -> ApiResult<Json<ModeBody>> {
    let handle = find_session(&state, session_id).await?;
    handle.lock().await.set_upload_mode(body.mode);
    Ok(Json(body))
}

/// PUT /sessions/:id/metadata
pub async fn set_metadata(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    Json(request): Json<MetadataRequest>,
) -> ApiResult<Json<SessionStatusResponse>> {
    let handle = find_session(&state, session_id).await?;
    let mut dispatcher = handle.lock().await;

    for (field, value) in request.fields {
        dispatcher.set_metadata(&request.schema, &field, value);
    }
    Ok(Json(SessionStatusResponse::of(session_id, &dispatcher)))
}

/// Build session routes
pub fn session_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/cancel", post(cancel_session))
        .route("/sessions/:id/options", get(list_options))
        .route("/sessions/:id/options/selected", put(select_option))
        .route("/sessions/:id/folder", get(get_folder).put(set_folder))
        .route("/sessions/:id/folder/invalidate", post(invalidate_folder))
        .route("/sessions/:id/mode", put(set_mode))
        .route("/sessions/:id/metadata", put(set_metadata))
}
