//! Upload and import API handlers
//!
//! Batch clients mint a batch id and stream files into it ahead of the
//! import; direct clients attach files to the session. Either way the import
//! itself is `POST /sessions/:id/import`.

use axum::{
    extract::{Multipart, Path, State},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use uuid::Uuid;

use super::find_session;
use crate::error::{ApiError, ApiResult};
use crate::models::{NavigationOutcome, UploadedFile};
use crate::{AppState, DispatcherState};

#[derive(Debug, Serialize)]
pub struct BatchIdResponse {
    pub batch_id: String,
}

#[derive(Debug, Serialize)]
pub struct BatchFilesResponse {
    pub batch_id: String,
    /// Files staged by this request
    pub staged: usize,
}

#[derive(Debug, Serialize)]
pub struct UploadsResponse {
    pub has_uploaded_files: bool,
}

#[derive(Debug, Serialize)]
pub struct AttachFilesResponse {
    /// Files held by the session after this request
    pub uploaded_files: usize,
}

#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub state: DispatcherState,
    /// Where the client should go; absent when no folder was resolved
    pub navigation: Option<NavigationOutcome>,
}

/// Read every file part of a multipart body
///
/// Parts without a file name are form fields, not uploads, and are skipped.
async fn read_files(mut multipart: Multipart) -> ApiResult<Vec<UploadedFile>> {
    let mut files = Vec::new();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("Malformed multipart body: {}", e)))?
    {
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let content_type = field.content_type().map(str::to_string);
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(format!("Failed to read upload '{}': {}", name, e)))?;

        files.push(UploadedFile::from_bytes(name, content_type, data.to_vec()));
    }

    if files.is_empty() {
        return Err(ApiError::BadRequest("No file parts in request".to_string()));
    }
    Ok(files)
}

/// POST /sessions/:id/batch
pub async fn generate_batch(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<BatchIdResponse>> {
    let handle = find_session(&state, session_id).await?;
    let batch_id = handle.lock().await.generate_batch_id().to_string();
    Ok(Json(BatchIdResponse { batch_id }))
}

/// POST /sessions/:id/batch/files
pub async fn stage_batch_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<BatchFilesResponse>> {
    let handle = find_session(&state, session_id).await?;
    let files = read_files(multipart).await?;
    let staged = files.len();

    let mut dispatcher = handle.lock().await;
    let mut batch_id = String::new();
    for file in files {
        batch_id = dispatcher.stage_batch_file(file).await?;
    }

    tracing::info!(session_id = %session_id, batch_id = %batch_id, files = staged, "Files staged");
    Ok(Json(BatchFilesResponse { batch_id, staged }))
}

/// GET /sessions/:id/uploads
pub async fn has_uploads(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<UploadsResponse>> {
    let handle = find_session(&state, session_id).await?;
    let has_uploaded_files = handle.lock().await.has_uploaded_files().await;
    Ok(Json(UploadsResponse { has_uploaded_files }))
}

/// POST /sessions/:id/files
pub async fn attach_files(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
    multipart: Multipart,
) -> ApiResult<Json<AttachFilesResponse>> {
    let handle = find_session(&state, session_id).await?;
    let files = read_files(multipart).await?;

    let mut dispatcher = handle.lock().await;
    for file in files {
        dispatcher.add_uploaded_file(file);
    }
    let uploaded_files = dispatcher.uploaded_files().len();

    tracing::debug!(session_id = %session_id, files = uploaded_files, "Files attached");
    Ok(Json(AttachFilesResponse { uploaded_files }))
}

/// POST /sessions/:id/import
///
/// Runs the import once; the session is reset afterwards whatever the outcome.
/// The attempt runs on its own task so a dropped connection cannot cut it short.
pub async fn import_documents(
    State(state): State<AppState>,
    Path(session_id): Path<Uuid>,
) -> ApiResult<Json<ImportResponse>> {
    let handle = find_session(&state, session_id).await?;
    let mut dispatcher = handle.lock_owned().await;

    let (navigation, dispatcher_state) = tokio::spawn(async move {
        let navigation = dispatcher.import_documents().await;
        (navigation, dispatcher.state())
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Import task failed: {}", e)))?;
    let navigation = navigation?;

    tracing::info!(
        session_id = %session_id,
        folder = ?navigation.as_ref().map(|n| n.document_id.as_str()),
        "Import completed"
    );
    Ok(Json(ImportResponse {
        state: dispatcher_state,
        navigation,
    }))
}

/// Build upload and import routes
pub fn upload_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/:id/batch", post(generate_batch))
        .route("/sessions/:id/batch/files", post(stage_batch_files))
        .route("/sessions/:id/uploads", get(has_uploads))
        .route("/sessions/:id/files", post(attach_files))
        .route("/sessions/:id/import", post(import_documents))
}
