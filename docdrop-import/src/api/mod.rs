//! HTTP API handlers for docdrop-import
//!
//! Every session route addresses one conversation-scoped dispatcher by id.

pub mod health;
pub mod sessions;
pub mod uploads;

pub use health::health_routes;
pub use sessions::session_routes;
pub use uploads::upload_routes;

use crate::error::{ApiError, ApiResult};
use crate::{AppState, SessionHandle};
use uuid::Uuid;

/// Dispatcher of `session_id`, or 404
pub(crate) async fn find_session(state: &AppState, session_id: Uuid) -> ApiResult<SessionHandle> {
    state
        .session(session_id)
        .await
        .ok_or_else(|| ApiError::NotFound(format!("Import session not found: {}", session_id)))
}
