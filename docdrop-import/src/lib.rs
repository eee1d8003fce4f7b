//! docdrop-import library interface
//!
//! Import dispatcher for drag-and-drop document import: the dispatcher core,
//! its collaborator traits, concrete backends and the HTTP API exposing
//! conversation-scoped import sessions.

pub mod api;
pub mod backends;
pub mod dispatcher;
pub mod error;
pub mod models;
pub mod services;
pub mod types;

pub use crate::dispatcher::{Collaborators, DispatcherConfig, DispatcherState, ImportDispatcher};
pub use crate::error::{ApiError, ApiResult, ImportError};

use axum::extract::DefaultBodyLimit;
use axum::Router;
use backends::RepositoryNavigation;
use chrono::{DateTime, Utc};
use models::RepositorySession;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tower_http::trace::TraceLayer;
use types::{ActionRegistry, BatchStore, DocumentRepository, OperationRunner};
use uuid::Uuid;

/// One conversation's dispatcher, locked for the duration of a request
pub type SessionHandle = Arc<Mutex<ImportDispatcher>>;

/// Registered session plus the time a request last looked it up
pub struct SessionEntry {
    handle: SessionHandle,
    last_access_ms: AtomicI64,
}

impl SessionEntry {
    fn new(handle: SessionHandle) -> Self {
        Self {
            handle,
            last_access_ms: AtomicI64::new(Utc::now().timestamp_millis()),
        }
    }

    fn touch(&self) {
        self.last_access_ms
            .store(Utc::now().timestamp_millis(), Ordering::Relaxed);
    }

    fn idle_ms(&self, now_ms: i64) -> i64 {
        now_ms - self.last_access_ms.load(Ordering::Relaxed)
    }
}

/// Process-wide collaborators every session dispatcher is built from
#[derive(Clone)]
pub struct Services {
    pub batch_store: Arc<dyn BatchStore>,
    pub runner: Arc<dyn OperationRunner>,
    pub registry: Arc<dyn ActionRegistry>,
    pub repository: Arc<dyn DocumentRepository>,
}

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<RwLock<HashMap<Uuid, SessionEntry>>>,
    pub services: Services,
    pub dispatcher_config: DispatcherConfig,
    /// Request body limit for multipart uploads
    pub max_upload_bytes: usize,
    /// Service startup timestamp for uptime tracking
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(services: Services, dispatcher_config: DispatcherConfig, max_upload_bytes: usize) -> Self {
        Self {
            sessions: Arc::new(RwLock::new(HashMap::new())),
            services,
            dispatcher_config,
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }

    /// Open a conversation on `current_document` and register its dispatcher
    pub async fn open_session(
        &self,
        session: RepositorySession,
        current_document: Option<String>,
    ) -> (Uuid, SessionHandle) {
        let navigation = Arc::new(RepositoryNavigation::new(
            self.services.repository.clone(),
            current_document,
        ));
        let collaborators = Collaborators {
            batch_store: self.services.batch_store.clone(),
            runner: self.services.runner.clone(),
            navigation,
            registry: self.services.registry.clone(),
        };
        let dispatcher = ImportDispatcher::new(collaborators, session, self.dispatcher_config.clone());

        let session_id = Uuid::new_v4();
        let handle = Arc::new(Mutex::new(dispatcher));
        self.sessions
            .write()
            .await
            .insert(session_id, SessionEntry::new(handle.clone()));
        (session_id, handle)
    }

    /// Look up a session and mark it as in use
    pub async fn session(&self, session_id: Uuid) -> Option<SessionHandle> {
        let sessions = self.sessions.read().await;
        let entry = sessions.get(&session_id)?;
        entry.touch();
        Some(entry.handle.clone())
    }

    pub async fn close_session(&self, session_id: Uuid) -> Option<SessionHandle> {
        self.sessions
            .write()
            .await
            .remove(&session_id)
            .map(|entry| entry.handle)
    }

    /// Cancel and forget sessions nobody has looked up for `ttl`
    ///
    /// Sessions whose dispatcher is locked by a running request are left for
    /// the next sweep.
    ///
    /// # Returns
    /// Number of sessions expired
    pub async fn expire_idle_sessions(&self, ttl: Duration) -> usize {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let now_ms = Utc::now().timestamp_millis();

        let expired: Vec<(Uuid, SessionHandle)> = {
            let mut sessions = self.sessions.write().await;
            let idle: Vec<Uuid> = sessions
                .iter()
                .filter(|(_, entry)| entry.idle_ms(now_ms) >= ttl_ms && entry.handle.try_lock().is_ok())
                .map(|(session_id, _)| *session_id)
                .collect();
            idle.into_iter()
                .filter_map(|session_id| {
                    sessions
                        .remove(&session_id)
                        .map(|entry| (session_id, entry.handle))
                })
                .collect()
        };

        for (session_id, handle) in &expired {
            handle.lock().await.cancel().await;
            tracing::info!(session_id = %session_id, "Idle import session expired");
        }
        expired.len()
    }
}

/// Periodically expire sessions idle for longer than `ttl`
pub fn spawn_session_sweeper(state: AppState, ttl: Duration) -> JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(1));

    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            timer.tick().await;
            let expired = state.expire_idle_sessions(ttl).await;
            if expired > 0 {
                let remaining = state.sessions.read().await.len();
                tracing::debug!(expired, remaining, "Session sweep");
            }
        }
    })
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        .merge(api::health_routes())
        .merge(api::session_routes())
        .merge(api::upload_routes())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
