//! Import Dispatcher
//!
//! Conversation-scoped import state plus the single-shot import itself.
//!
//! **Lifecycle:** IDLE → IMPORTING → IDLE. State (folder, batch id, uploaded
//! files, metadata) accumulates lazily across requests and is wiped by
//! [`ImportDispatcher::cancel`]. An import attempt takes all of it out of
//! the session when it starts, so it never survives the attempt.

use crate::error::ImportError;
use crate::models::{
    generate_batch_id, ContextParams, DocumentModel, ImportOption, NavigationOutcome,
    RepositorySession, UploadedFile, CURRENT_DOCUMENT_PARAM, DOC_METADATA_PARAM,
};
use crate::services::{resolve_target, BatchUploadResolver, DirectUploadResolver, FolderResolver};
use crate::types::{ActionRegistry, BatchStore, NavigationProvider, OperationRunner};
use docdrop_common::config::UploadMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Dispatcher state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DispatcherState {
    Idle,
    Importing,
}

/// External services one dispatcher talks to
#[derive(Clone)]
pub struct Collaborators {
    pub batch_store: Arc<dyn BatchStore>,
    pub runner: Arc<dyn OperationRunner>,
    pub navigation: Arc<dyn NavigationProvider>,
    pub registry: Arc<dyn ActionRegistry>,
}

/// Per-dispatcher settings
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Initial upload mode (client capability may change it later)
    pub upload_mode: UploadMode,
    /// Registry category holding the import options
    pub drop_context: String,
    /// Parent of the per-attempt staging directories
    pub staging_root: PathBuf,
}

pub struct ImportDispatcher {
    session: RepositorySession,
    drop_context: String,
    navigation: Arc<dyn NavigationProvider>,
    registry: Arc<dyn ActionRegistry>,
    batch: BatchUploadResolver,
    direct: DirectUploadResolver,
    folders: FolderResolver,

    /// Shared with the guard of a running attempt
    importing: Arc<AtomicBool>,
    upload_mode: UploadMode,
    import_options: Option<Vec<ImportOption>>,
    selected_option: Option<ImportOption>,
    selected_folder_id: Option<String>,
    batch_id: Option<String>,
    uploaded_files: Vec<UploadedFile>,
    document: DocumentModel,
}

impl ImportDispatcher {
    pub fn new(
        collaborators: Collaborators,
        session: RepositorySession,
        config: DispatcherConfig,
    ) -> Self {
        Self {
            session,
            drop_context: config.drop_context,
            navigation: collaborators.navigation.clone(),
            registry: collaborators.registry,
            batch: BatchUploadResolver::new(collaborators.batch_store),
            direct: DirectUploadResolver::new(collaborators.runner, config.staging_root),
            folders: FolderResolver::new(collaborators.navigation),
            importing: Arc::new(AtomicBool::new(false)),
            upload_mode: config.upload_mode,
            import_options: None,
            selected_option: None,
            selected_folder_id: None,
            batch_id: None,
            uploaded_files: Vec::new(),
            document: DocumentModel::default(),
        }
    }

    pub fn state(&self) -> DispatcherState {
        if self.importing.load(Ordering::SeqCst) {
            DispatcherState::Importing
        } else {
            DispatcherState::Idle
        }
    }

    pub fn session(&self) -> &RepositorySession {
        &self.session
    }

    // ------------------------------------------------------------------
    // Import options
    // ------------------------------------------------------------------

    /// Options of the drop context, loaded from the registry once per dispatcher
    pub async fn import_options(&mut self) -> Result<&[ImportOption], ImportError> {
        if self.import_options.is_none() {
            let options = self
                .registry
                .list_actions(&self.drop_context)
                .await
                .map_err(ImportError::Registry)?;
            tracing::debug!(
                drop_context = %self.drop_context,
                options = options.len(),
                "Loaded import options"
            );
            self.import_options = Some(options);
        }
        Ok(self.import_options.as_deref().unwrap_or_default())
    }

    /// Selected option, defaulting to the first loaded one
    pub async fn selected_import_option(&mut self) -> Result<Option<&ImportOption>, ImportError> {
        if self.selected_option.is_none() {
            let first = self.import_options().await?.first().cloned();
            self.selected_option = first;
        }
        Ok(self.selected_option.as_ref())
    }

    pub async fn selected_import_option_id(&mut self) -> Result<Option<String>, ImportError> {
        Ok(self.selected_import_option().await?.map(|option| option.id.clone()))
    }

    pub async fn set_selected_import_option_id(&mut self, id: &str) -> Result<(), ImportError> {
        let option = self
            .import_options()
            .await?
            .iter()
            .find(|option| option.id == id)
            .cloned()
            .ok_or_else(|| ImportError::UnknownOption(id.to_string()))?;
        self.selected_option = Some(option);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Destination folder
    // ------------------------------------------------------------------

    /// Destination folder id, computed on first call and cached
    pub async fn selected_import_folder_id(&mut self) -> Result<Option<String>, ImportError> {
        if self.selected_folder_id.is_none() {
            self.selected_folder_id = self.folders.resolve().await?;
        }
        Ok(self.selected_folder_id.clone())
    }

    pub fn set_selected_import_folder_id(&mut self, folder_id: Option<String>) {
        self.selected_folder_id = folder_id;
    }

    /// Cached folder id without triggering resolution
    pub fn cached_import_folder_id(&self) -> Option<&str> {
        self.selected_folder_id.as_deref()
    }

    /// Selectable document types changed upstream: forget the cached folder
    pub fn invalidate_folder_cache(&mut self) {
        self.selected_folder_id = None;
    }

    // ------------------------------------------------------------------
    // Upload state
    // ------------------------------------------------------------------

    pub fn upload_mode(&self) -> UploadMode {
        self.upload_mode
    }

    pub fn set_upload_mode(&mut self, mode: UploadMode) {
        self.upload_mode = mode;
    }

    pub fn uploaded_files(&self) -> &[UploadedFile] {
        &self.uploaded_files
    }

    pub fn set_uploaded_files(&mut self, files: Vec<UploadedFile>) {
        self.uploaded_files = files;
    }

    pub fn add_uploaded_file(&mut self, file: UploadedFile) {
        self.uploaded_files.push(file);
    }

    pub fn document_model(&self) -> &DocumentModel {
        &self.document
    }

    pub fn set_metadata(&mut self, schema: &str, field: &str, value: Value) {
        self.document.set(schema, field, value);
    }

    /// Batch id of this session, minted on first call
    pub fn generate_batch_id(&mut self) -> &str {
        self.batch_id.get_or_insert_with(generate_batch_id)
    }

    pub fn current_batch_id(&self) -> Option<&str> {
        self.batch_id.as_deref()
    }

    /// Stage a file into this session's batch, minting the batch id if needed
    pub async fn stage_batch_file(&mut self, file: UploadedFile) -> Result<String, ImportError> {
        let batch_id = self.generate_batch_id().to_string();
        self.batch.stage(&batch_id, file).await?;
        Ok(batch_id)
    }

    /// Whether an import would have input
    ///
    /// Batch mode asks the batch store (always `false` before a batch id
    /// exists); direct mode looks at the held files.
    pub async fn has_uploaded_files(&self) -> bool {
        match self.upload_mode {
            UploadMode::Batch => self.batch.has_pending(self.batch_id.as_deref()).await,
            UploadMode::Direct => !self.uploaded_files.is_empty(),
        }
    }

    // ------------------------------------------------------------------
    // Import
    // ------------------------------------------------------------------

    /// Run the import once and reset the session state
    ///
    /// # Returns
    /// Navigation to the destination folder, or `None` when there is no folder.
    ///
    /// Batch id, cached folder, uploaded files and metadata leave the session
    /// before the first await, so the session is reset even when this future
    /// is dropped part way. The batch itself is cleaned by [`AttemptGuard`].
    pub async fn import_documents(&mut self) -> Result<Option<NavigationOutcome>, ImportError> {
        let attempt = Attempt {
            batch_id: self.batch_id.take(),
            folder_id: self.selected_folder_id.take(),
            files: std::mem::take(&mut self.uploaded_files),
            document: std::mem::take(&mut self.document),
        };
        let guard = AttemptGuard::start(
            self.importing.clone(),
            attempt.batch_id.clone().map(|id| (id, self.batch.clone())),
        );

        let outcome = self.run_import(attempt).await;
        guard.finish().await;

        if let Err(e) = &outcome {
            tracing::warn!(error = %e, "Import attempt failed, session state reset");
        }
        outcome
    }

    async fn run_import(&mut self, attempt: Attempt) -> Result<Option<NavigationOutcome>, ImportError> {
        let option = self
            .selected_import_option()
            .await?
            .cloned()
            .ok_or(ImportError::NoImportOption)?;
        let target = resolve_target(&option);
        let folder_id = match attempt.folder_id {
            Some(folder_id) => Some(folder_id),
            None => self.folders.resolve().await?,
        };

        let mut params = ContextParams::new();
        params.insert(DOC_METADATA_PARAM.to_string(), attempt.document.properties());
        params.insert(
            CURRENT_DOCUMENT_PARAM.to_string(),
            folder_id.clone().map(Value::String).unwrap_or(Value::Null),
        );

        tracing::info!(
            option = %option.id,
            operation = %target,
            folder = ?folder_id,
            mode = ?self.upload_mode,
            "Importing documents"
        );

        match self.upload_mode {
            UploadMode::Batch => {
                self.batch
                    .execute_and_clean(attempt.batch_id.as_deref(), &target, &self.session, params)
                    .await?
            }
            UploadMode::Direct => {
                self.direct
                    .run(attempt.files, &target, &self.session, params)
                    .await?
            }
        }

        match folder_id {
            Some(folder_id) => {
                let outcome = self
                    .navigation
                    .navigate_to(&folder_id)
                    .await
                    .map_err(ImportError::Navigation)?;
                Ok(Some(outcome))
            }
            None => Ok(None),
        }
    }

    /// Reset the session state
    ///
    /// Cleans the pending batch, then forgets batch id, folder, uploaded files
    /// and metadata. The option list and selection survive. Repeatable.
    pub async fn cancel(&mut self) {
        if let Some(batch_id) = self.batch_id.take() {
            self.batch.clean(&batch_id).await;
        }
        self.document = DocumentModel::default();
        self.selected_folder_id = None;
        self.uploaded_files.clear();
        self.importing.store(false, Ordering::SeqCst);
    }
}

/// Session state one import attempt consumes
struct Attempt {
    batch_id: Option<String>,
    folder_id: Option<String>,
    files: Vec<UploadedFile>,
    document: DocumentModel,
}

/// Marks the dispatcher importing for as long as it lives
///
/// `finish` cleans the attempt's batch in place. Dropped without `finish`,
/// it hands the cleanup to the runtime instead.
struct AttemptGuard {
    importing: Arc<AtomicBool>,
    batch: Option<(String, BatchUploadResolver)>,
}

impl AttemptGuard {
    fn start(importing: Arc<AtomicBool>, batch: Option<(String, BatchUploadResolver)>) -> Self {
        importing.store(true, Ordering::SeqCst);
        Self { importing, batch }
    }

    async fn finish(mut self) {
        if let Some((batch_id, resolver)) = self.batch.take() {
            resolver.clean(&batch_id).await;
        }
    }
}

impl Drop for AttemptGuard {
    fn drop(&mut self) {
        self.importing.store(false, Ordering::SeqCst);

        let Some((batch_id, resolver)) = self.batch.take() else {
            return;
        };
        tracing::warn!(batch_id = %batch_id, "Import attempt abandoned, scheduling batch cleanup");
        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move { resolver.clean(&batch_id).await });
            }
            Err(_) => {
                tracing::error!(batch_id = %batch_id, "No runtime to clean abandoned batch");
            }
        }
    }
}
