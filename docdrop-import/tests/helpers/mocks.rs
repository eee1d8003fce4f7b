//! In-memory collaborators for dispatcher and API tests

use anyhow::{bail, Result};
use async_trait::async_trait;
use docdrop_import::models::{
    ContextParams, DocumentSummary, ImportOption, Invocation, NavigationOutcome, OperationChain,
    OperationContext, OperationTarget, Permission, RepositorySession, UploadedFile,
};
use docdrop_import::types::{
    ActionRegistry, BatchStore, DocumentRepository, NavigationProvider, OperationRunner,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::io::AsyncReadExt;

// ============================================================================
// Operation runner
// ============================================================================

/// One runner invocation with the blob contents read at run time
#[derive(Debug, Clone)]
pub struct RunnerCall {
    pub invocation: Invocation,
    /// (filename, mime type, bytes) in input order
    pub input: Vec<(String, String, Vec<u8>)>,
    pub params: ContextParams,
}

#[derive(Default)]
pub struct RecordingRunner {
    calls: Mutex<Vec<RunnerCall>>,
    fail: AtomicBool,
    stall: AtomicBool,
}

impl RecordingRunner {
    pub fn failing() -> Self {
        let runner = Self::default();
        runner.fail.store(true, Ordering::SeqCst);
        runner
    }

    /// Records the call, then never returns
    pub fn stalled() -> Self {
        let runner = Self::default();
        runner.stall.store(true, Ordering::SeqCst);
        runner
    }

    pub fn calls(&self) -> Vec<RunnerCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, invocation: Invocation, ctx: &OperationContext) -> Result<Value> {
        let input = ctx
            .input
            .iter()
            .map(|b| (b.filename.clone(), b.mime_type.clone(), std::fs::read(&b.path).unwrap()))
            .collect();
        self.calls.lock().unwrap().push(RunnerCall {
            invocation,
            input,
            params: ctx.params.clone(),
        });

        if self.fail.load(Ordering::SeqCst) {
            bail!("automation engine rejected the run");
        }
        Ok(Value::Null)
    }

    async fn stall_if_asked(&self) {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
    }
}

#[async_trait]
impl OperationRunner for RecordingRunner {
    async fn run_chain(&self, ctx: OperationContext, chain_name: &str) -> Result<Value> {
        let result = self.record(Invocation::Chain(chain_name.to_string()), &ctx);
        self.stall_if_asked().await;
        result
    }

    async fn run(&self, ctx: OperationContext, chain: &OperationChain) -> Result<Value> {
        let result = self.record(Invocation::Operation(chain.clone()), &ctx);
        self.stall_if_asked().await;
        result
    }
}

// ============================================================================
// Batch store
// ============================================================================

/// One `execute_and_clean` call
#[derive(Debug, Clone)]
pub struct BatchExecution {
    pub batch_id: String,
    pub target: OperationTarget,
    /// File names staged in the batch, in upload order
    pub files: Vec<String>,
    pub params: ContextParams,
}

#[derive(Default)]
pub struct MemoryBatchStore {
    batches: Mutex<HashMap<String, Vec<(String, Vec<u8>)>>>,
    executions: Mutex<Vec<BatchExecution>>,
    cleaned: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MemoryBatchStore {
    pub fn failing() -> Self {
        let store = Self::default();
        store.fail.store(true, Ordering::SeqCst);
        store
    }

    pub fn executions(&self) -> Vec<BatchExecution> {
        self.executions.lock().unwrap().clone()
    }

    pub fn cleaned(&self) -> Vec<String> {
        self.cleaned.lock().unwrap().clone()
    }

    pub fn batch_len(&self, batch_id: &str) -> usize {
        self.batches
            .lock()
            .unwrap()
            .get(batch_id)
            .map(Vec::len)
            .unwrap_or(0)
    }
}

#[async_trait]
impl BatchStore for MemoryBatchStore {
    async fn add_file(&self, batch_id: &str, mut file: UploadedFile) -> Result<()> {
        let mut data = Vec::new();
        file.reader_mut().read_to_end(&mut data).await?;
        self.batches
            .lock()
            .unwrap()
            .entry(batch_id.to_string())
            .or_default()
            .push((file.name().to_string(), data));
        Ok(())
    }

    async fn has_batch(&self, batch_id: &str) -> bool {
        self.batch_len(batch_id) > 0
    }

    async fn execute_and_clean(
        &self,
        batch_id: &str,
        target: &OperationTarget,
        _session: &RepositorySession,
        params: ContextParams,
    ) -> Result<Value> {
        let files = self
            .batches
            .lock()
            .unwrap()
            .remove(batch_id)
            .unwrap_or_default()
            .into_iter()
            .map(|(name, _)| name)
            .collect();
        self.executions.lock().unwrap().push(BatchExecution {
            batch_id: batch_id.to_string(),
            target: target.clone(),
            files,
            params,
        });

        if self.fail.load(Ordering::SeqCst) {
            bail!("batch execution failed");
        }
        Ok(Value::Null)
    }

    async fn clean(&self, batch_id: &str) -> Result<()> {
        self.batches.lock().unwrap().remove(batch_id);
        self.cleaned.lock().unwrap().push(batch_id.to_string());
        Ok(())
    }
}

// ============================================================================
// Documents and navigation
// ============================================================================

pub fn doc(id: &str, path: &str, is_folder: bool) -> DocumentSummary {
    DocumentSummary {
        id: id.to_string(),
        path: path.to_string(),
        is_folder,
    }
}

/// Documents with explicit ancestor chains and `AddChildren` grants
#[derive(Default)]
pub struct MemoryRepository {
    documents: HashMap<String, DocumentSummary>,
    /// Ancestors per document, root first
    parents: HashMap<String, Vec<String>>,
    writable: HashSet<String>,
}

impl MemoryRepository {
    pub fn with_document(mut self, document: DocumentSummary, parent_ids: &[&str]) -> Self {
        self.parents.insert(
            document.id.clone(),
            parent_ids.iter().map(|id| id.to_string()).collect(),
        );
        self.documents.insert(document.id.clone(), document);
        self
    }

    pub fn writable(mut self, document_id: &str) -> Self {
        self.writable.insert(document_id.to_string());
        self
    }
}

#[async_trait]
impl DocumentRepository for MemoryRepository {
    async fn document(&self, document_id: &str) -> Result<DocumentSummary> {
        match self.documents.get(document_id) {
            Some(document) => Ok(document.clone()),
            None => bail!("Not found: {}", document_id),
        }
    }

    async fn parent_documents(&self, document_id: &str) -> Result<Vec<DocumentSummary>> {
        let parent_ids = self.parents.get(document_id).cloned().unwrap_or_default();
        let mut parents = Vec::with_capacity(parent_ids.len());
        for id in parent_ids {
            parents.push(self.document(&id).await?);
        }
        Ok(parents)
    }

    async fn has_permission(&self, document_id: &str, permission: Permission) -> Result<bool> {
        Ok(permission == Permission::AddChildren && self.writable.contains(document_id))
    }
}

/// Navigation provider counting lookups, with a switch to make them fail
pub struct MockNavigation {
    repository: MemoryRepository,
    current_document_id: Option<String>,
    current_lookups: AtomicUsize,
    navigations: Mutex<Vec<String>>,
    fail: AtomicBool,
}

impl MockNavigation {
    pub fn new(repository: MemoryRepository, current_document_id: Option<&str>) -> Self {
        Self {
            repository,
            current_document_id: current_document_id.map(str::to_string),
            current_lookups: AtomicUsize::new(0),
            navigations: Mutex::new(Vec::new()),
            fail: AtomicBool::new(false),
        }
    }

    /// A writable workspace `ws` under the root, current document `ws`
    pub fn in_writable_folder(folder_id: &str) -> Self {
        let repository = MemoryRepository::default()
            .with_document(doc("root", "/", true), &[])
            .with_document(doc(folder_id, &format!("/{}", folder_id), true), &["root"])
            .writable(folder_id);
        Self::new(repository, Some(folder_id))
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn current_lookups(&self) -> usize {
        self.current_lookups.load(Ordering::SeqCst)
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }
}

#[async_trait]
impl NavigationProvider for MockNavigation {
    async fn current_document(&self) -> Result<Option<DocumentSummary>> {
        self.current_lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            bail!("navigation context unavailable");
        }
        match &self.current_document_id {
            Some(id) => Ok(Some(self.repository.document(id).await?)),
            None => Ok(None),
        }
    }

    async fn parent_documents(&self, document_id: &str) -> Result<Vec<DocumentSummary>> {
        self.repository.parent_documents(document_id).await
    }

    async fn has_permission(&self, document_id: &str, permission: Permission) -> Result<bool> {
        self.repository.has_permission(document_id, permission).await
    }

    async fn navigate_to(&self, document_id: &str) -> Result<NavigationOutcome> {
        self.navigations.lock().unwrap().push(document_id.to_string());
        Ok(NavigationOutcome {
            document_id: document_id.to_string(),
            view: "view_documents".to_string(),
        })
    }
}

// ============================================================================
// Action registry
// ============================================================================

pub struct StaticRegistry {
    options: Vec<ImportOption>,
    lookups: AtomicUsize,
    fail: bool,
}

impl StaticRegistry {
    pub fn new(options: Vec<ImportOption>) -> Self {
        Self {
            options,
            lookups: AtomicUsize::new(0),
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(Vec::new())
        }
    }

    pub fn lookups(&self) -> usize {
        self.lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ActionRegistry for StaticRegistry {
    async fn list_actions(&self, _category: &str) -> Result<Vec<ImportOption>> {
        self.lookups.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            bail!("registry offline");
        }
        Ok(self.options.clone())
    }
}
