//! Collaborator Trait Definitions for docdrop-import
//!
//! The dispatcher never reaches into a global service locator: every external
//! service is one of these traits, passed in as `Arc<dyn Trait>` at
//! construction.
//!
//! - **BatchStore:** server-side staging of uploads, execution, cleanup
//! - **OperationRunner:** the automation engine
//! - **NavigationProvider:** current document, ancestors, permissions, navigation
//! - **ActionRegistry:** selectable import options
//! - **DocumentRepository:** document lookups backing a navigation provider
//!
//! All methods return `anyhow::Result`; the dispatcher decides how failures
//! are classified.

use crate::models::{
    ContextParams, DocumentSummary, ImportOption, Invocation, NavigationOutcome, OperationChain,
    OperationContext, OperationTarget, Permission, RepositorySession, UploadedFile,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

// ============================================================================
// Batch Store
// ============================================================================

/// Server-side upload batches
///
/// Implementations own batch storage: they assemble blobs from staged files,
/// run the target and discard the batch.
#[async_trait]
pub trait BatchStore: Send + Sync {
    /// Append a file to the batch, creating the batch on first use
    async fn add_file(&self, batch_id: &str, file: UploadedFile) -> Result<()>;

    /// True when the batch exists and holds at least one file
    async fn has_batch(&self, batch_id: &str) -> bool;

    /// Run `target` over the batch's files, then drop the batch whatever the outcome
    async fn execute_and_clean(
        &self,
        batch_id: &str,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> Result<Value>;

    /// Drop the batch. Unknown ids are not an error.
    async fn clean(&self, batch_id: &str) -> Result<()>;
}

// ============================================================================
// Operation Runner
// ============================================================================

/// Automation engine
#[async_trait]
pub trait OperationRunner: Send + Sync {
    /// Run a chain registered under `chain_name`
    async fn run_chain(&self, ctx: OperationContext, chain_name: &str) -> Result<Value>;

    /// Run an inline chain definition
    async fn run(&self, ctx: OperationContext, chain: &OperationChain) -> Result<Value>;

    /// Run a resolved target, honouring the `Chain.` prefix convention
    async fn run_target(&self, ctx: OperationContext, target: &OperationTarget) -> Result<Value> {
        match target.invocation() {
            Invocation::Chain(chain_name) => self.run_chain(ctx, &chain_name).await,
            Invocation::Operation(chain) => self.run(ctx, &chain).await,
        }
    }
}

// ============================================================================
// Navigation / Session
// ============================================================================

/// Navigation state of one conversation plus the repository checks it needs
#[async_trait]
pub trait NavigationProvider: Send + Sync {
    /// Document the user is currently looking at, if any
    async fn current_document(&self) -> Result<Option<DocumentSummary>>;

    /// Ancestors of `document_id`, root first
    async fn parent_documents(&self, document_id: &str) -> Result<Vec<DocumentSummary>>;

    async fn has_permission(&self, document_id: &str, permission: Permission) -> Result<bool>;

    async fn navigate_to(&self, document_id: &str) -> Result<NavigationOutcome>;
}

/// Document lookups, independent of any conversation
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    async fn document(&self, document_id: &str) -> Result<DocumentSummary>;

    /// Ancestors of `document_id`, root first
    async fn parent_documents(&self, document_id: &str) -> Result<Vec<DocumentSummary>>;

    async fn has_permission(&self, document_id: &str, permission: Permission) -> Result<bool>;
}

// ============================================================================
// Action Registry
// ============================================================================

#[async_trait]
pub trait ActionRegistry: Send + Sync {
    /// Import options registered under `category`, in display order
    async fn list_actions(&self, category: &str) -> Result<Vec<ImportOption>>;
}
