//! Data models for docdrop-import
//!
//! - Import options and operation targets
//! - Uploaded files and blobs
//! - Documents, permissions and the pending document model
//! - Operation context

pub mod batch;
pub mod context;
pub mod document;
pub mod import_option;
pub mod upload;

pub use batch::{generate_batch_id, is_valid_batch_id};
pub use context::{ContextParams, OperationContext, CURRENT_DOCUMENT_PARAM, DOC_METADATA_PARAM};
pub use document::{DocumentModel, DocumentSummary, NavigationOutcome, Permission, RepositorySession};
pub use import_option::{
    ImportOption, Invocation, OperationChain, OperationStep, OperationTarget, CHAIN_ID_PROPERTY,
    CHAIN_PREFIX, OPERATION_ID_PROPERTY,
};
pub use upload::{Blob, UploadedFile, DEFAULT_CONTENT_TYPE};
