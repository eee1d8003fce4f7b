//! Operation execution context

use crate::models::{Blob, RepositorySession};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

/// Context parameter carrying the document metadata snapshot
pub const DOC_METADATA_PARAM: &str = "docMetaData";

/// Context parameter carrying the destination folder id
pub const CURRENT_DOCUMENT_PARAM: &str = "currentDocument";

/// String-keyed parameters merged into the operation context
pub type ContextParams = BTreeMap<String, Value>;

/// Everything an operation or chain runs with
#[derive(Debug, Clone, Serialize)]
pub struct OperationContext {
    pub session: RepositorySession,
    /// Ordered input payload
    pub input: Vec<Blob>,
    pub params: ContextParams,
}

impl OperationContext {
    pub fn new(session: RepositorySession) -> Self {
        Self {
            session,
            input: Vec::new(),
            params: ContextParams::new(),
        }
    }

    pub fn with_input(mut self, input: Vec<Blob>) -> Self {
        self.input = input;
        self
    }

    pub fn with_params(mut self, params: ContextParams) -> Self {
        self.params.extend(params);
        self
    }
}
