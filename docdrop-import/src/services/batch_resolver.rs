//! Batch-Upload Resolver
//!
//! Files were streamed into a server-side batch before the import; this
//! resolver only asks the batch store to run and discard it.

use crate::error::ImportError;
use crate::models::{ContextParams, OperationTarget, RepositorySession, UploadedFile};
use crate::types::BatchStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct BatchUploadResolver {
    store: Arc<dyn BatchStore>,
}

impl BatchUploadResolver {
    pub fn new(store: Arc<dyn BatchStore>) -> Self {
        Self { store }
    }

    /// False until a batch id exists, then whatever the store reports
    pub async fn has_pending(&self, batch_id: Option<&str>) -> bool {
        match batch_id {
            Some(batch_id) => self.store.has_batch(batch_id).await,
            None => false,
        }
    }

    /// Stage one file into the batch
    pub async fn stage(&self, batch_id: &str, file: UploadedFile) -> Result<(), ImportError> {
        tracing::debug!(batch_id = %batch_id, file = %file.name(), "Staging file into batch");
        self.store
            .add_file(batch_id, file)
            .await
            .map_err(ImportError::Upload)
    }

    /// Run `target` over the pending batch and let the store discard it
    ///
    /// No batch id, or nothing staged under it: nothing to run, not an error.
    pub async fn execute_and_clean(
        &self,
        batch_id: Option<&str>,
        target: &OperationTarget,
        session: &RepositorySession,
        params: ContextParams,
    ) -> Result<(), ImportError> {
        let Some(batch_id) = batch_id else {
            tracing::debug!(operation = %target, "No batch generated, nothing to import");
            return Ok(());
        };

        if !self.store.has_batch(batch_id).await {
            tracing::debug!(batch_id = %batch_id, operation = %target, "Batch is empty, nothing to import");
            return Ok(());
        }

        tracing::info!(batch_id = %batch_id, operation = %target, "Executing batch import");

        self.store
            .execute_and_clean(batch_id, target, session, params)
            .await
            .map_err(|source| {
                tracing::error!(
                    batch_id = %batch_id,
                    operation = %target,
                    error = %source,
                    "Batch import failed"
                );
                ImportError::execution(target, source)
            })?;

        Ok(())
    }

    /// Discard the batch; safe for ids that never held files, and repeatable
    pub async fn clean(&self, batch_id: &str) {
        if let Err(e) = self.store.clean(batch_id).await {
            tracing::warn!(batch_id = %batch_id, error = %e, "Failed to clean batch");
        }
    }
}
