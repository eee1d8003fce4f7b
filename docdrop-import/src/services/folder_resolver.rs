//! Destination Folder Resolution for Imports
//!
//! Picks the folder imported documents land in: the current document when it
//! can take children, else its nearest writable folder ancestor.

use crate::error::ImportError;
use crate::models::{DocumentSummary, Permission};
use crate::types::NavigationProvider;
use std::sync::Arc;

pub struct FolderResolver {
    navigation: Arc<dyn NavigationProvider>,
}

impl FolderResolver {
    pub fn new(navigation: Arc<dyn NavigationProvider>) -> Self {
        Self { navigation }
    }

    /// Resolve the destination folder id
    ///
    /// **Algorithm:**
    /// 1. No current document → `None`
    /// 2. Current document is a folder, not the root, and grants `AddChildren` → its id
    /// 3. Otherwise walk ancestors nearest first; first folder granting `AddChildren` wins
    /// 4. None qualifies → `None`
    ///
    /// Lookup failures propagate unchanged as [`ImportError::Navigation`].
    pub async fn resolve(&self) -> Result<Option<String>, ImportError> {
        let current = self
            .navigation
            .current_document()
            .await
            .map_err(ImportError::Navigation)?;

        let Some(current) = current else {
            tracing::debug!("No current document, no import folder");
            return Ok(None);
        };

        if current.is_folder && !current.is_root() && self.can_add_children(&current).await? {
            tracing::debug!(folder = %current.id, "Current document is the import folder");
            return Ok(Some(current.id));
        }

        let parents = self
            .navigation
            .parent_documents(&current.id)
            .await
            .map_err(ImportError::Navigation)?;

        for parent in parents.iter().rev() {
            if parent.is_folder && self.can_add_children(parent).await? {
                tracing::debug!(
                    document = %current.id,
                    folder = %parent.id,
                    "Using nearest writable ancestor as import folder"
                );
                return Ok(Some(parent.id.clone()));
            }
        }

        tracing::info!(document = %current.id, "No writable folder found for import");
        Ok(None)
    }

    async fn can_add_children(&self, document: &DocumentSummary) -> Result<bool, ImportError> {
        self.navigation
            .has_permission(&document.id, Permission::AddChildren)
            .await
            .map_err(ImportError::Navigation)
    }
}
