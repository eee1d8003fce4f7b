//! Remote document repository client and the navigation built on it

use super::{check_status, endpoint_url, http_client, parse_base_url, RemoteError};
use crate::models::{DocumentSummary, NavigationOutcome, Permission};
use crate::types::{DocumentRepository, NavigationProvider};
use anyhow::Result;
use async_trait::async_trait;
use docdrop_common::config::EndpointConfig;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::sync::Arc;

/// View clients open after navigating to a folder
pub const DOCUMENTS_VIEW: &str = "view_documents";

#[derive(Debug, Deserialize)]
struct PermissionGrant {
    granted: bool,
}

pub struct HttpRepositoryClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpRepositoryClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http_client: http_client(config.timeout_secs)?,
            base_url: parse_base_url(&config.base_url)?,
        })
    }

    /// `<base>/documents/<segments...>`, each segment percent-encoded
    pub fn document_url(&self, segments: &[&str]) -> Url {
        endpoint_url(&self.base_url, std::iter::once("documents").chain(segments.iter().copied()))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, RemoteError> {
        tracing::debug!(url = %url, "Querying document repository");

        let response = self
            .http_client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;
        let response = check_status(response, url.as_str()).await?;

        response
            .json()
            .await
            .map_err(|e| RemoteError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl DocumentRepository for HttpRepositoryClient {
    async fn document(&self, document_id: &str) -> Result<DocumentSummary> {
        Ok(self.get_json(self.document_url(&[document_id])).await?)
    }

    async fn parent_documents(&self, document_id: &str) -> Result<Vec<DocumentSummary>> {
        Ok(self
            .get_json(self.document_url(&[document_id, "parents"]))
            .await?)
    }

    async fn has_permission(&self, document_id: &str, permission: Permission) -> Result<bool> {
        let grant: PermissionGrant = self
            .get_json(self.document_url(&[document_id, "permissions", permission.as_str()]))
            .await?;
        Ok(grant.granted)
    }
}

/// Navigation state of one session: the document it was opened on
pub struct RepositoryNavigation {
    repository: Arc<dyn DocumentRepository>,
    current_document_id: Option<String>,
}

impl RepositoryNavigation {
    pub fn new(repository: Arc<dyn DocumentRepository>, current_document_id: Option<String>) -> Self {
        Self {
            repository,
            current_document_id,
        }
    }
}

#[async_trait]
impl NavigationProvider for RepositoryNavigation {
    async fn current_document(&self) -> Result<Option<DocumentSummary>> {
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

    /// Checks the target exists before handing the client its view
    async fn navigate_to(&self, document_id: &str) -> Result<NavigationOutcome> {
        let document = self.repository.document(document_id).await?;
        Ok(NavigationOutcome {
            document_id: document.id,
            view: DOCUMENTS_VIEW.to_string(),
        })
    }
}
