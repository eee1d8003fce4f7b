//! Concrete collaborators wired in by the binary
//!
//! - **FsBatchStore:** batches as directories under the root folder
//! - **ConfigActionRegistry:** import options from the TOML config
//! - **HttpAutomationClient:** remote automation engine
//! - **HttpRepositoryClient / RepositoryNavigation:** remote document repository

pub mod config_registry;
pub mod fs_batch_store;
pub mod http_automation;
pub mod http_repository;

pub use config_registry::ConfigActionRegistry;
pub use fs_batch_store::FsBatchStore;
pub use http_automation::HttpAutomationClient;
pub use http_repository::{HttpRepositoryClient, RepositoryNavigation, DOCUMENTS_VIEW};

use reqwest::Url;
use thiserror::Error;

const USER_AGENT: &str = concat!("docdrop-import/", env!("CARGO_PKG_VERSION"));

/// Failures talking to a remote service
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("API error {0}: {1}")]
    ApiError(u16, String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Build the shared HTTP client for one endpoint
pub(crate) fn http_client(timeout_secs: u64) -> Result<reqwest::Client, RemoteError> {
    reqwest::Client::builder()
        .user_agent(USER_AGENT)
        .timeout(std::time::Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| RemoteError::NetworkError(e.to_string()))
}

/// Map a non-success response to a [`RemoteError`]
pub(crate) async fn check_status(
    response: reqwest::Response,
    what: &str,
) -> Result<reqwest::Response, RemoteError> {
    let status = response.status();

    if status == reqwest::StatusCode::NOT_FOUND {
        return Err(RemoteError::NotFound(what.to_string()));
    }

    if !status.is_success() {
        let error_text = response.text().await.unwrap_or_default();
        return Err(RemoteError::ApiError(status.as_u16(), error_text));
    }

    Ok(response)
}

/// Parse a configured endpoint base URL
pub(crate) fn parse_base_url(raw: &str) -> Result<Url, RemoteError> {
    let base_url = Url::parse(raw).map_err(|e| RemoteError::ParseError(format!("{}: {}", raw, e)))?;
    if base_url.cannot_be_a_base() {
        return Err(RemoteError::ParseError(format!("{}: not usable as a base URL", raw)));
    }
    Ok(base_url)
}

/// `<base>/<segments...>`, each segment percent-encoded
pub(crate) fn endpoint_url<'a>(base: &Url, segments: impl IntoIterator<Item = &'a str>) -> Url {
    let mut url = base.clone();
    if let Ok(mut path) = url.path_segments_mut() {
        path.pop_if_empty().extend(segments);
    }
    url
}
