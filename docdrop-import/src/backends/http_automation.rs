//! Remote automation engine client
//!
//! **Wire format:** one multipart POST per run.
//! - `context` part: JSON with session, params and (inline runs) the chain definition
//! - `input#<n>` parts: the blobs, in input order
//!
//! Named chains go to `<base>/automation/<chain>` with the chain name
//! percent-encoded as one segment, inline chains to `<base>/automation/run`.

use super::{check_status, endpoint_url, http_client, parse_base_url, RemoteError};
use crate::models::{ContextParams, OperationChain, OperationContext, RepositorySession};
use crate::types::OperationRunner;
use anyhow::Result;
use async_trait::async_trait;
use docdrop_common::config::EndpointConfig;
use reqwest::multipart::{Form, Part};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

const AUTOMATION_SEGMENT: &str = "automation";

/// Path segment for inline chain runs
const INLINE_RUN_SEGMENT: &str = "run";

#[derive(Debug, Serialize)]
struct RunContext<'a> {
    repository: &'a str,
    principal: &'a str,
    params: &'a ContextParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    chain: Option<&'a OperationChain>,
}

pub struct HttpAutomationClient {
    http_client: reqwest::Client,
    base_url: Url,
}

impl HttpAutomationClient {
    pub fn new(config: &EndpointConfig) -> Result<Self, RemoteError> {
        Ok(Self {
            http_client: http_client(config.timeout_secs)?,
            base_url: parse_base_url(&config.base_url)?,
        })
    }

    pub fn chain_url(&self, chain_name: &str) -> Url {
        endpoint_url(&self.base_url, [AUTOMATION_SEGMENT, chain_name])
    }

    pub fn inline_url(&self) -> Url {
        endpoint_url(&self.base_url, [AUTOMATION_SEGMENT, INLINE_RUN_SEGMENT])
    }

    async fn build_form(
        session: &RepositorySession,
        ctx: &OperationContext,
        chain: Option<&OperationChain>,
    ) -> Result<Form> {
        let context = RunContext {
            repository: &session.repository,
            principal: &session.principal,
            params: &ctx.params,
            chain,
        };
        let context_part = Part::text(serde_json::to_string(&context)?)
            .mime_str("application/json")?;

        let mut form = Form::new().part("context", context_part);
        for (index, blob) in ctx.input.iter().enumerate() {
            let data = blob.read_bytes().await?;
            let part = Part::bytes(data)
                .file_name(blob.filename.clone())
                .mime_str(&blob.mime_type)?;
            form = form.part(format!("input#{}", index), part);
        }
        Ok(form)
    }

    async fn post(&self, url: Url, form: Form) -> Result<Value> {
        tracing::debug!(url = %url, "Posting automation run");

        let response = self
            .http_client
            .post(url.clone())
            .multipart(form)
            .send()
            .await
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;
        let response = check_status(response, url.as_str()).await?;

        // Operations may legitimately return nothing
        let body = response
            .text()
            .await
            .map_err(|e| RemoteError::NetworkError(e.to_string()))?;
        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        let value = serde_json::from_str(&body).map_err(|e| RemoteError::ParseError(e.to_string()))?;
        Ok(value)
    }
}

#[async_trait]
impl OperationRunner for HttpAutomationClient {
    async fn run_chain(&self, ctx: OperationContext, chain_name: &str) -> Result<Value> {
        let form = Self::build_form(&ctx.session, &ctx, None).await?;
        let result = self.post(self.chain_url(chain_name), form).await?;

        tracing::info!(chain = %chain_name, inputs = ctx.input.len(), "Automation chain completed");
        Ok(result)
    }

    async fn run(&self, ctx: OperationContext, chain: &OperationChain) -> Result<Value> {
        let form = Self::build_form(&ctx.session, &ctx, Some(chain)).await?;
        let result = self.post(self.inline_url(), form).await?;

        tracing::info!(
            chain = %chain.id,
            steps = chain.steps.len(),
            inputs = ctx.input.len(),
            "Inline automation chain completed"
        );
        Ok(result)
    }
}
