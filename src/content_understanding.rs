//! Client for the Azure AI Content Understanding REST API.
//!
//! # Analysis protocol
//!
//! ```text
//! POST {endpoint}/contentunderstanding/analyzers/{id}:analyze?api-version=V   {"url": ...}
//!   200 ──▶ result returned inline, no polling
//!   202 ──▶ Operation-Location header ──▶ wait, GET, repeat
//!             status running | notStarted ──▶ keep polling
//!             status succeeded            ──▶ return `result` (or the whole body)
//!             status failed               ──▶ AnalysisFailed(error.message)
//!             anything else               ──▶ ProviderProtocol
//! ```
//!
//! Polling waits [`PollPolicy::interval`] before every GET and gives up with
//! [`PipelineError::PollTimeout`] once [`PollPolicy::max_attempts`] GETs
//! have returned a non-terminal status.
//!
//! # Administration
//!
//! | Call | Success statuses | Notes |
//! |------|------------------|-------|
//! | `PUT analyzers/{id}` | 200, 201 | create or replace |
//! | `GET analyzers/{id}` | 200 | 404 is `None` |
//! | `DELETE analyzers/{id}` | 200, 204, 404 | missing is success |

use anyhow::{bail, Context};
use async_trait::async_trait;
use doc_orchestrator_core::analyzer::AnalyzerDefinition;
use doc_orchestrator_core::{PipelineError, Result};
use serde_json::{json, Value};

use crate::config::Config;
use crate::gateway::{AnalyzerGateway, OperationStatus, PollPolicy, SubmitOutcome};
use crate::transport::{HttpRequest, HttpResponse, HttpTransport, Method, ReqwestTransport};

const API_KEY_HEADER: &str = "Ocp-Apim-Subscription-Key";
const OPERATION_LOCATION: &str = "operation-location";

/// Content Understanding client over any [`HttpTransport`].
pub struct ContentUnderstandingClient<T> {
    transport: T,
    endpoint: String,
    api_version: String,
    api_key: String,
    poll: PollPolicy,
}

impl<T: HttpTransport> ContentUnderstandingClient<T> {
    pub fn new(
        transport: T,
        endpoint: &str,
        api_version: &str,
        api_key: &str,
        poll: PollPolicy,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
            api_key: api_key.to_string(),
            poll,
        }
    }

    pub fn poll_policy(&self) -> PollPolicy {
        self.poll
    }

    fn analyzer_url(&self, analyzer_id: &str) -> String {
        format!(
            "{}/contentunderstanding/analyzers/{}?api-version={}",
            self.endpoint, analyzer_id, self.api_version
        )
    }

    fn analyze_url(&self, analyzer_id: &str) -> String {
        format!(
            "{}/contentunderstanding/analyzers/{}:analyze?api-version={}",
            self.endpoint, analyzer_id, self.api_version
        )
    }

    fn request(&self, method: Method, url: String) -> HttpRequest {
        HttpRequest::new(method, url)
            .header(API_KEY_HEADER, &self.api_key)
            .header("Content-Type", "application/json")
    }

    /// POST the analysis request and classify the provider's answer.
    pub async fn submit(&self, analyzer_id: &str, document_url: &str) -> Result<SubmitOutcome> {
        let req = self
            .request(Method::POST, self.analyze_url(analyzer_id))
            .json(json!({ "url": document_url }));
        let resp = self.transport.send(req).await?;

        match resp.status {
            200 => Ok(SubmitOutcome::Completed(resp.json()?)),
            202 => {
                let operation_location = resp
                    .header(OPERATION_LOCATION)
                    .filter(|loc| !loc.is_empty())
                    .ok_or_else(|| {
                        PipelineError::ProviderProtocol(
                            "analysis accepted without an Operation-Location header".to_string(),
                        )
                    })?;
                Ok(SubmitOutcome::Pending {
                    operation_location: operation_location.to_string(),
                })
            }
            _ => Err(unexpected("submit analysis", &resp)),
        }
    }

    /// Poll an operation until it reaches a terminal status or the poll
    /// bound is exhausted.
    pub async fn poll_until_done(&self, operation_location: &str) -> Result<Value> {
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            if !self.poll.allows(attempt) {
                return Err(PipelineError::PollTimeout {
                    attempts: attempt - 1,
                });
            }

            tokio::time::sleep(self.poll.interval).await;

            let req = self.request(Method::GET, operation_location.to_string());
            let resp = self.transport.send(req).await?;
            if resp.status != 200 {
                return Err(unexpected("poll operation", &resp));
            }

            let body = resp.json()?;
            let raw_status = body.get("status").and_then(Value::as_str).unwrap_or("");
            let status = OperationStatus::parse(raw_status);
            tracing::debug!(attempt, status = raw_status, "polled analysis operation");

            match status {
                OperationStatus::Succeeded => {
                    return Ok(match body.get("result") {
                        Some(result) => result.clone(),
                        None => body,
                    });
                }
                OperationStatus::Failed => {
                    let message = body
                        .pointer("/error/message")
                        .and_then(Value::as_str)
                        .unwrap_or("Unknown error")
                        .to_string();
                    return Err(PipelineError::AnalysisFailed { message });
                }
                OperationStatus::Running | OperationStatus::NotStarted => continue,
                OperationStatus::Unknown(other) => {
                    return Err(PipelineError::ProviderProtocol(format!(
                        "unknown operation status: '{}'",
                        other
                    )));
                }
            }
        }
    }
}

impl ContentUnderstandingClient<ReqwestTransport> {
    /// Build the production client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if the API key environment variable is not set or empty, or
    /// if the endpoint is not configured.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let api_key = std::env::var(&config.client.api_key_env).unwrap_or_default();
        if api_key.is_empty() {
            bail!("{} environment variable not set", config.client.api_key_env);
        }
        if config.azure.endpoint.trim().is_empty() {
            bail!("azure.endpoint must be set");
        }

        let transport = ReqwestTransport::new(std::time::Duration::from_secs(
            config.client.timeout_secs,
        ))
        .context("Failed to build HTTP client")?;
        let poll = PollPolicy::new(config.client.poll_interval(), config.client.max_poll_attempts);

        Ok(Self::new(
            transport,
            &config.azure.endpoint,
            &config.azure.api_version,
            &api_key,
            poll,
        ))
    }
}

fn unexpected(operation: &str, resp: &HttpResponse) -> PipelineError {
    PipelineError::ProviderProtocol(format!(
        "{} returned HTTP {}: {}",
        operation, resp.status, resp.body
    ))
}

#[async_trait]
impl<T: HttpTransport> AnalyzerGateway for ContentUnderstandingClient<T> {
    async fn analyze(&self, analyzer_id: &str, document_url: &str) -> Result<Value> {
        match self.submit(analyzer_id, document_url).await? {
            SubmitOutcome::Completed(body) => Ok(body),
            SubmitOutcome::Pending { operation_location } => {
                tracing::debug!(analyzer_id, %operation_location, "analysis accepted, polling");
                self.poll_until_done(&operation_location).await
            }
        }
    }

    async fn create_analyzer(
        &self,
        analyzer_id: &str,
        definition: &AnalyzerDefinition,
    ) -> Result<()> {
        let req = self
            .request(Method::PUT, self.analyzer_url(analyzer_id))
            .json(serde_json::to_value(definition)?);
        let resp = self.transport.send(req).await?;
        match resp.status {
            200 | 201 => Ok(()),
            _ => Err(unexpected("create analyzer", &resp)),
        }
    }

    async fn get_analyzer(&self, analyzer_id: &str) -> Result<Option<Value>> {
        let req = self.request(Method::GET, self.analyzer_url(analyzer_id));
        let resp = self.transport.send(req).await?;
        match resp.status {
            200 => Ok(Some(resp.json()?)),
            404 => Ok(None),
            _ => Err(unexpected("get analyzer", &resp)),
        }
    }

    async fn delete_analyzer(&self, analyzer_id: &str) -> Result<()> {
        let req = self.request(Method::DELETE, self.analyzer_url(analyzer_id));
        let resp = self.transport.send(req).await?;
        match resp.status {
            200 | 204 | 404 => Ok(()),
            _ => Err(unexpected("delete analyzer", &resp)),
        }
    }
}
