//! HTTP transport abstraction.
//!
//! The provider client speaks to the network only through
//! [`HttpTransport`], so tests can replay scripted responses without a
//! server. [`ReqwestTransport`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use doc_orchestrator_core::{PipelineError, Result};
use serde_json::Value;

pub use reqwest::Method;

#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl HttpRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Case-insensitive header lookup.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers
            .push((name.to_ascii_lowercase(), value.to_string()));
        self
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Decode the body as JSON. An undecodable body is a protocol error.
    pub fn json(&self) -> Result<Value> {
        serde_json::from_str(&self.body).map_err(|e| {
            PipelineError::ProviderProtocol(format!(
                "invalid JSON in HTTP {} response: {}",
                self.status, e
            ))
        })
    }
}

/// Sends one HTTP request and returns the raw response.
///
/// Only network-level failures are errors; every HTTP status, including
/// 4xx and 5xx, comes back as an [`HttpResponse`].
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse>;
}

/// [`HttpTransport`] over a shared `reqwest::Client`.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_string());
        }

        let resp = builder.send().await.map_err(|e| {
            PipelineError::Transport(format!("{} {}: {}", request.method.as_str(), request.url, e))
        })?;

        let status = resp.status().as_u16();
        let headers = resp
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_ascii_lowercase(), v.to_string()))
            })
            .collect();
        let body = resp
            .text()
            .await
            .map_err(|e| PipelineError::Transport(format!("reading response body: {}", e)))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_builder() {
        let req = HttpRequest::new(Method::PUT, "https://cu.example.com/a")
            .header("Content-Type", "application/json")
            .json(json!({"k": 1}));

        assert_eq!(req.method, reqwest::Method::PUT);
        assert_eq!(req.method.as_str(), "PUT");
        assert_eq!(req.header_value("content-type"), Some("application/json"));
        assert_eq!(req.header_value("accept"), None);
        assert_eq!(req.body, Some(json!({"k": 1})));
    }

    #[test]
    fn test_response_headers_are_case_insensitive() {
        let resp = HttpResponse::new(202, "{}").with_header("Operation-Location", "u");
        assert_eq!(resp.header("operation-location"), Some("u"));
        assert_eq!(resp.header("OPERATION-LOCATION"), Some("u"));
        assert_eq!(resp.json().unwrap(), json!({}));
        assert!(HttpResponse::new(200, "<html>").json().is_err());
    }
}
