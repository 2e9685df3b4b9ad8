//! The analysis gateway: the capability the orchestration service and the
//! provisioner need from the external document-understanding provider.
//!
//! [`AnalyzerGateway`] hides the submit-and-poll protocol behind a single
//! `analyze` call. The production implementation is
//! [`ContentUnderstandingClient`](crate::content_understanding::ContentUnderstandingClient);
//! tests substitute [`FakeGateway`](crate::testing::FakeGateway).

use std::time::Duration;

use async_trait::async_trait;
use doc_orchestrator_core::analyzer::AnalyzerDefinition;
use doc_orchestrator_core::Result;
use serde_json::Value;

/// Provider operations used by the pipeline.
#[async_trait]
pub trait AnalyzerGateway: Send + Sync {
    /// Run `analyzer_id` against the document at `document_url` and wait for
    /// the terminal result. Returns the raw provider result payload.
    async fn analyze(&self, analyzer_id: &str, document_url: &str) -> Result<Value>;

    /// Create or replace an analyzer definition.
    async fn create_analyzer(&self, analyzer_id: &str, definition: &AnalyzerDefinition)
        -> Result<()>;

    /// Fetch an analyzer definition; `None` when it does not exist.
    async fn get_analyzer(&self, analyzer_id: &str) -> Result<Option<Value>>;

    /// Delete an analyzer. Deleting a missing analyzer succeeds.
    async fn delete_analyzer(&self, analyzer_id: &str) -> Result<()>;
}

/// Response to an analysis submission.
#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The provider answered inline with the finished result.
    Completed(Value),
    /// The provider accepted the request; poll `operation_location`.
    Pending { operation_location: String },
}

/// Status of a pending operation as reported by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperationStatus {
    NotStarted,
    Running,
    Succeeded,
    Failed,
    Unknown(String),
}

impl OperationStatus {
    /// Parse a provider status string, ignoring case.
    pub fn parse(raw: &str) -> Self {
        match raw.to_ascii_lowercase().as_str() {
            "notstarted" => OperationStatus::NotStarted,
            "running" => OperationStatus::Running,
            "succeeded" => OperationStatus::Succeeded,
            "failed" => OperationStatus::Failed,
            _ => OperationStatus::Unknown(raw.to_string()),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OperationStatus::Succeeded | OperationStatus::Failed)
    }
}

/// How often, and how many times, a pending operation is polled.
///
/// The interval is constant. `max_attempts: None` polls until the
/// operation reaches a terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollPolicy {
    pub interval: Duration,
    pub max_attempts: Option<u32>,
}

impl PollPolicy {
    pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(2);
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 300;

    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts: Some(max_attempts),
        }
    }

    pub fn unbounded(interval: Duration) -> Self {
        Self {
            interval,
            max_attempts: None,
        }
    }

    /// Whether attempt number `attempt` (1-based) may still be made.
    pub fn allows(&self, attempt: u32) -> bool {
        self.max_attempts.map_or(true, |max| attempt <= max)
    }
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self::new(Self::DEFAULT_INTERVAL, Self::DEFAULT_MAX_ATTEMPTS)
    }
}
