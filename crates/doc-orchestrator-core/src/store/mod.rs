//! Repository abstraction for analysis results and reviewer feedback.
//!
//! Results and feedback live in two independent keyed stores:
//!
//! - [`ResultRepository`] holds at most one [`AnalysisResult`] per
//!   `document_id`; [`save`](ResultRepository::save) is an upsert and the
//!   last write wins.
//! - [`FeedbackRepository`] is append-only in practice: every record has
//!   its own `feedback_id` and many records may reference one document.
//!
//! Implementations must be `Send + Sync` and make `save` atomic per key.
//! Nothing is coordinated across the two stores.

pub mod memory;

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{AnalysisResult, FeedbackRecord};

/// Keyed store of analysis results.
#[async_trait]
pub trait ResultRepository: Send + Sync {
    /// Fetch the result for a document. A missing id is `Ok(None)`.
    async fn get(&self, document_id: &str) -> Result<Option<AnalysisResult>>;

    /// Insert or replace the result for `result.document_id`.
    async fn save(&self, result: &AnalysisResult) -> Result<()>;

    /// Remove a result. Returns whether a record existed.
    async fn delete(&self, document_id: &str) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<AnalysisResult>>;

    async fn list_by_category(&self, category_id: &str) -> Result<Vec<AnalysisResult>>;
}

/// Keyed store of feedback records.
#[async_trait]
pub trait FeedbackRepository: Send + Sync {
    async fn get(&self, feedback_id: &str) -> Result<Option<FeedbackRecord>>;

    /// Insert or replace the record for `record.feedback_id`.
    async fn save(&self, record: &FeedbackRecord) -> Result<()>;

    async fn delete(&self, feedback_id: &str) -> Result<bool>;

    async fn list_all(&self) -> Result<Vec<FeedbackRecord>>;

    /// Every record referencing `document_id`, oldest first.
    async fn list_by_document(&self, document_id: &str) -> Result<Vec<FeedbackRecord>>;
}
