//! Document orchestration: upload, analyze, read back, and record feedback.
//!
//! [`DocumentService`] sequences the collaborators. It owns no state of its
//! own beyond the shared handles it was built with, so a single instance
//! serves concurrent requests.
//!
//! Concurrent analyses of the same document are not serialized. Each run
//! upserts its own result and whichever finishes last is what the result
//! repository keeps.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use doc_orchestrator_core::blob::BlobStore;
use doc_orchestrator_core::normalize::normalize_response;
use doc_orchestrator_core::store::{FeedbackRepository, ResultRepository};
use doc_orchestrator_core::{
    AnalysisResult, FeedbackRecord, FieldMap, PipelineConfig, PipelineError, Result,
};
use serde::Serialize;
use uuid::Uuid;

use crate::gateway::AnalyzerGateway;

/// Identifiers handed back by [`DocumentService::upload_document`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadedDocument {
    pub document_id: String,
    pub blob_url: String,
}

pub struct DocumentService {
    blobs: Arc<dyn BlobStore>,
    gateway: Arc<dyn AnalyzerGateway>,
    results: Arc<dyn ResultRepository>,
    feedback: Arc<dyn FeedbackRepository>,
    config: Arc<PipelineConfig>,
    access_ttl: Duration,
}

impl DocumentService {
    pub fn new(
        blobs: Arc<dyn BlobStore>,
        gateway: Arc<dyn AnalyzerGateway>,
        results: Arc<dyn ResultRepository>,
        feedback: Arc<dyn FeedbackRepository>,
        config: Arc<PipelineConfig>,
        access_ttl: Duration,
    ) -> Self {
        Self {
            blobs,
            gateway,
            results,
            feedback,
            config,
            access_ttl,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Store a document under a fresh id. No analysis is started.
    ///
    /// Every call allocates a new id, even for identical bytes.
    pub async fn upload_document(
        &self,
        filename: &str,
        bytes: &[u8],
        content_type: &str,
    ) -> Result<UploadedDocument> {
        if filename.trim().is_empty() {
            return Err(PipelineError::Validation(
                "filename must not be empty".to_string(),
            ));
        }

        let document_id = Uuid::new_v4().to_string();
        let blob_name = format!("{}/{}", document_id, filename);
        let blob_url = self.blobs.upload(&blob_name, bytes, content_type).await?;

        tracing::info!(document_id = %document_id, size = bytes.len(), "uploaded document");
        Ok(UploadedDocument {
            document_id,
            blob_url,
        })
    }

    /// Run the router analyzer over a stored document and persist the
    /// normalized outcome, replacing any earlier result for the same id.
    ///
    /// Nothing is persisted when the provider call fails.
    pub async fn analyze_document(
        &self,
        document_id: &str,
        blob_url: &str,
    ) -> Result<AnalysisResult> {
        if document_id.trim().is_empty() {
            return Err(PipelineError::Validation(
                "document_id must not be empty".to_string(),
            ));
        }
        if blob_url.trim().is_empty() {
            return Err(PipelineError::Validation(
                "blob_url must not be empty".to_string(),
            ));
        }

        let blob_name = self.blobs.blob_name_for(blob_url);
        let access_url = self
            .blobs
            .temporary_access_url(&blob_name, self.access_ttl)
            .await?;

        let router_id = &self.config.azure.router_analyzer_id;
        tracing::info!(document_id, analyzer_id = %router_id, "submitting analysis");

        let raw = match self.gateway.analyze(router_id, &access_url).await {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(document_id, error = %e, "analysis failed");
                return Err(e);
            }
        };

        let normalized = normalize_response(&raw);
        let result = AnalysisResult {
            document_id: document_id.to_string(),
            category_id: normalized.classification.category_id,
            extracted_fields: normalized.fields,
            confidence: normalized.classification.confidence,
            analyzed_at: Utc::now(),
        };
        self.results.save(&result).await?;

        tracing::info!(
            document_id,
            category = result.category_id.as_deref().unwrap_or("-"),
            fields = result.extracted_fields.len(),
            "analysis stored"
        );
        Ok(result)
    }

    pub async fn get_result(&self, document_id: &str) -> Result<Option<AnalysisResult>> {
        let result = self.results.get(document_id).await?;
        if result.is_none() {
            tracing::debug!(document_id, "no analysis result");
        }
        Ok(result)
    }

    /// All stored results, optionally restricted to one category.
    pub async fn list_results(&self, category_id: Option<&str>) -> Result<Vec<AnalysisResult>> {
        match category_id {
            Some(id) => self.results.list_by_category(id).await,
            None => self.results.list_all().await,
        }
    }

    /// Record reviewer corrections. The document does not have to exist.
    pub async fn submit_feedback(
        &self,
        document_id: &str,
        corrected_fields: FieldMap,
        reviewer: Option<String>,
        comment: Option<String>,
    ) -> Result<FeedbackRecord> {
        record_feedback(
            self.feedback.as_ref(),
            document_id,
            corrected_fields,
            reviewer,
            comment,
        )
        .await
    }

    pub async fn get_feedback(&self, document_id: &str) -> Result<Vec<FeedbackRecord>> {
        self.feedback.list_by_document(document_id).await
    }
}

/// Validate and persist one feedback record.
///
/// Needs only a feedback repository, so callers without a provider
/// connection can record corrections too.
pub async fn record_feedback(
    repo: &dyn FeedbackRepository,
    document_id: &str,
    corrected_fields: FieldMap,
    reviewer: Option<String>,
    comment: Option<String>,
) -> Result<FeedbackRecord> {
    if document_id.trim().is_empty() {
        return Err(PipelineError::Validation(
            "document_id must not be empty".to_string(),
        ));
    }
    if corrected_fields.is_empty() {
        return Err(PipelineError::Validation(
            "corrected_fields must not be empty".to_string(),
        ));
    }

    let record = FeedbackRecord {
        feedback_id: Uuid::new_v4().to_string(),
        document_id: document_id.to_string(),
        corrected_fields,
        reviewer,
        comment,
        created_at: Utc::now(),
    };
    repo.save(&record).await?;

    tracing::info!(feedback_id = %record.feedback_id, document_id, "recorded feedback");
    Ok(record)
}
