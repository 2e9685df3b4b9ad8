//! In-memory repositories for tests and single-process use.
//!
//! Each repository is its own map behind `std::sync::RwLock`. Feedback
//! uses an [`IndexMap`] so listings come back in insertion order.

use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use indexmap::IndexMap;

use crate::error::{PipelineError, Result};
use crate::models::{AnalysisResult, FeedbackRecord};

use super::{FeedbackRepository, ResultRepository};

fn read_lock<T>(lock: &RwLock<T>) -> Result<RwLockReadGuard<'_, T>> {
    lock.read()
        .map_err(|_| PipelineError::Storage("in-memory store lock poisoned".to_string()))
}

fn write_lock<T>(lock: &RwLock<T>) -> Result<RwLockWriteGuard<'_, T>> {
    lock.write()
        .map_err(|_| PipelineError::Storage("in-memory store lock poisoned".to_string()))
}

/// Analysis results keyed by document id.
#[derive(Default)]
pub struct MemoryResultRepository {
    results: RwLock<HashMap<String, AnalysisResult>>,
}

impl MemoryResultRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResultRepository for MemoryResultRepository {
    async fn get(&self, document_id: &str) -> Result<Option<AnalysisResult>> {
        Ok(read_lock(&self.results)?.get(document_id).cloned())
    }

    async fn save(&self, result: &AnalysisResult) -> Result<()> {
        write_lock(&self.results)?.insert(result.document_id.clone(), result.clone());
        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<bool> {
        Ok(write_lock(&self.results)?.remove(document_id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<AnalysisResult>> {
        let mut all: Vec<_> = read_lock(&self.results)?.values().cloned().collect();
        all.sort_by(|a, b| a.analyzed_at.cmp(&b.analyzed_at));
        Ok(all)
    }

    async fn list_by_category(&self, category_id: &str) -> Result<Vec<AnalysisResult>> {
        Ok(self
            .list_all()
            .await?
            .into_iter()
            .filter(|r| r.category_id.as_deref() == Some(category_id))
            .collect())
    }
}

/// Feedback records keyed by feedback id, in insertion order.
#[derive(Default)]
pub struct MemoryFeedbackRepository {
    records: RwLock<IndexMap<String, FeedbackRecord>>,
}

impl MemoryFeedbackRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl FeedbackRepository for MemoryFeedbackRepository {
    async fn get(&self, feedback_id: &str) -> Result<Option<FeedbackRecord>> {
        Ok(read_lock(&self.records)?.get(feedback_id).cloned())
    }

    async fn save(&self, record: &FeedbackRecord) -> Result<()> {
        write_lock(&self.records)?.insert(record.feedback_id.clone(), record.clone());
        Ok(())
    }

    async fn delete(&self, feedback_id: &str) -> Result<bool> {
        Ok(write_lock(&self.records)?.shift_remove(feedback_id).is_some())
    }

    async fn list_all(&self) -> Result<Vec<FeedbackRecord>> {
        Ok(read_lock(&self.records)?.values().cloned().collect())
    }

    async fn list_by_document(&self, document_id: &str) -> Result<Vec<FeedbackRecord>> {
        Ok(read_lock(&self.records)?
            .values()
            .filter(|r| r.document_id == document_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{FieldMap, FieldValue};
    use chrono::Utc;

    fn result(document_id: &str, category: Option<&str>, field: &str) -> AnalysisResult {
        let mut fields = FieldMap::new();
        fields.insert("value".to_string(), FieldValue::from(field));
        AnalysisResult {
            document_id: document_id.to_string(),
            category_id: category.map(str::to_string),
            extracted_fields: fields,
            confidence: Some(0.8),
            analyzed_at: Utc::now(),
        }
    }

    fn feedback(feedback_id: &str, document_id: &str) -> FeedbackRecord {
        let mut fields = FieldMap::new();
        fields.insert("total".to_string(), FieldValue::from(10i64));
        FeedbackRecord {
            feedback_id: feedback_id.to_string(),
            document_id: document_id.to_string(),
            corrected_fields: fields,
            reviewer: Some("rev".to_string()),
            comment: None,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_save_twice_keeps_one_record_equal_to_second() {
        let repo = MemoryResultRepository::new();
        repo.save(&result("d1", None, "first")).await.unwrap();
        let second = result("d1", None, "second");
        repo.save(&second).await.unwrap();

        let all = repo.list_all().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(repo.get("d1").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_missing_result_is_none() {
        let repo = MemoryResultRepository::new();
        assert!(repo.get("nope").await.unwrap().is_none());
        assert!(!repo.delete("nope").await.unwrap());
    }

    #[tokio::test]
    async fn test_list_by_category() {
        let repo = MemoryResultRepository::new();
        repo.save(&result("d1", Some("invoice"), "a")).await.unwrap();
        repo.save(&result("d2", Some("claim"), "b")).await.unwrap();
        repo.save(&result("d3", None, "c")).await.unwrap();

        let invoices = repo.list_by_category("invoice").await.unwrap();
        assert_eq!(invoices.len(), 1);
        assert_eq!(invoices[0].document_id, "d1");
    }

    #[tokio::test]
    async fn test_feedback_listing_keeps_insertion_order() {
        let repo = MemoryFeedbackRepository::new();
        repo.save(&feedback("f2", "d1")).await.unwrap();
        repo.save(&feedback("f1", "d1")).await.unwrap();
        repo.save(&feedback("f3", "d2")).await.unwrap();

        let ids: Vec<_> = repo
            .list_by_document("d1")
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.feedback_id)
            .collect();
        assert_eq!(ids, vec!["f2", "f1"]);
        assert_eq!(repo.list_all().await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_feedback_delete() {
        let repo = MemoryFeedbackRepository::new();
        repo.save(&feedback("f1", "d1")).await.unwrap();
        assert!(repo.delete("f1").await.unwrap());
        assert!(repo.get("f1").await.unwrap().is_none());
    }
}
