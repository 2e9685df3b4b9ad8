//! SQLite-backed repositories.
//!
//! [`SqliteResultRepository`] and [`SqliteFeedbackRepository`] implement
//! the core repository traits over the `analysis_results` and
//! `feedback_records` tables created by [`crate::migrate`]. Field maps are
//! stored as JSON text and timestamps as RFC 3339 strings in UTC.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use doc_orchestrator_core::store::{FeedbackRepository, ResultRepository};
use doc_orchestrator_core::{
    AnalysisResult, FeedbackRecord, FieldMap, PipelineError, Result,
};

fn storage_err(e: sqlx::Error) -> PipelineError {
    PipelineError::Storage(e.to_string())
}

fn format_ts(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

fn parse_ts(raw: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| PipelineError::Storage(format!("invalid timestamp '{}': {}", raw, e)))
}

fn parse_fields(raw: &str) -> Result<FieldMap> {
    Ok(serde_json::from_str(raw)?)
}

/// SQLite implementation of [`ResultRepository`].
#[derive(Clone)]
pub struct SqliteResultRepository {
    pool: SqlitePool,
}

impl SqliteResultRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &SqliteRow) -> Result<AnalysisResult> {
        let fields: String = row.try_get("extracted_fields").map_err(storage_err)?;
        let analyzed_at: String = row.try_get("analyzed_at").map_err(storage_err)?;
        Ok(AnalysisResult {
            document_id: row.try_get("document_id").map_err(storage_err)?,
            category_id: row.try_get("category_id").map_err(storage_err)?,
            extracted_fields: parse_fields(&fields)?,
            confidence: row.try_get("confidence").map_err(storage_err)?,
            analyzed_at: parse_ts(&analyzed_at)?,
        })
    }
}

#[async_trait]
impl ResultRepository for SqliteResultRepository {
    async fn get(&self, document_id: &str) -> Result<Option<AnalysisResult>> {
        let row = sqlx::query(
            "SELECT document_id, category_id, extracted_fields, confidence, analyzed_at \
             FROM analysis_results WHERE document_id = ?",
        )
        .bind(document_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn save(&self, result: &AnalysisResult) -> Result<()> {
        let fields = serde_json::to_string(&result.extracted_fields)?;
        sqlx::query(
            r#"
            INSERT INTO analysis_results (document_id, category_id, extracted_fields,
                                          confidence, analyzed_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(document_id) DO UPDATE SET
                category_id = excluded.category_id,
                extracted_fields = excluded.extracted_fields,
                confidence = excluded.confidence,
                analyzed_at = excluded.analyzed_at
            "#,
        )
        .bind(&result.document_id)
        .bind(&result.category_id)
        .bind(fields)
        .bind(result.confidence)
        .bind(format_ts(&result.analyzed_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn delete(&self, document_id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM analysis_results WHERE document_id = ?")
            .bind(document_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<AnalysisResult>> {
        let rows = sqlx::query(
            "SELECT document_id, category_id, extracted_fields, confidence, analyzed_at \
             FROM analysis_results ORDER BY analyzed_at, rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_category(&self, category_id: &str) -> Result<Vec<AnalysisResult>> {
        let rows = sqlx::query(
            "SELECT document_id, category_id, extracted_fields, confidence, analyzed_at \
             FROM analysis_results WHERE category_id = ? ORDER BY analyzed_at, rowid",
        )
        .bind(category_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(Self::from_row).collect()
    }
}

/// SQLite implementation of [`FeedbackRepository`].
#[derive(Clone)]
pub struct SqliteFeedbackRepository {
    pool: SqlitePool,
}

impl SqliteFeedbackRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    fn from_row(row: &SqliteRow) -> Result<FeedbackRecord> {
        let fields: String = row.try_get("corrected_fields").map_err(storage_err)?;
        let created_at: String = row.try_get("created_at").map_err(storage_err)?;
        Ok(FeedbackRecord {
            feedback_id: row.try_get("feedback_id").map_err(storage_err)?,
            document_id: row.try_get("document_id").map_err(storage_err)?,
            corrected_fields: parse_fields(&fields)?,
            reviewer: row.try_get("reviewer").map_err(storage_err)?,
            comment: row.try_get("comment").map_err(storage_err)?,
            created_at: parse_ts(&created_at)?,
        })
    }
}

#[async_trait]
impl FeedbackRepository for SqliteFeedbackRepository {
    async fn get(&self, feedback_id: &str) -> Result<Option<FeedbackRecord>> {
        let row = sqlx::query(
            "SELECT feedback_id, document_id, corrected_fields, reviewer, comment, created_at \
             FROM feedback_records WHERE feedback_id = ?",
        )
        .bind(feedback_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.as_ref().map(Self::from_row).transpose()
    }

    async fn save(&self, record: &FeedbackRecord) -> Result<()> {
        let fields = serde_json::to_string(&record.corrected_fields)?;
        sqlx::query(
            r#"
            INSERT INTO feedback_records (feedback_id, document_id, corrected_fields,
                                          reviewer, comment, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(feedback_id) DO UPDATE SET
                document_id = excluded.document_id,
                corrected_fields = excluded.corrected_fields,
                reviewer = excluded.reviewer,
                comment = excluded.comment,
                created_at = excluded.created_at
            "#,
        )
        .bind(&record.feedback_id)
        .bind(&record.document_id)
        .bind(fields)
        .bind(&record.reviewer)
        .bind(&record.comment)
        .bind(format_ts(&record.created_at))
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn delete(&self, feedback_id: &str) -> Result<bool> {
        let done = sqlx::query("DELETE FROM feedback_records WHERE feedback_id = ?")
            .bind(feedback_id)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(done.rows_affected() > 0)
    }

    async fn list_all(&self) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT feedback_id, document_id, corrected_fields, reviewer, comment, created_at \
             FROM feedback_records ORDER BY created_at, rowid",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(Self::from_row).collect()
    }

    async fn list_by_document(&self, document_id: &str) -> Result<Vec<FeedbackRecord>> {
        let rows = sqlx::query(
            "SELECT feedback_id, document_id, corrected_fields, reviewer, comment, created_at \
             FROM feedback_records WHERE document_id = ? ORDER BY created_at, rowid",
        )
        .bind(document_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(Self::from_row).collect()
    }
}
