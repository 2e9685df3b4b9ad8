use anyhow::Result;
use sqlx::SqlitePool;

/// Create the result and feedback tables. Safe to run repeatedly.
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    // One row per document; re-analysis overwrites it
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_results (
            document_id TEXT PRIMARY KEY,
            category_id TEXT,
            extracted_fields TEXT NOT NULL DEFAULT '{}',
            confidence REAL,
            analyzed_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Append-only reviewer corrections
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS feedback_records (
            feedback_id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            corrected_fields TEXT NOT NULL DEFAULT '{}',
            reviewer TEXT,
            comment TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_feedback_document_id ON feedback_records(document_id)",
    )
    .execute(pool)
    .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_results_category_id ON analysis_results(category_id)",
    )
    .execute(pool)
    .await?;

    Ok(())
}
