//! Document commands: `process`, `result`, and `feedback`.

use std::path::Path;

use anyhow::{bail, Context, Result};
use doc_orchestrator_core::models::field_map_from_json;
use doc_orchestrator_core::store::ResultRepository;
use doc_orchestrator_core::FieldMap;

use crate::config::Config;
use crate::context::AppContext;
use crate::db;
use crate::migrate;
use crate::service::record_feedback;
use crate::sqlite_store::{SqliteFeedbackRepository, SqliteResultRepository};

/// Content type for a file, from its extension.
pub fn guess_content_type(path: &Path) -> String {
    mime_guess::from_path(path)
        .first_or_octet_stream()
        .essence_str()
        .to_string()
}

/// Upload a local file and analyze it, printing the stored result.
pub async fn run_process(ctx: &AppContext, path: &Path, content_type: Option<&str>) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let filename = path
        .file_name()
        .and_then(|n| n.to_str())
        .with_context(|| format!("Not a file path: {}", path.display()))?;
    let content_type = content_type
        .map(str::to_string)
        .unwrap_or_else(|| guess_content_type(path));

    let uploaded = ctx
        .service
        .upload_document(filename, &bytes, &content_type)
        .await?;
    println!("Uploaded {} as {}", filename, uploaded.document_id);

    let result = ctx
        .service
        .analyze_document(&uploaded.document_id, &uploaded.blob_url)
        .await?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}

/// Print the stored result for a document. Reads the database only.
pub async fn run_result(config: &Config, document_id: &str) -> Result<()> {
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let repo = SqliteResultRepository::new(pool.clone());
    let result = repo.get(document_id).await?;
    pool.close().await;

    match result {
        Some(result) => println!("{}", serde_json::to_string_pretty(&result)?),
        None => bail!("no analysis result for document {}", document_id),
    }
    Ok(())
}

/// Parse the `--fields` argument: a JSON object of corrected values.
pub fn parse_corrected_fields(raw: &str) -> Result<FieldMap> {
    let value: serde_json::Value =
        serde_json::from_str(raw).with_context(|| "--fields must be valid JSON")?;
    match value {
        serde_json::Value::Object(map) => Ok(field_map_from_json(map)),
        _ => bail!("--fields must be a JSON object"),
    }
}

/// Record reviewer corrections. Reads and writes the database only.
pub async fn run_feedback(
    config: &Config,
    document_id: &str,
    fields: &str,
    reviewer: Option<String>,
    comment: Option<String>,
) -> Result<()> {
    let corrected = parse_corrected_fields(fields)?;
    let pool = db::connect(config).await?;
    migrate::run_migrations(&pool).await?;
    let repo = SqliteFeedbackRepository::new(pool.clone());
    let record = record_feedback(&repo, document_id, corrected, reviewer, comment).await;
    pool.close().await;
    let record = record?;
    println!(
        "Recorded feedback {} for document {}",
        record.feedback_id, record.document_id
    );
    Ok(())
}
