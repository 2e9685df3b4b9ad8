//! JSON HTTP API.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/api/documents/upload?filename=NAME` | Store the raw request body as a new document |
//! | `POST` | `/api/documents/{id}/analyze` | Analyze a stored document (`{"blob_url": ...}`) |
//! | `GET`  | `/api/documents/{id}/result` | Stored analysis result |
//! | `POST` | `/api/documents/{id}/feedback` | Record reviewer corrections |
//! | `GET`  | `/api/documents/{id}/feedback` | All corrections for a document |
//! | `GET`  | `/api/results?category=ID` | List stored results |
//! | `GET`  | `/api/config` | Current pipeline configuration |
//! | `POST` | `/api/config/setup-analyzers` | Provision router and category analyzers |
//! | `GET`  | `/blobs/{*name}` | Serve a stored document (signed URL when a key is configured) |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "not_found", "message": "analysis result not found: 3f2c..." } }
//! ```
//!
//! | Code | Status |
//! |------|--------|
//! | `bad_request` | 400 |
//! | `forbidden` | 403 |
//! | `not_found` | 404 |
//! | `configuration` | 500 |
//! | `internal` | 500 |
//! | `analysis_failed` | 502 |
//! | `provider_error` | 502 |
//! | `timeout` | 504 |

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use doc_orchestrator_core::blob::BlobStore;
use doc_orchestrator_core::{AnalysisResult, FeedbackRecord, FieldMap, PipelineError};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::context::AppContext;
use crate::provision::ProvisionReport;

const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    ctx: Arc<AppContext>,
}

/// Build the API router over an application context.
pub fn router(ctx: Arc<AppContext>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/documents/upload", post(handle_upload))
        .route("/api/documents/{id}/analyze", post(handle_analyze))
        .route("/api/documents/{id}/result", get(handle_get_result))
        .route(
            "/api/documents/{id}/feedback",
            post(handle_submit_feedback).get(handle_get_feedback),
        )
        .route("/api/results", get(handle_list_results))
        .route("/api/config", get(handle_get_config))
        .route("/api/config/setup-analyzers", post(handle_setup_analyzers))
        .route("/blobs/{*name}", get(handle_get_blob))
        .route("/health", get(handle_health))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(AppState { ctx })
}

/// Bind to `[server].bind` and serve until the process is terminated.
pub async fn run_server(ctx: Arc<AppContext>) -> anyhow::Result<()> {
    let bind_addr = ctx.config.server.bind.clone();
    let app = router(ctx);

    tracing::info!(bind = %bind_addr, "HTTP API listening");
    println!("Document orchestrator listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::BAD_REQUEST, "bad_request", message)
}

fn forbidden(message: impl Into<String>) -> AppError {
    AppError::new(StatusCode::FORBIDDEN, "forbidden", message)
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code.to_string(),
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        let (status, code) = match &err {
            PipelineError::Validation(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            PipelineError::NotFound { .. } => (StatusCode::NOT_FOUND, "not_found"),
            PipelineError::PollTimeout { .. } => (StatusCode::GATEWAY_TIMEOUT, "timeout"),
            PipelineError::AnalysisFailed { .. } => (StatusCode::BAD_GATEWAY, "analysis_failed"),
            PipelineError::ProviderProtocol(_) | PipelineError::Transport(_) => {
                (StatusCode::BAD_GATEWAY, "provider_error")
            }
            PipelineError::Configuration(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "configuration")
            }
            PipelineError::Storage(_) | PipelineError::Serialization(_) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };
        if status.is_server_error() {
            tracing::warn!(code, error = %err, "request failed");
        }
        AppError::new(status, code, err.to_string())
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /api/documents/upload ============

#[derive(Deserialize)]
struct UploadParams {
    filename: Option<String>,
}

#[derive(Serialize)]
struct UploadResponse {
    document_id: String,
    blob_url: String,
    filename: String,
}

/// The request body is the file itself; its `Content-Type` is stored with it.
async fn handle_upload(
    State(state): State<AppState>,
    Query(params): Query<UploadParams>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    let filename = params
        .filename
        .filter(|f| !f.trim().is_empty())
        .ok_or_else(|| bad_request("filename query parameter is required"))?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");

    let uploaded = state
        .ctx
        .service
        .upload_document(&filename, &body, content_type)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(UploadResponse {
            document_id: uploaded.document_id,
            blob_url: uploaded.blob_url,
            filename,
        }),
    ))
}

// ============ POST /api/documents/{id}/analyze ============

#[derive(Deserialize)]
struct AnalyzeRequest {
    blob_url: Option<String>,
}

async fn handle_analyze(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Json(req): Json<AnalyzeRequest>,
) -> Result<Json<AnalysisResult>, AppError> {
    let blob_url = req
        .blob_url
        .ok_or_else(|| bad_request("blob_url is required"))?;
    let result = state
        .ctx
        .service
        .analyze_document(&document_id, &blob_url)
        .await?;
    Ok(Json(result))
}

// ============ GET /api/documents/{id}/result ============

async fn handle_get_result(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<AnalysisResult>, AppError> {
    state
        .ctx
        .service
        .get_result(&document_id)
        .await?
        .map(Json)
        .ok_or_else(|| PipelineError::not_found("analysis result", document_id).into())
}

// ============ /api/documents/{id}/feedback ============

#[derive(Deserialize)]
struct FeedbackRequest {
    #[serde(default)]
    corrected_fields: FieldMap,
    reviewer: Option<String>,
    comment: Option<String>,
}

#[derive(Serialize)]
struct FeedbackCreated {
    feedback_id: String,
    document_id: String,
    created_at: DateTime<Utc>,
}

async fn handle_submit_feedback(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
    Json(req): Json<FeedbackRequest>,
) -> Result<(StatusCode, Json<FeedbackCreated>), AppError> {
    let record = state
        .ctx
        .service
        .submit_feedback(&document_id, req.corrected_fields, req.reviewer, req.comment)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(FeedbackCreated {
            feedback_id: record.feedback_id,
            document_id: record.document_id,
            created_at: record.created_at,
        }),
    ))
}

#[derive(Serialize)]
struct FeedbackList {
    feedback: Vec<FeedbackRecord>,
}

async fn handle_get_feedback(
    State(state): State<AppState>,
    Path(document_id): Path<String>,
) -> Result<Json<FeedbackList>, AppError> {
    let feedback = state.ctx.service.get_feedback(&document_id).await?;
    Ok(Json(FeedbackList { feedback }))
}

// ============ GET /api/results ============

#[derive(Deserialize)]
struct ResultsQuery {
    category: Option<String>,
}

#[derive(Serialize)]
struct ResultList {
    results: Vec<AnalysisResult>,
}

async fn handle_list_results(
    State(state): State<AppState>,
    Query(query): Query<ResultsQuery>,
) -> Result<Json<ResultList>, AppError> {
    let results = state
        .ctx
        .service
        .list_results(query.category.as_deref())
        .await?;
    Ok(Json(ResultList { results }))
}

// ============ /api/config ============

async fn handle_get_config(State(state): State<AppState>) -> Response {
    Json(state.ctx.pipeline.as_ref()).into_response()
}

async fn handle_setup_analyzers(
    State(state): State<AppState>,
) -> Result<Json<ProvisionReport>, AppError> {
    let report = state.ctx.provisioner.setup_all(&state.ctx.pipeline).await?;
    Ok(Json(report))
}

// ============ GET /blobs/{*name} ============

#[derive(Deserialize)]
struct BlobAccess {
    expires: Option<i64>,
    sig: Option<String>,
}

async fn handle_get_blob(
    State(state): State<AppState>,
    Path(name): Path<String>,
    Query(access): Query<BlobAccess>,
) -> Result<Response, AppError> {
    let blobs = &state.ctx.blobs;
    if blobs.requires_signature() {
        let (Some(expires), Some(sig)) = (access.expires, access.sig.as_deref()) else {
            return Err(forbidden("signed URL required"));
        };
        if !blobs.verify_access(&name, expires, sig, Utc::now()) {
            return Err(forbidden("invalid or expired signature"));
        }
    }

    let object = blobs.read(&name).await?;
    Ok(([(header::CONTENT_TYPE, object.content_type)], object.bytes).into_response())
}
