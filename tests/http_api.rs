use std::sync::Arc;
use std::time::Duration;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use doc_orchestrator::config::parse_config;
use doc_orchestrator::context::AppContext;
use doc_orchestrator::server;
use doc_orchestrator::testing::FakeGateway;
use doc_orchestrator_core::blob::BlobStore;
use doc_orchestrator_core::PipelineError;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const PUBLIC_URL: &str = "http://docs.test";

/// Database and blobs live under `tmp`. Blob URLs must be signed when the
/// variable named by `signing_key_env` is set.
async fn app(tmp: &TempDir, gateway: FakeGateway, signing_key_env: &str) -> (Router, Arc<AppContext>) {
    let root = tmp.path();
    let content = format!(
        r#"
[azure]
endpoint = "https://cu.example.com"
router_analyzer_id = "doc-router"

[client]
poll_interval_ms = 1

[storage]
root = "{root}/blobs"
public_url = "{public}"
signing_key_env = "{key_env}"

[db]
path = "{root}/data/docorch.sqlite"

[[categories]]
id = "invoice"
display_name = "Invoice"
analyzer_id = "invoice-extractor"
classification_prompt = "  Vendor invoices  "

[categories.extraction_schema.total]
type = "number"
"#,
        root = root.display(),
        public = PUBLIC_URL,
        key_env = signing_key_env,
    );
    let config = parse_config(&content).unwrap();
    let ctx = Arc::new(
        AppContext::with_gateway(&config, Arc::new(gateway))
            .await
            .unwrap(),
    );
    (server::router(ctx.clone()), ctx)
}

async fn unsigned_app(tmp: &TempDir, gateway: FakeGateway) -> (Router, Arc<AppContext>) {
    app(tmp, gateway, "DOCORCH_TEST_KEY_THAT_IS_NEVER_SET").await
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, body.to_vec())
}

async fn send_json(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let (status, body) = send(router, request).await;
    (status, serde_json::from_slice(&body).unwrap())
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn upload(filename: &str, bytes: &'static [u8]) -> Request<Body> {
    Request::post(format!("/api/documents/upload?filename={}", filename))
        .header(header::CONTENT_TYPE, "application/pdf")
        .body(Body::from(bytes))
        .unwrap()
}

#[tokio::test]
async fn test_health() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, body) = send_json(&router, get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["version"].is_string());
}

#[tokio::test]
async fn test_upload_returns_created() {
    let tmp = TempDir::new().unwrap();
    let (router, ctx) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, body) = send_json(&router, upload("claim.pdf", b"%PDF-1.7")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["filename"], "claim.pdf");

    let document_id = body["document_id"].as_str().unwrap();
    assert_eq!(
        body["blob_url"],
        format!("{}/blobs/{}/claim.pdf", PUBLIC_URL, document_id)
    );
    let stored = ctx
        .blobs
        .read(&format!("{}/claim.pdf", document_id))
        .await
        .unwrap();
    assert_eq!(stored.bytes, b"%PDF-1.7");
    assert_eq!(stored.content_type, "application/pdf");
}

#[tokio::test]
async fn test_upload_without_filename_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let request = Request::post("/api/documents/upload")
        .body(Body::from("x"))
        .unwrap();
    let (status, body) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_missing_result_is_not_found() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, body) = send_json(&router, get("/api/documents/nope/result")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "not_found");
    assert!(body["error"]["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn test_upload_analyze_and_read_back() {
    let tmp = TempDir::new().unwrap();
    let gateway = FakeGateway::new().with_result(json!({
        "contents": [{"category": {"id": "invoice", "confidence": 0.88}}],
        "fields": {"total": {"type": "number", "value": 42.0}}
    }));
    let (router, _) = unsigned_app(&tmp, gateway).await;

    let (_, uploaded) = send_json(&router, upload("inv.pdf", b"%PDF")).await;
    let document_id = uploaded["document_id"].as_str().unwrap().to_string();

    let (status, analyzed) = send_json(
        &router,
        post_json(
            &format!("/api/documents/{}/analyze", document_id),
            json!({"blob_url": uploaded["blob_url"]}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(analyzed["category_id"], "invoice");
    assert_eq!(analyzed["extracted_fields"]["total"], 42.0);

    let (status, stored) =
        send_json(&router, get(&format!("/api/documents/{}/result", document_id))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(stored["document_id"], document_id.as_str());
    assert_eq!(stored["category_id"], "invoice");
    assert_eq!(stored["confidence"], 0.88);
    assert_eq!(stored["extracted_fields"], analyzed["extracted_fields"]);

    let (_, listed) = send_json(&router, get("/api/results?category=invoice")).await;
    assert_eq!(listed["results"].as_array().unwrap().len(), 1);
    let (_, listed) = send_json(&router, get("/api/results?category=receipt")).await;
    assert!(listed["results"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_analyze_failure_maps_to_bad_gateway() {
    let tmp = TempDir::new().unwrap();
    let gateway = FakeGateway::new().with_error(PipelineError::AnalysisFailed {
        message: "unreadable".to_string(),
    });
    let (router, _) = unsigned_app(&tmp, gateway).await;

    let (status, body) = send_json(
        &router,
        post_json(
            "/api/documents/d1/analyze",
            json!({"blob_url": format!("{}/blobs/d1/a.pdf", PUBLIC_URL)}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(body["error"]["code"], "analysis_failed");

    let (status, _) = send_json(&router, get("/api/documents/d1/result")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_analyze_timeout_maps_to_gateway_timeout() {
    let tmp = TempDir::new().unwrap();
    let gateway = FakeGateway::new().with_error(PipelineError::PollTimeout { attempts: 300 });
    let (router, _) = unsigned_app(&tmp, gateway).await;

    let (status, body) = send_json(
        &router,
        post_json("/api/documents/d1/analyze", json!({"blob_url": "x"})),
    )
    .await;
    assert_eq!(status, StatusCode::GATEWAY_TIMEOUT);
    assert_eq!(body["error"]["code"], "timeout");
}

#[tokio::test]
async fn test_analyze_requires_blob_url() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, body) =
        send_json(&router, post_json("/api/documents/d1/analyze", json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_feedback_submit_and_list() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, created) = send_json(
        &router,
        post_json(
            "/api/documents/d1/feedback",
            json!({"corrected_fields": {"total": 99.5}, "reviewer": "ana"}),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["document_id"], "d1");
    assert!(created["feedback_id"].is_string());

    let (status, listed) = send_json(&router, get("/api/documents/d1/feedback")).await;
    assert_eq!(status, StatusCode::OK);
    let feedback = listed["feedback"].as_array().unwrap();
    assert_eq!(feedback.len(), 1);
    assert_eq!(feedback[0]["feedback_id"], created["feedback_id"]);
    assert_eq!(feedback[0]["corrected_fields"]["total"], 99.5);
    assert_eq!(feedback[0]["reviewer"], "ana");
}

#[tokio::test]
async fn test_empty_feedback_is_bad_request() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, body) = send_json(
        &router,
        post_json("/api/documents/d1/feedback", json!({"corrected_fields": {}})),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "bad_request");
}

#[tokio::test]
async fn test_config_and_setup_analyzers() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, config) = send_json(&router, get("/api/config")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(config["azure"]["router_analyzer_id"], "doc-router");
    assert_eq!(config["categories"][0]["classification_prompt"], "Vendor invoices");

    let request = Request::post("/api/config/setup-analyzers")
        .body(Body::empty())
        .unwrap();
    let (status, report) = send_json(&router, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["router_analyzer_id"], "doc-router");
    assert_eq!(report["category_analyzer_ids"], json!(["invoice-extractor"]));
}

#[tokio::test]
async fn test_unsigned_blob_is_served() {
    let tmp = TempDir::new().unwrap();
    let (router, _) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (_, uploaded) = send_json(&router, upload("a.pdf", b"%PDF-data")).await;
    let path = uploaded["blob_url"]
        .as_str()
        .unwrap()
        .strip_prefix(PUBLIC_URL)
        .unwrap()
        .to_string();

    let response = router.clone().oneshot(get(&path)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/pdf"
    );
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&body[..], b"%PDF-data");

    let (status, _) = send(&router, get("/blobs/missing/file.pdf")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_signed_blob_access() {
    let tmp = TempDir::new().unwrap();
    // PATH is always set, so its value serves as a signing key.
    let (router, ctx) = app(&tmp, FakeGateway::new(), "PATH").await;
    assert!(ctx.blobs.requires_signature());

    let (_, uploaded) = send_json(&router, upload("a.pdf", b"%PDF")).await;
    let name = format!("{}/a.pdf", uploaded["document_id"].as_str().unwrap());

    let (status, body) = send_json(&router, get(&format!("/blobs/{}", name))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"]["code"], "forbidden");

    let (status, _) = send(
        &router,
        get(&format!("/blobs/{}?expires=9999999999&sig=deadbeef", name)),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let signed = ctx
        .blobs
        .temporary_access_url(&name, Duration::from_secs(60))
        .await
        .unwrap();
    let path = signed.strip_prefix(PUBLIC_URL).unwrap();
    let (status, body) = send(&router, get(path)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF");
}

#[tokio::test]
async fn test_blob_with_reserved_characters_is_served() {
    let tmp = TempDir::new().unwrap();
    let (router, ctx) = unsigned_app(&tmp, FakeGateway::new()).await;

    let (status, uploaded) = send_json(&router, upload("what%3F%20now%231.pdf", b"%PDF-odd")).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(uploaded["filename"], "what? now#1.pdf");

    let document_id = uploaded["document_id"].as_str().unwrap();
    let blob_url = uploaded["blob_url"].as_str().unwrap();
    assert_eq!(
        blob_url,
        format!("{}/blobs/{}/what%3F%20now%231.pdf", PUBLIC_URL, document_id)
    );

    let name = ctx.blobs.blob_name_for(blob_url);
    assert_eq!(name, format!("{}/what? now#1.pdf", document_id));
    assert!(ctx.blobs.exists(&name).await.unwrap());

    let path = blob_url.strip_prefix(PUBLIC_URL).unwrap();
    let (status, body) = send(&router, get(path)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, b"%PDF-odd");
}
