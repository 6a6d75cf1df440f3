//! Handler tests driven through the router with an in-memory store and a
//! scripted model backend.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use jsonwebtoken::{encode, EncodingKey, Header};
use serde_json::Value;
use tower::ServiceExt;

use crate::app_state::AppState;
use crate::auth::{Claims, TokenVerifier};
use crate::db::MemoryJobStore;
use crate::services::inference::{InferenceClient, InferenceConfig};
use crate::services::mock::{Reply, ScriptedBackend};
use crate::services::orchestrator::{JobOrchestrator, OrchestratorConfig};
use crate::services::pdf::{ExtractionError, TextExtractor};

const SECRET: &[u8] = b"handler-test-secret";
const BOUNDARY: &str = "----match-analyzer-boundary";
const MAX_UPLOAD: usize = 1024 * 1024;

const VALID: &str = "Sure! Here's the analysis:\n```json\n{\"match_score\": 62, \"matched_skills\": [\"Python\"], \"missing_skills\": [\"Docker\"], \"suggestions\": [\"Add Docker experience\",\"Mention AWS\",\"Quantify impact\"]}\n```";

/// Treats the upload bytes as UTF-8 text; `SCANNED` means no text layer.
struct StubExtractor;

impl TextExtractor for StubExtractor {
    fn extract(&self, bytes: &[u8]) -> Result<String, ExtractionError> {
        let text = String::from_utf8_lossy(bytes).trim().to_string();
        if text.is_empty() || text == "SCANNED" {
            return Err(ExtractionError::NoText);
        }
        Ok(text)
    }
}

fn app(backend: ScriptedBackend) -> (Router, Arc<MemoryJobStore>) {
    let store = Arc::new(MemoryJobStore::new());
    let inference = InferenceClient::new(Arc::new(backend), InferenceConfig::default());
    let orchestrator = JobOrchestrator::new(
        store.clone(),
        inference,
        OrchestratorConfig {
            max_concurrent_jobs: 2,
        },
    );
    let state = AppState::new(
        store.clone(),
        orchestrator,
        StubExtractor,
        TokenVerifier::new(SECRET),
        MAX_UPLOAD,
    );
    (super::router(state), store)
}

fn bearer(sub: &str) -> String {
    let claims = Claims {
        sub: sub.to_string(),
        exp: (chrono::Utc::now().timestamp() + 3600) as usize,
    };
    let token = encode(&Header::default(), &claims, &EncodingKey::from_secret(SECRET)).unwrap();
    format!("Bearer {token}")
}

fn multipart_body(filename: &str, file: &[u8], job_description: Option<&str>) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"resume\"; filename=\"{filename}\"\r\nContent-Type: application/pdf\r\n\r\n"
        )
        .as_bytes(),
    );
    body.extend_from_slice(file);
    body.extend_from_slice(b"\r\n");
    if let Some(text) = job_description {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"job_description\"\r\n\r\n{text}\r\n"
            )
            .as_bytes(),
        );
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn submit_request(owner: &str, body: Vec<u8>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/analyses")
        .header(header::AUTHORIZATION, bearer(owner))
        .header(
            header::CONTENT_TYPE,
            format!("multipart/form-data; boundary={BOUNDARY}"),
        )
        .body(Body::from(body))
        .unwrap()
}

fn get_request(owner: &str, uri: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::AUTHORIZATION, bearer(owner))
        .body(Body::empty())
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

async fn submit(router: &Router, owner: &str, resume: &str, job: &str) -> String {
    let body = multipart_body("resume.pdf", resume.as_bytes(), Some(job));
    let (status, body) = send(router, submit_request(owner, body)).await;
    assert_eq!(status, StatusCode::ACCEPTED, "{body}");
    assert_eq!(body["status"], "pending");
    body["id"].as_str().unwrap().to_string()
}

async fn wait_for_terminal(router: &Router, owner: &str, id: &str) -> Value {
    for _ in 0..200 {
        let (status, body) = send(router, get_request(owner, &format!("/api/v1/analyses/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        if body["status"] == "completed" || body["status"] == "failed" {
            return body;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("analysis {id} did not finish");
}

#[tokio::test]
async fn test_submit_then_poll_until_completed() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));
    let id = submit(&router, "alice", "Python developer", "  Backend role with Docker  ").await;

    let body = wait_for_terminal(&router, "alice", &id).await;
    assert_eq!(body["status"], "completed");
    assert_eq!(body["match_score"], 62.0);
    assert_eq!(body["matched_skills"], serde_json::json!(["Python"]));
    assert_eq!(body["missing_skills"], serde_json::json!(["Docker"]));
    assert_eq!(body["suggestions"].as_array().unwrap().len(), 3);
    assert_eq!(body["job_description"], "Backend role with Docker");
    assert!(body["error_message"].is_null());
    assert!(!body["completed_at"].is_null());
}

#[tokio::test]
async fn test_failed_job_has_message_and_no_result() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text("no json here")));
    let id = submit(&router, "alice", "resume", "job").await;

    let body = wait_for_terminal(&router, "alice", &id).await;
    assert_eq!(body["status"], "failed");
    assert!(body["match_score"].is_null());
    assert!(body["suggestions"].is_null());
    assert!(body["error_message"]
        .as_str()
        .unwrap()
        .contains("Could not extract valid JSON"));
}

#[tokio::test]
async fn test_requests_without_token_are_rejected() {
    let (router, store) = app(ScriptedBackend::repeating(Reply::text(VALID)));

    let request = Request::builder()
        .uri("/api/v1/analyses")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/analyses")
        .header(header::AUTHORIZATION, "Bearer garbage")
        .body(Body::empty())
        .unwrap();
    let (status, _) = send(&router, request).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let jobs = crate::db::JobStore::list_jobs_for_owner(store.as_ref(), "alice", 10, 0)
        .await
        .unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_pre_job_validation_failures_create_nothing() {
    let (router, store) = app(ScriptedBackend::repeating(Reply::text(VALID)));

    let cases = [
        (
            multipart_body("resume.docx", b"text", Some("job")),
            StatusCode::BAD_REQUEST,
        ),
        (
            multipart_body("resume.pdf", b"SCANNED", Some("job")),
            StatusCode::UNPROCESSABLE_ENTITY,
        ),
        (
            multipart_body("resume.pdf", b"Rust engineer", Some("   ")),
            StatusCode::BAD_REQUEST,
        ),
        (
            multipart_body("resume.pdf", b"Rust engineer", None),
            StatusCode::BAD_REQUEST,
        ),
        (
            multipart_body("resume.pdf", &vec![b'a'; MAX_UPLOAD + 1], Some("job")),
            StatusCode::PAYLOAD_TOO_LARGE,
        ),
    ];

    for (body, expected) in cases {
        let (status, body) = send(&router, submit_request("alice", body)).await;
        assert_eq!(status, expected, "{body}");
        assert!(body["error"].is_string());
    }

    let jobs = crate::db::JobStore::list_jobs_for_owner(store.as_ref(), "alice", 10, 0)
        .await
        .unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn test_jobs_are_scoped_to_their_owner() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));
    let id = submit(&router, "alice", "resume", "job").await;

    let (status, _) = send(&router, get_request("bob", &format!("/api/v1/analyses/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, get_request("bob", "/api/v1/analyses")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, serde_json::json!([]));
}

#[tokio::test]
async fn test_list_returns_previews_newest_first() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));
    let long_description = "Senior platform engineer ".repeat(10);
    let first = submit(&router, "alice", "resume", "Short job").await;
    tokio::time::sleep(Duration::from_millis(5)).await;
    let second = submit(&router, "alice", "resume", &long_description).await;

    let (status, body) = send(&router, get_request("alice", "/api/v1/analyses?limit=10")).await;
    assert_eq!(status, StatusCode::OK);
    let items = body.as_array().unwrap();
    assert_eq!(items.len(), 2);
    assert_eq!(items[0]["id"], second.as_str());
    assert_eq!(items[1]["id"], first.as_str());

    let preview = items[0]["job_description_preview"].as_str().unwrap();
    assert!(preview.ends_with("..."));
    assert_eq!(preview.chars().count(), 123);
    assert_eq!(items[1]["job_description_preview"], "Short job");

    let (_, body) = send(&router, get_request("alice", "/api/v1/analyses?limit=1&offset=1")).await;
    assert_eq!(body.as_array().unwrap().len(), 1);
    assert_eq!(body[0]["id"], first.as_str());
}

#[tokio::test]
async fn test_delete_removes_job() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));
    let id = submit(&router, "alice", "resume", "job").await;
    wait_for_terminal(&router, "alice", &id).await;

    let delete = |owner: &str| {
        Request::builder()
            .method("DELETE")
            .uri(format!("/api/v1/analyses/{id}"))
            .header(header::AUTHORIZATION, bearer(owner))
            .body(Body::empty())
            .unwrap()
    };

    let (status, _) = send(&router, delete("bob")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = send(&router, delete("alice")).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert!(body.is_null());

    let (status, _) = send(&router, get_request("alice", &format!("/api/v1/analyses/{id}"))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_concurrent_submissions_from_different_owners() {
    let backend = ScriptedBackend::repeating(Reply::text(VALID))
        .with_rule("MALFORMED", Reply::text("{\"match_score\": "));
    let (router, _) = app(backend);

    let good = submit(&router, "alice", "Python developer", "job").await;
    let bad = submit(&router, "bob", "MALFORMED resume", "job").await;

    let (good, bad) = tokio::join!(
        wait_for_terminal(&router, "alice", &good),
        wait_for_terminal(&router, "bob", &bad)
    );
    assert_eq!(good["status"], "completed");
    assert_eq!(good["match_score"], 62.0);
    assert_eq!(bad["status"], "failed");
}

#[tokio::test]
async fn test_health_reports_ok() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, body) = send(&router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert_eq!(body["checks"]["database"]["status"], "ok");
}

#[tokio::test]
async fn test_malformed_parameters_get_json_errors() {
    let (router, _) = app(ScriptedBackend::repeating(Reply::text(VALID)));

    for uri in [
        "/api/v1/analyses/not-a-uuid",
        "/api/v1/analyses?offset=-1",
        "/api/v1/analyses?limit=many",
    ] {
        let (status, body) = send(&router, get_request("alice", uri)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{uri}");
        assert!(body["error"].is_string(), "{uri}: {body}");
    }

    let request = Request::builder()
        .method("DELETE")
        .uri("/api/v1/analyses/42")
        .header(header::AUTHORIZATION, bearer("alice"))
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&router, request).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}
