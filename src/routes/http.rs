//! HTTP endpoint handlers. These only read and write documents; generation runs
//! off the write trigger. Each handler is instrumented with its parameters.

use std::sync::Arc;

use axum::{
  extract::{Path, State},
  http::StatusCode,
  response::{IntoResponse, Response},
  Json,
};
use tracing::{error, info, instrument};

use crate::domain::{RequestPatch, RequestRecord, RequestStatus};
use crate::protocol::*;
use crate::state::AppState;
use crate::store::StoreError;

/// API-level errors with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  #[error("Invalid request: {0}")]
  BadRequest(String),
  #[error("Not found: {0}")]
  NotFound(String),
  #[error("Conflict: {0}")]
  Conflict(String),
  #[error("Internal error: {0}")]
  Internal(String),
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let (status, code, message) = match self {
      ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", m),
      ApiError::NotFound(m) => (StatusCode::NOT_FOUND, "NOT_FOUND", m),
      ApiError::Conflict(m) => (StatusCode::CONFLICT, "CONFLICT", m),
      ApiError::Internal(detail) => {
        error!(target: "questgen", %detail, "API internal error");
        (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", "An internal error occurred".to_string())
      }
    };
    (status, Json(ErrorBody { error: ErrorDetail { code, message } })).into_response()
  }
}

impl From<StoreError> for ApiError {
  fn from(err: StoreError) -> Self {
    match err {
      StoreError::NotFound { .. } => ApiError::NotFound(err.to_string()),
      StoreError::AlreadyExists { .. } => ApiError::Conflict(err.to_string()),
      StoreError::Unavailable(_) => ApiError::Internal(err.to_string()),
    }
  }
}

#[instrument(level = "info", skip(state))]
pub async fn http_health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
  Json(HealthOut { ok: true, backends: state.backends.iter().map(|k| k.as_str()).collect() })
}

#[instrument(level = "info", skip(state, body), fields(subject = %body.subject, syllabus = %body.syllabus, topic = ?body.topic))]
pub async fn http_create_request(
  State(state): State<Arc<AppState>>,
  Json(body): Json<CreateRequestIn>,
) -> Result<(StatusCode, Json<RequestRecord>), ApiError> {
  let subject = body.subject.trim();
  let syllabus = body.syllabus.trim();
  if subject.is_empty() || syllabus.is_empty() {
    return Err(ApiError::BadRequest("subject and syllabus must be non-empty".into()));
  }
  let topic = body.topic.map(|t| t.trim().to_string());
  let rec = state.store.create_request(RequestRecord::new_pending(subject, syllabus, topic)).await?;
  info!(target: "questgen", id = %rec.id, "HTTP request queued");
  Ok((StatusCode::CREATED, Json(rec)))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_request(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<RequestRecord>, ApiError> {
  Ok(Json(state.store.get_request(&id).await?))
}

/// Put a failed request back to `pending`; the write fires a new attempt.
#[instrument(level = "info", skip(state))]
pub async fn http_retry_request(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<RequestRecord>, ApiError> {
  let current = state.store.get_request(&id).await?;
  if current.status != RequestStatus::Error {
    return Err(ApiError::Conflict(format!(
      "request {id} is {}; only failed requests can be retried",
      current.status
    )));
  }
  let rec = state.store.update_request(&id, RequestPatch::requeue()).await?;
  info!(target: "questgen", %id, "HTTP request re-queued");
  Ok(Json(rec))
}

/// Questions for a request. Failed attempts are not rolled back, so after a retry
/// `count` can exceed the request's `questionCount`; group by `timestamp` if needed.
#[instrument(level = "info", skip(state))]
pub async fn http_list_questions(
  State(state): State<Arc<AppState>>,
  Path(id): Path<String>,
) -> Result<Json<QuestionsOut>, ApiError> {
  // 404 for unknown requests rather than an empty list.
  state.store.get_request(&id).await?;
  let questions = state.store.questions_for_request(&id).await?;
  Ok(Json(QuestionsOut { request_id: id, count: questions.len(), questions }))
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::body::{to_bytes, Body};
  use axum::http::Request;
  use axum::Router;
  use serde_json::{json, Value};
  use tower::ServiceExt;

  use crate::backends::Backends;
  use crate::config::AppConfig;
  use crate::domain::{GeneratedQuestion, QuestionRecord};
  use crate::routes::build_router;
  use crate::store::{DocumentStore, MemoryStore};

  /// Router without a trigger loop, so created requests stay `pending`.
  fn app() -> (Router, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    let state = AppState::from_parts(store.clone(), &AppConfig::default(), Backends::new());
    (build_router(Arc::new(state)), store)
  }

  async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let mut req = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        req = req.header("content-type", "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };
    let resp = app.clone().oneshot(req.body(body).expect("request")).await.expect("response");
    let status = resp.status();
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.expect("body");
    let json = if bytes.is_empty() { Value::Null } else { serde_json::from_slice(&bytes).expect("json") };
    (status, json)
  }

  #[tokio::test]
  async fn health_lists_configured_backends() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/v1/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"ok": true, "backends": []}));
  }

  #[tokio::test]
  async fn create_then_fetch_request() {
    let (app, _) = app();
    let (status, created) = send(&app, "POST", "/api/v1/requests", Some(json!({
      "subject": " Physics ", "syllabus": "Singapore GCE O-Level", "topic": "Kinematics"
    }))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["status"], "pending");
    assert_eq!(created["subject"], "Physics");
    assert_eq!(created["topic"], "Kinematics");

    let id = created["id"].as_str().expect("id");
    let (status, fetched) = send(&app, "GET", &format!("/api/v1/requests/{id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["id"], id);
  }

  #[tokio::test]
  async fn blank_subject_is_rejected() {
    let (app, _) = app();
    let (status, body) = send(&app, "POST", "/api/v1/requests", Some(json!({
      "subject": "  ", "syllabus": "IB"
    }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");
  }

  #[tokio::test]
  async fn unknown_request_is_404() {
    let (app, _) = app();
    let (status, body) = send(&app, "GET", "/api/v1/requests/nope", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    let (status, _) = send(&app, "GET", "/api/v1/requests/nope/questions", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn retry_only_from_error() {
    let (app, store) = app();
    let rec = store.create_request(RequestRecord::new_pending("Physics", "IB", None)).await.expect("create");
    let uri = format!("/api/v1/requests/{}/retry", rec.id);

    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");

    store
      .update_request(&rec.id, RequestPatch { error: Some("boom".into()), ..RequestPatch::status(RequestStatus::Error) })
      .await
      .expect("fail");
    let (status, body) = send(&app, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "pending");
    assert!(body.get("error").is_none());
  }

  #[tokio::test]
  async fn questions_are_listed_for_their_request() {
    let (app, store) = app();
    let rec = store.create_request(RequestRecord::new_pending("Chemistry", "IB", None)).await.expect("create");
    let q = GeneratedQuestion {
      question: "What is a mole?".into(),
      kind: "Short Answer".into(),
      explanation: "Amount of substance.".into(),
      correct_answer: "6.022e23 particles".into(),
      topics: vec!["Stoichiometry".into()],
      mcq_choices: None,
    };
    store.create_question(QuestionRecord::from_generated(q, &rec)).await.expect("question");

    let (status, body) = send(&app, "GET", &format!("/api/v1/requests/{}/questions", rec.id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["requestId"], rec.id.as_str());
    assert_eq!(body["count"], 1);
    assert_eq!(body["questions"][0]["type"], "Short Answer");
    assert_eq!(body["questions"][0]["correctAnswer"], "6.022e23 particles");
  }

  #[test]
  fn store_errors_map_to_api_errors() {
    let nf: ApiError = StoreError::NotFound { collection: "questions", id: "x".into() }.into();
    assert!(matches!(nf, ApiError::NotFound(_)));
    let down: ApiError = StoreError::Unavailable("disk".into()).into();
    assert_eq!(down.into_response().status(), StatusCode::INTERNAL_SERVER_ERROR);
  }
}
