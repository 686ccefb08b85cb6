//! HTTP request/response DTOs (serde ready).
//! Request and question documents are served as-is; only inputs and envelopes live here.

use serde::{Deserialize, Serialize};

use crate::domain::QuestionRecord;

#[derive(Debug, Deserialize)]
pub struct CreateRequestIn {
  pub subject: String,
  pub syllabus: String,
  #[serde(default)]
  pub topic: Option<String>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionsOut {
  pub request_id: String,
  pub count: usize,
  pub questions: Vec<QuestionRecord>,
}

#[derive(Serialize)]
pub struct HealthOut {
  pub ok: bool,
  /// Backend kinds that have credentials configured.
  pub backends: Vec<&'static str>,
}

/// Error envelope: `{"error": {"code": "...", "message": "..."}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
  pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
  pub code: &'static str,
  pub message: String,
}
