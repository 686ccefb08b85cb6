//! Domain models: request documents, their status machine, and generated questions.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of a generation request document.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
  /// Waiting for the trigger. The only status the lifecycle acts on.
  Pending,
  /// Model output validated; question records are being written.
  Received,
  Completed,
  Error,
}

impl RequestStatus {
  pub fn as_str(self) -> &'static str {
    match self {
      RequestStatus::Pending => "pending",
      RequestStatus::Received => "received",
      RequestStatus::Completed => "completed",
      RequestStatus::Error => "error",
    }
  }

  pub fn is_terminal(self) -> bool {
    matches!(self, RequestStatus::Completed | RequestStatus::Error)
  }
}

impl fmt::Display for RequestStatus {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// A request for a batch of exam questions, plus the audit trail of the last attempt.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestRecord {
  pub id: String,
  pub subject: String,
  pub syllabus: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub topic: Option<String>,
  pub status: RequestStatus,

  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub prompt: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub response: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub model_name: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub question_count: Option<usize>,

  pub timestamp: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}

impl RequestRecord {
  /// A fresh `pending` request. Empty topics are treated as absent.
  pub fn new_pending(subject: impl Into<String>, syllabus: impl Into<String>, topic: Option<String>) -> Self {
    let now = Utc::now();
    Self {
      id: Uuid::new_v4().to_string(),
      subject: subject.into(),
      syllabus: syllabus.into(),
      topic: topic.filter(|t| !t.trim().is_empty()),
      status: RequestStatus::Pending,
      error: None,
      prompt: None,
      response: None,
      model_name: None,
      question_count: None,
      timestamp: now,
      updated_at: now,
    }
  }
}

/// Partial update of a request document. `None` fields are left untouched.
#[derive(Clone, Debug, Default)]
pub struct RequestPatch {
  pub status: Option<RequestStatus>,
  pub error: Option<String>,
  /// Removes a previous `error` message.
  pub clear_error: bool,
  /// Removes `prompt`, `response`, `modelName` and `questionCount` left by an
  /// earlier attempt. Applied before the fields set in the same patch.
  pub clear_audit: bool,
  pub prompt: Option<String>,
  pub response: Option<String>,
  pub model_name: Option<String>,
  pub question_count: Option<usize>,
}

impl RequestPatch {
  pub fn status(status: RequestStatus) -> Self {
    Self { status: Some(status), ..Default::default() }
  }

  /// What an external actor writes to put an `error` request back in the queue.
  pub fn requeue() -> Self {
    Self { status: Some(RequestStatus::Pending), clear_error: true, ..Default::default() }
  }

  pub fn apply(self, rec: &mut RequestRecord) {
    if let Some(s) = self.status { rec.status = s; }
    if self.clear_error { rec.error = None; }
    if self.clear_audit {
      rec.prompt = None;
      rec.response = None;
      rec.model_name = None;
      rec.question_count = None;
    }
    if let Some(e) = self.error { rec.error = Some(e); }
    if let Some(p) = self.prompt { rec.prompt = Some(p); }
    if let Some(r) = self.response { rec.response = Some(r); }
    if let Some(m) = self.model_name { rec.model_name = Some(m); }
    if let Some(n) = self.question_count { rec.question_count = Some(n); }
    rec.updated_at = Utc::now();
  }
}

/// One validated question as produced by the model, before it is tied to a request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GeneratedQuestion {
  pub question: String,
  /// MCQ, Short Answer, Structured, Application. Kept as the model wrote it.
  pub kind: String,
  pub explanation: String,
  pub correct_answer: String,
  pub topics: Vec<String>,
  pub mcq_choices: Option<Vec<String>>,
}

impl GeneratedQuestion {
  pub fn is_mcq(&self) -> bool {
    self.kind.trim().eq_ignore_ascii_case("mcq")
  }
}

/// A persisted question. Written once, never mutated by this service.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRecord {
  pub id: String,
  pub question: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub explanation: String,
  pub correct_answer: String,
  pub subject: String,
  pub syllabus: String,
  /// Id of the originating request document.
  pub request: String,
  pub topics: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub mcq_choices: Option<Vec<String>>,
  pub timestamp: DateTime<Utc>,
}

impl QuestionRecord {
  pub fn from_generated(q: GeneratedQuestion, req: &RequestRecord) -> Self {
    Self {
      id: Uuid::new_v4().to_string(),
      question: q.question,
      kind: q.kind,
      explanation: q.explanation,
      correct_answer: q.correct_answer,
      subject: req.subject.clone(),
      syllabus: req.syllabus.clone(),
      request: req.id.clone(),
      topics: q.topics,
      mcq_choices: q.mcq_choices,
      timestamp: Utc::now(),
    }
  }
}
