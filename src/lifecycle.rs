//! The request state machine: `pending → received → completed | error`.
//!
//! One call to `handle_write` is one processing attempt. Anything that goes wrong
//! inside the attempt ends as `status = error` with a readable message; nothing
//! escapes to the caller, because the trigger that calls us has nobody waiting.
//!
//! Only `pending` documents are processed. Our own status writes fire the trigger
//! again, and the guard turns those re-fires into no-ops.

use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, instrument, warn};

use crate::backends::{Backends, GenerationError};
use crate::config::AppConfig;
use crate::domain::{QuestionRecord, RequestPatch, RequestRecord, RequestStatus};
use crate::normalize::normalize;
use crate::prompt::PromptBuilder;
use crate::router::ModelRouter;
use crate::store::{DocumentStore, StoreError};
use crate::syllabus::SyllabusResolver;
use crate::util::trunc_for_log;
use crate::validate::{validate_questions, ValidationError, ValidationProfile};

#[derive(Debug, thiserror::Error)]
pub enum LifecycleError {
  #[error(transparent)]
  Generation(#[from] GenerationError),
  #[error(transparent)]
  Validation(#[from] ValidationError),
  #[error("persistence failure: {0}")]
  Persistence(#[from] StoreError),
  #[error("persistence failure: {failed} of {total} question records could not be written (first error: {first})")]
  QuestionBatch { failed: usize, total: usize, first: StoreError },
  #[error("model returned an empty \"questions\" array")]
  NoQuestions,
}

/// What one trigger firing did. Returned for callers and tests; the document is the
/// source of truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
  /// Status was not `pending`; nothing was called or written.
  Skipped { status: RequestStatus },
  Completed { question_count: usize },
  /// The request was moved to `error` with this message.
  Failed { message: String },
  /// The request could not be read, or the terminal update itself failed.
  Unrecorded { message: String },
}

/// Audit fields gathered while the attempt runs, written with the terminal status.
#[derive(Default)]
struct Audit {
  prompt: Option<String>,
  response: Option<String>,
  model_name: Option<String>,
}

pub struct RequestLifecycle {
  store: Arc<dyn DocumentStore>,
  syllabus: SyllabusResolver,
  prompts: PromptBuilder,
  router: ModelRouter,
  backends: Backends,
  profile: ValidationProfile,
}

impl RequestLifecycle {
  pub fn new(
    store: Arc<dyn DocumentStore>,
    syllabus: SyllabusResolver,
    prompts: PromptBuilder,
    router: ModelRouter,
    backends: Backends,
    profile: ValidationProfile,
  ) -> Self {
    Self { store, syllabus, prompts, router, backends, profile }
  }

  pub fn from_config(store: Arc<dyn DocumentStore>, cfg: &AppConfig, backends: Backends) -> Self {
    Self::new(
      store,
      SyllabusResolver::new(&cfg.syllabus),
      PromptBuilder::new(&cfg.prompts, &cfg.generation),
      ModelRouter::from_settings(&cfg.routing),
      backends,
      ValidationProfile::from_settings(&cfg.generation),
    )
  }

  /// Handle one "request document written" event.
  #[instrument(level = "info", skip_all, fields(%request_id))]
  pub async fn handle_write(&self, request_id: &str) -> Outcome {
    let req = match self.store.get_request(request_id).await {
      Ok(r) => r,
      Err(e) => {
        error!(target: "lifecycle", error = %e, "Could not read request");
        return Outcome::Unrecorded { message: e.to_string() };
      }
    };

    if req.status != RequestStatus::Pending {
      debug!(target: "lifecycle", status = %req.status, terminal = req.status.is_terminal(), "Not pending; ignoring write");
      return Outcome::Skipped { status: req.status };
    }

    info!(target: "lifecycle", subject = %req.subject, syllabus = %req.syllabus, topic = ?req.topic, "Processing request");
    let mut audit = Audit::default();
    let result = self.attempt(&req, &mut audit).await;

    let (patch, outcome) = match result {
      // The `received` checkpoint already wrote this attempt's audit fields.
      Ok(n) => (
        RequestPatch { clear_error: true, question_count: Some(n), ..RequestPatch::status(RequestStatus::Completed) },
        Outcome::Completed { question_count: n },
      ),
      Err(e) => {
        let message = e.to_string();
        warn!(target: "lifecycle", error = %message, "Attempt failed");
        (
          // Only what this attempt produced survives; older audit fields are cleared.
          RequestPatch {
            error: Some(message.clone()),
            clear_audit: true,
            prompt: audit.prompt,
            response: audit.response,
            model_name: audit.model_name,
            ..RequestPatch::status(RequestStatus::Error)
          },
          Outcome::Failed { message },
        )
      }
    };

    match self.store.update_request(&req.id, patch).await {
      Ok(rec) => {
        info!(target: "lifecycle", status = %rec.status, question_count = ?rec.question_count, "Request finished");
        outcome
      }
      Err(e) => {
        error!(target: "lifecycle", error = %e, ?outcome, "Terminal status update failed; request left unfinished");
        Outcome::Unrecorded { message: e.to_string() }
      }
    }
  }

  async fn attempt(&self, req: &RequestRecord, audit: &mut Audit) -> Result<usize, LifecycleError> {
    let reference = self.syllabus.resolve(&req.syllabus, &req.subject).await;
    let prompt = self.prompts.build(&req.subject, &req.syllabus, req.topic.as_deref(), &reference);
    audit.prompt = Some(prompt.clone());

    let kind = self.router.select(&req.subject);
    let client = self.backends.get(kind)?;
    audit.model_name = Some(client.model_name().to_string());
    let sent_prompt = client.rendered_prompt(&prompt);
    audit.prompt = Some(sent_prompt.clone());

    let generation = client.generate_structured(&prompt).await?;
    debug!(target: "lifecycle", backend = %kind, model = %generation.model, response = %trunc_for_log(&generation.text, 300), "Model responded");
    audit.model_name = Some(generation.model.clone());
    audit.response = Some(generation.text.clone());

    let questions = validate_questions(&normalize(&generation.text), self.profile)?;
    if questions.is_empty() {
      return Err(LifecycleError::NoQuestions);
    }
    if questions.len() != self.prompts.question_count() {
      warn!(target: "lifecycle", expected = self.prompts.question_count(), got = questions.len(), "Question count differs from the requested count");
    }

    // Checkpoint before writing questions, so a failed batch still leaves the audit trail.
    self.store
      .update_request(&req.id, RequestPatch {
        clear_error: true,
        clear_audit: true,
        prompt: Some(sent_prompt),
        response: Some(generation.text),
        model_name: Some(generation.model),
        ..RequestPatch::status(RequestStatus::Received)
      })
      .await?;

    let total = questions.len();
    let writes = questions
      .into_iter()
      .map(|q| self.store.create_question(QuestionRecord::from_generated(q, req)));
    let results = join_all(writes).await;

    let mut errors = results.into_iter().filter_map(Result::err);
    if let Some(first) = errors.next() {
      let failed = 1 + errors.count();
      return Err(LifecycleError::QuestionBatch { failed, total, first });
    }
    Ok(total)
  }
}
