//! Text-generation backends behind one capability: "given a prompt, return JSON-ish text".
//!
//! Two variants ship today:
//!   - `gemini::Gemini`  : structured-output backend (JSON mime type, low temperature)
//!   - `openai::OpenAI`  : reasoning backend (OpenAI-compatible chat completions, json_object mode)
//!
//! Neither retries. Retry policy belongs to whoever re-queues the request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};

use crate::config::{GenerationSettings, Prompts};

pub mod gemini;
pub mod openai;

/// Which family of model a request is routed to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BackendKind {
  /// Fast model with native JSON output.
  Structured,
  /// Slower step-by-step model, used for subjects that need worked reasoning.
  Reasoning,
}

impl BackendKind {
  pub fn as_str(self) -> &'static str {
    match self {
      BackendKind::Structured => "structured",
      BackendKind::Reasoning => "reasoning",
    }
  }
}

impl fmt::Display for BackendKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.as_str())
  }
}

/// Raw model output plus the model that produced it (kept for the audit trail).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generation {
  pub text: String,
  pub model: String,
}

#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
  #[error("model {model} returned no usable text")]
  EmptyResponse { model: String },
  #[error("model backend {model} unavailable: {message}")]
  BackendUnavailable { model: String, message: String },
}

#[async_trait]
pub trait GenerationClient: Send + Sync {
  /// Model identifier, recorded as `modelName` even when the call fails.
  fn model_name(&self) -> &str;

  /// The exact text this backend sends for `prompt`, recorded as the `prompt` audit field.
  fn rendered_prompt(&self, prompt: &str) -> String {
    prompt.to_string()
  }

  async fn generate_structured(&self, prompt: &str) -> Result<Generation, GenerationError>;
}

/// Registry of configured backends, keyed by kind.
#[derive(Clone, Default)]
pub struct Backends {
  clients: HashMap<BackendKind, Arc<dyn GenerationClient>>,
}

impl Backends {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, kind: BackendKind, client: Arc<dyn GenerationClient>) -> Self {
    self.clients.insert(kind, client);
    self
  }

  /// Build every backend whose API key is present in the environment.
  pub fn from_env(generation: &GenerationSettings, prompts: &Prompts) -> Self {
    let mut backends = Self::new();

    match gemini::Gemini::from_env(generation) {
      Some(g) => {
        info!(target: "questgen", base_url = %g.base_url, model = %g.model, "Structured backend (Gemini) enabled.");
        backends = backends.with(BackendKind::Structured, Arc::new(g));
      }
      None => warn!(target: "questgen", "Structured backend disabled (no GEMINI_API_KEY)."),
    }

    match openai::OpenAI::from_env(generation, prompts) {
      Some(o) => {
        info!(target: "questgen", base_url = %o.base_url, model = %o.model, "Reasoning backend (OpenAI-compatible) enabled.");
        backends = backends.with(BackendKind::Reasoning, Arc::new(o));
      }
      None => warn!(target: "questgen", "Reasoning backend disabled (no OPENAI_API_KEY)."),
    }

    backends
  }

  pub fn get(&self, kind: BackendKind) -> Result<Arc<dyn GenerationClient>, GenerationError> {
    self.clients.get(&kind).cloned().ok_or_else(|| GenerationError::BackendUnavailable {
      model: kind.to_string(),
      message: format!("no {kind} backend configured (missing API key?)"),
    })
  }
}

/// Try to extract a clean error message from an `{"error": {"message": ...}}` body.
/// Both the Gemini and the OpenAI APIs use that shape.
pub(crate) fn extract_api_error(body: &str) -> Option<String> {
  #[derive(Deserialize)]
  struct EWrap { error: EObj }
  #[derive(Deserialize)]
  struct EObj { message: String }
  serde_json::from_str::<EWrap>(body).ok().map(|w| w.error.message)
}
