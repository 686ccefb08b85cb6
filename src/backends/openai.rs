//! Reasoning backend: OpenAI-compatible chat.completions in `json_object` mode.
//!
//! The whole instruction goes out as a single system message. Reasoning models
//! reject `temperature`, so it is never sent; `reasoning_effort` is optional.
//! Calls log model names, latencies and response sizes (not contents).
//!
//! NOTE: We never log the API key.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{extract_api_error, Generation, GenerationClient, GenerationError};
use crate::config::{GenerationSettings, Prompts};

#[derive(Clone)]
pub struct OpenAI {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub system_preamble: String,
  pub max_completion_tokens: u32,
  pub reasoning_effort: Option<String>,
}

impl OpenAI {
  /// Construct the client if we find OPENAI_API_KEY; otherwise return None.
  pub fn from_env(generation: &GenerationSettings, prompts: &Prompts) -> Option<Self> {
    let api_key = std::env::var("OPENAI_API_KEY").ok()?;
    let base_url =
      std::env::var("OPENAI_BASE_URL").unwrap_or_else(|_| "https://api.openai.com/v1".into());
    let model =
      std::env::var("OPENAI_REASONING_MODEL").unwrap_or_else(|_| "o3-mini".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(generation.timeout_secs))
      .build()
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url,
      model,
      system_preamble: prompts.reasoning_system.clone(),
      max_completion_tokens: generation.max_output_tokens,
      reasoning_effort: generation.reasoning_effort.clone(),
    })
  }

  fn request_body(&self, prompt: &str) -> ChatCompletionRequest {
    ChatCompletionRequest {
      model: self.model.clone(),
      messages: vec![ChatMessageReq { role: "system".into(), content: self.rendered_prompt(prompt) }],
      response_format: ResponseFormat { r#type: "json_object".into() },
      max_completion_tokens: Some(self.max_completion_tokens),
      reasoning_effort: self.reasoning_effort.clone(),
    }
  }

  fn unavailable(&self, message: impl Into<String>) -> GenerationError {
    GenerationError::BackendUnavailable { model: self.model.clone(), message: message.into() }
  }
}

#[async_trait]
impl GenerationClient for OpenAI {
  fn model_name(&self) -> &str {
    &self.model
  }

  /// The preamble and the prompt go out together as one system message.
  fn rendered_prompt(&self, prompt: &str) -> String {
    if self.system_preamble.trim().is_empty() {
      prompt.to_string()
    } else {
      format!("{}\n\n{}", self.system_preamble.trim(), prompt)
    }
  }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_structured(&self, prompt: &str) -> Result<Generation, GenerationError> {
    let url = format!("{}/chat/completions", self.base_url);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "questgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
      .json(&self.request_body(prompt))
      .send().await
      .map_err(|e| self.unavailable(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      error!(target: "questgen", %status, elapsed = ?start.elapsed(), "OpenAI call failed");
      return Err(self.unavailable(format!("OpenAI HTTP {}: {}", status, msg)));
    }

    let body: ChatCompletionResponse = res.json().await.map_err(|e| self.unavailable(e.to_string()))?;
    if let Some(usage) = &body.usage {
      info!(prompt_tokens = ?usage.prompt_tokens, completion_tokens = ?usage.completion_tokens, total_tokens = ?usage.total_tokens, "OpenAI usage");
    }
    let text = choice_text(&body)
      .ok_or_else(|| GenerationError::EmptyResponse { model: self.model.clone() })?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "OpenAI response received");

    Ok(Generation { text, model: self.model.clone() })
  }
}

fn choice_text(body: &ChatCompletionResponse) -> Option<String> {
  body.choices.first()
    .and_then(|c| c.message.content.clone())
    .filter(|t| !t.trim().is_empty())
}

// --- Chat DTOs ---

#[derive(Serialize)]
struct ChatCompletionRequest {
  model: String,
  messages: Vec<ChatMessageReq>,
  response_format: ResponseFormat,
  #[serde(skip_serializing_if = "Option::is_none")]
  max_completion_tokens: Option<u32>,
  #[serde(skip_serializing_if = "Option::is_none")]
  reasoning_effort: Option<String>,
}
#[derive(Serialize)]
struct ChatMessageReq { role: String, content: String }
#[derive(Serialize)]
struct ResponseFormat { #[serde(rename = "type")] r#type: String }

#[derive(Deserialize)]
struct ChatCompletionResponse {
  #[serde(default)] choices: Vec<ChatChoice>,
  #[serde(default)] usage: Option<Usage>,
}
#[derive(Deserialize)]
struct ChatChoice { message: ChatMessageResp }
#[derive(Deserialize)]
struct ChatMessageResp { content: Option<String> }
#[derive(Deserialize)]
struct Usage {
  #[serde(default)] prompt_tokens: Option<u32>,
  #[serde(default)] completion_tokens: Option<u32>,
  #[serde(default)] total_tokens: Option<u32>,
}
