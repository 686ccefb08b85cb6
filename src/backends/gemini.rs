//! Structured-output backend: Gemini `generateContent`.
//!
//! Requests JSON output (`responseMimeType`), a bounded token budget and a low
//! temperature. Safety thresholds are relaxed to BLOCK_ONLY_HIGH: exam content
//! (history, biology, chemistry) trips the defaults far too often.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument};

use super::{extract_api_error, Generation, GenerationClient, GenerationError};
use crate::config::GenerationSettings;

const HARM_CATEGORIES: [&str; 4] = [
  "HARM_CATEGORY_HARASSMENT",
  "HARM_CATEGORY_HATE_SPEECH",
  "HARM_CATEGORY_SEXUALLY_EXPLICIT",
  "HARM_CATEGORY_DANGEROUS_CONTENT",
];

#[derive(Clone)]
pub struct Gemini {
  pub client: reqwest::Client,
  pub api_key: String,
  pub base_url: String,
  pub model: String,
  pub temperature: f32,
  pub max_output_tokens: u32,
}

impl Gemini {
  /// Construct the client if we find GEMINI_API_KEY; otherwise return None.
  pub fn from_env(generation: &GenerationSettings) -> Option<Self> {
    let api_key = std::env::var("GEMINI_API_KEY").ok()?;
    let base_url = std::env::var("GEMINI_BASE_URL")
      .unwrap_or_else(|_| "https://generativelanguage.googleapis.com/v1beta".into());
    let model = std::env::var("GEMINI_MODEL").unwrap_or_else(|_| "gemini-1.5-pro".into());

    let client = reqwest::Client::builder()
      .timeout(Duration::from_secs(generation.timeout_secs))
      .build()
      .ok()?;

    Some(Self {
      client,
      api_key,
      base_url,
      model,
      temperature: generation.temperature,
      max_output_tokens: generation.max_output_tokens,
    })
  }

  fn request_body(&self, prompt: &str) -> GenerateContentRequest {
    GenerateContentRequest {
      contents: vec![Content { role: "user".into(), parts: vec![PartReq { text: prompt.into() }] }],
      generation_config: GenerationConfig {
        temperature: self.temperature,
        top_p: 0.95,
        max_output_tokens: self.max_output_tokens,
        response_mime_type: "application/json".into(),
      },
      safety_settings: HARM_CATEGORIES
        .iter()
        .map(|c| SafetySetting { category: (*c).into(), threshold: "BLOCK_ONLY_HIGH".into() })
        .collect(),
    }
  }

  fn unavailable(&self, message: impl Into<String>) -> GenerationError {
    GenerationError::BackendUnavailable { model: self.model.clone(), message: message.into() }
  }
}

#[async_trait]
impl GenerationClient for Gemini {
  fn model_name(&self) -> &str {
    &self.model
  }

  #[instrument(level = "info", skip(self, prompt), fields(model = %self.model, prompt_len = prompt.len()))]
  async fn generate_structured(&self, prompt: &str) -> Result<Generation, GenerationError> {
    let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
    let start = Instant::now();

    let res = self.client.post(&url)
      .header(USER_AGENT, "questgen-backend/0.1")
      .header(CONTENT_TYPE, "application/json")
      .header("x-goog-api-key", &self.api_key)
      .json(&self.request_body(prompt))
      .send().await
      .map_err(|e| self.unavailable(e.to_string()))?;

    if !res.status().is_success() {
      let status = res.status();
      let body = res.text().await.unwrap_or_default();
      let msg = extract_api_error(&body).unwrap_or(body);
      error!(target: "questgen", %status, elapsed = ?start.elapsed(), "Gemini call failed");
      return Err(self.unavailable(format!("Gemini HTTP {}: {}", status, msg)));
    }

    let body: GenerateContentResponse = res.json().await.map_err(|e| self.unavailable(e.to_string()))?;
    if let Some(usage) = &body.usage_metadata {
      info!(prompt_tokens = ?usage.prompt_token_count, candidate_tokens = ?usage.candidates_token_count, total_tokens = ?usage.total_token_count, "Gemini usage");
    }
    let text = candidate_text(&body)
      .ok_or_else(|| GenerationError::EmptyResponse { model: self.model.clone() })?;
    info!(elapsed = ?start.elapsed(), response_len = text.len(), "Gemini response received");

    Ok(Generation { text, model: self.model.clone() })
  }
}

/// Text parts of the first candidate, concatenated. None when there is nothing usable.
fn candidate_text(body: &GenerateContentResponse) -> Option<String> {
  let candidate = body.candidates.first()?;
  let parts = &candidate.content.as_ref()?.parts;
  let text: String = parts.iter().filter_map(|p| p.text.as_deref()).collect();
  if text.trim().is_empty() {
    if let Some(reason) = &candidate.finish_reason {
      error!(target: "questgen", %reason, "Gemini candidate carried no text");
    }
    None
  } else {
    Some(text)
  }
}

// --- generateContent DTOs ---

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
  contents: Vec<Content>,
  generation_config: GenerationConfig,
  safety_settings: Vec<SafetySetting>,
}
#[derive(Serialize)]
struct Content { role: String, parts: Vec<PartReq> }
#[derive(Serialize)]
struct PartReq { text: String }
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
  temperature: f32,
  top_p: f32,
  max_output_tokens: u32,
  response_mime_type: String,
}
#[derive(Serialize)]
struct SafetySetting { category: String, threshold: String }

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
  #[serde(default)] candidates: Vec<Candidate>,
  #[serde(default)] usage_metadata: Option<UsageMetadata>,
}
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
  #[serde(default)] content: Option<CandidateContent>,
  #[serde(default)] finish_reason: Option<String>,
}
#[derive(Deserialize)]
struct CandidateContent { #[serde(default)] parts: Vec<PartResp> }
#[derive(Deserialize)]
struct PartResp { #[serde(default)] text: Option<String> }
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
  #[serde(default)] prompt_token_count: Option<u32>,
  #[serde(default)] candidates_token_count: Option<u32>,
  #[serde(default)] total_token_count: Option<u32>,
}
