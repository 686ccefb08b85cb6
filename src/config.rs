//! Loading generator configuration (prompts, routing rules, syllabus map) from TOML.
//!
//! Every section is optional; missing keys fall back to the defaults below.
//! See `AppConfig` for the expected schema.

use std::collections::BTreeMap;

use serde::Deserialize;
use tracing::{error, info};

#[derive(Clone, Debug, Deserialize, Default)]
pub struct AppConfig {
  #[serde(default)]
  pub generation: GenerationSettings,
  #[serde(default)]
  pub routing: RoutingSettings,
  #[serde(default)]
  pub syllabus: SyllabusSettings,
  #[serde(default)]
  pub prompts: Prompts,
}

/// Knobs for the model call and for how strictly its output is checked.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct GenerationSettings {
  pub question_count: usize,
  /// Reject questions without a non-empty `topics` array.
  pub require_topics: bool,
  pub temperature: f32,
  pub max_output_tokens: u32,
  /// Upper bound for one backend HTTP call. Reasoning models can take minutes.
  pub timeout_secs: u64,
  /// Passed to the reasoning backend as `reasoning_effort` when set.
  pub reasoning_effort: Option<String>,
}

impl Default for GenerationSettings {
  fn default() -> Self {
    Self {
      question_count: 10,
      require_topics: false,
      temperature: 0.2,
      max_output_tokens: 8192,
      timeout_secs: 300,
      reasoning_effort: None,
    }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct RoutingSettings {
  /// Subjects ending with one of these (case-insensitive) go to the reasoning backend.
  pub reasoning_suffixes: Vec<String>,
}

impl Default for RoutingSettings {
  fn default() -> Self {
    Self { reasoning_suffixes: vec!["mathematics".into()] }
  }
}

#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct SyllabusSettings {
  /// Directory holding one sub-directory per syllabus.
  pub root: String,
  /// Syllabus name -> sub-directory under `root`.
  pub directories: BTreeMap<String, String>,
}

impl Default for SyllabusSettings {
  fn default() -> Self {
    let directories = [
      ("Singapore GCE O-Level", "singapore_o_level"),
      ("Singapore GCE A-Level", "singapore_a_level"),
      ("Cambridge IGCSE", "cambridge_igcse"),
      ("IB", "ib"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    Self { root: "syllabus".into(), directories }
  }
}

/// Prompts used by the generation backends. Override in TOML to tune tone/structure.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Prompts {
  /// Placeholders: {count}, {subject}, {syllabus}, {topic_clause}, {reference}, {schema}.
  pub generation_template: String,
  /// Prepended to the prompt for the reasoning backend (single system message).
  pub reasoning_system: String,
}

impl Default for Prompts {
  fn default() -> Self {
    Self {
      generation_template: "You are an experienced examiner writing exam-style questions.\n\
Generate {count} questions for {subject} following the {syllabus} syllabus{topic_clause}.\n\
Mix the question types MCQ, Short Answer, Structured and Application, and match the depth of the syllabus.\n\n\
Syllabus reference:\n{reference}\n\n\
Return the questions in exactly this JSON schema:\n{schema}\n\n\
Rules:\n\
- Return ONLY the JSON object. No prose, no markdown, no code fences.\n\
- \"mcqChoices\" is required when \"type\" is \"MCQ\" and must be omitted otherwise.\n\
- \"correctAnswer\" for an MCQ must repeat the text of the correct choice."
        .into(),
      reasoning_system: "Work through each question step by step before writing it, then respond with a single JSON object and nothing else."
        .into(),
    }
  }
}

/// Attempt to load `AppConfig` from GENERATOR_CONFIG_PATH. On any parsing/IO error, returns None.
pub fn load_app_config_from_env() -> Option<AppConfig> {
  let path = std::env::var("GENERATOR_CONFIG_PATH").ok()?;
  match std::fs::read_to_string(&path) {
    Ok(s) => match toml::from_str::<AppConfig>(&s) {
      Ok(cfg) => {
        info!(target: "questgen", %path, "Loaded generator config (TOML)");
        Some(cfg)
      }
      Err(e) => {
        error!(target: "questgen", %path, error = %e, "Failed to parse TOML config");
        None
      }
    },
    Err(e) => {
      error!(target: "questgen", %path, error = %e, "Failed to read TOML config file");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn partial_toml_keeps_defaults_for_missing_keys() {
    let cfg: AppConfig = toml::from_str(
      r#"
      [generation]
      question_count = 5
      require_topics = true

      [routing]
      reasoning_suffixes = ["mathematics", "physics"]

      [syllabus.directories]
      "IB" = "ib_dp"
      "#,
    )
    .expect("toml");
    assert_eq!(cfg.generation.question_count, 5);
    assert!(cfg.generation.require_topics);
    assert_eq!(cfg.generation.timeout_secs, 300);
    assert_eq!(cfg.routing.reasoning_suffixes.len(), 2);
    assert_eq!(cfg.syllabus.root, "syllabus");
    assert_eq!(cfg.syllabus.directories.get("IB").map(String::as_str), Some("ib_dp"));
    assert!(cfg.prompts.generation_template.contains("{schema}"));
  }

  #[test]
  fn empty_toml_is_the_default_config() {
    let cfg: AppConfig = toml::from_str("").expect("toml");
    assert_eq!(cfg.generation.question_count, 10);
    assert_eq!(cfg.routing.reasoning_suffixes, vec!["mathematics".to_string()]);
    assert!(cfg.syllabus.directories.contains_key("Singapore GCE O-Level"));
  }
}
