//! Structural validation of model output into `GeneratedQuestion`s.
//!
//! Required fields are hard failures for the whole batch. Optional fields that
//! arrive malformed (`mcqChoices`, and `topics` when not required) are dropped
//! with a warning and the batch continues.

use serde_json::{Map, Value};
use tracing::warn;

use crate::config::GenerationSettings;
use crate::domain::GeneratedQuestion;
use crate::util::head_tail;

const CONTEXT_CHARS: usize = 100;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
  #[error("Failed to parse model response as JSON: {message} (length {length}; starts with {head:?}; ends with {tail:?})")]
  MalformedJson { message: String, head: String, tail: String, length: usize },
  #[error("Model response has no \"questions\" array")]
  MissingQuestionsArray,
  #[error("Question {index} is missing required field \"{field}\"")]
  IncompleteQuestion { index: usize, field: &'static str },
}

/// Which fields a question must carry. Different deployments have disagreed on
/// `topics`, so it is a switch rather than part of the schema.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ValidationProfile {
  pub require_topics: bool,
}

impl ValidationProfile {
  pub fn from_settings(settings: &GenerationSettings) -> Self {
    Self { require_topics: settings.require_topics }
  }
}

/// Parse `text` and check every question. Order is preserved; nothing is deduplicated.
pub fn validate_questions(text: &str, profile: ValidationProfile) -> Result<Vec<GeneratedQuestion>, ValidationError> {
  let root: Value = serde_json::from_str(text).map_err(|e| {
    let (head, tail) = head_tail(text, CONTEXT_CHARS);
    ValidationError::MalformedJson { message: e.to_string(), head, tail, length: text.len() }
  })?;

  let items = root
    .get("questions")
    .and_then(Value::as_array)
    .ok_or(ValidationError::MissingQuestionsArray)?;

  items
    .iter()
    .enumerate()
    .map(|(index, item)| validate_one(index, item, profile))
    .collect()
}

fn validate_one(index: usize, item: &Value, profile: ValidationProfile) -> Result<GeneratedQuestion, ValidationError> {
  let empty = Map::new();
  let obj = item.as_object().unwrap_or(&empty);

  let question = required_str(obj, index, "question")?;
  let kind = required_str(obj, index, "type")?;
  let explanation = required_str(obj, index, "explanation")?;
  let correct_answer = required_str(obj, index, "correctAnswer")?;

  let topics = match (obj.get("topics"), profile.require_topics) {
    (Some(v), true) => match string_array(v) {
      Some(t) if !t.is_empty() => t,
      _ => return Err(ValidationError::IncompleteQuestion { index, field: "topics" }),
    },
    (None, true) => return Err(ValidationError::IncompleteQuestion { index, field: "topics" }),
    (Some(v), false) => string_array(v).unwrap_or_else(|| {
      warn!(target: "questgen", index, "Dropping malformed optional \"topics\"");
      Vec::new()
    }),
    (None, false) => Vec::new(),
  };

  let mcq_choices = match obj.get("mcqChoices") {
    None | Some(Value::Null) => None,
    Some(v) => match string_array(v) {
      Some(choices) => Some(choices),
      None => {
        warn!(target: "questgen", index, "Dropping malformed \"mcqChoices\"");
        None
      }
    },
  };

  let q = GeneratedQuestion { question, kind, explanation, correct_answer, topics, mcq_choices };
  if q.is_mcq() && q.mcq_choices.is_none() {
    warn!(target: "questgen", index, "MCQ question has no choices");
  }
  Ok(q)
}

fn required_str(obj: &Map<String, Value>, index: usize, field: &'static str) -> Result<String, ValidationError> {
  obj.get(field)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
    .ok_or(ValidationError::IncompleteQuestion { index, field })
}

/// `Some` only for an array whose every element is a string.
fn string_array(v: &Value) -> Option<Vec<String>> {
  v.as_array()?
    .iter()
    .map(|e| e.as_str().map(str::to_string))
    .collect()
}
