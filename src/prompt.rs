//! Generation prompt assembly.

use crate::config::{GenerationSettings, Prompts};
use crate::util::fill_template;

/// The literal schema the model is asked to reproduce. Keys must stay in sync
/// with `validate::validate_questions`.
pub const QUESTION_SCHEMA: &str = r#"{
  "questions": [
    {
      "question": "The question text",
      "type": "MCQ | Short Answer | Structured | Application",
      "explanation": "Step-by-step explanation of the answer",
      "correctAnswer": "The correct answer",
      "topics": ["syllabus topic the question assesses"],
      "mcqChoices": ["choice A", "choice B", "choice C", "choice D"]
    }
  ]
}"#;

#[derive(Clone, Debug)]
pub struct PromptBuilder {
  template: String,
  question_count: usize,
}

impl PromptBuilder {
  pub fn new(prompts: &Prompts, generation: &GenerationSettings) -> Self {
    Self { template: prompts.generation_template.clone(), question_count: generation.question_count }
  }

  pub fn question_count(&self) -> usize {
    self.question_count
  }

  /// Deterministic: identical inputs always produce identical text.
  pub fn build(&self, subject: &str, syllabus: &str, topic: Option<&str>, reference: &str) -> String {
    let count = self.question_count.to_string();
    let topic_clause = match topic.map(str::trim).filter(|t| !t.is_empty()) {
      Some(t) => format!(", focusing on the topic \"{t}\""),
      None => String::new(),
    };
    fill_template(
      &self.template,
      &[
        ("count", &count),
        ("subject", subject),
        ("syllabus", syllabus),
        ("topic_clause", &topic_clause),
        ("reference", reference),
        ("schema", QUESTION_SCHEMA),
      ],
    )
  }
}
