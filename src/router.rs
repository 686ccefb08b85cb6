//! Backend selection. Rules are checked in order; the first match wins,
//! otherwise the structured backend is used.

use tracing::debug;

use crate::backends::BackendKind;
use crate::config::RoutingSettings;

pub trait RoutingRule: Send + Sync {
  /// `Some(kind)` when this rule claims the subject.
  fn route(&self, subject: &str) -> Option<BackendKind>;
}

/// Routes subjects ending with any of `suffixes` (case-insensitive).
pub struct SuffixRule {
  suffixes: Vec<String>,
  kind: BackendKind,
}

impl SuffixRule {
  pub fn new<I, S>(suffixes: I, kind: BackendKind) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    let suffixes = suffixes
      .into_iter()
      .map(|s| s.as_ref().trim().to_lowercase())
      .filter(|s| !s.is_empty())
      .collect();
    Self { suffixes, kind }
  }
}

impl RoutingRule for SuffixRule {
  fn route(&self, subject: &str) -> Option<BackendKind> {
    let subject = subject.trim().to_lowercase();
    self.suffixes.iter().any(|s| subject.ends_with(s.as_str())).then_some(self.kind)
  }
}

pub struct ModelRouter {
  rules: Vec<Box<dyn RoutingRule>>,
  default: BackendKind,
}

impl ModelRouter {
  pub fn new(default: BackendKind) -> Self {
    Self { rules: Vec::new(), default }
  }

  /// Default routing: reasoning for the configured subject suffixes, structured otherwise.
  pub fn from_settings(settings: &RoutingSettings) -> Self {
    Self::new(BackendKind::Structured)
      .with_rule(SuffixRule::new(&settings.reasoning_suffixes, BackendKind::Reasoning))
  }

  pub fn with_rule(mut self, rule: impl RoutingRule + 'static) -> Self {
    self.rules.push(Box::new(rule));
    self
  }

  pub fn select(&self, subject: &str) -> BackendKind {
    let kind = self.rules.iter().find_map(|r| r.route(subject)).unwrap_or(self.default);
    debug!(target: "questgen", %subject, backend = %kind, "Backend selected");
    kind
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn mathematics_subjects_go_to_reasoning() {
    let r = ModelRouter::from_settings(&RoutingSettings::default());
    assert_eq!(r.select("Mathematics"), BackendKind::Reasoning);
    assert_eq!(r.select("Additional MATHEMATICS "), BackendKind::Reasoning);
    assert_eq!(r.select("Physics"), BackendKind::Structured);
    assert_eq!(r.select("Mathematics and Physics"), BackendKind::Structured);
  }

  #[test]
  fn extra_rules_are_added_without_touching_select() {
    struct Always(BackendKind);
    impl RoutingRule for Always {
      fn route(&self, _subject: &str) -> Option<BackendKind> { Some(self.0) }
    }

    let r = ModelRouter::new(BackendKind::Structured)
      .with_rule(SuffixRule::new(["physics"], BackendKind::Structured))
      .with_rule(Always(BackendKind::Reasoning));
    assert_eq!(r.select("Physics"), BackendKind::Structured);
    assert_eq!(r.select("History"), BackendKind::Reasoning);
  }

  #[test]
  fn blank_suffixes_never_match() {
    let r = ModelRouter::new(BackendKind::Structured)
      .with_rule(SuffixRule::new(["", "  "], BackendKind::Reasoning));
    assert_eq!(r.select("Biology"), BackendKind::Structured);
  }
}
