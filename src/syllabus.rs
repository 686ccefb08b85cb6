//! Syllabus reference lookup: syllabus name -> directory -> per-subject text file.
//!
//! Reference text only enriches the prompt, so every miss degrades to a fixed
//! fallback string instead of failing the request.

use std::collections::BTreeMap;
use std::path::PathBuf;

use tracing::{debug, instrument, warn};

use crate::config::SyllabusSettings;

pub const SYLLABUS_FALLBACK: &str = "No specific syllabus details available.";

#[derive(Clone, Debug)]
pub struct SyllabusResolver {
  root: PathBuf,
  directories: BTreeMap<String, String>,
}

impl SyllabusResolver {
  pub fn new(settings: &SyllabusSettings) -> Self {
    Self { root: PathBuf::from(&settings.root), directories: settings.directories.clone() }
  }

  /// Reference text for `subject` under `syllabus`, or `SYLLABUS_FALLBACK`.
  #[instrument(level = "debug", skip(self))]
  pub async fn resolve(&self, syllabus: &str, subject: &str) -> String {
    let Some(dir) = self.directories.get(syllabus.trim()) else {
      warn!(target: "questgen", %syllabus, "Unknown syllabus; using fallback reference text");
      return SYLLABUS_FALLBACK.to_string();
    };

    let Some(file_name) = subject_file_name(subject) else {
      warn!(target: "questgen", %subject, "Subject has no usable file name; using fallback reference text");
      return SYLLABUS_FALLBACK.to_string();
    };
    let path = self.root.join(dir).join(file_name);
    match tokio::fs::read_to_string(&path).await {
      Ok(text) if !text.trim().is_empty() => {
        debug!(target: "questgen", path = %path.display(), len = text.len(), "Loaded syllabus reference");
        text
      }
      Ok(_) => {
        warn!(target: "questgen", path = %path.display(), "Syllabus reference file is empty; using fallback");
        SYLLABUS_FALLBACK.to_string()
      }
      Err(e) => {
        warn!(target: "questgen", path = %path.display(), error = %e, "Syllabus reference unreadable; using fallback");
        SYLLABUS_FALLBACK.to_string()
      }
    }
  }
}

/// "Additional Mathematics" -> "additional_mathematics.txt".
///
/// Only alphanumeric runs survive, joined by `_`, so the name can never leave the
/// syllabus directory. `None` when nothing is left.
fn subject_file_name(subject: &str) -> Option<String> {
  let stem = subject
    .split(|c: char| !c.is_alphanumeric())
    .filter(|w| !w.is_empty())
    .map(str::to_lowercase)
    .collect::<Vec<_>>()
    .join("_");
  (!stem.is_empty()).then(|| format!("{stem}.txt"))
}
