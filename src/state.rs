//! Application state: the document store, the request lifecycle, and loaded config.
//!
//! Handlers only write documents. Processing happens in the trigger loop, which
//! `main` starts against the same store.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::backends::{BackendKind, Backends};
use crate::config::{load_app_config_from_env, AppConfig};
use crate::lifecycle::RequestLifecycle;
use crate::store::{DocumentStore, MemoryStore};

#[derive(Clone)]
pub struct AppState {
  pub store: Arc<dyn DocumentStore>,
  pub lifecycle: Arc<RequestLifecycle>,
  /// Backend kinds that were configured at startup, for the health probe.
  pub backends: Vec<BackendKind>,
}

impl AppState {
  /// Build state from env: load config, build backends, wire the lifecycle to an in-memory store.
  #[instrument(level = "info", skip_all)]
  pub fn new() -> Self {
    let cfg = load_app_config_from_env().unwrap_or_default();
    let backends = Backends::from_env(&cfg.generation, &cfg.prompts);
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new());
    let state = Self::from_parts(store, &cfg, backends);
    info!(
      target: "questgen",
      question_count = cfg.generation.question_count,
      require_topics = cfg.generation.require_topics,
      reasoning_suffixes = ?cfg.routing.reasoning_suffixes,
      syllabus_root = %cfg.syllabus.root,
      "Application state ready"
    );
    state
  }

  pub fn from_parts(store: Arc<dyn DocumentStore>, cfg: &AppConfig, backends: Backends) -> Self {
    let configured = [BackendKind::Structured, BackendKind::Reasoning]
      .into_iter()
      .filter(|k| backends.get(*k).is_ok())
      .collect();
    let lifecycle = Arc::new(RequestLifecycle::from_config(store.clone(), cfg, backends));
    Self { store, lifecycle, backends: configured }
  }
}
