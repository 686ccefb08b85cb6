//! Questgen · exam-question generation backend
//!
//! - Request documents move `pending → received → completed | error`
//! - Each write to a request document triggers one processing attempt
//! - Structured (Gemini) and reasoning (OpenAI-compatible) model backends
//! - Axum HTTP API to create, inspect, and retry requests
//!
//! Important env variables:
//!   PORT                   : u16 (default 3000)
//!   GEMINI_API_KEY         : enables the structured backend
//!   GEMINI_BASE_URL        : default "https://generativelanguage.googleapis.com/v1beta"
//!   GEMINI_MODEL           : default "gemini-1.5-pro"
//!   OPENAI_API_KEY         : enables the reasoning backend
//!   OPENAI_BASE_URL        : default "https://api.openai.com/v1"
//!   OPENAI_REASONING_MODEL : default "o3-mini"
//!   GENERATOR_CONFIG_PATH  : path to TOML config (generation, routing, syllabus, prompts)
//!   LOG_LEVEL              : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT             : "pretty" (default) or "json"

mod backends;
mod config;
mod domain;
mod lifecycle;
mod normalize;
mod prompt;
mod protocol;
mod router;
mod routes;
mod state;
mod store;
mod syllabus;
mod telemetry;
mod trigger;
mod util;
mod validate;

use std::{net::SocketAddr, sync::Arc};
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::routes::build_router;
use crate::state::AppState;
use crate::trigger::spawn_trigger_loop;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  // Shared state: document store, backends, lifecycle.
  let state = Arc::new(AppState::new());

  // Every request-document write from here on is processed.
  let trigger = spawn_trigger_loop(state.store.as_ref(), state.lifecycle.clone());

  let app = build_router(state.clone());

  let addr: SocketAddr = std::env::var("PORT")
    .ok()
    .and_then(|p| p.parse::<u16>().ok())
    .map(|port| SocketAddr::from(([0, 0, 0, 0], port)))
    .unwrap_or_else(|| SocketAddr::from(([0, 0, 0, 0], 3000)));

  let listener = TcpListener::bind(addr).await?;
  info!(target: "questgen", %addr, "HTTP server listening");
  axum::serve(listener, app)
    .with_graceful_shutdown(async {
      let _ = tokio::signal::ctrl_c().await;
      info!(target: "questgen", "Shutdown signal received");
    })
    .await?;

  trigger.abort();
  Ok(())
}
