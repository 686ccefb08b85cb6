//! Document-write trigger: one lifecycle run per request-document write.
//!
//! Runs are independent tasks, so writes to different requests proceed
//! concurrently. Duplicate or self-caused firings are absorbed by the lifecycle's
//! pending guard.

use std::sync::Arc;

use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::lifecycle::RequestLifecycle;
use crate::store::{DocumentStore, REQUESTS};

/// Subscribe to `store` and dispatch every request write to `lifecycle`.
/// The loop ends when the store's event channel closes.
pub fn spawn_trigger_loop(store: &dyn DocumentStore, lifecycle: Arc<RequestLifecycle>) -> JoinHandle<()> {
  let mut events = store.subscribe();
  tokio::spawn(async move {
    info!(target: "lifecycle", collection = REQUESTS, "Trigger loop started");
    loop {
      match events.recv().await {
        Ok(ev) if ev.collection == REQUESTS => {
          let lifecycle = lifecycle.clone();
          tokio::spawn(async move {
            let outcome = lifecycle.handle_write(&ev.id).await;
            debug!(target: "lifecycle", id = %ev.id, ?outcome, "Trigger run finished");
          });
        }
        Ok(_) => {}
        Err(RecvError::Lagged(skipped)) => {
          // Missed writes are not replayed; affected requests stay pending until written again.
          warn!(target: "lifecycle", skipped, "Trigger loop lagged; write events dropped");
        }
        Err(RecvError::Closed) => {
          info!(target: "lifecycle", "Write-event channel closed; trigger loop exiting");
          break;
        }
      }
    }
  })
}
