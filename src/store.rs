//! Document store seam: request/question documents plus a write-event feed.
//!
//! `MemoryStore` is the in-process implementation: maps behind tokio `RwLock`s and
//! a `broadcast` channel that announces every write, the same way a document
//! database would fire a "document written" trigger.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{broadcast, RwLock};
use tracing::{debug, instrument};

use crate::domain::{QuestionRecord, RequestPatch, RequestRecord};

pub const REQUESTS: &str = "question_requests";
pub const QUESTIONS: &str = "questions";

const EVENT_BUFFER: usize = 1024;

/// "A document in `collection` with this `id` was created or updated."
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct WriteEvent {
  pub collection: &'static str,
  pub id: String,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
  #[error("{collection}/{id} not found")]
  NotFound { collection: &'static str, id: String },
  #[error("{collection}/{id} already exists")]
  AlreadyExists { collection: &'static str, id: String },
  /// Backend outage or quota. `MemoryStore` never fails; persistent stores do.
  #[allow(dead_code)]
  #[error("document store write failed: {0}")]
  Unavailable(String),
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
  async fn create_request(&self, rec: RequestRecord) -> Result<RequestRecord, StoreError>;
  async fn get_request(&self, id: &str) -> Result<RequestRecord, StoreError>;
  async fn update_request(&self, id: &str, patch: RequestPatch) -> Result<RequestRecord, StoreError>;
  async fn create_question(&self, q: QuestionRecord) -> Result<String, StoreError>;
  /// Every question ever written for the request, including those left by a failed attempt.
  async fn questions_for_request(&self, request_id: &str) -> Result<Vec<QuestionRecord>, StoreError>;
  /// Subscribe to write events. Only writes after this call are delivered.
  fn subscribe(&self) -> broadcast::Receiver<WriteEvent>;
}

#[derive(Clone)]
pub struct MemoryStore {
  requests: Arc<RwLock<HashMap<String, RequestRecord>>>,
  questions: Arc<RwLock<Vec<QuestionRecord>>>,
  events: broadcast::Sender<WriteEvent>,
}

impl Default for MemoryStore {
  fn default() -> Self {
    Self::new()
  }
}

impl MemoryStore {
  pub fn new() -> Self {
    let (events, _) = broadcast::channel(EVENT_BUFFER);
    Self {
      requests: Arc::new(RwLock::new(HashMap::new())),
      questions: Arc::new(RwLock::new(Vec::new())),
      events,
    }
  }

  #[cfg(test)]
  pub async fn question_count(&self) -> usize {
    self.questions.read().await.len()
  }

  fn announce(&self, collection: &'static str, id: &str) {
    // No subscribers is fine: nothing is listening for triggers yet.
    let _ = self.events.send(WriteEvent { collection, id: id.to_string() });
  }
}

#[async_trait]
impl DocumentStore for MemoryStore {
  #[instrument(level = "debug", skip(self, rec), fields(id = %rec.id))]
  async fn create_request(&self, rec: RequestRecord) -> Result<RequestRecord, StoreError> {
    {
      let mut requests = self.requests.write().await;
      if requests.contains_key(&rec.id) {
        return Err(StoreError::AlreadyExists { collection: REQUESTS, id: rec.id });
      }
      requests.insert(rec.id.clone(), rec.clone());
    }
    self.announce(REQUESTS, &rec.id);
    Ok(rec)
  }

  async fn get_request(&self, id: &str) -> Result<RequestRecord, StoreError> {
    self.requests.read().await.get(id).cloned()
      .ok_or_else(|| StoreError::NotFound { collection: REQUESTS, id: id.to_string() })
  }

  #[instrument(level = "debug", skip(self, patch), fields(status = ?patch.status))]
  async fn update_request(&self, id: &str, patch: RequestPatch) -> Result<RequestRecord, StoreError> {
    let updated = {
      let mut requests = self.requests.write().await;
      let rec = requests.get_mut(id)
        .ok_or_else(|| StoreError::NotFound { collection: REQUESTS, id: id.to_string() })?;
      patch.apply(rec);
      rec.clone()
    };
    debug!(target: "questgen", %id, status = %updated.status, "Request updated");
    self.announce(REQUESTS, id);
    Ok(updated)
  }

  async fn create_question(&self, q: QuestionRecord) -> Result<String, StoreError> {
    let id = q.id.clone();
    self.questions.write().await.push(q);
    self.announce(QUESTIONS, &id);
    Ok(id)
  }

  async fn questions_for_request(&self, request_id: &str) -> Result<Vec<QuestionRecord>, StoreError> {
    Ok(self.questions.read().await.iter().filter(|q| q.request == request_id).cloned().collect())
  }

  fn subscribe(&self) -> broadcast::Receiver<WriteEvent> {
    self.events.subscribe()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::domain::{GeneratedQuestion, RequestStatus};

  #[tokio::test]
  async fn writes_are_announced_in_order() {
    let store = MemoryStore::new();
    let mut rx = store.subscribe();

    let rec = store.create_request(RequestRecord::new_pending("Physics", "IB", None)).await.expect("create");
    store.update_request(&rec.id, RequestPatch::status(RequestStatus::Received)).await.expect("update");

    assert_eq!(rx.recv().await.expect("event"), WriteEvent { collection: REQUESTS, id: rec.id.clone() });
    assert_eq!(rx.recv().await.expect("event"), WriteEvent { collection: REQUESTS, id: rec.id.clone() });
    assert_eq!(store.get_request(&rec.id).await.expect("get").status, RequestStatus::Received);
  }

  #[tokio::test]
  async fn unknown_ids_and_duplicates_are_errors() {
    let store = MemoryStore::new();
    assert!(matches!(store.get_request("nope").await, Err(StoreError::NotFound { .. })));
    assert!(matches!(
      store.update_request("nope", RequestPatch::requeue()).await,
      Err(StoreError::NotFound { .. })
    ));

    let rec = RequestRecord::new_pending("Physics", "IB", None);
    store.create_request(rec.clone()).await.expect("first");
    assert!(matches!(store.create_request(rec).await, Err(StoreError::AlreadyExists { .. })));
  }

  #[tokio::test]
  async fn questions_are_listed_per_request() {
    let store = MemoryStore::new();
    let a = RequestRecord::new_pending("Physics", "IB", None);
    let b = RequestRecord::new_pending("Biology", "IB", None);
    let q = GeneratedQuestion {
      question: "Q".into(),
      kind: "Structured".into(),
      explanation: "E".into(),
      correct_answer: "A".into(),
      topics: vec![],
      mcq_choices: None,
    };
    store.create_question(QuestionRecord::from_generated(q.clone(), &a)).await.expect("q1");
    store.create_question(QuestionRecord::from_generated(q.clone(), &a)).await.expect("q2");
    store.create_question(QuestionRecord::from_generated(q, &b)).await.expect("q3");

    assert_eq!(store.questions_for_request(&a.id).await.expect("list").len(), 2);
    assert_eq!(store.questions_for_request(&b.id).await.expect("list").len(), 1);
    assert_eq!(store.question_count().await, 3);
  }
}
