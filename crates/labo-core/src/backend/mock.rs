//! Mock report backend for testing.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{BackendFuture, RawRecord, ReportBackend, TransportError};
use crate::ReportId;

/// A configurable list response for [`MockBackend`].
#[derive(Clone, Debug)]
pub enum MockResponse {
    /// Simulate a successful fetch.
    Records(Vec<RawRecord>),
    /// Simulate a transport failure.
    Error(String),
}

impl MockResponse {
    fn into_result(self) -> Result<Vec<RawRecord>, TransportError> {
        match self {
            Self::Records(records) => Ok(records),
            Self::Error(msg) => Err(TransportError::Backend(msg)),
        }
    }
}

/// A hand-rolled mock implementing [`ReportBackend`] for tests.
///
/// Supports:
/// - A fixed list response, **or** a sequence of list responses (one per
///   call, repeating the last once exhausted).
/// - Detail records keyed by id; unknown ids report not-found.
/// - Per-id delete failures. Deleting the same id twice fails the second time.
/// - Optional per-call latency.
/// - Call counting.
pub struct MockBackend {
    /// Popped from the back, so stored in reverse order.
    list_responses: Mutex<Vec<MockResponse>>,
    list_fallback: MockResponse,
    records: Mutex<HashMap<ReportId, RawRecord>>,
    fetch_error: Option<String>,
    failing_deletes: HashSet<ReportId>,
    deleted: Mutex<Vec<ReportId>>,
    delay: Option<Duration>,
    list_calls: AtomicUsize,
    fetch_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl MockBackend {
    /// Create a mock whose list endpoint always returns `response`.
    pub fn new(response: MockResponse) -> Self {
        Self {
            list_responses: Mutex::new(Vec::new()),
            list_fallback: response,
            records: Mutex::new(HashMap::new()),
            fetch_error: None,
            failing_deletes: HashSet::new(),
            deleted: Mutex::new(Vec::new()),
            delay: None,
            list_calls: AtomicUsize::new(0),
            fetch_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    /// Shorthand for a mock that lists `records`.
    pub fn with_records(records: Vec<RawRecord>) -> Self {
        Self::new(MockResponse::Records(records))
    }

    /// Create a mock that returns list responses in order, repeating the last.
    ///
    /// # Panics
    /// If `responses` is empty.
    pub fn with_sequence(mut responses: Vec<MockResponse>) -> Self {
        assert!(
            !responses.is_empty(),
            "sequence must have at least one response"
        );
        responses.reverse();
        let fallback = responses[0].clone();
        let mut mock = Self::new(fallback);
        mock.list_responses = Mutex::new(responses);
        mock
    }

    /// Register a record for `fetch_one`.
    pub fn with_detail(self, id: impl Into<ReportId>, record: RawRecord) -> Self {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.into(), record);
        self
    }

    /// Make every `fetch_one` call fail with a transport error.
    pub fn with_fetch_error(mut self, msg: impl Into<String>) -> Self {
        self.fetch_error = Some(msg.into());
        self
    }

    /// Make deletes of `id` fail.
    pub fn failing_delete(mut self, id: impl Into<ReportId>) -> Self {
        self.failing_deletes.insert(id.into());
        self
    }

    /// Set simulated network latency per call.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    /// Ids whose delete succeeded, in completion order.
    pub fn deleted(&self) -> Vec<ReportId> {
        self.deleted
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl ReportBackend for MockBackend {
    fn fetch_list(&self, _user_no: u64) -> BackendFuture<'_, Vec<RawRecord>> {
        Box::pin(async move {
            self.list_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            let next = self
                .list_responses
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .pop();
            next.unwrap_or_else(|| self.list_fallback.clone())
                .into_result()
        })
    }

    fn fetch_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, RawRecord> {
        Box::pin(async move {
            self.fetch_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if let Some(msg) = &self.fetch_error {
                return Err(TransportError::Backend(msg.clone()));
            }
            self.records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .get(id)
                .cloned()
                .ok_or_else(|| TransportError::NotFound(id.clone()))
        })
    }

    fn delete_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, ()> {
        Box::pin(async move {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            self.pause().await;
            if self.failing_deletes.contains(id) {
                return Err(TransportError::Backend(format!("delete of {} rejected", id)));
            }
            let mut deleted = self.deleted.lock().unwrap_or_else(|e| e.into_inner());
            if deleted.contains(id) {
                return Err(TransportError::NotFound(id.clone()));
            }
            deleted.push(id.clone());
            self.records
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .remove(id);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn sequence_repeats_last_response() {
        let mock = MockBackend::with_sequence(vec![
            MockResponse::Error("down".into()),
            MockResponse::Records(vec![json!({"id": 1})]),
        ]);
        assert!(mock.fetch_list(1).await.is_err());
        assert_eq!(mock.fetch_list(1).await.unwrap().len(), 1);
        assert_eq!(mock.fetch_list(1).await.unwrap().len(), 1);
        assert_eq!(mock.list_calls(), 3);
    }

    #[tokio::test]
    async fn second_delete_of_same_id_fails() {
        let mock = MockBackend::with_records(vec![]);
        let id = ReportId::from(4u64);
        assert!(mock.delete_one(&id).await.is_ok());
        assert!(matches!(
            mock.delete_one(&id).await,
            Err(TransportError::NotFound(_))
        ));
        assert_eq!(mock.deleted(), vec![id]);
    }

    #[tokio::test]
    async fn unknown_detail_is_not_found() {
        let mock = MockBackend::with_records(vec![]).with_detail(1u64, json!({"record_no": 1}));
        assert!(mock.fetch_one(&ReportId::from(1u64)).await.is_ok());
        assert!(matches!(
            mock.fetch_one(&ReportId::from(2u64)).await,
            Err(TransportError::NotFound(_))
        ));
    }
}
