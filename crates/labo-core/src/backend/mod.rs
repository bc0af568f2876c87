//! Collaborator trait for the report service and its implementations.

pub mod http;
pub mod mock;

use std::future::Future;
use std::pin::Pin;

use thiserror::Error;

use crate::ReportId;

pub use http::HttpBackend;
pub use mock::{MockBackend, MockResponse};

/// A record as returned by the report service, before normalization.
/// Field names vary between the list and detail endpoints.
pub type RawRecord = serde_json::Value;

/// Boxed future returned by [`ReportBackend`] methods.
pub type BackendFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, TransportError>> + Send + 'a>>;

/// Failure talking to the report service.
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("server returned HTTP {0}")]
    Status(u16),
    #[error("report {0} not found")]
    NotFound(ReportId),
    #[error("unexpected response body: {0}")]
    Decode(String),
    #[error("backend error: {0}")]
    Backend(String),
}

/// The network layer consumed by the list and detail controllers.
///
/// Deletes are not assumed idempotent: deleting an id that is already gone
/// may report a failure.
pub trait ReportBackend: Send + Sync {
    /// Fetch every report owned by `user_no`.
    fn fetch_list(&self, user_no: u64) -> BackendFuture<'_, Vec<RawRecord>>;

    /// Fetch a single report.
    fn fetch_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, RawRecord>;

    /// Delete a single report.
    fn delete_one<'a>(&'a self, id: &'a ReportId) -> BackendFuture<'a, ()>;
}
