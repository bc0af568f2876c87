use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

pub mod backend;
pub mod config_file;
pub mod detail;
pub mod list;
pub mod normalize;
pub mod selection;
pub mod store;

// Re-export for convenience
pub use backend::{RawRecord, ReportBackend, TransportError};
pub use detail::{DetailController, DetailError, DetailOutcome, DetailPhase, DetailViewModel, is_video_media};
pub use list::{
    BulkDeleteReport, EmptyHint, ListController, ListError, ListPhase, ListRow, ListViewModel,
    LoadTicket,
};
pub use normalize::{NormalizationError, normalize, normalize_detail};
pub use selection::Selection;
pub use store::{PAGE_SIZE, ReportStore, StoreError, StoreView, ViewQuery, total_pages};

/// Shown when a record carries no usable title.
pub const UNTITLED: &str = "(untitled)";

/// Shown when a record carries no author.
pub const UNKNOWN_AUTHOR: &str = "-";

/// Opaque report identifier.
///
/// Upstream records carry the id either as a JSON number or a string; both
/// are kept as their textual form so they round-trip unchanged into
/// collaborator calls and routes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ReportId(String);

impl ReportId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric value used as the sort tie-breaker. Ids that are not numbers
    /// compare as `0`.
    pub fn sort_key(&self) -> f64 {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }
}

impl fmt::Display for ReportId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ReportId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ReportId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<u64> for ReportId {
    fn from(n: u64) -> Self {
        Self(n.to_string())
    }
}

/// A canonical report as shown in the list view.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub id: ReportId,
    pub title: String,
    /// `None` when no candidate field held a parseable date.
    pub date: Option<NaiveDate>,
    pub author: String,
}

impl Report {
    /// ISO date, or `-` when the date is unknown.
    pub fn display_date(&self) -> String {
        self.date
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string())
    }
}

/// A labelled moment in the analysed video.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Highlight {
    /// Seconds from the start of the video.
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub label: String,
}

impl Highlight {
    /// `[3s ~ 8s] label` when both bounds are known, otherwise just the label.
    pub fn caption(&self) -> String {
        match (self.start, self.end) {
            (Some(start), Some(end)) => format!("[{}s ~ {}s] {}", start, end, self.label),
            _ => self.label.clone(),
        }
    }
}

/// A report with the detail-only fields filled in.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportDetail {
    #[serde(flatten)]
    pub report: Report,
    /// Video or thumbnail URL; empty when the record has no media.
    pub video_url: String,
    pub summary: String,
    pub highlights: Vec<Highlight>,
    pub behavior_stats: serde_json::Map<String, serde_json::Value>,
}

/// Errors reading or writing the on-disk configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
}
