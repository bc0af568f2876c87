//! Single-report view: load one record, delete it, navigate back.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::backend::{ReportBackend, TransportError};
use crate::normalize::{NormalizationError, normalize_detail};
use crate::{ReportDetail, ReportId};

const LOAD_FAILED: &str = "Could not load the report.";
const DELETE_FAILED: &str = "Could not delete the report.";
const NO_SUMMARY: &str = "No summary available.";

static VIDEO_EXT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\.(mp4|webm|ogg)$").unwrap());

/// Whether `url` points at a playable video rather than a still image.
pub fn is_video_media(url: &str) -> bool {
    VIDEO_EXT.is_match(url)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DetailPhase {
    Loading,
    Ready,
    Error { message: String },
}

impl DetailPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Error, Debug)]
pub enum DetailError {
    #[error("report view is not ready (currently {phase})")]
    NotReady { phase: &'static str },
    #[error(transparent)]
    Transport(#[from] TransportError),
    #[error(transparent)]
    Normalization(#[from] NormalizationError),
}

/// What the caller should do after a successful delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetailOutcome {
    NavigateToList,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailViewModel {
    pub phase: DetailPhase,
    pub report: Option<ReportDetail>,
    pub is_video_media: bool,
    pub display_date: String,
    pub summary_text: String,
    pub highlight_captions: Vec<String>,
    pub notice: Option<String>,
}

pub struct DetailController {
    backend: Arc<dyn ReportBackend>,
    id: ReportId,
    phase: DetailPhase,
    report: Option<ReportDetail>,
    notice: Option<String>,
}

impl DetailController {
    /// A controller for the report routed to as `id`. Starts in `Loading`.
    pub fn new(backend: Arc<dyn ReportBackend>, id: ReportId) -> Self {
        Self {
            backend,
            id,
            phase: DetailPhase::Loading,
            report: None,
            notice: None,
        }
    }

    pub fn id(&self) -> &ReportId {
        &self.id
    }

    pub fn phase(&self) -> &DetailPhase {
        &self.phase
    }

    /// Fetch and normalize the record. The routed id fills in for a record
    /// that carries no identifier of its own.
    pub async fn load_one(&mut self) -> Result<DetailViewModel, DetailError> {
        self.phase = DetailPhase::Loading;
        self.notice = None;

        let loaded = match self.backend.fetch_one(&self.id).await {
            Ok(raw) => normalize_detail(&raw, Some(&self.id)).map_err(DetailError::from),
            Err(e) => Err(DetailError::from(e)),
        };

        match loaded {
            Ok(detail) => {
                tracing::debug!(id = %self.id, "report loaded");
                self.report = Some(detail);
                self.phase = DetailPhase::Ready;
                Ok(self.view_model())
            }
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "failed to load report");
                self.report = None;
                self.phase = DetailPhase::Error {
                    message: LOAD_FAILED.to_string(),
                };
                Err(e)
            }
        }
    }

    /// Delete the displayed report. On failure the report stays on screen.
    pub async fn delete_one(&mut self) -> Result<DetailOutcome, DetailError> {
        if self.phase != DetailPhase::Ready {
            tracing::debug!(phase = self.phase.label(), "delete rejected");
            return Err(DetailError::NotReady {
                phase: self.phase.label(),
            });
        }
        self.notice = None;

        match self.backend.delete_one(&self.id).await {
            Ok(()) => {
                tracing::info!(id = %self.id, "report deleted");
                Ok(DetailOutcome::NavigateToList)
            }
            Err(e) => {
                tracing::warn!(id = %self.id, error = %e, "failed to delete report");
                self.notice = Some(DELETE_FAILED.to_string());
                Err(e.into())
            }
        }
    }

    pub fn view_model(&self) -> DetailViewModel {
        let report = self.report.clone();
        let (is_video_media, display_date, summary_text, highlight_captions) = match &report {
            Some(d) => (
                is_video_media(&d.video_url),
                d.report.display_date(),
                if d.summary.trim().is_empty() {
                    NO_SUMMARY.to_string()
                } else {
                    d.summary.clone()
                },
                d.highlights.iter().map(|h| h.caption()).collect(),
            ),
            None => (false, "-".to_string(), NO_SUMMARY.to_string(), Vec::new()),
        };

        DetailViewModel {
            phase: self.phase.clone(),
            report,
            is_video_media,
            display_date,
            summary_text,
            highlight_captions,
            notice: self.notice.clone(),
        }
    }
}
