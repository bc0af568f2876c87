//! List view state machine: load, search, paginate, select, bulk delete.

use std::collections::HashSet;
use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use crate::backend::{RawRecord, ReportBackend, TransportError};
use crate::normalize::normalize;
use crate::selection::Selection;
use crate::store::{PAGE_SIZE, ReportStore, StoreView, ViewQuery, total_pages};
use crate::{Report, ReportId};

const LOAD_FAILED: &str = "Could not load the report list.";
const NOTHING_SELECTED: &str = "Select at least one report to delete.";
const DELETE_FAILED: &str = "Could not delete the selected reports.";

/// Lifecycle of the list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ListPhase {
    Idle,
    Loading,
    Ready,
    Error { message: String },
}

impl ListPhase {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Loading => "loading",
            Self::Ready => "ready",
            Self::Error { .. } => "error",
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("list is not ready (currently {phase})")]
    NotReady { phase: &'static str },
    #[error("no reports selected")]
    InvalidSelection,
    #[error("failed to delete {} report(s)", failed.len())]
    BatchFailed { failed: Vec<ReportId> },
}

/// Outcome of a bulk delete where at least one id succeeded.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BulkDeleteReport {
    pub succeeded: Vec<ReportId>,
    /// Still selected afterwards, so they can be retried.
    pub failed: Vec<ReportId>,
}

/// Issued by [`ListController::begin_load`]; only the newest ticket may commit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadTicket {
    seq: u64,
}

/// Why the current page has no rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmptyHint {
    /// Nothing has been generated yet.
    NoReports,
    /// Reports exist but none match the search.
    NoMatches { term: String },
}

/// A report on the current page.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListRow {
    /// Running number across pages, starting at 1.
    pub number: usize,
    pub report: Report,
    pub selected: bool,
}

/// Snapshot handed to the rendering layer after every command.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListViewModel {
    pub phase: ListPhase,
    pub rows: Vec<ListRow>,
    pub total_filtered_count: usize,
    pub total_pages: usize,
    pub current_page: usize,
    pub selected_count: usize,
    pub search_term: String,
    pub empty_hint: Option<EmptyHint>,
    pub can_delete: bool,
    pub show_pagination: bool,
    pub notice: Option<String>,
}

pub struct ListController {
    backend: Arc<dyn ReportBackend>,
    user_no: u64,
    store: ReportStore,
    selection: Selection,
    phase: ListPhase,
    search_term: String,
    page: usize,
    notice: Option<String>,
    load_seq: u64,
}

impl ListController {
    pub fn new(backend: Arc<dyn ReportBackend>, user_no: u64) -> Self {
        Self {
            backend,
            user_no,
            store: ReportStore::new(),
            selection: Selection::new(),
            phase: ListPhase::Idle,
            search_term: String::new(),
            page: 1,
            notice: None,
            load_seq: 0,
        }
    }

    pub fn phase(&self) -> &ListPhase {
        &self.phase
    }

    pub fn store(&self) -> &ReportStore {
        &self.store
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Fetch, normalize and install the collection.
    pub async fn load(&mut self) -> ListViewModel {
        let ticket = self.begin_load();
        let result = self.backend.fetch_list(self.user_no).await;
        self.commit_load(ticket, result)
    }

    /// Reload after a failure. Rejected unless the list is in `Error`.
    pub async fn retry(&mut self) -> ListViewModel {
        if !matches!(self.phase, ListPhase::Error { .. }) {
            return self.reject("retry");
        }
        self.load().await
    }

    /// Enter `Loading` and issue a ticket. Any earlier ticket becomes stale.
    pub fn begin_load(&mut self) -> LoadTicket {
        self.load_seq += 1;
        self.phase = ListPhase::Loading;
        self.notice = None;
        LoadTicket { seq: self.load_seq }
    }

    /// Apply the result of a fetch started with `ticket`.
    ///
    /// Results from superseded loads are discarded. Records without an
    /// identifier are dropped. A transport failure leaves the previously
    /// loaded collection in place.
    pub fn commit_load(
        &mut self,
        ticket: LoadTicket,
        result: Result<Vec<RawRecord>, TransportError>,
    ) -> ListViewModel {
        if ticket.seq != self.load_seq {
            tracing::debug!(
                ticket = ticket.seq,
                latest = self.load_seq,
                "discarding superseded load"
            );
            return self.view_model();
        }

        match result {
            Ok(raw) => {
                let total = raw.len();
                let reports: Vec<Report> = raw
                    .iter()
                    .enumerate()
                    .filter_map(|(index, record)| match normalize(record, None) {
                        Ok(report) => Some(report),
                        Err(e) => {
                            tracing::warn!(index, error = %e, "dropping report");
                            None
                        }
                    })
                    .collect();
                let kept = reports.len();

                self.store.replace_all(reports);
                self.selection.clear();
                self.page = 1;
                self.phase = ListPhase::Ready;
                tracing::info!(total, kept, dropped = total - kept, "report list loaded");
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to load report list");
                self.phase = ListPhase::Error {
                    message: LOAD_FAILED.to_string(),
                };
            }
        }
        self.view_model()
    }

    /// Filter by title. Resets to the first page; selection is untouched.
    pub fn search(&mut self, term: &str) -> ListViewModel {
        if !self.is_ready() {
            return self.reject("search");
        }
        self.notice = None;
        self.search_term = term.to_string();
        self.page = 1;
        self.view_model()
    }

    /// Go to page `n`, clamped to the available pages.
    pub fn set_page(&mut self, n: usize) -> ListViewModel {
        if !self.is_ready() {
            return self.reject("set_page");
        }
        self.notice = None;
        self.page = n.clamp(1, self.total_pages());
        self.view_model()
    }

    /// Check or uncheck a report. Ids not in the collection are ignored.
    pub fn toggle_select(&mut self, id: &ReportId) -> ListViewModel {
        if !self.is_ready() {
            return self.reject("toggle_select");
        }
        self.notice = None;
        if self.store.contains(id) {
            self.selection.toggle(id);
        } else {
            tracing::debug!(%id, "ignoring selection of unknown report");
        }
        self.view_model()
    }

    /// Delete every selected report, one request per id, all in flight at once.
    ///
    /// Best effort: once every request has settled, ids that succeeded leave
    /// the collection and the selection shrinks to the ids that failed. If
    /// nothing succeeded the state is left as it was.
    pub async fn delete_selected(&mut self) -> Result<BulkDeleteReport, ListError> {
        if !self.is_ready() {
            tracing::debug!(action = "delete_selected", phase = self.phase.label(), "action rejected");
            return Err(ListError::NotReady {
                phase: self.phase.label(),
            });
        }
        if self.selection.is_empty() {
            self.notice = Some(NOTHING_SELECTED.to_string());
            return Err(ListError::InvalidSelection);
        }
        self.notice = None;

        let requested = self.selection.selected_ids();
        let mut pending: HashSet<ReportId> = requested.iter().cloned().collect();
        let mut join_set = tokio::task::JoinSet::new();

        for id in &requested {
            let backend = Arc::clone(&self.backend);
            let id = id.clone();
            join_set.spawn(async move {
                let result = backend.delete_one(&id).await;
                (id, result)
            });
        }

        let mut succeeded = HashSet::new();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((id, Ok(()))) => {
                    pending.remove(&id);
                    succeeded.insert(id);
                }
                Ok((id, Err(e))) => {
                    tracing::warn!(%id, error = %e, "failed to delete report");
                }
                Err(e) => {
                    tracing::warn!(error = %e, "delete task did not complete");
                }
            }
        }

        // Anything not confirmed, including tasks that panicked, counts as failed.
        let mut failed: Vec<ReportId> = pending.into_iter().collect();
        failed.sort();

        if succeeded.is_empty() {
            self.notice = Some(DELETE_FAILED.to_string());
            return Err(ListError::BatchFailed { failed });
        }

        let removed = self.store.remove_by_ids(&succeeded);
        self.selection.remove_all(&succeeded);
        self.selection.retain(|id| self.store.contains(id));
        self.page = self.page.clamp(1, self.total_pages());

        let mut succeeded: Vec<ReportId> = succeeded.into_iter().collect();
        succeeded.sort();

        self.notice = Some(if failed.is_empty() {
            format!("Deleted {} report(s).", succeeded.len())
        } else {
            format!(
                "Deleted {} report(s); {} failed.",
                succeeded.len(),
                failed.len()
            )
        });
        tracing::info!(
            removed,
            failed = failed.len(),
            "bulk delete finished"
        );

        Ok(BulkDeleteReport { succeeded, failed })
    }

    /// Current snapshot for rendering.
    pub fn view_model(&self) -> ListViewModel {
        let query = ViewQuery {
            search_term: self.search_term.clone(),
            page: self.page,
            page_size: PAGE_SIZE,
        };
        let view = self.store.view(&query).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "current page out of range, showing first page");
            self.store
                .view(&ViewQuery { page: 1, ..query })
                .unwrap_or(StoreView {
                    items: Vec::new(),
                    total_filtered_count: 0,
                    total_pages: 1,
                })
        });

        let offset = (self.page.min(view.total_pages) - 1) * PAGE_SIZE;
        let rows = view
            .items
            .into_iter()
            .enumerate()
            .map(|(i, report)| ListRow {
                number: offset + i + 1,
                selected: self.selection.is_selected(&report.id),
                report,
            })
            .collect();

        let empty_hint = if self.store.is_empty() {
            self.search_term.is_empty().then_some(EmptyHint::NoReports)
        } else if view.total_filtered_count == 0 {
            Some(EmptyHint::NoMatches {
                term: self.search_term.clone(),
            })
        } else {
            None
        };

        ListViewModel {
            phase: self.phase.clone(),
            rows,
            total_filtered_count: view.total_filtered_count,
            total_pages: view.total_pages,
            current_page: self.page.min(view.total_pages),
            selected_count: self.selection.selected_count(),
            search_term: self.search_term.clone(),
            empty_hint,
            can_delete: !self.selection.is_empty() && !self.store.is_empty(),
            show_pagination: view.total_filtered_count > 0 && view.total_pages > 1,
            notice: self.notice.clone(),
        }
    }

    fn is_ready(&self) -> bool {
        self.phase == ListPhase::Ready
    }

    fn total_pages(&self) -> usize {
        total_pages(self.store.filtered_count(&self.search_term), PAGE_SIZE)
    }

    fn reject(&self, action: &str) -> ListViewModel {
        tracing::debug!(action, phase = self.phase.label(), "action rejected");
        self.view_model()
    }
}
