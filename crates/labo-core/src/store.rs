//! Authoritative in-memory report list and its derived views.

use std::cmp::Ordering;
use std::collections::HashSet;

use thiserror::Error;

use crate::{Report, ReportId};

/// Reports shown per page.
pub const PAGE_SIZE: usize = 5;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("page {page} is out of range (1..={total_pages}, page size {page_size})")]
    InvalidPage {
        page: usize,
        total_pages: usize,
        page_size: usize,
    },
}

/// Parameters for [`ReportStore::view`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub search_term: String,
    /// 1-based.
    pub page: usize,
    pub page_size: usize,
}

impl Default for ViewQuery {
    fn default() -> Self {
        Self {
            search_term: String::new(),
            page: 1,
            page_size: PAGE_SIZE,
        }
    }
}

/// One page of the sorted, filtered collection.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreView {
    pub items: Vec<Report>,
    pub total_filtered_count: usize,
    pub total_pages: usize,
}

/// `max(1, ceil(count / page_size))`.
pub fn total_pages(count: usize, page_size: usize) -> usize {
    if page_size == 0 {
        return 1;
    }
    count.div_ceil(page_size).max(1)
}

/// Newest first; undated reports after every dated one; ties broken by
/// numeric id, highest first.
pub fn newest_first(a: &Report, b: &Report) -> Ordering {
    let by_date = match (a.date, b.date) {
        (Some(da), Some(db)) => db.cmp(&da),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_date
        .then_with(|| b.id.sort_key().total_cmp(&a.id.sort_key()))
        .then_with(|| b.id.cmp(&a.id))
}

/// Whether `report`'s title contains `term`, ignoring case. An empty term
/// matches everything.
pub fn title_matches(report: &Report, term: &str) -> bool {
    term.is_empty() || report.title.to_lowercase().contains(&term.to_lowercase())
}

/// Holds the normalized reports, kept in display order.
#[derive(Debug, Clone, Default)]
pub struct ReportStore {
    reports: Vec<Report>,
}

impl ReportStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Swap in a new collection. Nothing else is reset.
    pub fn replace_all(&mut self, mut reports: Vec<Report>) {
        reports.sort_by(newest_first);
        self.reports = reports;
    }

    /// Remove every report whose id is in `ids`. Returns how many were removed.
    pub fn remove_by_ids(&mut self, ids: &HashSet<ReportId>) -> usize {
        let before = self.reports.len();
        self.reports.retain(|r| !ids.contains(&r.id));
        before - self.reports.len()
    }

    pub fn len(&self) -> usize {
        self.reports.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reports.is_empty()
    }

    pub fn contains(&self, id: &ReportId) -> bool {
        self.reports.iter().any(|r| &r.id == id)
    }

    /// All reports in display order.
    pub fn reports(&self) -> &[Report] {
        &self.reports
    }

    /// Number of reports matching `search_term`.
    pub fn filtered_count(&self, search_term: &str) -> usize {
        self.reports
            .iter()
            .filter(|r| title_matches(r, search_term))
            .count()
    }

    /// Sorted, filtered and paginated view.
    ///
    /// The page is not clamped: a page outside `1..=total_pages` is an error.
    pub fn view(&self, query: &ViewQuery) -> Result<StoreView, StoreError> {
        let filtered: Vec<&Report> = self
            .reports
            .iter()
            .filter(|r| title_matches(r, &query.search_term))
            .collect();

        let total_filtered_count = filtered.len();
        let total_pages = total_pages(total_filtered_count, query.page_size);

        if query.page_size == 0 || query.page == 0 || query.page > total_pages {
            return Err(StoreError::InvalidPage {
                page: query.page,
                total_pages,
                page_size: query.page_size,
            });
        }

        let items = filtered
            .into_iter()
            .skip((query.page - 1) * query.page_size)
            .take(query.page_size)
            .cloned()
            .collect();

        Ok(StoreView {
            items,
            total_filtered_count,
            total_pages,
        })
    }
}
