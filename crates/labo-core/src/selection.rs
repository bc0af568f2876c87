use std::collections::BTreeSet;

use crate::ReportId;

/// Report ids checked for a bulk action. Independent of pagination.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    ids: BTreeSet<ReportId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select `id` if unselected, otherwise unselect it. Returns the new state.
    pub fn toggle(&mut self, id: &ReportId) -> bool {
        if self.ids.remove(id) {
            false
        } else {
            self.ids.insert(id.clone());
            true
        }
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn is_selected(&self, id: &ReportId) -> bool {
        self.ids.contains(id)
    }

    pub fn selected_count(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn selected_ids(&self) -> BTreeSet<ReportId> {
        self.ids.clone()
    }

    /// Keep only ids for which `keep` returns true.
    pub fn retain(&mut self, mut keep: impl FnMut(&ReportId) -> bool) {
        self.ids.retain(|id| keep(id));
    }

    /// Unselect every id in `ids`.
    pub fn remove_all<'a>(&mut self, ids: impl IntoIterator<Item = &'a ReportId>) {
        for id in ids {
            self.ids.remove(id);
        }
    }
}
