use std::collections::BTreeMap;

use serde::Serialize;

use crate::domain::approval::RequestStatus;
use crate::domain::request::RequestListEntry;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestQuery {
    pub status: Option<RequestStatus>,
    pub search: Option<String>,
}

/// Which status a listing filters and tallies on. My-requests uses the live
/// status; wing history uses the final outcome, falling back to the live
/// status while a request is still open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum StatusBasis {
    #[default]
    Current,
    Final,
}

impl StatusBasis {
    pub fn status_of(self, entry: &RequestListEntry) -> &RequestStatus {
        match self {
            Self::Current => &entry.current_status,
            Self::Final => entry.final_status.as_ref().unwrap_or(&entry.current_status),
        }
    }
}

impl RequestQuery {
    pub fn matches(&self, entry: &RequestListEntry, basis: StatusBasis) -> bool {
        if let Some(status) = &self.status {
            if basis.status_of(entry) != status {
                return false;
            }
        }

        let Some(needle) = self.search.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
            return true;
        };
        let needle = needle.to_lowercase();
        let hit = |field: &str| field.to_lowercase().contains(&needle);

        [
            entry.request_id.as_str(),
            entry.title.as_str(),
            entry.description.as_deref().unwrap_or_default(),
            entry.requester_name.as_str(),
            entry.request_type.as_str(),
        ]
        .into_iter()
        .any(hit)
            || entry.items.iter().any(|item| hit(&item.item_name))
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct StatusTally {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
}

impl StatusTally {
    pub fn count(&self, status: &RequestStatus) -> usize {
        self.by_status.get(status.as_str()).copied().unwrap_or(0)
    }
}

/// Applies the query and orders the remaining entries newest first.
pub fn filter_requests(
    entries: &[RequestListEntry],
    query: &RequestQuery,
    basis: StatusBasis,
) -> Vec<RequestListEntry> {
    let mut matched: Vec<RequestListEntry> =
        entries.iter().filter(|entry| query.matches(entry, basis)).cloned().collect();
    matched.sort_by(|left, right| right.submitted_at.cmp(&left.submitted_at));
    matched
}

pub fn tally_statuses(entries: &[RequestListEntry], basis: StatusBasis) -> StatusTally {
    let mut tally = StatusTally { total: entries.len(), ..StatusTally::default() };
    for entry in entries {
        *tally.by_status.entry(basis.status_of(entry).as_str().to_string()).or_default() += 1;
    }
    tally
}
