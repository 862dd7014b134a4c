use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::{CatalogRecord, FileKey, RecordKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    PlanesAsc,
    PlanesDesc,
    DateAsc,
    DateDesc,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum Filter {
    #[default]
    All,
    Planes(u32),
    Season(String),
    Category(String),
    Popularity(String),
}

impl Filter {
    pub fn matches(&self, record: &CatalogRecord) -> bool {
        match self {
            Filter::All => true,
            Filter::Planes(n) => record.plane_count == Some(*n),
            Filter::Season(s) => record.season.as_deref() == Some(s.as_str()),
            Filter::Category(c) => record.category.as_deref() == Some(c.as_str()),
            Filter::Popularity(p) => record.popularity.as_deref() == Some(p.as_str()),
        }
    }
}

/// Plane counts that are not numbers sort as 0.
fn plane_key(record: &CatalogRecord) -> i64 {
    record.plane_count.map(i64::from).unwrap_or(0)
}

/// Days since the Unix epoch; unparseable dates sort as the epoch itself.
fn date_key(record: &CatalogRecord) -> i64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default();
    record
        .date
        .map(|d| d.signed_duration_since(epoch).num_days())
        .unwrap_or(0)
}

/// Stable sort of record indices.
pub fn sort_indices(records: &[CatalogRecord], indices: &mut [usize], key: SortKey) {
    match key {
        SortKey::PlanesAsc => indices.sort_by_key(|&i| plane_key(&records[i])),
        SortKey::PlanesDesc => {
            indices.sort_by(|&a, &b| plane_key(&records[b]).cmp(&plane_key(&records[a])))
        }
        SortKey::DateAsc => indices.sort_by_key(|&i| date_key(&records[i])),
        SortKey::DateDesc => {
            indices.sort_by(|&a, &b| date_key(&records[b]).cmp(&date_key(&records[a])))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct ProbeProgress {
    found: Vec<Option<bool>>,
    resolved: usize,
}

impl ProbeProgress {
    fn complete(&self) -> bool {
        self.resolved == self.found.len()
    }
}

/// Loaded catalog plus the picker grid's display state. The canonical record
/// order never changes; sorting and filtering only affect [`visible`].
///
/// [`visible`]: CatalogState::visible
#[derive(Debug, Clone, Default)]
pub struct CatalogState {
    motifs: Vec<CatalogRecord>,
    transitions: Vec<CatalogRecord>,
    sort: Option<SortKey>,
    pending_sort: Option<SortKey>,
    filter: Filter,
    probe: Option<ProbeProgress>,
}

impl CatalogState {
    pub fn new(motifs: Vec<CatalogRecord>, transitions: Vec<CatalogRecord>) -> Self {
        Self {
            motifs,
            transitions,
            ..Self::default()
        }
    }

    pub fn motifs(&self) -> &[CatalogRecord] {
        &self.motifs
    }

    pub fn transitions(&self) -> &[CatalogRecord] {
        &self.transitions
    }

    pub fn lookup(&self, kind: RecordKind, key: &FileKey) -> Option<&CatalogRecord> {
        let records = match kind {
            RecordKind::Motif => &self.motifs,
            RecordKind::Transition => &self.transitions,
        };
        records.iter().find(|r| &r.file_key == key)
    }

    pub fn sort(&self) -> Option<SortKey> {
        self.sort
    }

    pub fn pending_sort(&self) -> Option<SortKey> {
        self.pending_sort
    }

    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Starts the existence barrier: until every motif icon has been probed,
    /// unresolved records stay hidden and sort requests are deferred.
    pub fn begin_probe(&mut self) {
        self.probe = Some(ProbeProgress {
            found: vec![None; self.motifs.len()],
            resolved: 0,
        });
        debug!(expected = self.motifs.len(), "asset probe started");
    }

    /// Records one probe result, in any order. Returns `true` when this
    /// result completed the barrier.
    pub fn record_probe(&mut self, index: usize, found: bool) -> bool {
        let Some(progress) = self.probe.as_mut() else {
            return false;
        };
        let Some(slot) = progress.found.get_mut(index) else {
            warn!(index, "probe result for unknown record");
            return false;
        };
        if slot.is_some() {
            return false;
        }
        *slot = Some(found);
        progress.resolved += 1;
        if !found {
            if let Some(record) = self.motifs.get(index) {
                warn!(file_key = %record.file_key, "motif icon missing, hiding record");
            }
        }
        if progress.complete() {
            if let Some(key) = self.pending_sort.take() {
                debug!(?key, "applying deferred sort");
                self.sort = Some(key);
            }
            return true;
        }
        false
    }

    pub fn probes_complete(&self) -> bool {
        self.probe.as_ref().map_or(true, ProbeProgress::complete)
    }

    /// Applies the sort now when probing has finished, otherwise parks it
    /// until the last probe resolves.
    pub fn request_sort(&mut self, key: SortKey) {
        if self.probes_complete() {
            self.sort = Some(key);
            self.pending_sort = None;
        } else {
            debug!(?key, "sort deferred until asset probe completes");
            self.pending_sort = Some(key);
        }
    }

    pub fn set_filter(&mut self, filter: Filter) {
        self.filter = filter;
    }

    pub fn clear_display(&mut self) {
        self.sort = None;
        self.pending_sort = None;
        self.filter = Filter::All;
    }

    fn is_available(&self, index: usize) -> bool {
        match &self.probe {
            None => true,
            Some(progress) => progress.found.get(index).copied().flatten() == Some(true),
        }
    }

    /// Motif records as the picker grid shows them right now.
    pub fn visible(&self) -> Vec<&CatalogRecord> {
        let mut indices: Vec<usize> = (0..self.motifs.len())
            .filter(|&i| self.is_available(i) && self.filter.matches(&self.motifs[i]))
            .collect();
        if let Some(key) = self.sort {
            sort_indices(&self.motifs, &mut indices, key);
        }
        indices.into_iter().map(|i| &self.motifs[i]).collect()
    }
}
