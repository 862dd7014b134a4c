use catalog::{CatalogRecord, CatalogState, Endpoint, EndpointOptions, FileKey, RecordKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{ComposerError, SequenceState, Slot, SlotId, SlotKind};

/// Lifecycle notifications for presentation glue. Animations react to these
/// after the state change; they never gate it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ComposerEvent {
    /// Cosmetic pulse on a newly placed or newly selected slot.
    Added { slot: SlotId },
    Cancelled { slot: SlotId },
    Swapped { dragged: SlotId, target: SlotId },
    SelectionChanged {
        endpoint: Endpoint,
        selection: Option<String>,
    },
    Reset,
    ExportStarted,
    ExportFinished,
}

/// Read-only copy of the footer handed to an exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportSnapshot {
    pub slots: Vec<Slot>,
}

/// Owns the footer sequence and the catalog it draws from. All operations
/// run to completion; a rejected operation leaves the sequence untouched.
#[derive(Debug, Clone, Default)]
pub struct Composer {
    state: SequenceState,
    catalog: CatalogState,
    options: EndpointOptions,
    events: Vec<ComposerEvent>,
    export_in_flight: bool,
}

impl Composer {
    pub fn new(catalog: CatalogState) -> Self {
        Self {
            catalog,
            ..Self::default()
        }
    }

    pub fn state(&self) -> &SequenceState {
        &self.state
    }

    pub fn slots(&self) -> &[Slot] {
        self.state.slots()
    }

    pub fn catalog(&self) -> &CatalogState {
        &self.catalog
    }

    pub fn catalog_mut(&mut self) -> &mut CatalogState {
        &mut self.catalog
    }

    pub fn options(&self) -> &EndpointOptions {
        &self.options
    }

    pub fn is_exporting(&self) -> bool {
        self.export_in_flight
    }

    pub fn drain_events(&mut self) -> Vec<ComposerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Places the takeoff and landing sentinels, dropping any left over from
    /// an earlier call, and captures the reset snapshot.
    pub fn initialize(&mut self, options: EndpointOptions) {
        let slots = self.state.slots_mut();
        slots.retain(|s| !s.is_sentinel());
        slots.insert(0, Slot::endpoint(Endpoint::Takeoff));
        slots.push(Slot::endpoint(Endpoint::Landing));
        self.options = options;
        self.state.reconcile();
        self.state.capture_snapshot();
        info!(slots = self.state.slots().len(), "footer initialized");
    }

    /// Re-takes the reset snapshot, e.g. after pre-populating the footer.
    pub fn capture_snapshot(&mut self) {
        self.state.capture_snapshot();
    }

    fn ensure_editable(&self) -> Result<(), ComposerError> {
        if self.export_in_flight {
            return Err(ComposerError::ExportInFlight);
        }
        Ok(())
    }

    fn expect_kind(record: &CatalogRecord, expected: RecordKind) -> Result<(), ComposerError> {
        if record.kind != expected {
            return Err(ComposerError::WrongRecordKind {
                expected,
                actual: record.kind,
            });
        }
        Ok(())
    }

    /// Inserts a motif just before the landing slot.
    pub fn add_motif(&mut self, record: &CatalogRecord) -> Result<SlotId, ComposerError> {
        self.ensure_editable()?;
        Self::expect_kind(record, RecordKind::Motif)?;
        let landing = self
            .state
            .endpoint_position(Endpoint::Landing)
            .ok_or(ComposerError::NotInitialized)?;
        let slot = Slot::motif(record.file_key.clone());
        let id = slot.id;
        self.state.slots_mut().insert(landing, slot);
        self.state.reconcile();
        self.events.push(ComposerEvent::Added { slot: id });
        debug!(file_key = %record.file_key, slot = %id, "motif added");
        Ok(id)
    }

    pub fn add_motif_by_key(&mut self, key: &FileKey) -> Result<SlotId, ComposerError> {
        let record = self
            .catalog
            .lookup(RecordKind::Motif, key)
            .cloned()
            .ok_or_else(|| ComposerError::UnknownRecord(RecordKind::Motif, key.clone()))?;
        self.add_motif(&record)
    }

    /// Replaces a placeholder with a transition in place. The placeholder must
    /// still exist; callers holding an old reference get `StalePlaceholder`.
    pub fn add_transition(
        &mut self,
        record: &CatalogRecord,
        at_placeholder: SlotId,
    ) -> Result<SlotId, ComposerError> {
        self.ensure_editable()?;
        Self::expect_kind(record, RecordKind::Transition)?;
        let idx = self
            .state
            .slots()
            .iter()
            .position(|s| s.id == at_placeholder && s.is_placeholder())
            .ok_or(ComposerError::StalePlaceholder(at_placeholder))?;
        let slot = Slot::transition(record.file_key.clone());
        let id = slot.id;
        self.state.slots_mut()[idx] = slot;
        self.state.reconcile();
        self.events.push(ComposerEvent::Added { slot: id });
        debug!(file_key = %record.file_key, slot = %id, "transition added");
        Ok(id)
    }

    pub fn add_transition_by_key(
        &mut self,
        key: &FileKey,
        at_placeholder: SlotId,
    ) -> Result<SlotId, ComposerError> {
        let record = self
            .catalog
            .lookup(RecordKind::Transition, key)
            .cloned()
            .ok_or_else(|| ComposerError::UnknownRecord(RecordKind::Transition, key.clone()))?;
        self.add_transition(&record, at_placeholder)
    }

    /// Removes a motif or transition, or clears a sentinel's selection.
    /// Removing a motif never repairs the transitions around it.
    pub fn cancel(&mut self, slot: SlotId) -> Result<(), ComposerError> {
        self.ensure_editable()?;
        let idx = self
            .state
            .position(slot)
            .ok_or(ComposerError::SlotNotFound(slot))?;
        let target = &self.state.slots()[idx];
        if target.is_placeholder() {
            return Err(ComposerError::NotCancellable(slot));
        }
        if let Some(endpoint) = target.endpoint_kind() {
            if let SlotKind::Takeoff { selection } | SlotKind::Landing { selection } =
                &mut self.state.slots_mut()[idx].kind
            {
                *selection = None;
            }
            self.events.push(ComposerEvent::SelectionChanged {
                endpoint,
                selection: None,
            });
        } else {
            self.state.slots_mut().remove(idx);
            self.state.reconcile();
        }
        self.events.push(ComposerEvent::Cancelled { slot });
        debug!(slot = %slot, "slot cancelled");
        Ok(())
    }

    /// Sets the picker choice on the takeoff or landing sentinel.
    pub fn select_endpoint(&mut self, endpoint: Endpoint, name: &str) -> Result<(), ComposerError> {
        self.ensure_editable()?;
        let option = self
            .options
            .find(endpoint, name)
            .cloned()
            .ok_or_else(|| ComposerError::UnknownOption {
                endpoint,
                name: name.to_string(),
            })?;
        let idx = self
            .state
            .endpoint_position(endpoint)
            .ok_or(ComposerError::NotInitialized)?;
        let slot = &mut self.state.slots_mut()[idx];
        let id = slot.id;
        if let SlotKind::Takeoff { selection } | SlotKind::Landing { selection } = &mut slot.kind {
            *selection = Some(option);
        }
        self.events.push(ComposerEvent::SelectionChanged {
            endpoint,
            selection: Some(name.to_string()),
        });
        self.events.push(ComposerEvent::Added { slot: id });
        Ok(())
    }

    pub fn select_takeoff(&mut self, name: &str) -> Result<(), ComposerError> {
        self.select_endpoint(Endpoint::Takeoff, name)
    }

    pub fn select_landing(&mut self, name: &str) -> Result<(), ComposerError> {
        self.select_endpoint(Endpoint::Landing, name)
    }

    pub fn reconcile_placeholders(&mut self) {
        self.state.reconcile();
    }

    /// Swap-style drag and drop: motifs trade places with motifs, transitions
    /// with transitions. Anything else is rejected without touching state.
    pub fn reorder(&mut self, dragged: SlotId, target: SlotId) -> Result<(), ComposerError> {
        self.ensure_editable()?;
        let from = self
            .state
            .position(dragged)
            .ok_or(ComposerError::SlotNotFound(dragged))?;
        let to = self
            .state
            .position(target)
            .ok_or(ComposerError::SlotNotFound(target))?;
        let slots = self.state.slots();
        let eligible = (slots[from].is_motif() && slots[to].is_motif())
            || (slots[from].is_transition() && slots[to].is_transition());
        if !eligible {
            debug!(%dragged, %target, "swap rejected");
            return Err(ComposerError::IneligibleSwap { dragged, target });
        }
        if from == to {
            return Ok(());
        }
        self.state.slots_mut().swap(from, to);
        self.state.reconcile();
        self.events.push(ComposerEvent::Swapped { dragged, target });
        Ok(())
    }

    /// Drops every edit since the snapshot and clears the grid's sort and filter.
    pub fn reset_to_original(&mut self) -> Result<(), ComposerError> {
        self.ensure_editable()?;
        self.state.restore_snapshot();
        self.catalog.clear_display();
        self.events.push(ComposerEvent::Reset);
        info!("footer reset to original order");
        Ok(())
    }

    /// Freezes structural edits and hands out the sequence to export. Fails
    /// before any work starts when no motif has been placed.
    pub fn begin_export(&mut self) -> Result<ExportSnapshot, ComposerError> {
        self.ensure_editable()?;
        if self.state.motif_count() == 0 {
            return Err(ComposerError::NothingToExport);
        }
        self.export_in_flight = true;
        self.events.push(ComposerEvent::ExportStarted);
        Ok(ExportSnapshot {
            slots: self.state.slots().to_vec(),
        })
    }

    /// Re-enables edits. Call on both the success and the failure path.
    pub fn finish_export(&mut self) {
        if self.export_in_flight {
            self.export_in_flight = false;
            self.events.push(ComposerEvent::ExportFinished);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::Dimensions;

    fn record(kind: RecordKind, key: &str) -> CatalogRecord {
        CatalogRecord {
            kind,
            id: "-".into(),
            name: key.into(),
            plane_count: None,
            comment: "-".into(),
            file_key: FileKey::new(key),
            dimensions: Dimensions::default(),
            date: None,
            season: None,
            category: None,
            popularity: None,
        }
    }

    fn composer() -> Composer {
        let mut c = Composer::new(CatalogState::new(
            vec![record(RecordKind::Motif, "a"), record(RecordKind::Motif, "b")],
            vec![record(RecordKind::Transition, "t")],
        ));
        c.initialize(EndpointOptions::default());
        c
    }

    #[test]
    fn initialize_is_idempotent() {
        let mut c = composer();
        c.add_motif_by_key(&FileKey::new("a")).unwrap();
        c.initialize(EndpointOptions::default());
        let slots = c.slots();
        assert_eq!(slots.iter().filter(|s| s.is_sentinel()).count(), 2);
        assert_eq!(slots.first().unwrap().endpoint_kind(), Some(Endpoint::Takeoff));
        assert_eq!(slots.last().unwrap().endpoint_kind(), Some(Endpoint::Landing));
        assert_eq!(c.state().pattern(), "M");
    }

    #[test]
    fn add_motif_requires_initialize() {
        let mut c = Composer::new(CatalogState::default());
        let err = c.add_motif(&record(RecordKind::Motif, "a")).unwrap_err();
        assert_eq!(err, ComposerError::NotInitialized);
    }

    #[test]
    fn add_motif_rejects_transition_records() {
        let mut c = composer();
        let err = c.add_motif(&record(RecordKind::Transition, "t")).unwrap_err();
        assert!(matches!(err, ComposerError::WrongRecordKind { .. }));
        assert_eq!(c.state().pattern(), "");
    }

    #[test]
    fn add_motif_emits_pulse() {
        let mut c = composer();
        let id = c.add_motif_by_key(&FileKey::new("a")).unwrap();
        assert_eq!(c.drain_events(), vec![ComposerEvent::Added { slot: id }]);
        assert!(c.drain_events().is_empty());
    }

    #[test]
    fn unknown_record_key_is_rejected() {
        let mut c = composer();
        let err = c.add_motif_by_key(&FileKey::new("zzz")).unwrap_err();
        assert_eq!(err, ComposerError::UnknownRecord(RecordKind::Motif, FileKey::new("zzz")));
    }

    #[test]
    fn stale_placeholder_is_a_no_op() {
        let mut c = composer();
        let a = c.add_motif_by_key(&FileKey::new("a")).unwrap();
        let b = c.add_motif_by_key(&FileKey::new("b")).unwrap();
        let gap = c.state().placeholders()[0];
        c.reorder(a, b).unwrap();
        // the gap now follows b, so the old reference is gone
        let before = c.slots().to_vec();
        let err = c.add_transition_by_key(&FileKey::new("t"), gap).unwrap_err();
        assert_eq!(err, ComposerError::StalePlaceholder(gap));
        assert_eq!(c.slots(), before.as_slice());
    }

    #[test]
    fn placeholder_cannot_be_cancelled() {
        let mut c = composer();
        c.add_motif_by_key(&FileKey::new("a")).unwrap();
        c.add_motif_by_key(&FileKey::new("b")).unwrap();
        let gap = c.state().placeholders()[0];
        assert_eq!(c.cancel(gap), Err(ComposerError::NotCancellable(gap)));
    }

    #[test]
    fn cancel_sentinel_clears_selection_only() {
        let mut c = composer();
        c.select_endpoint(Endpoint::Takeoff, "Rainbow").unwrap();
        let takeoff = c.slots()[0].clone();
        assert!(matches!(&takeoff.kind, SlotKind::Takeoff { selection: Some(o) } if o.name == "Rainbow"));

        c.cancel(takeoff.id).unwrap();
        assert_eq!(c.slots()[0].id, takeoff.id);
        assert_eq!(c.slots()[0].kind, SlotKind::Takeoff { selection: None });
        assert_eq!(c.slots().len(), 2);
    }

    #[test]
    fn unknown_endpoint_option_is_rejected() {
        let mut c = composer();
        let err = c.select_endpoint(Endpoint::Landing, "Confetti").unwrap_err();
        assert!(matches!(err, ComposerError::UnknownOption { endpoint: Endpoint::Landing, .. }));
    }

    #[test]
    fn sentinels_are_not_draggable() {
        let mut c = composer();
        let a = c.add_motif_by_key(&FileKey::new("a")).unwrap();
        let landing = c.slots().last().unwrap().id;
        let before = c.slots().to_vec();
        assert!(matches!(c.reorder(a, landing), Err(ComposerError::IneligibleSwap { .. })));
        assert!(matches!(c.reorder(landing, a), Err(ComposerError::IneligibleSwap { .. })));
        assert_eq!(c.slots(), before.as_slice());
    }

    #[test]
    fn reset_clears_display_keys() {
        let mut c = composer();
        c.catalog_mut().request_sort(catalog::SortKey::PlanesAsc);
        c.catalog_mut().set_filter(catalog::Filter::Planes(100));
        c.reset_to_original().unwrap();
        assert_eq!(c.catalog().sort(), None);
        assert_eq!(c.catalog().filter(), &catalog::Filter::All);
    }

    #[test]
    fn export_blocks_edits_until_finished() {
        let mut c = composer();
        assert_eq!(c.begin_export(), Err(ComposerError::NothingToExport));
        assert!(!c.is_exporting());

        let a = c.add_motif_by_key(&FileKey::new("a")).unwrap();
        let snapshot = c.begin_export().unwrap();
        assert_eq!(snapshot.slots, c.slots().to_vec());

        assert_eq!(c.add_motif_by_key(&FileKey::new("b")), Err(ComposerError::ExportInFlight));
        assert_eq!(c.cancel(a), Err(ComposerError::ExportInFlight));
        assert_eq!(c.reset_to_original(), Err(ComposerError::ExportInFlight));
        assert_eq!(c.begin_export(), Err(ComposerError::ExportInFlight));

        c.finish_export();
        assert!(c.cancel(a).is_ok());
        let events = c.drain_events();
        assert!(events.contains(&ComposerEvent::ExportStarted));
        assert!(events.contains(&ComposerEvent::ExportFinished));
    }
}
