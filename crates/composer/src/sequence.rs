use catalog::Endpoint;
use serde::{Deserialize, Serialize};

use crate::{Slot, SlotId, SlotKind};

/// Strips every insertion placeholder and inserts one after each motif that is
/// followed by anything other than a transition, the landing slot, or the end
/// of the sequence. Pure and idempotent: placeholder ids are derived from the
/// motif they follow.
pub fn reconcile_placeholders(slots: &[Slot]) -> Vec<Slot> {
    let structural: Vec<&Slot> = slots.iter().filter(|s| !s.is_placeholder()).collect();
    let mut out = Vec::with_capacity(structural.len() * 2);
    for (idx, slot) in structural.iter().enumerate() {
        out.push((*slot).clone());
        if !slot.is_motif() {
            continue;
        }
        let needs_gap = match structural.get(idx + 1) {
            None => false,
            Some(next) => !(next.is_transition() || matches!(next.kind, SlotKind::Landing { .. })),
        };
        if needs_gap {
            out.push(Slot::placeholder_after(slot.id));
        }
    }
    out
}

/// Motif/transition pattern of the working sequence, sentinels excluded:
/// `M` motif, `T` transition, `+` insertion placeholder.
pub fn pattern(slots: &[Slot]) -> String {
    slots
        .iter()
        .filter_map(|s| match s.kind {
            SlotKind::Motif { .. } => Some('M'),
            SlotKind::Transition { .. } => Some('T'),
            SlotKind::InsertionPlaceholder => Some('+'),
            _ => None,
        })
        .collect()
}

/// `M ((T|+) M)*`, or nothing placed at all.
pub fn alternation_holds(slots: &[Slot]) -> bool {
    let pattern = pattern(slots);
    if pattern.is_empty() {
        return true;
    }
    pattern.chars().enumerate().all(|(i, c)| {
        if i % 2 == 0 {
            c == 'M'
        } else {
            c == 'T' || c == '+'
        }
    }) && pattern.len() % 2 == 1
}

/// Live footer order plus the reset snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SequenceState {
    slots: Vec<Slot>,
    snapshot: Vec<Slot>,
}

impl SequenceState {
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn snapshot(&self) -> &[Slot] {
        &self.snapshot
    }

    pub(crate) fn slots_mut(&mut self) -> &mut Vec<Slot> {
        &mut self.slots
    }

    pub(crate) fn capture_snapshot(&mut self) {
        self.snapshot = self.slots.clone();
    }

    pub(crate) fn restore_snapshot(&mut self) {
        self.slots = self.snapshot.clone();
    }

    pub(crate) fn reconcile(&mut self) {
        self.slots = reconcile_placeholders(&self.slots);
    }

    pub fn position(&self, id: SlotId) -> Option<usize> {
        self.slots.iter().position(|s| s.id == id)
    }

    pub fn get(&self, id: SlotId) -> Option<&Slot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub fn endpoint_position(&self, endpoint: Endpoint) -> Option<usize> {
        self.slots
            .iter()
            .position(|s| s.endpoint_kind() == Some(endpoint))
    }

    /// Current placeholders, left to right.
    pub fn placeholders(&self) -> Vec<SlotId> {
        self.slots
            .iter()
            .filter(|s| s.is_placeholder())
            .map(|s| s.id)
            .collect()
    }

    /// Placeholder sitting right after the given motif, if any.
    pub fn placeholder_after(&self, motif: SlotId) -> Option<SlotId> {
        let idx = self.position(motif)?;
        self.slots
            .get(idx + 1)
            .filter(|s| s.is_placeholder())
            .map(|s| s.id)
    }

    pub fn motif_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_motif()).count()
    }

    pub fn pattern(&self) -> String {
        pattern(&self.slots)
    }

    pub fn alternation_holds(&self) -> bool {
        alternation_holds(&self.slots)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use catalog::FileKey;

    fn motif(key: &str) -> Slot {
        Slot::motif(FileKey::new(key))
    }

    fn transition(key: &str) -> Slot {
        Slot::transition(FileKey::new(key))
    }

    #[test]
    fn placeholder_only_between_adjacent_motifs() {
        let slots = vec![
            Slot::endpoint(Endpoint::Takeoff),
            motif("a"),
            motif("b"),
            transition("t"),
            motif("c"),
            Slot::endpoint(Endpoint::Landing),
        ];
        let out = reconcile_placeholders(&slots);
        assert_eq!(pattern(&out), "M+MTM");
        assert_eq!(out[2].id, Slot::placeholder_after(slots[1].id).id);
    }

    #[test]
    fn no_placeholder_at_end_of_sequence() {
        let out = reconcile_placeholders(&[motif("a")]);
        assert_eq!(pattern(&out), "M");
    }

    #[test]
    fn stale_placeholders_are_stripped() {
        let a = motif("a");
        let slots = vec![
            Slot::placeholder_after(a.id),
            a.clone(),
            transition("t"),
            Slot::placeholder_after(a.id),
            motif("b"),
        ];
        let out = reconcile_placeholders(&slots);
        assert_eq!(pattern(&out), "MTM");
    }

    #[test]
    fn reconcile_is_idempotent() {
        let slots = vec![motif("a"), motif("b"), motif("c"), transition("t")];
        let once = reconcile_placeholders(&slots);
        let twice = reconcile_placeholders(&once);
        assert_eq!(once, twice);
    }

    #[test]
    fn alternation_check() {
        assert!(alternation_holds(&[]));
        assert!(alternation_holds(&[motif("a")]));
        assert!(alternation_holds(&reconcile_placeholders(&[motif("a"), motif("b")])));
        assert!(!alternation_holds(&[motif("a"), transition("t")]));
        assert!(!alternation_holds(&[transition("t"), motif("a")]));
        assert!(!alternation_holds(&[motif("a"), transition("t"), transition("u"), motif("b")]));
    }
}
