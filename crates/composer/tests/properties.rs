//! Footer composer behaviour: alternation, reconciliation, swaps, reset.
use catalog::{
    CatalogRecord, CatalogState, Dimensions, Endpoint, EndpointOptions, FileKey, RecordKind,
};
use composer::*;

fn record(kind: RecordKind, key: &str) -> CatalogRecord {
    CatalogRecord {
        kind,
        id: "-".to_string(),
        name: key.to_string(),
        plane_count: None,
        comment: "-".to_string(),
        file_key: FileKey::new(key),
        dimensions: Dimensions::default(),
        date: None,
        season: None,
        category: None,
        popularity: None,
    }
}

fn motif(key: &str) -> CatalogRecord {
    record(RecordKind::Motif, key)
}

fn transition(key: &str) -> CatalogRecord {
    record(RecordKind::Transition, key)
}

fn fresh() -> Composer {
    let mut c = Composer::new(CatalogState::default());
    c.initialize(EndpointOptions::default());
    c
}

fn keys(c: &Composer) -> Vec<String> {
    c.slots()
        .iter()
        .map(|s| match &s.kind {
            SlotKind::Motif { file_key } | SlotKind::Transition { file_key } => {
                file_key.to_string()
            }
            SlotKind::Takeoff { .. } => "Takeoff".to_string(),
            SlotKind::Landing { .. } => "Landing".to_string(),
            SlotKind::InsertionPlaceholder => "+".to_string(),
        })
        .collect()
}

/// Small deterministic generator so the operation mix is reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self, bound: usize) -> usize {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        ((self.0 >> 33) as usize) % bound.max(1)
    }
}

/// A motif cancel keeps the structure only when no transition touches it.
fn cancel_keeps_structure(slots: &[Slot], idx: usize) -> bool {
    if slots[idx].is_transition() {
        return true;
    }
    let structural: Vec<&Slot> = slots.iter().filter(|s| !s.is_placeholder()).collect();
    let pos = structural
        .iter()
        .position(|s| s.id == slots[idx].id)
        .unwrap();
    let prev_t = pos > 0 && structural[pos - 1].is_transition();
    let next_t = structural.get(pos + 1).map_or(false, |s| s.is_transition());
    !prev_t && !next_t
}

#[test]
fn alternation_survives_mixed_operations() {
    for seed in 1..=40u64 {
        let mut rng = Lcg(seed);
        let mut c = fresh();
        for step in 0..60 {
            match rng.next(3) {
                0 => {
                    c.add_motif(&motif(&format!("m{step}"))).unwrap();
                }
                1 => {
                    let gaps = c.state().placeholders();
                    if !gaps.is_empty() {
                        let at = gaps[rng.next(gaps.len())];
                        c.add_transition(&transition(&format!("t{step}")), at).unwrap();
                    }
                }
                _ => {
                    let candidates: Vec<usize> = c
                        .slots()
                        .iter()
                        .enumerate()
                        .filter(|(i, s)| s.is_draggable() && cancel_keeps_structure(c.slots(), *i))
                        .map(|(i, _)| i)
                        .collect();
                    if !candidates.is_empty() {
                        let idx = candidates[rng.next(candidates.len())];
                        let id = c.slots()[idx].id;
                        c.cancel(id).unwrap();
                    }
                }
            }
            assert!(
                c.state().alternation_holds(),
                "seed {seed} step {step}: {}",
                c.state().pattern()
            );
        }
    }
}

#[test]
fn reconcile_twice_equals_once() {
    let mut c = fresh();
    for key in ["a", "b", "c"] {
        c.add_motif(&motif(key)).unwrap();
    }
    let gap = c.state().placeholders()[1];
    c.add_transition(&transition("t"), gap).unwrap();

    c.reconcile_placeholders();
    let once = c.slots().to_vec();
    c.reconcile_placeholders();
    assert_eq!(c.slots(), once.as_slice());
}

#[test]
fn swapping_twice_restores_order() {
    let mut c = fresh();
    let a = c.add_motif(&motif("a")).unwrap();
    c.add_motif(&motif("b")).unwrap();
    let d = c.add_motif(&motif("d")).unwrap();
    let before = keys(&c);

    c.reorder(a, d).unwrap();
    assert_eq!(keys(&c), ["Takeoff", "d", "+", "b", "+", "a", "Landing"]);
    c.reorder(a, d).unwrap();
    assert_eq!(keys(&c), before);
}

#[test]
fn transitions_swap_with_transitions() {
    let mut c = fresh();
    for key in ["a", "b", "c"] {
        c.add_motif(&motif(key)).unwrap();
    }
    let first_gap = c.state().placeholders()[0];
    let t1 = c.add_transition(&transition("t1"), first_gap).unwrap();
    let second_gap = c.state().placeholders()[0];
    let t2 = c.add_transition(&transition("t2"), second_gap).unwrap();

    c.reorder(t1, t2).unwrap();
    assert_eq!(keys(&c), ["Takeoff", "a", "t2", "b", "t1", "c", "Landing"]);
}

#[test]
fn motif_and_transition_never_swap() {
    let mut c = fresh();
    let a = c.add_motif(&motif("a")).unwrap();
    c.add_motif(&motif("b")).unwrap();
    let gap = c.state().placeholders()[0];
    let t = c.add_transition(&transition("t"), gap).unwrap();
    let before = c.slots().to_vec();

    assert!(matches!(c.reorder(a, t), Err(ComposerError::IneligibleSwap { .. })));
    assert!(matches!(c.reorder(t, a), Err(ComposerError::IneligibleSwap { .. })));
    assert_eq!(c.slots(), before.as_slice());
}

#[test]
fn reset_restores_initialize_snapshot() {
    let mut c = fresh();
    c.select_endpoint(Endpoint::Takeoff, "Rainbow").unwrap();
    let snapshot = c.state().snapshot().to_vec();

    let a = c.add_motif(&motif("a")).unwrap();
    c.add_motif(&motif("b")).unwrap();
    let gap = c.state().placeholders()[0];
    c.add_transition(&transition("t"), gap).unwrap();
    c.cancel(a).unwrap();
    c.select_landing("Unlit").unwrap();

    c.reset_to_original().unwrap();
    assert_eq!(c.slots(), snapshot.as_slice());
    assert!(c.drain_events().contains(&ComposerEvent::Reset));
}

#[test]
fn placing_a_transition_fills_the_gap() {
    let mut c = fresh();
    let a = c.add_motif(&motif("A")).unwrap();
    c.add_motif(&motif("B")).unwrap();

    // B sits right before Landing, so only the A|B gap is offered.
    assert_eq!(c.state().placeholders().len(), 1);
    let gap = c.state().placeholder_after(a).unwrap();

    c.add_transition(&transition("T1"), gap).unwrap();
    assert!(c.state().placeholders().is_empty());
    assert_eq!(keys(&c), ["Takeoff", "A", "T1", "B", "Landing"]);
}

#[test]
fn cancelling_a_transition_reopens_the_gap() {
    let mut c = fresh();
    let a = c.add_motif(&motif("A")).unwrap();
    c.add_motif(&motif("B")).unwrap();
    let gap = c.state().placeholder_after(a).unwrap();
    let t1 = c.add_transition(&transition("T1"), gap).unwrap();

    c.cancel(t1).unwrap();
    assert_eq!(keys(&c), ["Takeoff", "A", "+", "B", "Landing"]);
    // the reopened gap gets the same id as before
    assert_eq!(c.state().placeholders(), vec![gap]);
}

#[test]
fn cancelling_a_motif_leaves_dangling_transitions() {
    let mut c = fresh();
    for key in ["a", "b", "c"] {
        c.add_motif(&motif(key)).unwrap();
    }
    let g1 = c.state().placeholders()[0];
    c.add_transition(&transition("t1"), g1).unwrap();
    let g2 = c.state().placeholders()[0];
    c.add_transition(&transition("t2"), g2).unwrap();
    let b = c.slots()[3].id;

    c.cancel(b).unwrap();
    assert_eq!(keys(&c), ["Takeoff", "a", "t1", "t2", "c", "Landing"]);
    assert!(!c.state().alternation_holds());
}
