use catalog::{Endpoint, EndpointOption, FileKey, RecordKind};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use uuid::Uuid;

mod sequence;
pub use sequence::*;
mod footer;
pub use footer::*;
mod commands;
pub use commands::*;
mod view;
pub use view::*;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComposerError {
    #[error("composer not initialized")]
    NotInitialized,
    #[error("slot not found: {0}")]
    SlotNotFound(SlotId),
    #[error("placeholder no longer exists: {0}")]
    StalePlaceholder(SlotId),
    #[error("cannot swap {dragged} with {target}")]
    IneligibleSwap { dragged: SlotId, target: SlotId },
    #[error("slot cannot be cancelled: {0}")]
    NotCancellable(SlotId),
    #[error("expected a {expected:?} record, got {actual:?}")]
    WrongRecordKind {
        expected: RecordKind,
        actual: RecordKind,
    },
    #[error("unknown {0:?} record: {1}")]
    UnknownRecord(RecordKind, FileKey),
    #[error("unknown {endpoint} option: {name}")]
    UnknownOption { endpoint: Endpoint, name: String },
    #[error("export in progress")]
    ExportInFlight,
    #[error("nothing to export: no motifs placed")]
    NothingToExport,
    #[error("position out of range: {0}")]
    PositionOutOfRange(usize),
    #[error("placeholder out of range: {0}")]
    PlaceholderOutOfRange(usize),
}

/// Namespace for placeholder ids, which are derived from the motif they follow.
const PLACEHOLDER_NAMESPACE: Uuid = Uuid::from_u128(0x6c1f_29d4_8a8e_4f0b_9d53_7e0a_44c2_b1a7);

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(transparent)]
pub struct SlotId(pub Uuid);

impl SlotId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    fn placeholder_after(motif: SlotId) -> Self {
        Self(Uuid::new_v5(&PLACEHOLDER_NAMESPACE, motif.0.as_bytes()))
    }
}

impl Default for SlotId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SlotKind {
    Motif { file_key: FileKey },
    Transition { file_key: FileKey },
    Takeoff { selection: Option<EndpointOption> },
    Landing { selection: Option<EndpointOption> },
    /// The "+" affordance where a transition can be inserted.
    InsertionPlaceholder,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Slot {
    pub id: SlotId,
    #[serde(flatten)]
    pub kind: SlotKind,
}

impl Slot {
    pub fn motif(file_key: FileKey) -> Self {
        Self {
            id: SlotId::new(),
            kind: SlotKind::Motif { file_key },
        }
    }

    pub fn transition(file_key: FileKey) -> Self {
        Self {
            id: SlotId::new(),
            kind: SlotKind::Transition { file_key },
        }
    }

    pub fn endpoint(endpoint: Endpoint) -> Self {
        let kind = match endpoint {
            Endpoint::Takeoff => SlotKind::Takeoff { selection: None },
            Endpoint::Landing => SlotKind::Landing { selection: None },
        };
        Self {
            id: SlotId::new(),
            kind,
        }
    }

    pub fn placeholder_after(motif: SlotId) -> Self {
        Self {
            id: SlotId::placeholder_after(motif),
            kind: SlotKind::InsertionPlaceholder,
        }
    }

    pub fn is_motif(&self) -> bool {
        matches!(self.kind, SlotKind::Motif { .. })
    }

    pub fn is_transition(&self) -> bool {
        matches!(self.kind, SlotKind::Transition { .. })
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self.kind, SlotKind::InsertionPlaceholder)
    }

    pub fn endpoint_kind(&self) -> Option<Endpoint> {
        match self.kind {
            SlotKind::Takeoff { .. } => Some(Endpoint::Takeoff),
            SlotKind::Landing { .. } => Some(Endpoint::Landing),
            _ => None,
        }
    }

    pub fn is_sentinel(&self) -> bool {
        self.endpoint_kind().is_some()
    }

    pub fn file_key(&self) -> Option<&FileKey> {
        match &self.kind {
            SlotKind::Motif { file_key } | SlotKind::Transition { file_key } => Some(file_key),
            _ => None,
        }
    }

    /// Drag-and-drop only ever moves motifs and transitions.
    pub fn is_draggable(&self) -> bool {
        self.is_motif() || self.is_transition()
    }
}
