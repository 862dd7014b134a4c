use catalog::{AssetKind, AssetLocation, AssetResolver, CatalogState, Endpoint, FileKey, RecordKind};
use serde::{Deserialize, Serialize};

use crate::{Slot, SlotId, SlotKind};

/// DOM-free description of one footer element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ViewNode {
    Card {
        slot: SlotId,
        kind: RecordKind,
        file_key: FileKey,
        icon: AssetLocation,
        /// Catalog caption, absent when the key is not in the catalog.
        caption: Option<String>,
    },
    Endpoint {
        slot: SlotId,
        endpoint: Endpoint,
        /// Picker prompt when nothing is selected, otherwise the option name.
        label: String,
        icon: Option<AssetLocation>,
        selected: bool,
    },
    Plus {
        slot: SlotId,
    },
}

impl ViewNode {
    pub fn slot(&self) -> SlotId {
        match self {
            ViewNode::Card { slot, .. } | ViewNode::Endpoint { slot, .. } | ViewNode::Plus { slot } => {
                *slot
            }
        }
    }

    pub fn draggable(&self) -> bool {
        matches!(self, ViewNode::Card { .. })
    }

    pub fn cancellable(&self) -> bool {
        match self {
            ViewNode::Card { .. } => true,
            ViewNode::Endpoint { selected, .. } => *selected,
            ViewNode::Plus { .. } => false,
        }
    }
}

/// Projects the footer into view nodes. Called after every mutation.
pub fn render(slots: &[Slot], catalog: &CatalogState, assets: &AssetResolver) -> Vec<ViewNode> {
    slots.iter().map(|slot| render_slot(slot, catalog, assets)).collect()
}

fn render_slot(slot: &Slot, catalog: &CatalogState, assets: &AssetResolver) -> ViewNode {
    match &slot.kind {
        SlotKind::Motif { file_key } => card(slot.id, RecordKind::Motif, file_key, catalog, assets),
        SlotKind::Transition { file_key } => {
            card(slot.id, RecordKind::Transition, file_key, catalog, assets)
        }
        SlotKind::Takeoff { selection } | SlotKind::Landing { selection } => {
            let endpoint = slot.endpoint_kind().unwrap_or(Endpoint::Takeoff);
            ViewNode::Endpoint {
                slot: slot.id,
                endpoint,
                label: match selection {
                    Some(option) => option.name.clone(),
                    None => format!("Select {}", endpoint.label().to_lowercase()),
                },
                icon: selection
                    .as_ref()
                    .and_then(|o| o.file_key.as_ref())
                    .map(|key| assets.resolve(AssetKind::EndpointIcon, key)),
                selected: selection.is_some(),
            }
        }
        SlotKind::InsertionPlaceholder => ViewNode::Plus { slot: slot.id },
    }
}

fn card(
    slot: SlotId,
    kind: RecordKind,
    file_key: &FileKey,
    catalog: &CatalogState,
    assets: &AssetResolver,
) -> ViewNode {
    ViewNode::Card {
        slot,
        kind,
        file_key: file_key.clone(),
        icon: assets.icon(kind, file_key),
        caption: catalog.lookup(kind, file_key).map(|r| r.caption()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Composer;
    use catalog::{AssetBase, EndpointOptions};
    use std::path::PathBuf;

    #[test]
    fn render_mirrors_sequence_order() {
        let mut c = Composer::new(CatalogState::default());
        c.initialize(EndpointOptions::default());
        c.select_endpoint(Endpoint::Landing, "Unlit").unwrap();
        let resolver = AssetResolver::new(AssetBase::Local(PathBuf::from("assets")));

        let nodes = render(c.slots(), c.catalog(), &resolver);
        assert_eq!(nodes.len(), 2);
        match &nodes[0] {
            ViewNode::Endpoint { label, selected, .. } => {
                assert_eq!(label, "Select takeoff");
                assert!(!selected);
            }
            other => panic!("unexpected {other:?}"),
        }
        match &nodes[1] {
            ViewNode::Endpoint { label, icon, selected, .. } => {
                assert_eq!(label, "Unlit");
                assert!(icon.is_none());
                assert!(selected);
            }
            other => panic!("unexpected {other:?}"),
        }
        assert!(nodes[1].cancellable());
        assert!(!nodes[0].draggable());
    }

    #[test]
    fn cards_resolve_icons_and_tolerate_unknown_keys() {
        let slots = vec![Slot::motif(FileKey::new("0001_Heart"))];
        let resolver = AssetResolver::new(AssetBase::Local(PathBuf::from("assets")));
        let nodes = render(&slots, &CatalogState::default(), &resolver);
        let ViewNode::Card { icon, caption, .. } = &nodes[0] else {
            panic!("expected card");
        };
        assert_eq!(
            icon,
            &AssetLocation::Path(PathBuf::from("assets/image/motif/icon/0001_Heart.jpg"))
        );
        assert!(caption.is_none());
        assert!(nodes[0].draggable());
    }
}
