//! Applies a completed drag to its drop target.
//!
//! Drop targets are identified by strings of the form `folder:<id>` or
//! `basin:<id>`, the same strings hosts pass to
//! [`DragController::set_drop_target`](crate::drag::DragController::set_drop_target).

use crate::drag::DragPayload;
use crate::models::{BasinId, FolderId, KnowledgeItemId};
use crate::storage::KnowledgeStore;
use crate::{Error, Result};
use std::fmt;
use std::str::FromStr;

/// Where dragged entities land.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DropTarget {
    /// A folder.
    Folder(FolderId),
    /// A basin.
    Basin(BasinId),
}

impl DropTarget {
    const FOLDER_PREFIX: &'static str = "folder:";
    const BASIN_PREFIX: &'static str = "basin:";

    /// Parses a `folder:<id>` or `basin:<id>` string.
    ///
    /// Returns `None` for any other form or an empty id.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        if let Some(id) = s.strip_prefix(Self::FOLDER_PREFIX) {
            return (!id.is_empty()).then(|| Self::Folder(FolderId::new(id)));
        }
        if let Some(id) = s.strip_prefix(Self::BASIN_PREFIX) {
            return (!id.is_empty()).then(|| Self::Basin(BasinId::new(id)));
        }
        None
    }
}

impl FromStr for DropTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s).ok_or_else(|| Error::InvalidInput(format!("invalid drop target: {s}")))
    }
}

impl fmt::Display for DropTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Folder(id) => write!(f, "{}{id}", Self::FOLDER_PREFIX),
            Self::Basin(id) => write!(f, "{}{id}", Self::BASIN_PREFIX),
        }
    }
}

/// Result of applying a drop.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DropOutcome {
    /// Items that moved.
    pub moved: Vec<KnowledgeItemId>,
    /// Items left alone because they were already in the target.
    pub skipped: Vec<KnowledgeItemId>,
}

/// Applies a drag payload to a target.
///
/// Dropping on a folder moves the dragged items; dragged folders are not
/// nested and are ignored. Dropping on a basin moves the dragged items plus
/// every item filed in a dragged folder.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the target or a dragged item does not exist,
/// or any store error.
pub fn apply_drop(
    store: &dyn KnowledgeStore,
    payload: &DragPayload,
    target: &DropTarget,
) -> Result<DropOutcome> {
    let mut outcome = DropOutcome::default();

    match target {
        DropTarget::Folder(folder_id) => {
            if store.folder(folder_id)?.is_none() {
                return Err(Error::not_found("folder", folder_id));
            }
            for item_id in dedupe(payload.item_ids()) {
                let item = store
                    .item(&item_id)?
                    .ok_or_else(|| Error::not_found("item", &item_id))?;
                if item.folder_id.as_ref() == Some(folder_id) {
                    outcome.skipped.push(item_id);
                    continue;
                }
                store.move_item_to_folder(&item_id, folder_id)?;
                outcome.moved.push(item_id);
            }
        },
        DropTarget::Basin(basin_id) => {
            let basin = store
                .basin(basin_id)?
                .ok_or_else(|| Error::not_found("basin", basin_id))?;

            let mut ids = payload.item_ids();
            let folder_ids = payload.folder_ids();
            if !folder_ids.is_empty() {
                ids.extend(
                    store
                        .items()?
                        .into_iter()
                        .filter(|item| {
                            item.folder_id
                                .as_ref()
                                .is_some_and(|id| folder_ids.contains(id))
                        })
                        .map(|item| item.id),
                );
            }

            for item_id in dedupe(ids) {
                if basin.contains_item(&item_id) {
                    outcome.skipped.push(item_id);
                    continue;
                }
                store.move_item_to_basin(&item_id, basin_id)?;
                outcome.moved.push(item_id);
            }
        },
    }

    tracing::info!(
        target = %target,
        moved = outcome.moved.len(),
        skipped = outcome.skipped.len(),
        "Applied drop"
    );
    Ok(outcome)
}

fn dedupe(ids: Vec<KnowledgeItemId>) -> Vec<KnowledgeItemId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{KnowledgeFolder, KnowledgeItem, KnowledgeItemKind};
    use crate::observability::EventBus;
    use crate::storage::{MemoryKeyValueStore, WorkspaceStore};
    use std::sync::Arc;

    fn store() -> WorkspaceStore {
        WorkspaceStore::new(Arc::new(MemoryKeyValueStore::new())).with_event_bus(EventBus::new(8))
    }

    fn add(store: &WorkspaceStore, id: &str) -> KnowledgeItem {
        store
            .add_item(KnowledgeItem::new(id, KnowledgeItemKind::Text).with_id(id))
            .expect("add item")
    }

    #[test]
    fn test_parse_drop_target() {
        assert_eq!(
            DropTarget::parse("folder:f1"),
            Some(DropTarget::Folder(FolderId::new("f1")))
        );
        assert_eq!(
            DropTarget::parse("basin:b1"),
            Some(DropTarget::Basin(BasinId::new("b1")))
        );
        assert_eq!(DropTarget::parse("basin:"), None);
        assert_eq!(DropTarget::parse("trash"), None);
        assert!("nowhere".parse::<DropTarget>().is_err());
        assert_eq!(DropTarget::Basin(BasinId::new("b1")).to_string(), "basin:b1");
    }

    #[test]
    fn test_drop_items_on_folder() {
        let store = store();
        let a = add(&store, "a");
        let folder = store.create_folder("Inbox").expect("folder");
        store.move_item_to_folder(&a.id, &folder.id).expect("file a");
        let b = add(&store, "b");

        let payload = DragPayload::Multiple {
            items: vec![a.clone(), b.clone()],
            folders: vec![KnowledgeFolder::new("ignored")],
        };
        let outcome =
            apply_drop(&store, &payload, &DropTarget::Folder(folder.id.clone())).expect("drop");

        assert_eq!(outcome.moved, vec![b.id.clone()]);
        assert_eq!(outcome.skipped, vec![a.id]);
        let b = store.item(&b.id).expect("read").expect("b exists");
        assert_eq!(b.folder_id, Some(folder.id));
    }

    #[test]
    fn test_drop_folder_on_basin_moves_members() {
        let store = store();
        let a = add(&store, "a");
        let b = add(&store, "b");
        let folder = store.create_folder("Papers").expect("folder");
        store.move_item_to_folder(&a.id, &folder.id).expect("file a");
        store.move_item_to_folder(&b.id, &folder.id).expect("file b");
        let basin = store.create_basin("Research", "").expect("basin");

        let payload = DragPayload::Folder(folder);
        let outcome =
            apply_drop(&store, &payload, &DropTarget::Basin(basin.id.clone())).expect("drop");

        assert_eq!(outcome.moved.len(), 2);
        let basin = store.basin(&basin.id).expect("read").expect("basin exists");
        assert!(basin.contains_item(&a.id));
        assert!(basin.contains_item(&b.id));
    }

    #[test]
    fn test_drop_on_missing_target() {
        let store = store();
        let a = add(&store, "a");
        let err = apply_drop(
            &store,
            &DragPayload::Item(a),
            &DropTarget::Basin(BasinId::new("gone")),
        )
        .expect_err("missing basin");
        assert!(matches!(err, Error::NotFound { kind: "basin", .. }));
    }
}
