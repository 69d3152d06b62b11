//! Workspace event types broadcast on the event bus.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::{BasinId, FolderId, KnowledgeItemId};

/// Shared event metadata.
#[derive(Debug, Clone)]
pub struct EventMeta {
    /// Unique identifier for this event.
    pub event_id: String,
    /// Event source component.
    pub source: &'static str,
    /// Emission time.
    pub timestamp: DateTime<Utc>,
}

impl EventMeta {
    /// Creates new event metadata using the current time.
    #[must_use]
    pub fn new(source: &'static str) -> Self {
        Self {
            event_id: Uuid::new_v4().to_string(),
            source,
            timestamp: Utc::now(),
        }
    }
}

/// Events emitted by the workspace.
#[derive(Debug, Clone)]
pub enum WorkspaceEvent {
    /// A pointer release ended any drag in progress.
    ///
    /// Published by the host environment when a drag ends outside of any
    /// drop target that would have completed it.
    DragEnded {
        /// Event metadata.
        meta: EventMeta,
    },
    /// A basin was updated.
    BasinUpdated {
        /// Event metadata.
        meta: EventMeta,
        /// The updated basin.
        basin_id: BasinId,
        /// Number of items in the new snapshot.
        item_count: usize,
    },
    /// Items were moved into a folder.
    ItemsFiled {
        /// Event metadata.
        meta: EventMeta,
        /// Destination folder.
        folder_id: FolderId,
        /// Moved items.
        item_ids: Vec<KnowledgeItemId>,
    },
}

impl WorkspaceEvent {
    /// Builds a drag-end signal.
    #[must_use]
    pub fn drag_ended(source: &'static str) -> Self {
        Self::DragEnded {
            meta: EventMeta::new(source),
        }
    }

    /// Returns the event type name.
    #[must_use]
    pub const fn event_type(&self) -> &'static str {
        match self {
            Self::DragEnded { .. } => "drag_ended",
            Self::BasinUpdated { .. } => "basin_updated",
            Self::ItemsFiled { .. } => "items_filed",
        }
    }

    /// Returns the event metadata.
    #[must_use]
    pub const fn meta(&self) -> &EventMeta {
        match self {
            Self::DragEnded { meta }
            | Self::BasinUpdated { meta, .. }
            | Self::ItemsFiled { meta, .. } => meta,
        }
    }
}
