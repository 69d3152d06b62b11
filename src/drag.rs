//! Drag state machine for knowledge items and folders.
//!
//! States are [`DragState::Idle`] and [`DragState::Dragging`]. Every
//! observable transition is published once on a `watch` channel; transitions
//! that would not change the state publish nothing.
//!
//! While dragging, the controller holds a subscription to
//! [`WorkspaceEvent::DragEnded`] on the event bus. A drag-end signal forces the
//! controller back to idle even if no drop target ever completed the drag.
//! The subscription exists only in the dragging state: it is released by
//! [`DragController::stop_dragging`], by a processed drag-end, and when the
//! controller is dropped.

use crate::models::{FolderId, KnowledgeFolder, KnowledgeItem, KnowledgeItemId, WorkspaceEvent};
use crate::observability::{EventBus, FilteredReceiver, global_event_bus};
use tokio::sync::watch;

/// What is being dragged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DragPayload {
    /// A single item.
    Item(KnowledgeItem),
    /// A single folder.
    Folder(KnowledgeFolder),
    /// A multi-selection.
    Multiple {
        /// Selected items.
        items: Vec<KnowledgeItem>,
        /// Selected folders.
        folders: Vec<KnowledgeFolder>,
    },
}

/// Discriminant of a [`DragPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DragPayloadKind {
    /// A single item.
    Item,
    /// A single folder.
    Folder,
    /// A multi-selection.
    Multiple,
}

impl DragPayload {
    /// Returns the payload discriminant.
    #[must_use]
    pub const fn kind(&self) -> DragPayloadKind {
        match self {
            Self::Item(_) => DragPayloadKind::Item,
            Self::Folder(_) => DragPayloadKind::Folder,
            Self::Multiple { .. } => DragPayloadKind::Multiple,
        }
    }

    /// Ids of all dragged items.
    #[must_use]
    pub fn item_ids(&self) -> Vec<KnowledgeItemId> {
        match self {
            Self::Item(item) => vec![item.id.clone()],
            Self::Folder(_) => Vec::new(),
            Self::Multiple { items, .. } => items.iter().map(|i| i.id.clone()).collect(),
        }
    }

    /// Ids of all dragged folders.
    #[must_use]
    pub fn folder_ids(&self) -> Vec<FolderId> {
        match self {
            Self::Item(_) => Vec::new(),
            Self::Folder(folder) => vec![folder.id.clone()],
            Self::Multiple { folders, .. } => folders.iter().map(|f| f.id.clone()).collect(),
        }
    }
}

/// Drag state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DragState {
    /// Nothing is being dragged.
    #[default]
    Idle,
    /// A drag is in progress.
    Dragging {
        /// What is being dragged.
        payload: DragPayload,
        /// Id of the drop target under the pointer, if any.
        drop_target: Option<String>,
    },
}

impl DragState {
    /// Returns `true` while a drag is in progress.
    #[must_use]
    pub const fn is_dragging(&self) -> bool {
        matches!(self, Self::Dragging { .. })
    }

    /// Returns the payload while dragging.
    #[must_use]
    pub const fn payload(&self) -> Option<&DragPayload> {
        match self {
            Self::Dragging { payload, .. } => Some(payload),
            Self::Idle => None,
        }
    }

    /// Returns the current drop target while dragging.
    #[must_use]
    pub fn drop_target(&self) -> Option<&str> {
        match self {
            Self::Dragging { drop_target, .. } => drop_target.as_deref(),
            Self::Idle => None,
        }
    }
}

type DragEndReceiver = FilteredReceiver<fn(&WorkspaceEvent) -> bool>;

fn is_drag_end(event: &WorkspaceEvent) -> bool {
    matches!(event, WorkspaceEvent::DragEnded { .. })
}

/// Owns the drag state and its drag-end subscription.
pub struct DragController {
    state: watch::Sender<DragState>,
    bus: EventBus,
    drag_end: Option<DragEndReceiver>,
}

impl DragController {
    /// Creates an idle controller listening on the global event bus.
    #[must_use]
    pub fn new() -> Self {
        Self::with_event_bus(global_event_bus().clone())
    }

    /// Creates an idle controller listening on the given bus.
    #[must_use]
    pub fn with_event_bus(bus: EventBus) -> Self {
        let (state, _receiver) = watch::channel(DragState::Idle);
        Self {
            state,
            bus,
            drag_end: None,
        }
    }

    /// Returns a receiver notified on every observable state change.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DragState> {
        self.state.subscribe()
    }

    /// Returns a snapshot of the current state.
    #[must_use]
    pub fn state(&self) -> DragState {
        self.state.borrow().clone()
    }

    /// Returns `true` while a drag is in progress.
    #[must_use]
    pub fn is_dragging(&self) -> bool {
        self.state.borrow().is_dragging()
    }

    /// Returns `true` while a drag-end subscription is held.
    #[must_use]
    pub const fn is_listening_for_drag_end(&self) -> bool {
        self.drag_end.is_some()
    }

    /// Starts a drag.
    ///
    /// Precedence is multi-selection, then `item`, then `folder`: any
    /// non-empty `items` or `folders` produce [`DragPayload::Multiple`] even
    /// when a single item or folder is also given. With nothing to drag this
    /// is a no-op. Returns whether the state changed.
    pub fn start_dragging(
        &mut self,
        item: Option<&KnowledgeItem>,
        folder: Option<&KnowledgeFolder>,
        items: &[KnowledgeItem],
        folders: &[KnowledgeFolder],
    ) -> bool {
        let payload = if !items.is_empty() || !folders.is_empty() {
            DragPayload::Multiple {
                items: items.to_vec(),
                folders: folders.to_vec(),
            }
        } else if let Some(item) = item {
            DragPayload::Item(item.clone())
        } else if let Some(folder) = folder {
            DragPayload::Folder(folder.clone())
        } else {
            return false;
        };

        tracing::debug!(kind = ?payload.kind(), "Drag started");
        if self.drag_end.is_none() {
            let receiver = self
                .bus
                .subscribe_filtered(is_drag_end as fn(&WorkspaceEvent) -> bool);
            self.drag_end = Some(receiver);
        }
        let next = DragState::Dragging {
            payload,
            drop_target: None,
        };
        self.state.send_if_modified(|state| {
            if *state == next {
                return false;
            }
            *state = next;
            true
        })
    }

    /// Updates the drop target under the pointer.
    ///
    /// Ignored while idle and when `target` equals the current target.
    /// Returns whether the state changed.
    pub fn set_drop_target(&mut self, target: Option<&str>) -> bool {
        self.state.send_if_modified(|state| match state {
            DragState::Dragging { drop_target, .. } if drop_target.as_deref() != target => {
                *drop_target = target.map(ToString::to_string);
                true
            },
            _ => false,
        })
    }

    /// Returns to idle and releases the drag-end subscription.
    ///
    /// Idempotent: stopping while idle publishes nothing. Returns whether the
    /// state changed.
    pub fn stop_dragging(&mut self) -> bool {
        self.drag_end = None;
        self.state.send_if_modified(|state| {
            if state.is_dragging() {
                *state = DragState::Idle;
                true
            } else {
                false
            }
        })
    }

    /// Ends the drag at the current drop target, returning what was dropped.
    ///
    /// Returns `None` while idle.
    pub fn complete_drop(&mut self) -> Option<(DragPayload, Option<String>)> {
        let dropped = match self.state() {
            DragState::Dragging {
                payload,
                drop_target,
            } => Some((payload, drop_target)),
            DragState::Idle => None,
        };
        self.stop_dragging();
        dropped
    }

    /// Applies any drag-end signals received since the last call.
    ///
    /// Returns `true` if a signal forced the controller back to idle. A
    /// lagged subscription also ends the drag, since the skipped events may
    /// have held the signal.
    pub fn process_drag_end_signals(&mut self) -> bool {
        let ended = self
            .drag_end
            .as_mut()
            .is_some_and(|receiver| receiver.drain_matching());
        if ended {
            tracing::debug!("Drag ended by global signal");
            self.stop_dragging();
        }
        ended
    }

    /// Waits for the next drag-end signal and returns to idle.
    ///
    /// Returns `false` immediately while idle, or if the bus closes.
    pub async fn wait_for_drag_end(&mut self) -> bool {
        let Some(receiver) = self.drag_end.as_mut() else {
            return false;
        };
        if receiver.wait_matching().await {
            tracing::debug!("Drag ended by global signal");
            self.stop_dragging();
            return true;
        }
        false
    }
}

impl Default for DragController {
    fn default() -> Self {
        Self::new()
    }
}
