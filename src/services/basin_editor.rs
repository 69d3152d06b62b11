//! Basin editor workflow.
//!
//! Holds the editable form state of the "edit basin" dialog. Opening the
//! dialog loads the basin's current name, description and member ids; closing
//! it wipes the form. Submitting validates, re-resolves the basin, and hands a
//! [`BasinPatch`] to [`KnowledgeStore::update_basin`]. The editor never
//! modifies a basin itself.

use crate::models::{BasinId, BasinPatch, KnowledgeBasin, KnowledgeItem, KnowledgeItemId};
use crate::notify::{Notification, Notifier};
use crate::storage::KnowledgeStore;
use crate::{Error, Result};
use chrono::{Duration, Utc};
use std::sync::Arc;

/// Editable state for one basin.
pub struct BasinEditor {
    store: Arc<dyn KnowledgeStore>,
    notifier: Arc<dyn Notifier>,
    open: bool,
    basin_id: Option<BasinId>,
    name: String,
    description: String,
    selected_item_ids: Vec<KnowledgeItemId>,
    submitting: bool,
}

impl BasinEditor {
    /// Creates a closed editor.
    #[must_use]
    pub fn new(store: Arc<dyn KnowledgeStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            store,
            notifier,
            open: false,
            basin_id: None,
            name: String::new(),
            description: String::new(),
            selected_item_ids: Vec::new(),
            submitting: false,
        }
    }

    /// Opens or closes the editor for a basin.
    ///
    /// Opening (or switching to another basin while open) loads the basin
    /// into the form. Closing clears everything.
    pub fn set_open(&mut self, open: bool, basin_id: Option<BasinId>) {
        if !open {
            self.reset();
            return;
        }

        let reload = !self.open || self.basin_id != basin_id;
        self.open = true;
        self.basin_id = basin_id;
        if reload {
            self.load();
        }
    }

    fn load(&mut self) {
        self.name.clear();
        self.description.clear();
        self.selected_item_ids.clear();

        let Some(basin_id) = self.basin_id.as_ref() else {
            return;
        };
        match self.store.basin(basin_id) {
            Ok(Some(basin)) => {
                self.selected_item_ids = basin.item_ids();
                self.name = basin.name;
                self.description = basin.description;
            },
            Ok(None) => tracing::warn!(basin_id = %basin_id, "Basin to edit not found"),
            Err(e) => tracing::warn!(basin_id = %basin_id, "Failed to load basin: {e}"),
        }
    }

    fn reset(&mut self) {
        self.open = false;
        self.basin_id = None;
        self.name.clear();
        self.description.clear();
        self.selected_item_ids.clear();
    }

    /// Returns `true` while the dialog is open.
    #[must_use]
    pub const fn is_open(&self) -> bool {
        self.open
    }

    /// Returns `true` while a submit is in progress.
    #[must_use]
    pub const fn is_submitting(&self) -> bool {
        self.submitting
    }

    /// The basin being edited.
    #[must_use]
    pub const fn basin_id(&self) -> Option<&BasinId> {
        self.basin_id.as_ref()
    }

    /// Current name field.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Current description field.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Ids of the checked items.
    #[must_use]
    pub fn selected_item_ids(&self) -> &[KnowledgeItemId] {
        &self.selected_item_ids
    }

    /// Checks whether an item is checked.
    #[must_use]
    pub fn is_item_selected(&self, id: &KnowledgeItemId) -> bool {
        self.selected_item_ids.contains(id)
    }

    /// Sets the name field.
    pub fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    /// Sets the description field.
    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
    }

    /// Checks or unchecks an item.
    pub fn set_item_selected(&mut self, id: &KnowledgeItemId, selected: bool) {
        let present = self.is_item_selected(id);
        if selected && !present {
            self.selected_item_ids.push(id.clone());
        } else if !selected && present {
            self.selected_item_ids.retain(|existing| existing != id);
        }
    }

    /// Flips an item's checked state.
    pub fn toggle_item(&mut self, id: &KnowledgeItemId) {
        let selected = self.is_item_selected(id);
        self.set_item_selected(id, !selected);
    }

    /// Validates and commits the form.
    ///
    /// On success the dialog closes and a success notification is sent. On
    /// failure an error notification is sent and the dialog stays open.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidInput`] if the trimmed name is empty or no basin is set.
    /// - [`Error::NotFound`] if the basin no longer exists.
    /// - Any store error raised while committing.
    pub fn handle_submit(&mut self) -> Result<KnowledgeBasin> {
        let name = self.name.trim().to_string();
        if name.is_empty() {
            self.notifier.notify(Notification::error(
                "Validation error",
                "Basin name is required",
            ));
            return Err(Error::InvalidInput("basin name is required".to_string()));
        }
        let Some(basin_id) = self.basin_id.clone() else {
            self.notifier
                .notify(Notification::error("Validation error", "No basin selected"));
            return Err(Error::InvalidInput("no basin selected".to_string()));
        };

        self.submitting = true;
        let outcome = self.commit(&basin_id, name);
        self.submitting = false;

        match outcome {
            Ok(basin) => {
                self.notifier.notify(Notification::success(
                    "Basin updated",
                    format!("\"{}\" was saved", basin.name),
                ));
                self.reset();
                Ok(basin)
            },
            Err(e @ Error::NotFound { .. }) => {
                tracing::warn!(basin_id = %basin_id, "Basin disappeared before submit");
                self.notifier
                    .notify(Notification::error("Error", "Basin not found"));
                Err(e)
            },
            Err(e) => {
                tracing::error!(basin_id = %basin_id, "Failed to update basin: {e}");
                self.notifier
                    .notify(Notification::error("Error", "Failed to update basin"));
                Err(e)
            },
        }
    }

    fn commit(&self, basin_id: &BasinId, name: String) -> Result<KnowledgeBasin> {
        let basin = self
            .store
            .basin(basin_id)?
            .ok_or_else(|| Error::not_found("basin", basin_id))?;

        let items: Vec<KnowledgeItem> = self
            .store
            .items()?
            .into_iter()
            .filter(|item| self.selected_item_ids.contains(&item.id))
            .collect();

        // updated_at must move forward even if the clock did not.
        let updated_at = Utc::now().max(basin.updated_at + Duration::milliseconds(1));

        let patch = BasinPatch {
            name,
            description: self.description.trim().to_string(),
            items,
            updated_at,
        };
        self.store.update_basin(basin_id, patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::KnowledgeItemKind;
    use crate::notify::{MemoryNotifier, NotificationLevel};
    use crate::observability::EventBus;
    use crate::storage::{MemoryKeyValueStore, WorkspaceStore};

    fn setup() -> (Arc<WorkspaceStore>, Arc<MemoryNotifier>, BasinEditor) {
        let store = Arc::new(
            WorkspaceStore::new(Arc::new(MemoryKeyValueStore::new()))
                .with_event_bus(EventBus::new(8)),
        );
        let notifier = Arc::new(MemoryNotifier::new());
        let editor = BasinEditor::new(store.clone(), notifier.clone());
        (store, notifier, editor)
    }

    #[test]
    fn test_open_without_basin_id_leaves_form_empty() {
        let (_, _, mut editor) = setup();
        editor.set_open(true, None);
        assert!(editor.is_open());
        assert!(editor.name().is_empty());
        assert!(editor.selected_item_ids().is_empty());
    }

    #[test]
    fn test_close_discards_edits() {
        let (store, _, mut editor) = setup();
        let basin = store.create_basin("Research", "x").expect("basin");
        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("scratch");
        editor.set_open(false, Some(basin.id.clone()));

        assert!(!editor.is_open());
        assert!(editor.name().is_empty());
        assert!(editor.basin_id().is_none());

        editor.set_open(true, Some(basin.id));
        assert_eq!(editor.name(), "Research");
    }

    #[test]
    fn test_reopen_same_basin_keeps_edits() {
        let (store, _, mut editor) = setup();
        let basin = store.create_basin("Research", "").expect("basin");
        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("draft");
        editor.set_open(true, Some(basin.id));
        assert_eq!(editor.name(), "draft");
    }

    #[test]
    fn test_toggle_item() {
        let (_, _, mut editor) = setup();
        let id = KnowledgeItemId::new("i1");
        editor.toggle_item(&id);
        assert!(editor.is_item_selected(&id));
        editor.set_item_selected(&id, true);
        assert_eq!(editor.selected_item_ids().len(), 1);
        editor.toggle_item(&id);
        assert!(!editor.is_item_selected(&id));
    }

    #[test]
    fn test_submit_without_basin_id() {
        let (_, notifier, mut editor) = setup();
        editor.set_open(true, None);
        editor.set_name("Anything");
        let err = editor.handle_submit().expect_err("no basin");
        assert!(matches!(err, Error::InvalidInput(_)));
        assert_eq!(notifier.last().map(|n| n.level), Some(NotificationLevel::Error));
        assert!(!editor.is_submitting());
    }

    #[test]
    fn test_submit_trims_fields() {
        let (store, notifier, mut editor) = setup();
        let item = store
            .add_item(KnowledgeItem::new("a", KnowledgeItemKind::Text))
            .expect("item");
        let basin = store.create_basin("Research", "").expect("basin");
        editor.set_open(true, Some(basin.id.clone()));
        editor.set_name("  Research v2  ");
        editor.set_description("  notes ");
        editor.toggle_item(&item.id);

        let updated = editor.handle_submit().expect("submit");
        assert_eq!(updated.name, "Research v2");
        assert_eq!(updated.description, "notes");
        assert_eq!(updated.item_ids(), vec![item.id]);
        assert!(!editor.is_open());
        assert!(!editor.is_submitting());
        assert_eq!(
            notifier.last().map(|n| n.level),
            Some(NotificationLevel::Success)
        );
    }
}
