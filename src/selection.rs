//! Selection model over knowledge items and folders.
//!
//! At most one kind of entity is selected after a plain (non-extend) click:
//! selecting an item clears the folder selection and vice versa. Extend
//! clicks toggle membership within their own kind only. Entities are compared
//! by id, and selection order is kept so a drag started from the selection
//! carries entities in the order the user picked them.

use crate::models::{FolderId, KnowledgeFolder, KnowledgeItem, KnowledgeItemId};

/// Current selection of items or folders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnowledgeSelection {
    items: Vec<KnowledgeItem>,
    folders: Vec<KnowledgeFolder>,
}

impl KnowledgeSelection {
    /// Creates an empty selection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Selects an item.
    ///
    /// Without `extend` the selection becomes exactly `{item}` and the folder
    /// selection is cleared. With `extend` the item is toggled.
    pub fn select_item(&mut self, item: &KnowledgeItem, extend: bool) {
        if !extend {
            self.items = vec![item.clone()];
            self.folders.clear();
            return;
        }
        if let Some(pos) = self.items.iter().position(|i| i.id == item.id) {
            self.items.remove(pos);
        } else {
            self.items.push(item.clone());
        }
    }

    /// Selects a folder.
    ///
    /// Without `extend` the selection becomes exactly `{folder}` and the item
    /// selection is cleared. With `extend` the folder is toggled.
    pub fn select_folder(&mut self, folder: &KnowledgeFolder, extend: bool) {
        if !extend {
            self.folders = vec![folder.clone()];
            self.items.clear();
            return;
        }
        if let Some(pos) = self.folders.iter().position(|f| f.id == folder.id) {
            self.folders.remove(pos);
        } else {
            self.folders.push(folder.clone());
        }
    }

    /// Clears both selections.
    pub fn clear_selection(&mut self) {
        self.items.clear();
        self.folders.clear();
    }

    /// Returns `true` if anything is selected.
    #[must_use]
    pub fn has_selection(&self) -> bool {
        !self.items.is_empty() || !self.folders.is_empty()
    }

    /// Selected items in selection order.
    #[must_use]
    pub fn selected_items(&self) -> &[KnowledgeItem] {
        &self.items
    }

    /// Selected folders in selection order.
    #[must_use]
    pub fn selected_folders(&self) -> &[KnowledgeFolder] {
        &self.folders
    }

    /// Checks whether an item is selected.
    #[must_use]
    pub fn is_item_selected(&self, id: &KnowledgeItemId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    /// Checks whether a folder is selected.
    #[must_use]
    pub fn is_folder_selected(&self, id: &FolderId) -> bool {
        self.folders.iter().any(|folder| &folder.id == id)
    }
}
