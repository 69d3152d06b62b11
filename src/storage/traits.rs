//! Storage trait definitions.

use crate::Result;
use crate::models::{
    BasinId, BasinPatch, FolderId, KnowledgeBasin, KnowledgeFolder, KnowledgeItem,
    KnowledgeItemId, Project, ProjectId, Prompt, PromptId, Workspace, WorkspaceId,
};

/// A string key-value blob store.
///
/// Mirrors browser local storage: synchronous, no transactions, and values
/// are opaque strings (JSON by convention).
pub trait KeyValueStore: Send + Sync {
    /// Reads a value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the backend cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Removes a value. Returns `true` if it existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be written.
    fn remove(&self, key: &str) -> Result<bool>;

    /// Lists all keys in sorted order.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend cannot be read.
    fn keys(&self) -> Result<Vec<String>>;
}

/// Knowledge item, folder and basin collections.
///
/// This is the mutation surface that controllers such as the basin editor
/// call into; they never modify entities directly.
pub trait KnowledgeStore: Send + Sync {
    /// Lists all items.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn items(&self) -> Result<Vec<KnowledgeItem>>;

    /// Gets an item by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn item(&self, id: &KnowledgeItemId) -> Result<Option<KnowledgeItem>> {
        Ok(self.items()?.into_iter().find(|item| &item.id == id))
    }

    /// Adds an item.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be written.
    fn add_item(&self, item: KnowledgeItem) -> Result<KnowledgeItem>;

    /// Replaces an item with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no such item exists.
    fn update_item(&self, item: KnowledgeItem) -> Result<KnowledgeItem>;

    /// Deletes an item, dropping it from basin snapshots and project links.
    ///
    /// Returns `true` if the item existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the collections cannot be written.
    fn delete_item(&self, id: &KnowledgeItemId) -> Result<bool>;

    /// Lists all folders.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn folders(&self) -> Result<Vec<KnowledgeFolder>>;

    /// Gets a folder by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn folder(&self, id: &FolderId) -> Result<Option<KnowledgeFolder>> {
        Ok(self.folders()?.into_iter().find(|folder| &folder.id == id))
    }

    /// Creates a folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the collection cannot be written.
    fn create_folder(&self, name: &str) -> Result<KnowledgeFolder>;

    /// Renames a folder.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no such folder exists.
    fn rename_folder(&self, id: &FolderId, name: &str) -> Result<KnowledgeFolder>;

    /// Deletes a folder; its items become unfiled.
    ///
    /// # Errors
    ///
    /// Returns an error if the collections cannot be written.
    fn delete_folder(&self, id: &FolderId) -> Result<bool>;

    /// Moves an item into a folder.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the item or folder is missing.
    fn move_item_to_folder(
        &self,
        item_id: &KnowledgeItemId,
        folder_id: &FolderId,
    ) -> Result<KnowledgeItem>;

    /// Moves an item into a basin, appending a snapshot copy to the basin.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the item or basin is missing.
    fn move_item_to_basin(
        &self,
        item_id: &KnowledgeItemId,
        basin_id: &BasinId,
    ) -> Result<KnowledgeItem>;

    /// Lists all basins.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn basins(&self) -> Result<Vec<KnowledgeBasin>>;

    /// Gets a basin by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn basin(&self, id: &BasinId) -> Result<Option<KnowledgeBasin>> {
        Ok(self.basins()?.into_iter().find(|basin| &basin.id == id))
    }

    /// Creates a basin.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the collection cannot be written.
    fn create_basin(&self, name: &str, description: &str) -> Result<KnowledgeBasin>;

    /// Applies a patch to a basin.
    ///
    /// Items in the patch join this basin and leave any other; items dropped
    /// from it lose their basin id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no such basin exists.
    fn update_basin(&self, id: &BasinId, patch: BasinPatch) -> Result<KnowledgeBasin>;

    /// Deletes a basin; its member items lose their basin id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collections cannot be written.
    fn delete_basin(&self, id: &BasinId) -> Result<bool>;
}

/// Projects and workspaces.
pub trait ProjectStore: Send + Sync {
    /// Lists all projects.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn projects(&self) -> Result<Vec<Project>>;

    /// Gets a project by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn project(&self, id: &ProjectId) -> Result<Option<Project>> {
        Ok(self.projects()?.into_iter().find(|project| &project.id == id))
    }

    /// Creates a project.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the collection cannot be written.
    fn create_project(&self, name: &str, description: &str) -> Result<Project>;

    /// Replaces a project with the same id.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if no such project exists.
    fn update_project(&self, project: Project) -> Result<Project>;

    /// Deletes a project and removes it from workspaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the collections cannot be written.
    fn delete_project(&self, id: &ProjectId) -> Result<bool>;

    /// Links a knowledge item to a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the project or item is missing.
    fn link_item(&self, project_id: &ProjectId, item_id: &KnowledgeItemId) -> Result<Project>;

    /// Unlinks a knowledge item from a project.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the project is missing.
    fn unlink_item(&self, project_id: &ProjectId, item_id: &KnowledgeItemId) -> Result<Project>;

    /// Lists all workspaces.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn workspaces(&self) -> Result<Vec<Workspace>>;

    /// Creates a workspace.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty or the collection cannot be written.
    fn create_workspace(&self, name: &str) -> Result<Workspace>;

    /// Adds a project to a workspace.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::NotFound`] if the workspace or project is missing.
    fn add_project_to_workspace(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> Result<Workspace>;
}

/// Prompt templates.
pub trait PromptStore: Send + Sync {
    /// Lists all prompts.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be read.
    fn prompts(&self) -> Result<Vec<Prompt>>;

    /// Inserts or replaces a prompt by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the title is empty or the collection cannot be written.
    fn save_prompt(&self, prompt: Prompt) -> Result<Prompt>;

    /// Deletes a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection cannot be written.
    fn delete_prompt(&self, id: &PromptId) -> Result<bool>;
}
