//! Workspace store over a key-value backend.
//!
//! Every collection is one JSON array under a fixed key, the same layout the
//! browser build kept in local storage. Mutations are read-modify-write under
//! a process-local lock; there is no cross-process transaction.
//!
//! A mutation touching several collections serializes every blob before
//! writing any of them. If a later write fails, the blobs already written are
//! restored to their previous values on a best-effort basis; a failure during
//! that restore is logged and can leave the collections out of step.

use super::{KeyValueStore, KnowledgeStore, ProjectStore, PromptStore};
use crate::models::{
    BasinId, BasinPatch, EventMeta, FolderId, KnowledgeBasin, KnowledgeFolder, KnowledgeItem,
    KnowledgeItemId, Project, ProjectId, Prompt, PromptId, Workspace, WorkspaceEvent, WorkspaceId,
};
use crate::observability::{EventBus, global_event_bus};
use crate::{Error, Result};
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::{Arc, Mutex, MutexGuard};

/// Storage key for knowledge items.
pub const ITEMS_KEY: &str = "mycelial-knowledge-items";
/// Storage key for folders.
pub const FOLDERS_KEY: &str = "mycelial-knowledge-folders";
/// Storage key for basins.
pub const BASINS_KEY: &str = "mycelial-knowledge-basins";
/// Storage key for projects.
pub const PROJECTS_KEY: &str = "mycelial-projects";
/// Storage key for workspaces.
pub const WORKSPACES_KEY: &str = "mycelial-workspaces";
/// Storage key for prompt templates.
pub const PROMPTS_KEY: &str = "mycelial-prompts";

/// Workspace store implementing all collection traits.
pub struct WorkspaceStore {
    kv: Arc<dyn KeyValueStore>,
    events: EventBus,
    write_lock: Mutex<()>,
}

impl WorkspaceStore {
    /// Creates a store publishing on the global event bus.
    #[must_use]
    pub fn new(kv: Arc<dyn KeyValueStore>) -> Self {
        Self {
            kv,
            events: global_event_bus().clone(),
            write_lock: Mutex::new(()),
        }
    }

    /// Publishes events on the given bus instead of the global one.
    #[must_use]
    pub fn with_event_bus(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    /// Returns the underlying key-value store.
    #[must_use]
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        &self.kv
    }

    fn lock(&self) -> Result<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| Error::operation("workspace_lock", "lock poisoned"))
    }

    fn load<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        match self.kv.get(key)? {
            None => Ok(Vec::new()),
            Some(raw) if raw.trim().is_empty() => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw)
                .map_err(|e| Error::operation("parse_collection", format!("{key}: {e}"))),
        }
    }

    fn save<T: Serialize>(&self, key: &'static str, values: &[T]) -> Result<()> {
        self.commit(vec![(key, encode(key, values)?)])
    }

    /// Writes already serialized blobs in order, restoring earlier ones if a
    /// later write fails.
    fn commit(&self, writes: Vec<(&'static str, String)>) -> Result<()> {
        let mut written: Vec<(&'static str, Option<String>)> = Vec::with_capacity(writes.len());
        for (key, raw) in writes {
            let step = self
                .kv
                .get(key)
                .and_then(|previous| self.kv.set(key, &raw).map(|()| previous));
            match step {
                Ok(previous) => written.push((key, previous)),
                Err(e) => {
                    self.restore(&written);
                    return Err(e);
                },
            }
        }
        Ok(())
    }

    fn restore(&self, written: &[(&'static str, Option<String>)]) {
        for (key, previous) in written.iter().rev() {
            let restored = match previous {
                Some(raw) => self.kv.set(key, raw),
                None => self.kv.remove(key).map(|_| ()),
            };
            if let Err(e) = restored {
                tracing::error!(
                    key = *key,
                    "Failed to restore collection after a partial write: {e}"
                );
            }
        }
    }
}

fn encode<T: Serialize>(key: &str, values: &[T]) -> Result<String> {
    serde_json::to_string(values)
        .map_err(|e| Error::operation("serialize_collection", format!("{key}: {e}")))
}

fn require_name(kind: &str, name: &str) -> Result<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput(format!("{kind} name is required")));
    }
    Ok(trimmed.to_string())
}

/// Drops the item's snapshot from every basin except `keep`.
fn remove_from_basins(
    basins: &mut [KnowledgeBasin],
    item_id: &KnowledgeItemId,
    keep: Option<&BasinId>,
) {
    for basin in basins.iter_mut().filter(|b| Some(&b.id) != keep) {
        let before = basin.items.len();
        basin.items.retain(|item| &item.id != item_id);
        if basin.items.len() != before {
            basin.updated_at = Utc::now();
        }
    }
}

impl KnowledgeStore for WorkspaceStore {
    fn items(&self) -> Result<Vec<KnowledgeItem>> {
        self.load(ITEMS_KEY)
    }

    fn add_item(&self, item: KnowledgeItem) -> Result<KnowledgeItem> {
        require_name("item", &item.name)?;
        let _guard = self.lock()?;
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        if items.iter().any(|existing| existing.id == item.id) {
            return Err(Error::InvalidInput(format!("item {} already exists", item.id)));
        }
        items.push(item.clone());
        self.save(ITEMS_KEY, &items)?;
        tracing::debug!(item_id = %item.id, kind = %item.kind, "Added knowledge item");
        Ok(item)
    }

    fn update_item(&self, mut item: KnowledgeItem) -> Result<KnowledgeItem> {
        let _guard = self.lock()?;
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        let slot = items
            .iter_mut()
            .find(|existing| existing.id == item.id)
            .ok_or_else(|| Error::not_found("item", &item.id))?;
        item.updated_at = Utc::now();
        *slot = item.clone();
        self.save(ITEMS_KEY, &items)?;
        Ok(item)
    }

    fn delete_item(&self, id: &KnowledgeItemId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        let before = items.len();
        items.retain(|item| &item.id != id);
        if items.len() == before {
            return Ok(false);
        }
        let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
        remove_from_basins(&mut basins, id, None);
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        for project in &mut projects {
            project.unlink_item(id);
        }
        self.commit(vec![
            (ITEMS_KEY, encode(ITEMS_KEY, &items)?),
            (BASINS_KEY, encode(BASINS_KEY, &basins)?),
            (PROJECTS_KEY, encode(PROJECTS_KEY, &projects)?),
        ])?;

        tracing::debug!(item_id = %id, "Deleted knowledge item");
        Ok(true)
    }

    fn folders(&self) -> Result<Vec<KnowledgeFolder>> {
        self.load(FOLDERS_KEY)
    }

    fn create_folder(&self, name: &str) -> Result<KnowledgeFolder> {
        let name = require_name("folder", name)?;
        let _guard = self.lock()?;
        let mut folders: Vec<KnowledgeFolder> = self.load(FOLDERS_KEY)?;
        let folder = KnowledgeFolder::new(name);
        folders.push(folder.clone());
        self.save(FOLDERS_KEY, &folders)?;
        Ok(folder)
    }

    fn rename_folder(&self, id: &FolderId, name: &str) -> Result<KnowledgeFolder> {
        let name = require_name("folder", name)?;
        let _guard = self.lock()?;
        let mut folders: Vec<KnowledgeFolder> = self.load(FOLDERS_KEY)?;
        let folder = folders
            .iter_mut()
            .find(|folder| &folder.id == id)
            .ok_or_else(|| Error::not_found("folder", id))?;
        folder.name = name;
        folder.updated_at = Utc::now();
        let renamed = folder.clone();
        self.save(FOLDERS_KEY, &folders)?;
        Ok(renamed)
    }

    fn delete_folder(&self, id: &FolderId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut folders: Vec<KnowledgeFolder> = self.load(FOLDERS_KEY)?;
        let before = folders.len();
        folders.retain(|folder| &folder.id != id);
        if folders.len() == before {
            return Ok(false);
        }
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        for item in items.iter_mut().filter(|item| item.folder_id.as_ref() == Some(id)) {
            item.unfile();
        }
        self.commit(vec![
            (FOLDERS_KEY, encode(FOLDERS_KEY, &folders)?),
            (ITEMS_KEY, encode(ITEMS_KEY, &items)?),
        ])?;
        Ok(true)
    }

    fn move_item_to_folder(
        &self,
        item_id: &KnowledgeItemId,
        folder_id: &FolderId,
    ) -> Result<KnowledgeItem> {
        let _guard = self.lock()?;
        let folders: Vec<KnowledgeFolder> = self.load(FOLDERS_KEY)?;
        if !folders.iter().any(|folder| &folder.id == folder_id) {
            return Err(Error::not_found("folder", folder_id));
        }

        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        let item = items
            .iter_mut()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;
        let left_basin = item.basin_id.is_some();
        item.move_to_folder(folder_id.clone());
        let moved = item.clone();
        let mut writes = vec![(ITEMS_KEY, encode(ITEMS_KEY, &items)?)];
        if left_basin {
            let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
            remove_from_basins(&mut basins, item_id, None);
            writes.push((BASINS_KEY, encode(BASINS_KEY, &basins)?));
        }
        self.commit(writes)?;

        self.events.publish(WorkspaceEvent::ItemsFiled {
            meta: EventMeta::new("workspace_store"),
            folder_id: folder_id.clone(),
            item_ids: vec![item_id.clone()],
        });
        Ok(moved)
    }

    fn move_item_to_basin(
        &self,
        item_id: &KnowledgeItemId,
        basin_id: &BasinId,
    ) -> Result<KnowledgeItem> {
        let _guard = self.lock()?;
        let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
        if !basins.iter().any(|basin| &basin.id == basin_id) {
            return Err(Error::not_found("basin", basin_id));
        }

        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        let item = items
            .iter_mut()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| Error::not_found("item", item_id))?;
        item.move_to_basin(basin_id.clone());
        let moved = item.clone();

        remove_from_basins(&mut basins, item_id, Some(basin_id));
        let mut item_count = 0;
        if let Some(basin) = basins.iter_mut().find(|basin| &basin.id == basin_id) {
            if !basin.contains_item(item_id) {
                basin.items.push(moved.clone());
                basin.updated_at = Utc::now();
            }
            item_count = basin.items.len();
        }
        self.commit(vec![
            (ITEMS_KEY, encode(ITEMS_KEY, &items)?),
            (BASINS_KEY, encode(BASINS_KEY, &basins)?),
        ])?;

        self.events.publish(WorkspaceEvent::BasinUpdated {
            meta: EventMeta::new("workspace_store"),
            basin_id: basin_id.clone(),
            item_count,
        });
        Ok(moved)
    }

    fn basins(&self) -> Result<Vec<KnowledgeBasin>> {
        self.load(BASINS_KEY)
    }

    fn create_basin(&self, name: &str, description: &str) -> Result<KnowledgeBasin> {
        let name = require_name("basin", name)?;
        let _guard = self.lock()?;
        let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
        let basin = KnowledgeBasin::new(name, description.trim());
        basins.push(basin.clone());
        self.save(BASINS_KEY, &basins)?;
        Ok(basin)
    }

    fn update_basin(&self, id: &BasinId, mut patch: BasinPatch) -> Result<KnowledgeBasin> {
        let _guard = self.lock()?;
        let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
        if !basins.iter().any(|basin| &basin.id == id) {
            return Err(Error::not_found("basin", id));
        }

        // Membership follows the patch: included items join this basin and
        // leave any other, items dropped from it lose their basin id.
        let included: Vec<KnowledgeItemId> =
            patch.items.iter().map(|item| item.id.clone()).collect();
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        for item in &mut items {
            if included.contains(&item.id) {
                if item.basin_id.as_ref() != Some(id) {
                    item.move_to_basin(id.clone());
                }
            } else if item.basin_id.as_ref() == Some(id) {
                item.unfile();
            }
        }
        for copy in &mut patch.items {
            if let Some(current) = items.iter().find(|item| item.id == copy.id) {
                copy.clone_from(current);
            }
        }
        for item_id in &included {
            remove_from_basins(&mut basins, item_id, Some(id));
        }

        let basin = basins
            .iter_mut()
            .find(|basin| &basin.id == id)
            .ok_or_else(|| Error::not_found("basin", id))?;
        basin.apply(patch);
        let updated = basin.clone();
        self.commit(vec![
            (BASINS_KEY, encode(BASINS_KEY, &basins)?),
            (ITEMS_KEY, encode(ITEMS_KEY, &items)?),
        ])?;

        tracing::info!(basin_id = %id, items = updated.items.len(), "Updated basin");
        self.events.publish(WorkspaceEvent::BasinUpdated {
            meta: EventMeta::new("workspace_store"),
            basin_id: id.clone(),
            item_count: updated.items.len(),
        });
        Ok(updated)
    }

    fn delete_basin(&self, id: &BasinId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut basins: Vec<KnowledgeBasin> = self.load(BASINS_KEY)?;
        let before = basins.len();
        basins.retain(|basin| &basin.id != id);
        if basins.len() == before {
            return Ok(false);
        }
        let mut items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        for item in items.iter_mut().filter(|item| item.basin_id.as_ref() == Some(id)) {
            item.unfile();
        }
        self.commit(vec![
            (BASINS_KEY, encode(BASINS_KEY, &basins)?),
            (ITEMS_KEY, encode(ITEMS_KEY, &items)?),
        ])?;
        Ok(true)
    }
}

impl ProjectStore for WorkspaceStore {
    fn projects(&self) -> Result<Vec<Project>> {
        self.load(PROJECTS_KEY)
    }

    fn create_project(&self, name: &str, description: &str) -> Result<Project> {
        let name = require_name("project", name)?;
        let _guard = self.lock()?;
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        let project = Project::new(name, description.trim());
        projects.push(project.clone());
        self.save(PROJECTS_KEY, &projects)?;
        tracing::info!(project_id = %project.id, "Created project");
        Ok(project)
    }

    fn update_project(&self, mut project: Project) -> Result<Project> {
        require_name("project", &project.name)?;
        let _guard = self.lock()?;
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        let slot = projects
            .iter_mut()
            .find(|existing| existing.id == project.id)
            .ok_or_else(|| Error::not_found("project", &project.id))?;
        project.updated_at = Utc::now();
        *slot = project.clone();
        self.save(PROJECTS_KEY, &projects)?;
        Ok(project)
    }

    fn delete_project(&self, id: &ProjectId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        let before = projects.len();
        projects.retain(|project| &project.id != id);
        if projects.len() == before {
            return Ok(false);
        }
        let mut workspaces: Vec<Workspace> = self.load(WORKSPACES_KEY)?;
        for workspace in &mut workspaces {
            workspace.project_ids.retain(|project_id| project_id != id);
        }
        self.commit(vec![
            (PROJECTS_KEY, encode(PROJECTS_KEY, &projects)?),
            (WORKSPACES_KEY, encode(WORKSPACES_KEY, &workspaces)?),
        ])?;
        Ok(true)
    }

    fn link_item(&self, project_id: &ProjectId, item_id: &KnowledgeItemId) -> Result<Project> {
        let _guard = self.lock()?;
        let items: Vec<KnowledgeItem> = self.load(ITEMS_KEY)?;
        if !items.iter().any(|item| &item.id == item_id) {
            return Err(Error::not_found("item", item_id));
        }
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        let project = projects
            .iter_mut()
            .find(|project| &project.id == project_id)
            .ok_or_else(|| Error::not_found("project", project_id))?;
        if project.link_item(item_id.clone()) {
            let linked = project.clone();
            self.save(PROJECTS_KEY, &projects)?;
            return Ok(linked);
        }
        Ok(project.clone())
    }

    fn unlink_item(&self, project_id: &ProjectId, item_id: &KnowledgeItemId) -> Result<Project> {
        let _guard = self.lock()?;
        let mut projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        let project = projects
            .iter_mut()
            .find(|project| &project.id == project_id)
            .ok_or_else(|| Error::not_found("project", project_id))?;
        if project.unlink_item(item_id) {
            let unlinked = project.clone();
            self.save(PROJECTS_KEY, &projects)?;
            return Ok(unlinked);
        }
        Ok(project.clone())
    }

    fn workspaces(&self) -> Result<Vec<Workspace>> {
        self.load(WORKSPACES_KEY)
    }

    fn create_workspace(&self, name: &str) -> Result<Workspace> {
        let name = require_name("workspace", name)?;
        let _guard = self.lock()?;
        let mut workspaces: Vec<Workspace> = self.load(WORKSPACES_KEY)?;
        let workspace = Workspace::new(name);
        workspaces.push(workspace.clone());
        self.save(WORKSPACES_KEY, &workspaces)?;
        Ok(workspace)
    }

    fn add_project_to_workspace(
        &self,
        workspace_id: &WorkspaceId,
        project_id: &ProjectId,
    ) -> Result<Workspace> {
        let _guard = self.lock()?;
        let projects: Vec<Project> = self.load(PROJECTS_KEY)?;
        if !projects.iter().any(|project| &project.id == project_id) {
            return Err(Error::not_found("project", project_id));
        }
        let mut workspaces: Vec<Workspace> = self.load(WORKSPACES_KEY)?;
        let workspace = workspaces
            .iter_mut()
            .find(|workspace| &workspace.id == workspace_id)
            .ok_or_else(|| Error::not_found("workspace", workspace_id))?;
        if !workspace.project_ids.contains(project_id) {
            workspace.project_ids.push(project_id.clone());
            workspace.updated_at = Utc::now();
        }
        let updated = workspace.clone();
        self.save(WORKSPACES_KEY, &workspaces)?;
        Ok(updated)
    }
}

impl PromptStore for WorkspaceStore {
    fn prompts(&self) -> Result<Vec<Prompt>> {
        self.load(PROMPTS_KEY)
    }

    fn save_prompt(&self, mut prompt: Prompt) -> Result<Prompt> {
        if prompt.title.trim().is_empty() {
            return Err(Error::InvalidInput("prompt title is required".to_string()));
        }
        let _guard = self.lock()?;
        let mut prompts: Vec<Prompt> = self.load(PROMPTS_KEY)?;
        prompt.updated_at = Utc::now();
        match prompts.iter_mut().find(|existing| existing.id == prompt.id) {
            Some(slot) => {
                prompt.created_at = slot.created_at;
                *slot = prompt.clone();
            },
            None => prompts.push(prompt.clone()),
        }
        self.save(PROMPTS_KEY, &prompts)?;
        Ok(prompt)
    }

    fn delete_prompt(&self, id: &PromptId) -> Result<bool> {
        let _guard = self.lock()?;
        let mut prompts: Vec<Prompt> = self.load(PROMPTS_KEY)?;
        let before = prompts.len();
        prompts.retain(|prompt| &prompt.id != id);
        if prompts.len() == before {
            return Ok(false);
        }
        self.save(PROMPTS_KEY, &prompts)?;
        Ok(true)
    }
}
