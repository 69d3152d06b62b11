//! Projects and workspaces.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{KnowledgeItemId, ProjectId, WorkspaceId};

/// A project that knowledge items can be linked to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    /// Unique identifier.
    pub id: ProjectId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Linked knowledge items.
    #[serde(default)]
    pub knowledge_item_ids: Vec<KnowledgeItemId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Project {
    /// Creates a project with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: ProjectId::generate(),
            name: name.into(),
            description: description.into(),
            knowledge_item_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Links an item. Returns `false` if it was already linked.
    pub fn link_item(&mut self, id: KnowledgeItemId) -> bool {
        if self.knowledge_item_ids.contains(&id) {
            return false;
        }
        self.knowledge_item_ids.push(id);
        self.updated_at = Utc::now();
        true
    }

    /// Unlinks an item. Returns `false` if it was not linked.
    pub fn unlink_item(&mut self, id: &KnowledgeItemId) -> bool {
        let before = self.knowledge_item_ids.len();
        self.knowledge_item_ids.retain(|linked| linked != id);
        let removed = self.knowledge_item_ids.len() != before;
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }
}

/// A top-level grouping of projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Workspace {
    /// Unique identifier.
    pub id: WorkspaceId,
    /// Display name.
    pub name: String,
    /// Projects in this workspace.
    #[serde(default)]
    pub project_ids: Vec<ProjectId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Workspace {
    /// Creates an empty workspace with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: WorkspaceId::generate(),
            name: name.into(),
            project_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_link_item_is_deduplicated() {
        let mut project = Project::new("Thesis", "");
        assert!(project.link_item(KnowledgeItemId::new("i1")));
        assert!(!project.link_item(KnowledgeItemId::new("i1")));
        assert_eq!(project.knowledge_item_ids.len(), 1);
    }

    #[test]
    fn test_unlink_missing_item() {
        let mut project = Project::new("Thesis", "");
        project.link_item(KnowledgeItemId::new("i1"));
        assert!(!project.unlink_item(&KnowledgeItemId::new("i2")));
        assert!(project.unlink_item(&KnowledgeItemId::new("i1")));
        assert!(project.knowledge_item_ids.is_empty());
    }
}
