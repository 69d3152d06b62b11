//! Knowledge items and their containers.
//!
//! An item lives in at most one folder and at most one basin, and never in
//! both at once. Basins hold materialized copies of their member items rather
//! than references, so a basin keeps its snapshot even if the source item is
//! later edited.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{BasinId, FolderId, KnowledgeItemId};

/// Kind of a knowledge item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnowledgeItemKind {
    /// An uploaded file.
    File,
    /// Free-form text.
    Text,
    /// A web link.
    Link,
    /// A folder placeholder.
    Folder,
    /// A basin placeholder.
    Basin,
}

impl KnowledgeItemKind {
    /// Returns the kind as a string slice.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Text => "text",
            Self::Link => "link",
            Self::Folder => "folder",
            Self::Basin => "basin",
        }
    }

    /// Parses a kind string (case-insensitive).
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "file" => Some(Self::File),
            "text" | "note" => Some(Self::Text),
            "link" | "url" => Some(Self::Link),
            "folder" => Some(Self::Folder),
            "basin" => Some(Self::Basin),
            _ => None,
        }
    }
}

impl fmt::Display for KnowledgeItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single piece of knowledge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeItem {
    /// Unique identifier.
    pub id: KnowledgeItemId,
    /// Display name.
    #[serde(alias = "title")]
    pub name: String,
    /// Item kind.
    #[serde(rename = "type")]
    pub kind: KnowledgeItemKind,
    /// Text content, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Source URL for links.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Containing folder.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
    /// Containing basin.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub basin_id: Option<BasinId>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeItem {
    /// Creates an unfiled item with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, kind: KnowledgeItemKind) -> Self {
        let now = Utc::now();
        Self {
            id: KnowledgeItemId::generate(),
            name: name.into(),
            kind,
            content: None,
            url: None,
            folder_id: None,
            basin_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<KnowledgeItemId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the content.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }

    /// Sets the URL.
    #[must_use]
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Moves the item into a folder, leaving any basin.
    pub fn move_to_folder(&mut self, folder_id: FolderId) {
        self.folder_id = Some(folder_id);
        self.basin_id = None;
        self.updated_at = Utc::now();
    }

    /// Moves the item into a basin, leaving any folder.
    pub fn move_to_basin(&mut self, basin_id: BasinId) {
        self.basin_id = Some(basin_id);
        self.folder_id = None;
        self.updated_at = Utc::now();
    }

    /// Removes the item from any folder or basin.
    pub fn unfile(&mut self) {
        self.folder_id = None;
        self.basin_id = None;
        self.updated_at = Utc::now();
    }
}

/// A named grouping container for items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeFolder {
    /// Unique identifier.
    pub id: FolderId,
    /// Display name.
    pub name: String,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeFolder {
    /// Creates a folder with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: FolderId::generate(),
            name: name.into(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<FolderId>) -> Self {
        self.id = id.into();
        self
    }
}

/// A curated collection holding snapshots of knowledge items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KnowledgeBasin {
    /// Unique identifier.
    pub id: BasinId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    #[serde(default)]
    pub description: String,
    /// Ordered snapshot of member items.
    #[serde(default)]
    pub items: Vec<KnowledgeItem>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl KnowledgeBasin {
    /// Creates an empty basin with a generated id.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: BasinId::generate(),
            name: name.into(),
            description: description.into(),
            items: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Sets the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<BasinId>) -> Self {
        self.id = id.into();
        self
    }

    /// Sets the member snapshot.
    #[must_use]
    pub fn with_items(mut self, items: Vec<KnowledgeItem>) -> Self {
        self.items = items;
        self
    }

    /// Returns the ids of the member items in snapshot order.
    #[must_use]
    pub fn item_ids(&self) -> Vec<KnowledgeItemId> {
        self.items.iter().map(|item| item.id.clone()).collect()
    }

    /// Checks whether an item with the given id is in the snapshot.
    #[must_use]
    pub fn contains_item(&self, id: &KnowledgeItemId) -> bool {
        self.items.iter().any(|item| &item.id == id)
    }

    /// Applies an editor patch.
    pub fn apply(&mut self, patch: BasinPatch) {
        self.name = patch.name;
        self.description = patch.description;
        self.items = patch.items;
        self.updated_at = patch.updated_at;
    }
}

/// Changes committed by the basin editor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BasinPatch {
    /// Trimmed name.
    pub name: String,
    /// Trimmed description.
    pub description: String,
    /// Fresh copies of the selected items.
    pub items: Vec<KnowledgeItem>,
    /// Time of the edit.
    pub updated_at: DateTime<Utc>,
}
