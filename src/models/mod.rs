//! Data models for mycelial.
//!
//! Entity shapes shared by the controllers, the store and the CLI.

mod events;
mod ids;
mod knowledge;
mod project;
mod prompt;

pub use events::{EventMeta, WorkspaceEvent};
pub use ids::{BasinId, FolderId, KnowledgeItemId, ProjectId, PromptId, WorkspaceId};
pub use knowledge::{BasinPatch, KnowledgeBasin, KnowledgeFolder, KnowledgeItem, KnowledgeItemKind};
pub use project::{Project, Workspace};
pub use prompt::{Prompt, extract_variables, substitute_variables};
