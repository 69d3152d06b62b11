//! # Mycelial
//!
//! Headless core of a knowledge workspace for AI prompting.
//!
//! Mycelial organizes knowledge items into folders and basins, links them to
//! projects, and talks to LLM, embedding and web search providers.
//!
//! ## Features
//!
//! - Selection model over knowledge items and folders
//! - Drag state machine with a scoped drag-end safety net
//! - Basin editor workflow that validates and commits basin patches
//! - Key-value blob persistence (in-memory or filesystem)
//! - `OpenRouter` chat, Gemini embeddings, Google Custom Search
//!
//! ## Example
//!
//! ```rust,ignore
//! use mycelial::{KnowledgeSelection, KnowledgeItem, KnowledgeItemKind};
//!
//! let note = KnowledgeItem::new("Reading list", KnowledgeItemKind::Text);
//! let mut selection = KnowledgeSelection::new();
//! selection.select_item(&note, false);
//! assert!(selection.has_selection());
//! ```

#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(missing_docs)]
#![forbid(unsafe_code)]
#![allow(clippy::multiple_crate_versions)]

use thiserror::Error as ThisError;

// Module declarations
pub mod config;
pub mod drag;
pub mod embedding;
pub mod llm;
pub mod models;
pub mod notify;
pub mod observability;
pub mod search;
pub mod selection;
pub mod services;
pub mod storage;

// Re-exports for convenience
pub use config::{GlobalSettings, MycelialConfig, SettingsService};
pub use drag::{DragController, DragPayload, DragPayloadKind, DragState};
pub use embedding::{Embedder, GeminiEmbedder};
pub use llm::{LlmProvider, OpenRouterClient};
pub use models::{
    BasinId, BasinPatch, FolderId, KnowledgeBasin, KnowledgeFolder, KnowledgeItem,
    KnowledgeItemId, KnowledgeItemKind, Project, ProjectId, Prompt, PromptId, Workspace,
    WorkspaceEvent, WorkspaceId,
};
pub use notify::{Notification, NotificationLevel, Notifier};
pub use search::{GoogleSearchClient, SearchResultItem, WebSearchProvider};
pub use selection::KnowledgeSelection;
pub use services::{BasinEditor, DropOutcome, DropTarget, PromptService, apply_drop};
pub use storage::{KeyValueStore, KnowledgeStore, ProjectStore, PromptStore, WorkspaceStore};

/// Error type for mycelial operations.
///
/// # Error Variant Triggers
///
/// | Variant | Raised When |
/// |---------|-------------|
/// | `InvalidInput` | Empty required fields, missing API keys, unfilled prompt variables |
/// | `NotFound` | A referenced entity disappeared before a commit |
/// | `OperationFailed` | I/O, serialization, HTTP transport, provider-side errors |
#[derive(Debug, ThisError)]
pub enum Error {
    /// Invalid input was provided.
    ///
    /// Raised before any mutation or network request is attempted.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A referenced entity does not exist.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Entity kind (e.g. "basin", "project").
        kind: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// An operation failed.
    ///
    /// Raised when:
    /// - Key-value store reads or writes fail
    /// - A stored blob cannot be parsed
    /// - An HTTP request fails or returns a non-success status
    /// - A provider reports an error in its JSON body
    #[error("operation '{operation}' failed: {cause}")]
    OperationFailed {
        /// The operation that failed.
        operation: String,
        /// The underlying cause.
        cause: String,
    },
}

impl Error {
    /// Builds a `NotFound` error.
    #[must_use]
    pub fn not_found(kind: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            kind,
            id: id.to_string(),
        }
    }

    /// Builds an `OperationFailed` error.
    #[must_use]
    pub fn operation(operation: &str, cause: impl ToString) -> Self {
        Self::OperationFailed {
            operation: operation.to_string(),
            cause: cause.to_string(),
        }
    }
}

/// Result type alias for mycelial operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::InvalidInput("name is required".to_string());
        assert_eq!(err.to_string(), "invalid input: name is required");

        let err = Error::not_found("basin", "b1");
        assert_eq!(err.to_string(), "basin not found: b1");

        let err = Error::operation("kv_read", "disk full");
        assert_eq!(err.to_string(), "operation 'kv_read' failed: disk full");
    }
}
