//! Business logic services.
//!
//! Services orchestrate storage backends and provide high-level operations.

mod basin_editor;
mod knowledge_drop;
mod prompt;

pub use basin_editor::BasinEditor;
pub use knowledge_drop::{DropOutcome, DropTarget, apply_drop};
pub use prompt::PromptService;
