//! Storage layer.
//!
//! A [`KeyValueStore`] holds opaque string blobs (in memory or as files), and
//! [`WorkspaceStore`] keeps every entity collection as a JSON blob on top of
//! it, implementing [`KnowledgeStore`], [`ProjectStore`] and [`PromptStore`].

mod filesystem;
mod memory;
mod traits;
pub mod workspace;

pub use filesystem::FilesystemKeyValueStore;
pub use memory::MemoryKeyValueStore;
pub use traits::{KeyValueStore, KnowledgeStore, ProjectStore, PromptStore};
pub use workspace::WorkspaceStore;

use crate::Result;
use crate::config::{MycelialConfig, StorageBackend};
use std::sync::Arc;

/// Opens the key-value backend selected by the configuration.
///
/// # Errors
///
/// Returns an error if the filesystem store directory cannot be created.
pub fn open_key_value_store(config: &MycelialConfig) -> Result<Arc<dyn KeyValueStore>> {
    match config.storage {
        StorageBackend::Memory => Ok(Arc::new(MemoryKeyValueStore::new())),
        StorageBackend::Filesystem => {
            tracing::debug!(path = %config.data_dir.display(), "Opening filesystem store");
            Ok(Arc::new(FilesystemKeyValueStore::new(&config.data_dir)?))
        },
    }
}
