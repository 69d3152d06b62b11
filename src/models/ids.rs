//! Typed entity identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Declares a string-backed identifier newtype.
///
/// Equality and hashing are by value, so two entities with the same id are
/// treated as the same entity regardless of where they came from.
macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates an identifier from an existing value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Generates a fresh random identifier.
            #[must_use]
            pub fn generate() -> Self {
                Self(Uuid::new_v4().to_string())
            }

            /// Returns the ID as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_string())
            }
        }
    };
}

entity_id!(
    /// Identifier of a knowledge item.
    KnowledgeItemId
);
entity_id!(
    /// Identifier of a knowledge folder.
    FolderId
);
entity_id!(
    /// Identifier of a knowledge basin.
    BasinId
);
entity_id!(
    /// Identifier of a project.
    ProjectId
);
entity_id!(
    /// Identifier of a workspace.
    WorkspaceId
);
entity_id!(
    /// Identifier of a prompt template.
    PromptId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_are_unique() {
        assert_ne!(BasinId::generate(), BasinId::generate());
    }

    #[test]
    fn test_id_serializes_transparently() {
        let id = FolderId::new("f1");
        let json = serde_json::to_string(&id).expect("serialize id");
        assert_eq!(json, "\"f1\"");
        assert_eq!(id.to_string(), "f1");
        assert_eq!(FolderId::from("f1"), id);
    }
}
