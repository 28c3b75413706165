/// Shared types used across the codebase

use serde::{Deserialize, Serialize};
use std::fmt;

/// Named collections held by the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Users,
    Products,
}

impl Collection {
    pub const ALL: [Collection; 2] = [Collection::Users, Collection::Products];

    /// Name used for the persisted document and its top-level key
    pub fn name(&self) -> &'static str {
        match self {
            Collection::Users => "users",
            Collection::Products => "products",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Mutations applied through the document store, used for logging
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Operation {
    Seed,
    Insert,
    Replace,
    Delete,
    Update, // arbitrary read-modify-write through a transaction
}
