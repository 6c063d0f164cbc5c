//! The user record shared by the store and the service crate.

use serde::{Deserialize, Serialize};

/// A managed user record.
///
/// `id` is assigned by the registry on creation (or carried over verbatim
/// from storage during bootstrap) and is immutable afterwards. `last_name`
/// serializes as `lastName` both on the wire and in the database column.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    #[serde(default)]
    pub id: String,
    pub name: String,
    #[serde(rename = "lastName")]
    pub last_name: String,
}

impl User {
    /// Build a record with an already-known id.
    pub fn with_id(id: impl Into<String>, name: impl Into<String>, last_name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            last_name: last_name.into(),
        }
    }
}
