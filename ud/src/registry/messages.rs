//! Registry messages
//!
//! Commands and responses for the actor pattern. Every variant that expects
//! an answer carries its own single-use oneshot reply slot; the worker
//! fulfills each slot exactly once and ignores send failures, so a caller
//! that times out and drops its receiver costs nothing but the slot.

use thiserror::Error;
use tokio::sync::oneshot;

use userstore::User;

/// Errors from registry operations
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Required field missing or empty; rejected before the command is
    /// enqueued, so the worker never sees it.
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("user not found: {0}")]
    NotFound(String),

    /// The worker or a reply slot went away; only possible during shutdown.
    #[error("registry channel closed")]
    ChannelClosed,
}

/// Response from registry operations
pub type RegistryResponse<T> = Result<T, RegistryError>;

/// Commands sent to the registry worker
#[derive(Debug)]
pub enum RegistryCommand {
    /// Create a user with a freshly generated id. The id is deliberately
    /// not part of the command - callers cannot supply one.
    Create {
        name: String,
        last_name: String,
        reply: oneshot::Sender<RegistryResponse<String>>,
    },

    /// Insert a record restored from the durable store, keeping its id.
    BootstrapInsert { user: User, reply: oneshot::Sender<()> },

    /// Fetch a copy of a record by id.
    Get {
        id: String,
        reply: oneshot::Sender<RegistryResponse<User>>,
    },

    /// Overwrite name/lastName of an existing record; id is immutable.
    Update { user: User, reply: oneshot::Sender<bool> },

    /// Remove a record by id.
    Remove { id: String, reply: oneshot::Sender<bool> },

    /// Current map size.
    Count { reply: oneshot::Sender<usize> },

    /// Clear the map unconditionally (test isolation).
    Clear { reply: oneshot::Sender<()> },
}
