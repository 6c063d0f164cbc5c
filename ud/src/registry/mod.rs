//! User registry - the single owner of the in-memory user map
//!
//! No lock guards the map; safety comes from the fact that only the worker
//! task in [`manager`] ever touches it, and every request reaches the worker
//! through one bounded FIFO channel.

pub mod manager;
pub mod messages;

pub use manager::UserRegistry;
pub use messages::{RegistryCommand, RegistryError, RegistryResponse};
