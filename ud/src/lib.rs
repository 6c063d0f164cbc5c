//! userd - user record service
//!
//! A small CRUD service whose hard guarantee is linearizable access to a
//! shared user map without locks: a single registry worker owns the map and
//! every operation flows through one bounded command channel, so the queue's
//! FIFO order is the only total order in the system.
//!
//! # Modules
//!
//! - [`registry`] - the state-owning actor and its client handle
//! - [`server`] - axum HTTP surface over the registry
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface

pub mod cli;
pub mod config;
pub mod registry;
pub mod server;

// Re-export commonly used types
pub use config::{Config, ServerConfig, StorageConfig};
pub use registry::{RegistryCommand, RegistryError, RegistryResponse, UserRegistry};
pub use userstore::{User, UserStore};
