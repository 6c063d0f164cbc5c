//! UserStore - durable storage for user records
//!
//! The store is a write-behind mirror, not the source of truth: the registry
//! actor in the service crate owns the live map and this crate keeps a
//! best-effort SQLite copy of it. Three pieces:
//!
//! - [`UserStore`] - connection owner, schema init, blocking row access
//! - [`spawn_writer`] - ordered write-behind loop draining [`WriteOp`]s
//! - [`UserStore::stream_all`] - one-shot bootstrap stream of persisted rows

pub mod record;
pub mod store;
pub mod writer;

pub use record::User;
pub use store::{StoreError, UserStore};
pub use writer::{WriteOp, spawn_writer};

/// Capacity of the bootstrap stream and write-behind queues.
pub const QUEUE_CAPACITY: usize = 128;
