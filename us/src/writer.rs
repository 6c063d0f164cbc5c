//! Ordered write-behind loop
//!
//! The registry worker replies to its caller first and then queues a
//! [`WriteOp`]; this loop drains the queue one op at a time so that mirror
//! writes for a given id reach SQLite in the order the worker issued them.
//! Storage failures are logged and swallowed - the in-memory map stays the
//! source of truth for the running process.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::record::User;
use crate::store::UserStore;

/// A queued mirror operation.
#[derive(Debug)]
pub enum WriteOp {
    /// Insert-or-replace after a create.
    Upsert(User),
    /// Field overwrite after an update.
    Update(User),
    /// Row removal after a remove.
    Delete(String),
}

impl UserStore {
    /// Apply one mirror op, absorbing and logging any storage error.
    pub fn apply(&self, op: WriteOp) {
        let result = match &op {
            WriteOp::Upsert(user) => self.upsert(user),
            WriteOp::Update(user) => self.update(user),
            WriteOp::Delete(id) => self.delete(id),
        };

        if let Err(e) = result {
            warn!(error = %e, ?op, "write-behind operation failed; in-memory state is unaffected");
        }
    }
}

/// Spawn the write-behind loop and return its queue sender.
///
/// Each op is applied on the blocking pool and awaited before the next one
/// is picked up, so the queue imposes total order on mirror writes. The
/// loop exits when every sender has dropped.
pub fn spawn_writer(store: Arc<UserStore>) -> mpsc::Sender<WriteOp> {
    let (tx, mut rx) = mpsc::channel::<WriteOp>(crate::QUEUE_CAPACITY);

    tokio::spawn(async move {
        debug!("write-behind loop started");

        while let Some(op) = rx.recv().await {
            let store = Arc::clone(&store);
            if tokio::task::spawn_blocking(move || store.apply(op)).await.is_err() {
                warn!("write-behind task panicked");
            }
        }

        debug!("write-behind loop stopped");
    });

    tx
}
