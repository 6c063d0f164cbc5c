//! UserRegistry - actor that owns the user map
//!
//! One worker task holds the `HashMap` and drains a bounded command queue
//! in strict arrival order. Mutations reply to the caller first and then
//! queue a mirror write; the caller never waits on SQLite.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};
use uuid::Uuid;

use userstore::{User, UserStore, WriteOp, spawn_writer};

use super::messages::{RegistryCommand, RegistryError, RegistryResponse};

/// Capacity of the command queue. Bounded so a stalled worker produces
/// backpressure at `send` instead of unbounded growth.
const COMMAND_QUEUE_CAPACITY: usize = 128;

/// Handle to send commands to the registry worker.
///
/// Cloneable; the composition root constructs exactly one registry and
/// clones this handle into every consumer.
#[derive(Clone)]
pub struct UserRegistry {
    tx: mpsc::Sender<RegistryCommand>,
}

impl UserRegistry {
    /// Spawn the registry: worker loop, write-behind loop, and the one-shot
    /// bootstrap task that replays persisted users into the command queue.
    ///
    /// Bootstrap inserts share the queue with client commands, so early
    /// client requests may interleave with restores; FIFO arrival order is
    /// the only ordering promise.
    pub fn spawn(store: Arc<UserStore>) -> Self {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE_CAPACITY);

        let write_tx = spawn_writer(Arc::clone(&store));
        tokio::spawn(actor_loop(rx, write_tx));

        let bootstrap_tx = tx.clone();
        tokio::spawn(bootstrap(store, bootstrap_tx));

        info!("user registry spawned");
        Self { tx }
    }

    /// Create a user and return its generated id.
    pub async fn create(&self, name: &str, last_name: &str) -> RegistryResponse<String> {
        debug!(%name, %last_name, "create: called");
        if name.is_empty() {
            return Err(RegistryError::Validation("name is empty".to_string()));
        }
        if last_name.is_empty() {
            return Err(RegistryError::Validation("lastName is empty".to_string()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Create {
                name: name.to_string(),
                last_name: last_name.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Fetch a copy of a user by id.
    pub async fn get(&self, id: &str) -> RegistryResponse<User> {
        debug!(%id, "get: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Get {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)?
    }

    /// Overwrite name/lastName of an existing user. Returns false when the
    /// id is unknown; the id itself is immutable.
    pub async fn update(&self, user: User) -> RegistryResponse<bool> {
        debug!(user_id = %user.id, "update: called");
        if user.name.is_empty() {
            return Err(RegistryError::Validation("name is empty".to_string()));
        }
        if user.last_name.is_empty() {
            return Err(RegistryError::Validation("lastName is empty".to_string()));
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Update { user, reply: reply_tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Remove a user by id. Returns false when the id is unknown.
    pub async fn remove(&self, id: &str) -> RegistryResponse<bool> {
        debug!(%id, "remove: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Remove {
                id: id.to_string(),
                reply: reply_tx,
            })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Current number of users in the map.
    pub async fn count(&self) -> RegistryResponse<usize> {
        debug!("count: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Count { reply: reply_tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }

    /// Clear the map unconditionally (test isolation). The durable mirror
    /// is left untouched.
    pub async fn clear(&self) -> RegistryResponse<()> {
        debug!("clear: called");
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(RegistryCommand::Clear { reply: reply_tx })
            .await
            .map_err(|_| RegistryError::ChannelClosed)?;
        reply_rx.await.map_err(|_| RegistryError::ChannelClosed)
    }
}

/// Replay persisted users into the command queue, exactly once.
async fn bootstrap(store: Arc<UserStore>, tx: mpsc::Sender<RegistryCommand>) {
    let mut rows = store.stream_all();
    let mut restored = 0usize;

    while let Some(user) = rows.recv().await {
        let (reply_tx, reply_rx) = oneshot::channel();
        if tx
            .send(RegistryCommand::BootstrapInsert { user, reply: reply_tx })
            .await
            .is_err()
        {
            warn!("registry worker gone during bootstrap");
            return;
        }
        if reply_rx.await.is_err() {
            warn!("registry worker gone during bootstrap");
            return;
        }
        restored += 1;
    }

    info!(count = restored, "bootstrap complete");
}

/// The worker loop that owns the map and processes commands.
async fn actor_loop(mut rx: mpsc::Receiver<RegistryCommand>, write_tx: mpsc::Sender<WriteOp>) {
    debug!("registry worker started");

    let mut users: HashMap<String, User> = HashMap::new();

    while let Some(cmd) = rx.recv().await {
        match cmd {
            RegistryCommand::Create { name, last_name, reply } => {
                let id = Uuid::now_v7().to_string();
                let user = User::with_id(id.clone(), name, last_name);

                users.insert(id.clone(), user.clone());
                let _ = reply.send(Ok(id.clone()));

                info!(user_id = %id, pool_size = users.len(), "user created");
                queue_write(&write_tx, WriteOp::Upsert(user)).await;
            }

            RegistryCommand::BootstrapInsert { user, reply } => {
                let id = user.id.clone();
                users.insert(id.clone(), user);
                let _ = reply.send(());

                debug!(user_id = %id, pool_size = users.len(), "user restored from store");
            }

            RegistryCommand::Get { id, reply } => match users.get(&id) {
                Some(user) => {
                    let _ = reply.send(Ok(user.clone()));
                    debug!(user_id = %id, "user returned");
                }
                None => {
                    warn!(user_id = %id, "user not found");
                    let _ = reply.send(Err(RegistryError::NotFound(id)));
                }
            },

            RegistryCommand::Update { user, reply } => match users.get_mut(&user.id) {
                Some(existing) => {
                    existing.name = user.name.clone();
                    existing.last_name = user.last_name.clone();
                    let _ = reply.send(true);

                    info!(user_id = %user.id, "user updated");
                    queue_write(&write_tx, WriteOp::Update(user)).await;
                }
                None => {
                    let _ = reply.send(false);
                }
            },

            RegistryCommand::Remove { id, reply } => {
                if users.remove(&id).is_some() {
                    let _ = reply.send(true);

                    info!(user_id = %id, pool_size = users.len(), "user removed");
                    queue_write(&write_tx, WriteOp::Delete(id)).await;
                } else {
                    let _ = reply.send(false);
                }
            }

            RegistryCommand::Count { reply } => {
                let _ = reply.send(users.len());
            }

            RegistryCommand::Clear { reply } => {
                users.clear();
                let _ = reply.send(());
                debug!("registry cleared");
            }
        }
    }

    debug!("registry worker stopped");
}

/// Queue a mirror write. The caller's reply has already been sent, so this
/// only ever waits for queue capacity, never for SQL.
async fn queue_write(write_tx: &mpsc::Sender<WriteOp>, op: WriteOp) {
    if write_tx.send(op).await.is_err() {
        warn!("write-behind queue closed; mirror write dropped");
    }
}
