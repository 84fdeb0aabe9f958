//! Best-effort push to the remote document collection.
//!
//! Mutations enqueue [`SyncCommand`]s through a [`SyncHandle`]; a single
//! [`SyncWorker`] task drains the queue and calls the [`RemoteSyncAdapter`].
//! Enqueueing never blocks and never fails the caller. Remote failures,
//! including timeouts, are logged and counted in [`SyncStats`] but are never
//! retried and never touch local state.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::config::SyncConfig;
use crate::grocery_model::{Collection, SyncRecord};

#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote unreachable: {0}")]
    Unreachable(String),

    #[error("remote call timed out after {0:?}")]
    Timeout(Duration),

    #[error("remote rejected request: {0}")]
    Rejected(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("remote sync is disabled")]
    Disabled,
}

/// Remote document collection keyed by entity id.
#[async_trait]
pub trait RemoteSyncAdapter: Send + Sync {
    async fn save_entity(
        &self,
        collection: Collection,
        id: &str,
        entity: Value,
    ) -> Result<(), RemoteError>;

    async fn delete_entity(&self, collection: Collection, id: &str) -> Result<(), RemoteError>;

    async fn get_all(&self, collection: Collection) -> Result<Vec<Value>, RemoteError>;

    async fn is_reachable(&self) -> bool;
}

/// Work item for the sync worker.
#[derive(Debug)]
pub enum SyncCommand {
    Save {
        collection: Collection,
        id: String,
        entity: Value,
    },
    Delete {
        collection: Collection,
        id: String,
    },
    /// Acknowledged once every command queued before it has been attempted.
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, Default)]
struct SyncCounters {
    pushed: AtomicU64,
    failed: AtomicU64,
}

/// Outcome counters of remote pushes since the worker started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncStats {
    pub pushed: u64,
    pub failed: u64,
}

async fn with_timeout<T, F>(limit: Duration, call: F) -> Result<T, RemoteError>
where
    F: Future<Output = Result<T, RemoteError>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(RemoteError::Timeout(limit)),
    }
}

/// Cheap, cloneable front end to the sync worker.
#[derive(Clone)]
pub struct SyncHandle {
    sender: Option<mpsc::UnboundedSender<SyncCommand>>,
    remote: Option<Arc<dyn RemoteSyncAdapter>>,
    timeout: Duration,
    counters: Arc<SyncCounters>,
}

impl SyncHandle {
    /// A handle with no worker behind it. Pushes are dropped and pulls fail
    /// with [`RemoteError::Disabled`].
    pub fn disabled() -> Self {
        Self {
            sender: None,
            remote: None,
            timeout: SyncConfig::default().remote_timeout(),
            counters: Arc::default(),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }

    /// Queues an upsert of `record`.
    pub fn save<T: SyncRecord>(&self, record: &T) {
        if self.sender.is_none() {
            return;
        }
        match serde_json::to_value(record) {
            Ok(entity) => self.enqueue(SyncCommand::Save {
                collection: T::COLLECTION,
                id: record.id().to_string(),
                entity,
            }),
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Could not encode {} '{}' for remote push: {e}", T::COLLECTION.key(), record.id());
            }
        }
    }

    pub fn delete(&self, collection: Collection, id: impl Into<String>) {
        self.enqueue(SyncCommand::Delete {
            collection,
            id: id.into(),
        });
    }

    fn enqueue(&self, command: SyncCommand) {
        let Some(sender) = &self.sender else {
            return;
        };
        if let Err(e) = sender.send(command) {
            self.counters.failed.fetch_add(1, Ordering::Relaxed);
            warn!("Sync worker is gone, dropping {:?}", e.0);
        }
    }

    /// Waits until every command queued so far has been attempted.
    pub async fn flush(&self) {
        let Some(sender) = &self.sender else {
            return;
        };
        let (done, wait) = oneshot::channel();
        if sender.send(SyncCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }

    /// Pulls a whole collection, bounded by the configured timeout.
    pub async fn fetch_all(&self, collection: Collection) -> Result<Vec<Value>, RemoteError> {
        let remote = self.remote.as_ref().ok_or(RemoteError::Disabled)?;
        with_timeout(self.timeout, remote.get_all(collection)).await
    }

    pub async fn is_reachable(&self) -> bool {
        match &self.remote {
            Some(remote) => tokio::time::timeout(self.timeout, remote.is_reachable())
                .await
                .unwrap_or(false),
            None => false,
        }
    }

    pub fn stats(&self) -> SyncStats {
        SyncStats {
            pushed: self.counters.pushed.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
        }
    }
}

/// Background task that performs remote pushes in queue order.
pub struct SyncWorker {
    receiver: mpsc::UnboundedReceiver<SyncCommand>,
    remote: Arc<dyn RemoteSyncAdapter>,
    timeout: Duration,
    counters: Arc<SyncCounters>,
}

impl SyncWorker {
    /// Spawns the worker on the current tokio runtime. It stops once every
    /// [`SyncHandle`] clone has been dropped.
    pub fn spawn(
        remote: Arc<dyn RemoteSyncAdapter>,
        config: &SyncConfig,
    ) -> (SyncHandle, JoinHandle<()>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(SyncCounters::default());
        let timeout = config.remote_timeout();

        let handle = SyncHandle {
            sender: Some(sender),
            remote: Some(remote.clone()),
            timeout,
            counters: counters.clone(),
        };
        let worker = SyncWorker {
            receiver,
            remote,
            timeout,
            counters,
        };

        (handle, tokio::spawn(worker.run()))
    }

    async fn run(mut self) {
        while let Some(command) = self.receiver.recv().await {
            self.handle(command).await;
        }
        debug!("Sync worker stopped");
    }

    async fn handle(&self, command: SyncCommand) {
        let (action, collection, id, result) = match command {
            SyncCommand::Save {
                collection,
                id,
                entity,
            } => {
                let result =
                    with_timeout(self.timeout, self.remote.save_entity(collection, &id, entity))
                        .await;
                ("save", collection, id, result)
            }
            SyncCommand::Delete { collection, id } => {
                let result =
                    with_timeout(self.timeout, self.remote.delete_entity(collection, &id)).await;
                ("delete", collection, id, result)
            }
            SyncCommand::Flush(done) => {
                let _ = done.send(());
                return;
            }
        };

        match result {
            Ok(()) => {
                self.counters.pushed.fetch_add(1, Ordering::Relaxed);
                debug!("Remote {action} of {}/{id} succeeded", collection.key());
            }
            Err(e) => {
                self.counters.failed.fetch_add(1, Ordering::Relaxed);
                warn!("Remote {action} of {}/{id} failed: {e}", collection.key());
            }
        }
    }
}
