//! Write-behind persistence for a session store.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::backend::StorageBackend;
use super::codec::{self, CURRENT_VERSION};
use crate::error::SessionKeeperError;
use crate::session::{SessionStore, SubscriptionId};
use crate::Result;

/// Storage key used when none is configured.
pub const DEFAULT_STORAGE_KEY: &str = "auth-storage";

/// Persistence options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PersistOptions {
    /// Single key the snapshot is stored under.
    pub key: String,
    /// Format version written and accepted on rehydration.
    pub version: u32,
}

impl PersistOptions {
    /// Options for a custom storage key.
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Default::default()
        }
    }

    /// Set the format version.
    pub fn with_version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }
}

impl Default for PersistOptions {
    fn default() -> Self {
        Self {
            key: DEFAULT_STORAGE_KEY.to_string(),
            version: CURRENT_VERSION,
        }
    }
}

enum WriteCommand {
    Write(Vec<u8>),
    Flush(oneshot::Sender<()>),
}

/// Keeps the durable copy of a [`SessionStore`] in step with memory.
///
/// Every mutation enqueues a full encoding of the persisted subset; one
/// writer task drains the queue, so at most one write is in flight and writes
/// land in mutation order. Failures are logged and dropped: the in-memory
/// state stays authoritative.
///
/// Must be created inside a tokio runtime.
pub struct Persistence {
    store: Arc<SessionStore>,
    backend: Arc<dyn StorageBackend>,
    options: PersistOptions,
    tx: Option<mpsc::UnboundedSender<WriteCommand>>,
    subscription: SubscriptionId,
    worker: Option<JoinHandle<()>>,
}

impl Persistence {
    /// Build a store, attach persistence and rehydrate it.
    ///
    /// This is the initialization step to run before the UI first reads state.
    pub async fn open(
        backend: Arc<dyn StorageBackend>,
        options: PersistOptions,
    ) -> (Arc<SessionStore>, Self) {
        let store = Arc::new(SessionStore::new());
        let persistence = Self::attach(Arc::clone(&store), backend, options);
        persistence.rehydrate().await;
        (store, persistence)
    }

    /// Register on `store` and start the writer task.
    pub fn attach(
        store: Arc<SessionStore>,
        backend: Arc<dyn StorageBackend>,
        options: PersistOptions,
    ) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let worker = tokio::spawn(run_writer(Arc::clone(&backend), options.key.clone(), rx));

        let listener_tx = tx.clone();
        let version = options.version;
        let subscription = store.subscribe(move |next, _previous| {
            match codec::encode(next, version) {
                Ok(bytes) => {
                    if listener_tx.send(WriteCommand::Write(bytes)).is_err() {
                        warn!("persistence writer closed, snapshot dropped");
                    }
                }
                Err(e) => warn!(error = %e, "failed to encode session snapshot"),
            }
        });

        debug!(key = %options.key, subscription = %subscription, "persistence attached");

        Self {
            store,
            backend,
            options,
            tx: Some(tx),
            subscription,
            worker: Some(worker),
        }
    }

    /// Read the stored snapshot once and replace the store's state with it.
    ///
    /// Absent, unreadable or undecodable snapshots leave the defaults in
    /// place. The store is marked hydrated either way. Returns whether a
    /// snapshot was restored; always false once the store has hydrated.
    pub async fn rehydrate(&self) -> bool {
        if self.store.has_hydrated() {
            debug!(key = %self.options.key, "store already hydrated, skipping rehydration");
            return false;
        }

        let restored = match self.backend.get(&self.options.key).await {
            Ok(Some(bytes)) => match codec::decode(&bytes, self.options.version) {
                Ok(persisted) => Some(persisted),
                Err(e) => {
                    warn!(key = %self.options.key, error = %e, "ignoring stored session snapshot");
                    None
                }
            },
            Ok(None) => {
                debug!(key = %self.options.key, "no stored session snapshot");
                None
            }
            Err(e) => {
                warn!(key = %self.options.key, error = %e, "failed to read session snapshot");
                None
            }
        };

        let authenticated = restored.as_ref().map(|p| p.is_authenticated);
        if !self.store.finish_hydration(restored) {
            return false;
        }
        match authenticated {
            Some(authenticated) => {
                info!(authenticated, "session rehydrated");
                true
            }
            None => false,
        }
    }

    /// Wait until every write enqueued before this call has been attempted.
    pub async fn flush(&self) -> Result<()> {
        let (done_tx, done_rx) = oneshot::channel();
        self.tx
            .as_ref()
            .ok_or(SessionKeeperError::WriterClosed)?
            .send(WriteCommand::Flush(done_tx))
            .map_err(|_| SessionKeeperError::WriterClosed)?;
        done_rx.await.map_err(|_| SessionKeeperError::WriterClosed)
    }

    /// Stop persisting, letting queued writes finish first.
    pub async fn detach(mut self) {
        self.store.unsubscribe(self.subscription);
        self.tx.take();
        if let Some(worker) = self.worker.take() {
            if let Err(e) = worker.await {
                warn!("persistence writer task failed: {}", e);
            }
        }
    }

    /// The store being persisted.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Active options.
    pub fn options(&self) -> &PersistOptions {
        &self.options
    }
}

impl Drop for Persistence {
    fn drop(&mut self) {
        self.store.unsubscribe(self.subscription);
    }
}

async fn run_writer(
    backend: Arc<dyn StorageBackend>,
    key: String,
    mut rx: mpsc::UnboundedReceiver<WriteCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            WriteCommand::Write(bytes) => {
                let len = bytes.len();
                match backend.set(&key, bytes).await {
                    Ok(()) => debug!(key = %key, len, "session snapshot written"),
                    Err(e) => warn!(key = %key, error = %e, "failed to write session snapshot"),
                }
            }
            WriteCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
    debug!(key = %key, "persistence writer stopped");
}
