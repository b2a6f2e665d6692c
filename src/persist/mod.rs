//! Durable persistence for the session store.
//!
//! This module provides:
//! - The [`StorageBackend`] boundary and two implementations
//! - The persisted record format
//! - [`Persistence`], the write-behind observer and rehydration step
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_keeper::persist::{FileBackend, PersistOptions, Persistence};
//!
//! # async fn run() -> session_keeper::Result<()> {
//! let backend = Arc::new(FileBackend::new("/var/lib/app"));
//! let (store, persistence) = Persistence::open(backend, PersistOptions::default()).await;
//!
//! store.set_tokens(Some("access".into()), Some("refresh".into()));
//! persistence.flush().await?;
//! # Ok(())
//! # }
//! ```

mod backend;
pub mod codec;
mod writer;

pub use backend::{key_file_name, FileBackend, MemoryBackend, StorageBackend};
pub use writer::{PersistOptions, Persistence, DEFAULT_STORAGE_KEY};
