//! # session-keeper
//!
//! Persisted client-side authentication and profile session store.
//!
//! The store holds the signed-in user, tokens, profile and profile status
//! in memory, exposes a fixed set of infallible mutators, and keeps a
//! durable copy of everything except the transient `loading` flag in step
//! through an asynchronous, order-preserving writer.
//!
//! ## Features
//!
//! - **Atomic snapshots**: every mutation swaps in a whole new state
//! - **Write-behind persistence**: one write per mutation, never reordered
//! - **Rehydration**: an explicit init step restores the last session
//! - **Pluggable storage**: any async key-value backend
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use session_keeper::{MemoryBackend, PersistOptions, Persistence, Profile, User};
//!
//! #[tokio::main]
//! async fn main() -> session_keeper::Result<()> {
//!     // Initialize logging
//!     session_keeper::logging::try_init().ok();
//!
//!     // Open the store and restore the previous session
//!     let backend = Arc::new(MemoryBackend::new());
//!     let (store, persistence) = Persistence::open(backend, PersistOptions::default()).await;
//!
//!     store.set_user(Some(User::new().with("id", 1)));
//!     store.update_profile(Profile::new().with("name", "Jo"));
//!
//!     persistence.flush().await?;
//!     println!("authenticated: {}", store.snapshot().is_authenticated());
//!
//!     Ok(())
//! }
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod persist;
pub mod session;

// Re-export commonly used types
pub use error::{Result, SessionKeeperError};
pub use persist::{FileBackend, MemoryBackend, PersistOptions, Persistence, StorageBackend};
pub use session::{
    PersistedSession, Profile, ProfileStatus, SessionState, SessionStore, SubscriptionId, User,
};
