//! Session state module.
//!
//! This module provides the in-memory session snapshot, the profile types,
//! and the store that owns the snapshot and notifies listeners.

mod id;
mod profile;
mod state;
mod store;

pub use id::SubscriptionId;
pub use profile::{Profile, ProfileStatus};
pub use state::{PersistedSession, SessionState, User};
pub use store::{Listener, SessionStore};
