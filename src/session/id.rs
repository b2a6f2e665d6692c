//! Subscription identifier type.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Global counter for subscription ID generation.
static COUNTER: AtomicU64 = AtomicU64::new(1);

/// Handle for a listener registered on a session store.
///
/// IDs come from an atomic counter, so they are unique within a single
/// process lifetime. The ID is displayed as `sub-XXXXXXXX` where X is a
/// hexadecimal digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Create a new unique subscription ID.
    pub fn new() -> Self {
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{:08x}", self.0)
    }
}
