//! Persisted record format.
//!
//! A snapshot is stored as a JSON envelope:
//!
//! ```json
//! {"state": {"user": null, "isAuthenticated": false, ...}, "version": 0}
//! ```

use serde::{Deserialize, Serialize};

use crate::error::SessionKeeperError;
use crate::session::{PersistedSession, SessionState};
use crate::Result;

/// Format version written by default.
pub const CURRENT_VERSION: u32 = 0;

#[derive(Debug, Serialize, Deserialize)]
struct Envelope {
    state: PersistedSession,
    #[serde(default)]
    version: u32,
}

/// Encode the persisted subset of `state`.
pub fn encode(state: &SessionState, version: u32) -> Result<Vec<u8>> {
    let envelope = Envelope {
        state: state.persisted(),
        version,
    };
    serde_json::to_vec(&envelope).map_err(SessionKeeperError::Serialize)
}

/// Decode a stored envelope, rejecting other format versions.
pub fn decode(bytes: &[u8], expected_version: u32) -> Result<PersistedSession> {
    let envelope: Envelope =
        serde_json::from_slice(bytes).map_err(SessionKeeperError::Deserialize)?;

    if envelope.version != expected_version {
        return Err(SessionKeeperError::UnsupportedVersion {
            found: envelope.version,
            expected: expected_version,
        });
    }

    Ok(envelope.state)
}
