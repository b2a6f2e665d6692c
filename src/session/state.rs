//! Session snapshot and its persisted subset.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::{Profile, ProfileStatus};
use crate::error::SessionKeeperError;

/// Opaque user identity record.
///
/// The shape is owned by the application; the store only holds it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct User(Map<String, Value>);

impl User {
    /// Create an empty user record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field, builder style.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Get a field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// The `id` field rendered as a string, if it is a string or a number.
    pub fn id(&self) -> Option<String> {
        match self.0.get("id")? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }
}

impl From<Map<String, Value>> for User {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for User {
    type Error = SessionKeeperError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SessionKeeperError::InvalidRecord(format!(
                "user must be a JSON object, got {other}"
            ))),
        }
    }
}

/// Immutable snapshot of the session.
///
/// Snapshots are only produced by [`SessionStore`](super::SessionStore)
/// operations. `is_authenticated` is stored rather than derived and is kept
/// equal to `user.is_some()` by `set_user`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub(crate) user: Option<User>,
    pub(crate) is_authenticated: bool,
    pub(crate) access_token: Option<String>,
    pub(crate) refresh_token: Option<String>,
    pub(crate) profile: Option<Profile>,
    pub(crate) profile_status: ProfileStatus,
    pub(crate) loading: bool,
}

impl SessionState {
    /// Current user record.
    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    /// Whether a user is signed in, as of the last mutation.
    pub fn is_authenticated(&self) -> bool {
        self.is_authenticated
    }

    /// Current access token.
    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    /// Current refresh token.
    pub fn refresh_token(&self) -> Option<&str> {
        self.refresh_token.as_deref()
    }

    /// Current profile.
    pub fn profile(&self) -> Option<&Profile> {
        self.profile.as_ref()
    }

    /// Current profile status.
    pub fn profile_status(&self) -> ProfileStatus {
        self.profile_status
    }

    /// Whether an external operation is in flight. Never persisted.
    pub fn loading(&self) -> bool {
        self.loading
    }

    /// The subset of this snapshot that is written to durable storage.
    pub fn persisted(&self) -> PersistedSession {
        PersistedSession::from(self)
    }

    /// Check if every field is at its process-start default.
    pub fn is_default(&self) -> bool {
        *self == SessionState::default()
    }
}

/// Persisted subset of [`SessionState`]: everything except `loading`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PersistedSession {
    pub user: Option<User>,
    pub is_authenticated: bool,
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub profile: Option<Profile>,
    pub profile_status: ProfileStatus,
}

impl From<&SessionState> for PersistedSession {
    fn from(state: &SessionState) -> Self {
        Self {
            user: state.user.clone(),
            is_authenticated: state.is_authenticated,
            access_token: state.access_token.clone(),
            refresh_token: state.refresh_token.clone(),
            profile: state.profile.clone(),
            profile_status: state.profile_status,
        }
    }
}

impl From<PersistedSession> for SessionState {
    fn from(persisted: PersistedSession) -> Self {
        Self {
            user: persisted.user,
            is_authenticated: persisted.is_authenticated,
            access_token: persisted.access_token,
            refresh_token: persisted.refresh_token,
            profile: persisted.profile,
            profile_status: persisted.profile_status,
            loading: false,
        }
    }
}
