//! Profile record and completion status.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::SessionKeeperError;

/// User profile fields as an explicit key/value mapping.
///
/// The shape is application-defined. Updates go through [`Profile::merge`],
/// which only ever touches top-level keys.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Profile(Map<String, Value>);

impl Profile {
    /// Create an empty profile.
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

    /// Set a single field, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(key.into(), value.into())
    }

    /// Shallow merge: every top-level key in `partial` replaces the key here.
    ///
    /// Keys absent from `partial` are kept. Nested objects are replaced
    /// wholesale, never merged recursively.
    pub fn merge(&mut self, partial: Profile) {
        for (key, value) in partial.0 {
            self.0.insert(key, value);
        }
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the profile has no fields.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over the fields in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Borrow the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Consume into the underlying map.
    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Profile {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl TryFrom<Value> for Profile {
    type Error = SessionKeeperError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(SessionKeeperError::InvalidRecord(format!(
                "profile must be a JSON object, got {other}"
            ))),
        }
    }
}

/// Whether the user's profile data is known to be complete.
///
/// Persisted as `null`, `"complete"` or `"incomplete"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProfileStatus {
    /// Not determined yet.
    #[default]
    Unknown,
    /// All required profile fields are present.
    Complete,
    /// Some required profile fields are missing.
    Incomplete,
}

impl ProfileStatus {
    /// Persisted representation; `None` for [`ProfileStatus::Unknown`].
    pub fn as_persisted(&self) -> Option<&'static str> {
        match self {
            ProfileStatus::Unknown => None,
            ProfileStatus::Complete => Some("complete"),
            ProfileStatus::Incomplete => Some("incomplete"),
        }
    }

    /// Check if the status has been determined.
    pub fn is_known(&self) -> bool {
        !matches!(self, ProfileStatus::Unknown)
    }
}

impl fmt::Display for ProfileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_persisted().unwrap_or("unknown"))
    }
}

impl FromStr for ProfileStatus {
    type Err = SessionKeeperError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "complete" => Ok(ProfileStatus::Complete),
            "incomplete" => Ok(ProfileStatus::Incomplete),
            "unknown" | "null" => Ok(ProfileStatus::Unknown),
            other => Err(SessionKeeperError::InvalidProfileStatus(other.into())),
        }
    }
}

impl Serialize for ProfileStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.as_persisted().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ProfileStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)?.as_deref() {
            None => Ok(ProfileStatus::Unknown),
            Some("complete") => Ok(ProfileStatus::Complete),
            Some("incomplete") => Ok(ProfileStatus::Incomplete),
            Some(other) => Err(D::Error::custom(format!(
                "unknown profile status '{other}'"
            ))),
        }
    }
}
