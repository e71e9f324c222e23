//! Entity record shared by every mirrored family

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Process-local identifier assigned by the local mirror at insert time.
///
/// Backed by an `AUTOINCREMENT` rowid, so a value is never handed out twice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(i64);

impl RecordId {
    #[must_use]
    pub const fn new(value: i64) -> Self {
        Self(value)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RecordId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse::<i64>()
            .ok()
            .filter(|value| *value > 0)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput(format!("invalid record id: {s}")))
    }
}

/// Identifier (document path) of a record in the remote source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RemoteId(String);

impl RemoteId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RemoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for RemoteId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(Error::InvalidInput("remote id cannot be empty".into()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

/// Domain fields of a mirrored family.
///
/// The sync layer treats payloads as opaque apart from the family name (used
/// as table discriminator and remote collection name) and the searchable
/// text fields.
pub trait Payload:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Collection name, e.g. `photos`.
    const FAMILY: &'static str;

    /// Named text fields considered by substring search.
    fn text_fields(&self) -> Vec<(&'static str, String)>;

    /// Reject payloads that must not be stored.
    fn validate(&self) -> crate::Result<()> {
        Ok(())
    }

    /// One-line summary for list rows.
    fn summary(&self) -> String {
        self.text_fields()
            .into_iter()
            .find_map(|(_, text)| {
                text.lines()
                    .map(str::trim)
                    .find(|line| !line.is_empty())
                    .map(str::to_string)
            })
            .unwrap_or_default()
    }
}

/// A mirrored entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record<P> {
    /// Local mirror identifier
    pub id: RecordId,
    /// Remote identifier, `None` until first successful sync
    pub remote_id: Option<RemoteId>,
    /// Domain fields
    pub payload: P,
    /// Creation timestamp (Unix ms), never mutated
    pub created_at: i64,
    /// User favorite flag
    pub favorite: bool,
}

impl<P> Record<P> {
    /// Whether the record has reached the remote source at least once.
    pub const fn is_synced(&self) -> bool {
        self.remote_id.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_id_parse_rejects_garbage() {
        assert_eq!("42".parse::<RecordId>().unwrap(), RecordId::new(42));
        assert_eq!(" 7 ".parse::<RecordId>().unwrap(), RecordId::new(7));
        assert!("abc".parse::<RecordId>().is_err());
        assert!("0".parse::<RecordId>().is_err());
        assert!("-3".parse::<RecordId>().is_err());
    }

    #[test]
    fn remote_id_parse_trims_and_rejects_empty() {
        assert_eq!(
            " photos/abc ".parse::<RemoteId>().unwrap().as_str(),
            "photos/abc"
        );
        assert!("   ".parse::<RemoteId>().is_err());
    }

    #[test]
    fn ids_serialize_transparently() {
        let json = serde_json::to_string(&RecordId::new(9)).unwrap();
        assert_eq!(json, "9");
        let json = serde_json::to_string(&RemoteId::new("doc-1")).unwrap();
        assert_eq!(json, "\"doc-1\"");
    }
}
