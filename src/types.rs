//! Core types for the record store.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A value that can be held by a [`Store`](crate::Store).
///
/// The only requirement is an identifier. Two records are the same entry when
/// their identifiers are equal ignoring case.
pub trait Record {
    /// The record's identifier, as supplied by the caller.
    fn id(&self) -> &str;

    /// The normalized key this record is stored under.
    fn key(&self) -> RecordKey {
        RecordKey::new(self.id())
    }
}

/// Normalized (lower-cased) record identifier used as the map key.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordKey(String);

impl RecordKey {
    /// Normalize an identifier into a key.
    pub fn new(id: &str) -> Self {
        RecordKey(normalize_id(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordKey({:?})", self.0)
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Lower-case an identifier. Full Unicode lower-casing, not ASCII only.
pub fn normalize_id(id: &str) -> String {
    id.to_lowercase()
}

/// Example record: a creature with attack and defense ratings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pokemon {
    pub id: String,
    pub attack: i64,
    pub defense: i64,
}

impl Pokemon {
    pub fn new(id: impl Into<String>, attack: i64, defense: i64) -> Self {
        Self {
            id: id.into(),
            attack,
            defense,
        }
    }
}

impl Record for Pokemon {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Store statistics.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct StoreStats {
    /// Distinct normalized keys currently stored.
    pub record_count: usize,
    /// Total `set` calls that reached the map.
    pub set_count: u64,
    /// `set` calls that replaced an existing entry.
    pub overwrite_count: u64,
    pub before_listener_count: usize,
    pub after_listener_count: usize,
}
