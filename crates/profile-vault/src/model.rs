//! # Domain Model: Owners, Profiles and Field Maps
//!
//! This module defines the core data structures: [`OwnerId`], [`Profile`], [`FieldMap`]
//! and the structured sub-records a profile may hold ([`ScreenStat`], [`MappedExecutable`]).
//!
//! ## The Problem
//!
//! A profile file lives on disk for years. Over that time it is edited by older and newer
//! builds, interrupted mid-write, hand-edited by curious users, and occasionally mangled
//! by sync tools. A strongly typed struct would refuse to decode the moment a single field
//! drifts, and the whole record would be lost to one bad value.
//!
//! ## The Approach
//!
//! A profile is a [`FieldMap`]: field id → [`FieldValue`]. Values keep whatever shape they
//! had on disk. A value whose shape matches none of the known kinds is kept as
//! [`FieldValue::Other`] so it can be reported and replaced instead of aborting the decode.
//! Deciding whether a value is *acceptable* is the schema's job (see [`crate::schema`]),
//! not the decoder's.
//!
//! ```text
//! Profile
//! ├── owner: OwnerId             <-- from the storage location, never from the file
//! └── data: FieldMap
//!     ├── "fontSize"    → Integer(30)
//!     ├── "fontName"    → Text("Agency FB")
//!     ├── "screenStat"  → Geometry(ScreenStat { .. })
//!     └── "mappedExecutables" → Executables([..])
//! ```
//!
//! ## Owner Identifiers
//!
//! Owner ids name directories and prefix backup filenames, so they are restricted to
//! `[A-Za-z0-9_-]`, non-empty, at most [`OwnerId::MAX_LEN`] bytes. Fresh ids are UUID v4.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use crate::error::{Result, VaultError};
use crate::schema::{FieldValue, SchemaRegistry};

/// Stable, filesystem-safe identifier of a profile's owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    pub const MAX_LEN: usize = 128;

    pub fn new(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();
        let valid = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
        if valid {
            Ok(Self(raw))
        } else {
            Err(VaultError::InvalidOwner(raw))
        }
    }

    /// Generate a fresh owner id for first-run creation.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OwnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = VaultError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<OwnerId> for String {
    fn from(value: OwnerId) -> Self {
        value.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Direction {
    #[default]
    Top,
    Bottom,
    Left,
    Right,
}

/// Window geometry of the main frame when the owner last logged out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenStat {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    pub monitor: i32,
    pub pinned: bool,
    pub direction: Direction,
}

/// A named shortcut to an external program.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MappedExecutable {
    pub name: String,
    pub filepath: String,
}

impl MappedExecutable {
    pub fn new(name: impl Into<String>, filepath: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            filepath: filepath.into(),
        }
    }

    /// Entries with an empty name or path cannot be invoked.
    pub fn is_blank(&self) -> bool {
        self.name.trim().is_empty() || self.filepath.trim().is_empty()
    }
}

/// The serialized body of a profile: field id → value, in stable key order.
///
/// Key order is deterministic so that encoding the same map twice yields the same text,
/// which the change detector relies on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.0.get(id)
    }

    pub fn insert(&mut self, id: impl Into<String>, value: FieldValue) -> Option<FieldValue> {
        self.0.insert(id.into(), value)
    }

    pub fn remove(&mut self, id: &str) -> Option<FieldValue> {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// A map holding every schema field at its default value.
    pub fn defaults(schema: &dyn SchemaRegistry) -> Self {
        schema
            .fields()
            .iter()
            .map(|spec| (spec.id.to_string(), spec.default.to_value()))
            .collect()
    }
}

impl FromIterator<(String, FieldValue)> for FieldMap {
    fn from_iter<I: IntoIterator<Item = (String, FieldValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// The authoritative record for one owner.
#[derive(Debug, Clone, PartialEq)]
pub struct Profile {
    owner: OwnerId,
    data: FieldMap,
}

impl Profile {
    pub fn new(owner: OwnerId, data: FieldMap) -> Self {
        Self { owner, data }
    }

    /// First-run construction: every schema field set to its default.
    pub fn with_defaults(owner: OwnerId, schema: &dyn SchemaRegistry) -> Self {
        Self::new(owner, FieldMap::defaults(schema))
    }

    pub fn owner(&self) -> &OwnerId {
        &self.owner
    }

    pub fn data(&self) -> &FieldMap {
        &self.data
    }

    pub fn into_data(self) -> FieldMap {
        self.data
    }

    pub fn get(&self, id: &str) -> Option<&FieldValue> {
        self.data.get(id)
    }

    /// Raw setter. Kind checks happen in the store's `set_field`, not here.
    pub(crate) fn set(&mut self, id: &str, value: FieldValue) {
        self.data.insert(id, value);
    }
}
