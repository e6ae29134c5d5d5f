//! Field value representation.
//!
//! This module defines the runtime representation of profile field values, used for
//! decoding, validation, and the generic `get_field` / `set_field` accessors.

use serde::{Deserialize, Serialize};

use crate::model::{MappedExecutable, ScreenStat};

/// Runtime representation of a profile field value.
///
/// Decoding is shape-driven (untagged): the first variant whose shape matches wins.
/// Anything else lands in [`FieldValue::Other`], which no field kind accepts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// On/off preference (e.g., `hourlyChimes`)
    Flag(bool),

    /// Whole number (e.g., `fontSize`, `fillOpacity`)
    Integer(i64),

    /// Free text, colors, formats and identifiers
    Text(String),

    /// Window geometry sub-record (`screenStat`)
    Geometry(ScreenStat),

    /// List of mapped external programs (`mappedExecutables`)
    Executables(Vec<MappedExecutable>),

    /// A decoded value that matches no known shape (null, floats, stray objects)
    Other(serde_json::Value),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        FieldValue::Text(value.into())
    }

    pub fn as_flag(&self) -> Option<bool> {
        match self {
            FieldValue::Flag(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            FieldValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_geometry(&self) -> Option<&ScreenStat> {
        match self {
            FieldValue::Geometry(g) => Some(g),
            _ => None,
        }
    }

    pub fn as_executables(&self) -> Option<&[MappedExecutable]> {
        match self {
            FieldValue::Executables(v) => Some(v),
            _ => None,
        }
    }

    /// Short name of the value's shape, for log lines.
    pub fn shape(&self) -> &'static str {
        match self {
            FieldValue::Flag(_) => "flag",
            FieldValue::Integer(_) => "integer",
            FieldValue::Text(_) => "text",
            FieldValue::Geometry(_) => "geometry",
            FieldValue::Executables(_) => "executables",
            FieldValue::Other(_) => "unrecognized",
        }
    }
}
