//! # Profile Schema
//!
//! This module is the field-accessor table for profiles. Instead of looking fields up
//! by reflecting over getter names at runtime, every field is declared once in
//! [`PROFILE_FIELDS`] and accessed through it:
//!
//! - **Kinds**: What shapes and ranges a field accepts ([`FieldKind`])
//! - **Defaults**: What a field holds after first-run creation or a repair ([`DefaultValue`])
//! - **Repairability**: Whether an invalid value may be replaced without human input
//! - **Values**: The tagged runtime representation ([`FieldValue`])
//!
//! ## Field Kinds
//!
//! | Kind | Examples | Accepts |
//! |------|----------|---------|
//! | `Text` | `username`, `fontName` | Any text |
//! | `Color` | `foregroundColor` | `RRGGBB` hex |
//! | `Flag` | `hourlyChimes` | true/false |
//! | `Integer` | `fontSize` | Whole number in range |
//! | `Geometry` | `screenStat` | Window geometry record |
//! | `Executables` | `mappedExecutables` | Distinct, non-blank entries |
//!
//! ## Usage
//!
//! ```ignore
//! let spec = ProfileSchema.get("fontSize").ok_or(...)?;
//! if !spec.accepts(&value) { ... }
//! ```
//!
//! Other registries (tests, embedders with their own preferences) implement
//! [`SchemaRegistry`]; a plain `Vec<FieldSpec>` already does.

mod spec;
mod value;

pub use spec::{
    DefaultValue, FieldKind, FieldSpec, ProfileSchema, SchemaRegistry, PROFILE_FIELDS,
};
pub use value::FieldValue;
