//! # profile-vault
//!
//! Durable storage for per-user profiles that heals itself.
//!
//! Each owner has one profile: a flat record of preferences described by a schema.
//! The vault stores it, rejects and repairs damaged copies, snapshots every meaningful
//! change, and restores from a snapshot when repair is impossible.
//!
//! ## Architecture
//!
//! ```text
//!                  ┌──────────────────────────────┐
//!   callers ──────►│ ProfileStore (store)         │◄── Session (active profile)
//!                  │  write gate, load/save,      │
//!                  │  field access, doctor        │
//!                  └──┬────────┬────────┬────────┬┘
//!                     │        │        │        │
//!              Repairer   ChangeDetector│   Quarantine
//!             (validate,   (change)     │  (quarantine)
//!               repair)                 │
//!                     │          BackupManager (backup)
//!                     ▼                 │
//!              SchemaRegistry           ▼
//!                 (schema)       StorageBackend ── FsBackend / MemBackend
//!                                       ▲
//!                     Codec (codec) ────┘ text in, text out
//! ```
//!
//! - [`schema`]: the field table. Every field's kind, default and repairability.
//! - [`model`]: owners, profiles, field maps and their sub-records.
//! - [`codec`]: record ⇄ text. JSON ships with the crate.
//! - [`validate`] / [`repair`]: the Checking → Repairing state machine.
//! - [`change`]: edit distance between successive writes.
//! - [`backup`]: timestamped snapshots and their retention.
//! - [`quarantine`]: owners given up on for the rest of the process.
//! - [`notify`]: telling a human about corruption that needs hands.
//! - [`store`]: the façade tying everything together.
//! - [`config`] / [`init`]: `vault.toml` and wiring a filesystem-backed store.
//!
//! ## Quick Start
//!
//! ```ignore
//! let ctx = profile_vault::init::initialize(None)?;
//! let owner = OwnerId::new("U1")?;
//! ctx.store.set_field(&owner, "fontSize", FieldValue::Integer(42))?;
//! let profile = ctx.store.load(&owner)?;
//! ```
//!
//! The crate logs through `tracing` and installs no subscriber.

pub mod backup;
pub mod change;
pub mod codec;
pub mod config;
pub mod error;
pub mod init;
pub mod model;
pub mod notify;
pub mod quarantine;
pub mod repair;
pub mod schema;
pub mod store;
pub mod validate;

#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;

pub use error::{Result, VaultError};
pub use model::{FieldMap, OwnerId, Profile};
pub use schema::FieldValue;
pub use store::{ProfileStore, Session};
