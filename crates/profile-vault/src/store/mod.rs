//! # Storage Layer
//!
//! This module holds the [`ProfileStore`] façade and the storage abstraction beneath it.
//! The [`StorageBackend`] trait lets the store work with different backends.
//!
//! ## Self-Healing Store
//!
//! A profile file is assumed to be *always potentially damaged*. Every load re-checks it:
//!
//! 1. **Missing**: No file → a profile with every field at its default. Nothing is written.
//! 2. **Sound**: Decodes and every field is acceptable → returned as is.
//! 3. **Repairable**: Invalid fields all have safe defaults → substituted, saved, returned.
//! 4. **Restorable**: Otherwise the newest backup that validates replaces the file.
//! 5. **Lost**: Otherwise the owner is quarantined for the rest of the process.
//!
//! ### Philosophy
//! - **Never Lose User Content**: Only an empty or undecodable profile file is ever
//!   deleted. The owner location goes only if nothing at all is left in it.
//! - **One Writer**: Every write happens under a single write gate.
//! - **Readers Never Block**: Writes are atomic (tmp file, then rename), so loads skip the gate.
//!
//! ## Save Path
//!
//! ```text
//! save(profile)
//!   └─ gate ─┬─ encode
//!            ├─ atomic write
//!            ├─ distance vs. last write of this owner
//!            └─ distance > 0 ─┬─ backup snapshot
//!                             └─ re-read + re-validate (logged only)
//! ```
//!
//! ## Implementations
//!
//! - [`fs_backend::FsBackend`]: Production backend on the local filesystem.
//! - [`mem_backend::MemBackend`]: For testing logic without filesystem I/O.
//!
//! ## Storage Layout
//!
//! ```text
//! <data_dir>/
//! ├── vault.toml                     # Optional configuration
//! ├── users/
//! │   └── <owner>/
//! │       ├── userdata.json          # The profile
//! │       └── music/ files/ ...      # User content, never auto-deleted
//! └── backups/
//!     └── <owner>_<millis>.json      # Shared backup collection
//! ```

pub mod backend;
pub mod fs_backend;
pub mod mem_backend;
pub mod profile_store;
mod recovery;
pub mod session;

pub use backend::StorageBackend;
pub use profile_store::{LoadSource, Loaded, ProfileStore, SaveOutcome, WriteBlock};
pub use session::Session;

/// Report from the `doctor` operation.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DoctorReport {
    /// Profiles that were sound as stored
    pub healthy: usize,
    /// Profiles fixed by substituting defaults
    pub repaired: usize,
    /// Profiles replaced by a backup
    pub restored: usize,
    /// Owners quarantined (this pass or earlier in the process)
    pub quarantined: usize,
    /// Owners that could not be checked because of storage errors
    pub failed: usize,
    /// Owners with snapshots but neither a stored profile nor a quarantine entry.
    /// Their snapshots are kept.
    pub detached_backup_owners: usize,
}

impl DoctorReport {
    pub fn checked(&self) -> usize {
        self.healthy + self.repaired + self.restored + self.quarantined + self.failed
    }
}
