use crate::error::Result;
use crate::model::OwnerId;
use std::path::PathBuf;

/// Abstract interface for raw storage I/O.
/// This trait handles the "how" of storage (filesystem vs memory),
/// while ProfileStore handles the "what" (validation, repair, backups, recovery).
///
/// Backends are shared between threads; every method takes `&self`.
pub trait StorageBackend: Send + Sync {
    // --- Profile Operations ---

    /// Read the raw profile text of an owner.
    /// Returns Ok(None) if the owner has no profile file.
    /// Returns Err only on actual I/O errors (permissions, disk failure).
    fn read_profile(&self, owner: &OwnerId) -> Result<Option<String>>;

    /// Write the profile text, creating the owner location if needed.
    /// MUST be atomic (write to tmp then rename) so a reader never sees a partial file.
    fn write_profile(&self, owner: &OwnerId, content: &str) -> Result<()>;

    /// Delete the profile file only. Nothing else in the owner location is touched.
    fn delete_profile(&self, owner: &OwnerId) -> Result<()>;

    /// Path of the profile file. For MemBackend, a virtual path.
    fn profile_path(&self, owner: &OwnerId) -> PathBuf;

    // --- Owner Locations ---

    /// Owners that currently have a profile file, sorted.
    /// Directory names that are not valid owner ids are skipped.
    fn list_owners(&self) -> Result<Vec<OwnerId>>;

    /// Path of the owner's location (directory).
    fn owner_path(&self, owner: &OwnerId) -> PathBuf;

    /// Every entry below the owner location, relative to it, sorted.
    /// Directories carry a trailing `/`. Returns Ok(None) if the location does not exist.
    fn owner_entries(&self, owner: &OwnerId) -> Result<Option<Vec<String>>>;

    /// Remove the owner location if, and only if, it holds no entries.
    /// Returns true if it was removed.
    fn remove_owner_location(&self, owner: &OwnerId) -> Result<bool>;

    /// Create the owner location and the given subdirectories.
    fn ensure_owner_dirs(&self, owner: &OwnerId, subdirs: &[String]) -> Result<()>;

    // --- Backup Collection ---

    /// File names in the backup collection, sorted. Parsing is the BackupManager's job.
    fn list_backups(&self) -> Result<Vec<String>>;

    /// Returns Ok(None) if no backup has that name.
    fn read_backup(&self, name: &str) -> Result<Option<String>>;

    /// MUST be atomic, like `write_profile`.
    fn write_backup(&self, name: &str, content: &str) -> Result<()>;

    fn delete_backup(&self, name: &str) -> Result<()>;
}
