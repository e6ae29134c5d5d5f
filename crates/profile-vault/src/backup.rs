//! # Backups
//!
//! Every meaningful write of a profile is followed by a snapshot into the shared backup
//! collection. When a stored profile can be neither decoded nor repaired, the newest
//! snapshot that still validates replaces it.
//!
//! ## Naming
//!
//! ```text
//! backups/
//! ├── U1_1760612345678.json        # owner "U1", ms since epoch
//! └── my_user_1760612399001.json   # owner "my_user": split at the LAST underscore
//! ```
//!
//! Timestamps are strictly increasing per owner: a new snapshot gets
//! `max(now, newest + 1)`, bumped further until the file name is unused. If no later
//! timestamp fits in an `i64`, the snapshot is skipped.
//! Names that do not parse are ignored (never deleted).
//!
//! ## Retention
//!
//! After a successful snapshot every older entry of the same owner beyond the retention
//! count is deleted. The default keeps exactly one. Nothing else deletes a snapshot,
//! not even when its owner is gone.
//!
//! Backups are best effort. I/O failures are logged and reported as "no backup", never
//! raised to the caller: a failed snapshot must not fail the save that triggered it.

use chrono::{DateTime, Utc};
use std::collections::{BTreeSet, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::codec::Codec;
use crate::error::{Result, VaultError};
use crate::model::OwnerId;
use crate::store::StorageBackend;

pub const DEFAULT_GENERATIONS: usize = 1;

/// Immutable snapshot of one owner's profile text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupEntry {
    pub owner: OwnerId,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
    pub content: String,
}

impl BackupEntry {
    pub fn file_name(&self, extension: &str) -> String {
        backup_file_name(&self.owner, self.timestamp, extension)
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp_millis(self.timestamp)
    }
}

fn backup_file_name(owner: &OwnerId, timestamp: i64, extension: &str) -> String {
    format!("{}_{}.{}", owner, timestamp, extension)
}

fn next_timestamp(owner: &OwnerId, timestamp: i64) -> Result<i64> {
    timestamp.checked_add(1).ok_or_else(|| {
        VaultError::Store(format!(
            "no backup timestamp after {} is available for {}",
            timestamp, owner
        ))
    })
}

/// Parse `{owner}_{timestamp}.{extension}`.
pub fn parse_backup_name(name: &str, extension: &str) -> Option<(OwnerId, i64)> {
    let stem = name.strip_suffix(extension)?.strip_suffix('.')?;
    let (owner, timestamp) = stem.rsplit_once('_')?;
    let timestamp: i64 = timestamp.parse().ok()?;
    if timestamp < 0 {
        return None;
    }
    let owner = OwnerId::new(owner).ok()?;
    Some((owner, timestamp))
}

pub struct BackupManager<B: StorageBackend> {
    backend: Arc<B>,
    codec: Arc<dyn Codec>,
    generations: usize,
}

impl<B: StorageBackend> BackupManager<B> {
    pub fn new(backend: Arc<B>, codec: Arc<dyn Codec>) -> Self {
        Self {
            backend,
            codec,
            generations: DEFAULT_GENERATIONS,
        }
    }

    /// Number of snapshots kept per owner. At least one is always kept.
    pub fn with_generations(mut self, generations: usize) -> Self {
        self.generations = generations.max(1);
        self
    }

    pub fn generations(&self) -> usize {
        self.generations
    }

    /// Snapshot `content` for `owner`.
    ///
    /// Returns `None` when the newest snapshot already holds identical content, or when
    /// storage failed (logged at `warn`).
    pub fn backup(&self, owner: &OwnerId, content: &str) -> Option<BackupEntry> {
        match self.try_backup(owner, content) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(owner = %owner, error = %e, "backup failed");
                None
            }
        }
    }

    fn try_backup(&self, owner: &OwnerId, content: &str) -> Result<Option<BackupEntry>> {
        let existing = self.names_for(owner)?;

        if let Some((newest_ts, newest_name)) = existing.last() {
            if self.backend.read_backup(newest_name)?.as_deref() == Some(content) {
                debug!(owner = %owner, timestamp = newest_ts, "backup skipped, content unchanged");
                return Ok(None);
            }
        }

        let ext = self.codec.extension();
        let taken: HashSet<&str> = existing.iter().map(|(_, name)| name.as_str()).collect();
        let newest = existing.last().map(|(ts, _)| *ts);
        let mut timestamp = Utc::now().timestamp_millis();
        if let Some(newest) = newest {
            timestamp = timestamp.max(next_timestamp(owner, newest)?);
        }
        while taken.contains(backup_file_name(owner, timestamp, ext).as_str()) {
            timestamp = next_timestamp(owner, timestamp)?;
        }

        let entry = BackupEntry {
            owner: owner.clone(),
            timestamp,
            content: content.to_string(),
        };
        let name = entry.file_name(ext);
        self.backend.write_backup(&name, content)?;
        debug!(owner = %owner, backup = %name, "backup created");

        let pruned = self.prune(owner)?;
        if pruned > 0 {
            info!(owner = %owner, pruned, "pruned old backups");
        }
        Ok(Some(entry))
    }

    /// Delete all but the newest `generations` snapshots of `owner`.
    fn prune(&self, owner: &OwnerId) -> Result<usize> {
        let names = self.names_for(owner)?;
        let excess = names.len().saturating_sub(self.generations);
        for (_, name) in &names[..excess] {
            self.backend.delete_backup(name)?;
        }
        Ok(excess)
    }

    /// Snapshot names of `owner`, oldest first.
    fn names_for(&self, owner: &OwnerId) -> Result<Vec<(i64, String)>> {
        let ext = self.codec.extension();
        let mut names: Vec<(i64, String)> = self
            .backend
            .list_backups()?
            .into_iter()
            .filter_map(|name| match parse_backup_name(&name, ext) {
                Some((o, ts)) if &o == owner => Some((ts, name)),
                _ => None,
            })
            .collect();
        names.sort();
        Ok(names)
    }

    /// All readable snapshots of `owner`, oldest first.
    pub fn entries(&self, owner: &OwnerId) -> Result<Vec<BackupEntry>> {
        let mut entries = Vec::new();
        for (timestamp, name) in self.names_for(owner)? {
            if let Some(content) = self.backend.read_backup(&name)? {
                entries.push(BackupEntry {
                    owner: owner.clone(),
                    timestamp,
                    content,
                });
            }
        }
        Ok(entries)
    }

    /// Restore candidates, newest first. Storage errors yield no candidates.
    pub fn candidates(&self, owner: &OwnerId) -> Vec<BackupEntry> {
        match self.entries(owner) {
            Ok(mut entries) => {
                entries.reverse();
                entries
            }
            Err(e) => {
                warn!(owner = %owner, error = %e, "could not list backups");
                Vec::new()
            }
        }
    }

    /// The newest snapshot of `owner`, or `None` if there is none or it does not decode.
    pub fn most_recent(&self, owner: &OwnerId) -> Option<BackupEntry> {
        let newest = self.candidates(owner).into_iter().next()?;
        match self.codec.decode(&newest.content) {
            Ok(_) => Some(newest),
            Err(e) => {
                debug!(owner = %owner, error = %e, "newest backup does not decode");
                None
            }
        }
    }

    /// Owners that have at least one snapshot.
    pub fn owners(&self) -> Result<BTreeSet<OwnerId>> {
        let ext = self.codec.extension();
        Ok(self
            .backend
            .list_backups()?
            .iter()
            .filter_map(|name| parse_backup_name(name, ext).map(|(owner, _)| owner))
            .collect())
    }
}
