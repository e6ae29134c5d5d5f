use super::backend::StorageBackend;
use super::fs_backend::DEFAULT_PROFILE_FILE;
use crate::error::{Result, VaultError};
use crate::model::OwnerId;
use parking_lot::Mutex;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

#[derive(Default)]
struct MemState {
    profiles: BTreeMap<OwnerId, String>,
    /// Owner locations and their non-profile entries (dirs end in `/`)
    locations: BTreeMap<OwnerId, BTreeSet<String>>,
    backups: BTreeMap<String, String>,
}

/// In-memory storage backend for testing.
///
/// State sits behind one mutex so the backend can be shared between threads like the
/// filesystem one. Counters record how often the store touched storage.
#[derive(Default)]
pub struct MemBackend {
    state: Mutex<MemState>,
    simulate_write_error: AtomicBool,
    simulate_backup_error: AtomicBool,
    profile_reads: AtomicUsize,
    profile_writes: AtomicUsize,
    backup_writes: AtomicUsize,
}

impl MemBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every write (profile and backup) fail.
    pub fn set_simulate_write_error(&self, simulate: bool) {
        self.simulate_write_error.store(simulate, Ordering::SeqCst);
    }

    /// Make only backup writes fail.
    pub fn set_simulate_backup_error(&self, simulate: bool) {
        self.simulate_backup_error.store(simulate, Ordering::SeqCst);
    }

    pub fn profile_reads(&self) -> usize {
        self.profile_reads.load(Ordering::SeqCst)
    }

    pub fn profile_writes(&self) -> usize {
        self.profile_writes.load(Ordering::SeqCst)
    }

    pub fn backup_writes(&self) -> usize {
        self.backup_writes.load(Ordering::SeqCst)
    }

    /// Test helper: place a user file (or a directory, with a trailing `/`) in the
    /// owner location. Parent directories are added too.
    pub fn add_owner_entry(&self, owner: &OwnerId, entry: &str) {
        let mut state = self.state.lock();
        let entries = state.locations.entry(owner.clone()).or_default();
        let mut prefix = String::new();
        let parts: Vec<&str> = entry.trim_end_matches('/').split('/').collect();
        for (i, part) in parts.iter().enumerate() {
            prefix.push_str(part);
            if i + 1 < parts.len() || entry.ends_with('/') {
                prefix.push('/');
            }
            entries.insert(prefix.clone());
        }
    }

    /// Test helper: store profile text without touching the counters.
    pub fn put_profile(&self, owner: &OwnerId, content: &str) {
        let mut state = self.state.lock();
        state.locations.entry(owner.clone()).or_default();
        state.profiles.insert(owner.clone(), content.to_string());
    }

    /// Test helper: store a backup without touching the counters.
    pub fn put_backup(&self, name: &str, content: &str) {
        self.state
            .lock()
            .backups
            .insert(name.to_string(), content.to_string());
    }

    fn check_write(&self) -> Result<()> {
        if self.simulate_write_error.load(Ordering::SeqCst) {
            return Err(VaultError::Store("Simulated write error".to_string()));
        }
        Ok(())
    }
}

impl StorageBackend for MemBackend {
    fn read_profile(&self, owner: &OwnerId) -> Result<Option<String>> {
        self.profile_reads.fetch_add(1, Ordering::SeqCst);
        Ok(self.state.lock().profiles.get(owner).cloned())
    }

    fn write_profile(&self, owner: &OwnerId, content: &str) -> Result<()> {
        self.check_write()?;
        self.profile_writes.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock();
        state.locations.entry(owner.clone()).or_default();
        state.profiles.insert(owner.clone(), content.to_string());
        Ok(())
    }

    fn delete_profile(&self, owner: &OwnerId) -> Result<()> {
        self.state.lock().profiles.remove(owner);
        Ok(())
    }

    fn profile_path(&self, owner: &OwnerId) -> PathBuf {
        self.owner_path(owner).join(DEFAULT_PROFILE_FILE)
    }

    fn list_owners(&self) -> Result<Vec<OwnerId>> {
        Ok(self.state.lock().profiles.keys().cloned().collect())
    }

    fn owner_path(&self, owner: &OwnerId) -> PathBuf {
        PathBuf::from(format!("memory://users/{}", owner))
    }

    fn owner_entries(&self, owner: &OwnerId) -> Result<Option<Vec<String>>> {
        let state = self.state.lock();
        let Some(extra) = state.locations.get(owner) else {
            return Ok(None);
        };
        let mut entries: Vec<String> = extra.iter().cloned().collect();
        if state.profiles.contains_key(owner) {
            entries.push(DEFAULT_PROFILE_FILE.to_string());
        }
        entries.sort();
        Ok(Some(entries))
    }

    fn remove_owner_location(&self, owner: &OwnerId) -> Result<bool> {
        let mut state = self.state.lock();
        let empty = !state.profiles.contains_key(owner)
            && state.locations.get(owner).is_some_and(|e| e.is_empty());
        if empty {
            state.locations.remove(owner);
        }
        Ok(empty)
    }

    fn ensure_owner_dirs(&self, owner: &OwnerId, subdirs: &[String]) -> Result<()> {
        self.check_write()?;
        let mut state = self.state.lock();
        let entries = state.locations.entry(owner.clone()).or_default();
        for sub in subdirs {
            entries.insert(format!("{}/", sub.trim_end_matches('/')));
        }
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        Ok(self.state.lock().backups.keys().cloned().collect())
    }

    fn read_backup(&self, name: &str) -> Result<Option<String>> {
        Ok(self.state.lock().backups.get(name).cloned())
    }

    fn write_backup(&self, name: &str, content: &str) -> Result<()> {
        self.check_write()?;
        if self.simulate_backup_error.load(Ordering::SeqCst) {
            return Err(VaultError::Store("Simulated backup error".to_string()));
        }
        self.backup_writes.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .backups
            .insert(name.to_string(), content.to_string());
        Ok(())
    }

    fn delete_backup(&self, name: &str) -> Result<()> {
        self.state.lock().backups.remove(name);
        Ok(())
    }
}
