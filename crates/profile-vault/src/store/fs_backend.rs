use super::backend::StorageBackend;
use crate::error::{Result, VaultError};
use crate::model::OwnerId;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use uuid::Uuid;

pub const DEFAULT_PROFILE_FILE: &str = "userdata.json";

pub struct FsBackend {
    users_root: PathBuf,
    backup_root: PathBuf,
    profile_file: String,
}

impl FsBackend {
    pub fn new(users_root: PathBuf, backup_root: PathBuf) -> Self {
        Self {
            users_root,
            backup_root,
            profile_file: DEFAULT_PROFILE_FILE.to_string(),
        }
    }

    pub fn with_profile_file(mut self, name: &str) -> Self {
        self.profile_file = name.to_string();
        self
    }

    pub fn profile_file(&self) -> &str {
        &self.profile_file
    }

    pub fn users_root(&self) -> &Path {
        &self.users_root
    }

    pub fn backup_root(&self) -> &Path {
        &self.backup_root
    }

    fn ensure_dir(&self, path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path).map_err(VaultError::Io)?;
        }
        Ok(())
    }

    /// Write to a hidden tmp file next to the target, then rename over it.
    fn write_atomic(&self, dir: &Path, target: &Path, content: &str) -> Result<()> {
        self.ensure_dir(dir)?;
        let tmp_path = dir.join(format!(".x-{}.tmp", Uuid::new_v4()));
        if let Err(e) = fs::write(&tmp_path, content) {
            let _ = fs::remove_file(&tmp_path);
            return Err(VaultError::Io(e));
        }
        if let Err(e) = fs::rename(&tmp_path, target) {
            let _ = fs::remove_file(&tmp_path);
            return Err(VaultError::Io(e));
        }
        Ok(())
    }

    fn read_optional(path: &Path) -> Result<Option<String>> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn backup_path(&self, name: &str) -> Result<PathBuf> {
        if name.is_empty() || name.contains(['/', '\\']) || name.starts_with('.') {
            return Err(VaultError::Store(format!("Invalid backup name: {}", name)));
        }
        Ok(self.backup_root.join(name))
    }

    fn collect_entries(root: &Path, dir: &Path, out: &mut Vec<String>) -> Result<()> {
        for entry in fs::read_dir(dir).map_err(VaultError::Io)? {
            let entry = entry.map_err(VaultError::Io)?;
            let path = entry.path();
            let relative = path
                .strip_prefix(root)
                .unwrap_or(&path)
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect::<Vec<_>>()
                .join("/");
            if entry.file_type().map_err(VaultError::Io)?.is_dir() {
                out.push(format!("{}/", relative));
                Self::collect_entries(root, &path, out)?;
            } else {
                out.push(relative);
            }
        }
        Ok(())
    }
}

impl StorageBackend for FsBackend {
    fn read_profile(&self, owner: &OwnerId) -> Result<Option<String>> {
        Self::read_optional(&self.profile_path(owner))
    }

    fn write_profile(&self, owner: &OwnerId, content: &str) -> Result<()> {
        let dir = self.owner_path(owner);
        self.write_atomic(&dir, &self.profile_path(owner), content)
    }

    fn delete_profile(&self, owner: &OwnerId) -> Result<()> {
        match fs::remove_file(self.profile_path(owner)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn profile_path(&self, owner: &OwnerId) -> PathBuf {
        self.owner_path(owner).join(&self.profile_file)
    }

    fn list_owners(&self) -> Result<Vec<OwnerId>> {
        if !self.users_root.exists() {
            return Ok(Vec::new());
        }

        let mut owners = Vec::new();
        for entry in fs::read_dir(&self.users_root).map_err(VaultError::Io)? {
            let entry = entry.map_err(VaultError::Io)?;
            if !entry.file_type().map_err(VaultError::Io)?.is_dir() {
                continue;
            }
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                continue;
            };
            if let Ok(owner) = OwnerId::new(name) {
                if self.profile_path(&owner).is_file() {
                    owners.push(owner);
                }
            }
        }
        owners.sort();
        Ok(owners)
    }

    fn owner_path(&self, owner: &OwnerId) -> PathBuf {
        self.users_root.join(owner.as_str())
    }

    fn owner_entries(&self, owner: &OwnerId) -> Result<Option<Vec<String>>> {
        let root = self.owner_path(owner);
        if !root.is_dir() {
            return Ok(None);
        }
        let mut entries = Vec::new();
        Self::collect_entries(&root, &root, &mut entries)?;
        entries.sort();
        Ok(Some(entries))
    }

    fn remove_owner_location(&self, owner: &OwnerId) -> Result<bool> {
        let root = self.owner_path(owner);
        if !root.is_dir() {
            return Ok(false);
        }
        if fs::read_dir(&root).map_err(VaultError::Io)?.next().is_some() {
            return Ok(false);
        }
        // remove_dir refuses non-empty directories, so a file created meanwhile survives.
        match fs::remove_dir(&root) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    fn ensure_owner_dirs(&self, owner: &OwnerId, subdirs: &[String]) -> Result<()> {
        let root = self.owner_path(owner);
        self.ensure_dir(&root)?;
        for sub in subdirs {
            if sub.is_empty() || sub.contains("..") || Path::new(sub).is_absolute() {
                return Err(VaultError::Config(format!("Invalid owner subdirectory: {}", sub)));
            }
            self.ensure_dir(&root.join(sub))?;
        }
        Ok(())
    }

    fn list_backups(&self) -> Result<Vec<String>> {
        if !self.backup_root.exists() {
            return Ok(Vec::new());
        }

        let mut names = Vec::new();
        for entry in fs::read_dir(&self.backup_root).map_err(VaultError::Io)? {
            let entry = entry.map_err(VaultError::Io)?;
            if !entry.file_type().map_err(VaultError::Io)?.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                if !name.starts_with('.') {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    fn read_backup(&self, name: &str) -> Result<Option<String>> {
        Self::read_optional(&self.backup_path(name)?)
    }

    fn write_backup(&self, name: &str, content: &str) -> Result<()> {
        let target = self.backup_path(name)?;
        self.write_atomic(&self.backup_root, &target, content)
    }

    fn delete_backup(&self, name: &str) -> Result<()> {
        match fs::remove_file(self.backup_path(name)?) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> FsBackend {
        FsBackend::new(dir.path().join("users"), dir.path().join("backups"))
    }

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    #[test]
    fn test_missing_profile_reads_as_none() {
        let dir = TempDir::new().unwrap();
        assert!(backend(&dir).read_profile(&owner("U1")).unwrap().is_none());
    }

    #[test]
    fn test_write_creates_owner_location() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        backend.write_profile(&owner("U1"), "{}").unwrap();
        assert!(dir.path().join("users/U1/userdata.json").is_file());
        assert_eq!(backend.read_profile(&owner("U1")).unwrap().as_deref(), Some("{}"));
    }

    #[test]
    fn test_custom_profile_file_name() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir).with_profile_file("prefs.json");
        backend.write_profile(&owner("U1"), "{}").unwrap();
        assert!(dir.path().join("users/U1/prefs.json").is_file());
        assert_eq!(backend.profile_file(), "prefs.json");
    }

    #[test]
    fn test_owner_entries_are_recursive_and_sorted() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        let u1 = owner("U1");
        backend
            .ensure_owner_dirs(&u1, &["music".to_string(), "files".to_string()])
            .unwrap();
        fs::write(dir.path().join("users/U1/music/song.mp3"), b"x").unwrap();

        let entries = backend.owner_entries(&u1).unwrap().unwrap();
        assert_eq!(entries, vec!["files/", "music/", "music/song.mp3"]);
        assert!(backend.owner_entries(&owner("U2")).unwrap().is_none());
    }

    #[test]
    fn test_remove_owner_location_only_when_empty() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        let u1 = owner("U1");
        backend.ensure_owner_dirs(&u1, &["music".to_string()]).unwrap();

        assert!(!backend.remove_owner_location(&u1).unwrap());
        assert!(dir.path().join("users/U1/music").is_dir());

        fs::remove_dir(dir.path().join("users/U1/music")).unwrap();
        assert!(backend.remove_owner_location(&u1).unwrap());
        assert!(!dir.path().join("users/U1").exists());
    }

    #[test]
    fn test_ensure_owner_dirs_rejects_escaping_paths() {
        let dir = TempDir::new().unwrap();
        let result = backend(&dir).ensure_owner_dirs(&owner("U1"), &["../evil".to_string()]);
        assert!(matches!(result, Err(VaultError::Config(_))));
    }

    #[test]
    fn test_backup_names_cannot_escape_collection() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        assert!(backend.write_backup("../U1_1.json", "{}").is_err());
        assert!(backend.read_backup("").is_err());
    }

    #[test]
    fn test_backup_roundtrip_and_delete() {
        let dir = TempDir::new().unwrap();
        let backend = backend(&dir);
        backend.write_backup("U1_100.json", "{\"a\":1}").unwrap();
        assert_eq!(backend.list_backups().unwrap(), vec!["U1_100.json"]);
        assert_eq!(
            backend.read_backup("U1_100.json").unwrap().as_deref(),
            Some("{\"a\":1}")
        );
        backend.delete_backup("U1_100.json").unwrap();
        assert!(backend.list_backups().unwrap().is_empty());
        // Deleting twice is fine
        backend.delete_backup("U1_100.json").unwrap();
    }
}
