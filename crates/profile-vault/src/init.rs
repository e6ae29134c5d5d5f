//! # Wiring a Vault
//!
//! [`initialize`] turns a data directory into a ready [`ProfileStore`] on the filesystem.
//!
//! ## Data Directory Resolution
//!
//! 1. **Override**: an explicit path passed by the embedding application.
//! 2. **Environment**: `PROFILE_VAULT_DATA`, primarily used by tests to isolate state.
//! 3. **OS default**: the per-user data directory (via the `directories` crate).
//!
//! ## Layout Derived From Configuration
//!
//! ```text
//! <data_dir>/
//! ├── vault.toml          # read by clapfig, optional
//! ├── <users_dir>/        # "users" by default
//! └── <backup_dir>/       # "backups" by default
//! ```
//!
//! Directories are created lazily by the first write, never by initialization.

use crate::codec::{Codec, JsonCodec};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::store::fs_backend::FsBackend;
use crate::store::ProfileStore;
use clapfig::{Clapfig, SearchMode, SearchPath};
use directories::ProjectDirs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

pub const DATA_DIR_ENV: &str = "PROFILE_VAULT_DATA";
pub const CONFIG_FILE: &str = "vault.toml";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultPaths {
    pub data_dir: PathBuf,
    pub users_dir: PathBuf,
    pub backup_dir: PathBuf,
    pub config_file: PathBuf,
}

impl VaultPaths {
    pub fn new(data_dir: PathBuf, config: &VaultConfig) -> Self {
        Self {
            users_dir: data_dir.join(&config.users_dir),
            backup_dir: data_dir.join(&config.backup_dir),
            config_file: data_dir.join(CONFIG_FILE),
            data_dir,
        }
    }
}

pub struct VaultContext {
    pub store: ProfileStore<FsBackend>,
    pub paths: VaultPaths,
    pub config: VaultConfig,
}

/// Pick the data directory: override, then environment, then the OS default.
pub fn resolve_data_dir(data_override: Option<PathBuf>) -> Result<PathBuf> {
    resolve_with(data_override, std::env::var(DATA_DIR_ENV).ok())
}

fn resolve_with(data_override: Option<PathBuf>, env_value: Option<String>) -> Result<PathBuf> {
    if let Some(path) = data_override {
        return Ok(path);
    }
    if let Some(value) = env_value.filter(|v| !v.trim().is_empty()) {
        return Ok(PathBuf::from(value));
    }
    ProjectDirs::from("org", "profile-vault", "profile-vault")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .ok_or_else(|| VaultError::Config("Could not determine a data directory".to_string()))
}

/// Load `vault.toml` from the data directory. A broken file falls back to defaults.
pub fn load_config(data_dir: &Path) -> VaultConfig {
    let loaded: std::result::Result<VaultConfig, _> = Clapfig::builder()
        .app_name("profile_vault")
        .file_name(CONFIG_FILE)
        .search_paths(vec![SearchPath::Path(data_dir.to_path_buf())])
        .search_mode(SearchMode::Merge)
        .load();
    match loaded {
        Ok(config) => config,
        Err(e) => {
            warn!(path = %data_dir.display(), error = %e, "could not load configuration, using defaults");
            VaultConfig::default()
        }
    }
}

/// Build the filesystem-backed store for a data directory.
pub fn initialize(data_override: Option<PathBuf>) -> Result<VaultContext> {
    let data_dir = resolve_data_dir(data_override)?;
    let config = load_config(&data_dir);
    let paths = VaultPaths::new(data_dir, &config);

    let codec = JsonCodec;
    let backend = FsBackend::new(paths.users_dir.clone(), paths.backup_dir.clone())
        .with_profile_file(&config.profile_file(codec.extension()));
    let store = ProfileStore::from_config(backend, &config);
    debug!(data_dir = %paths.data_dir.display(), "vault initialized");

    Ok(VaultContext {
        store,
        paths,
        config,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::OwnerId;
    use crate::schema::FieldValue;
    use std::fs;
    use tempfile::TempDir;

    // --- Data directory resolution ---

    #[test]
    fn test_override_wins_over_environment() {
        let result = resolve_with(
            Some(PathBuf::from("/explicit")),
            Some("/from-env".to_string()),
        );
        assert_eq!(result.unwrap(), PathBuf::from("/explicit"));
    }

    #[test]
    fn test_environment_used_without_override() {
        let result = resolve_with(None, Some("/from-env".to_string()));
        assert_eq!(result.unwrap(), PathBuf::from("/from-env"));
    }

    #[test]
    fn test_blank_environment_is_ignored() {
        let result = resolve_with(None, Some("  ".to_string()));
        // Falls through to the OS default, which differs from the blank value
        if let Ok(path) = result {
            assert_ne!(path, PathBuf::from("  "));
        }
    }

    #[test]
    fn test_paths_follow_config() {
        let config = VaultConfig {
            users_dir: "people".to_string(),
            backup_dir: "snapshots".to_string(),
            ..Default::default()
        };
        let paths = VaultPaths::new(PathBuf::from("/data"), &config);
        assert_eq!(paths.users_dir, PathBuf::from("/data/people"));
        assert_eq!(paths.backup_dir, PathBuf::from("/data/snapshots"));
        assert_eq!(paths.config_file, PathBuf::from("/data/vault.toml"));
    }

    // --- initialize() ---

    #[test]
    fn test_initialize_without_config_uses_defaults() {
        let temp = TempDir::new().unwrap();
        let ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.config, VaultConfig::default());
        assert_eq!(ctx.paths.users_dir, temp.path().join("users"));
        // Nothing is created until the first write
        assert!(!ctx.paths.users_dir.exists());
    }

    #[test]
    fn test_initialize_store_writes_under_data_dir() {
        let temp = TempDir::new().unwrap();
        let ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
        let u1 = OwnerId::new("U1").unwrap();
        ctx.store
            .set_field(&u1, "fontSize", FieldValue::Integer(44))
            .unwrap();
        assert!(temp.path().join("users/U1/userdata.json").is_file());
        assert_eq!(fs::read_dir(temp.path().join("backups")).unwrap().count(), 1);
    }

    #[test]
    fn test_initialize_reads_vault_toml() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(CONFIG_FILE),
            "profile_stem = \"prefs\"\nbackup_generations = 2\n",
        )
        .unwrap();

        let ctx = initialize(Some(temp.path().to_path_buf())).unwrap();
        assert_eq!(ctx.config.backup_generations, 2);
        assert_eq!(ctx.store.backups().generations(), 2);

        let u1 = OwnerId::new("U1").unwrap();
        ctx.store
            .set_field(&u1, "capsMode", FieldValue::Flag(true))
            .unwrap();
        assert!(temp.path().join("users/U1/prefs.json").is_file());
    }
}
