//! # Configuration
//!
//! Vault configuration is managed by [`clapfig`], which handles layered loading
//! from TOML files, environment variables, and programmatic overrides.
//!
//! ## Storage Hierarchy
//!
//! Configuration is resolved in priority order:
//! 1. **Environment variables**: `PROFILE_VAULT__BACKUP_GENERATIONS`, etc.
//! 2. **Data Directory Config**: `<data_dir>/vault.toml`.
//! 3. **Compiled Defaults**: Built-in fallbacks via `#[config(default = ...)]`.
//!
//! ## Available Settings
//!
//! | Key | Default | Description |
//! |-----|---------|-------------|
//! | `profile_stem` | `userdata` | Profile file name without extension |
//! | `users_dir` | `users` | Directory (under the data dir) holding one location per owner |
//! | `backup_dir` | `backups` | Directory (under the data dir) holding the backup collection |
//! | `max_repair_attempts` | `10` | Checking → Repairing cycles before giving up |
//! | `backup_generations` | `1` | Snapshots kept per owner |
//! | `owner_subdirs` | `["backgrounds", "music", "files"]` | Created for every provisioned owner |

use confique::Config;
use serde::{Deserialize, Serialize};

use crate::backup::DEFAULT_GENERATIONS;
use crate::repair::DEFAULT_MAX_ATTEMPTS;

fn default_owner_subdirs() -> Vec<String> {
    vec![
        "backgrounds".to_string(),
        "music".to_string(),
        "files".to_string(),
    ]
}

/// Configuration for the vault, stored in `vault.toml`.
#[derive(Config, Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(default)]
pub struct VaultConfig {
    /// Profile file name without extension; the codec supplies the extension
    #[config(default = "userdata")]
    pub profile_stem: String,

    #[config(default = "users")]
    pub users_dir: String,

    #[config(default = "backups")]
    pub backup_dir: String,

    /// How many Checking → Repairing cycles a load may run before giving up
    #[config(default = 10)]
    pub max_repair_attempts: u32,

    /// Snapshots kept per owner. Recovery tries them newest first.
    #[config(default = 1)]
    pub backup_generations: usize,

    /// Subdirectories created in every newly provisioned owner location.
    /// When absent, defaults to ["backgrounds", "music", "files"].
    pub owner_subdirs: Option<Vec<String>>,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            profile_stem: "userdata".to_string(),
            users_dir: "users".to_string(),
            backup_dir: "backups".to_string(),
            max_repair_attempts: DEFAULT_MAX_ATTEMPTS,
            backup_generations: DEFAULT_GENERATIONS,
            owner_subdirs: None,
        }
    }
}

impl VaultConfig {
    /// Full profile file name for a codec extension (given with or without a dot).
    pub fn profile_file(&self, extension: &str) -> String {
        format!("{}.{}", self.profile_stem, extension.trim_start_matches('.'))
    }

    /// Owner subdirectories, using defaults if not configured.
    pub fn owner_subdirs(&self) -> Vec<String> {
        self.owner_subdirs
            .clone()
            .unwrap_or_else(default_owner_subdirs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = VaultConfig::default();
        assert_eq!(config.profile_stem, "userdata");
        assert_eq!(config.users_dir, "users");
        assert_eq!(config.backup_dir, "backups");
        assert_eq!(config.max_repair_attempts, 10);
        assert_eq!(config.backup_generations, 1);
        assert_eq!(config.owner_subdirs(), vec!["backgrounds", "music", "files"]);
    }

    #[test]
    fn test_profile_file_with_and_without_dot() {
        let config = VaultConfig::default();
        assert_eq!(config.profile_file("json"), "userdata.json");
        assert_eq!(config.profile_file(".json"), "userdata.json");
    }

    #[test]
    fn test_owner_subdirs_custom() {
        let config = VaultConfig {
            owner_subdirs: Some(vec!["notes".to_string()]),
            ..Default::default()
        };
        assert_eq!(config.owner_subdirs(), vec!["notes"]);
    }

    #[test]
    fn test_parse_partial_toml_keeps_defaults() {
        let config: VaultConfig = toml::from_str("backup_generations = 3\n").unwrap();
        assert_eq!(config.backup_generations, 3);
        assert_eq!(config.profile_stem, "userdata");
        assert_eq!(config.max_repair_attempts, 10);
        assert!(config.owner_subdirs.is_none());
    }

    #[test]
    fn test_parse_full_toml() {
        let text = r#"
            profile_stem = "prefs"
            users_dir = "people"
            backup_dir = "snapshots"
            max_repair_attempts = 4
            backup_generations = 2
            owner_subdirs = ["music"]
        "#;
        let config: VaultConfig = toml::from_str(text).unwrap();
        assert_eq!(config.profile_file("json"), "prefs.json");
        assert_eq!(config.users_dir, "people");
        assert_eq!(config.backup_dir, "snapshots");
        assert_eq!(config.max_repair_attempts, 4);
        assert_eq!(config.backup_generations, 2);
        assert_eq!(config.owner_subdirs(), vec!["music"]);
    }
}
