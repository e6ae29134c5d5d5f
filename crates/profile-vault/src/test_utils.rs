use crate::model::OwnerId;
use crate::notify::NotificationSink;
use crate::store::fs_backend::FsBackend;
use crate::store::ProfileStore;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// Notification sink that keeps every report for later assertions.
#[derive(Default)]
pub struct RecordingSink {
    reports: Mutex<Vec<(OwnerId, String)>>,
}

impl RecordingSink {
    pub fn reports(&self) -> Vec<(OwnerId, String)> {
        self.reports.lock().clone()
    }
}

impl NotificationSink for RecordingSink {
    fn report(&self, owner: &OwnerId, summary: &str) {
        self.reports.lock().push((owner.clone(), summary.to_string()));
    }
}

pub struct TestEnv {
    // We keep _temp_dir to ensure the directory is not dropped until the test is done
    pub _temp_dir: TempDir,
    pub store: ProfileStore<FsBackend>,
    pub sink: Arc<RecordingSink>,
    pub root: PathBuf,
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl TestEnv {
    pub fn new() -> Self {
        Self::with_generations(1)
    }

    pub fn with_generations(generations: usize) -> Self {
        let temp_dir = tempfile::tempdir().expect("failed to create temp dir");
        let root = temp_dir.path().to_path_buf();
        let sink = Arc::new(RecordingSink::default());
        let store = ProfileStore::with_backend(FsBackend::new(root.join("users"), root.join("backups")))
            .with_backup_generations(generations)
            .with_owner_subdirs(vec!["music".to_string(), "files".to_string()])
            .with_notifier(sink.clone());
        Self {
            _temp_dir: temp_dir,
            store,
            sink,
            root,
        }
    }

    pub fn owner_dir(&self, owner: &OwnerId) -> PathBuf {
        self.root.join("users").join(owner.as_str())
    }

    pub fn profile_file(&self, owner: &OwnerId) -> PathBuf {
        self.owner_dir(owner).join("userdata.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.root.join("backups")
    }

    /// Backup file names currently on disk, sorted.
    pub fn backup_files(&self) -> Vec<String> {
        let Ok(entries) = std::fs::read_dir(self.backup_dir()) else {
            return Vec::new();
        };
        let mut names: Vec<String> = entries
            .filter_map(|e| e.ok())
            .filter_map(|e| e.file_name().to_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}
