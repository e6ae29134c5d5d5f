use super::backend::StorageBackend;
use super::session::Session;
use super::DoctorReport;
use crate::backup::{BackupEntry, BackupManager};
use crate::change::{ChangeDetector, WriteIntensity, WriteIntensitySnapshot};
use crate::codec::{Codec, JsonCodec};
use crate::config::VaultConfig;
use crate::error::{Result, VaultError};
use crate::model::{FieldMap, OwnerId, Profile};
use crate::notify::{LogSink, NotificationSink};
use crate::quarantine::Quarantine;
use crate::repair::Repairer;
use crate::schema::{FieldSpec, FieldValue, ProfileSchema, SchemaRegistry};
use crate::validate::{validate, ValidationResult};
use parking_lot::{Mutex, MutexGuard};
use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How a loaded profile was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadSource {
    /// Read from storage and sound as stored
    Stored,
    /// No profile stored; schema defaults
    Defaulted,
    /// Read from storage, invalid fields substituted and saved
    Repaired,
    /// Replaced by a backup snapshot
    Restored,
}

#[derive(Debug, Clone)]
pub struct Loaded {
    pub profile: Profile,
    pub source: LoadSource,
}

/// What a save did besides writing the profile.
#[derive(Debug, Clone, Default)]
pub struct SaveOutcome {
    /// Edit distance from the previous write of this owner; 0 means nothing changed
    pub distance: usize,
    /// The snapshot taken, if one was
    pub backup: Option<BackupEntry>,
    /// Validation of the text read back after the write. `None` if unchanged or unreadable.
    pub revalidation: Option<ValidationResult>,
}

impl SaveOutcome {
    pub fn changed(&self) -> bool {
        self.distance > 0
    }
}

/// Held writes. Every `save` blocks and every `try_save` returns `None` until dropped.
pub struct WriteBlock<'a> {
    _guard: MutexGuard<'a, ChangeDetector>,
}

pub struct ProfileStore<B: StorageBackend> {
    /// The underlying storage backend.
    /// Exposed as pub(crate) for testing and internal access only.
    pub(crate) backend: Arc<B>,
    pub(super) codec: Arc<dyn Codec>,
    pub(super) schema: Arc<dyn SchemaRegistry>,
    pub(super) backups: BackupManager<B>,
    pub(super) repairer: Repairer,
    /// The write gate. Guards the last-written text of every owner.
    gate: Mutex<ChangeDetector>,
    pub(super) quarantine: Arc<Quarantine>,
    pub(super) notifier: Arc<dyn NotificationSink>,
    intensity: WriteIntensity,
    owner_subdirs: Vec<String>,
}

impl<B: StorageBackend> ProfileStore<B> {
    pub fn with_backend(backend: B) -> Self {
        Self::with_shared_backend(Arc::new(backend))
    }

    /// Build on a backend the caller keeps a handle to.
    pub fn with_shared_backend(backend: Arc<B>) -> Self {
        let codec: Arc<dyn Codec> = Arc::new(JsonCodec);
        Self {
            backups: BackupManager::new(Arc::clone(&backend), Arc::clone(&codec)),
            backend,
            codec,
            schema: Arc::new(ProfileSchema),
            repairer: Repairer::default(),
            gate: Mutex::new(ChangeDetector::new()),
            quarantine: Arc::new(Quarantine::new()),
            notifier: Arc::new(LogSink),
            intensity: WriteIntensity::default(),
            owner_subdirs: Vec::new(),
        }
    }

    pub fn from_config(backend: B, config: &VaultConfig) -> Self {
        Self::with_backend(backend)
            .with_max_repair_attempts(config.max_repair_attempts)
            .with_backup_generations(config.backup_generations)
            .with_owner_subdirs(config.owner_subdirs())
    }

    pub fn with_codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.backups = BackupManager::new(Arc::clone(&self.backend), Arc::clone(&codec))
            .with_generations(self.backups.generations());
        self.codec = codec;
        self
    }

    pub fn with_schema(mut self, schema: Arc<dyn SchemaRegistry>) -> Self {
        self.schema = schema;
        self
    }

    pub fn with_max_repair_attempts(mut self, attempts: u32) -> Self {
        self.repairer = Repairer::new(attempts);
        self
    }

    pub fn with_backup_generations(mut self, generations: usize) -> Self {
        self.backups = BackupManager::new(Arc::clone(&self.backend), Arc::clone(&self.codec))
            .with_generations(generations);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn NotificationSink>) -> Self {
        self.notifier = notifier;
        self
    }

    /// Share a quarantine set with other stores of the same process.
    pub fn with_quarantine(mut self, quarantine: Arc<Quarantine>) -> Self {
        self.quarantine = quarantine;
        self
    }

    pub fn with_owner_subdirs(mut self, subdirs: Vec<String>) -> Self {
        self.owner_subdirs = subdirs;
        self
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn schema(&self) -> &dyn SchemaRegistry {
        self.schema.as_ref()
    }

    pub fn backups(&self) -> &BackupManager<B> {
        &self.backups
    }

    pub fn quarantine(&self) -> &Quarantine {
        &self.quarantine
    }

    pub fn write_stats(&self) -> WriteIntensitySnapshot {
        self.intensity.snapshot()
    }

    pub fn profile_path(&self, owner: &OwnerId) -> PathBuf {
        self.backend.profile_path(owner)
    }

    // --- Loading ---

    /// Load the profile of `owner`, repairing or restoring it if needed.
    ///
    /// A missing profile is not an error: the schema defaults are returned and nothing
    /// is written.
    pub fn load(&self, owner: &OwnerId) -> Result<Profile> {
        Ok(self.load_detailed(owner)?.profile)
    }

    /// Like [`load`](Self::load), also reporting how the profile was obtained.
    pub fn load_detailed(&self, owner: &OwnerId) -> Result<Loaded> {
        self.load_inner(owner, None)
    }

    /// Open an editing session on `owner`'s profile.
    pub fn open_session(&self, owner: &OwnerId) -> Result<Session<'_, B>> {
        Session::open(self, owner)
    }

    /// `held` is the caller's write gate, if it already holds it.
    pub(super) fn load_inner(
        &self,
        owner: &OwnerId,
        held: Option<&mut ChangeDetector>,
    ) -> Result<Loaded> {
        self.ensure_not_quarantined(owner)?;

        let Some(text) = self.backend.read_profile(owner)? else {
            debug!(owner = %owner, "no stored profile, using defaults");
            return Ok(Loaded {
                profile: Profile::with_defaults(owner.clone(), self.schema()),
                source: LoadSource::Defaulted,
            });
        };

        let outcome = self.repairer.run(&text, self.codec.as_ref(), self.schema());
        let changed = outcome.changed();
        match outcome.data {
            Some(data) => {
                let profile = Profile::new(owner.clone(), data);
                if !changed {
                    return Ok(Loaded {
                        profile,
                        source: LoadSource::Stored,
                    });
                }
                self.gated(held, |detector| {
                    // The repair was computed without the gate; a writer may have won since.
                    if self.backend.read_profile(owner)?.as_deref() != Some(text.as_str()) {
                        debug!(owner = %owner, "profile changed before repair was saved, reloading");
                        return self.load_inner(owner, Some(detector));
                    }
                    self.save_locked(detector, &profile)?;
                    info!(
                        owner = %owner,
                        fields = ?outcome.repaired,
                        attempts = outcome.attempts,
                        "repaired profile"
                    );
                    Ok(Loaded {
                        profile,
                        source: LoadSource::Repaired,
                    })
                })
            }
            None => {
                let reason = outcome
                    .reason
                    .unwrap_or_else(|| "profile is invalid".to_string());
                warn!(owner = %owner, state = ?outcome.state, %reason, "stored profile rejected");
                self.gated(held, |detector| {
                    self.recover_locked(detector, owner, &text, reason)
                })
            }
        }
    }

    // --- Saving ---

    /// Write `profile`, waiting for the write gate.
    pub fn save(&self, profile: &Profile) -> Result<SaveOutcome> {
        let mut detector = self.gate.lock();
        self.save_locked(&mut detector, profile)
    }

    /// Write `profile` unless another writer holds the gate, in which case `Ok(None)`.
    /// Meant for periodic callers such as autosave.
    pub fn try_save(&self, profile: &Profile) -> Result<Option<SaveOutcome>> {
        let Some(mut detector) = self.gate.try_lock() else {
            debug!(owner = %profile.owner(), "write gate busy, save skipped");
            return Ok(None);
        };
        self.save_locked(&mut detector, profile).map(Some)
    }

    /// Exclude every writer until the returned guard is dropped (shutdown, logout).
    pub fn block_writes(&self) -> WriteBlock<'_> {
        WriteBlock {
            _guard: self.gate.lock(),
        }
    }

    pub(super) fn save_locked(
        &self,
        detector: &mut ChangeDetector,
        profile: &Profile,
    ) -> Result<SaveOutcome> {
        let owner = profile.owner();
        self.ensure_not_quarantined(owner)?;

        let text = self.codec.encode(profile.data())?;
        self.backend.write_profile(owner, &text)?;

        let distance = detector.observe(owner, &text);
        if distance == 0 {
            return Ok(SaveOutcome::default());
        }

        self.intensity.record(distance);
        info!(owner = %owner, distance, "profile written");

        let backup = self.backups.backup(owner, &text);
        let revalidation = self.revalidate(owner);
        Ok(SaveOutcome {
            distance,
            backup,
            revalidation,
        })
    }

    /// Re-read what was just written and check it. Findings are logged, never raised.
    fn revalidate(&self, owner: &OwnerId) -> Option<ValidationResult> {
        let text = match self.backend.read_profile(owner) {
            Ok(Some(text)) => text,
            Ok(None) => {
                warn!(owner = %owner, "profile missing right after write");
                return None;
            }
            Err(e) => {
                warn!(owner = %owner, error = %e, "could not re-read profile after write");
                return None;
            }
        };
        let result = match self.codec.decode(&text) {
            Ok(data) => validate(&data, self.schema()),
            Err(e) => {
                warn!(owner = %owner, error = %e, "written profile does not decode");
                return None;
            }
        };
        if !result.is_sound() {
            warn!(owner = %owner, fields = ?result.invalid, "written profile failed validation");
        }
        Some(result)
    }

    /// Run `f` under the write gate, taking it unless the caller already holds it.
    pub(super) fn gated<R>(
        &self,
        held: Option<&mut ChangeDetector>,
        f: impl FnOnce(&mut ChangeDetector) -> R,
    ) -> R {
        match held {
            Some(detector) => f(detector),
            None => {
                let mut guard = self.gate.lock();
                f(&mut guard)
            }
        }
    }

    // --- Field Access ---

    /// Look up a field and check that `value` fits its kind.
    pub fn check_value(&self, field: &str, value: &FieldValue) -> Result<&FieldSpec> {
        let spec = self.field_spec(field)?;
        if !spec.accepts(value) {
            return Err(VaultError::InvalidValue {
                field: field.to_string(),
                expected: spec.kind.describe(),
            });
        }
        Ok(spec)
    }

    pub(super) fn field_spec(&self, field: &str) -> Result<&FieldSpec> {
        self.schema
            .get(field)
            .ok_or_else(|| VaultError::UnknownField(field.to_string()))
    }

    pub(super) fn log_read(&self, owner: &OwnerId, spec: &FieldSpec) {
        if !spec.quiet {
            debug!(owner = %owner, field = spec.id, "field read");
        }
    }

    pub fn get_field(&self, owner: &OwnerId, field: &str) -> Result<FieldValue> {
        let spec = self.field_spec(field)?;
        let profile = self.load(owner)?;
        self.log_read(owner, spec);
        Ok(profile
            .get(field)
            .cloned()
            .unwrap_or_else(|| spec.default.to_value()))
    }

    /// Set one field and save. The read-modify-write runs under the write gate.
    pub fn set_field(&self, owner: &OwnerId, field: &str, value: FieldValue) -> Result<SaveOutcome> {
        self.check_value(field, &value)?;
        let mut detector = self.gate.lock();
        let mut profile = self.load_inner(owner, Some(&mut detector))?.profile;
        profile.set(field, value);
        self.save_locked(&mut detector, &profile)
    }

    // --- Owners ---

    /// Owners with a stored profile, excluding quarantined ones.
    pub fn list_owners(&self) -> Result<Vec<OwnerId>> {
        Ok(self
            .backend
            .list_owners()?
            .into_iter()
            .filter(|owner| !self.quarantine.contains(owner))
            .collect())
    }

    /// First-run creation: the owner location with its subdirectories, and a default
    /// profile overlaid with `overrides`.
    pub fn provision(&self, owner: &OwnerId, overrides: FieldMap) -> Result<Profile> {
        let mut profile = Profile::with_defaults(owner.clone(), self.schema());
        for (field, value) in overrides.iter() {
            self.check_value(field, value)?;
            profile.set(field, value.clone());
        }

        let mut detector = self.gate.lock();
        self.ensure_not_quarantined(owner)?;
        if self.backend.read_profile(owner)?.is_some() {
            return Err(VaultError::AlreadyExists(owner.clone()));
        }
        self.backend.ensure_owner_dirs(owner, &self.owner_subdirs)?;
        self.save_locked(&mut detector, &profile)?;
        info!(owner = %owner, "provisioned profile");
        Ok(profile)
    }

    /// Reset every repairable field to its default. Identity fields are kept.
    pub fn reset_to_defaults(&self, owner: &OwnerId) -> Result<Profile> {
        let mut detector = self.gate.lock();
        let mut profile = self.load_inner(owner, Some(&mut detector))?.profile;
        for spec in self.schema.fields().iter().filter(|spec| spec.repairable) {
            profile.set(spec.id, spec.default.to_value());
        }
        self.save_locked(&mut detector, &profile)?;
        info!(owner = %owner, "profile reset to defaults");
        Ok(profile)
    }

    /// The stored text of a profile, unvalidated.
    pub fn raw_profile(&self, owner: &OwnerId) -> Result<String> {
        self.ensure_not_quarantined(owner)?;
        self.backend
            .read_profile(owner)?
            .ok_or_else(|| VaultError::NotFound(owner.clone()))
    }

    /// Check every stored profile, then count owners whose snapshots have no profile.
    /// Snapshots are never deleted here; only retention removes them.
    pub fn doctor(&self) -> Result<DoctorReport> {
        let mut report = DoctorReport::default();

        for owner in self.backend.list_owners()? {
            if self.quarantine.contains(&owner) {
                report.quarantined += 1;
                continue;
            }
            match self.load_detailed(&owner) {
                Ok(loaded) => match loaded.source {
                    LoadSource::Stored => report.healthy += 1,
                    LoadSource::Repaired => report.repaired += 1,
                    LoadSource::Restored => report.restored += 1,
                    // Removed between listing and loading
                    LoadSource::Defaulted => {}
                },
                Err(e) if e.is_unrecoverable() => report.quarantined += 1,
                Err(e) => {
                    warn!(owner = %owner, error = %e, "doctor could not check profile");
                    report.failed += 1;
                }
            }
        }

        let mut live: HashSet<OwnerId> = self.backend.list_owners()?.into_iter().collect();
        live.extend(self.quarantine.snapshot());
        for owner in self.backups.owners()? {
            if !live.contains(&owner) {
                debug!(owner = %owner, "backups kept for owner without a profile");
                report.detached_backup_owners += 1;
            }
        }

        info!(
            healthy = report.healthy,
            repaired = report.repaired,
            restored = report.restored,
            quarantined = report.quarantined,
            detached_backup_owners = report.detached_backup_owners,
            "doctor finished"
        );
        Ok(report)
    }

    pub(super) fn ensure_not_quarantined(&self, owner: &OwnerId) -> Result<()> {
        if self.quarantine.contains(owner) {
            return Err(VaultError::Unrecoverable {
                owner: owner.clone(),
                reason: "owner is quarantined".to_string(),
            });
        }
        Ok(())
    }
}
