//! Handling of profiles that neither decode nor repair.
//!
//! Runs entirely under the write gate:
//!
//! 1. **Restore**: the newest backup that decodes and validates replaces the profile.
//! 2. **Quarantine**: otherwise the owner is quarantined for the rest of the process.
//! 3. **Discard**: an empty or undecodable profile file is deleted. The owner location is
//!    removed only if nothing is left in it; otherwise a human is told what remains.

use super::backend::StorageBackend;
use super::profile_store::{LoadSource, Loaded, ProfileStore};
use crate::change::ChangeDetector;
use crate::error::{Result, VaultError};
use crate::model::{OwnerId, Profile};
use crate::notify::corruption_summary;
use crate::validate::validate;
use tracing::{debug, error, info, warn};

impl<B: StorageBackend> ProfileStore<B> {
    /// `seen` is the profile text that was rejected.
    pub(super) fn recover_locked(
        &self,
        detector: &mut ChangeDetector,
        owner: &OwnerId,
        seen: &str,
        reason: String,
    ) -> Result<Loaded> {
        // Another loader may have given up on this owner while we waited for the gate.
        self.ensure_not_quarantined(owner)?;

        // Loads do not hold the gate, so a writer may have replaced the file since.
        if self.backend.read_profile(owner)?.as_deref() != Some(seen) {
            debug!(owner = %owner, "profile changed before recovery, reloading");
            return self.load_inner(owner, Some(detector));
        }

        if let Some(loaded) = self.restore_from_backup(detector, owner)? {
            return Ok(loaded);
        }

        if self.quarantine.insert(owner) {
            error!(owner = %owner, %reason, "profile is unrecoverable, owner quarantined");
            self.discard(owner, seen);
        }

        Err(VaultError::Unrecoverable {
            owner: owner.clone(),
            reason,
        })
    }

    fn restore_from_backup(
        &self,
        detector: &mut ChangeDetector,
        owner: &OwnerId,
    ) -> Result<Option<Loaded>> {
        for candidate in self.backups.candidates(owner) {
            let data = match self.codec.decode(&candidate.content) {
                Ok(data) => data,
                Err(e) => {
                    debug!(owner = %owner, timestamp = candidate.timestamp, error = %e, "backup does not decode");
                    continue;
                }
            };
            let check = validate(&data, self.schema());
            if !check.is_sound() {
                debug!(owner = %owner, timestamp = candidate.timestamp, fields = ?check.invalid, "backup is invalid");
                continue;
            }

            self.backend.write_profile(owner, &candidate.content)?;
            detector.remember(owner, &candidate.content);
            info!(owner = %owner, timestamp = candidate.timestamp, "restored profile from backup");
            return Ok(Some(Loaded {
                profile: Profile::new(owner.clone(), data),
                source: LoadSource::Restored,
            }));
        }
        Ok(None)
    }

    /// Best effort: failures here are logged, the owner is already quarantined.
    fn discard(&self, owner: &OwnerId, seen: &str) {
        if self.codec.decode(seen).is_err() {
            match self.backend.delete_profile(owner) {
                Ok(()) => info!(owner = %owner, "deleted unreadable profile file"),
                Err(e) => warn!(owner = %owner, error = %e, "could not delete unreadable profile file"),
            }
        }

        match self.backend.owner_entries(owner) {
            Ok(None) => {}
            Ok(Some(entries)) if entries.is_empty() => {
                match self.backend.remove_owner_location(owner) {
                    Ok(true) => info!(owner = %owner, "removed empty owner location"),
                    Ok(false) => {}
                    Err(e) => warn!(owner = %owner, error = %e, "could not remove owner location"),
                }
            }
            Ok(Some(entries)) => {
                let summary = corruption_summary(owner, &self.backend.owner_path(owner), &entries);
                self.notifier.report(owner, &summary);
            }
            Err(e) => warn!(owner = %owner, error = %e, "could not list owner location"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Codec, JsonCodec};
    use crate::model::FieldMap;
    use crate::schema::{FieldValue, ProfileSchema};
    use crate::store::mem_backend::MemBackend;
    use crate::test_utils::RecordingSink;
    use std::sync::Arc;

    fn owner(id: &str) -> OwnerId {
        OwnerId::new(id).unwrap()
    }

    fn setup() -> (Arc<MemBackend>, Arc<RecordingSink>, ProfileStore<MemBackend>) {
        let backend = Arc::new(MemBackend::new());
        let sink = Arc::new(RecordingSink::default());
        let store = ProfileStore::with_shared_backend(Arc::clone(&backend))
            .with_notifier(sink.clone());
        (backend, sink, store)
    }

    fn defaults_text() -> String {
        JsonCodec.encode(&FieldMap::defaults(&ProfileSchema)).unwrap()
    }

    #[test]
    fn test_torn_profile_is_restored_from_backup() {
        let (backend, sink, store) = setup();
        let u1 = owner("U1");
        backend.put_profile(&u1, "{\"fontSize\": 3");
        backend.put_backup("U1_100.json", &defaults_text());

        let loaded = store.load_detailed(&u1).unwrap();
        assert_eq!(loaded.source, LoadSource::Restored);
        assert_eq!(store.raw_profile(&u1).unwrap(), defaults_text());
        assert!(sink.reports().is_empty());
        assert!(store.quarantine().is_empty());

        // The restored text is remembered: saving it again is not a change
        assert_eq!(store.save(&loaded.profile).unwrap().distance, 0);
    }

    #[test]
    fn test_invalid_backup_is_skipped_for_older_valid_one() {
        let backend = Arc::new(MemBackend::new());
        let store = ProfileStore::with_shared_backend(Arc::clone(&backend))
            .with_backup_generations(2);
        let u1 = owner("U1");
        backend.put_profile(&u1, "");
        backend.put_backup("U1_100.json", &defaults_text());
        backend.put_backup("U1_200.json", "{ also torn");

        let loaded = store.load_detailed(&u1).unwrap();
        assert_eq!(loaded.source, LoadSource::Restored);
    }

    #[test]
    fn test_unrecoverable_profile_with_empty_location_is_removed() {
        let (backend, sink, store) = setup();
        let u1 = owner("U1");
        backend.put_profile(&u1, "");

        let err = store.load(&u1).unwrap_err();
        assert!(err.is_unrecoverable());
        assert!(store.quarantine().contains(&u1));
        assert!(backend.owner_entries(&u1).unwrap().is_none());
        assert!(sink.reports().is_empty());
    }

    #[test]
    fn test_user_content_is_kept_and_reported() {
        let (backend, sink, store) = setup();
        let u1 = owner("U1");
        backend.put_profile(&u1, "not a profile");
        backend.add_owner_entry(&u1, "music/song.mp3");

        assert!(store.load(&u1).is_err());
        assert_eq!(
            backend.owner_entries(&u1).unwrap().unwrap(),
            vec!["music/", "music/song.mp3"]
        );
        let reports = sink.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].0, u1);
        assert!(reports[0].1.contains("music/song.mp3"));
    }

    #[test]
    fn test_decodable_but_unrepairable_profile_is_kept() {
        let (backend, sink, store) = setup();
        let u1 = owner("U1");
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("username", FieldValue::Integer(7));
        let text = JsonCodec.encode(&data).unwrap();
        backend.put_profile(&u1, &text);

        let err = store.load(&u1).unwrap_err();
        assert!(matches!(err, VaultError::Unrecoverable { ref reason, .. } if reason.contains("username")));
        assert_eq!(backend.read_profile(&u1).unwrap().as_deref(), Some(text.as_str()));
        assert_eq!(sink.reports().len(), 1);
    }

    #[test]
    fn test_late_recovery_of_quarantined_owner_reports_nothing() {
        let (backend, sink, store) = setup();
        let u1 = owner("U1");
        let mut data = FieldMap::defaults(&ProfileSchema);
        data.insert("username", FieldValue::Integer(7));
        let text = JsonCodec.encode(&data).unwrap();
        backend.put_profile(&u1, &text);
        assert!(store.load(&u1).is_err());

        // A second loader that read the same text before the quarantine reaches the gate
        let err = store
            .gated(None, |detector| {
                store.recover_locked(detector, &u1, &text, "late".to_string())
            })
            .unwrap_err();
        assert!(err.is_unrecoverable());
        assert_eq!(sink.reports().len(), 1);
        assert_eq!(backend.read_profile(&u1).unwrap().as_deref(), Some(text.as_str()));
    }

    #[test]
    fn test_quarantine_is_sticky() {
        let (backend, _sink, store) = setup();
        let u1 = owner("U1");
        backend.put_profile(&u1, "garbage");
        assert!(store.load(&u1).is_err());

        // A valid profile appearing later is still not touched in this process
        backend.put_profile(&u1, &defaults_text());
        let reads = backend.profile_reads();
        assert!(store.load(&u1).unwrap_err().is_unrecoverable());
        assert!(store.get_field(&u1, "fontSize").is_err());
        assert!(store
            .set_field(&u1, "fontSize", FieldValue::Integer(40))
            .is_err());
        assert!(store.raw_profile(&u1).is_err());
        assert_eq!(backend.profile_reads(), reads);
    }
}
