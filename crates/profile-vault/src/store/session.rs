//! The active profile of a logged-in owner.
//!
//! A [`Session`] borrows the store and keeps an in-memory copy of one owner's profile.
//! Edits are checked against the schema as they are made and reach storage on
//! [`save`](Session::save) or [`autosave`](Session::autosave).
//!
//! ```ignore
//! let mut session = store.open_session(&owner)?;
//! session.set("fontSize", FieldValue::Integer(42))?;
//! session.autosave()?;   // skipped if another writer holds the gate
//! session.save()?;       // waits for the gate
//! ```

use super::backend::StorageBackend;
use super::profile_store::{LoadSource, ProfileStore, SaveOutcome};
use crate::error::Result;
use crate::model::{OwnerId, Profile};
use crate::schema::FieldValue;

pub struct Session<'a, B: StorageBackend> {
    store: &'a ProfileStore<B>,
    profile: Profile,
    source: LoadSource,
    dirty: bool,
}

impl<'a, B: StorageBackend> Session<'a, B> {
    pub(super) fn open(store: &'a ProfileStore<B>, owner: &OwnerId) -> Result<Self> {
        let loaded = store.load_detailed(owner)?;
        Ok(Self {
            store,
            profile: loaded.profile,
            source: loaded.source,
            dirty: false,
        })
    }

    pub fn owner(&self) -> &OwnerId {
        self.profile.owner()
    }

    pub fn profile(&self) -> &Profile {
        &self.profile
    }

    /// How the profile was obtained when the session was opened or last reloaded.
    pub fn source(&self) -> LoadSource {
        self.source
    }

    /// True if there are edits not yet written.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn get(&self, field: &str) -> Result<FieldValue> {
        let spec = self.store.field_spec(field)?;
        self.store.log_read(self.owner(), spec);
        Ok(self
            .profile
            .get(field)
            .cloned()
            .unwrap_or_else(|| spec.default.to_value()))
    }

    /// Change a field in memory. Rejected values leave the session untouched.
    pub fn set(&mut self, field: &str, value: FieldValue) -> Result<()> {
        self.store.check_value(field, &value)?;
        self.profile.set(field, value);
        self.dirty = true;
        Ok(())
    }

    pub fn save(&mut self) -> Result<SaveOutcome> {
        let outcome = self.store.save(&self.profile)?;
        self.dirty = false;
        Ok(outcome)
    }

    /// Save pending edits unless the write gate is busy. Returns `None` if nothing was
    /// written.
    pub fn autosave(&mut self) -> Result<Option<SaveOutcome>> {
        if !self.dirty {
            return Ok(None);
        }
        let outcome = self.store.try_save(&self.profile)?;
        if outcome.is_some() {
            self.dirty = false;
        }
        Ok(outcome)
    }

    /// Drop pending edits and read the stored profile again.
    pub fn reload(&mut self) -> Result<()> {
        let loaded = self.store.load_detailed(self.profile.owner())?;
        self.profile = loaded.profile;
        self.source = loaded.source;
        self.dirty = false;
        Ok(())
    }
}
