//! Owners whose profile could not be recovered.
//!
//! Membership is permanent for the life of the process: once an owner is in, no load,
//! save or doctor pass touches its storage again. There is no removal API: a human fixes
//! the files and restarts.

use parking_lot::RwLock;
use std::collections::HashSet;

use crate::model::OwnerId;

#[derive(Debug, Default)]
pub struct Quarantine {
    owners: RwLock<HashSet<OwnerId>>,
}

impl Quarantine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an owner. Returns false if it was already quarantined.
    pub fn insert(&self, owner: &OwnerId) -> bool {
        self.owners.write().insert(owner.clone())
    }

    pub fn contains(&self, owner: &OwnerId) -> bool {
        self.owners.read().contains(owner)
    }

    pub fn len(&self) -> usize {
        self.owners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.read().is_empty()
    }

    /// Sorted copy of the current members.
    pub fn snapshot(&self) -> Vec<OwnerId> {
        let mut owners: Vec<OwnerId> = self.owners.read().iter().cloned().collect();
        owners.sort();
        owners
    }
}
