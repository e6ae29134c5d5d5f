//! Change detection between successive writes.
//!
//! Profiles are saved far more often than they change (autosave timers, logout, every
//! preference toggle re-saving the whole record). The [`ChangeDetector`] remembers the
//! last text written per owner and measures how far the new text is from it, so the store
//! can skip backup churn when nothing moved.
//!
//! The metric is Levenshtein distance over chars: 0 iff the texts are identical,
//! and larger the more was edited. The first write of an owner in a process is measured
//! against the empty string, so it always counts as a change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::model::OwnerId;

/// Levenshtein edit distance between two texts.
pub fn distance(previous: &str, current: &str) -> usize {
    if previous == current {
        return 0;
    }

    let a: Vec<char> = previous.chars().collect();
    let b: Vec<char> = current.chars().collect();

    // Common prefix and suffix never contribute; profile edits are usually a few chars.
    let prefix = a.iter().zip(&b).take_while(|(x, y)| x == y).count();
    let a = &a[prefix..];
    let b = &b[prefix..];
    let suffix = a
        .iter()
        .rev()
        .zip(b.iter().rev())
        .take_while(|(x, y)| x == y)
        .count();
    let a = &a[..a.len() - suffix];
    let b = &b[..b.len() - suffix];

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev_row: Vec<usize> = (0..=b.len()).collect();
    let mut row = vec![0; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = prev_row[j] + usize::from(ca != cb);
            row[j + 1] = substitution.min(prev_row[j + 1] + 1).min(row[j] + 1);
        }
        std::mem::swap(&mut prev_row, &mut row);
    }
    prev_row[b.len()]
}

/// Last-written text per owner. Lives inside the store's write gate.
#[derive(Debug, Default)]
pub struct ChangeDetector {
    last_written: HashMap<OwnerId, String>,
}

impl ChangeDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `text` as the latest write for `owner`, returning its distance from the
    /// previous one.
    pub fn observe(&mut self, owner: &OwnerId, text: &str) -> usize {
        let previous = self
            .last_written
            .insert(owner.clone(), text.to_string())
            .unwrap_or_default();
        distance(&previous, text)
    }

    /// Record `text` without measuring it (e.g. after restoring a backup verbatim).
    pub fn remember(&mut self, owner: &OwnerId, text: &str) {
        self.last_written.insert(owner.clone(), text.to_string());
    }
}

/// Lock-free write-intensity counters, readable while the gate is held.
#[derive(Debug, Default)]
pub struct WriteIntensity {
    writes: AtomicU64,
    total_distance: AtomicU64,
    last_distance: AtomicU64,
}

/// Point-in-time copy of [`WriteIntensity`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteIntensitySnapshot {
    /// Writes that changed content
    pub writes: u64,
    pub total_distance: u64,
    pub last_distance: u64,
}

impl WriteIntensity {
    pub fn record(&self, distance: usize) {
        let distance = distance as u64;
        self.writes.fetch_add(1, Ordering::Relaxed);
        self.total_distance.fetch_add(distance, Ordering::Relaxed);
        self.last_distance.store(distance, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> WriteIntensitySnapshot {
        WriteIntensitySnapshot {
            writes: self.writes.load(Ordering::Relaxed),
            total_distance: self.total_distance.load(Ordering::Relaxed),
            last_distance: self.last_distance.load(Ordering::Relaxed),
        }
    }
}
