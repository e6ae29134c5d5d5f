//! Reporting unrecoverable corruption to a human.

use std::path::Path;
use tracing::error;

use crate::model::OwnerId;

/// Fire-and-forget channel to whoever must look at a broken profile.
///
/// Implementations must not fail or block for long: reports are sent while the write
/// gate is held.
pub trait NotificationSink: Send + Sync {
    fn report(&self, owner: &OwnerId, summary: &str);
}

/// Default sink: an `error` event per report.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn report(&self, owner: &OwnerId, summary: &str) {
        error!(owner = %owner, "{}", summary);
    }
}

/// Human-readable report for an owner whose location was left in place.
pub fn corruption_summary(owner: &OwnerId, location: &Path, entries: &[String]) -> String {
    let mut summary = format!(
        "Profile for {} could not be recovered. Its directory {} was kept because it still holds:",
        owner,
        location.display()
    );
    for entry in entries {
        summary.push_str("\n  - ");
        summary.push_str(entry);
    }
    summary
}
