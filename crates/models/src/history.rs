//! Revision history embedded in `document.tracking.revision_history`.
//!
//! The ledger distinguishes *release* entries, which describe published
//! versions and are never touched again, from *working* entries describing
//! versions still being edited. Which entries are releases is decided by the
//! advisory's versioning strategy.

use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::versioning::Versioning;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct RevisionHistoryEntry {
    pub number: String,
    /// Kept with the offset it was written with, so that imported entries
    /// are stored exactly as they were given.
    pub date: DateTime<FixedOffset>,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legacy_version: Option<String>,
}

impl RevisionHistoryEntry {
    pub fn new<N, S>(number: N, date: DateTime<Utc>, summary: S) -> Self
    where
        N: Into<String>,
        S: Into<String>,
    {
        RevisionHistoryEntry {
            number: number.into(),
            date: date.into(),
            summary: summary.into(),
            legacy_version: None,
        }
    }
}

/// Ordered list of revision history entries.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RevisionHistory(Vec<RevisionHistoryEntry>);

/// Releases are judged against the strategy and last published major number
/// of one advisory.
#[derive(Clone, Copy)]
pub struct Releases<'a> {
    pub strategy: &'a dyn Versioning,
    pub last_major: u64,
}

impl<'a> Releases<'a> {
    fn contains(&self, entry: &RevisionHistoryEntry) -> bool {
        self.strategy.is_release(&entry.number, self.last_major)
    }
}

impl RevisionHistory {
    pub fn new(entries: Vec<RevisionHistoryEntry>) -> Self {
        RevisionHistory(entries)
    }

    pub fn entries(&self) -> &[RevisionHistoryEntry] {
        &self.0
    }

    pub fn last(&self) -> Option<&RevisionHistoryEntry> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Numbers of all entries, oldest first.
    pub fn numbers(&self) -> Vec<&str> {
        self.0.iter().map(|e| e.number.as_str()).collect()
    }

    pub fn push(mut self, entry: RevisionHistoryEntry) -> Self {
        self.0.push(entry);
        self
    }

    /// Record a content edit which moved the advisory from `old_version` to
    /// `entry.number`.
    ///
    /// A working entry for `old_version` is overwritten in place, anything
    /// else gets a new entry.
    pub fn record_edit(
        mut self,
        releases: Releases,
        old_version: &str,
        entry: RevisionHistoryEntry,
    ) -> Self {
        match self.0.last_mut() {
            Some(last) if last.number == old_version && !releases.contains(last) => {
                let legacy = entry.legacy_version.or_else(|| last.legacy_version.take());
                *last = RevisionHistoryEntry { legacy_version: legacy, ..entry };
            }
            _ => self.0.push(entry),
        }
        self
    }

    /// Record a workflow transition which moved the advisory from
    /// `old_version` to `new_version`.
    ///
    /// Before the first publication every such step gets its own entry.
    /// Afterwards the working entry is renumbered and keeps its summary.
    pub fn record_transition(
        mut self,
        releases: Releases,
        old_version: &str,
        new_version: &str,
        date: DateTime<Utc>,
    ) -> Self {
        if old_version == new_version {
            return self;
        }

        let published = self.0.iter().any(|e| releases.contains(e));

        match self.0.last_mut() {
            Some(last) if published && !releases.contains(last) => {
                last.number = new_version.to_string();
                last.date = date.into();
            }
            last => {
                let summary = last.map(|e| e.summary.clone()).unwrap_or_default();
                self.0.push(RevisionHistoryEntry::new(new_version, date, summary));
            }
        }

        self
    }

    /// Collapse all working entries into a single release entry.
    ///
    /// The release entry carries the summary of the most recent working
    /// entry, or `fallback_summary` if there is none.
    pub fn collapse_for_release(
        self,
        releases: Releases,
        version: &str,
        date: DateTime<Utc>,
        fallback_summary: &str,
    ) -> Self {
        let (kept, working): (Vec<_>, Vec<_>) = self.0.into_iter()
            .partition(|e| releases.contains(e) && e.number != version);

        let (summary, legacy_version) = match working.into_iter().last() {
            Some(entry) => (entry.summary, entry.legacy_version),
            None => (fallback_summary.to_string(), None),
        };

        let mut entries = kept;
        entries.push(RevisionHistoryEntry {
            number: version.to_string(),
            date: date.into(),
            summary,
            legacy_version,
        });

        RevisionHistory(entries)
    }
}
