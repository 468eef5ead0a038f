//! Version numbering schemes.
//!
//! Each advisory carries a [`VersioningType`] chosen at creation (or detected
//! on import), and every version computation goes through the [`Versioning`]
//! strategy it selects.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{classify::ChangeType, semver::ParseVersionError};

mod integer;
mod semantic;

pub use self::{integer::Integer, semantic::Semantic};

/// Rules for deriving the next version of an advisory.
pub trait Versioning: Send + Sync {
    fn versioning_type(&self) -> VersioningType;

    /// Version of a newly created advisory.
    fn initial_version(&self) -> &'static str;

    /// Version to assign when an advisory is approved.
    fn next_approved_version(&self, current: &str) -> Result<String, ParseVersionError>;

    /// Version to assign when an approved advisory is sent back to draft.
    fn next_draft_version(&self, current: &str) -> Result<String, ParseVersionError>;

    /// Version to assign at publication.
    fn remove_version_suffix(&self, current: &str) -> Result<String, ParseVersionError>;

    /// Version to assign after a content edit of severity `change`.
    ///
    /// `last_major` is the major number of the last published release, or
    /// zero if the advisory was never published.
    fn next_version(&self, change: ChangeType, current: &str, last_major: u64)
    -> Result<String, ParseVersionError>;

    /// Version of a new working copy of a published advisory.
    fn new_document_version(&self, current: &str) -> Result<String, ParseVersionError>;

    /// Is `current` at or before the first public release?
    fn is_initial_public_release_or_earlier(&self, current: &str)
    -> Result<bool, ParseVersionError>;

    /// Has an advisory at `current` been approved at least once?
    fn was_approved(&self, current: &str) -> Result<bool, ParseVersionError>;

    /// Major number of a version, as recorded in `lastMajorVersion`.
    fn major(&self, version: &str) -> Result<u64, ParseVersionError>;

    /// Does a revision history entry numbered `number` describe a published
    /// release?
    fn is_release(&self, number: &str, last_major: u64) -> bool;
}

/// Versioning scheme of an advisory.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum VersioningType {
    /// `MAJOR.MINOR.PATCH` with a two-token pre-release suffix.
    Semantic,
    /// A single integer, increased only when a new version is created.
    Integer,
}

static SEMANTIC: Semantic = Semantic;
static INTEGER: Integer = Integer;

impl VersioningType {
    pub fn strategy(self) -> &'static dyn Versioning {
        match self {
            VersioningType::Semantic => &SEMANTIC,
            VersioningType::Integer => &INTEGER,
        }
    }

    /// Guess versioning scheme of an existing document from its version.
    pub fn detect(version: &str) -> VersioningType {
        if version.trim().is_empty() || version.contains('.') {
            VersioningType::Semantic
        } else {
            VersioningType::Integer
        }
    }
}

impl Default for VersioningType {
    fn default() -> Self {
        VersioningType::Semantic
    }
}

impl fmt::Display for VersioningType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(match *self {
            VersioningType::Semantic => "Semantic",
            VersioningType::Integer => "Integer",
        })
    }
}

/// Version an advisory should carry after a content edit of severity
/// `change`.
///
/// Patch-level edits made before the first public release fold into the
/// current version.
pub fn version_after_edit(
    strategy: &dyn Versioning,
    change: ChangeType,
    current: &str,
    last_major: u64,
) -> Result<String, ParseVersionError> {
    if change == ChangeType::Patch
    && strategy.is_initial_public_release_or_earlier(current)? {
        return Ok(current.to_string());
    }

    strategy.next_version(change, current, last_major)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detect_strategy() {
        assert_eq!(VersioningType::detect("0.0.1"), VersioningType::Semantic);
        assert_eq!(VersioningType::detect(""), VersioningType::Semantic);
        assert_eq!(VersioningType::detect("3"), VersioningType::Integer);
    }

    #[test]
    fn patch_edits_fold_before_first_release() {
        let semantic = VersioningType::Semantic.strategy();
        assert_eq!(version_after_edit(semantic, ChangeType::Patch, "0.0.1", 0).unwrap(), "0.0.1");
        assert_eq!(version_after_edit(semantic, ChangeType::Major, "0.0.1", 0).unwrap(), "0.1.0");
        assert_eq!(version_after_edit(semantic, ChangeType::Patch, "1.0.0-1.0", 0).unwrap(),
            "1.0.0-1.0");
        assert_eq!(version_after_edit(semantic, ChangeType::Patch, "1.0.1-1.0", 1).unwrap(),
            "1.0.1-1.1");
    }
}
