use log::debug;

use crate::{
    classify::ChangeType,
    semver::{ParseVersionError, Prerelease, Semver},
};
use super::{Versioning, VersioningType};

/// Semantic versioning as prescribed for CSAF documents.
///
/// Before the first approval versions are plain `0.x.y` numbers. Approval
/// promotes the document to `1.0.0` and from then on every working version
/// carries a pre-release suffix until it is published.
#[derive(Clone, Copy, Debug, Default)]
pub struct Semantic;

fn parse(version: &str) -> Result<Semver, ParseVersionError> {
    version.parse()
}

impl Semantic {
    /// Is `version` a pre-release (before `1.0.0`, or carrying a suffix)?
    pub fn is_prerelease(&self, version: &str) -> Result<bool, ParseVersionError> {
        let v = parse(version)?;
        Ok(v.major() < 1 || v.prerelease().is_some())
    }
}

fn is_first_release(v: &Semver) -> bool {
    v.major() == 1 && v.minor() == 0 && v.patch() == 0
}

impl Versioning for Semantic {
    fn versioning_type(&self) -> VersioningType {
        VersioningType::Semantic
    }

    fn initial_version(&self) -> &'static str {
        "0.0.1"
    }

    fn next_approved_version(&self, current: &str) -> Result<String, ParseVersionError> {
        let mut v = parse(current)?;
        if v.major() < 1 {
            v = v.next_major();
        }
        let suffix = Prerelease::next_candidate(v.prerelease());
        Ok(v.with_cleared_suffix_and_build().with_prerelease(suffix).to_string())
    }

    fn next_draft_version(&self, current: &str) -> Result<String, ParseVersionError> {
        let v = parse(current)?;
        let suffix = if v.major() < 1 || is_first_release(&v) {
            Prerelease::next_edit(v.prerelease())
        } else {
            Prerelease::next_candidate(v.prerelease())
        };
        Ok(v.with_cleared_suffix_and_build().with_prerelease(suffix).to_string())
    }

    fn remove_version_suffix(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok(parse(current)?.with_cleared_suffix_and_build().to_string())
    }

    fn next_version(&self, change: ChangeType, current: &str, last_major: u64)
    -> Result<String, ParseVersionError> {
        let v = parse(current)?;

        let next = if v.major() == 0 {
            match change {
                ChangeType::Major => v.next_minor(),
                _ => v.next_patch(),
            }
        } else if is_first_release(&v) {
            let suffix = Prerelease::next_edit(v.prerelease());
            v.with_cleared_suffix_and_build().with_prerelease(suffix)
        } else {
            let suffix = Prerelease::next_edit(v.prerelease());
            let since_release = v.major() == last_major;
            let base = match change {
                ChangeType::Major if since_release => v.next_major(),
                ChangeType::Minor if since_release && v.minor() == 0 => v.next_minor(),
                ChangeType::Patch if since_release && v.minor() == 0 && v.patch() == 0 =>
                    v.next_patch(),
                _ => v.with_cleared_suffix_and_build(),
            };
            base.with_prerelease(suffix)
        };

        debug!("{:?} change moves version {} to {}", change, current, next);

        Ok(next.to_string())
    }

    fn new_document_version(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok(parse(current)?.next_patch().with_prerelease(Prerelease::FIRST).to_string())
    }

    fn is_initial_public_release_or_earlier(&self, current: &str)
    -> Result<bool, ParseVersionError> {
        let v = parse(current)?;
        Ok(v.major() < 1 || is_first_release(&v))
    }

    fn was_approved(&self, current: &str) -> Result<bool, ParseVersionError> {
        Ok(parse(current)?.major() >= 1)
    }

    fn major(&self, version: &str) -> Result<u64, ParseVersionError> {
        Ok(parse(version)?.major())
    }

    fn is_release(&self, number: &str, _: u64) -> bool {
        match parse(number) {
            Ok(v) => v.major() >= 1 && v.prerelease().is_none(),
            Err(_) => false,
        }
    }
}
