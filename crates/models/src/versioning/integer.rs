use log::warn;

use crate::{classify::ChangeType, semver::ParseVersionError};
use super::{Versioning, VersioningType};

/// Versions are plain integers.
///
/// The first approval moves a document from `0` to `1`; after that the number
/// only changes when a new version of a published document is created.
#[derive(Clone, Copy, Debug, Default)]
pub struct Integer;

/// Parse an integer version, treating garbage as `0`.
fn parse_lenient(version: &str) -> u64 {
    match version.trim().parse() {
        Ok(number) => number,
        Err(_) => {
            warn!("Version {:?} is not an integer, assuming 0", version);
            0
        }
    }
}

impl Versioning for Integer {
    fn versioning_type(&self) -> VersioningType {
        VersioningType::Integer
    }

    fn initial_version(&self) -> &'static str {
        "0"
    }

    fn next_approved_version(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok(if current.trim() == "0" { "1".to_string() } else { current.to_string() })
    }

    fn next_draft_version(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok(current.to_string())
    }

    fn remove_version_suffix(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok(current.to_string())
    }

    fn next_version(&self, _: ChangeType, current: &str, _: u64)
    -> Result<String, ParseVersionError> {
        Ok(current.to_string())
    }

    fn new_document_version(&self, current: &str) -> Result<String, ParseVersionError> {
        Ok((parse_lenient(current) + 1).to_string())
    }

    fn is_initial_public_release_or_earlier(&self, current: &str)
    -> Result<bool, ParseVersionError> {
        Ok(parse_lenient(current) <= 1)
    }

    fn was_approved(&self, current: &str) -> Result<bool, ParseVersionError> {
        Ok(parse_lenient(current) >= 1)
    }

    fn major(&self, version: &str) -> Result<u64, ParseVersionError> {
        Ok(parse_lenient(version))
    }

    fn is_release(&self, number: &str, last_major: u64) -> bool {
        match number.trim().parse::<u64>() {
            Ok(n) => n >= 1 && n <= last_major,
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const I: Integer = Integer;

    #[test]
    fn initial_version() {
        assert_eq!(I.initial_version(), "0");
    }

    #[test]
    fn approval_reaches_one_and_stays() {
        assert_eq!(I.next_approved_version("0").unwrap(), "1");
        assert_eq!(I.next_approved_version("1").unwrap(), "1");
        assert_eq!(I.next_approved_version("2").unwrap(), "2");
    }

    #[test]
    fn edits_keep_the_version() {
        assert_eq!(I.next_version(ChangeType::Major, "1", 1).unwrap(), "1");
        assert_eq!(I.next_version(ChangeType::Patch, "1", 0).unwrap(), "1");
        assert_eq!(I.next_draft_version("3").unwrap(), "3");
        assert_eq!(I.remove_version_suffix("3").unwrap(), "3");
    }

    #[test]
    fn new_document_version() {
        assert_eq!(I.new_document_version("1").unwrap(), "2");
        assert_eq!(I.new_document_version("NoNumber").unwrap(), "1");
    }

    #[test]
    fn releases() {
        assert!(I.is_release("1", 1));
        assert!(!I.is_release("2", 1));
        assert!(!I.is_release("0", 0));
    }
}
