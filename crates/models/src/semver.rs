//! `MAJOR.MINOR.PATCH[-A.B][+BUILD]` version numbers.
//!
//! The pre-release suffix always consists of exactly two numeric tokens: `A`
//! counts release candidates and `B` counts edits within a candidate.

use csaf_cms_macros::ApiError;
use failure::Fail;
use std::{fmt, str::FromStr};

#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Semver {
    major: u64,
    minor: u64,
    patch: u64,
    prerelease: Option<Prerelease>,
    build: Option<String>,
}

/// Two-token pre-release suffix.
#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct Prerelease {
    /// Release-candidate counter.
    pub candidate: u64,
    /// Edit counter within a candidate.
    pub edit: u64,
}

impl Prerelease {
    /// Suffix of a fresh working version, `1.0`.
    pub const FIRST: Prerelease = Prerelease { candidate: 1, edit: 0 };

    /// `A.B` → `(A+1).0`, or `1.0` if there was no suffix.
    pub fn next_candidate(current: Option<Prerelease>) -> Prerelease {
        match current {
            Some(p) => Prerelease { candidate: p.candidate + 1, edit: 0 },
            None => Prerelease::FIRST,
        }
    }

    /// `A.B` → `A.(B+1)`, or `1.0` if there was no suffix.
    pub fn next_edit(current: Option<Prerelease>) -> Prerelease {
        match current {
            Some(p) => Prerelease { candidate: p.candidate, edit: p.edit + 1 },
            None => Prerelease::FIRST,
        }
    }
}

impl Semver {
    pub fn new(major: u64, minor: u64, patch: u64) -> Semver {
        Semver { major, minor, patch, prerelease: None, build: None }
    }

    pub fn major(&self) -> u64 { self.major }

    pub fn minor(&self) -> u64 { self.minor }

    pub fn patch(&self) -> u64 { self.patch }

    pub fn prerelease(&self) -> Option<Prerelease> { self.prerelease }

    pub fn build(&self) -> Option<&str> { self.build.as_ref().map(String::as_str) }

    pub fn next_major(&self) -> Semver {
        Semver::new(self.major + 1, 0, 0)
    }

    pub fn next_minor(&self) -> Semver {
        Semver::new(self.major, self.minor + 1, 0)
    }

    pub fn next_patch(&self) -> Semver {
        Semver::new(self.major, self.minor, self.patch + 1)
    }

    pub fn with_prerelease(mut self, prerelease: Prerelease) -> Semver {
        self.prerelease = Some(prerelease);
        self
    }

    /// Replace pre-release suffix with one parsed from `suffix`.
    pub fn with_suffix(self, suffix: &str) -> Result<Semver, ParseVersionError> {
        let prerelease = parse_prerelease(suffix)
            .ok_or_else(|| ParseVersionError::new(suffix))?;
        Ok(self.with_prerelease(prerelease))
    }

    pub fn with_cleared_suffix_and_build(mut self) -> Semver {
        self.prerelease = None;
        self.build = None;
        self
    }
}

impl FromStr for Semver {
    type Err = ParseVersionError;

    fn from_str(v: &str) -> Result<Semver, ParseVersionError> {
        let err = || ParseVersionError::new(v);

        let (rest, build) = match v.find('+') {
            Some(inx) => (&v[..inx], Some(&v[inx + 1..])),
            None => (v, None),
        };

        let (core, suffix) = match rest.find('-') {
            Some(inx) => (&rest[..inx], Some(&rest[inx + 1..])),
            None => (rest, None),
        };

        let mut numerals = core.split('.').map(parse_numeral);
        let major = numerals.next().and_then(|n| n).ok_or_else(err)?;
        let minor = numerals.next().and_then(|n| n).ok_or_else(err)?;
        let patch = numerals.next().and_then(|n| n).ok_or_else(err)?;

        if numerals.next().is_some() {
            return Err(err());
        }

        let prerelease = match suffix {
            Some(suffix) => Some(parse_prerelease(suffix).ok_or_else(err)?),
            None => None,
        };

        let build = match build {
            Some(b) if b.is_empty() => return Err(err()),
            Some(b) => Some(b.to_string()),
            None => None,
        };

        Ok(Semver { major, minor, patch, prerelease, build })
    }
}

impl fmt::Display for Semver {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;

        if let Some(Prerelease { candidate, edit }) = self.prerelease {
            write!(f, "-{}.{}", candidate, edit)?;
        }

        if let Some(ref build) = self.build {
            write!(f, "+{}", build)?;
        }

        Ok(())
    }
}

fn parse_numeral(s: &str) -> Option<u64> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn parse_prerelease(s: &str) -> Option<Prerelease> {
    let mut tokens = s.split('.').map(parse_numeral);
    let candidate = tokens.next()??;
    let edit = tokens.next()??;

    if tokens.next().is_some() {
        return None;
    }

    Some(Prerelease { candidate, edit })
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "version:invalid", status = "InternalServerError")]
#[fail(display = "Invalid version number: {:?}", version)]
pub struct ParseVersionError {
    version: String,
}

impl ParseVersionError {
    fn new(version: &str) -> ParseVersionError {
        ParseVersionError { version: version.to_string() }
    }
}
