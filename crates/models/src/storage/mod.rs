//! Document store holding advisories, comments and audit records.
//!
//! Every stored document is a JSON object whose `type` field names an
//! [`ObjectType`]. Writes are optimistic: each one must present the
//! [`Revision`] obtained when the document was read, and fails with
//! [`StorageError::Conflict`] if somebody else wrote in between.

use csaf_cms_macros::{ApiError, From};
use failure::Fail;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use uuid::Uuid;

mod memory;
mod postgres;

pub use self::{memory::MemoryStorage, postgres::PgStorage};

/// Kinds of documents kept in storage.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ObjectType {
    Advisory,
    /// Copy of an advisory superseded by a newer version.
    AdvisoryVersion,
    Comment,
    AuditTrailDocument,
    AuditTrailWorkflow,
    AuditTrailComment,
}

impl ObjectType {
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::Advisory => "Advisory",
            ObjectType::AdvisoryVersion => "AdvisoryVersion",
            ObjectType::Comment => "Comment",
            ObjectType::AuditTrailDocument => "AuditTrailDocument",
            ObjectType::AuditTrailWorkflow => "AuditTrailWorkflow",
            ObjectType::AuditTrailComment => "AuditTrailComment",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Optimistic concurrency token.
///
/// Tokens have the form `<generation>-<random>`; the generation increases
/// with each write.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Revision(String);

impl Revision {
    /// Token of a newly created document.
    pub fn first() -> Revision {
        Revision::with_generation(1)
    }

    fn with_generation(generation: u64) -> Revision {
        Revision(format!("{}-{}", generation, Uuid::new_v4().to_simple()))
    }

    /// Token to store with the next write.
    pub fn next(&self) -> Revision {
        Revision::with_generation(self.generation() + 1)
    }

    pub fn generation(&self) -> u64 {
        self.0.split('-').next().and_then(|g| g.parse().ok()).unwrap_or(0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for Revision {
    fn from(token: String) -> Revision {
        Revision(token)
    }
}

impl<'a> From<&'a str> for Revision {
    fn from(token: &'a str) -> Revision {
        Revision(token.to_string())
    }
}

impl fmt::Display for Revision {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A document as kept in storage.
#[derive(Clone, Debug, PartialEq)]
pub struct Stored {
    pub id: Uuid,
    pub revision: Revision,
    pub data: Value,
}

/// Query over top-level fields of stored documents.
#[derive(Clone, Debug, PartialEq)]
pub enum Selector {
    /// Every document.
    All,
    /// Field is equal to a value.
    Eq(String, Value),
    /// Field is a string containing a substring.
    Contains(String, String),
    And(Vec<Selector>),
    Or(Vec<Selector>),
}

impl Selector {
    pub fn field_eq<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Selector {
        Selector::Eq(field.into(), value.into())
    }

    /// Documents of a single type.
    pub fn of_type(kind: ObjectType) -> Selector {
        Selector::field_eq("type", kind.as_str())
    }

    /// Documents of a given type belonging to an advisory.
    pub fn of_advisory(kind: ObjectType, advisory: Uuid) -> Selector {
        Selector::And(vec![
            Selector::of_type(kind),
            Selector::field_eq("advisoryId", advisory.to_string()),
        ])
    }

    /// Audit records of all kinds belonging to an advisory.
    pub fn audit_trail(advisory: Uuid) -> Selector {
        Selector::And(vec![
            Selector::Contains("type".into(), "AuditTrail".into()),
            Selector::field_eq("advisoryId", advisory.to_string()),
        ])
    }

    pub fn matches(&self, document: &Value) -> bool {
        match self {
            Selector::All => true,
            Selector::Eq(field, value) => document.get(field) == Some(value),
            Selector::Contains(field, needle) => document.get(field)
                .and_then(Value::as_str)
                .map_or(false, |text| text.contains(needle.as_str())),
            Selector::And(selectors) => selectors.iter().all(|s| s.matches(document)),
            Selector::Or(selectors) => selectors.iter().any(|s| s.matches(document)),
        }
    }

    /// Value of `type` every matching document must have, if the selector
    /// requires one.
    pub fn required_type(&self) -> Option<&str> {
        self.required("type")
    }

    /// Advisory every matching document must belong to, if the selector
    /// requires one.
    pub fn required_advisory(&self) -> Option<&str> {
        self.required("advisoryId")
    }

    /// String value `field` must have in every matching document.
    pub fn required(&self, field: &str) -> Option<&str> {
        match self {
            Selector::Eq(name, Value::String(value)) if name == field => Some(value.as_str()),
            Selector::And(selectors) => selectors.iter().filter_map(|s| s.required(field)).next(),
            _ => None,
        }
    }

    /// Substring `field` must contain in every matching document.
    pub fn required_substring(&self, field: &str) -> Option<&str> {
        match self {
            Selector::Contains(name, needle) if name == field => Some(needle.as_str()),
            Selector::And(selectors) =>
                selectors.iter().filter_map(|s| s.required_substring(field)).next(),
            _ => None,
        }
    }
}

/// Persistence of JSON documents with optimistic concurrency.
pub trait Storage: Send + Sync {
    /// Store a new document.
    fn create(&self, id: Uuid, data: &Value) -> Result<Revision, StorageError>;

    fn read(&self, id: Uuid) -> Result<Stored, StorageError>;

    /// Replace a document, provided it is still at `revision`.
    fn write(&self, id: Uuid, data: &Value, revision: &Revision)
    -> Result<Revision, StorageError>;

    /// Remove a document, provided it is still at `revision`.
    fn delete(&self, id: Uuid, revision: &Revision) -> Result<(), StorageError>;

    /// Find all documents matching `selector`, in order of creation.
    fn find(&self, selector: &Selector) -> Result<Vec<Stored>, StorageError>;
}

#[derive(ApiError, Debug, Fail, From)]
pub enum StorageError {
    #[api(code = "document:not-found", status = "NotFound")]
    #[fail(display = "No such document: {}", _0)]
    NotFound(Uuid),
    #[api(code = "document:conflict", status = "Conflict")]
    #[fail(display = "Document {} was modified concurrently", _0)]
    Conflict(Uuid),
    #[api(code = "document:exists", status = "Conflict")]
    #[fail(display = "Document {} already exists", _0)]
    AlreadyExists(Uuid),
    #[api(internal)]
    #[fail(display = "Database error: {}", _0)]
    Database(#[cause] #[from] diesel::result::Error),
    #[api(internal)]
    #[fail(display = "Cannot obtain database connection: {}", _0)]
    Pool(#[cause] #[from] r2d2::Error),
}
