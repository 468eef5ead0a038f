//! Advisories: a CSAF document plus the envelope the engine tracks about it.
//!
//! [`Advisory`] is an immutable value. Every change is expressed as a builder
//! method consuming the old value and returning a new one, so that the
//! snapshot taken before an operation is never affected by it.

use chrono::{DateTime, Utc};
use csaf_cms_macros::{ApiError, From};
use failure::Fail;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    history::{Releases, RevisionHistory},
    storage::ObjectType,
    versioning::{Versioning, VersioningType},
    workflow::WorkflowState,
};

/// Value of `document.tracking.status`.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackingStatus {
    Draft,
    Final,
    Interim,
}

impl TrackingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            TrackingStatus::Draft => "draft",
            TrackingStatus::Final => "final",
            TrackingStatus::Interim => "interim",
        }
    }

    pub fn from_name(name: &str) -> Option<TrackingStatus> {
        match name {
            "draft" => Some(TrackingStatus::Draft),
            "final" => Some(TrackingStatus::Final),
            "interim" => Some(TrackingStatus::Interim),
            _ => None,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Advisory {
    #[serde(rename = "type")]
    kind: ObjectType,
    /// Advisory this is a superseded copy of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    advisory_id: Option<Uuid>,
    owner: String,
    workflow_state: WorkflowState,
    versioning_type: VersioningType,
    last_major_version: u64,
    csaf: Map<String, Value>,
}

impl Advisory {
    /// Create a new draft advisory owned by `owner`.
    pub fn new<O>(owner: O, versioning_type: VersioningType, csaf: Map<String, Value>)
    -> Advisory
    where
        O: Into<String>,
    {
        Advisory {
            kind: ObjectType::Advisory,
            advisory_id: None,
            owner: owner.into(),
            workflow_state: WorkflowState::Draft,
            versioning_type,
            last_major_version: 0,
            csaf,
        }
    }

    /// Load an advisory from its stored representation.
    pub fn from_value(value: Value) -> Result<Advisory, LoadAdvisoryError> {
        let advisory: Advisory = serde_json::from_value(value)?;

        match advisory.kind {
            ObjectType::Advisory | ObjectType::AdvisoryVersion => Ok(advisory),
            kind => Err(LoadAdvisoryError::NotAnAdvisory(kind)),
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }

    pub fn kind(&self) -> ObjectType {
        self.kind
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn workflow_state(&self) -> WorkflowState {
        self.workflow_state
    }

    pub fn versioning_type(&self) -> VersioningType {
        self.versioning_type
    }

    pub fn strategy(&self) -> &'static dyn Versioning {
        self.versioning_type.strategy()
    }

    pub fn last_major_version(&self) -> u64 {
        self.last_major_version
    }

    /// Release classification for this advisory's revision history.
    pub fn releases(&self) -> Releases<'static> {
        Releases {
            strategy: self.strategy(),
            last_major: self.last_major_version,
        }
    }

    pub fn csaf(&self) -> &Map<String, Value> {
        &self.csaf
    }

    /// CSAF document as a standalone JSON value.
    pub fn csaf_value(&self) -> Value {
        Value::Object(self.csaf.clone())
    }

    fn tracking(&self) -> Option<&Map<String, Value>> {
        self.csaf.get("document")?.get("tracking")?.as_object()
    }

    fn tracking_str(&self, field: &str) -> Option<&str> {
        self.tracking()?.get(field)?.as_str()
    }

    pub fn title(&self) -> Option<&str> {
        self.csaf.get("document")?.get("title")?.as_str()
    }

    pub fn tracking_id(&self) -> Option<&str> {
        self.tracking_str("id")
    }

    pub fn tracking_version(&self) -> Option<&str> {
        self.tracking_str("version")
    }

    pub fn tracking_status(&self) -> Option<TrackingStatus> {
        self.tracking_str("status").and_then(TrackingStatus::from_name)
    }

    pub fn current_release_date(&self) -> Option<DateTime<Utc>> {
        self.tracking_str("current_release_date")?.parse().ok()
    }

    pub fn initial_release_date(&self) -> Option<DateTime<Utc>> {
        self.tracking_str("initial_release_date")?.parse().ok()
    }

    pub fn revision_history(&self) -> Result<RevisionHistory, serde_json::Error> {
        match self.tracking().and_then(|t| t.get("revision_history")) {
            Some(history) => serde_json::from_value(history.clone()),
            None => Ok(RevisionHistory::default()),
        }
    }

    pub fn with_csaf(mut self, csaf: Map<String, Value>) -> Advisory {
        self.csaf = csaf;
        self
    }

    pub fn with_owner<O: Into<String>>(mut self, owner: O) -> Advisory {
        self.owner = owner.into();
        self
    }

    pub fn with_workflow_state(mut self, state: WorkflowState) -> Advisory {
        self.workflow_state = state;
        self
    }

    pub fn with_last_major_version(mut self, major: u64) -> Advisory {
        self.last_major_version = major;
        self
    }

    /// Turn this advisory into a superseded copy of advisory `id`.
    pub fn into_superseded_copy(mut self, id: Uuid) -> Advisory {
        self.kind = ObjectType::AdvisoryVersion;
        self.advisory_id = Some(id);
        self
    }

    pub fn with_tracking_version(self, version: &str) -> Advisory {
        self.with_tracking_field("version", version.into())
    }

    pub fn with_tracking_status(self, status: TrackingStatus) -> Advisory {
        self.with_tracking_field("status", status.as_str().into())
    }

    pub fn with_current_release_date(self, date: DateTime<Utc>) -> Advisory {
        self.with_tracking_field("current_release_date", format_date(date))
    }

    pub fn with_initial_release_date(self, date: DateTime<Utc>) -> Advisory {
        self.with_tracking_field("initial_release_date", format_date(date))
    }

    /// Set `initial_release_date` unless the document already has one.
    pub fn with_default_initial_release_date(self, date: DateTime<Utc>) -> Advisory {
        if self.tracking_str("initial_release_date").is_some() {
            self
        } else {
            self.with_initial_release_date(date)
        }
    }

    /// Ensure `current_release_date` is not earlier than `now`.
    pub fn with_release_date_not_before(self, now: DateTime<Utc>) -> Advisory {
        match self.current_release_date() {
            Some(date) if date >= now => self,
            _ => self.with_current_release_date(now),
        }
    }

    pub fn with_revision_history(self, history: &RevisionHistory)
    -> Result<Advisory, serde_json::Error> {
        let history = serde_json::to_value(history)?;
        Ok(self.with_tracking_field("revision_history", history))
    }

    /// Copy the fields of `document.tracking` maintained by the engine from
    /// `other`, discarding whatever this advisory has in their place.
    pub fn with_managed_tracking_of(mut self, other: &Advisory) -> Advisory {
        for field in MANAGED_TRACKING {
            match other.tracking().and_then(|t| t.get(*field)) {
                Some(value) => self = self.with_tracking_field(field, value.clone()),
                None => {
                    if let Some(tracking) = self.csaf.get_mut("document")
                        .and_then(|d| d.get_mut("tracking"))
                        .and_then(Value::as_object_mut)
                    {
                        tracking.remove(*field);
                    }
                }
            }
        }
        self
    }

    fn with_tracking_field(mut self, field: &str, value: Value) -> Advisory {
        let document = object_entry(&mut self.csaf, "document");
        let tracking = object_entry(document, "tracking");
        tracking.insert(field.to_string(), value);
        self
    }
}

/// Fields of `document.tracking` which only the engine may change.
const MANAGED_TRACKING: &[&str] = &[
    "version",
    "status",
    "revision_history",
    "initial_release_date",
    "current_release_date",
];

fn format_date(date: DateTime<Utc>) -> Value {
    Value::String(date.to_rfc3339())
}

/// Get an object stored under `key`, replacing whatever else is there.
fn object_entry<'a>(map: &'a mut Map<String, Value>, key: &str)
-> &'a mut Map<String, Value> {
    let slot = map.entry(key.to_string()).or_insert_with(|| Value::Object(Map::new()));

    if !slot.is_object() {
        *slot = Value::Object(Map::new());
    }

    match slot {
        Value::Object(object) => object,
        _ => unreachable!(),
    }
}

/// Require a CSAF document to be a JSON object.
pub fn csaf_object(csaf: Value) -> Result<Map<String, Value>, InvalidDocumentError> {
    match csaf {
        Value::Object(map) => Ok(map),
        _ => Err(InvalidDocumentError),
    }
}

#[derive(ApiError, Debug, Fail)]
#[api(code = "advisory:invalid-document", status = "BadRequest")]
#[fail(display = "CSAF document must be a JSON object")]
pub struct InvalidDocumentError;

#[derive(ApiError, Debug, Fail, From)]
pub enum LoadAdvisoryError {
    #[api(code = "advisory:not-found", status = "NotFound")]
    #[fail(display = "Document is a {}, not an advisory", _0)]
    NotAnAdvisory(ObjectType),
    #[api(internal)]
    #[fail(display = "Stored advisory is corrupted: {}", _0)]
    Corrupted(#[cause] #[from] serde_json::Error),
}
