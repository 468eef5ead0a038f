//! Append-only audit trail of advisory mutations.
//!
//! Content changes are stored as RFC 6902 patches between two snapshots of
//! the whole stored advisory (envelope included), so that replaying every
//! patch of an advisory, in order, starting from an empty object reproduces
//! the advisory exactly.

use chrono::{DateTime, Utc};
use csaf_cms_macros::{ApiError, From};
use failure::Fail;
use json_patch::{Patch, PatchError};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{
    storage::{ObjectType, Selector, Storage, StorageError},
    workflow::WorkflowState,
};

#[derive(Clone, Copy, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub enum ChangeKind {
    Create,
    Update,
}

/// Change to the content of an advisory.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentChange {
    pub advisory_id: Uuid,
    pub change_type: ChangeKind,
    pub diff: Patch,
    #[serde(default)]
    pub old_doc_version: Option<String>,
    #[serde(default)]
    pub doc_version: Option<String>,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

/// Move of an advisory between two workflow states.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowChange {
    pub advisory_id: Uuid,
    pub old_state: WorkflowState,
    pub new_state: WorkflowState,
    #[serde(default)]
    pub old_doc_version: Option<String>,
    #[serde(default)]
    pub doc_version: Option<String>,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

/// Change to a comment on an advisory.
#[derive(Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentChange {
    pub advisory_id: Uuid,
    pub comment_id: Uuid,
    pub change_type: ChangeKind,
    pub diff: Patch,
    pub user: String,
    pub created_at: DateTime<Utc>,
}

/// A single audit record, as kept in storage.
#[derive(Debug, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum AuditTrail {
    AuditTrailDocument(DocumentChange),
    AuditTrailWorkflow(WorkflowChange),
    AuditTrailComment(CommentChange),
}

impl AuditTrail {
    pub fn kind(&self) -> ObjectType {
        match self {
            AuditTrail::AuditTrailDocument(_) => ObjectType::AuditTrailDocument,
            AuditTrail::AuditTrailWorkflow(_) => ObjectType::AuditTrailWorkflow,
            AuditTrail::AuditTrailComment(_) => ObjectType::AuditTrailComment,
        }
    }

    pub fn advisory_id(&self) -> Uuid {
        match self {
            AuditTrail::AuditTrailDocument(c) => c.advisory_id,
            AuditTrail::AuditTrailWorkflow(c) => c.advisory_id,
            AuditTrail::AuditTrailComment(c) => c.advisory_id,
        }
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        match self {
            AuditTrail::AuditTrailDocument(c) => c.created_at,
            AuditTrail::AuditTrailWorkflow(c) => c.created_at,
            AuditTrail::AuditTrailComment(c) => c.created_at,
        }
    }

    pub fn user(&self) -> &str {
        match self {
            AuditTrail::AuditTrailDocument(c) => &c.user,
            AuditTrail::AuditTrailWorkflow(c) => &c.user,
            AuditTrail::AuditTrailComment(c) => &c.user,
        }
    }
}

/// Snapshot a mutation starts from. Creations start from nothing.
fn base_or_empty(old: Option<&Value>) -> Value {
    old.cloned().unwrap_or_else(|| Value::Object(Map::new()))
}

fn change_kind(old: Option<&Value>) -> ChangeKind {
    if old.is_some() { ChangeKind::Update } else { ChangeKind::Create }
}

/// Writes audit records for one advisory and reads them back.
pub struct Recorder<'a> {
    storage: &'a dyn Storage,
}

impl<'a> Recorder<'a> {
    pub fn new(storage: &'a dyn Storage) -> Recorder<'a> {
        Recorder { storage }
    }

    fn append(&self, record: &AuditTrail) -> Result<Uuid, AuditError> {
        let id = Uuid::new_v4();
        let data = serde_json::to_value(record)?;
        self.storage.create(id, &data)?;
        Ok(id)
    }

    /// Record a change to the content of an advisory from `old` to `new`.
    ///
    /// Both snapshots are whole stored advisories. `old` is `None` for
    /// a newly created advisory.
    #[allow(clippy::too_many_arguments)]
    pub fn record_content_change(
        &self,
        advisory_id: Uuid,
        old: Option<&Value>,
        new: &Value,
        old_version: Option<&str>,
        new_version: Option<&str>,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuditError> {
        let diff = json_patch::diff(&base_or_empty(old), new);

        self.append(&AuditTrail::AuditTrailDocument(DocumentChange {
            advisory_id,
            change_type: change_kind(old),
            diff,
            old_doc_version: old_version.map(str::to_string),
            doc_version: new_version.map(str::to_string),
            user: user.to_string(),
            created_at: now,
        }))
    }

    /// Record a move between workflow states. No content diff is kept.
    #[allow(clippy::too_many_arguments)]
    pub fn record_workflow_change(
        &self,
        advisory_id: Uuid,
        old_state: WorkflowState,
        new_state: WorkflowState,
        old_version: Option<&str>,
        new_version: Option<&str>,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuditError> {
        self.append(&AuditTrail::AuditTrailWorkflow(WorkflowChange {
            advisory_id,
            old_state,
            new_state,
            old_doc_version: old_version.map(str::to_string),
            doc_version: new_version.map(str::to_string),
            user: user.to_string(),
            created_at: now,
        }))
    }

    /// Record a change to a comment.
    pub fn record_comment_change(
        &self,
        advisory_id: Uuid,
        comment_id: Uuid,
        old: Option<&Value>,
        new: &Value,
        user: &str,
        now: DateTime<Utc>,
    ) -> Result<Uuid, AuditError> {
        self.append(&AuditTrail::AuditTrailComment(CommentChange {
            advisory_id,
            comment_id,
            change_type: change_kind(old),
            diff: json_patch::diff(&base_or_empty(old), new),
            user: user.to_string(),
            created_at: now,
        }))
    }

    /// All audit records of an advisory, oldest first.
    pub fn trail_for(&self, advisory_id: Uuid) -> Result<Vec<AuditTrail>, AuditError> {
        let mut records = self.storage.find(&Selector::audit_trail(advisory_id))?
            .into_iter()
            .map(|stored| serde_json::from_value(stored.data))
            .collect::<Result<Vec<AuditTrail>, _>>()?;

        // Storage returns records in creation order, which a stable sort
        // preserves for equal timestamps.
        records.sort_by_key(AuditTrail::created_at);

        Ok(records)
    }

    /// Content diffs of an advisory, oldest first.
    pub fn document_diffs(&self, advisory_id: Uuid) -> Result<Vec<Patch>, AuditError> {
        Ok(self.trail_for(advisory_id)?
            .into_iter()
            .filter_map(|record| match record {
                AuditTrail::AuditTrailDocument(change) => Some(change.diff),
                _ => None,
            })
            .collect())
    }

    /// Remove every audit record of an advisory.
    pub fn delete_for(&self, advisory_id: Uuid) -> Result<usize, AuditError> {
        let records = self.storage.find(&Selector::audit_trail(advisory_id))?;
        let count = records.len();

        for record in records {
            self.storage.delete(record.id, &record.revision)?;
        }

        Ok(count)
    }
}

/// Apply `diffs` one after another on top of `base`.
///
/// A diff which does not apply means the stored history is corrupted or out
/// of order; this is never skipped over.
pub fn replay<'d, I>(base: &Value, diffs: I) -> Result<Value, ReconstructionError>
where
    I: IntoIterator<Item = &'d Patch>,
{
    let mut document = base.clone();

    for (index, diff) in diffs.into_iter().enumerate() {
        json_patch::patch(&mut document, diff)
            .map_err(|cause| ReconstructionError { index, cause })?;
    }

    Ok(document)
}

/// Replay `diffs` starting from an empty document.
pub fn reconstruct<'d, I>(diffs: I) -> Result<Value, ReconstructionError>
where
    I: IntoIterator<Item = &'d Patch>,
{
    replay(&Value::Object(Map::new()), diffs)
}

#[derive(ApiError, Debug, Fail)]
#[api(internal)]
#[fail(display = "Audit diff {} does not apply: {}", index, cause)]
pub struct ReconstructionError {
    pub index: usize,
    #[cause]
    pub cause: PatchError,
}

#[derive(ApiError, Debug, Fail, From)]
pub enum AuditError {
    #[fail(display = "{}", _0)]
    Storage(#[cause] #[from] StorageError),
    #[api(internal)]
    #[fail(display = "Malformed audit record: {}", _0)]
    Json(#[cause] #[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use super::*;
    use crate::storage::MemoryStorage;

    fn now() -> DateTime<Utc> {
        Utc::now()
    }

    #[test]
    fn replay_reproduces_every_snapshot() {
        let v1 = json!({"owner": "alice", "csaf": {"document": {"title": "One"}}});
        let v2 = json!({"owner": "alice", "csaf": {"document": {"title": "Two"}}});
        let v3 = json!({"owner": "bob", "csaf": {"document": {"title": "Two", "lang": "en"}}});

        let diffs = vec![
            json_patch::diff(&json!({}), &v1),
            json_patch::diff(&v1, &v2),
            json_patch::diff(&v2, &v3),
        ];

        assert_eq!(reconstruct(&diffs[..1]).unwrap(), v1);
        assert_eq!(reconstruct(&diffs[..2]).unwrap(), v2);
        assert_eq!(reconstruct(&diffs).unwrap(), v3);
        assert_eq!(replay(&v1, &diffs[1..]).unwrap(), v3);
    }

    #[test]
    fn out_of_order_diffs_are_fatal() {
        let v1 = json!({"a": {"b": 1}});
        let v2 = json!({});
        let diffs = vec![
            json_patch::diff(&v1, &v2),
            json_patch::diff(&v1, &v2),
        ];

        let err = replay(&v1, &diffs).unwrap_err();
        assert_eq!(err.index, 1);
    }

    #[test]
    fn recorded_trail_replays() {
        let storage = MemoryStorage::new();
        let recorder = Recorder::new(&storage);
        let id = Uuid::new_v4();

        let v1 = json!({"workflowState": "Draft", "csaf": {}});
        let v2 = json!({"workflowState": "Review", "csaf": {}});

        recorder.record_content_change(id, None, &v1, None, Some("0.0.1"), "alice", now())
            .unwrap();
        recorder.record_content_change(
            id, Some(&v1), &v2, Some("0.0.1"), Some("0.0.1"), "alice", now()).unwrap();
        recorder.record_workflow_change(id, WorkflowState::Draft, WorkflowState::Review,
            Some("0.0.1"), Some("0.0.1"), "alice", now()).unwrap();

        let trail = recorder.trail_for(id).unwrap();
        assert_eq!(trail.len(), 3);
        assert_eq!(trail[2].kind(), ObjectType::AuditTrailWorkflow);

        match &trail[0] {
            AuditTrail::AuditTrailDocument(change) =>
                assert_eq!(change.change_type, ChangeKind::Create),
            other => panic!("unexpected {:?}", other),
        }

        let diffs = recorder.document_diffs(id).unwrap();
        assert_eq!(reconstruct(&diffs).unwrap(), v2);
    }

    #[test]
    fn stored_record_shape() {
        let storage = MemoryStorage::new();
        let recorder = Recorder::new(&storage);
        let id = Uuid::new_v4();

        recorder.record_workflow_change(id, WorkflowState::Review, WorkflowState::Approved,
            Some("0.0.1"), Some("1.0.0-1.0"), "rita", now()).unwrap();

        let stored = storage.find(&Selector::All).unwrap();
        let data = &stored[0].data;
        assert_eq!(data["type"], "AuditTrailWorkflow");
        assert_eq!(data["advisoryId"], id.to_string());
        assert_eq!(data["oldState"], "Review");
        assert_eq!(data["newState"], "Approved");
        assert_eq!(data["docVersion"], "1.0.0-1.0");
        assert_eq!(data["user"], "rita");
    }

    #[test]
    fn delete_removes_only_own_records() {
        let storage = MemoryStorage::new();
        let recorder = Recorder::new(&storage);
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        for id in &[a, a, b] {
            recorder.record_content_change(*id, None, &json!({}), None, None, "x", now())
                .unwrap();
        }

        assert_eq!(recorder.delete_for(a).unwrap(), 2);
        assert!(recorder.trail_for(a).unwrap().is_empty());
        assert_eq!(recorder.trail_for(b).unwrap().len(), 1);
    }
}
