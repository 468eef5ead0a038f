//! Operations on advisories, performed on behalf of a caller.
//!
//! Each operation reads a snapshot of the advisory, derives the next snapshot
//! from it, writes that snapshot using the revision token the caller holds and
//! finally records the change in the audit trail. A stale token fails the
//! whole operation with a conflict; nothing is retried here.

use chrono::{DateTime, Utc};
use csaf_cms_error::Error;
use csaf_cms_macros::ApiError;
use failure::Fail;
use log::{debug, error, info};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    advisory::{Advisory, TrackingStatus, csaf_object},
    audit::{self, AuditError, AuditTrail, Recorder},
    classify::classify,
    comment::Comment,
    config::Config,
    history::{RevisionHistory, RevisionHistoryEntry},
    permissions::{self, Caller},
    semver::ParseVersionError,
    storage::{ObjectType, Revision, Selector, Storage, StorageError, Stored},
    validator::Validator,
    versioning::{Versioning, VersioningType, version_after_edit},
    workflow::{self, WorkflowState},
};

/// Identity and revision of a document after a write.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Saved {
    pub id: Uuid,
    pub revision: Revision,
}

/// Revision history details supplied with a content change.
#[derive(Clone, Debug, Default)]
pub struct RevisionNote {
    pub summary: String,
    pub legacy_version: Option<String>,
}

impl RevisionNote {
    pub fn new<S: Into<String>>(summary: S) -> RevisionNote {
        RevisionNote {
            summary: summary.into(),
            legacy_version: None,
        }
    }

    fn entry(&self, number: &str, date: DateTime<Utc>) -> RevisionHistoryEntry {
        RevisionHistoryEntry {
            legacy_version: self.legacy_version.clone(),
            ..RevisionHistoryEntry::new(number, date, self.summary.as_str())
        }
    }
}

/// Additional parameters of a workflow transition.
#[derive(Clone, Copy, Debug, Default)]
pub struct TransitionOptions {
    /// Release date requested for a publication. A date in the future
    /// schedules the publication instead of performing it.
    pub proposed_release_date: Option<DateTime<Utc>>,
    /// Tracking status of a publication; `final` unless specified.
    pub tracking_status: Option<TrackingStatus>,
}

/// Summary of an advisory, as seen by a particular caller.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvisoryInfo {
    pub id: Uuid,
    pub revision: Revision,
    #[serde(rename = "type")]
    pub kind: ObjectType,
    pub title: Option<String>,
    pub tracking_id: Option<String>,
    pub version: Option<String>,
    pub owner: String,
    pub workflow_state: WorkflowState,
    pub versioning_type: VersioningType,
    pub current_release_date: Option<DateTime<Utc>>,
    /// States the caller may move this advisory into.
    pub allowed_transitions: Vec<WorkflowState>,
    pub changeable: bool,
    pub deletable: bool,
}

/// An advisory together with its CSAF document.
#[derive(Clone, Debug, Serialize)]
pub struct AdvisoryDetails {
    #[serde(flatten)]
    pub info: AdvisoryInfo,
    pub csaf: Value,
}

#[derive(Clone, Debug, Serialize)]
pub struct CommentInfo {
    pub id: Uuid,
    pub revision: Revision,
    #[serde(flatten)]
    pub comment: Comment,
}

/// An advisory as read from storage.
struct Loaded {
    id: Uuid,
    revision: Revision,
    value: Value,
    advisory: Advisory,
}

impl Loaded {
    fn version(&self) -> &str {
        self.advisory.tracking_version().unwrap_or("")
    }
}

/// Advisory scheduled for publication.
pub struct Scheduled {
    pub id: Uuid,
    pub revision: Revision,
    pub advisory: Advisory,
}

#[derive(Clone)]
pub struct AdvisoryService {
    storage: Arc<dyn Storage>,
    validator: Arc<dyn Validator>,
    config: Arc<Config>,
}

impl AdvisoryService {
    pub fn new(
        storage: Arc<dyn Storage>,
        validator: Arc<dyn Validator>,
        config: Arc<Config>,
    ) -> AdvisoryService {
        AdvisoryService { storage, validator, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn recorder(&self) -> Recorder {
        Recorder::new(&*self.storage)
    }

    /// Create a new draft advisory owned by the caller.
    pub fn add_advisory(&self, caller: &Caller, csaf: Value, note: &RevisionNote)
    -> Result<Saved, Error> {
        if !permissions::can_create(caller) {
            return Err(AdvisoryError::Forbidden { action: "create advisories" }.into());
        }

        let now = Utc::now();
        let versioning = self.config.versioning.default;
        let version = versioning.strategy().initial_version();
        let history = RevisionHistory::default().push(note.entry(version, now));

        let advisory = Advisory::new(caller.name.as_str(), versioning, csaf_object(csaf)?)
            .with_tracking_version(version)
            .with_tracking_status(TrackingStatus::Draft)
            .with_revision_history(&history)?
            .with_default_initial_release_date(now)
            .with_release_date_not_before(now);

        let saved = self.create(caller, &advisory, now)?;

        info!("{} created advisory {} ({} {})",
            caller.name, saved.id, versioning, version);

        Ok(saved)
    }

    /// Store an existing CSAF document, keeping its version and history.
    ///
    /// The versioning scheme is detected from the document's version.
    /// Documents with a `final` or `interim` status are imported as
    /// published, all others as drafts.
    pub fn import_advisory(&self, caller: &Caller, csaf: Value) -> Result<Saved, Error> {
        if !permissions::can_create(caller) {
            return Err(AdvisoryError::Forbidden { action: "import advisories" }.into());
        }

        let now = Utc::now();
        let imported = Advisory::new(
            caller.name.as_str(), VersioningType::default(), csaf_object(csaf)?);

        let versioning = VersioningType::detect(imported.tracking_version().unwrap_or(""));
        let strategy = versioning.strategy();

        let published = match imported.tracking_status() {
            Some(TrackingStatus::Final) | Some(TrackingStatus::Interim) => true,
            _ => false,
        };

        let (version, history) = match imported.tracking_version() {
            Some(version) if !version.trim().is_empty() =>
                (version.to_string(), imported.revision_history()?),
            _ => {
                let version = strategy.initial_version();
                let entry = RevisionHistoryEntry::new(
                    version, now, self.config.summary.new_version.as_str());
                (version.to_string(), RevisionHistory::default().push(entry))
            }
        };

        let last_major = imported_last_major(strategy, &version, &history, published)?;

        let advisory = Advisory::new(caller.name.as_str(), versioning, imported.csaf().clone())
            .with_workflow_state(if published {
                WorkflowState::Published
            } else {
                WorkflowState::Draft
            })
            .with_last_major_version(last_major)
            .with_tracking_version(&version)
            .with_revision_history(&history)?
            .with_default_initial_release_date(now)
            .with_release_date_not_before(now);

        let advisory = match advisory.tracking_status() {
            Some(_) => advisory,
            None => advisory.with_tracking_status(TrackingStatus::Draft),
        };

        let saved = self.create(caller, &advisory, now)?;

        info!("{} imported advisory {} as {} ({} {})",
            caller.name, saved.id, advisory.workflow_state(), versioning, version);

        Ok(saved)
    }

    /// Store a new advisory and record its creation.
    fn create(&self, caller: &Caller, advisory: &Advisory, now: DateTime<Utc>)
    -> Result<Saved, Error> {
        let id = Uuid::new_v4();
        let value = advisory.to_value()?;
        let revision = self.storage.create(id, &value)?;

        self.recorder().record_content_change(
            id, None, &value, None, advisory.tracking_version(), &caller.name, now)?;

        Ok(Saved { id, revision })
    }

    fn read(&self, id: Uuid) -> Result<(Stored, Advisory), Error> {
        let stored = self.storage.read(id).map_err(|err| match err {
            StorageError::NotFound(id) => Error::from(AdvisoryError::NotFound(id)),
            err => Error::from(err),
        })?;
        let advisory = Advisory::from_value(stored.data.clone())?;
        Ok((stored, advisory))
    }

    /// Read an advisory (not a superseded copy) which the caller expects to
    /// be at `revision`.
    fn load(&self, id: Uuid, revision: &Revision) -> Result<Loaded, Error> {
        let (stored, advisory) = self.read(id)?;

        if advisory.kind() != ObjectType::Advisory {
            return Err(AdvisoryError::Superseded(id).into());
        }

        if &stored.revision != revision {
            return Err(StorageError::Conflict(id).into());
        }

        Ok(Loaded {
            id,
            revision: stored.revision,
            value: stored.data,
            advisory,
        })
    }

    /// Write the new snapshot of an advisory and record the change.
    ///
    /// The snapshot is written before its audit records. A write with a stale
    /// revision fails before anything is recorded, so the trail only ever
    /// holds diffs which were applied and replaying it reproduces the stored
    /// advisory. A failure recording the change after a successful write is
    /// returned to the caller and logged with the new revision.
    fn commit(
        &self,
        caller: &Caller,
        old: &Loaded,
        new: &Advisory,
        now: DateTime<Utc>,
    ) -> Result<Revision, Error> {
        let value = new.to_value()?;
        let revision = self.storage.write(old.id, &value, &old.revision)?;

        self.record(caller, old, new, &value, now).map_err(|err| {
            error!("Advisory {} was written at revision {} but not audited: {}",
                old.id, revision, err);
            err
        })?;

        Ok(revision)
    }

    fn record(
        &self,
        caller: &Caller,
        old: &Loaded,
        new: &Advisory,
        value: &Value,
        now: DateTime<Utc>,
    ) -> Result<(), AuditError> {
        let recorder = self.recorder();
        recorder.record_content_change(
            old.id,
            Some(&old.value),
            value,
            old.advisory.tracking_version(),
            new.tracking_version(),
            &caller.name,
            now,
        )?;

        let (from, to) = (old.advisory.workflow_state(), new.workflow_state());
        if from != to {
            recorder.record_workflow_change(
                old.id,
                from,
                to,
                old.advisory.tracking_version(),
                new.tracking_version(),
                &caller.name,
                now,
            )?;
        }

        Ok(())
    }

    fn info(&self, caller: &Caller, id: Uuid, revision: Revision, advisory: &Advisory)
    -> AdvisoryInfo {
        let (owner, state) = (advisory.owner(), advisory.workflow_state());
        let current = advisory.kind() == ObjectType::Advisory;

        AdvisoryInfo {
            id,
            revision,
            kind: advisory.kind(),
            title: advisory.title().map(str::to_string),
            tracking_id: advisory.tracking_id().map(str::to_string),
            version: advisory.tracking_version().map(str::to_string),
            owner: owner.to_string(),
            workflow_state: state,
            versioning_type: advisory.versioning_type(),
            current_release_date: advisory.current_release_date(),
            allowed_transitions: if current {
                workflow::allowed_transitions(caller, owner, state)
            } else {
                Vec::new()
            },
            changeable: current && permissions::can_change(caller, owner, state),
            deletable: current && permissions::can_delete(caller, owner, state),
        }
    }

    /// Can `caller` see this advisory, or superseded copy, at `now`?
    fn visible(caller: &Caller, advisory: &Advisory, now: DateTime<Utc>) -> bool {
        match advisory.kind() {
            ObjectType::AdvisoryVersion => permissions::can_view_superseded(caller),
            _ => permissions::can_view(
                caller,
                advisory.owner(),
                advisory.workflow_state(),
                advisory.current_release_date().map_or(true, |date| date <= now),
            ),
        }
    }

    /// List all advisories visible to the caller.
    ///
    /// Superseded copies are only listed for callers allowed to see them.
    pub fn list_advisories(&self, caller: &Caller) -> Result<Vec<AdvisoryInfo>, Error> {
        let mut stored = self.storage.find(&Selector::of_type(ObjectType::Advisory))?;

        if permissions::can_view_superseded(caller) {
            stored.extend(self.storage.find(&Selector::of_type(ObjectType::AdvisoryVersion))?);
        }

        let now = Utc::now();
        let mut list = Vec::with_capacity(stored.len());

        for Stored { id, revision, data } in stored {
            let advisory = Advisory::from_value(data)?;

            if Self::visible(caller, &advisory, now) {
                list.push(self.info(caller, id, revision, &advisory));
            }
        }

        Ok(list)
    }

    pub fn get_advisory(&self, caller: &Caller, id: Uuid) -> Result<AdvisoryDetails, Error> {
        let (stored, advisory) = self.read(id)?;

        if !Self::visible(caller, &advisory, Utc::now()) {
            return Err(AdvisoryError::Forbidden { action: "view this advisory" }.into());
        }

        Ok(AdvisoryDetails {
            info: self.info(caller, id, stored.revision, &advisory),
            csaf: advisory.csaf_value(),
        })
    }

    /// Replace the CSAF document of a draft advisory.
    ///
    /// The edit is classified and the version advanced accordingly. Tracking
    /// fields maintained by the engine are never taken from `csaf`.
    pub fn update_advisory(
        &self,
        caller: &Caller,
        id: Uuid,
        revision: &Revision,
        csaf: Value,
        note: &RevisionNote,
    ) -> Result<Revision, Error> {
        let old = self.load(id, revision)?;
        let advisory = &old.advisory;

        if !permissions::can_change(caller, advisory.owner(), advisory.workflow_state()) {
            return Err(AdvisoryError::Forbidden { action: "change this advisory" }.into());
        }

        let now = Utc::now();
        let strategy = advisory.strategy();
        let releases = advisory.releases();

        let edited = advisory.clone()
            .with_csaf(csaf_object(csaf)?)
            .with_managed_tracking_of(advisory);

        let change = classify(&json_patch::diff(&advisory.csaf_value(), &edited.csaf_value()));
        let version = version_after_edit(
            strategy, change, old.version(), advisory.last_major_version())?;

        debug!("Edit of advisory {} classified as {:?}: {} -> {}",
            id, change, old.version(), version);

        let history = advisory.revision_history()?
            .record_edit(releases, old.version(), note.entry(&version, now));

        let new = edited
            .with_tracking_version(&version)
            .with_revision_history(&history)?
            .with_release_date_not_before(now);

        self.commit(caller, &old, &new, now)
    }

    /// Move an advisory to another workflow state.
    pub fn change_workflow_state(
        &self,
        caller: &Caller,
        id: Uuid,
        revision: &Revision,
        to: WorkflowState,
        options: TransitionOptions,
    ) -> Result<Revision, Error> {
        self.change_workflow_state_at(caller, id, revision, to, options, Utc::now(), |_| Ok(()))
    }

    /// Move an advisory to another workflow state at `now`.
    ///
    /// `deliver` receives the new snapshot after every check has passed and
    /// before it is written. An error from it abandons the transition.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn change_workflow_state_at<F>(
        &self,
        caller: &Caller,
        id: Uuid,
        revision: &Revision,
        to: WorkflowState,
        options: TransitionOptions,
        now: DateTime<Utc>,
        deliver: F,
    ) -> Result<Revision, Error>
    where
        F: FnOnce(&Advisory) -> Result<(), Error>,
    {
        let old = self.load(id, revision)?;
        let advisory = &old.advisory;
        let from = advisory.workflow_state();

        let scheduled = options.proposed_release_date.filter(|date| *date > now);
        let to = match (from, to, scheduled) {
            (WorkflowState::RfPublication, WorkflowState::Published, Some(_)) =>
                WorkflowState::AutoPublish,
            _ => to,
        };

        workflow::check_transition(caller, advisory.owner(), from, to)?;

        if to == WorkflowState::RfPublication
        && !self.validator.is_valid(&advisory.csaf_value())? {
            return Err(AdvisoryError::ValidationFailed.into());
        }

        let strategy = advisory.strategy();
        let version = version_for_transition(strategy, to, old.version())?;
        let history = advisory.revision_history()?;

        let new = if to == WorkflowState::Published {
            let status = match options.tracking_status {
                None => TrackingStatus::Final,
                Some(TrackingStatus::Draft) =>
                    return Err(AdvisoryError::InvalidTrackingStatus.into()),
                Some(status) => status,
            };

            let first_release = history.entries().iter()
                .all(|e| !strategy.is_release(&e.number, advisory.last_major_version()));

            let released = advisory.clone()
                .with_release_date_not_before(now);
            let date = released.current_release_date().unwrap_or(now);

            let history = history.collapse_for_release(
                advisory.releases(), &version, date, &self.config.summary.publication);

            let released = if first_release {
                released.with_initial_release_date(date)
            } else {
                released
            };

            released
                .with_last_major_version(strategy.major(&version)?)
                .with_tracking_status(status)
                .with_revision_history(&history)?
        } else {
            let history = history.record_transition(
                advisory.releases(), old.version(), &version, now);

            let new = advisory.clone().with_revision_history(&history)?;

            match scheduled {
                Some(date) if to == WorkflowState::AutoPublish =>
                    new.with_current_release_date(date),
                _ => new.with_release_date_not_before(now),
            }
        };

        let new = new
            .with_workflow_state(to)
            .with_tracking_version(&version);

        deliver(&new)?;

        let revision = self.commit(caller, &old, &new, now)?;

        info!("{} moved advisory {} from {} to {} ({} -> {})",
            caller.name, id, from, to, old.version(), version);

        Ok(revision)
    }

    /// Start a new working version of a published advisory.
    ///
    /// The published advisory is kept as a superseded copy.
    pub fn create_new_version(&self, caller: &Caller, id: Uuid, revision: &Revision)
    -> Result<Revision, Error> {
        let old = self.load(id, revision)?;
        let advisory = &old.advisory;

        if !permissions::can_create_new_version(
            caller, advisory.owner(), advisory.workflow_state())
        {
            return Err(AdvisoryError::Forbidden {
                action: "create a new version of this advisory",
            }.into());
        }

        let now = Utc::now();
        let version = advisory.strategy().new_document_version(old.version())?;
        let history = advisory.revision_history()?.push(RevisionHistoryEntry::new(
            version.as_str(), now, self.config.summary.new_version.as_str()));

        let new = advisory.clone()
            .with_workflow_state(WorkflowState::Draft)
            .with_tracking_version(&version)
            .with_tracking_status(TrackingStatus::Draft)
            .with_revision_history(&history)?
            .with_release_date_not_before(now);

        let backup = advisory.clone().into_superseded_copy(id);
        let revision = self.commit(caller, &old, &new, now)?;
        self.storage.create(Uuid::new_v4(), &backup.to_value()?)?;

        info!("{} opened version {} of advisory {}", caller.name, version, id);

        Ok(revision)
    }

    /// Delete an advisory together with its audit trail, comments and
    /// superseded copies.
    pub fn delete_advisory(&self, caller: &Caller, id: Uuid, revision: &Revision)
    -> Result<(), Error> {
        let old = self.load(id, revision)?;
        let advisory = &old.advisory;

        if !permissions::can_delete(caller, advisory.owner(), advisory.workflow_state()) {
            return Err(AdvisoryError::Forbidden { action: "delete this advisory" }.into());
        }

        self.storage.delete(id, &old.revision)?;

        let records = self.recorder().delete_for(id)?;
        let mut dependents = 0;

        for kind in &[ObjectType::Comment, ObjectType::AdvisoryVersion] {
            for document in self.storage.find(&Selector::of_advisory(*kind, id))? {
                self.storage.delete(document.id, &document.revision)?;
                dependents += 1;
            }
        }

        info!("{} deleted advisory {} ({} audit records, {} dependent documents)",
            caller.name, id, records, dependents);

        Ok(())
    }

    /// CSAF document of an advisory.
    pub fn export_advisory(&self, caller: &Caller, id: Uuid) -> Result<Value, Error> {
        Ok(self.get_advisory(caller, id)?.csaf)
    }

    /// Audit records of an advisory, oldest first.
    pub fn audit_trail(&self, caller: &Caller, id: Uuid) -> Result<Vec<AuditTrail>, Error> {
        if !permissions::can_audit(caller) {
            return Err(AdvisoryError::Forbidden { action: "read audit trails" }.into());
        }

        Ok(self.recorder().trail_for(id)?)
    }

    /// Reconstruct an advisory as it was after its first `changes` content
    /// changes, or as it is now if `changes` is `None`.
    pub fn reconstruct(&self, caller: &Caller, id: Uuid, changes: Option<usize>)
    -> Result<Value, Error> {
        if !permissions::can_audit(caller) {
            return Err(AdvisoryError::Forbidden { action: "read audit trails" }.into());
        }

        let diffs = self.recorder().document_diffs(id)?;

        if diffs.is_empty() {
            return Err(AdvisoryError::NotFound(id).into());
        }

        let take = changes.unwrap_or(diffs.len());
        Ok(audit::reconstruct(diffs.iter().take(take))?)
    }

    /// Verify that `caller` may comment on an advisory (not a superseded
    /// copy) in its current state.
    fn check_commentable(&self, caller: &Caller, advisory_id: Uuid) -> Result<(), Error> {
        let (_, advisory) = self.read(advisory_id)?;

        if advisory.kind() != ObjectType::Advisory {
            return Err(AdvisoryError::Superseded(advisory_id).into());
        }

        if !permissions::can_add_comment(caller, advisory.owner(), advisory.workflow_state()) {
            return Err(AdvisoryError::Forbidden { action: "comment on this advisory" }.into());
        }

        Ok(())
    }

    fn read_comment(&self, id: Uuid) -> Result<Stored, Error> {
        let stored = self.storage.read(id).map_err(|err| match err {
            StorageError::NotFound(id) => Error::from(AdvisoryError::CommentNotFound(id)),
            err => Error::from(err),
        })?;

        if stored.data["type"] != ObjectType::Comment.as_str() {
            return Err(AdvisoryError::CommentNotFound(id).into());
        }

        Ok(stored)
    }

    /// Store a new comment and record its creation.
    fn create_comment(&self, caller: &Caller, comment: &Comment) -> Result<Saved, Error> {
        let id = Uuid::new_v4();
        let value = serde_json::to_value(comment)?;
        let revision = self.storage.create(id, &value)?;

        self.recorder().record_comment_change(
            comment.advisory_id, id, None, &value, &caller.name, comment.created_at)?;

        Ok(Saved { id, revision })
    }

    /// Comment on an advisory, or on a node of its document.
    pub fn add_comment(
        &self,
        caller: &Caller,
        advisory_id: Uuid,
        text: &str,
        field_path: Option<String>,
    ) -> Result<Saved, Error> {
        self.check_commentable(caller, advisory_id)?;

        let comment = Comment::new(
            advisory_id, caller.name.as_str(), text, field_path, Utc::now());
        let saved = self.create_comment(caller, &comment)?;

        debug!("{} commented on advisory {}", caller.name, advisory_id);

        Ok(saved)
    }

    /// Answer a comment.
    ///
    /// Answers always refer to a top-level comment; answering an answer adds
    /// to the thread of the comment it answers.
    pub fn add_answer(&self, caller: &Caller, comment_id: Uuid, text: &str)
    -> Result<Saved, Error> {
        let stored = self.read_comment(comment_id)?;
        let comment: Comment = serde_json::from_value(stored.data)?;

        self.check_commentable(caller, comment.advisory_id)?;

        let thread = comment.answer_to.unwrap_or(comment_id);
        let answer = Comment::answer(
            comment.advisory_id, thread, caller.name.as_str(), text, Utc::now());

        self.create_comment(caller, &answer)
    }

    /// Change the text of a comment or answer.
    ///
    /// Only the author of a comment may change it, and only while they could
    /// still comment on its advisory.
    pub fn update_comment(
        &self,
        caller: &Caller,
        comment_id: Uuid,
        revision: &Revision,
        text: &str,
    ) -> Result<Revision, Error> {
        let stored = self.read_comment(comment_id)?;

        if &stored.revision != revision {
            return Err(StorageError::Conflict(comment_id).into());
        }

        let comment: Comment = serde_json::from_value(stored.data.clone())?;

        if !caller.owns(&comment.owner) {
            return Err(AdvisoryError::Forbidden { action: "change this comment" }.into());
        }

        let advisory_id = comment.advisory_id;
        self.check_commentable(caller, advisory_id)?;

        let value = serde_json::to_value(comment.with_text(text))?;
        let revision = self.storage.write(comment_id, &value, revision)?;

        self.recorder().record_comment_change(
            advisory_id, comment_id, Some(&stored.data), &value, &caller.name, Utc::now())?;

        Ok(revision)
    }

    /// All comments and answers on an advisory, oldest first.
    pub fn list_comments(&self, caller: &Caller, advisory_id: Uuid)
    -> Result<Vec<CommentInfo>, Error> {
        let (_, advisory) = self.read(advisory_id)?;

        if !permissions::can_view_comment(caller, advisory.owner(), advisory.workflow_state()) {
            return Err(AdvisoryError::Forbidden { action: "view comments on this advisory" }
                .into());
        }

        self.storage.find(&Selector::of_advisory(ObjectType::Comment, advisory_id))?
            .into_iter()
            .map(|Stored { id, revision, data }| -> Result<CommentInfo, Error> {
                Ok(CommentInfo {
                    id,
                    revision,
                    comment: serde_json::from_value(data)?,
                })
            })
            .collect()
    }

    /// Advisories awaiting scheduled publication whose release date is not
    /// later than `now`.
    pub fn due_for_publication(&self, now: DateTime<Utc>) -> Result<Vec<Scheduled>, Error> {
        let selector = Selector::And(vec![
            Selector::of_type(ObjectType::Advisory),
            Selector::field_eq("workflowState", WorkflowState::AutoPublish.as_str()),
        ]);

        let mut due = Vec::new();

        for Stored { id, revision, data } in self.storage.find(&selector)? {
            let advisory = Advisory::from_value(data)?;

            if advisory.current_release_date().map_or(true, |date| date <= now) {
                due.push(Scheduled { id, revision, advisory });
            }
        }

        Ok(due)
    }
}

/// Version an advisory gets when it enters `to`.
fn version_for_transition(strategy: &dyn Versioning, to: WorkflowState, current: &str)
-> Result<String, ParseVersionError> {
    match to {
        WorkflowState::Approved => strategy.next_approved_version(current),
        WorkflowState::Draft if strategy.was_approved(current)? =>
            strategy.next_draft_version(current),
        WorkflowState::Published => strategy.remove_version_suffix(current),
        _ => Ok(current.to_string()),
    }
}

/// Major number of the last release of an imported document.
fn imported_last_major(
    strategy: &dyn Versioning,
    version: &str,
    history: &RevisionHistory,
    published: bool,
) -> Result<u64, ParseVersionError> {
    match strategy.versioning_type() {
        VersioningType::Semantic => {
            let current = if published { Some(version) } else { None };
            let mut last = 0;

            for number in history.numbers().into_iter().chain(current) {
                if strategy.is_release(number, 0) {
                    last = last.max(strategy.major(number)?);
                }
            }

            Ok(last)
        }
        VersioningType::Integer => {
            let major = strategy.major(version)?;
            Ok(if published { major } else { major.saturating_sub(1) })
        }
    }
}

#[derive(ApiError, Debug, Fail)]
pub enum AdvisoryError {
    #[api(code = "advisory:not-found", status = "NotFound")]
    #[fail(display = "No such advisory: {}", _0)]
    NotFound(Uuid),
    #[api(code = "comment:not-found", status = "NotFound")]
    #[fail(display = "No such comment: {}", _0)]
    CommentNotFound(Uuid),
    #[api(code = "advisory:superseded", status = "BadRequest")]
    #[fail(display = "{} is a superseded copy and can't be changed", _0)]
    Superseded(Uuid),
    #[api(code = "advisory:forbidden", status = "Forbidden")]
    #[fail(display = "Not allowed to {}", action)]
    Forbidden {
        action: &'static str,
    },
    #[api(code = "advisory:validation-failed", status = "UnprocessableEntity")]
    #[fail(display = "Document did not pass validation")]
    ValidationFailed,
    #[api(code = "advisory:invalid-tracking-status", status = "BadRequest")]
    #[fail(display = "Advisories can only be published as final or interim")]
    InvalidTrackingStatus,
}
