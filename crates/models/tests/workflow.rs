//! Tests walking advisories through their whole editorial lifecycle.

use csaf_cms_error::Status;
use csaf_cms_models::{Caller, Roles, TransitionOptions, TrackingStatus, WorkflowState::*};
use failure::Fallible;

mod common;

use self::common::*;

#[test]
fn semantic_lifecycle() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();

    let id = h.create(&alice, CSAF.clone())?.id;
    assert_eq!(h.version(id)?, "0.0.1");
    assert_eq!(h.history_numbers(id)?, ["0.0.1"]);
    assert_eq!(h.stored(id)?["csaf"]["document"]["tracking"]["status"], "draft");

    // Patch-level edits before the first release don't change the version.
    h.update(&alice, id, retitled("Title2"), "Better title")?;
    assert_eq!(h.version(id)?, "0.0.1");
    assert_eq!(h.history_numbers(id)?, ["0.0.1"]);
    assert_eq!(h.stored(id)?["csaf"]["document"]["tracking"]["revision_history"][0]["summary"],
        "Better title");

    h.transition(&alice, id, Review)?;
    assert_eq!(h.version(id)?, "0.0.1");
    h.transition(&alice, id, Approved)?;
    assert_eq!(h.version(id)?, "1.0.0-1.0");
    assert_eq!(h.history_numbers(id)?, ["0.0.1", "1.0.0-1.0"]);

    h.transition(&alice, id, RfPublication)?;
    h.transition(&alice, id, Published)?;
    assert_eq!(h.version(id)?, "1.0.0");
    assert_eq!(h.history_numbers(id)?, ["1.0.0"]);

    let stored = h.stored(id)?;
    assert_eq!(stored["lastMajorVersion"], 1);
    assert_eq!(stored["csaf"]["document"]["tracking"]["status"], "final");
    assert_eq!(stored["csaf"]["document"]["tracking"]["revision_history"][0]["summary"],
        "Better title");
    assert_eq!(stored["csaf"]["document"]["tracking"]["initial_release_date"],
        stored["csaf"]["document"]["tracking"]["current_release_date"]);

    h.new_version(&alice, id)?;
    assert_eq!(h.version(id)?, "1.0.1-1.0");
    assert_eq!(h.history_numbers(id)?, ["1.0.0", "1.0.1-1.0"]);
    assert_eq!(h.state(id)?, "Draft");
    assert_eq!(h.stored(id)?["csaf"]["document"]["tracking"]["status"], "draft");

    // The first major change after a release bumps the major number, the
    // next one only the edit counter.
    let csaf = with_vulnerability(&retitled("Title2"), "CVE-2022-0002");
    h.update(&alice, id, csaf.clone(), "New vulnerability")?;
    assert_eq!(h.version(id)?, "2.0.0-1.1");
    assert_eq!(h.history_numbers(id)?, ["1.0.0", "2.0.0-1.1"]);

    h.update(&alice, id, with_vulnerability(&csaf, "CVE-2022-0003"), "Another one")?;
    assert_eq!(h.version(id)?, "2.0.0-1.2");
    assert_eq!(h.history_numbers(id)?, ["1.0.0", "2.0.0-1.2"]);

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;
    assert_eq!(h.version(id)?, "2.0.0-2.0");
    assert_eq!(h.history_numbers(id)?, ["1.0.0", "2.0.0-2.0"]);

    h.transition(&alice, id, RfPublication)?;
    h.transition(&alice, id, Published)?;
    assert_eq!(h.version(id)?, "2.0.0");
    assert_eq!(h.history_numbers(id)?, ["1.0.0", "2.0.0"]);
    assert_eq!(h.stored(id)?["lastMajorVersion"], 2);

    Ok(())
}

#[test]
fn integer_lifecycle() -> Fallible<()> {
    let h = Harness::integer();
    let alice = alice();

    let id = h.create(&alice, CSAF.clone())?.id;
    assert_eq!(h.version(id)?, "0");
    assert_eq!(h.stored(id)?["versioningType"], "Integer");

    h.update(&alice, id, with_vulnerability(&CSAF, "CVE-2022-0002"), "Edit")?;
    assert_eq!(h.version(id)?, "0");
    assert_eq!(h.history_numbers(id)?, ["0"]);

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;
    assert_eq!(h.version(id)?, "1");
    assert_eq!(h.history_numbers(id)?, ["0", "1"]);

    h.transition(&alice, id, RfPublication)?;
    h.transition(&alice, id, Published)?;
    assert_eq!(h.version(id)?, "1");
    assert_eq!(h.history_numbers(id)?, ["1"]);
    assert_eq!(h.stored(id)?["lastMajorVersion"], 1);

    h.new_version(&alice, id)?;
    assert_eq!(h.version(id)?, "2");
    assert_eq!(h.history_numbers(id)?, ["1", "2"]);

    h.update(&alice, id, retitled("Other"), "Edit")?;
    assert_eq!(h.version(id)?, "2");
    assert_eq!(h.history_numbers(id)?, ["1", "2"]);

    h.publish(&alice, id)?;
    assert_eq!(h.version(id)?, "2");
    assert_eq!(h.history_numbers(id)?, ["1", "2"]);
    assert_eq!(h.stored(id)?["lastMajorVersion"], 2);

    Ok(())
}

#[test]
fn returning_to_draft_after_approval_bumps_edit_counter() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    // Before any approval the version stays.
    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Draft)?;
    assert_eq!(h.version(id)?, "0.0.1");

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;
    h.transition(&alice, id, Draft)?;
    assert_eq!(h.version(id)?, "1.0.0-1.1");
    assert_eq!(h.history_numbers(id)?, ["0.0.1", "1.0.0-1.0", "1.0.0-1.1"]);

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;
    assert_eq!(h.version(id)?, "1.0.0-2.0");

    Ok(())
}

#[test]
fn interim_publication() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;
    h.transition(&alice, id, RfPublication)?;
    h.transition_with(&alice, id, Published, TransitionOptions {
        proposed_release_date: None,
        tracking_status: Some(TrackingStatus::Interim),
    })?;

    assert_eq!(h.stored(id)?["csaf"]["document"]["tracking"]["status"], "interim");

    Ok(())
}

#[test]
fn authors_only_move_their_own_drafts() -> Fallible<()> {
    let h = Harness::new();
    let id = h.create(&author("bob"), CSAF.clone())?.id;
    let revision = h.revision(id)?;

    let err = h.service.change_workflow_state(
        &author("carol"), id, &revision, Review, TransitionOptions::default())
        .unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);
    assert_eq!(h.state(id)?, "Draft");

    h.transition(&editor(), id, Review)?;
    assert_eq!(h.state(id)?, "Review");

    Ok(())
}

#[test]
fn undefined_transitions_are_rejected() -> Fallible<()> {
    let h = Harness::new();
    let id = h.create(&alice(), CSAF.clone())?.id;
    let revision = h.revision(id)?;
    let everyone = Caller::new("alice", Roles::all());

    let err = h.service.change_workflow_state(
        &everyone, id, &revision, Published, TransitionOptions::default())
        .unwrap_err();
    assert_eq!(err.status(), Status::BadRequest);
    assert_eq!(err.code().as_ref().map(AsRef::as_ref), Some("advisory:transition:invalid"));

    Ok(())
}

#[test]
fn failed_validation_blocks_request_for_publication() -> Fallible<()> {
    let h = Harness::with(Default::default(), std::sync::Arc::new(RejectAll));
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    h.transition(&alice, id, Review)?;
    h.transition(&alice, id, Approved)?;

    let revision = h.revision(id)?;
    let err = h.service.change_workflow_state(
        &alice, id, &revision, RfPublication, TransitionOptions::default())
        .unwrap_err();
    assert_eq!(err.status(), Status::UnprocessableEntity);
    assert_eq!(h.state(id)?, "Approved");
    assert_eq!(h.revision(id)?, revision);

    Ok(())
}

#[test]
fn content_changes_only_in_draft() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;
    h.transition(&alice, id, Review)?;

    let revision = h.revision(id)?;
    let err = h.service.update_advisory(
        &alice, id, &revision, retitled("Late"), &Default::default())
        .unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    Ok(())
}

#[test]
fn new_versions_only_of_published_advisories() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    let revision = h.revision(id)?;
    let err = h.service.create_new_version(&alice, id, &revision).unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    Ok(())
}
