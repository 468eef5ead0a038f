use csaf_cms_error::Status;
use csaf_cms_models::{
    WorkflowState::*,
    audit::{AuditTrail, ChangeKind},
};
use failure::Fallible;

mod common;

use self::common::*;

#[test]
fn every_mutation_is_recorded() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();

    let id = h.create(&alice, CSAF.clone())?.id;
    h.update(&alice, id, retitled("Title2"), "Edit")?;
    h.transition(&alice, id, Review)?;

    let trail = h.service.audit_trail(&auditor(), id)?;
    assert_eq!(trail.len(), 4);

    match &trail[0] {
        AuditTrail::AuditTrailDocument(change) => {
            assert_eq!(change.change_type, ChangeKind::Create);
            assert_eq!(change.old_doc_version, None);
            assert_eq!(change.doc_version.as_ref().map(String::as_str), Some("0.0.1"));
            assert_eq!(change.user, "alice");
        }
        other => panic!("unexpected record {:?}", other),
    }

    match &trail[1] {
        AuditTrail::AuditTrailDocument(change) =>
            assert_eq!(change.change_type, ChangeKind::Update),
        other => panic!("unexpected record {:?}", other),
    }

    match &trail[3] {
        AuditTrail::AuditTrailWorkflow(change) => {
            assert_eq!(change.old_state, Draft);
            assert_eq!(change.new_state, Review);
        }
        other => panic!("unexpected record {:?}", other),
    }

    Ok(())
}

#[test]
fn replaying_all_diffs_reproduces_stored_advisory() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();

    let id = h.create(&alice, CSAF.clone())?.id;
    let created = h.stored(id)?;

    h.update(&alice, id, retitled("Title2"), "Edit")?;
    h.publish(&alice, id)?;
    h.new_version(&alice, id)?;
    h.update(&alice, id, with_vulnerability(&retitled("Title2"), "CVE-2022-0009"), "Vuln")?;

    let auditor = auditor();
    assert_eq!(h.service.reconstruct(&auditor, id, None)?, h.stored(id)?);
    assert_eq!(h.service.reconstruct(&auditor, id, Some(1))?, created);

    Ok(())
}

#[test]
fn audit_trail_requires_auditor() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    let err = h.service.audit_trail(&alice, id).unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    let err = h.service.reconstruct(&alice, id, None).unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    assert_eq!(h.service.audit_trail(&manager(), id)?.len(), 1);

    Ok(())
}

#[test]
fn comments_are_audited() -> Fallible<()> {
    let h = Harness::new();
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    h.service.add_comment(&alice, id, "Check the title", Some("/document/title".into()))?;

    let comments = h.service.list_comments(&alice, id)?;
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].comment.text, "Check the title");
    assert_eq!(comments[0].comment.owner, "alice");

    let trail = h.service.audit_trail(&auditor(), id)?;
    match trail.last() {
        Some(AuditTrail::AuditTrailComment(change)) =>
            assert_eq!(change.comment_id, comments[0].id),
        other => panic!("unexpected record {:?}", other),
    }

    Ok(())
}
