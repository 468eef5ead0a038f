use csaf_cms_error::Status;
use csaf_cms_models::{
    Caller,
    Revision,
    Roles,
    WorkflowState::{self, *},
    audit::{AuditTrail, ChangeKind},
};
use failure::Fallible;
use uuid::Uuid;

mod common;

use self::common::*;

fn reviewer() -> Caller {
    Caller::new("rita", Roles::REVIEWER)
}

/// An advisory owned by alice, moved into `state`.
fn advisory_in(h: &Harness, state: WorkflowState) -> Fallible<Uuid> {
    let alice = alice();
    let id = h.create(&alice, CSAF.clone())?.id;

    let path: &[WorkflowState] = match state {
        Draft => &[],
        Review => &[Review],
        Approved => &[Review, Approved],
        Published => &[Review, Approved, RfPublication, Published],
        _ => unimplemented!(),
    };

    for state in path {
        h.transition(&alice, id, *state)?;
    }

    Ok(id)
}

#[test]
fn comment_permissions_follow_workflow_state() -> Fallible<()> {
    let h = Harness::new();

    let registered = Caller::new("reggie", Roles::REGISTERED);
    let owner = Caller::new("alice", Roles::AUTHOR);

    // (caller, state, may view comments, may add comments)
    let table = vec![
        (registered.clone(), Draft, false, false),
        (registered, Published, false, false),
        (owner, Draft, true, true),
        (author("bob"), Draft, false, false),
        (editor(), Draft, true, true),
        (editor(), Review, false, false),
        (reviewer(), Review, true, true),
        (reviewer(), Published, false, false),
        (auditor(), Published, false, false),
        (auditor(), Approved, true, false),
    ];

    for (caller, state, view, add) in table {
        let id = advisory_in(&h, state)?;

        let listed = h.service.list_comments(&caller, id);
        assert_eq!(listed.is_ok(), view,
            "{} ({}) listing comments in {}", caller.name, caller.roles, state);
        if !view {
            assert_eq!(listed.unwrap_err().status(), Status::Forbidden);
        }

        let added = h.service.add_comment(&caller, id, "Remark", None);
        assert_eq!(added.is_ok(), add,
            "{} ({}) commenting in {}", caller.name, caller.roles, state);
        if !add {
            assert_eq!(added.unwrap_err().status(), Status::Forbidden);
        }
    }

    Ok(())
}

#[test]
fn comments_can_be_answered() -> Fallible<()> {
    let h = Harness::new();
    let id = advisory_in(&h, Draft)?;

    let comment = h.service.add_comment(
        &alice(), id, "Is the score right?", Some("/vulnerabilities/0".into()))?;
    let answer = h.service.add_answer(&editor(), comment.id, "Yes")?;

    // Answering an answer continues the same thread.
    let again = h.service.add_answer(&alice(), answer.id, "Thanks")?;

    let comments = h.service.list_comments(&alice(), id)?;
    assert_eq!(comments.len(), 3);
    assert_eq!(comments[0].comment.answer_to, None);
    assert_eq!(comments[1].id, answer.id);
    assert_eq!(comments[1].comment.answer_to, Some(comment.id));
    assert_eq!(comments[1].comment.owner, "eddie");
    assert_eq!(comments[1].comment.field_path, None);
    assert_eq!(comments[2].id, again.id);
    assert_eq!(comments[2].comment.answer_to, Some(comment.id));

    // Answers are subject to the same rules as comments.
    let err = h.service.add_answer(&author("bob"), comment.id, "Me too").unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    let err = h.service.add_answer(&editor(), Uuid::new_v4(), "Hello?").unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    // Only comments can be answered.
    let err = h.service.add_answer(&editor(), id, "Hello?").unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    Ok(())
}

#[test]
fn comments_are_edited_by_their_author() -> Fallible<()> {
    let h = Harness::new();
    let id = advisory_in(&h, Draft)?;

    let comment = h.service.add_comment(&alice(), id, "Typo in title", None)?;
    let answer = h.service.add_answer(&editor(), comment.id, "Fixed")?;

    let err = h.service.update_comment(&editor(), comment.id, &comment.revision, "Mine now")
        .unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    let revision = h.service.update_comment(
        &alice(), comment.id, &comment.revision, "Typo in the title")?;
    assert_ne!(revision, comment.revision);

    // Edits use the revision of the comment they are based on.
    let err = h.service.update_comment(&alice(), comment.id, &comment.revision, "Stale")
        .unwrap_err();
    assert_eq!(err.status(), Status::Conflict);

    h.service.update_comment(&editor(), answer.id, &answer.revision, "Fixed in 0.0.1")?;

    let comments = h.service.list_comments(&alice(), id)?;
    assert_eq!(comments[0].comment.text, "Typo in the title");
    assert_eq!(comments[0].revision, revision);
    assert_eq!(comments[1].comment.text, "Fixed in 0.0.1");
    assert_eq!(comments[1].comment.answer_to, Some(comment.id));

    let edits = h.service.audit_trail(&auditor(), id)?
        .into_iter()
        .filter_map(|record| match record {
            AuditTrail::AuditTrailComment(change) => Some(change),
            _ => None,
        })
        .collect::<Vec<_>>();

    let kinds = edits.iter().map(|change| change.change_type).collect::<Vec<_>>();
    assert_eq!(kinds, [ChangeKind::Create, ChangeKind::Create, ChangeKind::Update,
        ChangeKind::Update]);
    assert_eq!(edits[2].comment_id, comment.id);
    assert_eq!(edits[2].user, "alice");
    assert_eq!(edits[3].comment_id, answer.id);

    Ok(())
}

#[test]
fn comments_freeze_once_advisory_moves_on() -> Fallible<()> {
    let h = Harness::new();
    let id = advisory_in(&h, Draft)?;
    let comment = h.service.add_comment(&alice(), id, "Draft remark", None)?;

    h.transition(&alice(), id, Review)?;

    let err = h.service.update_comment(
        &Caller::new("alice", Roles::AUTHOR), comment.id, &comment.revision, "Changed")
        .unwrap_err();
    assert_eq!(err.status(), Status::Forbidden);

    let err = h.service.update_comment(&alice(), Uuid::new_v4(), &Revision::first(), "?")
        .unwrap_err();
    assert_eq!(err.status(), Status::NotFound);

    Ok(())
}
