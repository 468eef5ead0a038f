//! Editorial states of an advisory and who may move it between them.
//!
//! ```text
//! Draft ⇄ Review → Approved → RfPublication → Published
//!   ↑                 │            ⇅
//!   └─────────────────┘        AutoPublish → Published
//! ```
//!
//! `AutoPublish` is only entered when publication is scheduled for a future
//! date; the auto-publish job completes the move to `Published`.

use csaf_cms_macros::ApiError;
use failure::Fail;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::permissions::{Caller, Roles};

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum WorkflowState {
    Draft,
    Review,
    Approved,
    RfPublication,
    Published,
    AutoPublish,
}

impl WorkflowState {
    pub const ALL: [WorkflowState; 6] = [
        WorkflowState::Draft,
        WorkflowState::Review,
        WorkflowState::Approved,
        WorkflowState::RfPublication,
        WorkflowState::Published,
        WorkflowState::AutoPublish,
    ];

    pub fn from_name(name: &str) -> Option<WorkflowState> {
        WorkflowState::ALL.iter()
            .cloned()
            .find(|state| state.as_str().eq_ignore_ascii_case(name))
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowState::Draft => "Draft",
            WorkflowState::Review => "Review",
            WorkflowState::Approved => "Approved",
            WorkflowState::RfPublication => "RfPublication",
            WorkflowState::Published => "Published",
            WorkflowState::AutoPublish => "AutoPublish",
        }
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a grant applies to every advisory or only to the caller's own.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Scope {
    Own,
    Any,
}

/// A role allowed to perform a transition.
#[derive(Clone, Copy, Debug)]
pub struct Grant {
    pub role: Roles,
    pub scope: Scope,
}

const fn own(role: Roles) -> Grant {
    Grant { role, scope: Scope::Own }
}

const fn any(role: Roles) -> Grant {
    Grant { role, scope: Scope::Any }
}

/// A permitted move between two states.
#[derive(Debug)]
pub struct Transition {
    pub from: WorkflowState,
    pub to: WorkflowState,
    pub grants: &'static [Grant],
}

/// Every permitted transition and the roles which may perform it.
pub static TRANSITIONS: &[Transition] = {
    use self::WorkflowState::*;

    &[
        Transition {
            from: Draft,
            to: Review,
            grants: &[own(Roles::AUTHOR), any(Roles::EDITOR), any(Roles::PUBLISHER)],
        },
        Transition { from: Review, to: Draft, grants: &[own(Roles::REVIEWER)] },
        Transition { from: Review, to: Approved, grants: &[own(Roles::REVIEWER)] },
        Transition { from: Approved, to: Draft, grants: &[own(Roles::PUBLISHER)] },
        Transition {
            from: Approved,
            to: RfPublication,
            grants: &[own(Roles::AUTHOR), any(Roles::EDITOR), own(Roles::PUBLISHER)],
        },
        Transition { from: RfPublication, to: Published, grants: &[own(Roles::PUBLISHER)] },
        Transition { from: RfPublication, to: AutoPublish, grants: &[own(Roles::PUBLISHER)] },
        Transition { from: AutoPublish, to: RfPublication, grants: &[own(Roles::PUBLISHER)] },
        Transition { from: AutoPublish, to: Published, grants: &[any(Roles::PUBLISHER)] },
    ]
};

fn find(from: WorkflowState, to: WorkflowState) -> Option<&'static Transition> {
    TRANSITIONS.iter().find(|t| t.from == from && t.to == to)
}

impl Transition {
    /// Is any of the caller's roles granted this transition?
    pub fn permits(&self, caller: &Caller, owner: &str) -> bool {
        self.grants.iter().any(|grant| caller.has(grant.role)
            && (grant.scope == Scope::Any || caller.owns(owner)))
    }
}

/// Verify that `caller` may move an advisory owned by `owner` from `from`
/// to `to`.
pub fn check_transition(
    caller: &Caller,
    owner: &str,
    from: WorkflowState,
    to: WorkflowState,
) -> Result<(), TransitionError> {
    let transition = find(from, to)
        .ok_or(TransitionError::NoSuchTransition { from, to })?;

    if transition.permits(caller, owner) {
        Ok(())
    } else {
        log::trace!("{} ({}) may not move {}'s advisory from {} to {}",
            caller.name, caller.roles, owner, from, to);
        Err(TransitionError::Forbidden { from, to })
    }
}

/// States `caller` may move an advisory owned by `owner` into from `from`.
pub fn allowed_transitions(caller: &Caller, owner: &str, from: WorkflowState)
-> Vec<WorkflowState> {
    TRANSITIONS.iter()
        .filter(|t| t.from == from && t.permits(caller, owner))
        .map(|t| t.to)
        .collect()
}

#[derive(ApiError, Debug, Fail)]
pub enum TransitionError {
    #[api(code = "advisory:transition:invalid", status = "BadRequest")]
    #[fail(display = "Advisories can't move from {} to {}", from, to)]
    NoSuchTransition {
        from: WorkflowState,
        to: WorkflowState,
    },
    #[api(code = "advisory:transition:forbidden", status = "Forbidden")]
    #[fail(display = "Not allowed to move advisory from {} to {}", from, to)]
    Forbidden {
        from: WorkflowState,
        to: WorkflowState,
    },
}
