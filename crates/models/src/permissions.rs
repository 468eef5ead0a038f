//! Roles of callers and the rules for what they may see and change.
//!
//! Callers arrive already authenticated: the engine trusts the user name and
//! role set it is given. Every check in this module is evaluated as a logical
//! OR over all roles the caller holds.

use bitflags::bitflags;
use csaf_cms_error::{ApiError, Status};
use failure::Fail;
use serde::{de, ser::{self, SerializeSeq}};
use std::{borrow::Cow, fmt};

use crate::workflow::WorkflowState;

bitflags! {
    /// Roles a caller can hold.
    pub struct Roles: i32 {
        /// Any authenticated user.
        const REGISTERED = 0x0001;
        /// Writes advisories and moves their own drafts through review.
        const AUTHOR = 0x0002;
        /// Edits and moves any advisory regardless of ownership.
        const EDITOR = 0x0004;
        /// Reviews and approves advisories.
        const REVIEWER = 0x0008;
        /// Publishes approved advisories.
        const PUBLISHER = 0x0010;
        /// Sees everything and may delete any advisory.
        const MANAGER = 0x0020;
        /// Reads audit trails and superseded versions.
        const AUDITOR = 0x0040;
        /// Administers the system.
        const ADMINISTRATOR = 0x0080;
    }
}

/// All roles, paired with their names.
const NAMES: &[(Roles, &str)] = &[
    (Roles::REGISTERED, "registered"),
    (Roles::AUTHOR, "author"),
    (Roles::EDITOR, "editor"),
    (Roles::REVIEWER, "reviewer"),
    (Roles::PUBLISHER, "publisher"),
    (Roles::MANAGER, "manager"),
    (Roles::AUDITOR, "auditor"),
    (Roles::ADMINISTRATOR, "administrator"),
];

impl Roles {
    pub fn from_name(name: &str) -> Option<Roles> {
        NAMES.iter()
            .find(|(_, n)| n.eq_ignore_ascii_case(name))
            .map(|(role, _)| *role)
    }

    /// Parse a comma separated list of role names.
    pub fn parse_list(list: &str) -> Result<Roles, UnknownRoleError> {
        list.split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .try_fold(Roles::empty(), |roles, name| {
                Roles::from_name(name)
                    .map(|role| roles | role)
                    .ok_or_else(|| UnknownRoleError(name.to_string()))
            })
    }

    /// Names of all roles in this set.
    pub fn names(self) -> impl Iterator<Item = &'static str> {
        NAMES.iter()
            .filter(move |(role, _)| self.contains(*role))
            .map(|(_, name)| *name)
    }

    /// Verify that at least one of `roles` is held.
    pub fn require_any(self, roles: Roles) -> Result<(), RequireRoleError> {
        if self.intersects(roles) {
            Ok(())
        } else {
            log::trace!("Missing any of roles: {:?}", roles);
            Err(RequireRoleError(roles))
        }
    }
}

impl fmt::Display for Roles {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let names = self.names().collect::<Vec<_>>();
        f.write_str(&names.join(","))
    }
}

#[derive(Debug, Fail)]
#[fail(display = "Unknown role: {}", _0)]
pub struct UnknownRoleError(pub String);

#[derive(Debug, Fail)]
#[fail(display = "One of these roles is required: {}", _0)]
pub struct RequireRoleError(Roles);

impl ApiError for RequireRoleError {
    fn status(&self) -> Status { Status::Forbidden }

    fn code(&self) -> Option<Cow<str>> {
        Some(Cow::Borrowed("user:insufficient-roles"))
    }
}

impl ser::Serialize for Roles {
    fn serialize<S>(&self, ser: S) -> Result<S::Ok, S::Error>
    where
        S: ser::Serializer,
    {
        let mut seq = ser.serialize_seq(Some(self.bits().count_ones() as usize))?;
        for name in self.names() {
            seq.serialize_element(name)?;
        }
        seq.end()
    }
}

impl<'de> de::Deserialize<'de> for Roles {
    fn deserialize<D>(de: D) -> Result<Self, D::Error>
    where
        D: de::Deserializer<'de>,
    {
        de.deserialize_any(RolesVisitor)
    }
}

struct RolesVisitor;

impl<'de> de::Visitor<'de> for RolesVisitor {
    type Value = Roles;

    fn expecting(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        write!(fmt, "a role name or a list of role names")
    }

    fn visit_str<E>(self, v: &str) -> Result<Roles, E>
    where
        E: de::Error,
    {
        Roles::parse_list(v)
            .map_err(|_| E::invalid_value(de::Unexpected::Str(v), &"a role name"))
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Roles, A::Error>
    where
        A: de::SeqAccess<'de>,
    {
        let mut roles = Roles::empty();

        while let Some(name) = seq.next_element::<String>()? {
            roles |= Roles::from_name(&name).ok_or_else(|| {
                <A::Error as de::Error>::invalid_value(
                    de::Unexpected::Str(&name), &"a role name")
            })?;
        }

        Ok(roles)
    }
}

/// Identity on whose behalf an operation is performed.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Caller {
    pub name: String,
    pub roles: Roles,
}

impl Caller {
    pub fn new<N: Into<String>>(name: N, roles: Roles) -> Caller {
        Caller { name: name.into(), roles }
    }

    /// Identity of a background task.
    pub fn service_account(name: &str, roles: Roles) -> Caller {
        Caller::new(format!("service-account: {}", name), roles)
    }

    pub fn has(&self, role: Roles) -> bool {
        self.roles.intersects(role)
    }

    pub fn owns(&self, owner: &str) -> bool {
        self.name == owner
    }
}

/// Can `caller` see an advisory owned by `owner` in `state`?
///
/// `released` tells whether the advisory's current release date has passed.
/// A published advisory becomes public to every authenticated user only
/// then; before that only those involved in publishing it can see it.
pub fn can_view(caller: &Caller, owner: &str, state: WorkflowState, released: bool) -> bool {
    use crate::workflow::WorkflowState::*;

    let own = caller.owns(owner);

    (state == Published && released)
    || caller.has(Roles::MANAGER | Roles::EDITOR)
    || (caller.has(Roles::AUTHOR) && own && match state {
        Draft | Approved | RfPublication | Published => true,
        _ => false,
    })
    || (caller.has(Roles::REVIEWER | Roles::AUDITOR) && match state {
        Draft | Review | Approved => true,
        _ => false,
    })
    || (caller.has(Roles::PUBLISHER) && match state {
        Approved | RfPublication | AutoPublish | Published => true,
        _ => false,
    })
}

/// Can `caller` read comments on an advisory owned by `owner` in `state`?
///
/// Comments belong to the editorial process and are never shown on
/// published advisories, except to managers.
pub fn can_view_comment(caller: &Caller, owner: &str, state: WorkflowState) -> bool {
    use crate::workflow::WorkflowState::*;

    caller.has(Roles::MANAGER)
    || (state == Draft
        && (caller.has(Roles::EDITOR) || (caller.has(Roles::AUTHOR) && caller.owns(owner))))
    || (caller.has(Roles::REVIEWER | Roles::AUDITOR) && match state {
        Draft | Review | Approved => true,
        _ => false,
    })
    || (caller.has(Roles::PUBLISHER) && match state {
        Approved | RfPublication => true,
        _ => false,
    })
}

/// Can `caller` comment on, or answer comments on, an advisory owned by
/// `owner` in `state`?
pub fn can_add_comment(caller: &Caller, owner: &str, state: WorkflowState) -> bool {
    match state {
        WorkflowState::Draft =>
            caller.has(Roles::EDITOR) || (caller.has(Roles::AUTHOR) && caller.owns(owner)),
        WorkflowState::Review => caller.has(Roles::REVIEWER),
        _ => false,
    }
}

/// Can `caller` see superseded versions kept when new versions are created?
pub fn can_view_superseded(caller: &Caller) -> bool {
    caller.has(Roles::AUDITOR | Roles::MANAGER)
}

/// Can `caller` create new advisories?
pub fn can_create(caller: &Caller) -> bool {
    caller.has(Roles::AUTHOR | Roles::EDITOR)
}

/// Can `caller` change the content of an advisory owned by `owner`?
pub fn can_change(caller: &Caller, owner: &str, state: WorkflowState) -> bool {
    state == WorkflowState::Draft
    && (caller.has(Roles::EDITOR) || (caller.has(Roles::AUTHOR) && caller.owns(owner)))
}

/// Can `caller` delete an advisory owned by `owner`?
pub fn can_delete(caller: &Caller, owner: &str, state: WorkflowState) -> bool {
    caller.has(Roles::MANAGER) || can_change(caller, owner, state)
}

/// Can `caller` start a new working version of a published advisory?
pub fn can_create_new_version(caller: &Caller, owner: &str, state: WorkflowState) -> bool {
    state == WorkflowState::Published
    && (caller.has(Roles::EDITOR | Roles::MANAGER)
        || (caller.has(Roles::AUTHOR) && caller.owns(owner)))
}

/// Can `caller` read audit trails?
pub fn can_audit(caller: &Caller) -> bool {
    caller.has(Roles::AUDITOR | Roles::MANAGER)
}
