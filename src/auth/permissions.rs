//! Permission evaluation.
//!
//! [`evaluate`] turns an identity, an action and an optional target content item into a
//! [`PermissionDecision`]. It is a pure function: no I/O, no shared state. The rules form an
//! ordered list and the first rule that matches decides:
//!
//! 1. superuser: allow everything
//! 2. staff: allow everything except superuser-only settings
//! 3. user: allow view and create; allow edit/delete only on content they own
//! 4. anonymous: allow view only
//!
//! Anything no rule matches is denied.
//!
//! Handlers consume the evaluator through [`authorize`], which logs every decision and turns a
//! denial into [`Error::InsufficientPermissions`], or through the [`RequiresPermission`]
//! extractor for actions that have no target.

use std::marker::PhantomData;
use std::ops::Deref;

use axum::{extract::FromRequestParts, http::request::Parts};
use thiserror::Error as ThisError;
use tracing::{debug, info};
use uuid::Uuid;

use crate::{
    AppState,
    api::models::users::CurrentUser,
    auth::ownership,
    errors::Error,
    types::{Action, ContentKind, Role, UserId},
};

pub const AUTHENTICATION_REQUIRED: &str = "authentication required";
pub const NOT_THE_OWNER: &str = "not the owner";
pub const SUPERUSER_ONLY: &str = "superuser only";
pub const STAFF_ONLY: &str = "staff only";
pub const NO_MATCHING_RULE: &str = "no matching rule";

/// Who is asking. Anonymous visitors have no id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Identity {
    pub id: Option<UserId>,
    pub role: Role,
}

impl Identity {
    pub fn anonymous() -> Self {
        Self {
            id: None,
            role: Role::Anonymous,
        }
    }

    pub fn new(id: UserId, role: Role) -> Self {
        Self { id: Some(id), role }
    }
}

impl From<&CurrentUser> for Identity {
    fn from(user: &CurrentUser) -> Self {
        Identity::new(user.id, user.role)
    }
}

/// A piece of user-created content, reduced to what permission checks need.
/// The owner never changes after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContentItem {
    pub id: Uuid,
    pub owner_id: UserId,
    pub kind: ContentKind,
}

/// Outcome of a permission check. Derived, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermissionDecision {
    pub action: Action,
    pub allow: bool,
    pub reason: &'static str,
}

impl PermissionDecision {
    fn allow(action: Action, reason: &'static str) -> Self {
        Self {
            action,
            allow: true,
            reason,
        }
    }

    fn deny(action: Action, reason: &'static str) -> Self {
        Self {
            action,
            allow: false,
            reason,
        }
    }
}

#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum PermissionError {
    /// An ownership-gated action was evaluated without the item it applies to. This is a bug
    /// in the caller and is never resolved by allowing.
    #[error("'{action}' requires a target content item")]
    MissingTarget { action: Action },
}

impl From<PermissionError> for Error {
    fn from(err: PermissionError) -> Self {
        Error::Internal {
            operation: format!("evaluate permission: {err}"),
        }
    }
}

/// A rule returns `None` when it does not apply, letting the next rule decide.
type Rule = fn(&Identity, Action, Option<&ContentItem>) -> Result<Option<PermissionDecision>, PermissionError>;

const RULES: [Rule; 4] = [superuser_rule, staff_rule, user_rule, anonymous_rule];

fn superuser_rule(identity: &Identity, action: Action, _target: Option<&ContentItem>) -> Result<Option<PermissionDecision>, PermissionError> {
    Ok((identity.role == Role::Superuser).then(|| PermissionDecision::allow(action, "superuser")))
}

fn staff_rule(identity: &Identity, action: Action, _target: Option<&ContentItem>) -> Result<Option<PermissionDecision>, PermissionError> {
    if identity.role != Role::Staff {
        return Ok(None);
    }
    let decision = match action {
        Action::ManageSettings => PermissionDecision::deny(action, SUPERUSER_ONLY),
        // Staff moderate any content, so edit and delete ignore ownership
        _ => PermissionDecision::allow(action, "staff"),
    };
    Ok(Some(decision))
}

fn user_rule(identity: &Identity, action: Action, target: Option<&ContentItem>) -> Result<Option<PermissionDecision>, PermissionError> {
    if identity.role != Role::User {
        return Ok(None);
    }
    let decision = match action {
        Action::View | Action::Create(_) => PermissionDecision::allow(action, "registered user"),
        _ if action.is_ownership_gated() => {
            let target = target.ok_or(PermissionError::MissingTarget { action })?;
            if ownership::owns(identity, target) {
                PermissionDecision::allow(action, "owner")
            } else {
                PermissionDecision::deny(action, NOT_THE_OWNER)
            }
        }
        Action::ManageSettings => PermissionDecision::deny(action, SUPERUSER_ONLY),
        _ => PermissionDecision::deny(action, STAFF_ONLY),
    };
    Ok(Some(decision))
}

fn anonymous_rule(identity: &Identity, action: Action, _target: Option<&ContentItem>) -> Result<Option<PermissionDecision>, PermissionError> {
    if identity.role != Role::Anonymous {
        return Ok(None);
    }
    let decision = if action.is_mutation() {
        PermissionDecision::deny(action, AUTHENTICATION_REQUIRED)
    } else {
        PermissionDecision::allow(action, "public read")
    };
    Ok(Some(decision))
}

/// Decide whether `identity` may perform `action` on `target`.
///
/// `target` is required for edit and delete by a regular user; omitting it is an error rather
/// than an implicit allow or deny.
pub fn evaluate(identity: &Identity, action: Action, target: Option<&ContentItem>) -> Result<PermissionDecision, PermissionError> {
    for rule in RULES {
        if let Some(decision) = rule(identity, action, target)? {
            return Ok(decision);
        }
    }
    Ok(PermissionDecision::deny(action, NO_MATCHING_RULE))
}

/// Evaluate and log the decision; a denial becomes a uniform 403.
///
/// `resource` names what is being acted on in the error message ("review", "catalogue").
pub fn authorize(identity: &Identity, action: Action, target: Option<&ContentItem>, resource: &str) -> Result<PermissionDecision, Error> {
    let decision = evaluate(identity, action, target)?;
    log_decision(identity, target, &decision);
    if decision.allow {
        Ok(decision)
    } else {
        Err(Error::InsufficientPermissions {
            action,
            resource: resource.to_string(),
            reason: decision.reason,
        })
    }
}

/// Audit log line for a decision.
pub fn log_decision(identity: &Identity, target: Option<&ContentItem>, decision: &PermissionDecision) {
    let identity_id = identity.id.map(|id| id.to_string()).unwrap_or_else(|| "anonymous".to_string());
    let target_id = target.map(|t| t.id.to_string());
    if decision.allow {
        debug!(
            identity = %identity_id,
            role = %identity.role,
            action = %decision.action,
            target = ?target_id,
            reason = decision.reason,
            "permission granted"
        );
    } else {
        info!(
            identity = %identity_id,
            role = %identity.role,
            action = %decision.action,
            target = ?target_id,
            reason = decision.reason,
            "permission denied"
        );
    }
}

/// Type-level actions for [`RequiresPermission`].
pub mod action {
    use crate::types::Action;

    pub trait ActionMarker {
        const ACTION: Action;
        /// What the action applies to, used in the denial message
        const RESOURCE: &'static str;
    }

    pub struct Moderate;
    pub struct ManageMovies;
    pub struct ManageUsers;
    pub struct ManageSettings;

    impl ActionMarker for Moderate {
        const ACTION: Action = Action::Moderate;
        const RESOURCE: &'static str = "moderation views";
    }

    impl ActionMarker for ManageMovies {
        const ACTION: Action = Action::ManageMovies;
        const RESOURCE: &'static str = "catalogue";
    }

    impl ActionMarker for ManageUsers {
        const ACTION: Action = Action::ManageUsers;
        const RESOURCE: &'static str = "users";
    }

    impl ActionMarker for ManageSettings {
        const ACTION: Action = Action::ManageSettings;
        const RESOURCE: &'static str = "settings";
    }
}

/// Extractor that authenticates the caller and requires the action `A` to be allowed for them.
///
/// Unauthenticated callers are evaluated as anonymous, so they receive the same 403 as any
/// other denied caller.
pub struct RequiresPermission<A: action::ActionMarker> {
    user: CurrentUser,
    _action: PhantomData<A>,
}

impl<A: action::ActionMarker> Deref for RequiresPermission<A> {
    type Target = CurrentUser;

    fn deref(&self) -> &Self::Target {
        &self.user
    }
}

impl<A> FromRequestParts<AppState> for RequiresPermission<A>
where
    A: action::ActionMarker + Send + Sync,
{
    type Rejection = Error;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = match CurrentUser::from_request_parts(parts, state).await {
            Ok(user) => user,
            Err(Error::Unauthenticated { .. }) => {
                // No identity: the anonymous rule denies every action guarded this way
                authorize(&Identity::anonymous(), A::ACTION, None, A::RESOURCE)?;
                return Err(Error::Unauthenticated { message: None });
            }
            Err(e) => return Err(e),
        };
        authorize(&Identity::from(&user), A::ACTION, None, A::RESOURCE)?;
        Ok(Self {
            user,
            _action: PhantomData,
        })
    }
}
