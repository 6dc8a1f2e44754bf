//! Common type definitions and the permission vocabulary.
//!
//! This module defines:
//! - Type aliases for entity IDs (UserId, MovieId, etc.)
//! - [`Role`]: the privilege tier of an identity
//! - [`Action`]: what an identity is trying to do
//! - [`ContentKind`]: the kinds of user-owned content
//!
//! # ID Types
//!
//! All entity IDs are UUIDs wrapped in type aliases:
//!
//! - [`UserId`]: User account identifier
//! - [`MovieId`], [`GenreId`], [`DirectorId`], [`ActorId`]: Catalogue identifiers
//! - [`ReviewId`], [`CommentId`], [`WatchlistEntryId`]: User content identifiers
//!
//! # Roles
//!
//! Roles are totally ordered by privilege, `Anonymous < User < Staff < Superuser`, so
//! `Role` derives `Ord` and comparisons like `role >= Role::Staff` read naturally.
//!
//! # Actions
//!
//! Actions are parsed from their snake_case names (`"view"`, `"create_review"`,
//! `"manage_movies"`, ...). Parsing an unknown name fails; callers that accept action names
//! from the outside treat that failure as a denial.

use serde::{Deserialize, Serialize};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;
use uuid::Uuid;

// Type aliases for IDs
pub type UserId = Uuid;
pub type MovieId = Uuid;
pub type GenreId = Uuid;
pub type DirectorId = Uuid;
pub type ActorId = Uuid;
pub type ReviewId = Uuid;
pub type CommentId = Uuid;
pub type WatchlistEntryId = Uuid;

/// Abbreviate a UUID to its first 8 characters for more readable logs and traces
/// Example: "550e8400-e29b-41d4-a716-446655440000" -> "550e8400"
pub fn abbrev_uuid(uuid: &Uuid) -> String {
    uuid.to_string().chars().take(8).collect()
}

// Common types for path parameters
#[derive(Debug, Clone, Deserialize)]
pub enum CurrentKeyword {
    #[serde(rename = "current")]
    Current,
}

/// Allows routes like /users/current and /users/{user_id} to hit the same handler.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum UserIdOrCurrent {
    Current(CurrentKeyword),
    Id(UserId),
}

/// Privilege tier of an identity. Declaration order is privilege order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type, ToSchema)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    /// Not authenticated. Never stored.
    Anonymous,
    User,
    Staff,
    Superuser,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Anonymous => write!(f, "anonymous"),
            Role::User => write!(f, "user"),
            Role::Staff => write!(f, "staff"),
            Role::Superuser => write!(f, "superuser"),
        }
    }
}

/// Kinds of content that belong to the user who created them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ContentKind {
    Review,
    Comment,
    WatchlistEntry,
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContentKind::Review => write!(f, "review"),
            ContentKind::Comment => write!(f, "comment"),
            ContentKind::WatchlistEntry => write!(f, "watchlist entry"),
        }
    }
}

/// Something an identity wants to do.
///
/// `Edit` and `Delete` act on an existing content item and are the only ownership-gated
/// actions. `Create` names the kind of content being created since there is no item yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, SerializeDisplay, DeserializeFromStr)]
pub enum Action {
    /// Read-only access (browse movies, read reviews)
    View,
    /// Create a review, comment or watchlist entry
    Create(ContentKind),
    /// Edit an existing content item
    Edit,
    /// Delete an existing content item
    Delete,
    /// Access moderation views (dashboard, review queue)
    Moderate,
    /// Create, update and delete catalogue entries (movies, genres, people)
    ManageMovies,
    /// Administer user accounts
    ManageUsers,
    /// Superuser-only settings such as role assignment
    ManageSettings,
}

impl Action {
    /// Every known action, in declaration order.
    pub const ALL: [Action; 10] = [
        Action::View,
        Action::Create(ContentKind::Review),
        Action::Create(ContentKind::Comment),
        Action::Create(ContentKind::WatchlistEntry),
        Action::Edit,
        Action::Delete,
        Action::Moderate,
        Action::ManageMovies,
        Action::ManageUsers,
        Action::ManageSettings,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Action::View => "view",
            Action::Create(ContentKind::Review) => "create_review",
            Action::Create(ContentKind::Comment) => "create_comment",
            Action::Create(ContentKind::WatchlistEntry) => "create_watchlist_entry",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Moderate => "moderate",
            Action::ManageMovies => "manage_movies",
            Action::ManageUsers => "manage_users",
            Action::ManageSettings => "manage_settings",
        }
    }

    /// Anything other than viewing changes state.
    pub fn is_mutation(&self) -> bool {
        !matches!(self, Action::View)
    }

    /// Actions whose outcome for a regular user depends on who owns the target.
    pub fn is_ownership_gated(&self) -> bool {
        matches!(self, Action::Edit | Action::Delete)
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown action '{0}'")]
pub struct UnknownAction(pub String);

impl FromStr for Action {
    type Err = UnknownAction;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Action::ALL
            .into_iter()
            .find(|action| action.name() == s)
            .ok_or_else(|| UnknownAction(s.to_string()))
    }
}
