//! Ownership resolution for user-created content.
//!
//! Ownership is a plain equality check between the requesting identity and the stored owner
//! id. It takes data, not storage handles, so the evaluator can be tested with synthetic items.

use uuid::Uuid;

use crate::{
    auth::permissions::{ContentItem, Identity},
    types::{ContentKind, UserId},
};

/// True if `identity` created `target`. Anonymous identities own nothing.
pub fn owns(identity: &Identity, target: &ContentItem) -> bool {
    identity.id.is_some_and(|id| id == target.owner_id)
}

/// Stored content that can be reduced to a [`ContentItem`] for permission checks.
pub trait OwnedResource {
    const KIND: ContentKind;

    fn resource_id(&self) -> Uuid;

    fn owner_id(&self) -> UserId;

    fn content_item(&self) -> ContentItem {
        ContentItem {
            id: self.resource_id(),
            owner_id: self.owner_id(),
            kind: Self::KIND,
        }
    }
}
