//! Models for asking the permission evaluator about the caller.

use crate::types::ContentKind;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize, IntoParams, ToSchema)]
pub struct PermissionCheckQuery {
    /// Action name, e.g. `view`, `create_review`, `edit`, `delete`, `moderate`
    pub action: String,
    /// Kind of the content item the action targets
    pub content_kind: Option<ContentKind>,
    /// Id of the content item the action targets
    #[param(value_type = Option<String>, format = "uuid")]
    pub content_id: Option<Uuid>,
}

/// The decision, without its reason.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PermissionCheckResponse {
    pub action: String,
    pub allowed: bool,
}
