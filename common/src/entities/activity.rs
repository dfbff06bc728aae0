use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::default_timestamp;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ActivityAction {
    Created,
    Updated,
    StatusChanged,
    Assigned,
}

/// Append-only audit entry. Exactly one is written per issue mutation, in
/// the same transaction as the mutation itself, and they are deleted only
/// when their issue is.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    pub id: ObjectId,
    pub issue_id: ObjectId,
    pub user_id: ObjectId,
    pub action: ActivityAction,
    pub comment: String,
    pub timestamp: i64,
}

impl Activity {
    pub fn new(
        issue_id: ObjectId,
        user_id: ObjectId,
        action: ActivityAction,
        comment: impl Into<String>,
    ) -> Self {
        Self {
            id: ObjectId::new(),
            issue_id,
            user_id,
            action,
            comment: comment.into(),
            timestamp: default_timestamp(),
        }
    }
}
