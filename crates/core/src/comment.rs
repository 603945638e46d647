//! Reviewer comments on a discrepancy.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{CommentId, DiscrepancyId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub discrepancy_id: DiscrepancyId,
    pub user_id: Option<UserId>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    /// Build a comment; blank bodies are rejected.
    pub fn new(
        discrepancy_id: DiscrepancyId,
        user_id: Option<UserId>,
        body: impl Into<String>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let body = body.into();
        if body.trim().is_empty() {
            return Err(DomainError::validation("comment body must not be empty"));
        }

        Ok(Self {
            id: CommentId::new(),
            discrepancy_id,
            user_id,
            body,
            created_at: now,
        })
    }
}

impl Entity for Comment {
    type Id = CommentId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
