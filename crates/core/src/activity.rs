//! Append-only project audit trail.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::id::{ActivityId, ProjectId, UserId};

/// Closed set of audit entry kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    ComparisonRun,
    DiscrepancyUpdated,
    CommentAdded,
}

impl ActivityType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityType::ComparisonRun => "comparison_run",
            ActivityType::DiscrepancyUpdated => "discrepancy_updated",
            ActivityType::CommentAdded => "comment_added",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "comparison_run" => Some(ActivityType::ComparisonRun),
            "discrepancy_updated" => Some(ActivityType::DiscrepancyUpdated),
            "comment_added" => Some(ActivityType::CommentAdded),
            _ => None,
        }
    }
}

/// One audit record. Written once, never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Activity {
    pub id: ActivityId,
    pub project_id: ProjectId,
    pub user_id: Option<UserId>,
    #[serde(rename = "type")]
    pub kind: ActivityType,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl Activity {
    pub fn new(
        project_id: ProjectId,
        user_id: Option<UserId>,
        kind: ActivityType,
        description: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ActivityId::new(),
            project_id,
            user_id,
            kind,
            description: description.into(),
            created_at: now,
        }
    }
}

impl Entity for Activity {
    type Id = ActivityId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_tags_round_trip() {
        for kind in [
            ActivityType::ComparisonRun,
            ActivityType::DiscrepancyUpdated,
            ActivityType::CommentAdded,
        ] {
            assert_eq!(ActivityType::parse(kind.as_str()), Some(kind));
            let json = serde_json::to_value(kind).unwrap();
            assert_eq!(json, kind.as_str());
        }
        assert_eq!(ActivityType::parse("login"), None);
    }
}
