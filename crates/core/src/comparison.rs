//! Comparisons: one design-vs-website analysis run.

use core::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::entity::Entity;
use crate::error::{DomainError, DomainResult};
use crate::id::{ComparisonId, ProjectId};

/// Comparison lifecycle.
///
/// Status only moves forward: `pending → processing → completed`
/// (`pending → completed` is allowed for runs that finish synchronously).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComparisonStatus {
    Pending,
    Processing,
    Completed,
}

impl ComparisonStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComparisonStatus::Pending => "pending",
            ComparisonStatus::Processing => "processing",
            ComparisonStatus::Completed => "completed",
        }
    }

    fn rank(&self) -> u8 {
        match self {
            ComparisonStatus::Pending => 0,
            ComparisonStatus::Processing => 1,
            ComparisonStatus::Completed => 2,
        }
    }
}

impl FromStr for ComparisonStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(ComparisonStatus::Pending),
            "processing" => Ok(ComparisonStatus::Processing),
            "completed" => Ok(ComparisonStatus::Completed),
            _ => Err(DomainError::validation(
                "status must be one of: pending, processing, completed",
            )),
        }
    }
}

/// A comparison record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comparison {
    pub id: ComparisonId,
    pub project_id: ProjectId,
    pub name: String,
    pub description: String,
    pub design_image: String,
    pub website_image: String,
    pub status: ComparisonStatus,
    /// Set when the discrepancy set came from the static fallback library
    /// instead of an AI provider. UIs must flag these results.
    pub used_fallback: bool,
    pub created_at: DateTime<Utc>,
    pub last_compared_at: Option<DateTime<Utc>>,
}

impl Comparison {
    pub fn new(
        project_id: ProjectId,
        name: impl Into<String>,
        description: impl Into<String>,
        design_image: impl Into<String>,
        website_image: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: ComparisonId::new(),
            project_id,
            name: name.into(),
            description: description.into(),
            design_image: design_image.into(),
            website_image: website_image.into(),
            status: ComparisonStatus::Pending,
            used_fallback: false,
            created_at: now,
            last_compared_at: None,
        }
    }

    /// Move the lifecycle forward. Re-entering the current status is a no-op.
    pub fn transition_to(&mut self, next: ComparisonStatus) -> DomainResult<()> {
        if next.rank() < self.status.rank() {
            return Err(DomainError::invalid_transition(
                self.status.as_str(),
                next.as_str(),
            ));
        }
        self.status = next;
        Ok(())
    }

    /// `pending` moves to `processing`; later statuses are kept.
    pub fn start_processing(&mut self) {
        if self.status == ComparisonStatus::Pending {
            self.status = ComparisonStatus::Processing;
        }
    }

    /// Completion is reachable from every status, so this cannot fail.
    pub fn complete(&mut self) {
        self.status = ComparisonStatus::Completed;
    }

    pub fn mark_compared(&mut self, now: DateTime<Utc>) {
        self.last_compared_at = Some(now);
    }

    pub fn is_completed(&self) -> bool {
        self.status == ComparisonStatus::Completed
    }
}

impl Entity for Comparison {
    type Id = ComparisonId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
