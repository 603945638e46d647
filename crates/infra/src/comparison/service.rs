//! Reviewer-side discrepancy management with an audit trail.

use chrono::Utc;
use thiserror::Error;
use tracing::info;

use designdiff_core::{
    Activity, ActivityType, Comment, Discrepancy, DiscrepancyId, DiscrepancyUpdate, DomainError,
    ProjectId, UserId,
};

use crate::store::{ComparisonStore, StoreError};

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("invalid request: {0}")]
    Invalid(#[from] DomainError),

    #[error("persistence failed: {0}")]
    Persistence(StoreError),
}

impl From<StoreError> for ServiceError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => ServiceError::NotFound { entity, id },
            StoreError::Domain(e) => ServiceError::Invalid(e),
            other => ServiceError::Persistence(other),
        }
    }
}

/// Updates and comments on discrepancies; each write leaves an [`Activity`].
pub struct DiscrepancyService<S> {
    store: S,
}

impl<S> DiscrepancyService<S>
where
    S: ComparisonStore,
{
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn update(
        &self,
        id: DiscrepancyId,
        update: DiscrepancyUpdate,
        user_id: Option<UserId>,
    ) -> Result<Discrepancy, ServiceError> {
        if update.is_empty() {
            return Err(DomainError::validation("update contains no fields").into());
        }

        let (_, project_id) = self.load_with_project(id).await?;
        let updated = self.store.update_discrepancy(id, &update).await?;

        let activity = Activity::new(
            project_id,
            user_id,
            ActivityType::DiscrepancyUpdated,
            format!("Discrepancy \"{}\" updated: {}", updated.title, describe_update(&update)),
            Utc::now(),
        );
        self.store.create_activity(activity).await?;

        info!(discrepancy_id = %id, status = updated.status.as_str(), "discrepancy updated");
        Ok(updated)
    }

    pub async fn add_comment(
        &self,
        discrepancy_id: DiscrepancyId,
        user_id: Option<UserId>,
        body: &str,
    ) -> Result<Comment, ServiceError> {
        let comment = Comment::new(discrepancy_id, user_id, body.trim(), Utc::now())?;
        let (discrepancy, project_id) = self.load_with_project(discrepancy_id).await?;
        let comment = self.store.create_comment(comment).await?;

        let activity = Activity::new(
            project_id,
            user_id,
            ActivityType::CommentAdded,
            format!("Comment added on discrepancy \"{}\"", discrepancy.title),
            Utc::now(),
        );
        self.store.create_activity(activity).await?;

        Ok(comment)
    }

    pub async fn comments(&self, discrepancy_id: DiscrepancyId) -> Result<Vec<Comment>, ServiceError> {
        Ok(self.store.list_comments(discrepancy_id).await?)
    }

    /// The discrepancy and the project its comparison belongs to.
    async fn load_with_project(
        &self,
        id: DiscrepancyId,
    ) -> Result<(Discrepancy, ProjectId), ServiceError> {
        let discrepancy = self
            .store
            .get_discrepancy(id)
            .await?
            .ok_or_else(|| StoreError::not_found("discrepancy", id))?;
        let comparison = self
            .store
            .get_comparison(discrepancy.comparison_id)
            .await?
            .ok_or_else(|| StoreError::not_found("comparison", discrepancy.comparison_id))?;
        Ok((discrepancy, comparison.project_id))
    }
}

fn describe_update(update: &DiscrepancyUpdate) -> String {
    let mut parts = Vec::new();
    if let Some(status) = update.status {
        parts.push(format!("status set to {}", status.as_str()));
    }
    if let Some(priority) = update.priority {
        parts.push(format!("priority set to {}", priority.as_str()));
    }
    if update.title.is_some() {
        parts.push("title changed".to_string());
    }
    if update.description.is_some() {
        parts.push("description changed".to_string());
    }
    parts.join(", ")
}
