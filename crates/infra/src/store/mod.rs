//! Persistence gateway for comparisons and everything hanging off them.
//!
//! The orchestrator only talks to [`ComparisonStore`]; whether records live in
//! process memory or in Postgres is decided once at startup.

pub mod in_memory;
pub mod postgres;

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use designdiff_core::{
    Activity, Comment, Comparison, ComparisonId, Discrepancy, DiscrepancyId, DiscrepancyUpdate,
    DomainError, ProjectId,
};

pub use in_memory::InMemoryComparisonStore;
pub use postgres::PostgresComparisonStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("conflict: {0}")]
    Conflict(String),

    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error("storage error: {0}")]
    Storage(String),
}

impl StoreError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// CRUD gateway over comparisons, discrepancies, comments and activities.
///
/// Listing order is part of the contract:
/// - comparisons and activities: newest first
/// - discrepancies and comments: creation order
#[async_trait]
pub trait ComparisonStore: Send + Sync {
    async fn create_comparison(&self, comparison: Comparison) -> Result<Comparison, StoreError>;

    async fn get_comparison(&self, id: ComparisonId) -> Result<Option<Comparison>, StoreError>;

    /// Overwrite a stored comparison. `NotFound` if it was never created.
    async fn update_comparison(&self, comparison: &Comparison) -> Result<(), StoreError>;

    async fn list_comparisons(&self, project_id: ProjectId) -> Result<Vec<Comparison>, StoreError>;

    /// `NotFound` when the referenced comparison does not exist.
    async fn create_discrepancy(&self, discrepancy: Discrepancy) -> Result<Discrepancy, StoreError>;

    async fn get_discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError>;

    async fn list_discrepancies(
        &self,
        comparison_id: ComparisonId,
    ) -> Result<Vec<Discrepancy>, StoreError>;

    async fn update_discrepancy(
        &self,
        id: DiscrepancyId,
        update: &DiscrepancyUpdate,
    ) -> Result<Discrepancy, StoreError>;

    /// `NotFound` when the referenced discrepancy does not exist.
    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError>;

    async fn list_comments(&self, discrepancy_id: DiscrepancyId) -> Result<Vec<Comment>, StoreError>;

    async fn create_activity(&self, activity: Activity) -> Result<Activity, StoreError>;

    async fn list_activities(&self, project_id: ProjectId) -> Result<Vec<Activity>, StoreError>;
}

#[async_trait]
impl<S> ComparisonStore for Arc<S>
where
    S: ComparisonStore + ?Sized,
{
    async fn create_comparison(&self, comparison: Comparison) -> Result<Comparison, StoreError> {
        (**self).create_comparison(comparison).await
    }

    async fn get_comparison(&self, id: ComparisonId) -> Result<Option<Comparison>, StoreError> {
        (**self).get_comparison(id).await
    }

    async fn update_comparison(&self, comparison: &Comparison) -> Result<(), StoreError> {
        (**self).update_comparison(comparison).await
    }

    async fn list_comparisons(&self, project_id: ProjectId) -> Result<Vec<Comparison>, StoreError> {
        (**self).list_comparisons(project_id).await
    }

    async fn create_discrepancy(&self, discrepancy: Discrepancy) -> Result<Discrepancy, StoreError> {
        (**self).create_discrepancy(discrepancy).await
    }

    async fn get_discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError> {
        (**self).get_discrepancy(id).await
    }

    async fn list_discrepancies(
        &self,
        comparison_id: ComparisonId,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        (**self).list_discrepancies(comparison_id).await
    }

    async fn update_discrepancy(
        &self,
        id: DiscrepancyId,
        update: &DiscrepancyUpdate,
    ) -> Result<Discrepancy, StoreError> {
        (**self).update_discrepancy(id, update).await
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        (**self).create_comment(comment).await
    }

    async fn list_comments(&self, discrepancy_id: DiscrepancyId) -> Result<Vec<Comment>, StoreError> {
        (**self).list_comments(discrepancy_id).await
    }

    async fn create_activity(&self, activity: Activity) -> Result<Activity, StoreError> {
        (**self).create_activity(activity).await
    }

    async fn list_activities(&self, project_id: ProjectId) -> Result<Vec<Activity>, StoreError> {
        (**self).list_activities(project_id).await
    }
}
