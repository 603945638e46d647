use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use chrono::Utc;

use designdiff_core::{
    Activity, Comment, Comparison, ComparisonId, Discrepancy, DiscrepancyId, DiscrepancyUpdate,
    Entity, ProjectId,
};

use super::{ComparisonStore, StoreError};

/// Rows kept in insertion order with an id index on the side.
#[derive(Debug)]
struct Table<T: Entity> {
    rows: Vec<T>,
    index: HashMap<T::Id, usize>,
}

impl<T: Entity> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            index: HashMap::new(),
        }
    }
}

impl<T: Entity + Clone> Table<T> {
    fn insert(&mut self, row: T) -> Result<T, StoreError> {
        let id = *row.id();
        if self.index.contains_key(&id) {
            return Err(StoreError::Conflict(format!("duplicate id {id}")));
        }
        self.index.insert(id, self.rows.len());
        self.rows.push(row.clone());
        Ok(row)
    }

    fn get(&self, id: &T::Id) -> Option<&T> {
        self.index.get(id).map(|&pos| &self.rows[pos])
    }

    fn get_mut(&mut self, id: &T::Id) -> Option<&mut T> {
        let pos = *self.index.get(id)?;
        self.rows.get_mut(pos)
    }

    fn contains(&self, id: &T::Id) -> bool {
        self.index.contains_key(id)
    }

    fn select(&self, pred: impl Fn(&T) -> bool) -> Vec<T> {
        self.rows.iter().filter(|r| pred(r)).cloned().collect()
    }
}

fn poisoned<E>(_: E) -> StoreError {
    StoreError::Storage("lock poisoned".to_string())
}

/// In-memory comparison store.
///
/// Intended for tests/dev and for the default non-persistent mode. Data is lost
/// when the process exits.
#[derive(Debug, Default)]
pub struct InMemoryComparisonStore {
    comparisons: RwLock<Table<Comparison>>,
    discrepancies: RwLock<Table<Discrepancy>>,
    comments: RwLock<Table<Comment>>,
    activities: RwLock<Table<Activity>>,
}

impl InMemoryComparisonStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ComparisonStore for InMemoryComparisonStore {
    async fn create_comparison(&self, comparison: Comparison) -> Result<Comparison, StoreError> {
        self.comparisons.write().map_err(poisoned)?.insert(comparison)
    }

    async fn get_comparison(&self, id: ComparisonId) -> Result<Option<Comparison>, StoreError> {
        Ok(self.comparisons.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn update_comparison(&self, comparison: &Comparison) -> Result<(), StoreError> {
        let mut table = self.comparisons.write().map_err(poisoned)?;
        let slot = table
            .get_mut(&comparison.id)
            .ok_or_else(|| StoreError::not_found("comparison", comparison.id))?;
        *slot = comparison.clone();
        Ok(())
    }

    async fn list_comparisons(&self, project_id: ProjectId) -> Result<Vec<Comparison>, StoreError> {
        let table = self.comparisons.read().map_err(poisoned)?;
        let mut out = table.select(|c| c.project_id == project_id);
        // Newest first; ties keep the latest insert on top.
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }

    async fn create_discrepancy(&self, discrepancy: Discrepancy) -> Result<Discrepancy, StoreError> {
        let exists = self
            .comparisons
            .read()
            .map_err(poisoned)?
            .contains(&discrepancy.comparison_id);
        if !exists {
            return Err(StoreError::not_found("comparison", discrepancy.comparison_id));
        }
        self.discrepancies.write().map_err(poisoned)?.insert(discrepancy)
    }

    async fn get_discrepancy(&self, id: DiscrepancyId) -> Result<Option<Discrepancy>, StoreError> {
        Ok(self.discrepancies.read().map_err(poisoned)?.get(&id).cloned())
    }

    async fn list_discrepancies(
        &self,
        comparison_id: ComparisonId,
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let table = self.discrepancies.read().map_err(poisoned)?;
        Ok(table.select(|d| d.comparison_id == comparison_id))
    }

    async fn update_discrepancy(
        &self,
        id: DiscrepancyId,
        update: &DiscrepancyUpdate,
    ) -> Result<Discrepancy, StoreError> {
        let mut table = self.discrepancies.write().map_err(poisoned)?;
        let row = table
            .get_mut(&id)
            .ok_or_else(|| StoreError::not_found("discrepancy", id))?;

        // Validate on a copy so a rejected update leaves the row untouched.
        let mut next = row.clone();
        next.apply_update(update, Utc::now())?;
        *row = next.clone();
        Ok(next)
    }

    async fn create_comment(&self, comment: Comment) -> Result<Comment, StoreError> {
        let exists = self
            .discrepancies
            .read()
            .map_err(poisoned)?
            .contains(&comment.discrepancy_id);
        if !exists {
            return Err(StoreError::not_found("discrepancy", comment.discrepancy_id));
        }
        self.comments.write().map_err(poisoned)?.insert(comment)
    }

    async fn list_comments(&self, discrepancy_id: DiscrepancyId) -> Result<Vec<Comment>, StoreError> {
        let table = self.comments.read().map_err(poisoned)?;
        Ok(table.select(|c| c.discrepancy_id == discrepancy_id))
    }

    async fn create_activity(&self, activity: Activity) -> Result<Activity, StoreError> {
        self.activities.write().map_err(poisoned)?.insert(activity)
    }

    async fn list_activities(&self, project_id: ProjectId) -> Result<Vec<Activity>, StoreError> {
        let table = self.activities.read().map_err(poisoned)?;
        let mut out = table.select(|a| a.project_id == project_id);
        out.reverse();
        out.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(out)
    }
}
