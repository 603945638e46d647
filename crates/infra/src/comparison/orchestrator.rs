//! Comparison orchestration: provider selection, degradation and persistence.
//!
//! ```text
//! resolve / create Comparison (stamp last_compared_at)
//!   ↓
//! active provider ── fails ──→ alternate provider (if eligible)
//!   │                              │
//!   │ items                        └─ fails / empty ──→ static fallback library
//!   ↓
//! persist discrepancies (concurrently)
//!   ↓
//! summary (provider, else template) → finalize Comparison → Activity
//! ```
//!
//! Provider failures never leave this module. `run_comparison` only fails on
//! an unknown comparison id or on a persistence error.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::try_join_all;
use serde::Serialize;
use thiserror::Error;
use tokio::time::{sleep, timeout};
use tracing::{info, instrument, warn};

use designdiff_ai::{
    FallbackLibrary, PriorityCounts, ProviderKind, VisionError, VisionProvider, VisualDiscrepancy,
    summarize_counts, summarize_fallback,
};
use designdiff_core::{Activity, ActivityType, Comparison, ComparisonId, Discrepancy, ProjectId};

use crate::health::ProviderHealth;
use crate::store::{ComparisonStore, StoreError};

const NEW_COMPARISON_DESCRIPTION: &str = "Automated comparison of design and website screenshots";

#[derive(Debug, Error)]
pub enum ComparisonError {
    #[error("comparison {0} not found")]
    NotFound(ComparisonId),

    #[error("persistence failed: {0}")]
    Persistence(#[from] StoreError),
}

/// Result of one run: the finalized comparison and the batch persisted by it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonOutcome {
    pub comparison: Comparison,
    pub discrepancies: Vec<Discrepancy>,
    /// Provider that produced the findings; `None` on the fallback path.
    pub provider: Option<ProviderKind>,
}

/// Tuning for provider calls.
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Preferred provider. The secondary is only used while its breaker is closed.
    pub preference: ProviderKind,
    pub call_timeout: Duration,
    /// Extra attempts for transient failures (network, timeout, 429/5xx).
    pub max_retries: u32,
    pub retry_backoff: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            preference: ProviderKind::PRIMARY,
            call_timeout: Duration::from_secs(60),
            max_retries: 1,
            retry_backoff: Duration::from_millis(250),
        }
    }
}

/// Findings plus where they came from.
struct Analysis {
    items: Vec<VisualDiscrepancy>,
    provider: Option<ProviderKind>,
}

impl Analysis {
    fn fallback(library: &FallbackLibrary) -> Self {
        Self {
            items: library.discrepancies(),
            provider: None,
        }
    }

    fn used_fallback(&self) -> bool {
        self.provider.is_none()
    }
}

pub struct ComparisonOrchestrator<S> {
    store: S,
    providers: Vec<Arc<dyn VisionProvider>>,
    health: Arc<ProviderHealth>,
    fallback: FallbackLibrary,
    config: OrchestratorConfig,
}

impl<S> ComparisonOrchestrator<S>
where
    S: ComparisonStore,
{
    pub fn new(
        store: S,
        health: Arc<ProviderHealth>,
        fallback: FallbackLibrary,
        config: OrchestratorConfig,
    ) -> Self {
        Self {
            store,
            providers: Vec::new(),
            health,
            fallback,
            config,
        }
    }

    /// Register a provider; replaces any provider of the same kind.
    pub fn with_provider(mut self, provider: Arc<dyn VisionProvider>) -> Self {
        let kind = provider.kind();
        self.providers.retain(|p| p.kind() != kind);
        self.providers.push(provider);
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn health(&self) -> &Arc<ProviderHealth> {
        &self.health
    }

    /// Run one comparison of `design_image` against `website_image`.
    ///
    /// With `existing` set, the run appends a new discrepancy batch to that
    /// comparison; earlier batches are left alone. The comparison must belong
    /// to `project_id`, and its image references are updated to this run's.
    #[instrument(skip_all, fields(project_id = %project_id, existing = ?existing))]
    pub async fn run_comparison(
        &self,
        design_image: &Path,
        website_image: &Path,
        project_id: ProjectId,
        existing: Option<ComparisonId>,
    ) -> Result<ComparisonOutcome, ComparisonError> {
        let now = Utc::now();
        let mut comparison = self
            .resolve_comparison(design_image, website_image, project_id, existing, now)
            .await?;

        comparison.mark_compared(now);
        self.store.update_comparison(&comparison).await?;

        let analysis = self.analyze(design_image, website_image).await;
        if analysis.used_fallback() {
            warn!(
                comparison_id = %comparison.id,
                count = analysis.items.len(),
                "using static fallback discrepancies"
            );
        }

        let discrepancies = self.persist(comparison.id, &analysis.items).await?;
        info!(
            comparison_id = %comparison.id,
            count = discrepancies.len(),
            "persisted discrepancies"
        );

        comparison.description = self.summarize(&analysis).await;
        comparison.used_fallback = analysis.used_fallback();
        comparison.complete();
        self.store.update_comparison(&comparison).await?;

        let counts = PriorityCounts::tally(discrepancies.iter().map(|d| d.priority));
        let activity = Activity::new(
            comparison.project_id,
            None,
            ActivityType::ComparisonRun,
            run_description(&comparison.name, counts, comparison.used_fallback),
            Utc::now(),
        );
        self.store.create_activity(activity).await?;

        let health = self.health.snapshot();
        info!(
            comparison_id = %comparison.id,
            provider = analysis.provider.map(|k| k.as_str()).unwrap_or("fallback"),
            used_fallback = comparison.used_fallback,
            openai_tripped = health.openai_tripped,
            anthropic_tripped = health.anthropic_tripped,
            "comparison run completed"
        );

        Ok(ComparisonOutcome {
            comparison,
            discrepancies,
            provider: analysis.provider,
        })
    }

    async fn resolve_comparison(
        &self,
        design_image: &Path,
        website_image: &Path,
        project_id: ProjectId,
        existing: Option<ComparisonId>,
        now: DateTime<Utc>,
    ) -> Result<Comparison, ComparisonError> {
        if let Some(id) = existing {
            let mut comparison = self
                .store
                .get_comparison(id)
                .await?
                .ok_or(ComparisonError::NotFound(id))?;
            // Lookups are project-scoped.
            if comparison.project_id != project_id {
                warn!(
                    comparison_id = %id,
                    owner = %comparison.project_id,
                    requested = %project_id,
                    "comparison belongs to another project"
                );
                return Err(ComparisonError::NotFound(id));
            }
            // The record describes the latest batch's inputs.
            comparison.design_image = design_image.display().to_string();
            comparison.website_image = website_image.display().to_string();
            comparison.start_processing();
            return Ok(comparison);
        }

        let mut comparison = Comparison::new(
            project_id,
            format!("Comparison {}", now.format("%Y-%m-%d %H:%M:%S UTC")),
            NEW_COMPARISON_DESCRIPTION,
            design_image.display().to_string(),
            website_image.display().to_string(),
            now,
        );
        comparison.start_processing();
        Ok(self.store.create_comparison(comparison).await?)
    }

    /// The secondary only when preferred and its breaker is closed.
    fn select_provider(&self) -> ProviderKind {
        if self.config.preference == ProviderKind::SECONDARY
            && self.health.is_available(ProviderKind::SECONDARY)
        {
            ProviderKind::SECONDARY
        } else {
            ProviderKind::PRIMARY
        }
    }

    fn provider(&self, kind: ProviderKind) -> Result<&dyn VisionProvider, VisionError> {
        self.providers
            .iter()
            .find(|p| p.kind() == kind)
            .map(|p| p.as_ref())
            .ok_or(VisionError::NotConfigured(kind))
    }

    async fn analyze(&self, design_image: &Path, website_image: &Path) -> Analysis {
        let active = self.select_provider();
        info!(provider = %active, "selected vision provider");

        let err = match self.attempt(active, design_image, website_image).await {
            Ok(items) => return self.accept(active, items),
            Err(err) => err,
        };
        warn!(provider = %active, error = %err, "vision provider failed");
        self.health.record_failure(active);

        let alternate = active.alternate();
        if !self.health.is_eligible(alternate) {
            info!(provider = %alternate, "alternate provider unavailable");
            return Analysis::fallback(&self.fallback);
        }

        match self.attempt(alternate, design_image, website_image).await {
            Ok(items) => self.accept(alternate, items),
            Err(err) => {
                warn!(provider = %alternate, error = %err, "alternate vision provider failed");
                self.health.record_failure(alternate);
                Analysis::fallback(&self.fallback)
            }
        }
    }

    /// An empty answer degrades to the fallback library like a failure would.
    fn accept(&self, kind: ProviderKind, items: Vec<VisualDiscrepancy>) -> Analysis {
        if items.is_empty() {
            info!(provider = %kind, "provider reported no discrepancies");
            return Analysis::fallback(&self.fallback);
        }
        info!(provider = %kind, count = items.len(), "provider analysis succeeded");
        Analysis {
            items,
            provider: Some(kind),
        }
    }

    async fn attempt(
        &self,
        kind: ProviderKind,
        design_image: &Path,
        website_image: &Path,
    ) -> Result<Vec<VisualDiscrepancy>, VisionError> {
        let provider = self.provider(kind)?;
        self.call_with_retry(kind, "analyze", move || {
            provider.analyze_image_differences(design_image, website_image)
        })
        .await
    }

    async fn summarize(&self, analysis: &Analysis) -> String {
        let Some(kind) = analysis.provider else {
            return summarize_fallback(&analysis.items);
        };

        let items = analysis.items.as_slice();
        let result = match self.provider(kind) {
            Ok(provider) => {
                self.call_with_retry(kind, "summary", move || provider.generate_summary(items))
                    .await
            }
            Err(err) => Err(err),
        };

        match result {
            Ok(summary) if !summary.trim().is_empty() => summary.trim().to_string(),
            Ok(_) => summarize_counts(items),
            Err(err) => {
                warn!(provider = %kind, error = %err, "summary generation failed, using template");
                summarize_counts(items)
            }
        }
    }

    /// Timeout on every attempt; transient failures are retried with backoff.
    async fn call_with_retry<T, F, Fut>(
        &self,
        kind: ProviderKind,
        operation: &'static str,
        call: F,
    ) -> Result<T, VisionError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<T, VisionError>>,
    {
        let mut attempt: u32 = 0;
        loop {
            let result = match timeout(self.config.call_timeout, call()).await {
                Ok(result) => result,
                Err(_) => Err(VisionError::Timeout(self.config.call_timeout)),
            };

            match result {
                Err(err) if err.is_transient() && attempt < self.config.max_retries => {
                    attempt += 1;
                    warn!(
                        provider = %kind,
                        operation,
                        attempt,
                        error = %err,
                        "transient provider failure, retrying"
                    );
                    sleep(backoff(self.config.retry_backoff, attempt)).await;
                }
                other => return other,
            }
        }
    }

    async fn persist(
        &self,
        comparison_id: ComparisonId,
        items: &[VisualDiscrepancy],
    ) -> Result<Vec<Discrepancy>, StoreError> {
        let now = Utc::now();
        let creates = items.iter().map(|item| {
            self.store.create_discrepancy(Discrepancy::new(
                comparison_id,
                item.title.clone(),
                item.description.clone(),
                item.kind,
                item.priority,
                item.coordinates,
                now,
            ))
        });
        try_join_all(creates).await
    }
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}

/// Audit wording for a finished run. Fallback runs are always labelled as such.
pub(crate) fn run_description(name: &str, counts: PriorityCounts, used_fallback: bool) -> String {
    let total = counts.total();
    let noun = if total == 1 { "discrepancy" } else { "discrepancies" };
    match (used_fallback, total) {
        (true, 0) => format!(
            "Comparison \"{name}\" completed with fallback analysis: no generic discrepancies \
             configured (AI analysis unavailable)"
        ),
        (true, _) => format!(
            "Comparison \"{name}\" completed with fallback analysis: {total} generic {noun} \
             (AI analysis unavailable)"
        ),
        (false, 0) => format!("Comparison \"{name}\" completed: no discrepancies found"),
        (false, _) => format!(
            "Comparison \"{name}\" completed: found {total} {noun} ({} high priority)",
            counts.high
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_and_caps() {
        let base = Duration::from_millis(100);
        assert_eq!(backoff(base, 1), Duration::from_millis(100));
        assert_eq!(backoff(base, 2), Duration::from_millis(200));
        assert_eq!(backoff(base, 30), Duration::from_millis(10_000));
    }

    #[test]
    fn run_description_wording() {
        let one_high = PriorityCounts {
            high: 1,
            medium: 0,
            low: 0,
        };
        assert_eq!(
            run_description("Home", one_high, false),
            "Comparison \"Home\" completed: found 1 discrepancy (1 high priority)"
        );

        let five = PriorityCounts {
            high: 1,
            medium: 2,
            low: 2,
        };
        let text = run_description("Home", five, true);
        assert!(text.contains("fallback analysis"));
        assert!(text.contains("5 generic discrepancies"));

        assert_eq!(
            run_description("Home", PriorityCounts::default(), false),
            "Comparison \"Home\" completed: no discrepancies found"
        );

        let empty_fallback = run_description("Home", PriorityCounts::default(), true);
        assert!(empty_fallback.contains("fallback analysis"));
        assert!(empty_fallback.contains("AI analysis unavailable"));
        assert!(!empty_fallback.contains("no discrepancies found"));
    }

    #[test]
    fn default_config_prefers_primary_with_one_retry() {
        let cfg = OrchestratorConfig::default();
        assert_eq!(cfg.preference, ProviderKind::OpenAi);
        assert_eq!(cfg.max_retries, 1);
        assert_eq!(cfg.call_timeout, Duration::from_secs(60));
    }
}
