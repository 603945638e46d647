//! Provider circuit breaker.
//!
//! One breaker per provider. A recorded failure trips the breaker; whether a
//! tripped provider is skipped is decided by [`ProviderHealth::is_eligible`]:
//! the primary provider is never skipped, the secondary is skipped while tripped.

use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::time::{Duration, Instant};

use serde::Serialize;
use tracing::{info, warn};

use designdiff_ai::ProviderKind;

/// When a tripped breaker closes again on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetPolicy {
    /// Stays tripped until [`ProviderHealth::reset`] is called.
    Never,
    /// Closes once this much time has passed since the last failure.
    After(Duration),
}

#[derive(Debug, Default)]
struct Breaker {
    tripped: AtomicBool,
    failures: AtomicU32,
    last_failure: Mutex<Option<Instant>>,
}

impl Breaker {
    fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut last) = self.last_failure.lock() {
            *last = Some(Instant::now());
        }
        self.tripped.store(true, Ordering::Release);
    }

    fn is_tripped(&self, policy: ResetPolicy) -> bool {
        if !self.tripped.load(Ordering::Acquire) {
            return false;
        }
        let ResetPolicy::After(cooldown) = policy else {
            return true;
        };
        let expired = self
            .last_failure
            .lock()
            .ok()
            .and_then(|last| *last)
            .is_some_and(|at| at.elapsed() >= cooldown);
        if expired {
            self.tripped.store(false, Ordering::Release);
        }
        !expired
    }

    fn reset(&self) {
        self.tripped.store(false, Ordering::Release);
        if let Ok(mut last) = self.last_failure.lock() {
            *last = None;
        }
    }
}

/// Shared health state of both vision providers.
///
/// Owned by the orchestrator (usually behind an `Arc`) instead of living in a
/// process global, so tests and parallel runs get independent breakers.
#[derive(Debug)]
pub struct ProviderHealth {
    primary: Breaker,
    secondary: Breaker,
    policy: ResetPolicy,
}

/// Point-in-time view of the breakers, logged after every comparison run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthSnapshot {
    pub openai_tripped: bool,
    pub openai_failures: u32,
    pub anthropic_tripped: bool,
    pub anthropic_failures: u32,
}

impl ProviderHealth {
    pub fn new(policy: ResetPolicy) -> Self {
        Self {
            primary: Breaker::default(),
            secondary: Breaker::default(),
            policy,
        }
    }

    fn breaker(&self, kind: ProviderKind) -> &Breaker {
        if kind.is_primary() {
            &self.primary
        } else {
            &self.secondary
        }
    }

    pub fn record_failure(&self, kind: ProviderKind) {
        let breaker = self.breaker(kind);
        let was_tripped = breaker.tripped.load(Ordering::Acquire);
        breaker.record_failure();
        if !was_tripped {
            warn!(provider = %kind, "provider circuit breaker tripped");
        }
    }

    /// Mark a provider unavailable without a real failure (e.g. disabled by config).
    pub fn trip(&self, kind: ProviderKind) {
        self.breaker(kind).tripped.store(true, Ordering::Release);
        if let Ok(mut last) = self.breaker(kind).last_failure.lock() {
            *last = Some(Instant::now());
        }
    }

    pub fn reset(&self, kind: ProviderKind) {
        self.breaker(kind).reset();
        info!(provider = %kind, "provider circuit breaker reset");
    }

    /// `false` while the provider's breaker is tripped.
    pub fn is_available(&self, kind: ProviderKind) -> bool {
        !self.breaker(kind).is_tripped(self.policy)
    }

    /// Whether the orchestrator may call this provider right now.
    pub fn is_eligible(&self, kind: ProviderKind) -> bool {
        kind.is_primary() || self.is_available(kind)
    }

    pub fn snapshot(&self) -> HealthSnapshot {
        HealthSnapshot {
            openai_tripped: !self.is_available(ProviderKind::OpenAi),
            openai_failures: self.breaker(ProviderKind::OpenAi).failures.load(Ordering::Relaxed),
            anthropic_tripped: !self.is_available(ProviderKind::Anthropic),
            anthropic_failures: self
                .breaker(ProviderKind::Anthropic)
                .failures
                .load(Ordering::Relaxed),
        }
    }
}

impl Default for ProviderHealth {
    fn default() -> Self {
        Self::new(ResetPolicy::Never)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_health_allows_both_providers() {
        let health = ProviderHealth::default();
        assert!(health.is_eligible(ProviderKind::OpenAi));
        assert!(health.is_eligible(ProviderKind::Anthropic));
    }

    #[test]
    fn secondary_failure_makes_it_ineligible() {
        let health = ProviderHealth::default();
        health.record_failure(ProviderKind::Anthropic);
        assert!(!health.is_available(ProviderKind::Anthropic));
        assert!(!health.is_eligible(ProviderKind::Anthropic));
    }

    #[test]
    fn primary_stays_eligible_when_tripped() {
        let health = ProviderHealth::default();
        health.record_failure(ProviderKind::OpenAi);
        assert!(!health.is_available(ProviderKind::OpenAi));
        assert!(health.is_eligible(ProviderKind::OpenAi));
    }

    #[test]
    fn manual_reset_closes_the_breaker() {
        let health = ProviderHealth::default();
        health.trip(ProviderKind::Anthropic);
        health.reset(ProviderKind::Anthropic);
        assert!(health.is_eligible(ProviderKind::Anthropic));
    }

    #[test]
    fn cooldown_reset_policy() {
        let health = ProviderHealth::new(ResetPolicy::After(Duration::ZERO));
        health.record_failure(ProviderKind::Anthropic);
        // Zero cooldown: already expired on the next check.
        assert!(health.is_eligible(ProviderKind::Anthropic));

        let health = ProviderHealth::new(ResetPolicy::After(Duration::from_secs(3600)));
        health.record_failure(ProviderKind::Anthropic);
        assert!(!health.is_eligible(ProviderKind::Anthropic));
    }

    #[test]
    fn snapshot_counts_failures() {
        let health = ProviderHealth::default();
        health.record_failure(ProviderKind::Anthropic);
        health.record_failure(ProviderKind::Anthropic);
        let snap = health.snapshot();
        assert_eq!(snap.anthropic_failures, 2);
        assert!(snap.anthropic_tripped);
        assert!(!snap.openai_tripped);
        assert_eq!(snap.openai_failures, 0);
    }
}
