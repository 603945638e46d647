//! Templated summary used when no provider can write one.

use serde::Serialize;

use designdiff_core::DiscrepancyPriority;

use crate::finding::VisualDiscrepancy;

/// Number of findings per priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PriorityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
}

impl PriorityCounts {
    pub fn tally(priorities: impl IntoIterator<Item = DiscrepancyPriority>) -> Self {
        let mut counts = Self::default();
        for p in priorities {
            match p {
                DiscrepancyPriority::High => counts.high += 1,
                DiscrepancyPriority::Medium => counts.medium += 1,
                DiscrepancyPriority::Low => counts.low += 1,
            }
        }
        counts
    }

    pub fn of(items: &[VisualDiscrepancy]) -> Self {
        Self::tally(items.iter().map(|d| d.priority))
    }

    pub fn total(&self) -> usize {
        self.high + self.medium + self.low
    }
}

/// Summary synthesized from priority counts.
pub fn summarize_counts(items: &[VisualDiscrepancy]) -> String {
    let counts = PriorityCounts::of(items);
    match counts.total() {
        0 => "No visual discrepancies were found between the design and the website.".to_string(),
        total => format!(
            "Found {total} {}: {} high priority, {} medium priority, {} low priority.",
            if total == 1 { "discrepancy" } else { "discrepancies" },
            counts.high,
            counts.medium,
            counts.low,
        ),
    }
}

/// Summary for a run that used the static fallback library.
///
/// Always states that the findings are not AI-derived, including when the
/// configured library is empty.
pub fn summarize_fallback(items: &[VisualDiscrepancy]) -> String {
    let counts = PriorityCounts::of(items);
    match counts.total() {
        0 => "AI analysis unavailable; no generic findings are configured.".to_string(),
        total => format!(
            "AI analysis unavailable; showing {total} generic {} for manual review \
             ({} high priority, {} medium priority, {} low priority).",
            if total == 1 { "discrepancy" } else { "discrepancies" },
            counts.high,
            counts.medium,
            counts.low,
        ),
    }
}
