//! Comparison workflow: running analyses and managing their discrepancies.

pub mod orchestrator;
pub mod service;

pub use orchestrator::{
    ComparisonError, ComparisonOrchestrator, ComparisonOutcome, OrchestratorConfig,
};
pub use service::{DiscrepancyService, ServiceError};
