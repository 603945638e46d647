//! Infrastructure layer: persistence, configuration, provider health and the
//! comparison workflow built on top of them.

pub mod comparison;
pub mod config;
pub mod health;
pub mod services;
pub mod store;


pub use comparison::{
    ComparisonError, ComparisonOrchestrator, ComparisonOutcome, DiscrepancyService,
    OrchestratorConfig, ServiceError,
};
pub use config::{AppConfig, ConfigError, StorageConfig};
pub use health::{HealthSnapshot, ProviderHealth, ResetPolicy};
pub use services::{AppServices, BootstrapError, build_services};
pub use store::{
    ComparisonStore, InMemoryComparisonStore, PostgresComparisonStore, StoreError,
};
