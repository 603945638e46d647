//! Process wiring: config in, ready-to-use services out.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use designdiff_ai::{AnthropicProvider, OpenAiProvider, ProviderKind, VisionError};

use crate::comparison::{ComparisonOrchestrator, DiscrepancyService};
use crate::config::{AppConfig, ConfigError, StorageConfig};
use crate::health::{ProviderHealth, ResetPolicy};
use crate::store::{ComparisonStore, InMemoryComparisonStore, PostgresComparisonStore, StoreError};

pub type SharedStore = Arc<dyn ComparisonStore>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to open store: {0}")]
    Store(#[from] StoreError),

    #[error("failed to build provider client: {0}")]
    Provider(#[from] VisionError),
}

pub struct AppServices {
    pub store: SharedStore,
    pub health: Arc<ProviderHealth>,
    pub orchestrator: ComparisonOrchestrator<SharedStore>,
    pub discrepancies: DiscrepancyService<SharedStore>,
}

pub async fn build_services(config: &AppConfig) -> Result<AppServices, BootstrapError> {
    let store: SharedStore = match &config.storage {
        StorageConfig::InMemory => {
            info!("using in-memory comparison store");
            Arc::new(InMemoryComparisonStore::new())
        }
        StorageConfig::Postgres { database_url } => {
            info!("using postgres comparison store");
            Arc::new(PostgresComparisonStore::connect(database_url).await?)
        }
    };

    let health = Arc::new(ProviderHealth::new(ResetPolicy::Never));
    if config.anthropic_disabled {
        info!("secondary provider disabled by configuration");
        health.trip(ProviderKind::SECONDARY);
    }

    let orchestrator = ComparisonOrchestrator::new(
        store.clone(),
        health.clone(),
        config.fallback_library()?,
        config.orchestrator_config(),
    )
    .with_provider(Arc::new(OpenAiProvider::new(config.openai.clone())?))
    .with_provider(Arc::new(AnthropicProvider::new(config.anthropic.clone())?));

    Ok(AppServices {
        discrepancies: DiscrepancyService::new(store.clone()),
        store,
        health,
        orchestrator,
    })
}
