//! Configuration loading from environment variables.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;
use tracing::warn;

use designdiff_ai::{FallbackError, FallbackLibrary, ProviderConfig, ProviderKind, anthropic, openai};

use crate::comparison::OrchestratorConfig;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{name} must be set when {reason}")]
    Missing { name: &'static str, reason: &'static str },

    #[error("invalid value for {name}: '{value}' ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error(transparent)]
    Fallback(#[from] FallbackError),
}

/// Where comparisons are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageConfig {
    InMemory,
    Postgres { database_url: String },
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub provider_preference: ProviderKind,
    pub openai: ProviderConfig,
    pub anthropic: ProviderConfig,
    /// Start with the secondary provider's breaker tripped.
    pub anthropic_disabled: bool,
    pub provider_timeout: Duration,
    pub provider_max_retries: u32,
    pub storage: StorageConfig,
    pub fallback_library_path: Option<PathBuf>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build from any variable source; `from_env` passes the process environment.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let provider_preference = match get("AI_PROVIDER") {
            Some(raw) => raw.parse::<ProviderKind>().map_err(|reason| ConfigError::Invalid {
                name: "AI_PROVIDER",
                value: raw.clone(),
                reason,
            })?,
            None => ProviderKind::PRIMARY,
        };

        let timeout_secs: u64 = parse_number(&get, "PROVIDER_TIMEOUT_SECS", 60)?;
        if timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                name: "PROVIDER_TIMEOUT_SECS",
                value: "0".to_string(),
                reason: "must be at least 1 second".to_string(),
            });
        }
        let provider_timeout = Duration::from_secs(timeout_secs);
        let provider_max_retries = parse_number(&get, "PROVIDER_MAX_RETRIES", 1)?;

        let openai = ProviderConfig::new(
            get("OPENAI_API_KEY"),
            get("OPENAI_MODEL").unwrap_or_else(|| openai::DEFAULT_MODEL.to_string()),
            get("OPENAI_BASE_URL").unwrap_or_else(|| openai::DEFAULT_BASE_URL.to_string()),
        )
        .with_timeout(provider_timeout);

        let anthropic = ProviderConfig::new(
            get("ANTHROPIC_API_KEY"),
            get("ANTHROPIC_MODEL").unwrap_or_else(|| anthropic::DEFAULT_MODEL.to_string()),
            get("ANTHROPIC_BASE_URL").unwrap_or_else(|| anthropic::DEFAULT_BASE_URL.to_string()),
        )
        .with_timeout(provider_timeout);

        if !openai.is_configured() {
            warn!("OPENAI_API_KEY not set; primary provider calls will fail over");
        }

        let storage = if parse_flag(&get, "USE_PERSISTENT_STORES") {
            let database_url = get("DATABASE_URL").ok_or(ConfigError::Missing {
                name: "DATABASE_URL",
                reason: "USE_PERSISTENT_STORES=true",
            })?;
            StorageConfig::Postgres { database_url }
        } else {
            StorageConfig::InMemory
        };

        Ok(Self {
            provider_preference,
            openai,
            anthropic,
            anthropic_disabled: parse_flag(&get, "ANTHROPIC_DISABLED"),
            provider_timeout,
            provider_max_retries,
            storage,
            fallback_library_path: get("FALLBACK_LIBRARY_PATH").map(PathBuf::from),
        })
    }

    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            preference: self.provider_preference,
            call_timeout: self.provider_timeout,
            max_retries: self.provider_max_retries,
            ..OrchestratorConfig::default()
        }
    }

    /// The configured fallback list, or the built-in one.
    pub fn fallback_library(&self) -> Result<FallbackLibrary, ConfigError> {
        match &self.fallback_library_path {
            Some(path) => Ok(FallbackLibrary::from_path(path)?),
            None => Ok(FallbackLibrary::builtin()),
        }
    }
}

fn parse_flag(get: &impl Fn(&str) -> Option<String>, name: &str) -> bool {
    match get(name) {
        Some(raw) => match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => true,
            "false" | "0" | "no" => false,
            _ => {
                warn!(variable = name, value = %raw, "unrecognized boolean, using false");
                false
            }
        },
        None => false,
    }
}

fn parse_number<T>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|e| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
