use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::VisionError;
use crate::finding::VisualDiscrepancy;

/// The two supported vision backends.
///
/// OpenAI is the primary provider; Anthropic is the secondary one that can be
/// preferred through configuration and gets circuit-broken on failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[serde(rename = "openai")]
    OpenAi,
    Anthropic,
}

impl ProviderKind {
    pub const PRIMARY: ProviderKind = ProviderKind::OpenAi;
    pub const SECONDARY: ProviderKind = ProviderKind::Anthropic;

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
        }
    }

    /// The other provider.
    pub fn alternate(&self) -> ProviderKind {
        match self {
            ProviderKind::OpenAi => ProviderKind::Anthropic,
            ProviderKind::Anthropic => ProviderKind::OpenAi,
        }
    }

    pub fn is_primary(&self) -> bool {
        *self == Self::PRIMARY
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "openai" | "gpt" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            other => Err(format!(
                "unknown provider '{other}' (expected 'openai' or 'anthropic')"
            )),
        }
    }
}

/// Connection settings shared by both provider clients.
#[derive(Debug, Clone)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    /// Per-request timeout enforced by the HTTP client.
    pub timeout: Duration,
}

impl ProviderConfig {
    pub fn new(api_key: Option<String>, model: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout: Duration::from_secs(60),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }
}

/// A remote vision model that can compare a design with a website screenshot.
#[async_trait]
pub trait VisionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Compare the two images and return the normalized findings.
    ///
    /// Every returned item has status `open`.
    async fn analyze_image_differences(
        &self,
        design_image: &Path,
        website_image: &Path,
    ) -> Result<Vec<VisualDiscrepancy>, VisionError>;

    /// Short natural-language summary of a finding set.
    async fn generate_summary(&self, discrepancies: &[VisualDiscrepancy]) -> Result<String, VisionError>;
}
