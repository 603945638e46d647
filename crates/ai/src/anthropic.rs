//! Anthropic messages client (secondary provider).

use std::path::Path;

use async_trait::async_trait;
use serde_json::{Value, json};

use crate::error::VisionError;
use crate::exchange;
use crate::finding::VisualDiscrepancy;
use crate::http;
use crate::image::EncodedImage;
use crate::prompt;
use crate::provider::{ProviderConfig, ProviderKind, VisionProvider};

pub const DEFAULT_MODEL: &str = "claude-3-7-sonnet-20250219";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl AnthropicProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, VisionError> {
        let http_client = http::build_client(config.timeout)?;
        Ok(Self { config, http_client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/messages", self.config.base_url)
    }

    async fn complete(&self, body: Value) -> Result<String, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::NotConfigured(ProviderKind::Anthropic))?;

        let request = self
            .http_client
            .post(self.endpoint())
            .header("x-api-key", api_key)
            .header("anthropic-version", API_VERSION);
        let response = http::send_json(request, &body, self.config.timeout).await?;
        extract_text(&response)
    }
}

#[async_trait]
impl VisionProvider for AnthropicProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    async fn analyze_image_differences(
        &self,
        design_image: &Path,
        website_image: &Path,
    ) -> Result<Vec<VisualDiscrepancy>, VisionError> {
        exchange::analyze(
            ProviderKind::Anthropic,
            &self.config,
            design_image,
            website_image,
            analysis_body,
            move |body| self.complete(body),
        )
        .await
    }

    async fn generate_summary(&self, discrepancies: &[VisualDiscrepancy]) -> Result<String, VisionError> {
        exchange::summarize(&self.config, discrepancies, summary_body, move |body| {
            self.complete(body)
        })
        .await
    }
}

fn image_block(image: &EncodedImage) -> Value {
    json!({
        "type": "image",
        "source": {
            "type": "base64",
            "media_type": image.media_type,
            "data": image.base64,
        }
    })
}

pub fn analysis_body(model: &str, design: &EncodedImage, website: &EncodedImage) -> Value {
    json!({
        "model": model,
        "max_tokens": prompt::ANALYSIS_MAX_TOKENS,
        "system": prompt::ANALYSIS_SYSTEM_PROMPT,
        "messages": [{
            "role": "user",
            "content": [
                { "type": "text", "text": prompt::DESIGN_CAPTION },
                image_block(design),
                { "type": "text", "text": prompt::WEBSITE_CAPTION },
                image_block(website),
                { "type": "text", "text": prompt::ANALYSIS_USER_PROMPT },
            ]
        }]
    })
}

pub fn summary_body(model: &str, findings_json: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": prompt::SUMMARY_MAX_TOKENS,
        "system": prompt::SUMMARY_SYSTEM_PROMPT,
        "messages": [{
            "role": "user",
            "content": prompt::summary_user_prompt(findings_json),
        }]
    })
}

/// Concatenated text blocks of a messages response.
pub fn extract_text(response: &Value) -> Result<String, VisionError> {
    let blocks = response
        .get("content")
        .and_then(Value::as_array)
        .ok_or_else(|| VisionError::parse("anthropic response has no content"))?;

    let text: Vec<&str> = blocks
        .iter()
        .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
        .filter_map(|b| b.get("text").and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(VisionError::parse("anthropic response has no text blocks"));
    }
    Ok(text.join("\n"))
}
