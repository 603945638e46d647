//! OpenAI chat-completions client (primary provider).

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

pub const DEFAULT_MODEL: &str = "gpt-4o";
pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";

pub struct OpenAiProvider {
    config: ProviderConfig,
    http_client: reqwest::Client,
}

impl OpenAiProvider {
    pub fn new(config: ProviderConfig) -> Result<Self, VisionError> {
        let http_client = http::build_client(config.timeout)?;
        Ok(Self { config, http_client })
    }

    fn endpoint(&self) -> String {
        format!("{}/v1/chat/completions", self.config.base_url)
    }

    async fn complete(&self, body: Value) -> Result<String, VisionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(VisionError::NotConfigured(ProviderKind::OpenAi))?;

        let request = self.http_client.post(self.endpoint()).bearer_auth(api_key);
        let response = http::send_json(request, &body, self.config.timeout).await?;
        extract_text(&response)
    }
}

#[async_trait]
impl VisionProvider for OpenAiProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAi
    }

    async fn analyze_image_differences(
        &self,
        design_image: &Path,
        website_image: &Path,
    ) -> Result<Vec<VisualDiscrepancy>, VisionError> {
        exchange::analyze(
            ProviderKind::OpenAi,
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

pub fn analysis_body(model: &str, design: &EncodedImage, website: &EncodedImage) -> Value {
    json!({
        "model": model,
        "max_tokens": prompt::ANALYSIS_MAX_TOKENS,
        "messages": [
            { "role": "system", "content": prompt::ANALYSIS_SYSTEM_PROMPT },
            {
                "role": "user",
                "content": [
                    { "type": "text", "text": prompt::ANALYSIS_USER_PROMPT },
                    { "type": "text", "text": prompt::DESIGN_CAPTION },
                    { "type": "image_url", "image_url": { "url": design.data_url() } },
                    { "type": "text", "text": prompt::WEBSITE_CAPTION },
                    { "type": "image_url", "image_url": { "url": website.data_url() } },
                ]
            }
        ]
    })
}

pub fn summary_body(model: &str, findings_json: &str) -> Value {
    json!({
        "model": model,
        "max_tokens": prompt::SUMMARY_MAX_TOKENS,
        "messages": [
            { "role": "system", "content": prompt::SUMMARY_SYSTEM_PROMPT },
            { "role": "user", "content": prompt::summary_user_prompt(findings_json) },
        ]
    })
}

/// Text of the first choice.
pub fn extract_text(response: &Value) -> Result<String, VisionError> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| VisionError::parse("openai response has no message content"))
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use designdiff_core::{DiscrepancyStatus, DiscrepancyType};

    use super::*;
    use crate::http::stub;

    fn screenshots() -> (tempfile::TempDir, PathBuf, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let design = dir.path().join("design.png");
        let website = dir.path().join("website.jpg");
        std::fs::write(&design, b"PNG").unwrap();
        std::fs::write(&website, b"JPG").unwrap();
        (dir, design, website)
    }

    fn configured(base_url: String) -> OpenAiProvider {
        OpenAiProvider::new(ProviderConfig::new(Some("sk-test".into()), DEFAULT_MODEL, base_url)).unwrap()
    }

    fn image(media_type: &'static str) -> EncodedImage {
        EncodedImage {
            media_type,
            base64: "AAAA".to_string(),
        }
    }

    #[test]
    fn analysis_body_embeds_both_images_in_order() {
        let body = analysis_body("gpt-4o", &image("image/png"), &image("image/jpeg"));

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"][0]["role"], "system");
        let parts = body["messages"][1]["content"].as_array().unwrap();
        let urls: Vec<&str> = parts
            .iter()
            .filter_map(|p| p.pointer("/image_url/url").and_then(Value::as_str))
            .collect();
        assert_eq!(urls, vec!["data:image/png;base64,AAAA", "data:image/jpeg;base64,AAAA"]);
    }

    #[test]
    fn extract_text_reads_first_choice() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": "[]" } }]
        });
        assert_eq!(extract_text(&response).unwrap(), "[]");
    }

    #[test]
    fn extract_text_without_choices_is_parse_error() {
        let err = extract_text(&json!({ "choices": [] })).unwrap_err();
        assert!(matches!(err, VisionError::AnalysisParse(_)));
    }

    #[tokio::test]
    async fn unconfigured_provider_fails_fast() {
        let provider = OpenAiProvider::new(ProviderConfig::new(None, DEFAULT_MODEL, DEFAULT_BASE_URL)).unwrap();
        let err = provider
            .analyze_image_differences(Path::new("a.png"), Path::new("b.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, VisionError::NotConfigured(ProviderKind::OpenAi)));
    }

    #[tokio::test]
    async fn analysis_posts_chat_completion_with_bearer_key() {
        let content = "Differences found:\n[{\"title\":\"Button color\",\"type\":\"color\",\
                       \"priority\":\"high\",\"coordinates\":{\"x\":10,\"y\":10,\"height\":20}}]";
        let answer = json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] });
        let (base_url, server) = stub::serve_once(200, answer.to_string()).await;
        let (_dir, design, website) = screenshots();

        let items = configured(base_url)
            .analyze_image_differences(&design, &website)
            .await
            .unwrap();

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].title, "Button color");
        assert_eq!(items[0].kind, DiscrepancyType::Color);
        assert_eq!(items[0].status, DiscrepancyStatus::Open);
        assert_eq!(items[0].coordinates.width, 10.0);

        let request = server.await.unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.path, "/v1/chat/completions");
        assert_eq!(request.header("authorization"), Some("Bearer sk-test"));
        assert_eq!(request.body["model"], DEFAULT_MODEL);
        let parts = &request.body["messages"][1]["content"];
        assert_eq!(parts[2]["image_url"]["url"], "data:image/png;base64,UE5H");
        assert_eq!(parts[4]["image_url"]["url"], "data:image/jpeg;base64,SlBH");
    }

    #[tokio::test]
    async fn unavailable_service_is_a_transient_api_error() {
        let (base_url, _server) = stub::serve_once(503, r#"{"error":"overloaded"}"#.into()).await;
        let (_dir, design, website) = screenshots();

        let err = configured(base_url)
            .analyze_image_differences(&design, &website)
            .await
            .unwrap_err();

        assert!(matches!(err, VisionError::Api { status: 503, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn summary_round_trip() {
        let answer = json!({ "choices": [{ "message": { "content": "  One color mismatch. " } }] });
        let (base_url, server) = stub::serve_once(200, answer.to_string()).await;

        let summary = configured(base_url).generate_summary(&[]).await.unwrap();
        assert_eq!(summary, "One color mismatch.");

        let request = server.await.unwrap();
        assert_eq!(request.path, "/v1/chat/completions");
        assert_eq!(request.body["messages"][0]["content"], prompt::SUMMARY_SYSTEM_PROMPT);
    }
}
