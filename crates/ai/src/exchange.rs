//! Analysis and summary flow shared by the provider clients.
//!
//! Each client only supplies its request-body builders and a `complete`
//! function that sends a body and returns the model's text.

use std::future::Future;
use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::error::VisionError;
use crate::finding::VisualDiscrepancy;
use crate::image::{EncodedImage, load_image};
use crate::normalize::parse_discrepancies;
use crate::provider::{ProviderConfig, ProviderKind};

pub(crate) type AnalysisBody = fn(&str, &EncodedImage, &EncodedImage) -> Value;
pub(crate) type SummaryBody = fn(&str, &str) -> Value;

/// Load both images, ask the model to compare them, normalize the answer.
pub(crate) async fn analyze<F, Fut>(
    kind: ProviderKind,
    config: &ProviderConfig,
    design_image: &Path,
    website_image: &Path,
    build_body: AnalysisBody,
    complete: F,
) -> Result<Vec<VisualDiscrepancy>, VisionError>
where
    F: FnOnce(Value) -> Fut,
    Fut: Future<Output = Result<String, VisionError>>,
{
    if !config.is_configured() {
        return Err(VisionError::NotConfigured(kind));
    }

    let design = load_image(design_image).await?;
    let website = load_image(website_image).await?;

    debug!(provider = %kind, model = %config.model, "requesting image comparison");
    let text = complete(build_body(&config.model, &design, &website)).await?;

    parse_discrepancies(&text)
}

/// Ask the model for a short summary; a blank answer counts as a parse failure.
pub(crate) async fn summarize<F, Fut>(
    config: &ProviderConfig,
    discrepancies: &[VisualDiscrepancy],
    build_body: SummaryBody,
    complete: F,
) -> Result<String, VisionError>
where
    F: FnOnce(Value) -> Fut,
    Fut: Future<Output = Result<String, VisionError>>,
{
    let findings = serde_json::to_string_pretty(discrepancies)
        .map_err(|e| VisionError::parse(e.to_string()))?;

    let text = complete(build_body(&config.model, &findings)).await?;

    let text = text.trim();
    if text.is_empty() {
        return Err(VisionError::parse("empty summary"));
    }
    Ok(text.to_string())
}
