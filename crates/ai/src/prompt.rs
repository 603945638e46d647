//! Fixed prompts sent to both providers.

/// System instruction for the comparison call.
pub const ANALYSIS_SYSTEM_PROMPT: &str = "You are a meticulous UI/UX quality reviewer. \
You compare a design mockup with a screenshot of the implemented website and report \
visual discrepancies between them. You answer with JSON only.";

/// User instruction accompanying the two images.
pub const ANALYSIS_USER_PROMPT: &str = r#"The first image is the design mockup, the second image is the website screenshot.
List between 3 and 6 visual discrepancies where the website differs from the design.
Respond with a JSON array and nothing else. Each element must have this shape:
{
  "title": "short name of the issue",
  "description": "what differs and how to fix it",
  "type": "color" | "size" | "typography" | "position" | "layout" | "other",
  "priority": "high" | "medium" | "low",
  "coordinates": { "x": 0-100, "y": 0-100, "width": 0-100, "height": 0-100, "shape": "rectangle" | "circle" }
}
Coordinates are percentages of the website screenshot's width and height."#;

/// Caption placed before the design image.
pub const DESIGN_CAPTION: &str = "Design mockup:";

/// Caption placed before the website image.
pub const WEBSITE_CAPTION: &str = "Website screenshot:";

/// System instruction for the summary call.
pub const SUMMARY_SYSTEM_PROMPT: &str = "You summarize design review findings for a product team. \
Write two or three plain sentences, no lists, no markdown.";

/// User message for the summary call: the findings as pretty JSON.
pub fn summary_user_prompt(findings_json: &str) -> String {
    format!(
        "Summarize these visual discrepancies between a design and its implementation, \
         mentioning the most important ones first:\n{findings_json}"
    )
}

pub const ANALYSIS_MAX_TOKENS: u32 = 2000;
pub const SUMMARY_MAX_TOKENS: u32 = 300;
