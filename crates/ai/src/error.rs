use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::provider::ProviderKind;

/// Failure of a vision provider call.
///
/// None of these reach the end caller of a comparison run: the orchestrator
/// converts every one of them into the alternate-provider or fallback path.
#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to read image {}: {source}", path.display())]
    ImageRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("could not parse analysis response: {0}")]
    AnalysisParse(String),

    #[error("network error: {0}")]
    Http(String),

    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider call timed out after {0:?}")]
    Timeout(Duration),

    #[error("{0} provider is not configured (missing API key)")]
    NotConfigured(ProviderKind),
}

impl VisionError {
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::AnalysisParse(msg.into())
    }

    /// Whether repeating the same call could plausibly succeed.
    ///
    /// Unreadable images, unparseable answers and missing keys fail the same
    /// way every time.
    pub fn is_transient(&self) -> bool {
        match self {
            VisionError::Http(_) | VisionError::Timeout(_) => true,
            VisionError::Api { status, .. } => *status == 429 || *status >= 500,
            VisionError::ImageRead { .. }
            | VisionError::AnalysisParse(_)
            | VisionError::NotConfigured(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        assert!(VisionError::Http("reset".into()).is_transient());
        assert!(VisionError::Timeout(Duration::from_secs(1)).is_transient());
        assert!(VisionError::Api { status: 503, body: String::new() }.is_transient());
        assert!(VisionError::Api { status: 429, body: String::new() }.is_transient());
        assert!(!VisionError::Api { status: 400, body: String::new() }.is_transient());
        assert!(!VisionError::parse("no array").is_transient());
        assert!(!VisionError::NotConfigured(ProviderKind::OpenAi).is_transient());
    }

    #[test]
    fn image_read_message_names_the_path() {
        let err = VisionError::ImageRead {
            path: PathBuf::from("/tmp/missing.png"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        };
        assert!(err.to_string().contains("/tmp/missing.png"));
    }
}
