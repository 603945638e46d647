//! Loading screenshots for upload to a vision model.

use std::path::Path;

use base64::{Engine as _, engine::general_purpose};

use crate::error::VisionError;

/// An image read from disk, ready to embed in a request body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub media_type: &'static str,
    pub base64: String,
}

impl EncodedImage {
    /// `data:` URL form used by the OpenAI chat API.
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.media_type, self.base64)
    }
}

/// Read an image file and base64-encode it.
pub async fn load_image(path: &Path) -> Result<EncodedImage, VisionError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|source| VisionError::ImageRead {
            path: path.to_path_buf(),
            source,
        })?;

    Ok(EncodedImage {
        media_type: media_type_for(path),
        base64: general_purpose::STANDARD.encode(bytes),
    })
}

/// MIME type from the file extension; uploads without one are treated as PNG.
pub fn media_type_for(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase());

    match ext.as_deref() {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("webp") => "image/webp",
        Some("gif") => "image/gif",
        _ => "image/png",
    }
}
