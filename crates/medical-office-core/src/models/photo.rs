//! Stored patient images.

use base64::Engine as _;
use serde::{Deserialize, Serialize};

/// Encoded image bytes as kept in the photo and thumbnail tables.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StoredImage {
    pub content: Vec<u8>,
    pub mime_type: String,
}

impl StoredImage {
    pub fn new(content: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            content,
            mime_type: mime_type.into(),
        }
    }

    /// `data:` URI for inline display.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, base64::engine::general_purpose::STANDARD.encode(&self.content))
    }
}

impl std::fmt::Debug for StoredImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoredImage")
            .field("mime_type", &self.mime_type)
            .field("bytes", &self.content.len())
            .finish()
    }
}

impl From<medical_office_imaging::EncodedImage> for StoredImage {
    fn from(image: medical_office_imaging::EncodedImage) -> Self {
        Self {
            content: image.content,
            mime_type: image.mime_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_data_uri() {
        let img = StoredImage::new(b"Man".to_vec(), "image/png");
        assert_eq!(img.data_uri(), "data:image/png;base64,TWFu");
        let img = StoredImage::new(b"M".to_vec(), "image/jpeg");
        assert_eq!(img.data_uri(), "data:image/jpeg;base64,TQ==");
    }

    #[test]
    fn test_debug_hides_bytes() {
        let img = StoredImage::new(vec![0; 1024], "image/png");
        assert_eq!(format!("{:?}", img), "StoredImage { mime_type: \"image/png\", bytes: 1024 }");
    }
}
