//! Two-size patient photo pipeline.

use tracing::info;

use crate::resize::{ImageError, ImageResizer, ImageResult};

/// Bounding box for one rendition of a photo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSize {
    pub max_width: u32,
    pub max_height: u32,
}

impl PhotoSize {
    pub const fn new(max_width: u32, max_height: u32) -> Self {
        Self {
            max_width,
            max_height,
        }
    }
}

/// Target sizes for the full photo and its thumbnail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoSizes {
    pub photo: PhotoSize,
    pub thumbnail: PhotoSize,
}

impl Default for PhotoSizes {
    fn default() -> Self {
        Self {
            photo: PhotoSize::new(500, 600),
            thumbnail: PhotoSize::new(75, 90),
        }
    }
}

/// Encoded image bytes with their mime type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedImage {
    pub content: Vec<u8>,
    pub mime_type: String,
}

/// Both renditions of an uploaded photo, ready to be attached to a patient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedPhoto {
    pub photo: EncodedImage,
    pub thumbnail: EncodedImage,
}

/// Decode an upload and produce the photo and thumbnail renditions.
///
/// `mime_type` is the type declared by the uploader; anything that is not an
/// `image/*` type is refused before decoding.
pub fn process_upload(
    resizer: &dyn ImageResizer,
    bytes: &[u8],
    mime_type: &str,
    sizes: PhotoSizes,
) -> ImageResult<ProcessedPhoto> {
    if !mime_type.trim().to_ascii_lowercase().starts_with("image/") {
        return Err(ImageError::UnsupportedType(mime_type.to_string()));
    }

    let photo = resizer.resize(bytes, sizes.photo.max_width, sizes.photo.max_height)?;
    let thumbnail = resizer.resize(
        bytes,
        sizes.thumbnail.max_width,
        sizes.thumbnail.max_height,
    )?;

    info!(
        upload_bytes = bytes.len(),
        photo_bytes = photo.len(),
        thumbnail_bytes = thumbnail.len(),
        "Processed patient photo"
    );

    let mime = resizer.output_mime_type().to_string();
    Ok(ProcessedPhoto {
        photo: EncodedImage {
            content: photo,
            mime_type: mime.clone(),
        },
        thumbnail: EncodedImage {
            content: thumbnail,
            mime_type: mime,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resize::tests::png_bytes;
    use crate::resize::PngResizer;

    #[test]
    fn test_process_upload_two_sizes() {
        let resizer = PngResizer::default();
        let processed =
            process_upload(&resizer, &png_bytes(1000, 1200), "image/png", PhotoSizes::default())
                .unwrap();

        let photo = image::load_from_memory(&processed.photo.content).unwrap();
        let thumb = image::load_from_memory(&processed.thumbnail.content).unwrap();
        assert_eq!((photo.width(), photo.height()), (500, 600));
        assert_eq!((thumb.width(), thumb.height()), (75, 90));
        assert_eq!(processed.photo.mime_type, "image/png");
        assert_eq!(processed.thumbnail.mime_type, "image/png");
    }

    #[test]
    fn test_process_upload_rejects_non_image_type() {
        let resizer = PngResizer::default();
        let result = process_upload(
            &resizer,
            &png_bytes(10, 10),
            "application/pdf",
            PhotoSizes::default(),
        );
        assert!(matches!(result, Err(ImageError::UnsupportedType(_))));
    }

    #[test]
    fn test_process_upload_accepts_jpeg_declared_type() {
        // Declared type only gates; decoding sniffs the real format.
        let resizer = PngResizer::default();
        let processed =
            process_upload(&resizer, &png_bytes(20, 20), "IMAGE/JPEG", PhotoSizes::default());
        assert!(processed.is_ok());
    }
}
