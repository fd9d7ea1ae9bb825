//! Image resizing service.

use std::io::Cursor;

use image::imageops::FilterType;
use image::{DynamicImage, ImageFormat};
use thiserror::Error;
use tracing::debug;

/// Mime type of every image produced by this crate.
pub const OUTPUT_MIME_TYPE: &str = "image/png";

/// Maximum accepted upload size (in bytes).
pub const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024; // 20 MB

/// Imaging errors.
#[derive(Error, Debug)]
pub enum ImageError {
    #[error("Image is empty")]
    Empty,

    #[error("Image data exceeds {}MB limit", MAX_UPLOAD_BYTES / (1024 * 1024))]
    TooLarge,

    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("Invalid target size {0}x{1}")]
    InvalidTarget(u32, u32),

    #[error("Unable to decode image: {0}")]
    Decode(String),

    #[error("Unable to encode image: {0}")]
    Encode(String),
}

pub type ImageResult<T> = Result<T, ImageError>;

/// Contract for turning uploaded bytes into a bounded, re-encoded image.
///
/// Implementations must be deterministic: the same input and target always
/// yield the same bytes.
pub trait ImageResizer: Send + Sync {
    fn resize(&self, bytes: &[u8], max_width: u32, max_height: u32) -> ImageResult<Vec<u8>>;

    /// Mime type of the bytes returned by [`ImageResizer::resize`].
    fn output_mime_type(&self) -> &'static str {
        OUTPUT_MIME_TYPE
    }
}

/// Resizer backed by the `image` crate, always producing PNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct PngResizer {
    filter: ResizeQuality,
}

/// Resampling filter choice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ResizeQuality {
    /// Catmull-Rom, sharper output.
    #[default]
    High,
    /// Triangle, cheaper.
    Fast,
}

impl PngResizer {
    pub fn new(filter: ResizeQuality) -> Self {
        Self { filter }
    }
}

impl ImageResizer for PngResizer {
    fn resize(&self, bytes: &[u8], max_width: u32, max_height: u32) -> ImageResult<Vec<u8>> {
        check_upload_size(bytes)?;
        if max_width == 0 || max_height == 0 {
            return Err(ImageError::InvalidTarget(max_width, max_height));
        }

        let image =
            image::load_from_memory(bytes).map_err(|e| ImageError::Decode(e.to_string()))?;
        let (w, h) = (image.width(), image.height());
        let (new_w, new_h) = fit_within(w, h, max_width, max_height);

        debug!(
            from = format!("{w}x{h}"),
            to = format!("{new_w}x{new_h}"),
            "Resizing image"
        );

        let filter = match self.filter {
            ResizeQuality::High => FilterType::CatmullRom,
            ResizeQuality::Fast => FilterType::Triangle,
        };
        let resized = if (new_w, new_h) == (w, h) {
            image
        } else {
            image.resize_exact(new_w, new_h, filter)
        };

        encode_png(&resized)
    }
}

/// Reject empty and oversized uploads before decoding.
pub fn check_upload_size(bytes: &[u8]) -> ImageResult<()> {
    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }
    if bytes.len() > MAX_UPLOAD_BYTES {
        return Err(ImageError::TooLarge);
    }
    Ok(())
}

/// Dimensions that fit inside `max_width` x `max_height` while preserving the
/// aspect ratio. Images already inside the box are left at their size.
pub fn fit_within(width: u32, height: u32, max_width: u32, max_height: u32) -> (u32, u32) {
    if width == 0 || height == 0 {
        return (width, height);
    }
    if width <= max_width && height <= max_height {
        return (width, height);
    }

    let scale_w = max_width as f64 / width as f64;
    let scale_h = max_height as f64 / height as f64;
    let scale = scale_w.min(scale_h);

    let new_w = ((width as f64 * scale).round() as u32).clamp(1, max_width);
    let new_h = ((height as f64 * scale).round() as u32).clamp(1, max_height);
    (new_w, new_h)
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> ImageResult<Vec<u8>> {
    // PNG cannot hold float channels; normalise to 8-bit RGBA first.
    let rgba = DynamicImage::ImageRgba8(image.to_rgba8());
    let mut cursor = Cursor::new(Vec::new());
    rgba.write_to(&mut cursor, ImageFormat::Png)
        .map_err(|e| ImageError::Encode(format!("PNG encoding failed: {e}")))?;
    Ok(cursor.into_inner())
}
