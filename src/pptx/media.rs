//! Raster images embedded in slides.

use std::io::Cursor;

/// Image encodings the writer can embed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageFormat {
    Png,
    Jpeg,
    Gif,
}

impl ImageFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Gif => "gif",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ImageFormat::Png => "image/png",
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Gif => "image/gif",
        }
    }

    /// Detect the format from the data, falling back to a MIME type hint.
    pub fn detect(data: &[u8], content_type: Option<&str>) -> Option<Self> {
        match image::guess_format(data) {
            Ok(image::ImageFormat::Png) => return Some(ImageFormat::Png),
            Ok(image::ImageFormat::Jpeg) => return Some(ImageFormat::Jpeg),
            Ok(image::ImageFormat::Gif) => return Some(ImageFormat::Gif),
            // Recognized, but not something a slide can embed.
            Ok(_) => return None,
            Err(_) => {}
        }
        match content_type?.split(';').next()?.trim() {
            "image/png" => Some(ImageFormat::Png),
            "image/jpeg" | "image/jpg" => Some(ImageFormat::Jpeg),
            "image/gif" => Some(ImageFormat::Gif),
            _ => None,
        }
    }
}

impl From<ImageFormat> for image::ImageFormat {
    fn from(format: ImageFormat) -> Self {
        match format {
            ImageFormat::Png => image::ImageFormat::Png,
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Gif => image::ImageFormat::Gif,
        }
    }
}

/// Encoded image bytes plus pixel size when the decoder could read it.
#[derive(Clone)]
pub struct Image {
    pub data: Vec<u8>,
    pub format: ImageFormat,
    pub dimensions: Option<(u32, u32)>,
}

impl std::fmt::Debug for Image {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Image")
            .field("format", &self.format)
            .field("bytes", &self.data.len())
            .field("dimensions", &self.dimensions)
            .finish()
    }
}

impl Image {
    pub fn new(data: Vec<u8>, format: ImageFormat) -> Self {
        let dimensions = image::ImageReader::with_format(Cursor::new(&data), format.into())
            .into_dimensions()
            .map_err(|e| tracing::debug!(?format, "Could not read image size: {}", e))
            .ok();
        Self {
            data,
            format,
            dimensions,
        }
    }

    /// Largest `(width, height)` that fits the box while keeping aspect ratio.
    pub fn fit_within(&self, max_w: i64, max_h: i64) -> (i64, i64) {
        match self.dimensions {
            Some((w, h)) if w > 0 && h > 0 => {
                let scale = f64::min(max_w as f64 / w as f64, max_h as f64 / h as f64);
                ((w as f64 * scale) as i64, (h as f64 * scale) as i64)
            }
            _ => (max_w, max_h),
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// A 1x1 transparent PNG.
    pub(crate) const TINY_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x08, 0x06, 0x00, 0x00, 0x00, 0x1F,
        0x15, 0xC4, 0x89, 0x00, 0x00, 0x00, 0x0A, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x00,
        0x01, 0x00, 0x00, 0x05, 0x00, 0x01, 0x0D, 0x0A, 0x2D, 0xB4, 0x00, 0x00, 0x00, 0x00, 0x49,
        0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// A 4x2 transparent PNG.
    const WIDE_PNG: &[u8] = &[
        0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A, 0x00, 0x00, 0x00, 0x0D, 0x49, 0x48, 0x44,
        0x52, 0x00, 0x00, 0x00, 0x04, 0x00, 0x00, 0x00, 0x02, 0x08, 0x06, 0x00, 0x00, 0x00, 0x7F,
        0xA8, 0x7D, 0x63, 0x00, 0x00, 0x00, 0x0B, 0x49, 0x44, 0x41, 0x54, 0x78, 0x9C, 0x63, 0x60,
        0x20, 0x04, 0x00, 0x00, 0x22, 0x00, 0x01, 0x5E, 0xB8, 0x21, 0xDB, 0x00, 0x00, 0x00, 0x00,
        0x49, 0x45, 0x4E, 0x44, 0xAE, 0x42, 0x60, 0x82,
    ];

    /// A 1x1 GIF.
    const TINY_GIF: &[u8] = &[
        0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0xFF, 0xFF,
        0xFF, 0x00, 0x00, 0x00, 0x21, 0xF9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2C, 0x00, 0x00,
        0x00, 0x00, 0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x02, 0x44, 0x01, 0x00, 0x3B,
    ];

    #[test]
    fn detects_png_and_reads_size() {
        assert_eq!(ImageFormat::detect(TINY_PNG, None), Some(ImageFormat::Png));
        let image = Image::new(WIDE_PNG.to_vec(), ImageFormat::Png);
        assert_eq!(image.dimensions, Some((4, 2)));
        assert_eq!(image.fit_within(1000, 1000), (1000, 500));
    }

    #[test]
    fn detects_gif_and_jpeg_signatures() {
        assert_eq!(ImageFormat::detect(TINY_GIF, None), Some(ImageFormat::Gif));
        assert_eq!(
            ImageFormat::detect(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10], Some("text/plain")),
            Some(ImageFormat::Jpeg)
        );
    }

    #[test]
    fn falls_back_to_content_type() {
        assert_eq!(
            ImageFormat::detect(b"????", Some("image/jpeg; charset=binary")),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(ImageFormat::detect(b"????", Some("text/html")), None);
        assert_eq!(ImageFormat::detect(b"????", None), None);
    }

    #[test]
    fn recognized_but_unembeddable_formats_are_refused() {
        // "BM" bitmap header, even when served as image/png.
        assert_eq!(ImageFormat::detect(b"BM\x3a\x00\x00\x00", Some("image/png")), None);
    }

    #[test]
    fn unreadable_header_keeps_full_box() {
        let image = Image::new(vec![0xFF, 0xD8, 0xFF, 0xE0], ImageFormat::Jpeg);
        assert_eq!(image.dimensions, None);
        assert_eq!(image.fit_within(1000, 800), (1000, 800));
    }
}
