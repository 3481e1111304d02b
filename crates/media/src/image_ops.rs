//! In-process image inspection.
//!
//! The engine does the heavy conversion work; this module only reads headers
//! to sniff formats and to check that produced stickers fill the canvas.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use crate::error::{Error, Result};

/// Image metadata.
#[derive(Debug, Clone)]
pub struct ImageMetadata {
    pub width: u32,
    pub height: u32,
    pub format: Option<ImageFormat>,
}

/// Get metadata about an image without fully decoding it.
pub fn get_image_metadata(data: &[u8]) -> Result<ImageMetadata> {
    let reader = ImageReader::new(Cursor::new(data))
        .with_guessed_format()
        .map_err(|e| Error::external("failed to guess image format", e))?;

    let format = reader.format();
    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| Error::external("failed to read image dimensions", e))?;

    Ok(ImageMetadata {
        width,
        height,
        format,
    })
}

/// Guess the MIME type of image bytes from their magic number.
pub fn sniff_mime(data: &[u8]) -> Option<&'static str> {
    let format = image::guess_format(data).ok()?;
    format_to_media_type(format)
}

/// Verify that `data` is an image of exactly `width`×`height`.
pub fn ensure_canvas(data: &[u8], width: u32, height: u32) -> Result<()> {
    let meta = get_image_metadata(data)
        .map_err(|e| Error::invalid_output(format!("output is not a readable image: {e}")))?;
    if (meta.width, meta.height) != (width, height) {
        return Err(Error::invalid_output(format!(
            "expected a {width}x{height} canvas, got {}x{}",
            meta.width, meta.height
        )));
    }
    Ok(())
}

/// Convert ImageFormat to MIME type string.
fn format_to_media_type(format: ImageFormat) -> Option<&'static str> {
    match format {
        ImageFormat::Jpeg => Some("image/jpeg"),
        ImageFormat::Png => Some("image/png"),
        ImageFormat::WebP => Some("image/webp"),
        ImageFormat::Gif => Some("image/gif"),
        ImageFormat::Bmp => Some("image/bmp"),
        _ => None,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod tests {
    use {
        super::*,
        image::{DynamicImage, RgbaImage},
    };

    /// Encode a transparent image of the given size.
    pub(crate) fn encode(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
        let img = DynamicImage::ImageRgba8(RgbaImage::new(width, height));
        let mut out = Cursor::new(Vec::new());
        img.write_to(&mut out, format).unwrap();
        out.into_inner()
    }

    #[test]
    fn reads_png_metadata() {
        let meta = get_image_metadata(&encode(40, 30, ImageFormat::Png)).unwrap();
        assert_eq!((meta.width, meta.height), (40, 30));
        assert_eq!(meta.format, Some(ImageFormat::Png));
    }

    #[test]
    fn sniffs_common_formats() {
        assert_eq!(sniff_mime(&encode(2, 2, ImageFormat::Png)), Some("image/png"));
        assert_eq!(sniff_mime(&encode(2, 2, ImageFormat::WebP)), Some("image/webp"));
        assert_eq!(sniff_mime(b"GIF89a\x01\x00\x01\x00"), Some("image/gif"));
        assert_eq!(sniff_mime(b"\x00\x00\x00\x18ftypmp42"), None);
    }

    #[test]
    fn canvas_check_accepts_sticker_size() {
        ensure_canvas(&encode(512, 512, ImageFormat::WebP), 512, 512).unwrap();
    }

    #[test]
    fn canvas_check_rejects_other_sizes_and_garbage() {
        let err = ensure_canvas(&encode(512, 300, ImageFormat::WebP), 512, 512).unwrap_err();
        assert!(err.to_string().contains("512x300"));

        let err = ensure_canvas(b"not an image", 512, 512).unwrap_err();
        assert!(matches!(err, Error::InvalidOutput { .. }));
    }
}
