//! Image resizing under spawn_blocking
//!
//! Decode, bake EXIF orientation, resize with Lanczos3, encode JPEG.

use crate::shared::error::{CoreError, CoreResult};
use image::{imageops::FilterType, DynamicImage};
use std::io::Cursor;

const JPEG_QUALITY: u8 = 85;

/// Apply an EXIF orientation tag (1..=8) so viewers need no rotation logic.
fn bake_orientation(img: DynamicImage, orientation: Option<u32>) -> DynamicImage {
    match orientation {
        Some(2) => img.fliph(),
        Some(3) => img.rotate180(),
        Some(4) => img.flipv(),
        Some(5) => img.rotate90().fliph(),
        Some(6) => img.rotate90(),
        Some(7) => img.rotate270().fliph(),
        Some(8) => img.rotate270(),
        _ => img,
    }
}

fn target_dimensions(width: u32, height: u32, max_edge: u32) -> (u32, u32) {
    if width <= max_edge && height <= max_edge {
        return (width, height);
    }
    if width >= height {
        let w = max_edge;
        let h = ((height as f64 / width as f64) * max_edge as f64).round() as u32;
        (w, h.max(1))
    } else {
        let h = max_edge;
        let w = ((width as f64 / height as f64) * max_edge as f64).round() as u32;
        (w.max(1), h)
    }
}

/// Render a JPEG thumbnail capped at `max_edge` on its longest side.
/// CPU-bound, so it runs on the blocking pool.
pub async fn render_thumbnail(
    source_bytes: Vec<u8>,
    max_edge: u32,
    orientation: Option<u32>,
) -> CoreResult<Vec<u8>> {
    tokio::task::spawn_blocking(move || {
        let img = image::load_from_memory(&source_bytes)
            .map_err(|e| CoreError::external("image-decode", e.to_string()))?;
        let img = bake_orientation(img, orientation);

        let (w, h) = target_dimensions(img.width(), img.height(), max_edge);
        let resized = if (w, h) == (img.width(), img.height()) {
            img
        } else {
            img.resize_exact(w, h, FilterType::Lanczos3)
        };

        let mut buf = Cursor::new(Vec::new());
        let encoder =
            image::codecs::jpeg::JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY);
        resized
            .to_rgb8()
            .write_with_encoder(encoder)
            .map_err(|e| CoreError::external("jpeg-encode", e.to_string()))?;
        Ok(buf.into_inner())
    })
    .await
    .map_err(|e| CoreError::internal(format!("thumbnail task join: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_png(width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
        });
        let mut buf = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut buf, image::ImageFormat::Png)
            .unwrap();
        buf.into_inner()
    }

    #[test]
    fn dimension_math() {
        assert_eq!(target_dimensions(1920, 1080, 400), (400, 225));
        assert_eq!(target_dimensions(1080, 1920, 400), (225, 400));
        // Already small: untouched
        assert_eq!(target_dimensions(300, 200, 400), (300, 200));
    }

    #[tokio::test]
    async fn renders_capped_jpeg() {
        let png = sample_png(1600, 900);
        let jpeg = render_thumbnail(png, 400, None).await.unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 400);
        assert_eq!(decoded.height(), 225);
    }

    #[tokio::test]
    async fn orientation_rotates_dimensions() {
        let png = sample_png(800, 400);
        // Orientation 6 = 90 degrees clockwise: landscape becomes portrait.
        let jpeg = render_thumbnail(png, 800, Some(6)).await.unwrap();
        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (400, 800));
    }

    #[tokio::test]
    async fn garbage_input_is_external_error() {
        let err = render_thumbnail(vec![0u8; 64], 400, None).await.unwrap_err();
        assert_eq!(err.kind(), crate::shared::error::ErrorKind::External);
    }
}
