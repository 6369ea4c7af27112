//! # Image Transform Module
//!
//! Questo modulo gestisce il ridimensionamento e la ricompressione delle
//! immagini, interamente in-process (nessun tool esterno).
//!
//! ## Responsabilità:
//! - Lettura delle dimensioni senza decodifica completa
//! - Downscale a larghezza target con altezza proporzionale (Lanczos)
//! - Ricodifica: PNG lossless a compressione massima, JPEG qualità 85
//!   progressivo con tabelle di Huffman ottimizzate
//! - Copia byte-per-byte quando l'immagine è già entro la larghezza target
//!
//! ## Regole di ridimensionamento:
//! - Si ridimensiona solo verso il basso, mai upscale
//! - Altezza = round(h * target_w / w), mai sotto 1 pixel
//! - Il formato di uscita è quello del file sorgente
//!
//! ## Esempio:
//! ```rust,ignore
//! let outcome = ImageTransformer::process(
//!     &source,
//!     &dest,
//!     ImageParams { target_width: 1280 },
//! )?;
//! ```

use crate::error::PipelineError;
use crate::rules::ImageParams;
use image::codecs::png::{CompressionType, FilterType as PngFilterType, PngEncoder};
use image::imageops::FilterType;
use image::{ColorType, DynamicImage, ImageEncoder};
use jpeg_encoder::{ColorType as JpegColorType, Encoder as JpegEncoder};
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::debug;

/// Fixed JPEG re-encode quality, good size/quality balance for web photos
const JPEG_QUALITY: u8 = 85;

/// What happened to an image job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageOutcome {
    /// Source was wider than the target and got re-encoded at new dimensions
    Resized { width: u32, height: u32 },
    /// Source already fit the target width and was copied byte-for-byte
    CopiedThrough,
}

/// In-process image resizer and encoder.
///
/// All methods are synchronous and CPU-bound; callers on an async runtime
/// should run them on a blocking thread.
pub struct ImageTransformer;

impl ImageTransformer {
    /// Transform one image according to its matched rule parameters.
    ///
    /// Images at or below the target width are copied unchanged, so a
    /// second run over already-compressed output is a no-op.
    pub fn process(
        source: &Path,
        dest: &Path,
        params: ImageParams,
    ) -> Result<ImageOutcome, PipelineError> {
        let (width, height) = image::image_dimensions(source)?;

        if width <= params.target_width {
            debug!(
                "{} is {}px wide, within target {}px, copying as-is",
                source.display(),
                width,
                params.target_width
            );
            if let Some(parent) = dest.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(source, dest)?;
            return Ok(ImageOutcome::CopiedThrough);
        }

        let img = image::open(source)?;
        let target_width = params.target_width;
        let target_height = scaled_height(width, height, target_width);

        debug!(
            "Resizing {} from {}x{} to {}x{}",
            source.display(),
            width,
            height,
            target_width,
            target_height
        );

        let resized = img.resize_exact(target_width, target_height, FilterType::Lanczos3);
        Self::encode(&resized, dest)?;

        Ok(ImageOutcome::Resized {
            width: target_width,
            height: target_height,
        })
    }

    /// Encode an image to `dest`, choosing the codec from the extension
    fn encode(img: &DynamicImage, dest: &Path) -> Result<(), PipelineError> {
        if let Some(parent) = dest.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let ext = dest
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "png" => {
                let writer = BufWriter::new(File::create(dest)?);
                let encoder = PngEncoder::new_with_quality(
                    writer,
                    CompressionType::Best,
                    PngFilterType::Adaptive,
                );
                encoder.write_image(img.as_bytes(), img.width(), img.height(), img.color())?;
            }
            "jpg" | "jpeg" => {
                let (width, height) = (img.width(), img.height());
                if width > u16::MAX as u32 || height > u16::MAX as u32 {
                    return Err(PipelineError::Encode(format!(
                        "{}x{} exceeds the JPEG dimension limit",
                        width, height
                    )));
                }

                let mut encoder = JpegEncoder::new_file(dest, JPEG_QUALITY)
                    .map_err(|e| PipelineError::Encode(e.to_string()))?;
                encoder.set_progressive(true);
                encoder.set_optimized_huffman_tables(true);

                // JPEG has no alpha; keep grayscale single-channel, flatten
                // everything else to RGB.
                match img.color() {
                    ColorType::L8 | ColorType::L16 | ColorType::La8 | ColorType::La16 => {
                        let gray = img.to_luma8();
                        encoder
                            .encode(gray.as_raw(), width as u16, height as u16, JpegColorType::Luma)
                            .map_err(|e| PipelineError::Encode(e.to_string()))?;
                    }
                    _ => {
                        let rgb = img.to_rgb8();
                        encoder
                            .encode(rgb.as_raw(), width as u16, height as u16, JpegColorType::Rgb)
                            .map_err(|e| PipelineError::Encode(e.to_string()))?;
                    }
                }
            }
            _ => {
                // Rules normally route only png/jpeg here; let the library
                // pick a codec for anything else a custom table sends.
                img.save(dest)?;
            }
        }

        Ok(())
    }
}

/// Proportional height for a width-constrained downscale, rounded to the
/// nearest pixel and clamped to at least 1.
pub fn scaled_height(width: u32, height: u32, target_width: u32) -> u32 {
    let scaled = (height as f64 * target_width as f64 / width as f64).round() as u32;
    scaled.max(1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};
    use tempfile::TempDir;

    fn make_rgb_image(path: &Path, width: u32, height: u32) {
        let img = RgbImage::from_fn(width, height, |x, y| {
            Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
        });
        img.save(path).unwrap();
    }

    #[test]
    fn test_wide_image_resized_to_target_width() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.png");
        let dest = dir.path().join("out").join("photo.png");
        make_rgb_image(&source, 800, 600);

        let outcome = ImageTransformer::process(
            &source,
            &dest,
            ImageParams { target_width: 256 },
        )
        .unwrap();

        assert_eq!(
            outcome,
            ImageOutcome::Resized {
                width: 256,
                height: 192,
            }
        );
        assert_eq!(image::image_dimensions(&dest).unwrap(), (256, 192));
    }

    #[test]
    fn test_scaled_height_rounds_to_nearest() {
        // 3/5 of 3 is 1.8, which must round up, not truncate
        assert_eq!(scaled_height(5, 3, 3), 2);
        assert_eq!(scaled_height(800, 600, 256), 192);
        assert_eq!(scaled_height(333, 100, 100), 30);
    }

    #[test]
    fn test_scaled_height_never_zero() {
        assert_eq!(scaled_height(10_000, 1, 100), 1);
    }

    #[test]
    fn test_narrow_image_copied_byte_identical() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("small.jpg");
        let dest = dir.path().join("out").join("small.jpg");
        make_rgb_image(&source, 100, 80);

        let outcome = ImageTransformer::process(
            &source,
            &dest,
            ImageParams { target_width: 256 },
        )
        .unwrap();

        assert_eq!(outcome, ImageOutcome::CopiedThrough);
        assert_eq!(
            std::fs::read(&source).unwrap(),
            std::fs::read(&dest).unwrap()
        );
    }

    #[test]
    fn test_exact_target_width_is_copied_not_reencoded() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("exact.png");
        let dest = dir.path().join("exact_out.png");
        make_rgb_image(&source, 256, 100);

        let outcome = ImageTransformer::process(
            &source,
            &dest,
            ImageParams { target_width: 256 },
        )
        .unwrap();

        assert_eq!(outcome, ImageOutcome::CopiedThrough);
    }

    #[test]
    fn test_second_pass_over_output_is_stable() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        let first = dir.path().join("first.jpg");
        let second = dir.path().join("second.jpg");
        make_rgb_image(&source, 1000, 500);

        let params = ImageParams { target_width: 300 };
        ImageTransformer::process(&source, &first, params).unwrap();
        let outcome = ImageTransformer::process(&first, &second, params).unwrap();

        // The first pass brought the image within budget, so the second
        // pass must copy bytes untouched.
        assert_eq!(outcome, ImageOutcome::CopiedThrough);
        assert_eq!(
            std::fs::read(&first).unwrap(),
            std::fs::read(&second).unwrap()
        );
    }

    #[test]
    fn test_resized_jpeg_is_progressive() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("photo.jpg");
        let dest = dir.path().join("out.jpg");
        make_rgb_image(&source, 800, 600);

        ImageTransformer::process(&source, &dest, ImageParams { target_width: 256 }).unwrap();

        // A progressive stream opens its frame with SOF2; baseline uses
        // SOF0. 0xFF bytes inside entropy data are always stuffed, so a
        // raw marker scan is reliable.
        let bytes = std::fs::read(&dest).unwrap();
        assert!(bytes.windows(2).any(|m| m == [0xFF, 0xC2]));
        assert!(!bytes.windows(2).any(|m| m == [0xFF, 0xC0]));
        assert_eq!(image::image_dimensions(&dest).unwrap(), (256, 192));
    }

    #[test]
    fn test_grayscale_jpeg_stays_single_channel() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("gray.jpg");
        let dest = dir.path().join("gray_out.jpg");
        let img = GrayImage::from_fn(400, 200, |x, _| Luma([(x % 256) as u8]));
        img.save(&source).unwrap();

        ImageTransformer::process(&source, &dest, ImageParams { target_width: 100 }).unwrap();

        let out = image::open(&dest).unwrap();
        assert_eq!(out.color(), ColorType::L8);
        assert_eq!(image::image_dimensions(&dest).unwrap(), (100, 50));
    }

    #[test]
    fn test_corrupt_image_reports_decode_error() {
        let dir = TempDir::new().unwrap();
        let source = dir.path().join("broken.jpg");
        let dest = dir.path().join("broken_out.jpg");
        std::fs::write(&source, b"definitely not a jpeg").unwrap();

        let result =
            ImageTransformer::process(&source, &dest, ImageParams { target_width: 256 });
        assert!(matches!(result, Err(PipelineError::Decode(_))));
        assert!(!dest.exists());
    }
}
