//! Image transcoding: fit a decoded region into a byte-size budget.
//!
//! Vision APIs reject oversized payloads, so every region is normalised
//! before transmission: a proportional Lanczos downscale when a dimension
//! exceeds the configured maximum, then a fixed JPEG quality ladder until the
//! result fits the byte ceiling. The terminal fallback (harder downscale at a
//! fixed lower quality) is returned unconditionally — in pathological cases
//! it may still exceed the ceiling, and the contract accepts that.
//!
//! Transcoding never raises for a validly decoded input: an internal encode
//! failure degrades to the region's extraction-form bytes, unchanged, with a
//! `warn!` log.

use crate::config::WalkConfig;
use crate::pipeline::extract::Region;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use serde::{Deserialize, Serialize};
use std::io::Cursor;
use tracing::{debug, warn};

/// Re-encode qualities tried, in order, against the byte ceiling.
pub const JPEG_QUALITY_LADDER: [u8; 4] = [90, 85, 80, 75];

/// Quality used for the terminal fallback encode.
pub const FALLBACK_JPEG_QUALITY: u8 = 70;

/// The transcoded form of a region, owned by the caller once returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncodedImage {
    /// JPEG bytes ready for transmission.
    pub bytes: Vec<u8>,
}

impl EncodedImage {
    pub fn size_bytes(&self) -> usize {
        self.bytes.len()
    }
}

/// Transcode a region to fit the configured budget.
///
/// On internal failure the region's extraction-form bytes are returned
/// unmodified (explicit degrade-to-original policy).
pub fn transcode(region: &Region, config: &WalkConfig) -> EncodedImage {
    match shrink_to_budget(&region.pixels, config) {
        Ok(encoded) => encoded,
        Err(e) => {
            warn!(
                page = region.page_number,
                image = region.source_index,
                error = %e,
                "transcode failed; returning extraction bytes unchanged"
            );
            EncodedImage {
                bytes: region.jpeg.clone(),
            }
        }
    }
}

fn shrink_to_budget(
    image: &DynamicImage,
    config: &WalkConfig,
) -> Result<EncodedImage, image::ImageError> {
    let resized;
    let working: &DynamicImage = if image.width().max(image.height()) > config.max_dimension {
        resized = image.resize(config.max_dimension, config.max_dimension, FilterType::Lanczos3);
        debug!(
            from_w = image.width(),
            from_h = image.height(),
            to_w = resized.width(),
            to_h = resized.height(),
            "downscaled region to dimension cap"
        );
        &resized
    } else {
        image
    };

    for &quality in &JPEG_QUALITY_LADDER {
        let bytes = encode_jpeg(working, quality)?;
        if bytes.len() <= config.max_image_bytes {
            debug!(quality, size = bytes.len(), "region fits byte ceiling");
            return Ok(EncodedImage { bytes });
        }
    }

    // Terminal fallback: harder downscale (never upscaling) at a fixed lower
    // quality, returned whether or not it meets the ceiling.
    let floored;
    let fallback: &DynamicImage =
        if working.width().max(working.height()) > config.fallback_dimension {
            floored = working.resize(
                config.fallback_dimension,
                config.fallback_dimension,
                FilterType::Lanczos3,
            );
            &floored
        } else {
            working
        };
    let bytes = encode_jpeg(fallback, FALLBACK_JPEG_QUALITY)?;
    debug!(
        quality = FALLBACK_JPEG_QUALITY,
        size = bytes.len(),
        ceiling = config.max_image_bytes,
        "quality ladder exhausted; returning fallback encoding"
    );
    Ok(EncodedImage { bytes })
}

/// JPEG-encode an image at the given quality into an in-memory buffer.
pub(crate) fn encode_jpeg(
    image: &DynamicImage,
    quality: u8,
) -> Result<Vec<u8>, image::ImageError> {
    // JPEG has no alpha channel; flatten to RGB first.
    let rgb = image.to_rgb8();
    let mut buf = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(Cursor::new(&mut buf), quality);
    encoder.encode_image(&rgb)?;
    Ok(buf)
}
