//! Raster region extraction: enumerate the embedded images on a PDF page.
//!
//! Extraction is two-phase. Phase one walks the page's object list through
//! pdfium, decodes each raster object, and re-encodes it to the lossy JPEG
//! form the rest of the pipeline analyses and transmits. Phase two
//! ([`decode_candidates`]) turns those byte buffers back into pixel buffers,
//! skipping anything that will not decode.
//!
//! Failure scope is deliberately narrow: a bad image is skipped (siblings
//! and the page survive), and a page that cannot be enumerated yields an
//! empty region list. Neither propagates an error to the caller — every
//! recovery leaves a [`RegionFailure`] record and a log line naming the page
//! and image index. pdfium-side buffers are copied out eagerly, so native
//! handles are released as each loop iteration ends.

use crate::error::RegionFailure;
use crate::pipeline::transcode::encode_jpeg;
use image::DynamicImage;
use pdfium_render::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Quality of the intermediate JPEG form produced during extraction.
const ANALYSIS_JPEG_QUALITY: u8 = 90;

/// Position of a region on its page, in PDF points (bottom-left origin).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct RegionBounds {
    pub left: f32,
    pub bottom: f32,
    pub right: f32,
    pub top: f32,
}

/// One embedded raster image found on a document page.
///
/// Owned by the page that contains it; immutable after extraction.
#[derive(Debug, Clone)]
pub struct Region {
    /// 1-based page number the region was extracted from.
    pub page_number: usize,
    /// Ordinal of the image object on the page, in extraction order (not
    /// spatial order). Unique within a page.
    pub source_index: usize,
    /// Bounding box on the page.
    pub bounds: RegionBounds,
    /// Decoded pixel buffer.
    pub pixels: DynamicImage,
    /// The lossy analysis/transmission form produced during extraction.
    pub jpeg: Vec<u8>,
}

/// A re-encoded image awaiting pixel decode.
#[derive(Debug, Clone)]
pub struct RegionCandidate {
    pub source_index: usize,
    pub bounds: RegionBounds,
    pub jpeg: Vec<u8>,
}

/// The outcome of extracting one page: surviving regions plus the recorded
/// failures.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub regions: Vec<Region>,
    pub failures: Vec<RegionFailure>,
}

/// Extract every raster region from a page, in extraction order.
///
/// Never fails: decode problems are recorded and skipped per image.
pub fn extract_regions(page: &PdfPage, page_number: usize) -> PageExtraction {
    let mut candidates = Vec::new();
    let mut failures = Vec::new();
    let mut image_index = 0usize;

    for object in page.objects().iter() {
        let PdfPageObject::Image(ref image_object) = object else {
            continue;
        };
        let source_index = image_index;
        image_index += 1;

        let decoded = match image_object.get_raw_image() {
            Ok(decoded) => decoded,
            Err(e) => {
                warn!(
                    page = page_number,
                    image = source_index,
                    error = ?e,
                    "embedded image failed to decode; skipping"
                );
                failures.push(RegionFailure::ImageDecodeFailed {
                    page: page_number,
                    image_index: source_index,
                    detail: format!("{e:?}"),
                });
                continue;
            }
        };

        let color = decoded.color();
        if exceeds_color_channels(color.channel_count(), color.has_alpha() as u8) {
            debug!(
                page = page_number,
                image = source_index,
                color = ?color,
                "skipping image with unsupported colour layout"
            );
            continue;
        }

        let bounds = match image_object.bounds() {
            Ok(b) => RegionBounds {
                left: b.left().value,
                bottom: b.bottom().value,
                right: b.right().value,
                top: b.top().value,
            },
            Err(e) => {
                debug!(page = page_number, image = source_index, error = ?e, "no bounds for image object");
                RegionBounds::default()
            }
        };

        match encode_jpeg(&decoded, ANALYSIS_JPEG_QUALITY) {
            Ok(jpeg) => candidates.push(RegionCandidate {
                source_index,
                bounds,
                jpeg,
            }),
            Err(e) => {
                warn!(
                    page = page_number,
                    image = source_index,
                    error = %e,
                    "embedded image failed to re-encode; skipping"
                );
                failures.push(RegionFailure::ImageDecodeFailed {
                    page: page_number,
                    image_index: source_index,
                    detail: e.to_string(),
                });
            }
        }
    }

    let mut extraction = decode_candidates(page_number, candidates);
    // pdfium-phase failures come first, then decode-phase ones.
    failures.append(&mut extraction.failures);
    extraction.failures = failures;
    extraction
}

/// Decode re-encoded candidates into regions, skipping any that fail.
///
/// This is the decode seam of the extractor: corrupt byte streams surface
/// here as recorded, non-fatal failures.
pub fn decode_candidates(page_number: usize, candidates: Vec<RegionCandidate>) -> PageExtraction {
    let mut regions = Vec::with_capacity(candidates.len());
    let mut failures = Vec::new();

    for candidate in candidates {
        match image::load_from_memory(&candidate.jpeg) {
            Ok(pixels) => {
                debug!(
                    page = page_number,
                    image = candidate.source_index,
                    width = pixels.width(),
                    height = pixels.height(),
                    bytes = candidate.jpeg.len(),
                    "region extracted"
                );
                regions.push(Region {
                    page_number,
                    source_index: candidate.source_index,
                    bounds: candidate.bounds,
                    pixels,
                    jpeg: candidate.jpeg,
                });
            }
            Err(e) => {
                warn!(
                    page = page_number,
                    image = candidate.source_index,
                    error = %e,
                    "candidate bytes failed to decode; skipping"
                );
                failures.push(RegionFailure::ImageDecodeFailed {
                    page: page_number,
                    image_index: candidate.source_index,
                    detail: e.to_string(),
                });
            }
        }
    }

    PageExtraction { regions, failures }
}

/// Colour-layout skip policy: images whose channel count minus alpha-channel
/// count reaches 4 (CMYK-like layouts) would corrupt the downstream RGB
/// assumptions and are dropped before analysis.
fn exceeds_color_channels(channels: u8, alpha_channels: u8) -> bool {
    channels.saturating_sub(alpha_channels) >= 4
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, Rgb, RgbImage};

    fn jpeg_of(width: u32, height: u32) -> Vec<u8> {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([9, 9, 9])));
        encode_jpeg(&img, 90).expect("encode")
    }

    #[test]
    fn colour_policy_skips_cmyk_like_layouts() {
        assert!(exceeds_color_channels(4, 0));
        assert!(exceeds_color_channels(5, 1));
        assert!(!exceeds_color_channels(4, 1)); // RGBA
        assert!(!exceeds_color_channels(3, 0)); // RGB
        assert!(!exceeds_color_channels(1, 0)); // Gray
    }

    #[test]
    fn decode_candidates_skips_corrupt_entries() {
        let candidates = vec![
            RegionCandidate {
                source_index: 0,
                bounds: RegionBounds::default(),
                jpeg: b"definitely not a jpeg".to_vec(),
            },
            RegionCandidate {
                source_index: 1,
                bounds: RegionBounds::default(),
                jpeg: jpeg_of(20, 20),
            },
        ];

        let extraction = decode_candidates(2, candidates);
        assert_eq!(extraction.regions.len(), 1);
        assert_eq!(extraction.regions[0].source_index, 1);
        assert_eq!(extraction.failures.len(), 1);
        assert!(matches!(
            extraction.failures[0],
            RegionFailure::ImageDecodeFailed {
                page: 2,
                image_index: 0,
                ..
            }
        ));
    }

    #[test]
    fn decode_candidates_preserves_extraction_order() {
        let candidates = vec![
            RegionCandidate {
                source_index: 0,
                bounds: RegionBounds::default(),
                jpeg: jpeg_of(10, 10),
            },
            RegionCandidate {
                source_index: 1,
                bounds: RegionBounds::default(),
                jpeg: jpeg_of(12, 12),
            },
        ];
        let extraction = decode_candidates(1, candidates);
        let indices: Vec<usize> = extraction.regions.iter().map(|r| r.source_index).collect();
        assert_eq!(indices, vec![0, 1]);
        assert!(extraction.failures.is_empty());
    }

    #[test]
    fn empty_candidate_list_yields_empty_extraction() {
        let extraction = decode_candidates(1, Vec::new());
        assert!(extraction.regions.is_empty());
        assert!(extraction.failures.is_empty());
    }
}
