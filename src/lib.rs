//! # docvision
//!
//! Document-QA extraction core: walk a PDF, pull out per-page text and
//! embedded raster images, decide which images are charts, and compress
//! everything to a transmission budget — ready for a vision-model backend to
//! answer questions about the document.
//!
//! ## Why pixel heuristics?
//!
//! Sending every embedded image to a hosted vision model is slow and billed
//! per call. Most document images are logos, photos, or scans that a generic
//! prompt handles fine; charts and tables deserve a specialised prompt. A
//! fixed weighted score over four cheap pixel measurements (ink density,
//! colour variance, detected lines, detected rectangles) picks the right
//! bucket locally, without any network round trip.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF bytes
//!  │
//!  ├─ 1. Walk      open the document, iterate pages (pdfium, spawn_blocking)
//!  ├─ 2. Extract   decode each embedded raster object on the page
//!  ├─ 3. Measure   density / variance / lines / rectangles per region
//!  ├─ 4. Classify  weighted threshold → Chart | PossibleChart | PlainImage
//!  ├─ 5. Transcode downscale + JPEG quality ladder to the byte ceiling
//!  └─ 6. Assemble  ordered Page records (text + classified images)
//! ```
//!
//! The optional [`vision`] layer sends classified images to an
//! OpenRouter-style endpoint with per-classification prompts, bounded retry,
//! and an injected description cache. The walk itself never touches the
//! network.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use docvision::{walk_document, Classification, WalkConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let bytes = std::fs::read("report.pdf")?;
//!     let pages = walk_document(bytes, &WalkConfig::default()).await?;
//!     for page in &pages {
//!         let charts = page
//!             .images
//!             .iter()
//!             .filter(|i| i.classification == Classification::Chart)
//!             .count();
//!         println!("page {}: {} chars, {} charts", page.number, page.text.len(), charts);
//!     }
//!     Ok(())
//! }
//! ```
//!
//! ## Failure model
//!
//! Only document-level problems (not a PDF, corrupt file, pdfium missing)
//! return `Err`. Everything page- or image-scoped — an unopenable page, an
//! undecodable image, a failed measurement or re-encode — is recovered
//! locally, logged with page and image index, and recorded on the page, so
//! the walk always returns one record per page.

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod output;
pub mod pipeline;
pub mod prompts;
pub mod vision;
pub mod walker;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{WalkConfig, WalkConfigBuilder};
pub use error::{DocVisionError, RegionFailure};
pub use output::{Page, PageImage};
pub use pipeline::classify::{Classification, RegionClassifier, WeightedThresholdClassifier};
pub use pipeline::extract::{Region, RegionBounds};
pub use pipeline::metrics::FeatureVector;
pub use pipeline::transcode::EncodedImage;
pub use vision::{
    CachedDescription, DescriptionCache, JsonFileCache, MemoryCache, RetryPolicy, VisionClient,
};
pub use walker::{
    assemble_page, walk_document, walk_document_blocking, walk_document_from_file,
};
