//! Document walk: the top-level extraction entry points.
//!
//! [`walk_document`] drives the full per-page pipeline — text extraction,
//! region extraction, feature measurement, classification, transcoding —
//! and returns one [`Page`] record per document page.
//!
//! ## Why spawn_blocking?
//!
//! The `pdfium-render` crate wraps the pdfium C++ library, which uses
//! thread-local state internally and is not safe to call from async
//! contexts. `tokio::task::spawn_blocking` moves the walk onto the blocking
//! thread pool so Tokio workers never stall on CPU-heavy decoding. The
//! blocking core is also exposed directly ([`walk_document_blocking`]) for
//! synchronous callers.
//!
//! ## Failure model
//!
//! The walk always completes and always returns one record per page: a page
//! that cannot be opened contributes an empty record with a
//! [`RegionFailure::PageOpenFailed`] entry; a bad embedded image is skipped
//! without touching its siblings. Only document-level problems (not a PDF,
//! corrupt file, missing pdfium) surface as `Err`.

use crate::config::WalkConfig;
use crate::error::{DocVisionError, RegionFailure};
use crate::output::{Page, PageImage};
use crate::pipeline::classify::{RegionClassifier, WeightedThresholdClassifier};
use crate::pipeline::extract::{self, PageExtraction};
use crate::pipeline::{metrics, transcode};
use pdfium_render::prelude::*;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Walk a document given its raw bytes, returning the ordered page records.
///
/// Runs the blocking core on the Tokio blocking pool.
///
/// # Errors
/// Fatal only: input is not a PDF, the document cannot be parsed, or pdfium
/// cannot be bound. Page- and image-level problems are recorded on the
/// returned pages instead.
pub async fn walk_document(
    bytes: impl Into<Vec<u8>>,
    config: &WalkConfig,
) -> Result<Vec<Page>, DocVisionError> {
    let bytes = bytes.into();
    let config = config.clone();
    tokio::task::spawn_blocking(move || walk_document_blocking(&bytes, &config))
        .await
        .map_err(|e| DocVisionError::Internal(format!("walk task panicked: {e}")))?
}

/// Walk a document from a file path.
///
/// Validates existence, readability, and the `%PDF` magic before parsing.
pub async fn walk_document_from_file(
    path: impl AsRef<Path>,
    config: &WalkConfig,
) -> Result<Vec<Page>, DocVisionError> {
    let path = path.as_ref();
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
            return Err(DocVisionError::PermissionDenied {
                path: path.to_path_buf(),
            });
        }
        Err(_) => {
            return Err(DocVisionError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
    };
    walk_document(bytes, config).await
}

/// Synchronous core of the document walk.
pub fn walk_document_blocking(
    bytes: &[u8],
    config: &WalkConfig,
) -> Result<Vec<Page>, DocVisionError> {
    check_pdf_magic(bytes)?;

    let pdfium = bind_pdfium()?;
    let document = pdfium
        .load_pdf_from_byte_slice(bytes, config.password.as_deref())
        .map_err(|e| load_error(e, config.password.is_some()))?;

    let classifier: Arc<dyn RegionClassifier> = config
        .classifier
        .clone()
        .unwrap_or_else(|| Arc::new(WeightedThresholdClassifier));

    let total_pages = document.pages().len();
    info!(pages = total_pages, "document loaded");

    let mut pages = Vec::with_capacity(total_pages as usize);
    for index in 0..total_pages {
        let number = index as usize + 1;
        match document.pages().get(index) {
            Ok(page) => {
                pages.push(scan_page(&page, number, classifier.as_ref(), config));
            }
            Err(e) => {
                warn!(page = number, error = ?e, "page could not be opened; emitting empty record");
                pages.push(Page {
                    number,
                    text: String::new(),
                    images: Vec::new(),
                    failures: vec![RegionFailure::PageOpenFailed {
                        page: number,
                        detail: format!("{e:?}"),
                    }],
                });
            }
        }
    }

    let images: usize = pages.iter().map(|p| p.images.len()).sum();
    let failures: usize = pages.iter().map(|p| p.failures.len()).sum();
    info!(
        pages = pages.len(),
        images, failures, "document walk complete"
    );
    Ok(pages)
}

/// Extract text and regions from one opened page, then assemble its record.
fn scan_page(
    page: &PdfPage,
    number: usize,
    classifier: &dyn RegionClassifier,
    config: &WalkConfig,
) -> Page {
    let mut failures = Vec::new();
    let text = match page.text() {
        Ok(text) => text.all().trim().to_string(),
        Err(e) => {
            warn!(page = number, error = ?e, "text extraction failed; continuing with empty text");
            failures.push(RegionFailure::TextExtractionFailed {
                page: number,
                detail: format!("{e:?}"),
            });
            String::new()
        }
    };

    let extraction = extract::extract_regions(page, number);
    let mut record = assemble_page(number, text, extraction, classifier, config);
    failures.append(&mut record.failures);
    record.failures = failures;
    record
}

/// Assemble a page record from extracted regions: measure, classify, and
/// transcode each region exactly once.
pub fn assemble_page(
    number: usize,
    text: String,
    extraction: PageExtraction,
    classifier: &dyn RegionClassifier,
    config: &WalkConfig,
) -> Page {
    let mut images = Vec::with_capacity(extraction.regions.len());
    for region in &extraction.regions {
        let features = metrics::compute(region);
        let classification = classifier.classify(&features);
        let image = transcode::transcode(region, config);
        debug!(
            page = number,
            image = region.source_index,
            ?classification,
            bytes = image.size_bytes(),
            "region analysed"
        );
        images.push(PageImage {
            source_index: region.source_index,
            bounds: region.bounds,
            classification,
            image,
        });
    }

    Page {
        number,
        text,
        images,
        failures: extraction.failures,
    }
}

/// Bind to a pdfium library.
///
/// Resolution order: the directory named by `PDFIUM_LIB_PATH`, the current
/// directory, then the system library path.
pub fn bind_pdfium() -> Result<Pdfium, DocVisionError> {
    let explicit = std::env::var("PDFIUM_LIB_PATH")
        .ok()
        .filter(|p| !p.is_empty());

    let bindings = if let Some(dir) = explicit {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&dir))
    } else {
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            .or_else(|_| Pdfium::bind_to_system_library())
    };

    bindings
        .map(Pdfium::new)
        .map_err(|e| DocVisionError::PdfiumBindingFailed(format!("{e:?}")))
}

fn check_pdf_magic(bytes: &[u8]) -> Result<(), DocVisionError> {
    let mut magic = [0u8; 4];
    let len = bytes.len().min(4);
    magic[..len].copy_from_slice(&bytes[..len]);
    if &magic != b"%PDF" {
        return Err(DocVisionError::NotAPdf { magic });
    }
    Ok(())
}

fn load_error(e: PdfiumError, have_password: bool) -> DocVisionError {
    let detail = format!("{e:?}");
    if detail.to_lowercase().contains("password") {
        if have_password {
            DocVisionError::WrongPassword
        } else {
            DocVisionError::PasswordRequired
        }
    } else {
        DocVisionError::CorruptDocument { detail }
    }
}
