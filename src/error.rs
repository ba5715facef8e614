//! Error types for the docvision library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`DocVisionError`] — **Fatal**: the document walk cannot proceed at all
//!   (input is not a PDF, the document is corrupt, pdfium cannot be bound,
//!   the vision API key is missing). Returned as `Err(DocVisionError)` from
//!   the top-level entry points.
//!
//! * [`RegionFailure`] — **Non-fatal**: a single page or embedded image
//!   failed (page could not be opened, an image stream would not decode) but
//!   the rest of the document is fine. Stored inside
//!   [`crate::output::Page::failures`] so callers can inspect partial
//!   success rather than losing the whole document to one bad image.
//!
//! The separation lets callers decide their own tolerance: abort when any
//! page reports failures, log and continue, or collect them for a post-run
//! report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the docvision library.
///
/// Page- and image-level failures use [`RegionFailure`] and are stored in
/// [`crate::output::Page`] rather than propagated here.
#[derive(Debug, Error)]
pub enum DocVisionError {
    // ── Input errors ──────────────────────────────────────────────────────
    /// Input file was not found at the given path.
    #[error("document not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Process does not have read permission on the file.
    #[error("Permission denied reading '{path}'\nTry: chmod +r {path:?}")]
    PermissionDenied { path: PathBuf },

    /// The input bytes do not start with the PDF magic.
    #[error("input is not a valid PDF document\nFirst bytes: {magic:?}")]
    NotAPdf { magic: [u8; 4] },

    // ── Document errors ───────────────────────────────────────────────────
    /// PDF header/trailer/xref is corrupt and cannot be parsed.
    #[error("document is corrupt: {detail}\nTry repairing with: qpdf --decrypt input.pdf output.pdf")]
    CorruptDocument { detail: String },

    /// Document requires a password but none was provided.
    #[error("document is encrypted and requires a password.\nSet one on WalkConfig::builder().password(..).")]
    PasswordRequired,

    /// A password was provided but it is wrong.
    #[error("wrong password for encrypted document")]
    WrongPassword,

    /// Could not bind to a pdfium library.
    #[error(
        "failed to bind to pdfium library: {0}\n\n\
Resolution order: PDFIUM_LIB_PATH env var, the current directory, then the\n\
system library path. Download a pdfium build for your platform and either\n\
place it next to the executable or set PDFIUM_LIB_PATH to its directory.\n"
    )]
    PdfiumBindingFailed(String),

    // ── Vision API errors ─────────────────────────────────────────────────
    /// The environment variable holding the API key is absent or empty.
    #[error("vision API key not configured: set the {variable} environment variable")]
    MissingApiKey { variable: &'static str },

    /// Every attempt against the vision endpoint failed.
    #[error("vision API request failed after {attempts} attempts: {detail}")]
    VisionApiFailed { attempts: u32, detail: String },

    /// The description cache could not be persisted.
    #[error("failed to write description cache '{path}': {source}")]
    CacheWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// A non-fatal failure scoped to one page or one embedded image.
///
/// Stored on [`crate::output::Page::failures`]. The document walk always
/// completes; these records (plus a `warn!` log line naming the page and
/// image index) are the only trace a recovered failure leaves.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum RegionFailure {
    /// The page could not be opened for enumeration; its record carries an
    /// empty text and image list.
    #[error("page {page}: could not be opened: {detail}")]
    PageOpenFailed { page: usize, detail: String },

    /// Text extraction failed for the page; the record carries empty text.
    #[error("page {page}: text extraction failed: {detail}")]
    TextExtractionFailed { page: usize, detail: String },

    /// One embedded image failed to decode; sibling images are unaffected.
    #[error("page {page}, image {image_index}: decode failed: {detail}")]
    ImageDecodeFailed {
        page: usize,
        image_index: usize,
        detail: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_a_pdf_display_includes_magic() {
        let e = DocVisionError::NotAPdf {
            magic: *b"PK\x03\x04",
        };
        assert!(e.to_string().contains("not a valid PDF"));
    }

    #[test]
    fn vision_failed_display() {
        let e = DocVisionError::VisionApiFailed {
            attempts: 3,
            detail: "HTTP 503".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("3 attempts"), "got: {msg}");
        assert!(msg.contains("HTTP 503"));
    }

    #[test]
    fn region_failure_identifies_page_and_image() {
        let f = RegionFailure::ImageDecodeFailed {
            page: 2,
            image_index: 1,
            detail: "bad marker".into(),
        };
        let msg = f.to_string();
        assert!(msg.contains("page 2"));
        assert!(msg.contains("image 1"));
    }

    #[test]
    fn region_failure_round_trips_through_json() {
        let f = RegionFailure::PageOpenFailed {
            page: 4,
            detail: "boom".into(),
        };
        let json = serde_json::to_string(&f).expect("serialise");
        let back: RegionFailure = serde_json::from_str(&json).expect("deserialise");
        assert!(matches!(back, RegionFailure::PageOpenFailed { page: 4, .. }));
    }
}
