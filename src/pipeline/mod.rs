//! Pipeline stages for per-page document analysis.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable and lets us
//! swap implementations (e.g. replace the threshold classifier with a
//! trained model) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! extract ──▶ metrics ──▶ classify ──▶ transcode
//! (pdfium)    (features)  (label)      (byte budget)
//! ```
//!
//! 1. [`extract`]   — enumerate and decode the embedded raster objects on a
//!    page; per-image failures are skipped, never fatal
//! 2. [`metrics`]   — measure the four-feature vector from a region's pixels
//! 3. [`classify`]  — map the feature vector to chart / possible-chart /
//!    plain-image via the injected strategy
//! 4. [`transcode`] — re-encode the region to fit the transmission budget
pub mod classify;
pub mod extract;
pub mod metrics;
pub mod transcode;
