//! Configuration for a document walk.
//!
//! All behaviour is controlled through [`WalkConfig`], built via its
//! [`WalkConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across threads and to diff two runs to understand why
//! their outputs differ.

use crate::error::DocVisionError;
use crate::pipeline::classify::RegionClassifier;
use std::fmt;
use std::sync::Arc;

/// Configuration for [`crate::walker::walk_document`].
///
/// Built via [`WalkConfig::builder()`] or [`WalkConfig::default()`].
///
/// # Example
/// ```rust
/// use docvision::WalkConfig;
///
/// let config = WalkConfig::builder()
///     .max_image_bytes(400 * 1024)
///     .max_dimension(1000)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct WalkConfig {
    /// Byte-size ceiling for each transcoded image. Default: 800 KiB.
    ///
    /// The quality ladder stops at the first encoding at or under this
    /// value. The terminal fallback may exceed it for pathological inputs.
    pub max_image_bytes: usize,

    /// Maximum linear dimension (width or height) before transcoding,
    /// in pixels. Default: 1200.
    ///
    /// Larger regions are downscaled proportionally so the longest side
    /// equals this value.
    pub max_dimension: u32,

    /// Dimension used by the terminal fallback downscale. Default: 800.
    pub fallback_dimension: u32,

    /// Document password for encrypted PDFs.
    pub password: Option<String>,

    /// Classifier strategy. `None` uses
    /// [`crate::pipeline::classify::WeightedThresholdClassifier`].
    pub classifier: Option<Arc<dyn RegionClassifier>>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        Self {
            max_image_bytes: 800 * 1024,
            max_dimension: 1200,
            fallback_dimension: 800,
            password: None,
            classifier: None,
        }
    }
}

impl fmt::Debug for WalkConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WalkConfig")
            .field("max_image_bytes", &self.max_image_bytes)
            .field("max_dimension", &self.max_dimension)
            .field("fallback_dimension", &self.fallback_dimension)
            .field("password", &self.password.as_ref().map(|_| "<set>"))
            .field("classifier", &self.classifier.as_ref().map(|_| "<dyn RegionClassifier>"))
            .finish()
    }
}

impl WalkConfig {
    /// Create a new builder for `WalkConfig`.
    pub fn builder() -> WalkConfigBuilder {
        WalkConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`WalkConfig`].
#[derive(Debug)]
pub struct WalkConfigBuilder {
    config: WalkConfig,
}

impl WalkConfigBuilder {
    pub fn max_image_bytes(mut self, bytes: usize) -> Self {
        self.config.max_image_bytes = bytes.max(1);
        self
    }

    pub fn max_dimension(mut self, px: u32) -> Self {
        self.config.max_dimension = px.max(16);
        self
    }

    pub fn fallback_dimension(mut self, px: u32) -> Self {
        self.config.fallback_dimension = px.max(16);
        self
    }

    pub fn password(mut self, pwd: impl Into<String>) -> Self {
        self.config.password = Some(pwd.into());
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn RegionClassifier>) -> Self {
        self.config.classifier = Some(classifier);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<WalkConfig, DocVisionError> {
        let c = &self.config;
        if c.fallback_dimension > c.max_dimension {
            return Err(DocVisionError::InvalidConfig(format!(
                "fallback_dimension ({}) must not exceed max_dimension ({})",
                c.fallback_dimension, c.max_dimension
            )));
        }
        Ok(self.config)
    }
}
