//! Output types produced by the document walk.

use crate::error::RegionFailure;
use crate::pipeline::classify::Classification;
use crate::pipeline::extract::RegionBounds;
use crate::pipeline::transcode::EncodedImage;
use serde::{Deserialize, Serialize};

/// One classified, transcoded image on a page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageImage {
    /// Ordinal of the source image object on the page (extraction order).
    pub source_index: usize,
    /// Bounding box on the page, in PDF points.
    pub bounds: RegionBounds,
    /// Chart / possible-chart / plain-image label.
    pub classification: Classification,
    /// Transcoded bytes ready for transmission.
    pub image: EncodedImage,
}

/// The assembled record for one document page.
///
/// Created once per document pass and never mutated after assembly. Every
/// region that survived extraction appears in `images` exactly once, already
/// classified and transcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Page {
    /// 1-based page number; strictly increasing across the document.
    pub number: usize,
    /// Plain text extracted from the page (trimmed; empty on failure).
    pub text: String,
    /// Classified, transcoded images in extraction order.
    pub images: Vec<PageImage>,
    /// Non-fatal failures recovered while assembling this page.
    pub failures: Vec<RegionFailure>,
}

impl Page {
    /// Whether anything usable was extracted from the page.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty() && self.images.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_page_detection() {
        let page = Page {
            number: 1,
            text: String::new(),
            images: Vec::new(),
            failures: Vec::new(),
        };
        assert!(page.is_empty());

        let page = Page {
            text: "hello".into(),
            ..page
        };
        assert!(!page.is_empty());
    }
}
