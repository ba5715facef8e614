//! Analysis prompts sent alongside extracted images.
//!
//! Centralising every prompt here keeps a single source of truth and lets
//! unit tests inspect prompt routing without a live API. Callers can always
//! pass their own prompt to [`crate::vision::VisionClient::describe`]; these
//! constants are the defaults selected per classification.

use crate::pipeline::classify::Classification;

/// Prompt used for regions classified as charts (or possible charts).
/// Consumed by [`crate::vision::VisionClient::describe_chart`] and selected
/// by [`prompt_for`].
pub const CHART_PROMPT: &str = "\
Analyse this chart from a financial document. Cover:
1. Chart type (bar, line, pie, scatter, ...)
2. The main data series visible
3. Trends and patterns
4. Notable numeric values
5. Any insight relevant to the surrounding document

Answer in a structured, professional tone.";

/// Prompt used when the caller knows the region is a data table.
/// The classifier has no table label, so this is never picked by
/// [`prompt_for`]; it is reached through
/// [`crate::vision::VisionClient::describe_table`].
pub const TABLE_PROMPT: &str = "\
Analyse this table of figures. Extract:
1. Table structure (columns, rows)
2. The important numeric values
3. Financial metrics if present (returns, fees, NAV, ...)
4. Time trends where applicable
5. The key takeaways

Present the data clearly and concisely.";

/// Prompt used for plain images with no detected chart structure.
pub const DEFAULT_IMAGE_PROMPT: &str = "\
Analyse this image from a document. Describe:
1. The type of content (photo, diagram, logo, scan, ...)
2. Any data or figures it carries
3. Context that would help answer questions about the document

Answer in a structured, professional tone.";

/// Select the default prompt for a classification: the chart prompt for
/// both chart labels, the generic image prompt otherwise.
pub fn prompt_for(classification: Classification) -> &'static str {
    match classification {
        Classification::Chart | Classification::PossibleChart => CHART_PROMPT,
        Classification::PlainImage => DEFAULT_IMAGE_PROMPT,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charts_route_to_the_chart_prompt() {
        assert_eq!(prompt_for(Classification::Chart), CHART_PROMPT);
        assert_eq!(prompt_for(Classification::PossibleChart), CHART_PROMPT);
        assert_eq!(prompt_for(Classification::PlainImage), DEFAULT_IMAGE_PROMPT);
    }
}
