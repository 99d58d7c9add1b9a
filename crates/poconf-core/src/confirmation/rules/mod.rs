//! Rule-based candidate extractors for order confirmations.

pub mod anchors;
pub mod commercial;
pub mod dates;
pub mod dimension;
pub mod order_number;
pub mod patterns;
pub mod quantity;
pub mod tables;
pub mod text;

pub use anchors::{AnchorSet, dom_candidates};
pub use commercial::{CommercialCandidates, CommercialExtractor, parse_amount};
pub use dates::{DateExtractor, parse_date_token};
pub use dimension::{line_has_dimension_context, token_exclusion};
pub use order_number::OrderNumberExtractor;
pub use quantity::{QuantityContext, QuantityExtractor, parse_quantity_token};
pub use tables::{GenericTableExtractor, PriceTableExtractor};
pub use text::NormalizedText;

use serde::{Deserialize, Serialize};

use crate::models::field::Source;

/// Trait for field extractors.
pub trait FieldExtractor {
    /// The type of value this extractor produces.
    type Output;

    /// Extract every candidate, including excluded ones.
    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<Self::Output>>;

    /// First selectable candidate in extraction order.
    fn extract(&self, text: &NormalizedText) -> Option<Candidate<Self::Output>> {
        self.extract_all(text)
            .into_iter()
            .find(Candidate::is_selectable)
    }
}

/// An unranked guess for a field value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candidate<T> {
    /// Extracted value.
    pub value: T,
    /// Confidence score; may leave `0..=1` before output clamping.
    pub confidence: f32,
    /// Text the value was read from.
    pub evidence_snippet: String,
    pub source: Source,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,
    /// Label that introduced the value.
    pub label: String,
    /// Label priority (higher wins).
    pub priority: u32,
    /// Zero-based line index in the normalized text.
    pub line: usize,
    /// Why the candidate can never win.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub excluded: Option<String>,
    /// A weight/length unit word sits on the same line.
    #[serde(default)]
    pub near_weight_unit: bool,
}

impl<T> Candidate<T> {
    pub fn new(value: T, confidence: f32, snippet: impl Into<String>) -> Self {
        Self {
            value,
            confidence,
            evidence_snippet: snippet.into(),
            source: Source::None,
            attachment_id: None,
            label: String::new(),
            priority: 0,
            line: 0,
            excluded: None,
            near_weight_unit: false,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>, priority: u32) -> Self {
        self.label = label.into();
        self.priority = priority;
        self
    }

    pub fn at_line(mut self, line: usize) -> Self {
        self.line = line;
        self
    }

    pub fn excluded_because(mut self, reason: impl Into<String>) -> Self {
        self.excluded = Some(reason.into());
        self
    }

    /// Not excluded and still carrying some confidence.
    pub fn is_selectable(&self) -> bool {
        self.excluded.is_none() && self.confidence > 0.0
    }
}

/// Stamp provenance onto candidates extracted from one text.
pub fn attribute<T>(
    candidates: &mut [Candidate<T>],
    source: Source,
    attachment_id: Option<&str>,
) {
    for candidate in candidates {
        candidate.source = source;
        candidate.attachment_id = attachment_id.map(str::to_string);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_candidate_selectable() {
        let c = Candidate::new(5u32, 0.5, "Qty 5");
        assert!(c.is_selectable());
        assert!(!c.clone().excluded_because("calendar year").is_selectable());

        let mut zero = c;
        zero.confidence = 0.0;
        assert!(!zero.is_selectable());
    }

    #[test]
    fn test_attribute_sets_source() {
        let mut candidates = vec![Candidate::new(1u32, 0.5, "a"), Candidate::new(2u32, 0.5, "b")];
        attribute(&mut candidates, Source::Pdf, Some("att-1"));
        assert!(candidates
            .iter()
            .all(|c| c.source == Source::Pdf && c.attachment_id.as_deref() == Some("att-1")));
    }
}
