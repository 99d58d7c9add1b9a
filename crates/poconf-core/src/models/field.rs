//! Confidence-carrying field values.

use serde::{Deserialize, Serialize};

use crate::confirmation::rules::Candidate;

/// Where a field's winning value came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    /// Text extracted from a PDF attachment.
    Pdf,
    /// The email body.
    Email,
    /// Not evidence-derived (missing, or system of record).
    #[default]
    None,
}

/// A single output field with its confidence and provenance.
///
/// `value` is `None` exactly when `confidence` is zero, and an empty field
/// never carries an evidence snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedField<T> {
    pub value: Option<T>,
    pub confidence: f32,
    pub evidence_snippet: Option<String>,
    pub source: Source,
    pub attachment_id: Option<String>,
    pub message_id: Option<String>,
}

impl<T> ParsedField<T> {
    /// A field with no value.
    pub fn empty() -> Self {
        Self {
            value: None,
            confidence: 0.0,
            evidence_snippet: None,
            source: Source::None,
            attachment_id: None,
            message_id: None,
        }
    }

    /// A value supplied by the purchase-order system of record.
    pub fn system_of_record(value: Option<T>) -> Self {
        match value {
            Some(value) => Self {
                value: Some(value),
                confidence: 1.0,
                evidence_snippet: None,
                source: Source::None,
                attachment_id: None,
                message_id: None,
            },
            None => Self::empty(),
        }
    }

    /// Build a field from an evidence value.
    ///
    /// Confidence is clamped to `0..=1` and rounded to two decimals; a value
    /// whose confidence rounds to zero is dropped.
    pub fn evidence(
        value: T,
        confidence: f32,
        snippet: impl Into<String>,
        source: Source,
        attachment_id: Option<String>,
        message_id: Option<String>,
    ) -> Self {
        let confidence = round_confidence(confidence);
        if confidence <= 0.0 {
            return Self::empty();
        }
        Self {
            value: Some(value),
            confidence,
            evidence_snippet: Some(snippet.into()),
            source,
            attachment_id,
            message_id,
        }
    }

    /// Whether a value is present.
    pub fn is_present(&self) -> bool {
        self.value.is_some()
    }

    /// Drop the value unless its confidence reaches `threshold`.
    pub fn gated(self, threshold: f32) -> Self {
        if self.confidence >= threshold {
            self
        } else {
            Self::empty()
        }
    }
}

impl<T: Clone> ParsedField<T> {
    /// Build a field from the winning candidate.
    pub fn from_candidate(candidate: &Candidate<T>, message_id: Option<&str>) -> Self {
        Self::evidence(
            candidate.value.clone(),
            candidate.confidence,
            candidate.evidence_snippet.clone(),
            candidate.source,
            candidate.attachment_id.clone(),
            message_id.map(str::to_string),
        )
    }
}

impl<T> Default for ParsedField<T> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Clamp to `0..=1` and round to two decimals.
pub fn round_confidence(confidence: f32) -> f32 {
    if !confidence.is_finite() {
        return 0.0;
    }
    (confidence.clamp(0.0, 1.0) * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_field_has_zero_confidence() {
        let field: ParsedField<String> = ParsedField::empty();
        assert!(field.value.is_none());
        assert_eq!(field.confidence, 0.0);
        assert!(field.evidence_snippet.is_none());
    }

    #[test]
    fn test_evidence_clamps_confidence() {
        let field = ParsedField::evidence(5u32, 1.37, "Qty 5", Source::Email, None, None);
        assert_eq!(field.confidence, 1.0);

        let dropped = ParsedField::evidence(5u32, -0.2, "Qty 5", Source::Email, None, None);
        assert!(dropped.value.is_none());
        assert!(dropped.evidence_snippet.is_none());
    }

    #[test]
    fn test_system_of_record() {
        let field = ParsedField::system_of_record(Some(100u32));
        assert_eq!(field.confidence, 1.0);
        assert_eq!(field.source, Source::None);

        let missing: ParsedField<u32> = ParsedField::system_of_record(None);
        assert_eq!(missing.confidence, 0.0);
    }

    #[test]
    fn test_gated_drops_low_confidence() {
        let field = ParsedField::evidence(90u32, 0.55, "Qty 90", Source::Pdf, None, None);
        assert!(field.gated(0.6).value.is_none());
    }

    #[test]
    fn test_source_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Source::Pdf).unwrap(), "\"pdf\"");
        assert_eq!(serde_json::to_string(&Source::None).unwrap(), "\"none\"");
    }
}
