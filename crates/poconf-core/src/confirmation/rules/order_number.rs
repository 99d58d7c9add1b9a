//! Supplier order number extraction.

use regex::Regex;

use super::patterns::{ACK_NUMBER, BARE_ORDER_NO, ISO_DATE, SO_NUMBER, SUPPLIER_ORDER_NO};
use super::text::{NormalizedText, snippet};
use super::{Candidate, FieldExtractor};

const MIN_LEN: usize = 4;
const WHOLE_TEXT_PENALTY: f32 = 0.05;

const STOP_WORDS: &[&str] = &[
    "number",
    "order",
    "date",
    "confirmation",
    "acknowledgment",
    "acknowledgement",
    "none",
    "pending",
    "tbd",
    "n/a",
];

/// Supplier order number extractor.
pub struct OrderNumberExtractor {
    po_number: Option<String>,
    snippet_max: usize,
}

impl OrderNumberExtractor {
    pub fn new(po_number: Option<&str>) -> Self {
        Self {
            po_number: po_number
                .map(|p| p.trim().to_lowercase())
                .filter(|p| !p.is_empty()),
            snippet_max: 160,
        }
    }

    pub fn with_snippet_max(mut self, max: usize) -> Self {
        self.snippet_max = max;
        self
    }

    /// Regex families with base confidence and ranking priority.
    fn families() -> [(&'static str, &'static Regex, f32, u32); 4] {
        [
            ("supplier order no", &*SUPPLIER_ORDER_NO, 0.9, 90),
            ("so number", &*SO_NUMBER, 0.8, 80),
            ("acknowledgment no", &*ACK_NUMBER, 0.7, 70),
            ("order no", &*BARE_ORDER_NO, 0.55, 55),
        ]
    }

    /// Plausibility checks; returns the cleaned value.
    fn plausible(&self, raw: &str, haystack: &str, match_start: usize) -> Option<String> {
        let value = raw.trim_end_matches(['.', ',', ';', ':', '-', '/']);
        if value.chars().count() < MIN_LEN || !value.chars().any(|c| c.is_ascii_digit()) {
            return None;
        }
        let lower = value.to_lowercase();
        if STOP_WORDS.contains(&lower.as_str()) || ISO_DATE.is_match(value) {
            return None;
        }
        if self.po_number.as_deref() == Some(lower.as_str()) {
            return None;
        }
        // "Purchase Order No" / "PO Order #" name the buyer's number
        let before = haystack[..match_start].trim_end().to_lowercase();
        if before.ends_with("purchase") || before.ends_with("po") || before.ends_with("p.o.") {
            return None;
        }
        Some(value.to_string())
    }

    fn scan(
        &self,
        haystack: &str,
        offset: usize,
        text: &NormalizedText,
        penalty: f32,
        results: &mut Vec<Candidate<String>>,
    ) {
        for (label, regex, base, priority) in Self::families() {
            for caps in regex.captures_iter(haystack) {
                let (Some(whole), Some(value)) = (caps.get(0), caps.get(1)) else {
                    continue;
                };
                let Some(value) = self.plausible(value.as_str(), haystack, whole.start()) else {
                    continue;
                };
                let line = text.line_of(offset + whole.start());
                results.push(
                    Candidate::new(value, base - penalty, snippet(whole.as_str(), self.snippet_max))
                        .with_label(label, priority)
                        .at_line(line),
                );
            }
        }
    }
}

impl FieldExtractor for OrderNumberExtractor {
    type Output = String;

    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<String>> {
        let mut found = Vec::new();

        for i in 0..text.line_count() {
            let span = text.line_span(i);
            self.scan(text.line(i), span.start, text, 0.0, &mut found);
        }
        // Whole-text pass catches labels whose value sits on the next line
        self.scan(text.as_str(), 0, text, WHOLE_TEXT_PENALTY, &mut found);

        // One candidate per value, keeping the most confident
        let mut results: Vec<Candidate<String>> = Vec::new();
        for candidate in found {
            match results
                .iter_mut()
                .find(|c| c.value.eq_ignore_ascii_case(&candidate.value))
            {
                Some(existing) if existing.confidence >= candidate.confidence => {}
                Some(existing) => *existing = candidate,
                None => results.push(candidate),
            }
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str, po: Option<&str>) -> Vec<Candidate<String>> {
        OrderNumberExtractor::new(po).extract_all(&NormalizedText::new(text))
    }

    #[test]
    fn test_so_number() {
        let found = extract("SO# AB1234567", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "AB1234567");
        assert!((found[0].confidence - 0.8).abs() < 1e-6);
    }

    #[test]
    fn test_sales_order_number_outranks_bare_order_no() {
        let found = extract("Sales Order No: 778812\nOrder No: 991234", None);
        let best = found
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .unwrap();
        assert_eq!(best.value, "778812");
        assert!((best.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_sales_order_confirmation_heading() {
        let found = extract("Sales Order Confirmation 55123", None);
        let best = found
            .iter()
            .max_by(|a, b| a.confidence.total_cmp(&b.confidence))
            .unwrap();
        assert_eq!(best.value, "55123");
        assert!((best.confidence - 0.9).abs() < 1e-6);
    }

    #[test]
    fn test_value_on_next_line_uses_whole_text_fallback() {
        let found = extract("Acknowledgment #:\nACK-55102", None);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, "ACK-55102");
        assert!((found[0].confidence - 0.65).abs() < 1e-6);
    }

    #[test]
    fn test_rejects_implausible_values() {
        assert!(extract("Order No: ABCDEF", None).is_empty());
        assert!(extract("Order No: 12", None).is_empty());
        assert!(extract("Order #: 2025-03-15", None).is_empty());
    }

    #[test]
    fn test_rejects_purchase_order_number() {
        assert!(extract("Purchase Order No: 4500012345", None).is_empty());
        assert!(extract("Your order number 4500012345", Some("4500012345")).is_empty());
    }

    #[test]
    fn test_trailing_punctuation_trimmed() {
        let found = extract("Our sales order 88123.", None);
        assert_eq!(found[0].value, "88123");
    }
}
