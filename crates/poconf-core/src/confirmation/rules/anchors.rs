//! Anchor lines (PO number, line id) and the "DOM" neighborhood scan.

use regex::Regex;
use rust_decimal::Decimal;

use super::Candidate;
use super::dimension::exclusion_reason;
use super::patterns::{DATE_TOKEN, DOM_MARKER, NUMBER_TOKEN};
use super::quantity::{QuantityContext, hard_rejection, parse_quantity_token};
use super::text::{NormalizedText, snippet};

const DOM_RADIUS: usize = 8;
const DOM_BASE_CONFIDENCE: f32 = 0.5;

/// Lines where the PO number or line id literally appear.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AnchorSet {
    lines: Vec<usize>,
}

impl AnchorSet {
    /// Locate anchors. The PO number matches case-insensitively anywhere in
    /// a line; the line id must stand alone as a token.
    pub fn locate(text: &NormalizedText, po_number: Option<&str>, line_id: Option<&str>) -> Self {
        let po = po_number
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_lowercase);
        let line_re = line_id
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .and_then(|l| Regex::new(&format!(r"(?i)(?:^|[^A-Za-z0-9]){}(?:$|[^A-Za-z0-9])", regex::escape(l))).ok());

        let lines = text
            .lines()
            .enumerate()
            .filter(|(_, line)| {
                po.as_ref().is_some_and(|po| line.to_lowercase().contains(po))
                    || line_re.as_ref().is_some_and(|re| re.is_match(line))
            })
            .map(|(i, _)| i)
            .collect();

        Self { lines }
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn lines(&self) -> &[usize] {
        &self.lines
    }

    /// Distance in lines to the nearest anchor.
    pub fn distance(&self, line: usize) -> Option<usize> {
        self.lines.iter().map(|a| a.abs_diff(line)).min()
    }

    /// Confidence bonus for a candidate on `line`.
    pub fn boost(&self, line: usize) -> f32 {
        match self.distance(line) {
            Some(d) if d <= 2 => 0.18,
            Some(d) if d <= 5 => 0.12,
            Some(d) if d <= 12 => 0.06,
            _ => 0.0,
        }
    }

    /// Apply the proximity bonus to every candidate.
    pub fn apply<T>(&self, candidates: &mut [Candidate<T>]) {
        if self.is_empty() {
            return;
        }
        for candidate in candidates {
            candidate.confidence += self.boost(candidate.line);
        }
    }
}

/// Loose numeric candidates within ±8 lines of a "DOM" description marker.
///
/// A last-resort quantity source: tokens that are dates, years, prices,
/// echoed line ids or dimension parts are skipped entirely.
pub fn dom_candidates(
    text: &NormalizedText,
    ctx: &QuantityContext,
    snippet_max: usize,
) -> Vec<Candidate<Decimal>> {
    let markers: Vec<usize> = text
        .lines()
        .enumerate()
        .filter(|(_, line)| DOM_MARKER.is_match(line))
        .map(|(i, _)| i)
        .collect();

    let mut results: Vec<Candidate<Decimal>> = Vec::new();
    let mut seen_lines = Vec::new();

    for marker in markers {
        let from = marker.saturating_sub(DOM_RADIUS);
        let to = (marker + DOM_RADIUS).min(text.line_count() - 1);

        for line_idx in from..=to {
            if seen_lines.contains(&line_idx) {
                continue;
            }
            seen_lines.push(line_idx);

            let line = text.line(line_idx);
            let date_spans: Vec<_> = DATE_TOKEN.find_iter(line).map(|m| m.range()).collect();

            for m in NUMBER_TOKEN.find_iter(line) {
                if date_spans.iter().any(|d| d.start <= m.start() && m.end() <= d.end) {
                    continue;
                }
                if exclusion_reason(line, m.start(), m.end()).is_some() {
                    continue;
                }
                let Some(value) = parse_quantity_token(m.as_str()) else {
                    continue;
                };
                if hard_rejection(m.as_str(), value, ctx).is_some() {
                    continue;
                }
                results.push(
                    Candidate::new(value, DOM_BASE_CONFIDENCE, snippet(line, snippet_max))
                        .with_label("dom neighborhood", 0)
                        .at_line(line_idx),
                );
            }
        }
    }

    results
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locate_po_and_line_anchors() {
        let text = NormalizedText::new("Re: PO 4500012345\nline 10 confirmed\nitem 100 ea\nnothing");
        let anchors = AnchorSet::locate(&text, Some("4500012345"), Some("10"));
        assert_eq!(anchors.lines(), &[0, 1]);
    }

    #[test]
    fn test_boost_by_distance() {
        let text = NormalizedText::new("PO 123456");
        let anchors = AnchorSet::locate(&text, Some("123456"), None);
        assert_eq!(anchors.boost(2), 0.18);
        assert_eq!(anchors.boost(5), 0.12);
        assert_eq!(anchors.boost(12), 0.06);
        assert_eq!(anchors.boost(13), 0.0);
    }

    #[test]
    fn test_no_anchors_no_boost() {
        let text = NormalizedText::new("Confirmed Qty: 5");
        let anchors = AnchorSet::locate(&text, None, None);
        let mut candidates = vec![Candidate::new(Decimal::from(5), 0.5, "Qty 5")];
        anchors.apply(&mut candidates);
        assert_eq!(candidates[0].confidence, 0.5);
    }

    #[test]
    fn test_dom_neighborhood() {
        let text = NormalizedText::new("DOM TUBING 1.500 X .120 X 20/24\nA513 T5\n140\n12/01/2025");
        let ctx = QuantityContext::default();
        let found = dom_candidates(&text, &ctx, 160);
        let values: Vec<Decimal> = found.iter().map(|c| c.value).collect();
        assert_eq!(values, vec![Decimal::from(140)]);
        assert_eq!(found[0].line, 2);
        assert_eq!(found[0].confidence, 0.5);
    }
}
