//! Label-aware quantity extraction.

use std::str::FromStr;

use rust_decimal::Decimal;

use super::dimension::exclusion_reason;
use super::patterns::{NUMBER_TOKEN, QUANTITY_LABELS, TWO_DECIMAL, WEIGHT_UNIT};
use super::tables::is_table_header;
use super::text::{NormalizedText, snippet};
use super::{Candidate, FieldExtractor};

const WINDOW_CHARS: usize = 60;
const WEIGHT_UNIT_PENALTY: f32 = 0.3;
const EXPECTED_MATCH_BONUS: f32 = 0.4;
const PLAUSIBLE_BONUS: f32 = 0.1;

/// Read-only context shared by every quantity heuristic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuantityContext {
    /// PO line id; an echoed line id is never a quantity.
    pub line_id: Option<String>,
    /// Ordered quantity from the system of record.
    pub expected_qty: Option<Decimal>,
}

impl QuantityContext {
    pub fn new(line_id: Option<&str>, expected_qty: Option<Decimal>) -> Self {
        Self {
            line_id: line_id.map(|l| l.trim().to_string()).filter(|l| !l.is_empty()),
            expected_qty,
        }
    }

    /// Bonuses shared by labeled and table candidates.
    pub fn bonus(&self, value: Decimal) -> f32 {
        let mut bonus = 0.0;
        if self.expected_qty.is_some_and(|e| e == value) {
            bonus += EXPECTED_MATCH_BONUS;
        }
        if is_plausible_quantity(value) {
            bonus += PLAUSIBLE_BONUS;
        }
        bonus
    }
}

/// Parse "1,500" / "140" / "12.5" into a decimal.
pub fn parse_quantity_token(token: &str) -> Option<Decimal> {
    Decimal::from_str(&token.replace(',', "")).ok()
}

/// An integer in `1..=10000`.
pub fn is_plausible_quantity(value: Decimal) -> bool {
    value.fract().is_zero() && value >= Decimal::ONE && value <= Decimal::from(10_000)
}

/// Reasons a numeric token can never be a quantity, independent of layout.
pub fn hard_rejection(token: &str, value: Decimal, ctx: &QuantityContext) -> Option<&'static str> {
    if let Some(line_id) = &ctx.line_id {
        let echoed = token == line_id
            || parse_quantity_token(line_id).is_some_and(|id| id == value);
        if echoed {
            return Some("line id echo");
        }
    }

    let bare = !token.contains(['.', ',']);
    if bare && token.len() == 4 && value >= Decimal::from(1990) && value <= Decimal::from(2100) {
        return Some("calendar year");
    }

    if TWO_DECIMAL.is_match(token) {
        return Some("currency amount");
    }

    None
}

/// Label-aware quantity extractor.
pub struct QuantityExtractor {
    ctx: QuantityContext,
    snippet_max: usize,
}

impl QuantityExtractor {
    pub fn new(ctx: QuantityContext) -> Self {
        Self {
            ctx,
            snippet_max: 160,
        }
    }

    pub fn with_snippet_max(mut self, max: usize) -> Self {
        self.snippet_max = max;
        self
    }

    /// Label occurrences, skipping those inside a longer label match.
    fn label_matches(&self, text: &str) -> Vec<(usize, std::ops::Range<usize>)> {
        let all: Vec<(usize, std::ops::Range<usize>)> = QUANTITY_LABELS
            .iter()
            .enumerate()
            .flat_map(|(idx, label)| label.regex.find_iter(text).map(move |m| (idx, m.range())))
            .collect();

        let mut kept: Vec<_> = all
            .iter()
            .filter(|(_, r)| {
                !all.iter().any(|(_, other)| {
                    other.start <= r.start && r.end <= other.end && other.len() > r.len()
                })
            })
            .cloned()
            .collect();
        kept.sort_by_key(|(_, r)| r.start);
        kept
    }
}

impl FieldExtractor for QuantityExtractor {
    type Output = Decimal;

    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<Decimal>> {
        let mut results = Vec::new();
        let matches = self.label_matches(text.as_str());

        for (i, (label_idx, range)) in matches.iter().enumerate() {
            let label = &QUANTITY_LABELS[*label_idx];
            // Column headers belong to the table extractors
            let label_line = text.line_of(range.start);
            if is_table_header(text.line(label_line)) {
                continue;
            }

            let mut window_end = text.advance_chars(range.end, WINDOW_CHARS);
            if let Some((_, next)) = matches.get(i + 1) {
                window_end = window_end.min(next.start.max(range.end));
            }
            let window = &text.as_str()[range.end..window_end];

            for m in NUMBER_TOKEN.find_iter(window) {
                let Some(value) = parse_quantity_token(m.as_str()) else {
                    continue;
                };
                let abs_start = range.end + m.start();
                let line_idx = text.line_of(abs_start);
                let line_start = text.line_span(line_idx).start;
                let line = text.line(line_idx);
                // A value may wrap onto the next line, but only as the sole number there
                if line_idx != label_line
                    && (line_idx > label_line + 1 || NUMBER_TOKEN.find_iter(line).count() != 1)
                {
                    break;
                }

                let confidence =
                    0.35 + label.priority as f32 / 400.0 + self.ctx.bonus(value);
                let candidate = Candidate::new(value, confidence, snippet(line, self.snippet_max))
                    .with_label(label.name, label.priority)
                    .at_line(line_idx);

                if let Some(reason) = hard_rejection(m.as_str(), value, &self.ctx) {
                    results.push(candidate.excluded_because(reason));
                    continue;
                }

                let rel_start = abs_start - line_start;
                let rel_end = rel_start + m.as_str().len();
                if let Some(reason) = exclusion_reason(line, rel_start, rel_end) {
                    results.push(candidate.excluded_because(reason));
                    continue;
                }

                let mut candidate = candidate;
                if WEIGHT_UNIT.is_match(line) {
                    candidate.confidence -= WEIGHT_UNIT_PENALTY;
                    candidate.near_weight_unit = true;
                }
                results.push(candidate);
                break;
            }
        }

        results
    }
}
