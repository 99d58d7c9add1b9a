//! Table-row quantity heuristics.
//!
//! Two layouts are recognized: a "Qty / Unit Price / Extended" table where
//! the quantity sits right before the first price on each row, and a
//! generic header followed by rows where the most quantity-like number wins.

use std::ops::Range;

use rust_decimal::Decimal;

use super::commercial::parse_amount;
use super::dimension::token_exclusion;
use super::patterns::{
    COLUMN_WORD, DATE_TOKEN, EXTENDED_HEADER, INDEX_PART_PAIR, NUMBER_TOKEN, PRICE_CELL,
    QTY_HEADER, TABLE_END, TWO_DECIMAL, UNIT_PRICE_HEADER,
};
use super::quantity::{QuantityContext, hard_rejection, is_plausible_quantity, parse_quantity_token};
use super::text::{NormalizedText, snippet};
use super::{Candidate, FieldExtractor};

const MAX_ROWS: usize = 25;
const PRICE_TABLE_PRIORITY: u32 = 70;
const GENERIC_TABLE_PRIORITY: u32 = 55;
const PART_NUMBER_DIGITS: usize = 6;

/// One parsed row of a price table.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceRow {
    pub quantity: Candidate<Decimal>,
    pub unit_price: Candidate<Decimal>,
    pub extended_price: Candidate<Decimal>,
}

/// Whether `line` is the header of either table layout.
pub fn is_table_header(line: &str) -> bool {
    PriceTableExtractor::is_header(line) || GenericTableExtractor::is_header(line)
}

/// Row lines following each header line accepted by `is_header`.
fn table_rows<'a>(
    text: &'a NormalizedText,
    is_header: impl Fn(&str) -> bool,
) -> Vec<(usize, &'a str)> {
    let mut rows = Vec::new();
    let mut i = 0;
    while i < text.line_count() {
        if !is_header(text.line(i)) {
            i += 1;
            continue;
        }

        let mut j = i + 1;
        let mut taken = 0;
        while j < text.line_count() && taken < MAX_ROWS {
            let row = text.line(j);
            if row.is_empty() {
                if taken > 0 {
                    break;
                }
                j += 1;
                continue;
            }
            if TABLE_END.is_match(row) || is_header(row) {
                break;
            }
            rows.push((j, row));
            taken += 1;
            j += 1;
        }
        i = j;
    }
    rows
}

/// Byte ranges a row's quantity can never come from: dates and a leading
/// line-index/part-number pair.
fn ignored_spans(row: &str) -> Vec<Range<usize>> {
    let mut spans: Vec<Range<usize>> = DATE_TOKEN.find_iter(row).map(|m| m.range()).collect();
    if let Some(caps) = INDEX_PART_PAIR.captures(row) {
        spans.extend(caps.get(1).map(|m| m.range()));
        spans.extend(caps.get(2).map(|m| m.range()));
    }
    spans
}

fn inside(spans: &[Range<usize>], start: usize, end: usize) -> bool {
    spans.iter().any(|s| s.start <= start && end <= s.end)
}

/// "Qty / Unit Price / Extended" table extractor.
///
/// Decimal cells that are really dimensions (`1.500 X`) are skipped. The last
/// two prices on a row are unit and extended price; a row with fewer is
/// ambiguous and yields nothing.
pub struct PriceTableExtractor {
    ctx: QuantityContext,
    snippet_max: usize,
}

impl PriceTableExtractor {
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

    pub(crate) fn is_header(line: &str) -> bool {
        QTY_HEADER.is_match(line) && UNIT_PRICE_HEADER.is_match(line) && EXTENDED_HEADER.is_match(line)
    }

    /// Parse every row under a price-table header.
    pub fn rows(&self, text: &NormalizedText) -> Vec<PriceRow> {
        table_rows(text, Self::is_header)
            .into_iter()
            .filter_map(|(line_idx, row)| self.parse_row(row, line_idx))
            .collect()
    }

    fn parse_row(&self, row: &str, line_idx: usize) -> Option<PriceRow> {
        let ignored = ignored_spans(row);
        let snip = snippet(row, self.snippet_max);

        let prices: Vec<(Range<usize>, Decimal)> = PRICE_CELL
            .captures_iter(row)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let digits = caps.get(2)?;
                let decimals = caps.get(3);
                if caps.get(1).is_none() && decimals.is_none() {
                    return None;
                }
                let end = decimals.map(|d| d.end()).unwrap_or(digits.end());
                if inside(&ignored, digits.start(), end)
                    || token_exclusion(row, digits.start(), end).is_some()
                {
                    return None;
                }
                Some((whole.range(), parse_amount(whole.as_str())?))
            })
            .collect();

        // Prices are the rightmost columns: unit price, then extended
        if prices.len() < 2 {
            return None;
        }
        let (unit_range, unit_value) = prices[prices.len() - 2].clone();
        let extended_value = prices[prices.len() - 1].1;

        let preceding: Vec<(&str, Decimal)> = NUMBER_TOKEN
            .find_iter(row)
            .filter(|m| m.end() <= unit_range.start)
            .filter(|m| !inside(&ignored, m.start(), m.end()))
            .filter(|m| token_exclusion(row, m.start(), m.end()).is_none())
            .filter_map(|m| Some((m.as_str(), parse_quantity_token(m.as_str())?)))
            .collect();

        let &(token, value) = preceding.last()?;
        if !token.contains([',', '.']) && token.len() >= PART_NUMBER_DIGITS {
            return None;
        }

        let confidence = 0.6 + self.ctx.bonus(value);
        let mut quantity = Candidate::new(value, confidence, snip.clone())
            .with_label("qty/price/extended table", PRICE_TABLE_PRIORITY)
            .at_line(line_idx);
        if let Some(reason) = hard_rejection(token, value, &self.ctx) {
            quantity = quantity.excluded_because(reason);
        }

        let unit_price = Candidate::new(unit_value, 0.7, snip.clone())
            .with_label("table unit price", PRICE_TABLE_PRIORITY)
            .at_line(line_idx);
        let extended_price = Candidate::new(extended_value, 0.65, snip)
            .with_label("table extended price", PRICE_TABLE_PRIORITY)
            .at_line(line_idx);

        Some(PriceRow {
            quantity,
            unit_price,
            extended_price,
        })
    }
}

impl FieldExtractor for PriceTableExtractor {
    type Output = Decimal;

    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<Decimal>> {
        self.rows(text).into_iter().map(|r| r.quantity).collect()
    }
}

/// Generic header-plus-rows table extractor.
pub struct GenericTableExtractor {
    ctx: QuantityContext,
    snippet_max: usize,
}

impl GenericTableExtractor {
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

    pub(crate) fn is_header(line: &str) -> bool {
        QTY_HEADER.is_match(line)
            && COLUMN_WORD.is_match(line)
            && !NUMBER_TOKEN.is_match(line)
    }

    /// How much a token looks like a line quantity.
    fn qty_score(row: &str, start: usize, token: &str, value: Decimal, multiple: bool) -> i32 {
        let mut score = 0;
        if !token.contains('.') {
            score += 2;
        }
        if is_plausible_quantity(value) {
            score += 1;
        }
        if TWO_DECIMAL.is_match(token) || row[..start].trim_end().ends_with('$') {
            score -= 3;
        }
        let bare = !token.contains([',', '.']);
        if bare && token.len() == 4 && (1990..=2100).contains(&token.parse::<u32>().unwrap_or(0)) {
            score -= 3;
        }
        if start == 0 && multiple {
            score -= 1;
        }
        score
    }
}

impl FieldExtractor for GenericTableExtractor {
    type Output = Decimal;

    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<Decimal>> {
        let mut results = Vec::new();

        for (line_idx, row) in table_rows(text, Self::is_header) {
            let ignored = ignored_spans(row);
            let tokens: Vec<(usize, &str, Decimal)> = NUMBER_TOKEN
                .find_iter(row)
                .filter(|m| !inside(&ignored, m.start(), m.end()))
                .filter(|m| token_exclusion(row, m.start(), m.end()).is_none())
                .filter_map(|m| Some((m.start(), m.as_str(), parse_quantity_token(m.as_str())?)))
                .collect();

            let multiple = tokens.len() > 1;
            let mut best: Option<(i32, &str, Decimal)> = None;
            for &(start, token, value) in &tokens {
                let score = Self::qty_score(row, start, token, value, multiple);
                if best.is_none_or(|(s, _, _)| score > s) {
                    best = Some((score, token, value));
                }
            }

            let Some((score, token, value)) = best else {
                continue;
            };
            if score <= 0 {
                continue;
            }

            let mut candidate =
                Candidate::new(value, 0.45 + self.ctx.bonus(value), snippet(row, self.snippet_max))
                    .with_label("generic table", GENERIC_TABLE_PRIORITY)
                    .at_line(line_idx);
            if let Some(reason) = hard_rejection(token, value, &self.ctx) {
                candidate = candidate.excluded_because(reason);
            }
            results.push(candidate);
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_TABLE: &str = "\
Line Part Description Qty Unit Price Extended
1 100234 TUBE 1.500 X .120 X 20/24 A513 140 EA $12.50 $1,750.00
2 100235 BAR 2.000 RD 36 4.2500 153.00
Subtotal $1,903.00";

    #[test]
    fn test_price_table_rows() {
        let extractor = PriceTableExtractor::new(QuantityContext::default());
        let rows = extractor.rows(&NormalizedText::new(PRICE_TABLE));
        assert_eq!(rows.len(), 2);

        assert_eq!(rows[0].quantity.value, Decimal::from(140));
        assert_eq!(rows[0].quantity.line, 1);
        assert_eq!(rows[0].unit_price.value, Decimal::new(1250, 2));
        assert_eq!(rows[0].extended_price.value, Decimal::new(175000, 2));

        assert_eq!(rows[1].quantity.value, Decimal::from(36));
        assert_eq!(rows[1].unit_price.value, Decimal::new(42500, 4));
    }

    #[test]
    fn test_price_table_one_decimal_unit_price() {
        let text = NormalizedText::new("Item Qty Unit Price Extended\n1 Widget 140 EA 12.5 1750.00");
        let rows = PriceTableExtractor::new(QuantityContext::default()).rows(&text);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].quantity.value, Decimal::from(140));
        assert_eq!(rows[0].unit_price.value, Decimal::new(125, 1));
        assert_eq!(rows[0].extended_price.value, Decimal::new(175000, 2));
    }

    #[test]
    fn test_price_table_row_needs_two_prices() {
        let text = NormalizedText::new("Item Qty Unit Price Extended\n1 Widget 140 EA $1,750.00");
        let rows = PriceTableExtractor::new(QuantityContext::default()).rows(&text);
        assert!(rows.is_empty());
    }

    #[test]
    fn test_is_table_header() {
        assert!(is_table_header("Line Part Description Qty Unit Price Extended"));
        assert!(is_table_header("Line Qty Description"));
        assert!(!is_table_header("Confirmed Qty: 140"));
    }

    #[test]
    fn test_price_table_ignores_text_without_header() {
        let extractor = PriceTableExtractor::new(QuantityContext::default());
        let text = NormalizedText::new("1 100234 TUBE 140 EA $12.50 $1,750.00");
        assert!(extractor.extract_all(&text).is_empty());
    }

    #[test]
    fn test_price_table_expected_qty_bonus() {
        let ctx = QuantityContext::new(None, Some(Decimal::from(140)));
        let found = PriceTableExtractor::new(ctx).extract_all(&NormalizedText::new(PRICE_TABLE));
        assert!((found[0].confidence - 1.1).abs() < 1e-6);
        assert_eq!(found[0].priority, PRICE_TABLE_PRIORITY);
    }

    #[test]
    fn test_generic_table_prefers_integers() {
        let text = "Item Description Qty Ship Date\nWidget bracket 24.50 180 03/01/2025\nEnd";
        let found = GenericTableExtractor::new(QuantityContext::default())
            .extract_all(&NormalizedText::new(text));
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, Decimal::from(180));
        assert_eq!(found[0].label, "generic table");
    }

    #[test]
    fn test_generic_table_skips_money_only_rows() {
        let text = "Item Qty Amount\nFreight 45.00";
        let found = GenericTableExtractor::new(QuantityContext::default())
            .extract_all(&NormalizedText::new(text));
        assert!(found.is_empty());
    }
}
