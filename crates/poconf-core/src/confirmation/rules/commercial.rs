//! Secondary commercial fields: prices, totals, terms, currency.

use regex::Regex;
use rust_decimal::Decimal;
use std::str::FromStr;

use super::Candidate;
use super::patterns::{
    BACKORDER, CURRENCY_CODE, EXTENDED_PRICE_LABEL, FREIGHT_COST_LABEL, FREIGHT_TERMS, MONEY_TOKEN,
    NOTES_LABEL, ORDER_TOTAL_LABEL, PAYMENT_TERMS, SUBTOTAL_LABEL, TAX_LABEL, UNIT_PRICE_LABEL,
};
use super::text::{NormalizedText, snippet};

const AMOUNT_CONFIDENCE: f32 = 0.7;
const TERMS_CONFIDENCE: f32 = 0.7;
const CURRENCY_CONFIDENCE: f32 = 0.7;
const DOLLAR_SIGN_CONFIDENCE: f32 = 0.5;
const BACKORDER_CONFIDENCE: f32 = 0.6;
const NOTES_CONFIDENCE: f32 = 0.6;

/// Parse "$1,234.50", "1 234.50" or "12,50" into a decimal.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    let cleaned: String = s
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.' || *c == '-')
        .collect();

    // A lone comma with two trailing digits is a decimal comma
    let normalized = match cleaned.rfind(',') {
        Some(pos) if !cleaned.contains('.') && cleaned.len() - pos == 3 && cleaned.matches(',').count() == 1 => {
            cleaned.replace(',', ".")
        }
        _ => cleaned.replace(',', ""),
    };

    if normalized.is_empty() {
        return None;
    }
    Decimal::from_str(&normalized).ok()
}

/// Candidates for every commercial field found in one text.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CommercialCandidates {
    pub unit_price: Vec<Candidate<Decimal>>,
    pub extended_price: Vec<Candidate<Decimal>>,
    pub subtotal: Vec<Candidate<Decimal>>,
    pub tax: Vec<Candidate<Decimal>>,
    pub freight_cost: Vec<Candidate<Decimal>>,
    pub order_total: Vec<Candidate<Decimal>>,
    pub currency: Vec<Candidate<String>>,
    pub payment_terms: Vec<Candidate<String>>,
    pub freight_terms: Vec<Candidate<String>>,
    pub notes: Vec<Candidate<String>>,
    pub backorder_status: Vec<Candidate<String>>,
}

impl CommercialCandidates {
    /// Apply `f` to every money candidate list.
    pub fn for_each_money(&mut self, mut f: impl FnMut(&mut Vec<Candidate<Decimal>>)) {
        f(&mut self.unit_price);
        f(&mut self.extended_price);
        f(&mut self.subtotal);
        f(&mut self.tax);
        f(&mut self.freight_cost);
        f(&mut self.order_total);
    }

    pub fn for_each_text(&mut self, mut f: impl FnMut(&mut Vec<Candidate<String>>)) {
        f(&mut self.currency);
        f(&mut self.payment_terms);
        f(&mut self.freight_terms);
        f(&mut self.notes);
        f(&mut self.backorder_status);
    }

    /// Append another text's candidates.
    pub fn extend(&mut self, other: CommercialCandidates) {
        self.unit_price.extend(other.unit_price);
        self.extended_price.extend(other.extended_price);
        self.subtotal.extend(other.subtotal);
        self.tax.extend(other.tax);
        self.freight_cost.extend(other.freight_cost);
        self.order_total.extend(other.order_total);
        self.currency.extend(other.currency);
        self.payment_terms.extend(other.payment_terms);
        self.freight_terms.extend(other.freight_terms);
        self.notes.extend(other.notes);
        self.backorder_status.extend(other.backorder_status);
    }
}

/// Label-driven extractor for prices, totals and terms.
pub struct CommercialExtractor {
    snippet_max: usize,
}

impl CommercialExtractor {
    pub fn new() -> Self {
        Self { snippet_max: 160 }
    }

    pub fn with_snippet_max(mut self, max: usize) -> Self {
        self.snippet_max = max;
        self
    }

    /// First money token after `label` on the same line.
    fn labeled_amount(&self, label: &Regex, line: &str, line_idx: usize) -> Option<Candidate<Decimal>> {
        let found = label.find(line)?;
        let rest = &line[found.end()..];
        let caps = MONEY_TOKEN
            .captures_iter(rest)
            .find(|caps| caps.get(1).is_some() || caps.get(3).is_some())?;
        let value = parse_amount(caps.get(0)?.as_str())?;

        Some(
            Candidate::new(value, AMOUNT_CONFIDENCE, snippet(line, self.snippet_max))
                .with_label(found.as_str().to_lowercase(), 0)
                .at_line(line_idx),
        )
    }

    fn text_candidate(&self, value: &str, confidence: f32, line: &str, line_idx: usize, label: &str) -> Option<Candidate<String>> {
        let value = value
            .trim()
            .trim_end_matches(['.', ',', ';'])
            .trim();
        if value.is_empty() {
            return None;
        }
        Some(
            Candidate::new(value.to_string(), confidence, snippet(line, self.snippet_max))
                .with_label(label, 0)
                .at_line(line_idx),
        )
    }

    pub fn extract(&self, text: &NormalizedText) -> CommercialCandidates {
        let mut out = CommercialCandidates::default();
        let mut saw_dollar = None;

        for (i, line) in text.lines().enumerate() {
            // Subtotal lines would otherwise satisfy the bare total labels
            if let Some(c) = self.labeled_amount(&SUBTOTAL_LABEL, line, i) {
                out.subtotal.push(c);
            } else if let Some(c) = self.labeled_amount(&ORDER_TOTAL_LABEL, line, i) {
                out.order_total.push(c);
            }
            out.unit_price.extend(self.labeled_amount(&UNIT_PRICE_LABEL, line, i));
            out.extended_price.extend(self.labeled_amount(&EXTENDED_PRICE_LABEL, line, i));
            out.tax.extend(self.labeled_amount(&TAX_LABEL, line, i));
            if !FREIGHT_TERMS.is_match(line) {
                out.freight_cost.extend(self.labeled_amount(&FREIGHT_COST_LABEL, line, i));
            }

            if let Some(caps) = PAYMENT_TERMS.captures(line) {
                if let Some(m) = caps.get(1) {
                    out.payment_terms
                        .extend(self.text_candidate(m.as_str(), TERMS_CONFIDENCE, line, i, "payment terms"));
                }
            }
            if let Some(caps) = FREIGHT_TERMS.captures(line) {
                if let Some(m) = caps.get(1).or_else(|| caps.get(2)) {
                    out.freight_terms
                        .extend(self.text_candidate(m.as_str(), TERMS_CONFIDENCE, line, i, "freight terms"));
                }
            }
            if let Some(caps) = CURRENCY_CODE.captures(line) {
                if let Some(m) = caps.get(1) {
                    out.currency
                        .extend(self.text_candidate(m.as_str(), CURRENCY_CONFIDENCE, line, i, "currency code"));
                }
            }
            if let Some(caps) = NOTES_LABEL.captures(line) {
                if let Some(m) = caps.get(1) {
                    out.notes
                        .extend(self.text_candidate(m.as_str(), NOTES_CONFIDENCE, line, i, "notes"));
                }
            }
            if BACKORDER.is_match(line) {
                out.backorder_status
                    .extend(self.text_candidate("backordered", BACKORDER_CONFIDENCE, line, i, "backorder"));
            }

            if saw_dollar.is_none() && line.contains('$') {
                saw_dollar = Some(i);
            }
        }

        if out.currency.is_empty() {
            if let Some(i) = saw_dollar {
                out.currency.extend(self.text_candidate(
                    "USD",
                    DOLLAR_SIGN_CONFIDENCE,
                    text.line(i),
                    i,
                    "dollar sign",
                ));
            }
        }

        out
    }
}

impl Default for CommercialExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extract(text: &str) -> CommercialCandidates {
        CommercialExtractor::new().extract(&NormalizedText::new(text))
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("$1,234.50"), Some(Decimal::new(123450, 2)));
        assert_eq!(parse_amount("12.5000"), Some(Decimal::new(125000, 4)));
        assert_eq!(parse_amount("12,50"), Some(Decimal::new(1250, 2)));
        assert_eq!(parse_amount("1,500"), Some(Decimal::from(1500)));
        assert_eq!(parse_amount("$"), None);
    }

    #[test]
    fn test_totals_and_prices() {
        let found = extract(
            "Unit Price: $12.50\nExt. Price: $1,750.00\nSubtotal: $1,750.00\nSales Tax: $0.00\nFreight: $45.00\nOrder Total: $1,795.00",
        );
        assert_eq!(found.unit_price[0].value, Decimal::new(1250, 2));
        assert_eq!(found.extended_price[0].value, Decimal::new(175000, 2));
        assert_eq!(found.subtotal[0].value, Decimal::new(175000, 2));
        assert_eq!(found.tax[0].value, Decimal::ZERO);
        assert_eq!(found.freight_cost[0].value, Decimal::new(4500, 2));
        assert_eq!(found.order_total.len(), 1);
        assert_eq!(found.order_total[0].value, Decimal::new(179500, 2));
        assert_eq!(found.order_total[0].line, 5);
    }

    #[test]
    fn test_terms_and_currency() {
        let found = extract("Payment Terms: Net 30\nShip Via: UPS, FOB Origin\nAll prices in USD");
        assert_eq!(found.payment_terms[0].value, "Net 30");
        assert_eq!(found.freight_terms[0].value, "FOB Origin");
        assert_eq!(found.currency[0].value, "USD");
        assert_eq!(found.currency[0].confidence, CURRENCY_CONFIDENCE);
    }

    #[test]
    fn test_dollar_sign_implies_usd() {
        let found = extract("Unit Price: $4.25");
        assert_eq!(found.currency[0].value, "USD");
        assert_eq!(found.currency[0].confidence, DOLLAR_SIGN_CONFIDENCE);
    }

    #[test]
    fn test_backorder_and_notes() {
        let found = extract("Line 2 is on back-order until May\nNotes: partial shipment allowed");
        assert_eq!(found.backorder_status[0].value, "backordered");
        assert_eq!(found.notes[0].value, "partial shipment allowed");
    }

    #[test]
    fn test_label_without_amount_ignored() {
        let found = extract("Qty Unit Price Extended");
        assert!(found.unit_price.is_empty());
        assert!(found.extended_price.is_empty());
    }
}
