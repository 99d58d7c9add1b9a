//! Deterministic confirmation parser: extract, rank, merge, reconcile.

use std::time::Instant;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::models::config::ExtractionConfig;
use crate::models::confirmation::{
    CommercialFields, DebugCandidates, ExtractionMethod, ParsedConfirmationFieldsV1,
};
use crate::models::field::{ParsedField, Source};
use crate::models::input::ParseInput;

use super::merge::choose_field;
use super::ranking::{best, rank_by_confidence, rank_dates, rank_quantities};
use super::reconcile::{price_change, reconcile_quantity};
use super::rules::{
    AnchorSet, Candidate, CommercialCandidates, CommercialExtractor, DateExtractor, FieldExtractor,
    GenericTableExtractor, NormalizedText, OrderNumberExtractor, PriceTableExtractor,
    QuantityContext, QuantityExtractor, attribute, dom_candidates,
};

/// Trait for confirmation parsing.
pub trait ConfirmationExtractor {
    /// Parse confirmation fields from evidence text.
    fn parse(&self, input: &ParseInput) -> ParsedConfirmationFieldsV1;
}

/// Every candidate extracted from one source (all PDFs, or the email).
#[derive(Debug, Clone, Default)]
pub struct SourceExtraction {
    pub dates: Vec<Candidate<NaiveDate>>,
    pub quantities: Vec<Candidate<Decimal>>,
    pub order_numbers: Vec<Candidate<String>>,
    pub commercial: CommercialCandidates,
}

impl SourceExtraction {
    fn absorb(&mut self, other: SourceExtraction) {
        self.dates.extend(other.dates);
        self.quantities.extend(other.quantities);
        self.order_numbers.extend(other.order_numbers);
        self.commercial.extend(other.commercial);
    }

    fn rank(&mut self) {
        rank_dates(&mut self.dates);
        rank_quantities(&mut self.quantities);
        rank_by_confidence(&mut self.order_numbers);
        self.commercial.for_each_money(|c| rank_by_confidence(c));
        self.commercial.for_each_text(|c| rank_by_confidence(c));
    }
}

/// Parser result plus the ranked quantity candidates behind it.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub result: ParsedConfirmationFieldsV1,
    /// Quantity candidates of every source, ranked together.
    pub ranked_quantities: Vec<Candidate<Decimal>>,
}

/// Rule-based parser for supplier order confirmations.
pub struct ConfirmationParser {
    config: ExtractionConfig,
}

impl ConfirmationParser {
    pub fn new(config: ExtractionConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Extract candidates of every field from one text.
    pub fn extract_source(
        &self,
        raw: &str,
        source: Source,
        attachment_id: Option<&str>,
        input: &ParseInput,
    ) -> SourceExtraction {
        let text = NormalizedText::new(raw);
        let max = self.config.snippet_max_chars;
        let ctx = QuantityContext::new(input.line_id.as_deref(), input.expected_qty);

        let dates = DateExtractor::new().with_snippet_max(max).extract_all(&text);

        let mut quantities = QuantityExtractor::new(ctx.clone())
            .with_snippet_max(max)
            .extract_all(&text);

        let mut commercial = CommercialExtractor::new().with_snippet_max(max).extract(&text);
        for row in PriceTableExtractor::new(ctx.clone())
            .with_snippet_max(max)
            .rows(&text)
        {
            quantities.push(row.quantity);
            commercial.unit_price.push(row.unit_price);
            commercial.extended_price.push(row.extended_price);
        }
        quantities.extend(
            GenericTableExtractor::new(ctx.clone())
                .with_snippet_max(max)
                .extract_all(&text),
        );

        // "DOM" neighborhoods are only a last resort
        if !quantities.iter().any(Candidate::is_selectable) {
            quantities.extend(dom_candidates(&text, &ctx, max));
        }

        let order_numbers = OrderNumberExtractor::new(input.po_number.as_deref())
            .with_snippet_max(max)
            .extract_all(&text);

        let mut extraction = SourceExtraction {
            dates,
            quantities,
            order_numbers,
            commercial,
        };

        let anchors = AnchorSet::locate(&text, input.po_number.as_deref(), input.line_id.as_deref());
        anchors.apply(&mut extraction.dates);
        anchors.apply(&mut extraction.quantities);
        anchors.apply(&mut extraction.order_numbers);
        extraction.commercial.for_each_money(|c| anchors.apply(c));
        extraction.commercial.for_each_text(|c| anchors.apply(c));

        attribute(&mut extraction.dates, source, attachment_id);
        attribute(&mut extraction.quantities, source, attachment_id);
        attribute(&mut extraction.order_numbers, source, attachment_id);
        extraction
            .commercial
            .for_each_money(|c| attribute(c, source, attachment_id));
        extraction
            .commercial
            .for_each_text(|c| attribute(c, source, attachment_id));

        debug!(
            "{:?} text: {} dates, {} quantities, {} order numbers, {} anchors",
            source,
            extraction.dates.len(),
            extraction.quantities.len(),
            extraction.order_numbers.len(),
            anchors.lines().len()
        );

        extraction
    }

    /// Run the deterministic pipeline and keep the ranked quantities.
    pub fn analyze(&self, input: &ParseInput) -> Analysis {
        let start = Instant::now();

        let mut pdf = SourceExtraction::default();
        for attachment in &input.pdf_texts {
            if let Some(text) = attachment.usable_text() {
                pdf.absorb(self.extract_source(
                    text,
                    Source::Pdf,
                    Some(&attachment.attachment_id),
                    input,
                ));
            }
        }
        let mut email = input
            .usable_email_text()
            .map(|text| self.extract_source(text, Source::Email, None, input))
            .unwrap_or_default();

        pdf.rank();
        email.rank();

        let msg = input.message_id.as_deref();
        let mut result = ParsedConfirmationFieldsV1::empty(ExtractionMethod::Deterministic);

        result.supplier_order_number =
            choose_field(best(&pdf.order_numbers), best(&email.order_numbers), msg);
        result.confirmed_delivery_date = choose_field(best(&pdf.dates), best(&email.dates), msg);
        result.confirmed_quantity =
            choose_field(best(&pdf.quantities), best(&email.quantities), msg);
        result.supplier_confirmed_quantity = result
            .confirmed_quantity
            .clone()
            .gated(self.config.min_field_confidence);
        result.ordered_quantity = ParsedField::system_of_record(input.expected_qty);
        result.quantity_mismatch = reconcile_quantity(
            input.expected_qty,
            result.supplier_confirmed_quantity.value,
        );

        result.commercial = merge_commercial(&pdf.commercial, &email.commercial, msg);
        result.price_changed = price_change(
            result.commercial.unit_price.value,
            input.expected_unit_price,
            self.config.price_change_tolerance,
        );

        result.evidence_source = result.compute_evidence_source();
        result.raw_excerpt =
            raw_excerpt(input, result.evidence_source, self.config.excerpt_max_chars);

        let mut ranked_quantities: Vec<Candidate<Decimal>> =
            pdf.quantities.iter().chain(&email.quantities).cloned().collect();
        rank_quantities(&mut ranked_quantities);

        if input.debug {
            let mut dates: Vec<_> = pdf.dates.iter().chain(&email.dates).cloned().collect();
            rank_dates(&mut dates);
            let mut order_numbers: Vec<_> = pdf
                .order_numbers
                .iter()
                .chain(&email.order_numbers)
                .cloned()
                .collect();
            rank_by_confidence(&mut order_numbers);

            result.debug_candidates = Some(DebugCandidates {
                dates,
                quantities: ranked_quantities.clone(),
                order_numbers,
            });
        }

        info!(
            "Deterministic parse: order_no={}, date={}, qty={}, source={:?} in {}ms",
            result.supplier_order_number.is_present(),
            result.confirmed_delivery_date.is_present(),
            result.supplier_confirmed_quantity.is_present(),
            result.evidence_source,
            start.elapsed().as_millis()
        );

        Analysis {
            result,
            ranked_quantities,
        }
    }
}

impl Default for ConfirmationParser {
    fn default() -> Self {
        Self::new(ExtractionConfig::default())
    }
}

impl ConfirmationExtractor for ConfirmationParser {
    fn parse(&self, input: &ParseInput) -> ParsedConfirmationFieldsV1 {
        self.analyze(input).result
    }
}

/// Leading slice of the text that supplied the evidence.
pub(crate) fn raw_excerpt(input: &ParseInput, source: Source, max_chars: usize) -> Option<String> {
    let text = match source {
        Source::Pdf => input.pdf_texts.iter().find_map(|p| p.usable_text()),
        Source::Email => input.usable_email_text(),
        Source::None => None,
    }?;
    Some(NormalizedText::new(text).as_str().chars().take(max_chars).collect())
}

fn merge_commercial(
    pdf: &CommercialCandidates,
    email: &CommercialCandidates,
    msg: Option<&str>,
) -> CommercialFields {
    fn pick<T: Clone>(p: &[Candidate<T>], e: &[Candidate<T>], msg: Option<&str>) -> ParsedField<T> {
        choose_field(best(p), best(e), msg)
    }

    CommercialFields {
        unit_price: pick(&pdf.unit_price, &email.unit_price, msg),
        extended_price: pick(&pdf.extended_price, &email.extended_price, msg),
        currency: pick(&pdf.currency, &email.currency, msg),
        payment_terms: pick(&pdf.payment_terms, &email.payment_terms, msg),
        freight_terms: pick(&pdf.freight_terms, &email.freight_terms, msg),
        freight_cost: pick(&pdf.freight_cost, &email.freight_cost, msg),
        subtotal: pick(&pdf.subtotal, &email.subtotal, msg),
        tax: pick(&pdf.tax, &email.tax, msg),
        order_total: pick(&pdf.order_total, &email.order_total, msg),
        notes: pick(&pdf.notes, &email.notes, msg),
        backorder_status: pick(&pdf.backorder_status, &email.backorder_status, msg),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn parse(input: &ParseInput) -> ParsedConfirmationFieldsV1 {
        ConfirmationParser::default().parse(input)
    }

    fn assert_null_iff_zero<T>(field: &ParsedField<T>) {
        assert_eq!(field.value.is_none(), field.confidence == 0.0);
        if field.value.is_none() {
            assert!(field.evidence_snippet.is_none());
        }
    }

    fn assert_invariants(result: &ParsedConfirmationFieldsV1) {
        assert_null_iff_zero(&result.supplier_order_number);
        assert_null_iff_zero(&result.confirmed_delivery_date);
        assert_null_iff_zero(&result.confirmed_quantity);
        assert_null_iff_zero(&result.ordered_quantity);
        assert_null_iff_zero(&result.supplier_confirmed_quantity);
        assert_null_iff_zero(&result.commercial.unit_price);
        assert_null_iff_zero(&result.commercial.currency);
        assert_null_iff_zero(&result.commercial.order_total);
    }

    #[test]
    fn test_pdf_end_to_end() {
        let input = ParseInput::new()
            .with_pdf_text(
                "ack.pdf",
                "Confirmed Ship Date: 03/15/2025\nConfirmed Qty: 500\nSO# AB1234567",
            )
            .with_expected_qty(Decimal::from(500));
        let result = parse(&input);

        assert_eq!(result.supplier_order_number.value.as_deref(), Some("AB1234567"));
        assert_eq!(
            result.confirmed_delivery_date.value,
            NaiveDate::from_ymd_opt(2025, 3, 15)
        );
        assert_eq!(result.supplier_confirmed_quantity.value, Some(Decimal::from(500)));
        assert_eq!(result.quantity_mismatch.value, Some(false));
        assert_eq!(result.evidence_source, Source::Pdf);
        assert_eq!(result.supplier_order_number.attachment_id.as_deref(), Some("ack.pdf"));
        assert_eq!(result.extraction_method, ExtractionMethod::Deterministic);
        assert_invariants(&result);
    }

    #[test]
    fn test_quantity_mismatch() {
        let input = ParseInput::new()
            .with_email_text("Hello,\nConfirmed Qty: 90\nThanks")
            .with_expected_qty(Decimal::from(100));
        let result = parse(&input);

        assert_eq!(result.quantity_mismatch.value, Some(true));
        assert_eq!(result.quantity_mismatch.reason, "mismatch: ordered=100, supplier=90");
        assert_eq!(result.ordered_quantity.confidence, 1.0);
        assert_eq!(result.ordered_quantity.source, Source::None);
        assert_eq!(result.evidence_source, Source::Email);
    }

    #[test]
    fn test_idempotent() {
        let input = ParseInput::new()
            .with_po_number("4500012345")
            .with_email_text("PO 4500012345\nShip Date: 2025-04-01\nQty: 24\nSales Order No: 778812")
            .with_debug(true);
        let parser = ConfirmationParser::default();
        assert_eq!(parser.parse(&input), parser.parse(&input));
    }

    #[test]
    fn test_empty_input() {
        let result = parse(&ParseInput::new());
        assert_invariants(&result);
        assert_eq!(result.evidence_source, Source::None);
        assert_eq!(result.raw_excerpt, None);
        assert_eq!(
            result.quantity_mismatch.reason,
            "missing ordered and supplier-confirmed quantity"
        );
    }

    #[test]
    fn test_date_priority_over_order_date() {
        let input = ParseInput::new()
            .with_email_text("Order Date: 2024-01-01\nConfirmed Ship Date: 2024-05-01");
        let result = parse(&input);
        assert_eq!(
            result.confirmed_delivery_date.value,
            NaiveDate::from_ymd_opt(2024, 5, 1)
        );
    }

    #[test]
    fn test_dimension_line_is_not_a_quantity() {
        let input = ParseInput::new()
            .with_email_text("TUBE 1.500 X .120 X 20/24 A500\nConfirmed Qty: 140 PCS")
            .with_debug(true);
        let result = parse(&input);
        assert_eq!(result.supplier_confirmed_quantity.value, Some(Decimal::from(140)));

        let debug = result.debug_candidates.unwrap();
        assert!(debug.quantities.iter().all(|c| c.value != Decimal::new(1500, 3)));
    }

    #[test]
    fn test_generic_table_row_under_qty_header() {
        let input = ParseInput::new()
            .with_email_text("Line Qty Description\n1 24 WIDGET BRACKET")
            .with_expected_qty(Decimal::from(24));
        let result = parse(&input);

        assert_eq!(result.supplier_confirmed_quantity.value, Some(Decimal::from(24)));
        assert_eq!(result.quantity_mismatch.value, Some(false));
        assert_invariants(&result);
    }

    #[test]
    fn test_low_confidence_quantity_is_gated() {
        let input = ParseInput::new()
            .with_email_text("Balance 200 LB")
            .with_expected_qty(Decimal::from(150));
        let result = parse(&input);

        assert!(result.confirmed_quantity.is_present());
        assert!(result.confirmed_quantity.confidence < 0.6);
        assert_eq!(result.supplier_confirmed_quantity.value, None);
        assert_eq!(result.quantity_mismatch.value, None);
        assert_eq!(result.quantity_mismatch.reason, "missing supplier-confirmed quantity");
        assert_invariants(&result);
    }

    #[test]
    fn test_email_beats_weaker_pdf() {
        let input = ParseInput::new()
            .with_pdf_text("scan.pdf", "Order No: 99812")
            .with_email_text("Our Sales Order No: 55120")
            .with_message_id("<abc@supplier>");
        let result = parse(&input);

        assert_eq!(result.supplier_order_number.value.as_deref(), Some("55120"));
        assert_eq!(result.supplier_order_number.source, Source::Email);
        assert_eq!(
            result.supplier_order_number.message_id.as_deref(),
            Some("<abc@supplier>")
        );
        assert_eq!(result.evidence_source, Source::Email);
        assert_eq!(result.raw_excerpt.as_deref(), Some("Our Sales Order No: 55120"));
    }

    #[test]
    fn test_anchor_boost_breaks_tie_between_pdfs() {
        let input = ParseInput::new()
            .with_po_number("PO-7781")
            .with_pdf_text("a.pdf", "Ship Date: 2025-06-01")
            .with_pdf_text("b.pdf", "Ref PO-7781\nShip Date: 2025-06-09");
        let result = parse(&input);
        assert_eq!(
            result.confirmed_delivery_date.value,
            NaiveDate::from_ymd_opt(2025, 6, 9)
        );
        assert_eq!(result.confirmed_delivery_date.attachment_id.as_deref(), Some("b.pdf"));
    }

    #[test]
    fn test_price_table_and_price_change() {
        let pdf = "\
Line Part Description Qty Unit Price Extended
1 100234 TUBE 1.500 X .120 X 20/24 A513 140 EA $12.75 $1,785.00
Subtotal $1,785.00
Payment Terms: Net 30";
        let input = ParseInput::new()
            .with_pdf_text("ack.pdf", pdf)
            .with_expected_qty(Decimal::from(140))
            .with_expected_unit_price(Decimal::new(1250, 2));
        let result = parse(&input);

        assert_eq!(result.supplier_confirmed_quantity.value, Some(Decimal::from(140)));
        assert_eq!(result.commercial.unit_price.value, Some(Decimal::new(1275, 2)));
        assert_eq!(result.commercial.extended_price.value, Some(Decimal::new(178500, 2)));
        assert_eq!(result.commercial.subtotal.value, Some(Decimal::new(178500, 2)));
        assert_eq!(result.commercial.payment_terms.value.as_deref(), Some("Net 30"));
        assert_eq!(result.commercial.currency.value.as_deref(), Some("USD"));

        let change = result.price_changed.unwrap();
        assert!(change.value);
        assert_eq!(change.price_delta, Decimal::new(25, 2));
        assert_eq!(change.price_delta_percent, Some(Decimal::from(2)));
    }

    #[test]
    fn test_debug_candidates_only_on_request() {
        let input = ParseInput::new().with_email_text("Qty 2025 then 12");
        assert!(parse(&input).debug_candidates.is_none());

        let result = parse(&input.with_debug(true));
        let debug = result.debug_candidates.unwrap();
        assert!(debug
            .quantities
            .iter()
            .any(|c| c.excluded.as_deref() == Some("calendar year")));
    }
}
