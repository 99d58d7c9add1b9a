//! Order-confirmation output model (version 1).

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::field::{ParsedField, Source};
use crate::confirmation::rules::Candidate;

/// Structured fields parsed from a supplier's confirmation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParsedConfirmationFieldsV1 {
    /// Supplier's own order/acknowledgment number.
    pub supplier_order_number: ParsedField<String>,

    /// Confirmed ship/delivery date.
    pub confirmed_delivery_date: ParsedField<NaiveDate>,

    /// Best quantity evidence regardless of confidence.
    pub confirmed_quantity: ParsedField<Decimal>,

    /// Ordered quantity from the system of record.
    pub ordered_quantity: ParsedField<Decimal>,

    /// Quantity the supplier confirmed; empty unless confidently extracted.
    pub supplier_confirmed_quantity: ParsedField<Decimal>,

    /// Ordered vs confirmed comparison.
    pub quantity_mismatch: QuantityMismatch,

    /// Secondary commercial fields.
    #[serde(flatten)]
    pub commercial: CommercialFields,

    /// Unit price comparison against the ordered price.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price_changed: Option<PriceChange>,

    /// `pdf` if any field was won by PDF text, else `email` if anything was found.
    pub evidence_source: Source,

    /// Which path produced the fields.
    pub extraction_method: ExtractionMethod,

    /// Leading excerpt of the evidence text.
    pub raw_excerpt: Option<String>,

    /// Every candidate considered (only when debug was requested).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub debug_candidates: Option<DebugCandidates>,
}

/// Optional commercial fields, each independently nullable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommercialFields {
    pub unit_price: ParsedField<Decimal>,
    pub extended_price: ParsedField<Decimal>,
    pub currency: ParsedField<String>,
    pub payment_terms: ParsedField<String>,
    pub freight_terms: ParsedField<String>,
    pub freight_cost: ParsedField<Decimal>,
    pub subtotal: ParsedField<Decimal>,
    pub tax: ParsedField<Decimal>,
    pub order_total: ParsedField<Decimal>,
    pub notes: ParsedField<String>,
    pub backorder_status: ParsedField<String>,
}

impl CommercialFields {
    /// Winning sources of every commercial field.
    fn sources(&self) -> [(bool, Source); 11] {
        [
            (self.unit_price.is_present(), self.unit_price.source),
            (self.extended_price.is_present(), self.extended_price.source),
            (self.currency.is_present(), self.currency.source),
            (self.payment_terms.is_present(), self.payment_terms.source),
            (self.freight_terms.is_present(), self.freight_terms.source),
            (self.freight_cost.is_present(), self.freight_cost.source),
            (self.subtotal.is_present(), self.subtotal.source),
            (self.tax.is_present(), self.tax.source),
            (self.order_total.is_present(), self.order_total.source),
            (self.notes.is_present(), self.notes.source),
            (self.backorder_status.is_present(), self.backorder_status.source),
        ]
    }
}

/// Ordered vs supplier-confirmed quantity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuantityMismatch {
    /// `None` when either side is missing.
    pub value: Option<bool>,
    pub reason: String,
}

/// Unit-price comparison against the system of record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceChange {
    pub value: bool,
    pub price_delta: Decimal,
    pub price_delta_percent: Option<Decimal>,
}

/// Which path produced the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionMethod {
    #[default]
    Deterministic,
    Llm,
}

/// All ranked candidates, including excluded ones.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DebugCandidates {
    pub dates: Vec<Candidate<NaiveDate>>,
    pub quantities: Vec<Candidate<Decimal>>,
    pub order_numbers: Vec<Candidate<String>>,
}

impl ParsedConfirmationFieldsV1 {
    /// A result with no evidence-derived values.
    pub fn empty(method: ExtractionMethod) -> Self {
        Self {
            supplier_order_number: ParsedField::empty(),
            confirmed_delivery_date: ParsedField::empty(),
            confirmed_quantity: ParsedField::empty(),
            ordered_quantity: ParsedField::empty(),
            supplier_confirmed_quantity: ParsedField::empty(),
            quantity_mismatch: QuantityMismatch {
                value: None,
                reason: String::new(),
            },
            commercial: CommercialFields::default(),
            price_changed: None,
            evidence_source: Source::None,
            extraction_method: method,
            raw_excerpt: None,
            debug_candidates: None,
        }
    }

    fn evidence_sources(&self) -> Vec<(bool, Source)> {
        let mut sources = vec![
            (
                self.supplier_order_number.is_present(),
                self.supplier_order_number.source,
            ),
            (
                self.confirmed_delivery_date.is_present(),
                self.confirmed_delivery_date.source,
            ),
            (
                self.confirmed_quantity.is_present(),
                self.confirmed_quantity.source,
            ),
            (
                self.supplier_confirmed_quantity.is_present(),
                self.supplier_confirmed_quantity.source,
            ),
        ];
        sources.extend(self.commercial.sources());
        sources
    }

    /// Whether any evidence-derived field has a value.
    pub fn has_evidence(&self) -> bool {
        self.evidence_sources().iter().any(|(present, _)| *present)
    }

    /// `pdf` if any field's winning source is PDF, else `email` if anything
    /// was found, else `none`.
    pub fn compute_evidence_source(&self) -> Source {
        let sources = self.evidence_sources();
        if sources
            .iter()
            .any(|(present, source)| *present && *source == Source::Pdf)
        {
            Source::Pdf
        } else if sources.iter().any(|(present, _)| *present) {
            Source::Email
        } else {
            Source::None
        }
    }

    /// Names of the required fields that are missing or below `threshold`.
    pub fn weak_required_fields(&self, threshold: f32) -> Vec<&'static str> {
        let mut weak = Vec::new();
        if !self.supplier_order_number.is_present()
            || self.supplier_order_number.confidence < threshold
        {
            weak.push("supplier_order_number");
        }
        if !self.confirmed_delivery_date.is_present()
            || self.confirmed_delivery_date.confidence < threshold
        {
            weak.push("confirmed_delivery_date");
        }
        if !self.supplier_confirmed_quantity.is_present()
            || self.supplier_confirmed_quantity.confidence < threshold
        {
            weak.push("supplier_confirmed_quantity");
        }
        weak
    }
}
