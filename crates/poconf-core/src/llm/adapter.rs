//! Maps a validated completion onto the output model.

use std::fmt::Display;
use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::confirmation::raw_excerpt;
use crate::confirmation::reconcile::{price_change, reconcile_quantity};
use crate::confirmation::rules::NormalizedText;
use crate::confirmation::rules::text::snippet;
use crate::error::LlmError;
use crate::models::config::{ExtractionConfig, LlmConfig};
use crate::models::confirmation::{CommercialFields, ExtractionMethod, ParsedConfirmationFieldsV1};
use crate::models::field::{ParsedField, Source};
use crate::models::input::ParseInput;

use super::prompt::build_prompt;
use super::response::LlmFields;
use super::CompletionClient;

/// One-shot completion fallback for a confirmation.
#[derive(Clone)]
pub struct LlmFallback {
    client: Arc<dyn CompletionClient>,
    extraction: ExtractionConfig,
    max_source_chars: usize,
}

/// Provenance shared by every field of one completion.
struct Provenance<'a> {
    texts: Vec<(Option<&'a str>, &'a str)>,
    source: Source,
    message_id: Option<&'a str>,
    confidence: f32,
    snippet_max: usize,
}

impl Provenance<'_> {
    /// Field built from a completion value, pointing at the first line
    /// that mentions it.
    fn field<T>(&self, key: &str, value: Option<T>, needles: impl Fn(&T) -> Vec<String>) -> ParsedField<T> {
        let Some(value) = value else {
            return ParsedField::empty();
        };

        let needles = needles(&value);
        let located = self.texts.iter().find_map(|(attachment, text)| {
            let text = NormalizedText::new(text);
            text.lines()
                .find(|line| {
                    let line = line.to_lowercase();
                    needles.iter().any(|n| !n.is_empty() && line.contains(&n.to_lowercase()))
                })
                .map(|line| (*attachment, snippet(line, self.snippet_max)))
        });

        let default_attachment = self.texts.first().and_then(|(a, _)| *a);
        let (attachment, evidence) = located.unwrap_or_else(|| {
            (
                default_attachment,
                format!("{key}: {}", needles.first().cloned().unwrap_or_default()),
            )
        });

        ParsedField::evidence(
            value,
            self.confidence,
            evidence,
            self.source,
            attachment.map(str::to_string),
            self.message_id.map(str::to_string),
        )
    }

    fn display<T: Display>(&self, key: &str, value: Option<T>) -> ParsedField<T> {
        self.field(key, value, |v| vec![v.to_string()])
    }

    fn amount(&self, key: &str, value: Option<Decimal>) -> ParsedField<Decimal> {
        self.field(key, value, |v| {
            let plain = v.normalize().to_string();
            vec![format!("{v:.2}"), plain]
        })
    }
}

impl LlmFallback {
    pub fn new(client: Arc<dyn CompletionClient>, llm: &LlmConfig, extraction: ExtractionConfig) -> Self {
        Self {
            client,
            extraction,
            max_source_chars: llm.max_source_chars,
        }
    }

    /// Ask the completion service for every field.
    ///
    /// Fails with [`LlmError::ExtractionUncertain`] when the model answered
    /// but nothing survived validation.
    pub async fn extract(&self, input: &ParseInput) -> Result<ParsedConfirmationFieldsV1, LlmError> {
        let prompt = build_prompt(input, self.max_source_chars);
        debug!("Requesting completion with {} prompt characters", prompt.user.len());

        let raw = self.client.complete(&prompt).await?;
        let fields = LlmFields::from_json(&raw)?;
        if fields.is_empty() {
            return Err(LlmError::ExtractionUncertain);
        }

        let (source, texts): (Source, Vec<(Option<&str>, &str)>) = if input.has_pdf_text() {
            let texts = input
                .pdf_texts
                .iter()
                .filter_map(|p| p.usable_text().map(|t| (Some(p.attachment_id.as_str()), t)))
                .collect();
            (Source::Pdf, texts)
        } else {
            (Source::Email, input.usable_email_text().map(|t| (None, t)).into_iter().collect())
        };

        let prov = Provenance {
            texts,
            source,
            message_id: input.message_id.as_deref(),
            confidence: self.extraction.llm_confidence,
            snippet_max: self.extraction.snippet_max_chars,
        };

        let mut result = ParsedConfirmationFieldsV1::empty(ExtractionMethod::Llm);
        result.supplier_order_number =
            prov.display("supplier_order_number", fields.supplier_order_number);
        result.confirmed_delivery_date = prov.field("delivery_date", fields.delivery_date, |d| {
            vec![
                d.format("%Y-%m-%d").to_string(),
                d.format("%-m/%-d/%Y").to_string(),
                d.format("%m/%d/%Y").to_string(),
                d.format("%B %-d, %Y").to_string(),
                d.format("%b %-d, %Y").to_string(),
            ]
        });
        result.confirmed_quantity = prov.field("quantity", fields.quantity, |q| {
            let plain = q.normalize().to_string();
            let mut needles = vec![plain.clone()];
            if let Ok(n) = plain.parse::<u64>() {
                needles.push(with_thousands(n));
            }
            needles
        });
        result.supplier_confirmed_quantity = result
            .confirmed_quantity
            .clone()
            .gated(self.extraction.min_field_confidence);
        result.ordered_quantity = ParsedField::system_of_record(input.expected_qty);
        result.quantity_mismatch =
            reconcile_quantity(input.expected_qty, result.supplier_confirmed_quantity.value);

        result.commercial = CommercialFields {
            unit_price: prov.amount("unit_price", fields.unit_price),
            extended_price: prov.amount("extended_price", fields.extended_price),
            currency: prov.display("currency", fields.currency),
            payment_terms: prov.display("payment_terms", fields.payment_terms),
            freight_terms: prov.display("freight_terms", fields.freight_terms),
            freight_cost: prov.amount("freight_cost", fields.freight_cost),
            subtotal: prov.amount("subtotal", fields.subtotal),
            tax: prov.amount("tax", fields.tax),
            order_total: prov.amount("order_total", fields.order_total),
            notes: prov.display("notes", fields.notes),
            backorder_status: prov.display("backorder_status", fields.backorder_status),
        };
        result.price_changed = price_change(
            fields.unit_price,
            input.expected_unit_price,
            self.extraction.price_change_tolerance,
        );

        result.evidence_source = result.compute_evidence_source();
        result.raw_excerpt =
            raw_excerpt(input, result.evidence_source, self.extraction.excerpt_max_chars);

        info!(
            "LLM parse: order_no={}, date={}, qty={}, source={:?}",
            result.supplier_order_number.is_present(),
            result.confirmed_delivery_date.is_present(),
            result.supplier_confirmed_quantity.is_present(),
            result.evidence_source
        );

        Ok(result)
    }
}

fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::new();
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    use crate::llm::Prompt;

    struct StubClient(serde_json::Value);

    #[async_trait]
    impl CompletionClient for StubClient {
        async fn complete(&self, _prompt: &Prompt) -> Result<serde_json::Value, LlmError> {
            Ok(self.0.clone())
        }
    }

    struct FailingClient;

    #[async_trait]
    impl CompletionClient for FailingClient {
        async fn complete(&self, _prompt: &Prompt) -> Result<serde_json::Value, LlmError> {
            Err(LlmError::EmptyResponse)
        }
    }

    fn fallback(client: impl CompletionClient + 'static) -> LlmFallback {
        LlmFallback::new(Arc::new(client), &LlmConfig::default(), ExtractionConfig::default())
    }

    #[tokio::test]
    async fn test_maps_fields_with_fixed_confidence() {
        let input = ParseInput::new()
            .with_pdf_text("ack.pdf", "Sales Order 88123\nShip 3/15/2025\nQty 1,500 @ 12.75")
            .with_expected_qty(Decimal::from(1500))
            .with_expected_unit_price(Decimal::new(1250, 2))
            .with_message_id("m-1");
        let llm = fallback(StubClient(json!({
            "supplier_order_number": "88123",
            "delivery_date": "2025-03-15",
            "quantity": 1500,
            "unit_price": "12.75",
            "notes": null
        })));

        let result = llm.extract(&input).await.unwrap();

        assert_eq!(result.extraction_method, ExtractionMethod::Llm);
        assert_eq!(result.evidence_source, Source::Pdf);
        assert_eq!(result.supplier_order_number.value.as_deref(), Some("88123"));
        assert_eq!(result.supplier_order_number.confidence, 0.85);
        assert_eq!(
            result.supplier_order_number.evidence_snippet.as_deref(),
            Some("Sales Order 88123")
        );
        assert_eq!(result.supplier_order_number.attachment_id.as_deref(), Some("ack.pdf"));
        assert_eq!(result.supplier_order_number.message_id.as_deref(), Some("m-1"));
        assert_eq!(
            result.confirmed_delivery_date.evidence_snippet.as_deref(),
            Some("Ship 3/15/2025")
        );
        assert_eq!(result.supplier_confirmed_quantity.value, Some(Decimal::from(1500)));
        assert_eq!(
            result.confirmed_quantity.evidence_snippet.as_deref(),
            Some("Qty 1,500 @ 12.75")
        );
        assert_eq!(result.quantity_mismatch.value, Some(false));
        assert!(result.commercial.notes.value.is_none());
        assert_eq!(result.commercial.notes.confidence, 0.0);

        let change = result.price_changed.unwrap();
        assert!(change.value);
        assert_eq!(change.price_delta, Decimal::new(25, 2));
        assert_eq!(change.price_delta_percent, Some(Decimal::from(2)));
    }

    #[tokio::test]
    async fn test_email_source_without_pdf() {
        let input = ParseInput::new().with_email_text("We will ship on 2025-04-02.");
        let llm = fallback(StubClient(json!({"delivery_date": "2025-04-02"})));

        let result = llm.extract(&input).await.unwrap();
        assert_eq!(result.evidence_source, Source::Email);
        assert_eq!(
            result.confirmed_delivery_date.value,
            NaiveDate::from_ymd_opt(2025, 4, 2)
        );
        assert_eq!(result.confirmed_delivery_date.attachment_id, None);
        assert!(result.price_changed.is_none());
    }

    #[tokio::test]
    async fn test_unlocated_value_gets_key_snippet() {
        let input = ParseInput::new().with_email_text("Confirmed, thanks");
        let llm = fallback(StubClient(json!({"currency": "USD"})));

        let result = llm.extract(&input).await.unwrap();
        assert_eq!(
            result.commercial.currency.evidence_snippet.as_deref(),
            Some("currency: USD")
        );
    }

    #[tokio::test]
    async fn test_no_usable_fields_is_uncertain() {
        let input = ParseInput::new().with_email_text("hello");
        let llm = fallback(StubClient(json!({"quantity": "unknown", "delivery_date": null})));
        assert!(matches!(
            llm.extract(&input).await,
            Err(LlmError::ExtractionUncertain)
        ));
    }

    #[tokio::test]
    async fn test_client_errors_pass_through() {
        let input = ParseInput::new().with_email_text("hello");
        assert!(matches!(
            fallback(FailingClient).extract(&input).await,
            Err(LlmError::EmptyResponse)
        ));
    }

    #[test]
    fn test_with_thousands() {
        assert_eq!(with_thousands(1500), "1,500");
        assert_eq!(with_thousands(1234567), "1,234,567");
        assert_eq!(with_thousands(999), "999");
    }
}
