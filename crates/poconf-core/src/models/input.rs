//! Parser input: evidence text plus read-only purchase-order context.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Text extracted from one PDF attachment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PdfText {
    #[serde(alias = "attachmentId")]
    pub attachment_id: String,
    #[serde(default)]
    pub text: Option<String>,
}

impl PdfText {
    pub fn new(attachment_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            attachment_id: attachment_id.into(),
            text: Some(text.into()),
        }
    }

    /// The text, if it has any non-whitespace content.
    pub fn usable_text(&self) -> Option<&str> {
        self.text.as_deref().filter(|t| !t.trim().is_empty())
    }
}

/// Everything the engine needs for one confirmation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ParseInput {
    /// Purchase-order number used as an anchor.
    pub po_number: Option<String>,
    /// Purchase-order line id used as an anchor.
    pub line_id: Option<String>,
    /// Raw email body.
    pub email_text: Option<String>,
    /// Per-attachment PDF text.
    pub pdf_texts: Vec<PdfText>,
    /// Include every candidate in the output.
    pub debug: bool,
    /// Ordered quantity from the system of record.
    pub expected_qty: Option<Decimal>,
    /// Ordered unit price from the system of record.
    pub expected_unit_price: Option<Decimal>,
    /// Id of the inbound message carrying the evidence.
    pub message_id: Option<String>,
}

impl ParseInput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_po_number(mut self, po_number: impl Into<String>) -> Self {
        self.po_number = Some(po_number.into());
        self
    }

    pub fn with_line_id(mut self, line_id: impl Into<String>) -> Self {
        self.line_id = Some(line_id.into());
        self
    }

    pub fn with_email_text(mut self, text: impl Into<String>) -> Self {
        self.email_text = Some(text.into());
        self
    }

    pub fn with_pdf_text(mut self, attachment_id: impl Into<String>, text: impl Into<String>) -> Self {
        self.pdf_texts.push(PdfText::new(attachment_id, text));
        self
    }

    pub fn with_expected_qty(mut self, qty: Decimal) -> Self {
        self.expected_qty = Some(qty);
        self
    }

    pub fn with_expected_unit_price(mut self, price: Decimal) -> Self {
        self.expected_unit_price = Some(price);
        self
    }

    pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
        self.message_id = Some(message_id.into());
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Whether any attachment carries usable PDF text.
    pub fn has_pdf_text(&self) -> bool {
        self.pdf_texts.iter().any(|p| p.usable_text().is_some())
    }

    /// The email body, if it has any non-whitespace content.
    pub fn usable_email_text(&self) -> Option<&str> {
        self.email_text.as_deref().filter(|t| !t.trim().is_empty())
    }
}
