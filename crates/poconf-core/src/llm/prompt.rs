//! Prompt construction for the completion fallback.

use std::fmt::Write as _;

use crate::models::input::ParseInput;

use super::Prompt;

/// Keys the model must return, in this order.
pub const FIELD_KEYS: [&str; 14] = [
    "supplier_order_number",
    "delivery_date",
    "quantity",
    "unit_price",
    "extended_price",
    "currency",
    "payment_terms",
    "freight_terms",
    "freight_cost",
    "subtotal",
    "tax",
    "order_total",
    "notes",
    "backorder_status",
];

const SYSTEM_PROMPT: &str = "You extract fields from a supplier's purchase-order confirmation. \
Respond with a single JSON object and nothing else. Use exactly the keys listed by the user. \
Copy values only from the supplied text. Never invent, infer or compute a value: \
when a field is not stated, set it to null. Dates must be YYYY-MM-DD. \
Numbers must be plain numbers without currency symbols or thousands separators.";

/// Build the prompt for one confirmation, truncating each text to `max_source_chars`.
pub fn build_prompt(input: &ParseInput, max_source_chars: usize) -> Prompt {
    let mut user = String::new();

    let _ = writeln!(user, "Return a JSON object with these keys:");
    let _ = writeln!(user, "{}", FIELD_KEYS.join(", "));
    let _ = writeln!(user);

    if let Some(po) = &input.po_number {
        let _ = writeln!(user, "Buyer purchase order number (not the supplier order number): {po}");
    }
    if let Some(line) = &input.line_id {
        let _ = writeln!(user, "Purchase order line: {line}");
    }

    for attachment in &input.pdf_texts {
        if let Some(text) = attachment.usable_text() {
            let _ = writeln!(user, "\n--- PDF attachment {} ---", attachment.attachment_id);
            let _ = writeln!(user, "{}", truncate(text, max_source_chars));
        }
    }
    if let Some(text) = input.usable_email_text() {
        let _ = writeln!(user, "\n--- Email body ---");
        let _ = writeln!(user, "{}", truncate(text, max_source_chars));
    }

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
