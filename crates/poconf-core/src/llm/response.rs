//! Validation of untrusted completion output.

use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::Value;

use crate::confirmation::rules::parse_date_token;
use crate::error::LlmError;

/// Completion output exactly as received; every key optional, any JSON type.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawFields {
    supplier_order_number: Option<Value>,
    delivery_date: Option<Value>,
    quantity: Option<Value>,
    unit_price: Option<Value>,
    extended_price: Option<Value>,
    currency: Option<Value>,
    payment_terms: Option<Value>,
    freight_terms: Option<Value>,
    freight_cost: Option<Value>,
    subtotal: Option<Value>,
    tax: Option<Value>,
    order_total: Option<Value>,
    notes: Option<Value>,
    backorder_status: Option<Value>,
}

/// Completion output after per-field validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LlmFields {
    pub supplier_order_number: Option<String>,
    pub delivery_date: Option<NaiveDate>,
    pub quantity: Option<Decimal>,
    pub unit_price: Option<Decimal>,
    pub extended_price: Option<Decimal>,
    pub currency: Option<String>,
    pub payment_terms: Option<String>,
    pub freight_terms: Option<String>,
    pub freight_cost: Option<Decimal>,
    pub subtotal: Option<Decimal>,
    pub tax: Option<Decimal>,
    pub order_total: Option<Decimal>,
    pub notes: Option<String>,
    pub backorder_status: Option<String>,
}

impl LlmFields {
    /// Decode and validate one completion object. Invalid values become `None`.
    pub fn from_json(value: &Value) -> Result<Self, LlmError> {
        let raw = RawFields::deserialize(value).map_err(|e| LlmError::InvalidJson(e.to_string()))?;

        Ok(Self {
            supplier_order_number: text(raw.supplier_order_number),
            delivery_date: date(raw.delivery_date),
            quantity: number(raw.quantity),
            unit_price: number(raw.unit_price),
            extended_price: number(raw.extended_price),
            currency: text(raw.currency).map(|c| c.to_uppercase()),
            payment_terms: text(raw.payment_terms),
            freight_terms: text(raw.freight_terms),
            freight_cost: number(raw.freight_cost),
            subtotal: number(raw.subtotal),
            tax: number(raw.tax),
            order_total: number(raw.order_total),
            notes: text(raw.notes),
            backorder_status: text(raw.backorder_status),
        })
    }

    /// Whether no field survived validation.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Numbers: JSON numbers, or strings once `$`, commas and whitespace are gone.
fn number(value: Option<Value>) -> Option<Decimal> {
    match value? {
        Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| *c != '$' && *c != ',' && !c.is_whitespace())
                .collect();
            Decimal::from_str(&cleaned).ok()
        }
        _ => None,
    }
}

/// Dates: any recognized date token, reformatted; anything else is dropped.
fn date(value: Option<Value>) -> Option<NaiveDate> {
    let s = match value? {
        Value::String(s) => s,
        _ => return None,
    };
    let s = s.trim();
    parse_date_token(s).or_else(|| {
        // "2025-03-15T00:00:00Z"
        s.get(..10)
            .filter(|_| s[10..].starts_with('T'))
            .and_then(parse_date_token)
    })
}

fn text(value: Option<Value>) -> Option<String> {
    let s = match value? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        Value::Bool(true) => "true".to_string(),
        _ => return None,
    };
    let s = s.trim();
    let placeholder = ["null", "none", "n/a", "na", "unknown", "-"]
        .iter()
        .any(|p| s.eq_ignore_ascii_case(p));
    if s.is_empty() || placeholder {
        return None;
    }
    Some(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_sanitizes_every_kind() {
        let fields = LlmFields::from_json(&json!({
            "supplier_order_number": " SO-88123 ",
            "delivery_date": "3/15/2025",
            "quantity": "1,500",
            "unit_price": "$ 12.50",
            "currency": "usd",
            "tax": 0,
            "notes": "N/A",
            "freight_terms": null
        }))
        .unwrap();

        assert_eq!(fields.supplier_order_number.as_deref(), Some("SO-88123"));
        assert_eq!(fields.delivery_date, NaiveDate::from_ymd_opt(2025, 3, 15));
        assert_eq!(fields.quantity, Some(Decimal::from(1500)));
        assert_eq!(fields.unit_price, Some(Decimal::new(1250, 2)));
        assert_eq!(fields.currency.as_deref(), Some("USD"));
        assert_eq!(fields.tax, Some(Decimal::ZERO));
        assert_eq!(fields.notes, None);
        assert_eq!(fields.freight_terms, None);
    }

    #[test]
    fn test_invalid_values_dropped() {
        let fields = LlmFields::from_json(&json!({
            "delivery_date": "next Tuesday",
            "quantity": "about ten",
            "order_total": {"amount": 5}
        }))
        .unwrap();
        assert!(fields.is_empty());
    }

    #[test]
    fn test_timestamp_date() {
        let fields = LlmFields::from_json(&json!({"delivery_date": "2025-03-15T00:00:00Z"})).unwrap();
        assert_eq!(fields.delivery_date, NaiveDate::from_ymd_opt(2025, 3, 15));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let fields = LlmFields::from_json(&json!({"quantity": 12, "confidence": "high"})).unwrap();
        assert_eq!(fields.quantity, Some(Decimal::from(12)));
    }
}
