//! Ordered vs supplier-confirmed quantity, and unit price drift.

use rust_decimal::Decimal;

use crate::models::confirmation::{PriceChange, QuantityMismatch};

/// Compare the system-of-record quantity with the supplier's.
pub fn reconcile_quantity(ordered: Option<Decimal>, supplier: Option<Decimal>) -> QuantityMismatch {
    match (ordered, supplier) {
        (Some(o), Some(s)) if o == s => QuantityMismatch {
            value: Some(false),
            reason: format!("match: ordered={}, supplier={}", o.normalize(), s.normalize()),
        },
        (Some(o), Some(s)) => QuantityMismatch {
            value: Some(true),
            reason: format!("mismatch: ordered={}, supplier={}", o.normalize(), s.normalize()),
        },
        (None, Some(_)) => QuantityMismatch {
            value: None,
            reason: "missing ordered quantity".to_string(),
        },
        (Some(_), None) => QuantityMismatch {
            value: None,
            reason: "missing supplier-confirmed quantity".to_string(),
        },
        (None, None) => QuantityMismatch {
            value: None,
            reason: "missing ordered and supplier-confirmed quantity".to_string(),
        },
    }
}

/// Unit price drift against the expected price.
///
/// `None` when either price is unknown. A delta above `tolerance` in
/// absolute value counts as a change.
pub fn price_change(
    confirmed: Option<Decimal>,
    expected: Option<Decimal>,
    tolerance: Decimal,
) -> Option<PriceChange> {
    let (confirmed, expected) = (confirmed?, expected?);
    let delta = confirmed - expected;

    let percent = if expected.is_zero() {
        None
    } else {
        Some((delta / expected * Decimal::ONE_HUNDRED).round_dp(2))
    };

    Some(PriceChange {
        value: delta.abs() > tolerance,
        price_delta: delta.normalize(),
        price_delta_percent: percent.map(|p| p.normalize()),
    })
}
