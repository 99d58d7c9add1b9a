//! Candidate ordering and per-source selection.

use std::cmp::Ordering;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::rules::Candidate;

/// Quantities within this much of the leader are a near tie.
pub const NEAR_TIE: f32 = 0.05;

fn by_priority_then_confidence<T>(a: &Candidate<T>, b: &Candidate<T>) -> Ordering {
    b.priority
        .cmp(&a.priority)
        .then(b.confidence.total_cmp(&a.confidence))
}

/// Excluded candidates always sort last.
fn selectable_first<T>(a: &Candidate<T>, b: &Candidate<T>) -> Ordering {
    b.is_selectable().cmp(&a.is_selectable())
}

/// Order dates by label priority, then confidence, then earliest date.
pub fn rank_dates(candidates: &mut [Candidate<NaiveDate>]) {
    candidates.sort_by(|a, b| {
        selectable_first(a, b)
            .then_with(|| by_priority_then_confidence(a, b))
            .then(a.value.cmp(&b.value))
    });
}

/// Order quantities: selectable, away from weight units, label priority,
/// confidence, then value.
///
/// Within the leading tier (same exclusion, unit and priority class as the
/// head) the smallest value whose confidence is within [`NEAR_TIE`] of the
/// top is promoted to the front.
pub fn rank_quantities(candidates: &mut [Candidate<Decimal>]) {
    candidates.sort_by(|a, b| {
        selectable_first(a, b)
            .then(a.near_weight_unit.cmp(&b.near_weight_unit))
            .then_with(|| by_priority_then_confidence(a, b))
            .then(a.value.cmp(&b.value))
    });

    let Some(head) = candidates.first() else {
        return;
    };
    if !head.is_selectable() {
        return;
    }
    let (top, near_weight_unit, priority) = (head.confidence, head.near_weight_unit, head.priority);

    let tier_len = candidates
        .iter()
        .take_while(|c| {
            c.is_selectable() && c.near_weight_unit == near_weight_unit && c.priority == priority
        })
        .count();

    let promoted = candidates[..tier_len]
        .iter()
        .enumerate()
        .filter(|(_, c)| top - c.confidence <= NEAR_TIE)
        .min_by(|(_, a), (_, b)| a.value.cmp(&b.value))
        .map(|(i, _)| i);

    if let Some(i) = promoted {
        candidates[..=i].rotate_right(1);
    }
}

/// Order any candidate list by confidence, keeping extraction order on ties.
pub fn rank_by_confidence<T>(candidates: &mut [Candidate<T>]) {
    candidates.sort_by(|a, b| selectable_first(a, b).then(b.confidence.total_cmp(&a.confidence)));
}

/// First selectable candidate of a ranked list.
pub fn best<T>(ranked: &[Candidate<T>]) -> Option<&Candidate<T>> {
    ranked.iter().find(|c| c.is_selectable())
}

/// Confidence gap between the two leading selectable candidates, if two exist.
pub fn confidence_spread<T>(ranked: &[Candidate<T>]) -> Option<f32> {
    let mut selectable = ranked.iter().filter(|c| c.is_selectable());
    let first = selectable.next()?;
    let second = selectable.next()?;
    Some((first.confidence - second.confidence).abs())
}
