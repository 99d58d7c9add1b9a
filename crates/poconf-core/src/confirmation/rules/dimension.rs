//! Dimension/spec exclusion filter.
//!
//! Mill and metals paperwork is full of numbers that are not quantities:
//! grade codes (`A500`), tube sizes (`1.500 X .120 X 20/24`), inch marks.
//! A token caught here is excluded outright rather than penalized.

use super::patterns::{DATE_TOKEN, FRACTION, INCH_MARK, MULTIPLY_MARKER};

/// Why the number at `start..end` of `line` is part of a spec, if it is.
///
/// Only looks at the characters touching the token.
pub fn token_exclusion(line: &str, start: usize, end: usize) -> Option<&'static str> {
    let before = &line[..start];
    let after = &line[end..];

    let prev = before.chars().next_back();
    let next = after.chars().next();

    if prev.is_some_and(|c| c.is_alphabetic()) {
        return Some("alphanumeric code");
    }
    if next.is_some_and(|c| c.is_alphabetic()) {
        let word_rest: String = after.chars().take_while(|c| !c.is_whitespace()).collect();
        if word_rest.chars().any(|c| c.is_ascii_digit()) {
            return Some("alphanumeric code");
        }
    }

    if prev == Some('/') && before[..before.len() - 1].ends_with(|c: char| c.is_ascii_digit()) {
        return Some("fraction");
    }
    if next == Some('/') && after[1..].starts_with(|c: char| c.is_ascii_digit()) {
        return Some("fraction");
    }

    if prev == Some('.') && !before[..before.len() - 1].ends_with(|c: char| c.is_ascii_digit()) {
        return Some("decimal spec");
    }

    if ends_with_multiply(before.trim_end()) || starts_with_multiply(after.trim_start()) {
        return Some("dimension marker");
    }

    if next == Some('"') {
        return Some("inch mark");
    }

    None
}

/// Whether `line` carries two or more dimension markers.
///
/// Date tokens are blanked first so `03/15/2025` is not read as a fraction.
pub fn line_has_dimension_context(line: &str) -> bool {
    let without_dates = DATE_TOKEN.replace_all(line, " ");
    let markers = MULTIPLY_MARKER.find_iter(&without_dates).count()
        + FRACTION.find_iter(&without_dates).count()
        + INCH_MARK.find_iter(&without_dates).count();
    markers >= 2
}

/// Full exclusion check: token-local rules, then the line-level rule.
pub fn exclusion_reason(line: &str, start: usize, end: usize) -> Option<&'static str> {
    token_exclusion(line, start, end).or_else(|| {
        line_has_dimension_context(line).then_some("dimension line")
    })
}

fn is_multiply(c: char) -> bool {
    matches!(c, 'x' | 'X' | '×')
}

fn ends_with_multiply(s: &str) -> bool {
    let mut chars = s.chars().rev();
    match chars.next() {
        Some(c) if is_multiply(c) => !chars.next().is_some_and(|c| c.is_alphabetic()),
        _ => false,
    }
}

fn starts_with_multiply(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if is_multiply(c) => !chars.next().is_some_and(|c| c.is_alphabetic()),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason_for(line: &str, token: &str) -> Option<&'static str> {
        let start = line.find(token).unwrap();
        token_exclusion(line, start, start + token.len())
    }

    #[test]
    fn test_grade_code_is_excluded() {
        assert_eq!(reason_for("ASTM A500 GR B", "500"), Some("alphanumeric code"));
        assert_eq!(reason_for("HEAT 500A36", "500"), Some("alphanumeric code"));
        assert_eq!(reason_for("Qty 140 PCS", "140"), None);
    }

    #[test]
    fn test_fraction_is_excluded() {
        assert_eq!(reason_for("LENGTH 20/24 FT", "20"), Some("fraction"));
        assert_eq!(reason_for("LENGTH 20/24 FT", "24"), Some("fraction"));
    }

    #[test]
    fn test_multiplication_is_excluded() {
        assert_eq!(reason_for("1.500 X .120", "1.500"), Some("dimension marker"));
        assert_eq!(reason_for("4 x 8 sheet", "8"), Some("dimension marker"));
        assert_eq!(reason_for("Box 12", "12"), None);
    }

    #[test]
    fn test_raw_decimal_spec_is_excluded() {
        assert_eq!(reason_for("WALL .120 MIN", "120"), Some("decimal spec"));
    }

    #[test]
    fn test_dimension_line() {
        assert!(line_has_dimension_context("TUBE 1.500 X .120 X 20/24"));
        assert!(!line_has_dimension_context("Confirmed Qty: 140 PCS"));
        assert!(!line_has_dimension_context("Ship 03/15/2025 deliver 03/20/2025"));
    }
}
