//! Label-aware date extraction.

use chrono::NaiveDate;
use regex::Captures;

use super::patterns::{DATE_LABELS, DATE_TOKEN};
use super::text::{NormalizedText, snippet};
use super::{Candidate, FieldExtractor};

const WINDOW_CHARS: usize = 100;
const FALLBACK_CONFIDENCE: f32 = 0.4;
const ORDER_DATE_PRIORITY: u32 = 10;

/// Date field extractor.
pub struct DateExtractor {
    snippet_max: usize,
}

impl DateExtractor {
    pub fn new() -> Self {
        Self { snippet_max: 160 }
    }

    pub fn with_snippet_max(mut self, max: usize) -> Self {
        self.snippet_max = max;
        self
    }

    fn labeled(&self, text: &NormalizedText) -> Vec<Candidate<NaiveDate>> {
        let s = text.as_str();
        let all: Vec<(usize, std::ops::Range<usize>)> = DATE_LABELS
            .iter()
            .enumerate()
            .flat_map(|(idx, label)| label.regex.find_iter(s).map(move |m| (idx, m.range())))
            .collect();

        // "ship date" inside "confirmed ship date" is the same label
        let mut matches: Vec<_> = all
            .iter()
            .filter(|(_, r)| {
                !all.iter().any(|(_, other)| {
                    other.start <= r.start && r.end <= other.end && other.len() > r.len()
                })
            })
            .cloned()
            .collect();
        matches.sort_by_key(|(_, r)| r.start);

        let mut results = Vec::new();
        for (i, (label_idx, range)) in matches.iter().enumerate() {
            let label = &DATE_LABELS[*label_idx];
            let mut window_end = text.advance_chars(range.end, WINDOW_CHARS);
            if let Some((_, next)) = matches.get(i + 1) {
                window_end = window_end.min(next.start.max(range.end));
            }
            let window = &s[range.end..window_end];

            let Some(caps) = DATE_TOKEN.captures(window) else {
                continue;
            };
            let Some(date) = date_from_captures(&caps) else {
                continue;
            };

            let token_end = range.end + caps.get(0).map(|m| m.end()).unwrap_or(0);
            let confidence = 0.5 + label.priority as f32 / 200.0;
            results.push(
                Candidate::new(date, confidence, snippet(&s[range.start..token_end], self.snippet_max))
                    .with_label(label.name, label.priority)
                    .at_line(text.line_of(range.start)),
            );
        }

        // Order date only counts when nothing better was labeled
        if results.iter().any(|c| c.priority > ORDER_DATE_PRIORITY) {
            results.retain(|c| c.priority > ORDER_DATE_PRIORITY);
        }

        results.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(b.confidence.total_cmp(&a.confidence))
        });
        results
    }

    fn unlabeled(&self, text: &NormalizedText) -> Vec<Candidate<NaiveDate>> {
        DATE_TOKEN
            .captures_iter(text.as_str())
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let date = date_from_captures(&caps)?;
                let line = text.line_of(whole.start());
                Some(
                    Candidate::new(date, FALLBACK_CONFIDENCE, snippet(text.line(line), self.snippet_max))
                        .with_label("unlabeled", 0)
                        .at_line(line),
                )
            })
            .collect()
    }
}

impl Default for DateExtractor {
    fn default() -> Self {
        Self::new()
    }
}

impl FieldExtractor for DateExtractor {
    type Output = NaiveDate;

    fn extract_all(&self, text: &NormalizedText) -> Vec<Candidate<NaiveDate>> {
        let labeled = self.labeled(text);
        if !labeled.is_empty() {
            return labeled;
        }
        self.unlabeled(text)
    }
}

/// Canonicalize a single date token ("2025-03-15", "3/15/25", "March 15, 2025").
pub fn parse_date_token(token: &str) -> Option<NaiveDate> {
    let trimmed = token.trim();
    let caps = DATE_TOKEN.captures(trimmed)?;
    // The whole token must be the date
    if caps.get(0)?.as_str().len() != trimmed.len() {
        return None;
    }
    date_from_captures(&caps)
}

fn date_from_captures(caps: &Captures<'_>) -> Option<NaiveDate> {
    if let (Some(y), Some(m), Some(d)) = (caps.get(1), caps.get(2), caps.get(3)) {
        return NaiveDate::from_ymd_opt(
            y.as_str().parse().ok()?,
            m.as_str().parse().ok()?,
            d.as_str().parse().ok()?,
        );
    }
    if let (Some(m), Some(d), Some(y)) = (caps.get(4), caps.get(5), caps.get(6)) {
        return NaiveDate::from_ymd_opt(
            parse_year(y.as_str())?,
            m.as_str().parse().ok()?,
            d.as_str().parse().ok()?,
        );
    }
    if let (Some(name), Some(d), Some(y)) = (caps.get(7), caps.get(8), caps.get(9)) {
        return NaiveDate::from_ymd_opt(
            y.as_str().parse().ok()?,
            month_to_number(name.as_str())?,
            d.as_str().parse().ok()?,
        );
    }
    None
}

fn parse_year(s: &str) -> Option<i32> {
    let year: i32 = s.parse().ok()?;
    if s.len() == 2 {
        // Two-digit year pivot
        if year <= 69 {
            Some(2000 + year)
        } else {
            Some(1900 + year)
        }
    } else {
        Some(year)
    }
}

fn month_to_number(month: &str) -> Option<u32> {
    let month = month.to_lowercase();
    let n = match month.get(..3)? {
        "jan" => 1,
        "feb" => 2,
        "mar" => 3,
        "apr" => 4,
        "may" => 5,
        "jun" => 6,
        "jul" => 7,
        "aug" => 8,
        "sep" => 9,
        "oct" => 10,
        "nov" => 11,
        "dec" => 12,
        _ => return None,
    };
    Some(n)
}
