//! Cross-source field selection.

use crate::models::field::ParsedField;

use super::rules::Candidate;

/// Pick between the best PDF and best email candidate for one field.
///
/// Higher confidence wins; on a tie the PDF candidate is kept.
pub fn choose_field<T: Clone>(
    pdf: Option<&Candidate<T>>,
    email: Option<&Candidate<T>>,
    message_id: Option<&str>,
) -> ParsedField<T> {
    let winner = match (pdf, email) {
        (Some(p), Some(e)) if e.confidence > p.confidence => Some(e),
        (Some(p), _) => Some(p),
        (None, e) => e,
    };

    winner
        .map(|c| ParsedField::from_candidate(c, message_id))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirmation::rules::attribute;
    use crate::models::field::Source;

    fn candidate(value: &str, confidence: f32, source: Source) -> Candidate<String> {
        let mut c = vec![Candidate::new(value.to_string(), confidence, value)];
        attribute(&mut c, source, (source == Source::Pdf).then_some("po-ack.pdf"));
        c.remove(0)
    }

    #[test]
    fn test_higher_confidence_wins() {
        let pdf = candidate("SO-1001", 0.7, Source::Pdf);
        let email = candidate("SO-2002", 0.9, Source::Email);
        let field = choose_field(Some(&pdf), Some(&email), Some("msg-1"));
        assert_eq!(field.value.as_deref(), Some("SO-2002"));
        assert_eq!(field.source, Source::Email);
        assert_eq!(field.attachment_id, None);
        assert_eq!(field.message_id.as_deref(), Some("msg-1"));
    }

    #[test]
    fn test_tie_goes_to_pdf() {
        let pdf = candidate("SO-1001", 0.8, Source::Pdf);
        let email = candidate("SO-2002", 0.8, Source::Email);
        let field = choose_field(Some(&pdf), Some(&email), None);
        assert_eq!(field.value.as_deref(), Some("SO-1001"));
        assert_eq!(field.source, Source::Pdf);
        assert_eq!(field.attachment_id.as_deref(), Some("po-ack.pdf"));
    }

    #[test]
    fn test_single_source_and_none() {
        let email = candidate("SO-2002", 0.6, Source::Email);
        let field = choose_field(None, Some(&email), None);
        assert_eq!(field.source, Source::Email);

        let empty: ParsedField<String> = choose_field(None, None, None);
        assert!(empty.value.is_none());
        assert_eq!(empty.confidence, 0.0);
    }
}
