//! Common regex patterns for order-confirmation extraction.

use lazy_static::lazy_static;
use regex::Regex;

/// A descriptive label and its ranking priority.
pub struct LabelPattern {
    pub name: &'static str,
    pub regex: Regex,
    pub priority: u32,
}

impl LabelPattern {
    fn new(name: &'static str, pattern: &str, priority: u32) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).unwrap(),
            priority,
        }
    }
}

lazy_static! {
    // Date-bearing labels, highest priority first
    pub static ref DATE_LABELS: Vec<LabelPattern> = vec![
        LabelPattern::new("confirmed ship date", r"(?i)\bconfirmed\s+ship(?:ping)?\s+date\b", 100),
        LabelPattern::new("confirmed delivery date", r"(?i)\bconfirmed\s+deliv(?:ery)?\s+date\b", 95),
        LabelPattern::new("ship date", r"(?i)\bship(?:ping)?\s+date\b", 80),
        LabelPattern::new("delivery date", r"(?i)\bdeliv(?:ery)?\s+date\b", 75),
        LabelPattern::new("deliver by", r"(?i)\bdeliver(?:ed)?\s+by\b", 70),
        LabelPattern::new(
            "expected ship/delivery",
            r"(?i)\bexpected\s+(?:ship(?:ping|ment)?|deliv(?:ery)?|arrival)(?:\s+date)?\b",
            65,
        ),
        LabelPattern::new(
            "promise date",
            r"(?i)\bpromised?\s+(?:ship\s+|deliv(?:ery)?\s+)?date\b",
            60,
        ),
        LabelPattern::new("order date", r"(?i)\b(?:order|po)\s+date\b", 10),
    ];

    // ISO, M/D/Y and "Month D, YYYY" date tokens
    pub static ref DATE_TOKEN: Regex = Regex::new(
        r"(?i)\b(?:(\d{4})-(\d{1,2})-(\d{1,2})|(\d{1,2})/(\d{1,2})/(\d{4}|\d{2})|(jan(?:uary)?|feb(?:ruary)?|mar(?:ch)?|apr(?:il)?|may|june?|july?|aug(?:ust)?|sep(?:t(?:ember)?)?|oct(?:ober)?|nov(?:ember)?|dec(?:ember)?)\.?\s+(\d{1,2})(?:st|nd|rd|th)?,?\s+(\d{4}))\b"
    ).unwrap();

    pub static ref ISO_DATE: Regex = Regex::new(r"^\d{4}-\d{2}-\d{2}$").unwrap();

    // Quantity-bearing labels, highest priority first
    pub static ref QUANTITY_LABELS: Vec<LabelPattern> = vec![
        LabelPattern::new("confirmed qty", r"(?i)\bconfirmed\s+(?:qty|quantity)\b", 100),
        LabelPattern::new("order qty", r"(?i)\border(?:ed)?\s+(?:qty|quantity)\b", 80),
        LabelPattern::new("qty", r"(?i)\b(?:qty|quantity)\b", 60),
        LabelPattern::new("shipped", r"(?i)\b(?:shipped|ship\s+qty)\b", 50),
        LabelPattern::new("balance", r"(?i)\bbalance\b", 40),
    ];

    // Plain numbers with optional thousands separators and decimals
    pub static ref NUMBER_TOKEN: Regex = Regex::new(
        r"\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?"
    ).unwrap();

    // Money-looking numbers: "$1,234.50", "12.5000"
    pub static ref MONEY_TOKEN: Regex = Regex::new(
        r"(\$\s?)?(\d{1,3}(?:,\d{3})+|\d+)(\.\d{2,4})?\b"
    ).unwrap();

    // Price-column cells under a price-table header: any decimal places
    pub static ref PRICE_CELL: Regex = Regex::new(
        r"(\$\s?)?(\d{1,3}(?:,\d{3})+|\d+)(\.\d{1,4})?\b"
    ).unwrap();

    pub static ref TWO_DECIMAL: Regex = Regex::new(r"\.\d{2}$").unwrap();

    // Weight/length unit words that mark a number as a measurement; bare
    // `in` only counts right after a number
    pub static ref WEIGHT_UNIT: Regex = Regex::new(
        r"(?i)\b(?:lbs?|pounds?|ft|feet|foot|ga|gauge|od|id|mm|cm|inch(?:es)?|kgs?|wt|cwt|mtrs?)\b|\d\s?in\b"
    ).unwrap();

    // Dimension markers: standalone "x"/"×", small fractions, inch marks
    pub static ref MULTIPLY_MARKER: Regex = Regex::new(
        r"(?i)(?:^|[\s\d.])[x×](?:$|[\s\d.])"
    ).unwrap();

    pub static ref FRACTION: Regex = Regex::new(r"\b\d{1,3}/\d{1,3}\b").unwrap();

    pub static ref INCH_MARK: Regex = Regex::new(r#"\d""#).unwrap();

    // Supplier order number families, highest base confidence first
    pub static ref SUPPLIER_ORDER_NO: Regex = Regex::new(
        r"(?i)\b(?:supplier|sales|vendor)\s+order(?:\s*(?:no\b\.?|#|number|num\b\.?|nbr\b|confirmation\b))?\s*[:#.\-]?\s*([A-Za-z0-9][A-Za-z0-9\-/]{3,})"
    ).unwrap();

    pub static ref SO_NUMBER: Regex = Regex::new(
        r"\b(?:SO|S-O|S\.O\.)(?:\s*(?i:no\b\.?|#|number))?\s*[:#\-]?\s*([A-Za-z0-9][A-Za-z0-9\-/]{3,})"
    ).unwrap();

    pub static ref ACK_NUMBER: Regex = Regex::new(
        r"(?i)\back(?:nowledg(?:e)?ment)?\.?\s*(?:no\b\.?|#|number|num\b\.?)\s*[:#.\-]?\s*([A-Za-z0-9][A-Za-z0-9\-/]{3,})"
    ).unwrap();

    pub static ref BARE_ORDER_NO: Regex = Regex::new(
        r"(?i)\border\s*(?:no\b\.?|#|number|num\b\.?|nbr\b)\s*[:#.\-]?\s*([A-Za-z0-9][A-Za-z0-9\-/]{3,})"
    ).unwrap();

    // Table headers
    pub static ref QTY_HEADER: Regex = Regex::new(r"(?i)\b(?:qty|quantity|qnty)\b").unwrap();

    pub static ref UNIT_PRICE_HEADER: Regex = Regex::new(
        r"(?i)\b(?:unit\s*price|price\s*(?:/|per)\s*(?:ea|each|unit)|price\s+each|unit\s+cost)\b"
    ).unwrap();

    pub static ref EXTENDED_HEADER: Regex = Regex::new(
        r"(?i)\b(?:extended|ext\.?\s*(?:price|amount|amt)|amount|line\s+total|total)\b"
    ).unwrap();

    pub static ref COLUMN_WORD: Regex = Regex::new(
        r"(?i)\b(?:description|item|part|uom|unit|price|amount|date|ship|line|material|rev)\b"
    ).unwrap();

    pub static ref TABLE_END: Regex = Regex::new(
        r"(?i)^(?:sub\s*-?\s*total|total|grand\s+total|order\s+total|tax|freight|notes?|terms)\b"
    ).unwrap();

    // Leading line-index / part-number pair: "1 100234 ..."
    pub static ref INDEX_PART_PAIR: Regex = Regex::new(r"^(\d{1,3})\s+(\d{5,})\b").unwrap();

    // Commercial labels
    pub static ref UNIT_PRICE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:unit\s*price|price\s*(?:/|per)\s*(?:ea|each|unit)|price\s+each|unit\s+cost)\b"
    ).unwrap();

    pub static ref EXTENDED_PRICE_LABEL: Regex = Regex::new(
        r"(?i)\b(?:ext(?:ended|\.)?\s*(?:price|amount|amt)|line\s+total)\b"
    ).unwrap();

    pub static ref SUBTOTAL_LABEL: Regex = Regex::new(r"(?i)\bsub\s*-?\s*total\b").unwrap();

    pub static ref TAX_LABEL: Regex = Regex::new(r"(?i)\b(?:sales\s+)?tax\b").unwrap();

    pub static ref FREIGHT_COST_LABEL: Regex = Regex::new(
        r"(?i)\b(?:freight|shipping)(?:\s+(?:charges?|costs?|amount))?\b"
    ).unwrap();

    pub static ref ORDER_TOTAL_LABEL: Regex = Regex::new(
        r"(?i)\b(?:(?:order|grand|invoice)\s+total|total\s+(?:amount|due|order))\b"
    ).unwrap();

    pub static ref PAYMENT_TERMS: Regex = Regex::new(
        r"(?i)\b(?:payment\s+terms|terms\s+of\s+payment)\s*[:\-]?\s*([^\n]{2,60})"
    ).unwrap();

    pub static ref FREIGHT_TERMS: Regex = Regex::new(
        r"(?i)\b(?:freight|shipping)\s+terms\s*[:\-]?\s*([^\n]{2,60})|\b(F\.?O\.?B\.?\s+[A-Za-z][A-Za-z ]{2,30})"
    ).unwrap();

    pub static ref CURRENCY_CODE: Regex = Regex::new(r"\b(USD|CAD|EUR|GBP|MXN|AUD)\b").unwrap();

    pub static ref BACKORDER: Regex = Regex::new(r"(?i)\bback\s*-?\s*order(?:ed)?\b").unwrap();

    pub static ref NOTES_LABEL: Regex = Regex::new(
        r"(?i)^(?:notes?|remarks|comments)\s*[:\-]\s*(.{2,200})$"
    ).unwrap();

    // Description marker whose neighborhood is a last-resort quantity source
    pub static ref DOM_MARKER: Regex = Regex::new(r"\bDOM\b").unwrap();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_tables_are_priority_ordered() {
        assert!(DATE_LABELS.windows(2).all(|w| w[0].priority >= w[1].priority));
        assert!(QUANTITY_LABELS.windows(2).all(|w| w[0].priority >= w[1].priority));
    }

    #[test]
    fn test_number_token() {
        let found: Vec<&str> = NUMBER_TOKEN
            .find_iter("Qty 1,500.25 and 140 and 1.500")
            .map(|m| m.as_str())
            .collect();
        assert_eq!(found, vec!["1,500.25", "140", "1.500"]);
    }

    #[test]
    fn test_so_number_is_case_sensitive() {
        assert!(SO_NUMBER.is_match("SO# AB1234567"));
        assert!(!SO_NUMBER.is_match("so we shipped 1234 units"));
    }

    #[test]
    fn test_weight_unit_inch_needs_a_number() {
        assert!(WEIGHT_UNIT.is_match("Qty 36 @ 12 in"));
        assert!(WEIGHT_UNIT.is_match("cut to 48in lengths"));
        assert!(!WEIGHT_UNIT.is_match("Qty 40, ships in 2 weeks"));
    }

    #[test]
    fn test_date_token_forms() {
        assert!(DATE_TOKEN.is_match("2024-05-01"));
        assert!(DATE_TOKEN.is_match("3/15/25"));
        assert!(DATE_TOKEN.is_match("March 15, 2025"));
        assert!(DATE_TOKEN.is_match("Sept. 2 2025"));
    }
}
