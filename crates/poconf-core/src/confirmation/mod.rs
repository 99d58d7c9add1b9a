//! Order-confirmation field extraction.

pub mod merge;
mod parser;
pub mod ranking;
pub mod reconcile;
pub mod rules;

pub(crate) use parser::raw_excerpt;
pub use parser::{Analysis, ConfirmationExtractor, ConfirmationParser, SourceExtraction};
pub use rules::{Candidate, FieldExtractor};
