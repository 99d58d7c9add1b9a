//! Core library for purchase-order confirmation parsing.
//!
//! This crate provides:
//! - Label-aware candidate extraction for dates, quantities and supplier order numbers
//! - Numeric exclusion heuristics for dimension and spec strings
//! - Confidence ranking, PDF vs email merge and quantity reconciliation
//! - A hybrid orchestrator with an OpenAI-compatible completion fallback

pub mod confirmation;
pub mod error;
pub mod hybrid;
pub mod llm;
pub mod models;

pub use confirmation::{ConfirmationExtractor, ConfirmationParser};
pub use error::{ConfigError, LlmError, PoconfError, Result};
pub use hybrid::HybridParser;
pub use llm::{CompletionClient, LlmFallback, OpenAiClient, Prompt};
pub use models::config::{ExtractionConfig, LlmConfig, PoconfConfig};
pub use models::confirmation::{ExtractionMethod, ParsedConfirmationFieldsV1};
pub use models::field::{ParsedField, Source};
pub use models::input::{ParseInput, PdfText};
