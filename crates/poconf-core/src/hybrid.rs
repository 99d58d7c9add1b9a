//! Hybrid orchestration: deterministic rules plus completion fallback.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::confirmation::ranking::confidence_spread;
use crate::confirmation::{Analysis, ConfirmationParser};
use crate::error::{ConfigError, LlmError};
use crate::llm::{LlmFallback, OpenAiClient};
use crate::models::config::{ExtractionConfig, PoconfConfig};
use crate::models::confirmation::ParsedConfirmationFieldsV1;
use crate::models::input::ParseInput;

/// Chooses between the rule-based parser and the completion fallback.
///
/// PDF evidence always goes to the completion service first. Email-only
/// evidence goes there only when a required field is weak or the quantity
/// candidates are too close to call.
pub struct HybridParser {
    deterministic: ConfirmationParser,
    llm: Option<LlmFallback>,
    config: ExtractionConfig,
}

impl HybridParser {
    /// Rules only.
    pub fn new(config: ExtractionConfig) -> Self {
        Self {
            deterministic: ConfirmationParser::new(config.clone()),
            llm: None,
            config,
        }
    }

    pub fn with_llm(mut self, llm: LlmFallback) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Build from configuration, wiring the HTTP client when enabled.
    pub fn from_config(config: &PoconfConfig) -> Result<Self, LlmError> {
        config.validate()?;
        let parser = Self::new(config.extraction.clone());
        if !config.llm.enabled {
            return Ok(parser);
        }
        let client = OpenAiClient::from_config(&config.llm)?;
        Ok(parser.with_llm(LlmFallback::new(
            Arc::new(client),
            &config.llm,
            config.extraction.clone(),
        )))
    }

    pub fn has_llm(&self) -> bool {
        self.llm.is_some()
    }

    /// Parse one confirmation.
    ///
    /// Only configuration defects are errors; every other completion failure
    /// falls back to the deterministic result.
    pub async fn parse(&self, input: &ParseInput) -> Result<ParsedConfirmationFieldsV1, ConfigError> {
        let Some(llm) = &self.llm else {
            return Ok(self.deterministic.analyze(input).result);
        };

        if input.has_pdf_text() {
            debug!("PDF text present, asking the completion service first");
            let analysis = self.deterministic.analyze(input);
            return self.try_llm(llm, input, analysis).await;
        }

        if input.usable_email_text().is_none() {
            return Ok(self.deterministic.analyze(input).result);
        }

        let analysis = self.deterministic.analyze(input);
        let weak = analysis.result.weak_required_fields(self.config.min_field_confidence);
        let spread = confidence_spread(&analysis.ranked_quantities);
        let ambiguous = spread.is_some_and(|s| s < self.config.ambiguity_spread);

        if weak.is_empty() && !ambiguous {
            debug!("Deterministic result is confident, skipping completion");
            return Ok(analysis.result);
        }

        info!(
            "Email-only confirmation needs completion: weak={:?}, quantity spread={:?}",
            weak, spread
        );
        self.try_llm(llm, input, analysis).await
    }

    async fn try_llm(
        &self,
        llm: &LlmFallback,
        input: &ParseInput,
        analysis: Analysis,
    ) -> Result<ParsedConfirmationFieldsV1, ConfigError> {
        match llm.extract(input).await {
            Ok(mut result) => {
                if input.debug {
                    result.debug_candidates = analysis.result.debug_candidates;
                }
                Ok(result)
            }
            Err(LlmError::Configuration(e)) => Err(e),
            Err(e) => {
                warn!("Completion fallback failed, using deterministic result: {}", e);
                Ok(analysis.result)
            }
        }
    }
}
