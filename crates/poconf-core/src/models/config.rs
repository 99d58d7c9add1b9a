//! Configuration structures for the confirmation parser.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{ConfigError, Result};

/// Main configuration for the poconf pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoconfConfig {
    /// Deterministic extraction and merge thresholds.
    pub extraction: ExtractionConfig,

    /// Completion-service fallback.
    pub llm: LlmConfig,
}

/// Thresholds used by ranking, merging and the hybrid policy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Minimum confidence for `supplier_confirmed_quantity` and for a
    /// required field to count as present.
    pub min_field_confidence: f32,

    /// Top-two quantity confidences closer than this are ambiguous.
    pub ambiguity_spread: f32,

    /// Confidence assigned to every LLM-sourced field.
    pub llm_confidence: f32,

    /// Unit-price deltas above this amount count as a price change.
    pub price_change_tolerance: Decimal,

    /// Maximum characters kept in an evidence snippet.
    pub snippet_max_chars: usize,

    /// Maximum characters kept in `raw_excerpt`.
    pub excerpt_max_chars: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            min_field_confidence: 0.6,
            ambiguity_spread: 0.15,
            llm_confidence: 0.85,
            price_change_tolerance: Decimal::new(1, 2),
            snippet_max_chars: 160,
            excerpt_max_chars: 1000,
        }
    }
}

/// Completion-service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// Allow the hybrid orchestrator to call the completion service.
    pub enabled: bool,

    /// OpenAI-compatible chat completions endpoint.
    pub endpoint: String,

    /// Model identifier.
    pub model: String,

    /// Environment variable holding the API key.
    pub api_key_env: String,

    /// Completion token limit.
    pub max_tokens: u32,

    /// Sampling temperature.
    pub temperature: f32,

    /// Characters of each evidence text included in the prompt.
    pub max_source_chars: usize,

    /// Request timeout in seconds; the HTTP client default applies when unset.
    pub timeout_secs: Option<u64>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key_env: "OPENAI_API_KEY".to_string(),
            max_tokens: 1024,
            temperature: 0.0,
            max_source_chars: 12000,
            timeout_secs: None,
        }
    }
}

impl PoconfConfig {
    /// Load configuration from a JSON file.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Reject values no pipeline run can work with.
    pub fn validate(&self) -> std::result::Result<(), ConfigError> {
        let e = &self.extraction;
        for (name, value) in [
            ("extraction.min_field_confidence", e.min_field_confidence),
            ("extraction.ambiguity_spread", e.ambiguity_spread),
            ("extraction.llm_confidence", e.llm_confidence),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::Invalid(format!("{name} must be within 0..=1, got {value}")));
            }
        }
        if e.price_change_tolerance.is_sign_negative() {
            return Err(ConfigError::Invalid(
                "extraction.price_change_tolerance must not be negative".to_string(),
            ));
        }
        if self.llm.enabled && self.llm.endpoint.trim().is_empty() {
            return Err(ConfigError::Invalid("llm.endpoint is empty".to_string()));
        }
        Ok(())
    }

    /// Save configuration to a JSON file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: PoconfConfig =
            serde_json::from_str(r#"{"llm": {"model": "gpt-4.1-mini", "enabled": false}}"#).unwrap();
        assert_eq!(config.llm.model, "gpt-4.1-mini");
        assert!(!config.llm.enabled);
        assert_eq!(config.llm.api_key_env, "OPENAI_API_KEY");
        assert_eq!(config.extraction, ExtractionConfig::default());
    }

    #[test]
    fn test_validate() {
        assert_eq!(PoconfConfig::default().validate(), Ok(()));

        let mut config = PoconfConfig::default();
        config.extraction.min_field_confidence = 1.5;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = PoconfConfig::default();
        config.llm.endpoint = " ".to_string();
        assert!(config.validate().is_err());
        config.llm.enabled = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = PoconfConfig::default();
        config.extraction.min_field_confidence = 0.7;
        config.llm.timeout_secs = Some(30);
        config.save(&path).unwrap();

        let loaded = PoconfConfig::from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }
}
