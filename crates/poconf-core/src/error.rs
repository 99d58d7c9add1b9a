//! Error types for the poconf-core library.

use thiserror::Error;

/// Main error type for the poconf library.
#[derive(Error, Debug)]
pub enum PoconfError {
    /// Deployment/configuration defect.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Completion service error.
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON (configuration or input files).
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration problems. These indicate a deployment defect rather than
/// a data problem and are never swallowed by the orchestrator.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// The completion-service API key is not configured.
    #[error("missing completion-service credential (set {var})")]
    MissingCredential { var: String },

    /// A configuration value is unusable.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Errors raised by the LLM fallback path.
#[derive(Error, Debug)]
pub enum LlmError {
    /// The client is not usable because of a configuration defect.
    #[error(transparent)]
    Configuration(#[from] ConfigError),

    /// Network/transport failure talking to the completion service.
    #[error("transport failure: {0}")]
    Transport(#[from] reqwest::Error),

    /// Non-success HTTP status from the completion service.
    #[error("completion service returned {status}: {body}")]
    Status { status: u16, body: String },

    /// The completion came back without any content.
    #[error("completion service returned an empty response")]
    EmptyResponse,

    /// The completion content was not a JSON object.
    #[error("completion is not valid JSON: {0}")]
    InvalidJson(String),

    /// The model answered, but no field survived validation.
    #[error("language model returned no usable fields")]
    ExtractionUncertain,
}

impl LlmError {
    /// Whether this error must be propagated instead of falling back.
    pub fn is_configuration(&self) -> bool {
        matches!(self, LlmError::Configuration(_))
    }
}

/// Result type for the poconf library.
pub type Result<T> = std::result::Result<T, PoconfError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_configuration_error_is_distinct_from_uncertainty() {
        let config = LlmError::from(ConfigError::MissingCredential {
            var: "OPENAI_API_KEY".to_string(),
        });
        assert!(config.is_configuration());
        assert!(!LlmError::ExtractionUncertain.is_configuration());
        assert!(config.to_string().contains("OPENAI_API_KEY"));
    }
}
