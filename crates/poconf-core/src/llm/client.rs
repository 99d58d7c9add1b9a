//! OpenAI-compatible chat-completions client.

use std::env;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{ConfigError, LlmError};
use crate::models::config::LlmConfig;

use super::{CompletionClient, Prompt};

/// Chat-completions client returning one JSON object per call.
#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key_env: String,
    api_key: Option<String>,
    max_tokens: u32,
    temperature: f32,
}

impl OpenAiClient {
    /// Build a client from configuration.
    ///
    /// A missing API key is not an error here; every call then fails with
    /// [`ConfigError::MissingCredential`].
    pub fn from_config(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }

        Ok(Self {
            client: builder.build()?,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key_env: config.api_key_env.clone(),
            api_key: env::var(&config.api_key_env).ok().filter(|k| !k.trim().is_empty()),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }

    /// Build a client, failing immediately when the API key is not set.
    pub fn from_env(config: &LlmConfig) -> Result<Self, LlmError> {
        let client = Self::from_config(config)?;
        if client.api_key.is_none() {
            return Err(client.missing_credential());
        }
        Ok(client)
    }

    pub fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    fn missing_credential(&self) -> LlmError {
        ConfigError::MissingCredential {
            var: self.api_key_env.clone(),
        }
        .into()
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &Prompt) -> Result<serde_json::Value, LlmError> {
        let Some(api_key) = &self.api_key else {
            return Err(self.missing_credential());
        };

        let request = ChatCompletionRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: prompt.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: prompt.user.clone(),
                },
            ],
            max_tokens: Some(self.max_tokens),
            temperature: Some(self.temperature),
            response_format: Some(ResponseFormat::JsonObject),
        };

        debug!("Sending completion request: model={}", request.model);

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let response: ChatCompletionResponse = response.json().await?;
        if let Some(usage) = &response.usage {
            info!(
                "Completion response: {} tokens (prompt: {}, completion: {})",
                usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
            );
        }

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(LlmError::EmptyResponse)?;

        parse_json_object(&content)
    }
}

/// Parse completion content into a JSON object, tolerating code fences.
pub(crate) fn parse_json_object(content: &str) -> Result<serde_json::Value, LlmError> {
    let value: serde_json::Value = serde_json::from_str(strip_code_fences(content))
        .map_err(|e| LlmError::InvalidJson(e.to_string()))?;
    if !value.is_object() {
        return Err(LlmError::InvalidJson("expected a JSON object".to_string()));
    }
    Ok(value)
}

fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop an optional language tag on the opening fence
    let rest = rest.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseFormat {
    JsonObject,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unset_config() -> LlmConfig {
        LlmConfig {
            api_key_env: "POCONF_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        }
    }

    #[test]
    fn test_strip_code_fences() {
        assert_eq!(strip_code_fences("```json\n{\"a\": 1}\n```"), "{\"a\": 1}");
        assert_eq!(strip_code_fences("```\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn test_parse_json_object() {
        assert!(parse_json_object("```json\n{\"quantity\": 5}\n```").is_ok());
        assert!(matches!(parse_json_object("[1, 2]"), Err(LlmError::InvalidJson(_))));
        assert!(matches!(parse_json_object("not json"), Err(LlmError::InvalidJson(_))));
    }

    #[test]
    fn test_from_env_fails_fast_without_key() {
        let err = OpenAiClient::from_env(&unset_config()).err().unwrap();
        assert!(err.is_configuration());
    }

    #[tokio::test]
    async fn test_missing_credential_is_configuration_error() {
        let client = OpenAiClient::from_config(&unset_config()).unwrap();
        assert!(!client.has_credential());

        let prompt = Prompt {
            system: "s".to_string(),
            user: "u".to_string(),
        };
        match client.complete(&prompt).await {
            Err(LlmError::Configuration(ConfigError::MissingCredential { var })) => {
                assert_eq!(var, "POCONF_TEST_KEY_THAT_IS_NEVER_SET");
            }
            other => panic!("expected configuration error, got {other:?}"),
        }
    }
}
