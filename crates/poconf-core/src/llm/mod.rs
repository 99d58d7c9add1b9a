//! Completion-service fallback.
//!
//! The [`CompletionClient`] trait is the only boundary to the outside
//! world: production code uses [`OpenAiClient`], tests inject stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::LlmError;

mod adapter;
mod client;
mod prompt;
mod response;

pub use adapter::LlmFallback;
pub use client::OpenAiClient;
pub use prompt::{FIELD_KEYS, build_prompt};
pub use response::LlmFields;

/// A constrained two-part prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

/// Something that turns a prompt into one JSON object.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &Prompt) -> Result<serde_json::Value, LlmError>;
}
