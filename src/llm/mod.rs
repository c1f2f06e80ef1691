//! LLM provider layer
//!
//! The relay only needs one upstream (Groq), reached through the generic
//! OpenAI-compatible provider. The trait stays so the agent loop can be driven
//! by a scripted provider in tests.

use std::pin::Pin;
use std::sync::Arc;

use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::{Stream, StreamExt};

use crate::config::LlmConfig;

mod error;
mod openai_compat;
pub mod streaming;
mod types;

pub use error::LlmError;
pub use openai_compat::{create_groq, OpenAiCompatConfig, OpenAiCompatProvider};
pub use types::*;

/// Environment variable holding the upstream credential
pub const API_KEY_ENV: &str = "GROQ_API_KEY";

/// Events of one streamed model invocation
pub type LlmEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Trait for LLM providers
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Model identifier sent upstream
    fn model(&self) -> &str;

    /// Open a streaming chat completion
    ///
    /// Errors returned here happen before any event was produced (bad key,
    /// unreachable upstream, HTTP rejection). Errors after that arrive as
    /// `Err` items on the stream.
    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        settings: &GenerationSettings,
    ) -> Result<LlmEventStream>;

    /// Send a chat completion request and wait for the whole response
    async fn chat(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        settings: &GenerationSettings,
    ) -> Result<LlmResponse> {
        let mut stream = self.chat_stream(messages, tools, settings).await?;
        let mut builder = StreamingResponseBuilder::new();
        while let Some(event) = stream.next().await {
            builder.process(&event?);
        }
        Ok(builder.build())
    }
}

/// Read the upstream API key; an empty value counts as missing
pub fn api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV)
        .ok()
        .map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty())
}

/// Create the configured LLM provider
pub fn create_provider(config: &LlmConfig) -> Result<Arc<dyn LlmProvider>> {
    match config.provider.to_lowercase().as_str() {
        "groq" => {
            let api_key = api_key_from_env()
                .with_context(|| format!("{} environment variable is required", API_KEY_ENV))?;
            tracing::info!("Using groq provider with model {}", config.model);
            Ok(Arc::new(create_groq(api_key, config)))
        }
        other => anyhow::bail!("Unknown provider: {}. Available: groq", other),
    }
}
