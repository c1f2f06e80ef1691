//! Generic OpenAI-compatible LLM provider
//!
//! Groq serves an OpenAI-compatible chat completions endpoint, so the relay
//! talks to it through this provider. Only the streaming path is implemented
//! natively; non-streaming calls collect the stream.
//!
//! SECURITY: Credentials are only sent to the configured endpoint.

use super::{
    streaming::{is_done, SseDecoder, ToolCallTracker},
    ContentPart, FinishReason, GenerationSettings, LlmError, LlmEventStream, LlmProvider,
    Message, MessageContent, Role, StreamEvent, TokenUsage, ToolDefinition,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upstream stream is considered stalled after this long without a chunk
const STREAM_CHUNK_TIMEOUT: Duration = Duration::from_secs(60);

// ============================================================================
// Configuration Types
// ============================================================================

/// Configuration for an OpenAI-compatible provider
#[derive(Clone)]
pub struct OpenAiCompatConfig {
    /// Provider name (e.g., "groq")
    pub name: String,
    /// Full URL of the chat completions endpoint
    pub base_url: String,
    /// Sent as a bearer token
    pub api_key: String,
    pub default_model: String,
}

// Keys never reach logs
impl std::fmt::Debug for OpenAiCompatConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiCompatConfig")
            .field("name", &self.name)
            .field("base_url", &self.base_url)
            .field("api_key", &"***")
            .field("default_model", &self.default_model)
            .finish()
    }
}

impl OpenAiCompatConfig {
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            base_url: base_url.into(),
            api_key: api_key.into(),
            default_model: String::new(),
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }
}

// ============================================================================
// Provider Implementation
// ============================================================================

/// Generic OpenAI-compatible provider
///
/// Holds no per-request state; one instance serves every request concurrently.
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiCompatConfig,
    model: String,
}

impl OpenAiCompatProvider {
    pub fn new(config: OpenAiCompatConfig) -> Self {
        let model = config.default_model.clone();
        Self {
            client: reqwest::Client::new(),
            config,
            model,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    // ========================================================================
    // Message Conversion
    // ========================================================================

    /// Convert internal messages to OpenAI format
    fn convert_messages(&self, messages: &[Message]) -> Vec<OpenAiMessage> {
        messages
            .iter()
            .map(|msg| {
                let role = match msg.role {
                    Role::System => "system",
                    Role::User => "user",
                    Role::Assistant => "assistant",
                    Role::Tool => "tool",
                };

                match &msg.content {
                    MessageContent::Text(text) => OpenAiMessage {
                        role: role.to_string(),
                        content: Some(text.clone()),
                        tool_calls: None,
                        tool_call_id: msg.tool_call_id.clone(),
                    },
                    MessageContent::Parts(parts) => {
                        let tool_calls: Vec<OpenAiToolCall> = parts
                            .iter()
                            .filter_map(|p| match p {
                                ContentPart::ToolUse { id, name, input } => Some(OpenAiToolCall {
                                    id: id.clone(),
                                    call_type: "function".to_string(),
                                    function: OpenAiFunctionCall {
                                        name: name.clone(),
                                        arguments: serde_json::to_string(input)
                                            .unwrap_or_else(|_| "{}".to_string()),
                                    },
                                }),
                                ContentPart::Text { .. } => None,
                            })
                            .collect();

                        let text: String = parts
                            .iter()
                            .filter_map(|p| match p {
                                ContentPart::Text { text } => Some(text.as_str()),
                                ContentPart::ToolUse { .. } => None,
                            })
                            .collect();
                        let content = if text.is_empty() { None } else { Some(text) };

                        OpenAiMessage {
                            role: role.to_string(),
                            content,
                            tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                            tool_call_id: msg.tool_call_id.clone(),
                        }
                    }
                }
            })
            .collect()
    }

    /// Convert internal tool definitions to OpenAI format
    fn convert_tools(&self, tools: &[ToolDefinition]) -> Vec<OpenAiTool> {
        tools
            .iter()
            .map(|t| OpenAiTool {
                tool_type: "function".to_string(),
                function: OpenAiFunction {
                    name: t.name.clone(),
                    description: t.description.clone(),
                    parameters: t.parameters.clone(),
                },
            })
            .collect()
    }

    // ========================================================================
    // Request Building
    // ========================================================================

    fn build_request(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        settings: &GenerationSettings,
    ) -> OpenAiRequest {
        let mut request = OpenAiRequest {
            model: self.model.clone(),
            messages: self.convert_messages(messages),
            max_tokens: Some(settings.max_output_tokens),
            temperature: Some(settings.temperature),
            tools: None,
            tool_choice: None,
            stream: true,
        };

        if let Some(tools) = tools {
            if !tools.is_empty() {
                request.tools = Some(self.convert_tools(tools));
                request.tool_choice = Some("auto".to_string());
            }
        }

        request
    }

    /// Build request with authorization headers
    fn build_http_request(&self, body: &OpenAiRequest) -> reqwest::RequestBuilder {
        self.client
            .post(&self.config.base_url)
            .header("Content-Type", "application/json")
            .bearer_auth(&self.config.api_key)
            .json(body)
    }
}

// ============================================================================
// LlmProvider Implementation
// ============================================================================

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.config.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn chat_stream(
        &self,
        messages: &[Message],
        tools: Option<&[ToolDefinition]>,
        settings: &GenerationSettings,
    ) -> Result<LlmEventStream> {
        use futures::StreamExt;

        tracing::debug!(
            target: "llm",
            provider = self.config.name,
            model = self.model,
            messages = messages.len(),
            "Sending streaming request"
        );

        let request = self.build_request(messages, tools, settings);
        let response = self
            .build_http_request(&request)
            .send()
            .await
            .map_err(LlmError::from_network_error)
            .with_context(|| format!("Failed to send request to {} API", self.config.name))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LlmError::from_http_status(status, error_text).into());
        }

        let provider = self.config.name.clone();
        let mut bytes = response.bytes_stream();

        let stream = async_stream::stream! {
            let mut decoder = SseDecoder::new();
            let mut parser = ChunkParser::default();

            loop {
                let chunk = match tokio::time::timeout(STREAM_CHUNK_TIMEOUT, bytes.next()).await {
                    Ok(Some(Ok(chunk))) => chunk,
                    Ok(Some(Err(e))) => {
                        yield Err(anyhow::Error::from(LlmError::from_network_error(e))
                            .context("Error reading stream chunk"));
                        return;
                    }
                    Ok(None) => break,
                    Err(_) => {
                        yield Err(LlmError::Network(format!(
                            "Stream timeout - no response from {} for {} seconds",
                            provider,
                            STREAM_CHUNK_TIMEOUT.as_secs()
                        ))
                        .into());
                        return;
                    }
                };

                for payload in decoder.push(&chunk) {
                    match parser.on_payload(&payload) {
                        Ok(events) => {
                            for event in events {
                                yield Ok(event);
                            }
                        }
                        Err(e) => {
                            yield Err(e);
                            return;
                        }
                    }
                }
            }

            for payload in decoder.finish() {
                match parser.on_payload(&payload) {
                    Ok(events) => {
                        for event in events {
                            yield Ok(event);
                        }
                    }
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }

            for event in parser.finish() {
                yield Ok(event);
            }
        };

        Ok(Box::pin(stream))
    }
}

// ============================================================================
// Stream Parsing
// ============================================================================

/// Turns chat completion chunks into [`StreamEvent`]s
#[derive(Debug, Default)]
struct ChunkParser {
    tracker: ToolCallTracker,
    saw_tool_calls: bool,
    finished: bool,
}

impl ChunkParser {
    fn on_payload(&mut self, payload: &str) -> Result<Vec<StreamEvent>> {
        if is_done(payload) {
            return Ok(Vec::new());
        }

        tracing::trace!(target: "llm", payload, "stream chunk");

        let chunk: OpenAiStreamChunk = match serde_json::from_str(payload) {
            Ok(chunk) => chunk,
            Err(e) => {
                tracing::debug!("Skipping unparsable stream payload: {}", e);
                return Ok(Vec::new());
            }
        };

        if let Some(error) = chunk.error {
            return Err(LlmError::ServiceError(error.message).into());
        }

        let mut events = Vec::new();

        if let Some(choice) = chunk.choices.first() {
            if let Some(reasoning) = choice.delta.reasoning.as_ref().filter(|r| !r.is_empty()) {
                events.push(StreamEvent::ReasoningDelta(reasoning.clone()));
            }

            if let Some(content) = choice.delta.content.as_ref().filter(|c| !c.is_empty()) {
                events.push(StreamEvent::TextDelta(content.clone()));
            }

            for tc in choice.delta.tool_calls.iter().flatten() {
                if let Some(id) = &tc.id {
                    let name = tc
                        .function
                        .as_ref()
                        .and_then(|f| f.name.clone())
                        .unwrap_or_default();
                    self.saw_tool_calls = true;
                    events.extend(self.tracker.start_call(tc.index, id, &name));
                }

                let args = tc.function.as_ref().and_then(|f| f.arguments.as_deref());
                if let Some(args) = args.filter(|a| !a.is_empty()) {
                    events.extend(self.tracker.append_args(tc.index, args));
                }
            }

            if let Some(reason) = &choice.finish_reason {
                events.extend(self.tracker.complete_all());
                events.push(StreamEvent::Finish(FinishReason::from_openai(reason)));
                self.finished = true;
            }
        }

        // Groq reports usage under `x_groq`, OpenAI under `usage`
        let usage = chunk.usage.or(chunk.x_groq.and_then(|x| x.usage));
        if let Some(usage) = usage {
            events.push(StreamEvent::Usage(TokenUsage {
                input_tokens: usage.prompt_tokens,
                output_tokens: usage.completion_tokens,
                total_tokens: usage.total_tokens,
            }));
        }

        Ok(events)
    }

    /// Close out a stream that ended without a finish reason
    fn finish(&mut self) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }
        self.finished = true;
        let mut events = self.tracker.complete_all();
        let reason = if self.saw_tool_calls {
            FinishReason::ToolCalls
        } else {
            FinishReason::Stop
        };
        events.push(StreamEvent::Finish(reason));
        events
    }
}

// ============================================================================
// API Types (OpenAI Format)
// ============================================================================

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<String>,
    stream: bool,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiMessage {
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<OpenAiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    call_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, Deserialize)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String,
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    usage: Option<OpenAiUsage>,
    x_groq: Option<GroqExtension>,
    error: Option<OpenAiStreamError>,
}

#[derive(Debug, Deserialize)]
struct GroqExtension {
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiDelta {
    content: Option<String>,
    reasoning: Option<String>,
    tool_calls: Option<Vec<OpenAiToolCallDelta>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiToolCallDelta {
    index: usize,
    id: Option<String>,
    function: Option<OpenAiFunctionDelta>,
}

#[derive(Debug, Deserialize)]
struct OpenAiFunctionDelta {
    name: Option<String>,
    arguments: Option<String>,
}

// ============================================================================
// Factory Functions
// ============================================================================

/// Create a Groq provider from the relay's LLM configuration
pub fn create_groq(api_key: String, config: &crate::config::LlmConfig) -> OpenAiCompatProvider {
    OpenAiCompatProvider::new(
        OpenAiCompatConfig::new(
            "groq",
            config.base_url.clone(),
            api_key,
        )
        .with_model(config.model.clone()),
    )
}

// ============================================================================
// Tests
// ============================================================================
