//! Multi-step chat agent
//!
//! One step is one streamed model call plus the execution of the tools it
//! asked for. Tool results are fed back into the next step until the model
//! answers without tools or the step limit is reached.

use crate::llm::{
    FinishReason, GenerationSettings, LlmEventStream, LlmProvider, Message, StreamEvent,
    StreamingResponseBuilder, TokenUsage, ToolCall,
};
use crate::tools::ToolRegistry;
use anyhow::Result;
use futures::StreamExt;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::SYSTEM_PROMPT;

/// Default bound on model steps per request
pub const DEFAULT_MAX_STEPS: usize = 20;

/// Progress of a run, in the order it happened
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    StepStart,
    TextDelta(String),
    ReasoningDelta(String),
    /// The model started streaming a tool call
    ToolCallStart {
        id: String,
        name: String,
    },
    ToolCallDelta {
        id: String,
        delta: String,
    },
    /// Arguments are complete and the tool is about to run
    ToolInputAvailable {
        id: String,
        name: String,
        input: Value,
    },
    ToolOutput {
        id: String,
        output: Value,
    },
    ToolError {
        id: String,
        error: String,
    },
    StepFinish,
    Finish(FinishReason),
    /// The run stopped on an upstream failure
    Error(String),
}

/// Outcome of a run, for logging
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub steps: usize,
    pub tool_calls_made: usize,
    pub usage: TokenUsage,
    pub finish_reason: Option<FinishReason>,
}

/// Receiver hung up; nothing left to stream to
struct ClientGone;

/// Stateless agent shared by all requests
pub struct ChatAgent {
    llm: Arc<dyn LlmProvider>,
    tools: Arc<ToolRegistry>,
    settings: GenerationSettings,
    max_steps: usize,
}

impl ChatAgent {
    pub fn new(llm: Arc<dyn LlmProvider>, tools: Arc<ToolRegistry>) -> Self {
        Self {
            llm,
            tools,
            settings: GenerationSettings::default(),
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_settings(mut self, settings: GenerationSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    /// Start a run over `history`, opening the first model stream
    ///
    /// Failing to reach the model is reported here, before the caller commits
    /// to a streaming response.
    pub async fn begin(self: Arc<Self>, history: Vec<Message>) -> Result<AgentRun> {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(Message::system(SYSTEM_PROMPT));
        messages.extend(history);

        let first = self.open_step(&messages).await?;

        Ok(AgentRun {
            agent: self,
            messages,
            first: Some(first),
        })
    }

    async fn open_step(&self, messages: &[Message]) -> Result<LlmEventStream> {
        let tool_definitions = self.tools.definitions();
        self.llm
            .chat_stream(messages, Some(&tool_definitions), &self.settings)
            .await
    }
}

/// A run whose first step is already streaming
pub struct AgentRun {
    agent: Arc<ChatAgent>,
    messages: Vec<Message>,
    first: Option<LlmEventStream>,
}

impl AgentRun {
    /// Drive the run to completion, forwarding events to `tx`
    ///
    /// Stops early when the receiver is dropped.
    pub async fn drive(mut self, tx: mpsc::Sender<AgentEvent>) -> RunSummary {
        let mut summary = RunSummary::default();
        if self.run_steps(&tx, &mut summary).await.is_err() {
            tracing::debug!(steps = summary.steps, "Client disconnected, stopping run");
        }
        tracing::info!(
            steps = summary.steps,
            tool_calls = summary.tool_calls_made,
            total_tokens = summary.usage.total_tokens,
            finish = summary.finish_reason.map(|r| r.as_str()).unwrap_or("none"),
            "Chat run finished"
        );
        summary
    }

    async fn run_steps(
        &mut self,
        tx: &mpsc::Sender<AgentEvent>,
        summary: &mut RunSummary,
    ) -> Result<(), ClientGone> {
        let max_steps = self.agent.max_steps;

        for step in 1..=max_steps {
            let mut stream = match self.first.take() {
                Some(stream) => stream,
                None => match self.agent.open_step(&self.messages).await {
                    Ok(stream) => stream,
                    Err(e) => {
                        tracing::error!("Failed to open step {}: {:#}", step, e);
                        return emit(tx, AgentEvent::Error(e.to_string())).await;
                    }
                },
            };
            summary.steps = step;
            emit(tx, AgentEvent::StepStart).await?;

            let mut builder = StreamingResponseBuilder::new();
            while let Some(event) = stream.next().await {
                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::error!("Model stream failed in step {}: {:#}", step, e);
                        return emit(tx, AgentEvent::Error(e.to_string())).await;
                    }
                };
                builder.process(&event);

                let forwarded = match event {
                    StreamEvent::TextDelta(text) => Some(AgentEvent::TextDelta(text)),
                    StreamEvent::ReasoningDelta(text) => Some(AgentEvent::ReasoningDelta(text)),
                    StreamEvent::ToolCallStart { id, name } => {
                        tracing::debug!("Tool call starting: {}", name);
                        Some(AgentEvent::ToolCallStart { id, name })
                    }
                    StreamEvent::ToolCallDelta {
                        id,
                        arguments_delta,
                    } => Some(AgentEvent::ToolCallDelta {
                        id,
                        delta: arguments_delta,
                    }),
                    StreamEvent::ToolCallComplete { .. }
                    | StreamEvent::Usage(_)
                    | StreamEvent::Finish(_) => None,
                };
                if let Some(event) = forwarded {
                    emit(tx, event).await?;
                }
            }

            let finish_reason = builder.finish_reason;
            let text = builder.text.clone();
            let response = builder.build();
            if let Some(usage) = response.usage() {
                summary.usage.input_tokens += usage.input_tokens;
                summary.usage.output_tokens += usage.output_tokens;
                summary.usage.total_tokens += usage.total_tokens;
            }

            let calls = response.tool_calls().to_vec();
            if calls.is_empty() {
                emit(tx, AgentEvent::StepFinish).await?;
                let reason = finish_reason.unwrap_or(FinishReason::Stop);
                summary.finish_reason = Some(reason);
                return emit(tx, AgentEvent::Finish(reason)).await;
            }

            summary.tool_calls_made += calls.len();
            self.run_tools(tx, text, &calls).await?;
            emit(tx, AgentEvent::StepFinish).await?;
        }

        tracing::warn!("Reached the maximum of {} steps", max_steps);
        summary.finish_reason = Some(FinishReason::ToolCalls);
        emit(tx, AgentEvent::Finish(FinishReason::ToolCalls)).await
    }

    /// Execute the step's tool calls and record them in the history
    async fn run_tools(
        &mut self,
        tx: &mpsc::Sender<AgentEvent>,
        text: String,
        calls: &[ToolCall],
    ) -> Result<(), ClientGone> {
        for call in calls {
            emit(
                tx,
                AgentEvent::ToolInputAvailable {
                    id: call.id.clone(),
                    name: call.name.clone(),
                    input: call.arguments.clone(),
                },
            )
            .await?;
        }

        let tools = &self.agent.tools;
        let results = futures::future::join_all(calls.iter().map(|call| {
            tracing::info!("Executing tool: {} with args: {}", call.name, call.arguments);
            tools.execute(&call.name, call.arguments.clone())
        }))
        .await;

        self.messages
            .push(Message::assistant_tool_calls(Some(text), calls));

        for (call, result) in calls.iter().zip(results) {
            let event = if result.success {
                AgentEvent::ToolOutput {
                    id: call.id.clone(),
                    output: Value::String(result.output.clone()),
                }
            } else {
                AgentEvent::ToolError {
                    id: call.id.clone(),
                    error: result.output.clone(),
                }
            };
            self.messages
                .push(Message::tool_result(&call.id, result.output));
            emit(tx, event).await?;
        }

        Ok(())
    }
}

async fn emit(tx: &mpsc::Sender<AgentEvent>, event: AgentEvent) -> Result<(), ClientGone> {
    tx.send(event).await.map_err(|_| ClientGone)
}
