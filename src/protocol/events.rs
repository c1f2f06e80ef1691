//! UI message stream chunks
//!
//! Each chunk travels as one SSE `data:` line. Text, reasoning and tool input
//! follow a start/delta/end pattern keyed by an id.
//!
//! ```text
//! start { messageId }
//! start-step
//! text-start { id: "txt_0" }
//! text-delta { id: "txt_0", delta: "Halo" }
//! text-end { id: "txt_0" }
//! finish-step
//! finish { finishReason: "stop" }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UIStreamEvent {
    #[serde(rename = "start")]
    MessageStart {
        #[serde(rename = "messageId", skip_serializing_if = "Option::is_none")]
        message_id: Option<String>,
    },

    TextStart {
        id: String,
    },
    TextDelta {
        id: String,
        delta: String,
    },
    TextEnd {
        id: String,
    },

    // gpt-oss streams its reasoning separately from the answer
    ReasoningStart {
        id: String,
    },
    ReasoningDelta {
        id: String,
        delta: String,
    },
    ReasoningEnd {
        id: String,
    },

    ToolInputStart {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
    },
    ToolInputDelta {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "inputTextDelta")]
        input_text_delta: String,
    },
    ToolInputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "toolName")]
        tool_name: String,
        input: Value,
    },
    ToolOutputAvailable {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        output: Value,
    },
    ToolOutputError {
        #[serde(rename = "toolCallId")]
        tool_call_id: String,
        #[serde(rename = "errorText")]
        error_text: String,
    },

    StartStep,
    FinishStep,

    Finish {
        #[serde(rename = "finishReason", skip_serializing_if = "Option::is_none")]
        finish_reason: Option<String>,
    },
    Error {
        #[serde(rename = "errorText")]
        error_text: String,
    },

    /// Chunk types this crate does not act on (sources, files, data parts)
    #[serde(other)]
    Unknown,
}

impl UIStreamEvent {
    pub fn message_start(message_id: impl Into<String>) -> Self {
        Self::MessageStart {
            message_id: Some(message_id.into()),
        }
    }

    pub fn text_start(id: impl Into<String>) -> Self {
        Self::TextStart { id: id.into() }
    }

    pub fn text_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::TextDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn text_end(id: impl Into<String>) -> Self {
        Self::TextEnd { id: id.into() }
    }

    pub fn reasoning_start(id: impl Into<String>) -> Self {
        Self::ReasoningStart { id: id.into() }
    }

    pub fn reasoning_delta(id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ReasoningDelta {
            id: id.into(),
            delta: delta.into(),
        }
    }

    pub fn reasoning_end(id: impl Into<String>) -> Self {
        Self::ReasoningEnd { id: id.into() }
    }

    pub fn tool_input_start(tool_call_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self::ToolInputStart {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
        }
    }

    pub fn tool_input_delta(tool_call_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::ToolInputDelta {
            tool_call_id: tool_call_id.into(),
            input_text_delta: delta.into(),
        }
    }

    pub fn tool_input_available(
        tool_call_id: impl Into<String>,
        tool_name: impl Into<String>,
        input: Value,
    ) -> Self {
        Self::ToolInputAvailable {
            tool_call_id: tool_call_id.into(),
            tool_name: tool_name.into(),
            input,
        }
    }

    pub fn tool_output_available(tool_call_id: impl Into<String>, output: Value) -> Self {
        Self::ToolOutputAvailable {
            tool_call_id: tool_call_id.into(),
            output,
        }
    }

    pub fn tool_output_error(
        tool_call_id: impl Into<String>,
        error_text: impl Into<String>,
    ) -> Self {
        Self::ToolOutputError {
            tool_call_id: tool_call_id.into(),
            error_text: error_text.into(),
        }
    }

    pub fn start_step() -> Self {
        Self::StartStep
    }

    pub fn finish_step() -> Self {
        Self::FinishStep
    }

    pub fn finish_with_reason(reason: impl Into<String>) -> Self {
        Self::Finish {
            finish_reason: Some(reason.into()),
        }
    }

    pub fn error(error_text: impl Into<String>) -> Self {
        Self::Error {
            error_text: error_text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_wire_names() {
        let cases = [
            (
                UIStreamEvent::message_start("msg_1"),
                json!({"type": "start", "messageId": "msg_1"}),
            ),
            (
                UIStreamEvent::text_delta("txt_0", "Halo"),
                json!({"type": "text-delta", "id": "txt_0", "delta": "Halo"}),
            ),
            (
                UIStreamEvent::tool_input_delta("call_1", "{}"),
                json!({"type": "tool-input-delta", "toolCallId": "call_1", "inputTextDelta": "{}"}),
            ),
            (
                UIStreamEvent::tool_output_error("call_1", "boom"),
                json!({"type": "tool-output-error", "toolCallId": "call_1", "errorText": "boom"}),
            ),
            (UIStreamEvent::start_step(), json!({"type": "start-step"})),
            (
                UIStreamEvent::finish_with_reason("stop"),
                json!({"type": "finish", "finishReason": "stop"}),
            ),
            (
                UIStreamEvent::error("upstream down"),
                json!({"type": "error", "errorText": "upstream down"}),
            ),
        ];
        for (event, expected) in cases {
            assert_eq!(serde_json::to_value(&event).unwrap(), expected);
        }
    }

    #[test]
    fn test_unknown_chunk_type_is_tolerated() {
        let event: UIStreamEvent =
            serde_json::from_value(json!({"type": "source-url", "sourceId": "s", "url": "u"}))
                .unwrap();
        assert_eq!(event, UIStreamEvent::Unknown);

        let event: UIStreamEvent = serde_json::from_value(json!({"type": "finish"})).unwrap();
        assert_eq!(event, UIStreamEvent::Finish { finish_reason: None });
    }
}
