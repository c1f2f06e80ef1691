//! UI messages exchanged between the widget and the relay

use serde::{de::Error as _, Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Streaming state for text and reasoning parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamState {
    Streaming,
    Done,
}

/// Tool execution state of a tool part
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolState {
    InputStreaming,
    InputAvailable,
    OutputAvailable,
    OutputError,
}

/// A tool invocation carried as a `tool-<name>` part
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolPart {
    #[serde(rename = "type", deserialize_with = "tool_part_type")]
    pub part_type: String,
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    pub state: ToolState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<Value>,
    #[serde(rename = "errorText", default, skip_serializing_if = "Option::is_none")]
    pub error_text: Option<String>,
}

const TOOL_PART_PREFIX: &str = "tool-";

fn tool_part_type<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let part_type = String::deserialize(deserializer)?;
    if part_type.starts_with(TOOL_PART_PREFIX) {
        Ok(part_type)
    } else {
        Err(D::Error::custom(format!("not a tool part: {}", part_type)))
    }
}

impl ToolPart {
    pub fn new(tool_name: &str, tool_call_id: impl Into<String>, state: ToolState) -> Self {
        Self {
            part_type: format!("{}{}", TOOL_PART_PREFIX, tool_name),
            tool_call_id: tool_call_id.into(),
            state,
            input: None,
            output: None,
            error_text: None,
        }
    }

    pub fn tool_name(&self) -> &str {
        self.part_type
            .strip_prefix(TOOL_PART_PREFIX)
            .unwrap_or(&self.part_type)
    }
}

/// A part of a UI message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiMessagePart {
    Text {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<StreamState>,
    },
    Reasoning {
        text: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<StreamState>,
    },
    /// Boundary between two model steps of one assistant message
    StepStart,
    #[serde(untagged)]
    Tool(ToolPart),
    /// Anything else (sources, files, data parts) is carried through untouched
    #[serde(untagged)]
    Other(Value),
}

impl UiMessagePart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text {
            text: text.into(),
            state: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiRole {
    System,
    User,
    Assistant,
}

/// A chat message as the widget holds it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UiMessage {
    #[serde(default)]
    pub id: String,
    pub role: UiRole,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    #[serde(default)]
    pub parts: Vec<UiMessagePart>,
}

impl UiMessage {
    pub fn new(id: impl Into<String>, role: UiRole) -> Self {
        Self {
            id: id.into(),
            role,
            metadata: None,
            parts: Vec::new(),
        }
    }

    /// User message with a single text part
    pub fn user(id: impl Into<String>, text: impl Into<String>) -> Self {
        let mut message = Self::new(id, UiRole::User);
        message.parts.push(UiMessagePart::text(text));
        message
    }

    pub fn assistant(id: impl Into<String>) -> Self {
        Self::new(id, UiRole::Assistant)
    }

    /// All text parts concatenated; other parts are not rendered
    pub fn text_content(&self) -> String {
        self.parts
            .iter()
            .filter_map(|p| match p {
                UiMessagePart::Text { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn tool_parts(&self) -> impl Iterator<Item = &ToolPart> {
        self.parts.iter().filter_map(|p| match p {
            UiMessagePart::Tool(tool) => Some(tool),
            _ => None,
        })
    }
}

/// Body the widget POSTs to the relay
///
/// The relay only reads `messages`; `id` and `trigger` mirror what browser
/// chat clients send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequestBody {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub messages: Vec<UiMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trigger: Option<String>,
}

impl ChatRequestBody {
    pub fn submit(chat_id: impl Into<String>, messages: Vec<UiMessage>) -> Self {
        Self {
            id: Some(chat_id.into()),
            messages,
            trigger: Some("submit-message".to_string()),
        }
    }
}
