//! Conversion from UI messages to model messages
//!
//! Assistant messages are split at `step-start` boundaries. Within a step,
//! tool parts that carry a result become an assistant tool call followed by
//! a tool result message. Reasoning, step markers and unknown parts are not
//! sent to the model.

use serde_json::Value;

use super::{ToolPart, ToolState, UiMessage, UiMessagePart, UiRole};
use crate::llm::{Message, ToolCall};

/// Convert the conversation into the model's wire shape
pub fn to_model_messages(messages: &[UiMessage]) -> Vec<Message> {
    let mut out = Vec::with_capacity(messages.len());
    for message in messages {
        match message.role {
            UiRole::System => {
                let text = message.text_content();
                if !text.is_empty() {
                    out.push(Message::system(text));
                }
            }
            UiRole::User => {
                let text = message.text_content();
                if !text.is_empty() {
                    out.push(Message::user(text));
                }
            }
            UiRole::Assistant => convert_assistant(message, &mut out),
        }
    }
    out
}

#[derive(Default)]
struct StepBlock<'a> {
    text: String,
    tools: Vec<&'a ToolPart>,
}

impl StepBlock<'_> {
    fn flush(&mut self, out: &mut Vec<Message>) {
        let text = std::mem::take(&mut self.text);
        let tools = std::mem::take(&mut self.tools);

        if tools.is_empty() {
            if !text.is_empty() {
                out.push(Message::assistant(text));
            }
            return;
        }

        let calls: Vec<ToolCall> = tools
            .iter()
            .map(|t| ToolCall {
                id: t.tool_call_id.clone(),
                name: t.tool_name().to_string(),
                arguments: t.input.clone().unwrap_or_else(|| serde_json::json!({})),
            })
            .collect();
        out.push(Message::assistant_tool_calls(Some(text), &calls));
        for tool in tools {
            out.push(Message::tool_result(&tool.tool_call_id, tool_result_text(tool)));
        }
    }
}

fn convert_assistant(message: &UiMessage, out: &mut Vec<Message>) {
    let mut block = StepBlock::default();
    for part in &message.parts {
        match part {
            UiMessagePart::StepStart => block.flush(out),
            UiMessagePart::Text { text, .. } => block.text.push_str(text),
            UiMessagePart::Tool(tool) => match tool.state {
                ToolState::OutputAvailable | ToolState::OutputError => block.tools.push(tool),
                // no result to replay
                ToolState::InputStreaming | ToolState::InputAvailable => {
                    tracing::debug!("Dropping unfinished tool part {}", tool.tool_call_id);
                }
            },
            UiMessagePart::Reasoning { .. } | UiMessagePart::Other(_) => {}
        }
    }
    block.flush(out);
}

fn tool_result_text(tool: &ToolPart) -> String {
    if tool.state == ToolState::OutputError {
        return tool
            .error_text
            .clone()
            .unwrap_or_else(|| "Tool execution failed".to_string());
    }
    match &tool.output {
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{ContentPart, MessageContent, Role};
    use serde_json::json;

    #[test]
    fn test_user_text_parts_concatenated() {
        let mut message = UiMessage::user("u1", "Tips ");
        message.parts.push(UiMessagePart::text("motivasi siswa"));
        let converted = to_model_messages(&[message]);
        assert_eq!(converted, vec![Message::user("Tips motivasi siswa")]);
    }

    #[test]
    fn test_assistant_steps_replay_tool_results() {
        let mut tool = ToolPart::new("getSchoolStats", "call_1", ToolState::OutputAvailable);
        tool.input = Some(json!({}));
        tool.output = Some(json!("test"));

        let mut assistant = UiMessage::assistant("a1");
        assistant.parts = vec![
            UiMessagePart::StepStart,
            UiMessagePart::Reasoning {
                text: "perlu data".into(),
                state: None,
            },
            UiMessagePart::Tool(tool),
            UiMessagePart::StepStart,
            UiMessagePart::text("Jumlah siswa: test"),
        ];

        let converted = to_model_messages(&[UiMessage::user("u1", "Statistik?"), assistant]);
        assert_eq!(converted.len(), 4);
        assert_eq!(converted[0].role, Role::User);

        match &converted[1].content {
            MessageContent::Parts(parts) => {
                assert_eq!(parts.len(), 1);
                assert!(matches!(
                    &parts[0],
                    ContentPart::ToolUse { id, name, .. } if id == "call_1" && name == "getSchoolStats"
                ));
            }
            other => panic!("expected tool call parts, got {:?}", other),
        }
        assert_eq!(converted[2], Message::tool_result("call_1", "test"));
        assert_eq!(converted[3], Message::assistant("Jumlah siswa: test"));
    }

    #[test]
    fn test_unfinished_and_failed_tools() {
        let pending = ToolPart::new("getSchoolStats", "call_p", ToolState::InputAvailable);
        let mut failed = ToolPart::new("getTeacherPerformance", "call_f", ToolState::OutputError);
        failed.error_text = Some("timed out".into());

        let mut assistant = UiMessage::assistant("a1");
        assistant.parts = vec![UiMessagePart::Tool(pending), UiMessagePart::Tool(failed)];

        let converted = to_model_messages(&[assistant]);
        assert_eq!(converted.len(), 2);
        assert_eq!(converted[1], Message::tool_result("call_f", "timed out"));
    }

    #[test]
    fn test_empty_messages_skipped() {
        let converted = to_model_messages(&[
            UiMessage::new("s", UiRole::System),
            UiMessage::assistant("a"),
        ]);
        assert!(converted.is_empty());
    }
}
