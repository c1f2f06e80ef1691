use super::UIStreamEvent;
use crate::agent::AgentEvent;

/// Stateful encoder from agent events to UI message stream chunks.
///
/// Tracks text and reasoning block lifecycles so every `*-start` has a
/// matching `*-end`.
///
/// # Block lifecycle rules
///
/// - `TextDelta` with text closed → prepend `text-start`
/// - `ReasoningDelta` with reasoning closed → prepend `reasoning-start`
/// - switching between text and reasoning closes the other block
/// - `ToolCallStart`, `StepFinish` and `Finish` close any open block
/// - `Error` → terminal, no `*-end` needed
#[derive(Debug)]
pub struct UiStreamEncoder {
    message_id: String,
    text_open: bool,
    text_counter: u32,
    reasoning_open: bool,
    reasoning_counter: u32,
    finished: bool,
}

impl UiStreamEncoder {
    pub fn new(message_id: impl Into<String>) -> Self {
        Self {
            message_id: message_id.into(),
            text_open: false,
            text_counter: 0,
            reasoning_open: false,
            reasoning_counter: 0,
            finished: false,
        }
    }

    /// Encoder with a fresh `msg_` id
    pub fn with_random_id() -> Self {
        Self::new(format!("msg_{}", uuid::Uuid::new_v4().simple()))
    }

    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    fn text_id(&self) -> String {
        format!("txt_{}", self.text_counter)
    }

    fn reasoning_id(&self) -> String {
        format!("rsn_{}", self.reasoning_counter)
    }

    fn close_text(&mut self, events: &mut Vec<UIStreamEvent>) {
        if self.text_open {
            events.push(UIStreamEvent::text_end(self.text_id()));
            self.text_open = false;
            self.text_counter += 1;
        }
    }

    fn close_reasoning(&mut self, events: &mut Vec<UIStreamEvent>) {
        if self.reasoning_open {
            events.push(UIStreamEvent::reasoning_end(self.reasoning_id()));
            self.reasoning_open = false;
            self.reasoning_counter += 1;
        }
    }

    fn close_blocks(&mut self, events: &mut Vec<UIStreamEvent>) {
        self.close_reasoning(events);
        self.close_text(events);
    }

    /// First chunk of every stream
    pub fn prologue(&self) -> Vec<UIStreamEvent> {
        vec![UIStreamEvent::message_start(&self.message_id)]
    }

    pub fn on_agent_event(&mut self, ev: &AgentEvent) -> Vec<UIStreamEvent> {
        if self.finished {
            return Vec::new();
        }

        let mut events = Vec::new();
        match ev {
            AgentEvent::StepStart => events.push(UIStreamEvent::start_step()),
            AgentEvent::TextDelta(delta) => {
                self.close_reasoning(&mut events);
                if !self.text_open {
                    self.text_open = true;
                    events.push(UIStreamEvent::text_start(self.text_id()));
                }
                events.push(UIStreamEvent::text_delta(self.text_id(), delta));
            }
            AgentEvent::ReasoningDelta(delta) => {
                self.close_text(&mut events);
                if !self.reasoning_open {
                    self.reasoning_open = true;
                    events.push(UIStreamEvent::reasoning_start(self.reasoning_id()));
                }
                events.push(UIStreamEvent::reasoning_delta(self.reasoning_id(), delta));
            }
            AgentEvent::ToolCallStart { id, name } => {
                self.close_blocks(&mut events);
                events.push(UIStreamEvent::tool_input_start(id, name));
            }
            AgentEvent::ToolCallDelta { id, delta } => {
                events.push(UIStreamEvent::tool_input_delta(id, delta));
            }
            AgentEvent::ToolInputAvailable { id, name, input } => {
                self.close_blocks(&mut events);
                events.push(UIStreamEvent::tool_input_available(id, name, input.clone()));
            }
            AgentEvent::ToolOutput { id, output } => {
                events.push(UIStreamEvent::tool_output_available(id, output.clone()));
            }
            AgentEvent::ToolError { id, error } => {
                events.push(UIStreamEvent::tool_output_error(id, error));
            }
            AgentEvent::StepFinish => {
                self.close_blocks(&mut events);
                events.push(UIStreamEvent::finish_step());
            }
            AgentEvent::Finish(reason) => {
                self.finished = true;
                self.close_blocks(&mut events);
                events.push(UIStreamEvent::finish_with_reason(reason.as_str()));
            }
            AgentEvent::Error(message) => {
                self.finished = true;
                self.text_open = false;
                self.reasoning_open = false;
                events.push(UIStreamEvent::error(message));
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::FinishReason;

    fn encode_all(events: &[AgentEvent]) -> Vec<UIStreamEvent> {
        let mut encoder = UiStreamEncoder::new("msg_test");
        let mut out = encoder.prologue();
        for ev in events {
            out.extend(encoder.on_agent_event(ev));
        }
        out
    }

    #[test]
    fn test_text_is_opened_lazily_and_closed_before_finish() {
        let out = encode_all(&[
            AgentEvent::StepStart,
            AgentEvent::TextDelta("Ha".into()),
            AgentEvent::TextDelta("lo".into()),
            AgentEvent::StepFinish,
            AgentEvent::Finish(FinishReason::Stop),
        ]);

        assert_eq!(
            out,
            vec![
                UIStreamEvent::message_start("msg_test"),
                UIStreamEvent::start_step(),
                UIStreamEvent::text_start("txt_0"),
                UIStreamEvent::text_delta("txt_0", "Ha"),
                UIStreamEvent::text_delta("txt_0", "lo"),
                UIStreamEvent::text_end("txt_0"),
                UIStreamEvent::finish_step(),
                UIStreamEvent::finish_with_reason("stop"),
            ]
        );
    }

    #[test]
    fn test_tool_call_closes_text_and_next_text_gets_new_id() {
        let out = encode_all(&[
            AgentEvent::TextDelta("Sebentar".into()),
            AgentEvent::ToolCallStart {
                id: "call_1".into(),
                name: "getSchoolStats".into(),
            },
            AgentEvent::ToolOutput {
                id: "call_1".into(),
                output: serde_json::json!("test"),
            },
            AgentEvent::TextDelta("Selesai".into()),
        ]);

        let ends: Vec<_> = out
            .iter()
            .filter(|e| matches!(e, UIStreamEvent::TextEnd { .. }))
            .collect();
        assert_eq!(ends, vec![&UIStreamEvent::text_end("txt_0")]);
        assert_eq!(out.last(), Some(&UIStreamEvent::text_delta("txt_1", "Selesai")));
    }

    #[test]
    fn test_reasoning_then_text() {
        let out = encode_all(&[
            AgentEvent::ReasoningDelta("pikir".into()),
            AgentEvent::TextDelta("jawab".into()),
        ]);
        assert_eq!(
            &out[1..],
            &[
                UIStreamEvent::reasoning_start("rsn_0"),
                UIStreamEvent::reasoning_delta("rsn_0", "pikir"),
                UIStreamEvent::reasoning_end("rsn_0"),
                UIStreamEvent::text_start("txt_0"),
                UIStreamEvent::text_delta("txt_0", "jawab"),
            ]
        );
    }

    #[test]
    fn test_error_is_terminal() {
        let mut encoder = UiStreamEncoder::new("msg_e");
        encoder.on_agent_event(&AgentEvent::TextDelta("x".into()));
        let out = encoder.on_agent_event(&AgentEvent::Error("upstream down".into()));
        assert_eq!(out, vec![UIStreamEvent::error("upstream down")]);
        assert!(encoder.is_finished());
        assert!(encoder
            .on_agent_event(&AgentEvent::Finish(FinishReason::Stop))
            .is_empty());
    }

    #[test]
    fn test_random_id_prefix() {
        assert!(UiStreamEncoder::with_random_id().message_id().starts_with("msg_"));
    }
}
