//! Widget state machine
//!
//! All mutation goes through `&mut WidgetController`. Operations return the
//! side effects the host should perform (scrolling, focusing, sending) instead
//! of performing them.

use std::collections::HashMap;
use std::time::Duration;

use super::{WidgetConfig, WidgetError};
use crate::protocol::{
    ChatRequestBody, StreamState, ToolPart, ToolState, UIStreamEvent, UiMessage, UiMessagePart,
};

/// Delay before the input box takes focus after opening
pub const FOCUS_DELAY: Duration = Duration::from_millis(100);

/// Whether the chat window is visible and how large it is
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayState {
    Closed,
    Open,
    OpenExpanded,
}

/// Network and stream state of the current turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatStatus {
    Ready,
    /// Request sent, nothing received yet
    Submitted,
    Streaming,
    Error(String),
}

/// Side effect requested by the controller
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ScrollToBottom,
    FocusInput { delay: Duration },
    SendRequest(ChatRequestBody),
}

/// Canned prompt offered while the conversation is empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Suggestion {
    pub label: &'static str,
    pub prompt: &'static str,
}

pub const SUGGESTIONS: [Suggestion; 2] = [
    Suggestion {
        label: "Buatkan RPP Fotosintesis kelas 7",
        prompt: "Buatkan rencana pembelajaran untuk topik Fotosintesis kelas 7",
    },
    Suggestion {
        label: "Tips motivasi siswa",
        prompt: "Bagaimana cara meningkatkan motivasi siswa yang rendah?",
    },
];

/// Parts of the assistant message currently being streamed, by stream id
#[derive(Debug, Default)]
struct InProgress {
    message_index: usize,
    text: HashMap<String, usize>,
    reasoning: HashMap<String, usize>,
    tools: HashMap<String, usize>,
}

#[derive(Debug)]
pub struct WidgetController {
    config: WidgetConfig,
    chat_id: String,
    messages: Vec<UiMessage>,
    input: String,
    open: bool,
    expanded: bool,
    status: ChatStatus,
    in_progress: Option<InProgress>,
}

fn new_id(prefix: &str) -> String {
    format!("{}_{}", prefix, uuid::Uuid::new_v4().simple())
}

impl WidgetController {
    pub fn new(config: WidgetConfig) -> Self {
        Self {
            config,
            chat_id: new_id("chat"),
            messages: Vec::new(),
            input: String::new(),
            open: false,
            expanded: false,
            status: ChatStatus::Ready,
            in_progress: None,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn config(&self) -> &WidgetConfig {
        &self.config
    }

    pub fn chat_id(&self) -> &str {
        &self.chat_id
    }

    pub fn messages(&self) -> &[UiMessage] {
        &self.messages
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn status(&self) -> &ChatStatus {
        &self.status
    }

    pub fn error(&self) -> Option<&str> {
        match &self.status {
            ChatStatus::Error(message) => Some(message),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self.status, ChatStatus::Submitted | ChatStatus::Streaming)
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn display_state(&self) -> DisplayState {
        match (self.open, self.expanded) {
            (false, _) => DisplayState::Closed,
            (true, false) => DisplayState::Open,
            (true, true) => DisplayState::OpenExpanded,
        }
    }

    /// Whether the send button is enabled
    pub fn can_send(&self) -> bool {
        !self.is_loading() && !self.input.trim().is_empty()
    }

    pub fn suggestions(&self) -> &'static [Suggestion] {
        &SUGGESTIONS
    }

    // ========================================================================
    // Display
    // ========================================================================

    pub fn toggle_open(&mut self) -> Vec<Effect> {
        if self.open {
            self.close();
            Vec::new()
        } else {
            self.open()
        }
    }

    pub fn open(&mut self) -> Vec<Effect> {
        if self.open {
            return Vec::new();
        }
        self.open = true;
        vec![Effect::FocusInput { delay: FOCUS_DELAY }]
    }

    /// Hide the window; the expanded flag is kept for the next open
    pub fn close(&mut self) {
        self.open = false;
    }

    pub fn toggle_expand(&mut self) {
        self.expanded = !self.expanded;
    }

    // ========================================================================
    // Input
    // ========================================================================

    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Fill the input box with a suggestion's prompt
    pub fn apply_suggestion(&mut self, suggestion: &Suggestion) {
        self.input = suggestion.prompt.to_string();
    }

    /// Submit whatever is in the input box
    pub fn submit_input(&mut self) -> Result<Vec<Effect>, WidgetError> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Append a user message and request a response
    ///
    /// Blank text is ignored. The text is sent as typed, without trimming.
    pub fn submit(&mut self, text: &str) -> Result<Vec<Effect>, WidgetError> {
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        if self.is_loading() {
            return Err(WidgetError::Busy);
        }

        self.messages.push(UiMessage::user(new_id("msg"), text));
        self.input.clear();
        self.status = ChatStatus::Submitted;
        self.in_progress = None;

        let body = ChatRequestBody::submit(self.chat_id.clone(), self.messages.clone());
        Ok(vec![Effect::ScrollToBottom, Effect::SendRequest(body)])
    }

    /// Start a new conversation; display state is untouched
    pub fn reset(&mut self) {
        self.messages.clear();
        self.in_progress = None;
    }

    // ========================================================================
    // Stream
    // ========================================================================

    /// The relay accepted the request and the body started arriving
    pub fn on_stream_open(&mut self) {
        if self.status == ChatStatus::Submitted {
            self.status = ChatStatus::Streaming;
        }
    }

    /// Apply one stream chunk to the in-progress assistant message
    pub fn on_stream_event(&mut self, event: &UIStreamEvent) -> Vec<Effect> {
        if !self.is_loading() {
            tracing::debug!("Ignoring stream chunk outside of a turn: {:?}", event);
            return Vec::new();
        }
        self.status = ChatStatus::Streaming;

        let mut effects = Vec::new();
        match event {
            UIStreamEvent::MessageStart { message_id } => {
                if self.in_progress.is_none() {
                    let id = message_id.clone().unwrap_or_else(|| new_id("msg"));
                    self.start_assistant(id);
                    effects.push(Effect::ScrollToBottom);
                }
            }
            UIStreamEvent::StartStep => {
                self.assistant_parts(&mut effects)
                    .push(UiMessagePart::StepStart);
            }
            UIStreamEvent::TextStart { id } => {
                let index = self.push_part(
                    &mut effects,
                    UiMessagePart::Text {
                        text: String::new(),
                        state: Some(StreamState::Streaming),
                    },
                );
                self.progress_mut().text.insert(id.clone(), index);
            }
            UIStreamEvent::TextDelta { id, delta } => {
                let index = self.text_part(&mut effects, id);
                if let Some(UiMessagePart::Text { text, .. }) = self.part_mut(index) {
                    text.push_str(delta);
                }
                effects.push(Effect::ScrollToBottom);
            }
            UIStreamEvent::TextEnd { id } => {
                let index = self.in_progress.as_ref().and_then(|p| p.text.get(id)).copied();
                if let Some(index) = index {
                    if let Some(UiMessagePart::Text { state, .. }) = self.part_mut(index) {
                        *state = Some(StreamState::Done);
                    }
                }
            }
            UIStreamEvent::ReasoningStart { id } => {
                let index = self.push_part(
                    &mut effects,
                    UiMessagePart::Reasoning {
                        text: String::new(),
                        state: Some(StreamState::Streaming),
                    },
                );
                self.progress_mut().reasoning.insert(id.clone(), index);
            }
            UIStreamEvent::ReasoningDelta { id, delta } => {
                let existing = self
                    .in_progress
                    .as_ref()
                    .and_then(|p| p.reasoning.get(id))
                    .copied();
                let index = match existing {
                    Some(index) => index,
                    None => {
                        let index = self.push_part(
                            &mut effects,
                            UiMessagePart::Reasoning {
                                text: String::new(),
                                state: Some(StreamState::Streaming),
                            },
                        );
                        self.progress_mut().reasoning.insert(id.clone(), index);
                        index
                    }
                };
                if let Some(UiMessagePart::Reasoning { text, .. }) = self.part_mut(index) {
                    text.push_str(delta);
                }
            }
            UIStreamEvent::ReasoningEnd { id } => {
                let index = self
                    .in_progress
                    .as_ref()
                    .and_then(|p| p.reasoning.get(id))
                    .copied();
                if let Some(index) = index {
                    if let Some(UiMessagePart::Reasoning { state, .. }) = self.part_mut(index) {
                        *state = Some(StreamState::Done);
                    }
                }
            }
            UIStreamEvent::ToolInputStart {
                tool_call_id,
                tool_name,
            } => {
                self.tool_part(&mut effects, tool_call_id, tool_name);
            }
            UIStreamEvent::ToolInputDelta { .. } => {}
            UIStreamEvent::ToolInputAvailable {
                tool_call_id,
                tool_name,
                input,
            } => {
                if let Some(part) = self.tool_part(&mut effects, tool_call_id, tool_name) {
                    part.state = ToolState::InputAvailable;
                    part.input = Some(input.clone());
                }
            }
            UIStreamEvent::ToolOutputAvailable {
                tool_call_id,
                output,
            } => {
                if let Some(part) = self.tool_part(&mut effects, tool_call_id, "unknown") {
                    part.state = ToolState::OutputAvailable;
                    part.output = Some(output.clone());
                }
            }
            UIStreamEvent::ToolOutputError {
                tool_call_id,
                error_text,
            } => {
                if let Some(part) = self.tool_part(&mut effects, tool_call_id, "unknown") {
                    part.state = ToolState::OutputError;
                    part.error_text = Some(error_text.clone());
                }
            }
            UIStreamEvent::FinishStep | UIStreamEvent::Unknown => {}
            UIStreamEvent::Finish { .. } => {
                self.status = ChatStatus::Ready;
                self.in_progress = None;
            }
            UIStreamEvent::Error { error_text } => {
                tracing::warn!("Relay reported an error: {}", error_text);
                self.status = ChatStatus::Error(error_text.clone());
                self.in_progress = None;
            }
        }
        effects
    }

    /// The response body ended
    pub fn on_stream_end(&mut self) {
        if self.is_loading() {
            self.status = ChatStatus::Ready;
        }
        self.in_progress = None;
    }

    /// The request failed or the stream broke off
    pub fn on_transport_error(&mut self, error: &WidgetError) {
        tracing::warn!("Chat request failed: {}", error);
        self.status = ChatStatus::Error(error.to_string());
        self.in_progress = None;
    }

    // ========================================================================
    // In-progress message helpers
    // ========================================================================

    fn start_assistant(&mut self, id: String) {
        self.messages.push(UiMessage::assistant(id));
        self.in_progress = Some(InProgress {
            message_index: self.messages.len() - 1,
            ..InProgress::default()
        });
    }

    /// Parts of the in-progress assistant message, created on demand
    fn assistant_parts(&mut self, effects: &mut Vec<Effect>) -> &mut Vec<UiMessagePart> {
        let valid = self
            .in_progress
            .as_ref()
            .is_some_and(|p| p.message_index < self.messages.len());
        if !valid {
            self.start_assistant(new_id("msg"));
            effects.push(Effect::ScrollToBottom);
        }
        let index = self.progress_mut().message_index;
        &mut self.messages[index].parts
    }

    fn progress_mut(&mut self) -> &mut InProgress {
        self.in_progress.get_or_insert_with(InProgress::default)
    }

    fn push_part(&mut self, effects: &mut Vec<Effect>, part: UiMessagePart) -> usize {
        let parts = self.assistant_parts(effects);
        parts.push(part);
        parts.len() - 1
    }

    fn part_mut(&mut self, index: usize) -> Option<&mut UiMessagePart> {
        let message_index = self.in_progress.as_ref()?.message_index;
        self.messages.get_mut(message_index)?.parts.get_mut(index)
    }

    fn text_part(&mut self, effects: &mut Vec<Effect>, id: &str) -> usize {
        if let Some(index) = self.in_progress.as_ref().and_then(|p| p.text.get(id)) {
            return *index;
        }
        let index = self.push_part(
            effects,
            UiMessagePart::Text {
                text: String::new(),
                state: Some(StreamState::Streaming),
            },
        );
        self.progress_mut().text.insert(id.to_string(), index);
        index
    }

    fn tool_part(
        &mut self,
        effects: &mut Vec<Effect>,
        tool_call_id: &str,
        tool_name: &str,
    ) -> Option<&mut ToolPart> {
        let existing = self
            .in_progress
            .as_ref()
            .and_then(|p| p.tools.get(tool_call_id))
            .copied();
        let index = match existing {
            Some(index) => index,
            None => {
                let part = ToolPart::new(tool_name, tool_call_id, ToolState::InputStreaming);
                let index = self.push_part(effects, UiMessagePart::Tool(part));
                self.progress_mut()
                    .tools
                    .insert(tool_call_id.to_string(), index);
                index
            }
        };
        match self.part_mut(index) {
            Some(UiMessagePart::Tool(part)) => Some(part),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controller() -> WidgetController {
        WidgetController::new(WidgetConfig::new("http://localhost:3000/api/chat"))
    }

    #[test]
    fn test_display_transitions() {
        let mut c = controller();
        assert_eq!(c.display_state(), DisplayState::Closed);

        let effects = c.toggle_open();
        assert_eq!(effects, vec![Effect::FocusInput { delay: FOCUS_DELAY }]);
        assert_eq!(c.display_state(), DisplayState::Open);

        c.toggle_expand();
        assert_eq!(c.display_state(), DisplayState::OpenExpanded);

        assert!(c.toggle_open().is_empty());
        assert_eq!(c.display_state(), DisplayState::Closed);

        // expanded survives a close
        c.open();
        assert_eq!(c.display_state(), DisplayState::OpenExpanded);
        assert!(c.open().is_empty());
    }

    #[test]
    fn test_submit_appends_user_message_and_requests() {
        let mut c = controller();
        c.set_input("  Halo  ");
        let effects = c.submit_input().unwrap();

        assert_eq!(c.input(), "");
        assert_eq!(c.status(), &ChatStatus::Submitted);
        assert!(c.is_loading());
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.messages()[0].text_content(), "  Halo  ");

        match &effects[1] {
            Effect::SendRequest(body) => {
                assert_eq!(body.messages, c.messages().to_vec());
                assert_eq!(body.id.as_deref(), Some(c.chat_id()));
            }
            other => panic!("expected SendRequest, got {:?}", other),
        }
    }

    #[test]
    fn test_blank_submit_is_noop() {
        let mut c = controller();
        assert!(c.submit(" \n\t").unwrap().is_empty());
        assert!(c.messages().is_empty());
        assert_eq!(c.status(), &ChatStatus::Ready);
    }

    #[test]
    fn test_busy_submit_rejected() {
        let mut c = controller();
        c.submit("pertama").unwrap();
        c.set_input("kedua");
        assert_eq!(c.submit_input(), Err(WidgetError::Busy));
        assert_eq!(c.messages().len(), 1);
        assert_eq!(c.input(), "kedua");
        assert!(!c.can_send());
    }

    #[test]
    fn test_stream_builds_assistant_message() {
        let mut c = controller();
        c.submit("Statistik sekolah?").unwrap();
        c.on_stream_open();
        assert_eq!(c.status(), &ChatStatus::Streaming);

        let chunks = vec![
            UIStreamEvent::message_start("msg_srv"),
            UIStreamEvent::start_step(),
            UIStreamEvent::tool_input_start("call_1", "getSchoolStats"),
            UIStreamEvent::tool_input_available("call_1", "getSchoolStats", json!({})),
            UIStreamEvent::tool_output_available("call_1", json!("test")),
            UIStreamEvent::finish_step(),
            UIStreamEvent::start_step(),
            UIStreamEvent::text_start("txt_0"),
            UIStreamEvent::text_delta("txt_0", "Jumlah "),
            UIStreamEvent::text_delta("txt_0", "siswa"),
            UIStreamEvent::text_end("txt_0"),
            UIStreamEvent::finish_step(),
        ];
        let mut scrolls = 0;
        for chunk in &chunks {
            scrolls += c
                .on_stream_event(chunk)
                .iter()
                .filter(|e| **e == Effect::ScrollToBottom)
                .count();
        }
        // message start plus one per text delta
        assert_eq!(scrolls, 3);

        let assistant = &c.messages()[1];
        assert_eq!(assistant.id, "msg_srv");
        assert_eq!(assistant.text_content(), "Jumlah siswa");
        let tool = assistant.tool_parts().next().unwrap();
        assert_eq!(tool.state, ToolState::OutputAvailable);
        assert_eq!(tool.tool_name(), "getSchoolStats");

        c.on_stream_event(&UIStreamEvent::finish_with_reason("stop"));
        assert_eq!(c.status(), &ChatStatus::Ready);
    }

    #[test]
    fn test_delta_without_start_creates_message() {
        let mut c = controller();
        c.submit("Hai").unwrap();
        c.on_stream_event(&UIStreamEvent::text_delta("t", "Halo"));
        assert_eq!(c.messages().len(), 2);
        assert_eq!(c.messages()[1].text_content(), "Halo");
    }

    #[test]
    fn test_error_chunk_and_recovery() {
        let mut c = controller();
        c.submit("Hai").unwrap();
        c.on_stream_event(&UIStreamEvent::error("Rate limited"));
        assert_eq!(c.error(), Some("Rate limited"));
        assert!(!c.is_loading());

        // error state accepts a new submission
        assert!(c.submit("Coba lagi").is_ok());
        assert_eq!(c.status(), &ChatStatus::Submitted);
    }

    #[test]
    fn test_transport_error_and_stray_chunks() {
        let mut c = controller();
        c.submit("Hai").unwrap();
        c.on_transport_error(&WidgetError::Http {
            status: 500,
            body: "{\"error\":\"boom\"}".into(),
        });
        assert!(c.error().unwrap().contains("HTTP 500"));

        assert!(c
            .on_stream_event(&UIStreamEvent::text_delta("t", "late"))
            .is_empty());
        assert_eq!(c.messages().len(), 1);
    }

    #[test]
    fn test_reset_keeps_display_state() {
        let mut c = controller();
        c.open();
        c.toggle_expand();
        c.submit("Hai").unwrap();
        c.on_stream_event(&UIStreamEvent::finish_with_reason("stop"));

        c.reset();
        assert!(c.messages().is_empty());
        assert_eq!(c.display_state(), DisplayState::OpenExpanded);
    }

    #[test]
    fn test_suggestion_fills_input() {
        let mut c = controller();
        let tips = c.suggestions()[1];
        assert_eq!(tips.label, "Tips motivasi siswa");
        c.apply_suggestion(&tips);
        assert_eq!(
            c.input(),
            "Bagaimana cara meningkatkan motivasi siswa yang rendah?"
        );
        assert!(c.can_send());
    }
}
