//! UI message stream protocol spoken between the relay and the widget

mod convert;
mod encoder;
mod events;
mod message;

pub use convert::to_model_messages;
pub use encoder::UiStreamEncoder;
pub use events::UIStreamEvent;
pub use message::{
    ChatRequestBody, StreamState, ToolPart, ToolState, UiMessage, UiMessagePart, UiRole,
};
