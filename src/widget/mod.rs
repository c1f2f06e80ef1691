//! Embeddable chat widget
//!
//! A headless controller for the chat window plus the pieces around it: the
//! embedding configuration, the HTTP transport to the relay, a registry of
//! mounted instances and the markup presenters.

mod config;
mod controller;
mod error;
pub mod presentation;
mod registry;
mod transport;

pub use config::{Position, WidgetConfig, AUTO_INIT_ATTR, DEFAULT_CONTAINER_ID, DEFAULT_TITLE};
pub use controller::{
    ChatStatus, DisplayState, Effect, Suggestion, WidgetController, FOCUS_DELAY, SUGGESTIONS,
};
pub use error::WidgetError;
pub use presentation::{CdnPresenter, Presenter, UtilityPresenter, WidgetView};
pub use registry::{Disposer, WidgetHandle, WidgetRegistry, WIDGET_VERSION};
pub use transport::{drive_turn, send_message, ChatTransport, ChunkStream, HttpChatTransport};
