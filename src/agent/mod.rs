//! Agent that answers a conversation, calling tools as needed

mod chat;
mod prompt;

pub use chat::{AgentEvent, AgentRun, ChatAgent, RunSummary, DEFAULT_MAX_STEPS};
pub use prompt::SYSTEM_PROMPT;
