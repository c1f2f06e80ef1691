//! smeduverse-ai: AI chat relay and embeddable chat widget for teachers
//!
//! This library provides:
//! - HTTP relay that streams agent replies as a UI message stream over SSE
//! - Chat agent with a bounded multi-step tool loop
//! - Groq (OpenAI-compatible) streaming provider
//! - Headless widget controller, HTTP client transport and markup presenters

pub mod agent;
pub mod config;
pub mod llm;
pub mod protocol;
pub mod tools;
pub mod transport;
pub mod widget;

pub use config::Config;
