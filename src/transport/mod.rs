//! Transport layer for the HTTP relay and the terminal client

pub mod cli;
pub mod http;
pub mod sse;

pub use http::{router, run_http_server, AppState, RelayError};
