//! Server-Sent Events framing for the UI message stream

use axum::{
    body::Body,
    http::{header, HeaderValue, StatusCode},
    response::Response,
};
use bytes::Bytes;

use crate::llm::streaming::DONE_MARKER;
use crate::protocol::UIStreamEvent;

/// Header browser chat clients use to recognise the stream protocol
pub const UI_MESSAGE_STREAM_HEADER: &str = "x-vercel-ai-ui-message-stream";

/// Encode one chunk as `data: <json>\n\n`
pub fn frame(event: &UIStreamEvent) -> Bytes {
    match serde_json::to_string(event) {
        Ok(json) => Bytes::from(format!("data: {}\n\n", json)),
        Err(e) => {
            tracing::error!("Failed to encode stream chunk: {}", e);
            let fallback = serde_json::json!({"type": "error", "errorText": e.to_string()});
            Bytes::from(format!("data: {}\n\n", fallback))
        }
    }
}

/// Terminal `data: [DONE]` frame
pub fn done_frame() -> Bytes {
    Bytes::from(format!("data: {}\n\n", DONE_MARKER))
}

/// Wrap a streaming body with the event-stream headers
pub fn stream_response(body: Body) -> Response {
    let mut response = Response::new(body);
    *response.status_mut() = StatusCode::OK;
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-cache"));
    headers.insert(header::CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(
        header::TRANSFER_ENCODING,
        HeaderValue::from_static("chunked"),
    );
    headers.insert(UI_MESSAGE_STREAM_HEADER, HeaderValue::from_static("v1"));
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}
