//! Shared streaming utilities
//!
//! The same decoder reads the upstream model stream and, on the widget side,
//! the relay's UI message stream. Both are SSE with JSON `data:` payloads.

mod tool_tracker;

pub use tool_tracker::ToolCallTracker;

/// Terminal payload used by OpenAI-compatible APIs and the UI message stream
pub const DONE_MARKER: &str = "[DONE]";

/// Server-Sent Events (SSE) decoder
///
/// Buffers incoming bytes and extracts complete SSE `data:` payloads.
/// Handles events split across chunks, several events in one chunk, CRLF line
/// endings, and a final event without trailing newline.
///
/// # Example
/// ```
/// use smeduverse_ai::llm::streaming::SseDecoder;
///
/// let mut decoder = SseDecoder::new();
/// assert_eq!(decoder.push(b"data: {\"a\":1}\n\ndata: {\"b\""), vec!["{\"a\":1}"]);
/// assert!(decoder.push(b":2}").is_empty());
/// assert_eq!(decoder.finish(), vec!["{\"b\":2}"]);
/// ```
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push incoming bytes and extract complete SSE `data:` payloads
    ///
    /// Bytes are buffered raw so a multi-byte UTF-8 character split across two
    /// network chunks is decoded intact.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);

        let mut payloads = Vec::new();
        while let Some(newline_pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            if let Some(payload) = data_payload(&line) {
                payloads.push(payload);
            }
        }
        payloads
    }

    /// Flush any remaining buffered content
    ///
    /// Call this when the stream ends to extract the final event if it has no
    /// trailing newline. The buffer is cleared.
    pub fn finish(&mut self) -> Vec<String> {
        let rest = std::mem::take(&mut self.buffer);
        rest.split(|b| *b == b'\n').filter_map(data_payload).collect()
    }
}

/// Extract the payload of a `data:` line; comments, `event:` lines and blank
/// separators yield nothing
fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    let line = line.trim();
    line.strip_prefix("data:").map(|p| p.trim().to_string())
}

/// Whether a decoded payload is the end-of-stream marker
pub fn is_done(payload: &str) -> bool {
    payload.trim() == DONE_MARKER
}
