//! Tool call tracking for streamed chat completion deltas
//!
//! OpenAI-compatible streams identify a tool call by its `id` only in the first
//! delta; later argument fragments carry just the call's `index`. The tracker
//! maps indices back to call ids and turns raw deltas into [`StreamEvent`]s.

use std::collections::BTreeMap;

use crate::llm::StreamEvent;

#[derive(Debug, Default)]
pub struct ToolCallTracker {
    /// Delta index -> (call_id, name)
    calls: BTreeMap<usize, (String, String)>,
}

impl ToolCallTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new tool call and return its start event
    ///
    /// A repeated start for an index already tracked returns `None`.
    pub fn start_call(&mut self, index: usize, call_id: &str, name: &str) -> Option<StreamEvent> {
        if self.calls.contains_key(&index) {
            return None;
        }
        self.calls
            .insert(index, (call_id.to_string(), name.to_string()));
        Some(StreamEvent::ToolCallStart {
            id: call_id.to_string(),
            name: name.to_string(),
        })
    }

    /// Map an argument fragment for `index` to a delta event
    pub fn append_args(&mut self, index: usize, delta: &str) -> Option<StreamEvent> {
        match self.calls.get(&index) {
            Some((id, _)) => Some(StreamEvent::ToolCallDelta {
                id: id.clone(),
                arguments_delta: delta.to_string(),
            }),
            None => {
                tracing::warn!("Received tool call delta for unknown index: {}", index);
                None
            }
        }
    }

    /// Completion events for every tracked call, in index order; clears the tracker
    pub fn complete_all(&mut self) -> Vec<StreamEvent> {
        std::mem::take(&mut self.calls)
            .into_values()
            .map(|(id, _)| StreamEvent::ToolCallComplete { id })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}
