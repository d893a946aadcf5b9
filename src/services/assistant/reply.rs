//! Turning a raw webhook response into displayable reply text.
//!
//! Webhook workflows wrap the answer in arbitrary envelopes (execution
//! metadata, node output arrays), so extraction is a tolerant search rather
//! than a fixed schema.

use std::time::Duration;

use serde_json::Value;

/// Shown when a response carries nothing recognizable.
pub const FALLBACK_REPLY: &str = "Sorry, I could not process your request.";

/// Appended to every canned reply so demo output is never mistaken for a
/// live assistant.
pub const DEMO_DISCLAIMER: &str = "\n\n**Note:** This is a demo response. Set CHAT_WEBHOOK_URL in your environment to connect a real assistant endpoint.";

pub(crate) const DEMO_REPLIES: [&str; 5] = [
    "I understand your question. Let me provide you with a comprehensive answer that addresses the key points you've raised.",
    "That's an interesting perspective! Here's what I think about that topic based on current knowledge.",
    "I can help you with that. Let me break this down into clear, actionable steps.",
    "Thank you for your question. Here's a detailed response that should cover what you're looking for.",
    "Great question! This is actually a complex topic, so let me explain it thoroughly.",
];

/// Recursion limit for the `output` search; deeper payloads fall through to
/// the fallback chain instead of risking the stack.
const MAX_SCAN_DEPTH: usize = 16;

/// Extract displayable text from a raw webhook response.
///
/// Preference order: the first string field named `output` anywhere in the
/// tree, then the top-level `message` / `response` / `text` fields, then
/// [`FALLBACK_REPLY`].
pub fn extract_reply(response: &Value) -> String {
    if let Some(output) = find_output(response, 0) {
        return output.to_string();
    }

    for key in ["message", "response", "text"] {
        if let Some(text) = response.get(key).and_then(Value::as_str) {
            return text.to_string();
        }
    }

    FALLBACK_REPLY.to_string()
}

/// Depth-first search for the first string field named `output`, visiting
/// object entries in order and descending into nested objects and arrays.
fn find_output(value: &Value, depth: usize) -> Option<&str> {
    if depth >= MAX_SCAN_DEPTH {
        return None;
    }

    match value {
        Value::Object(map) => {
            for (key, child) in map {
                if key == "output" {
                    if let Value::String(text) = child {
                        return Some(text);
                    }
                }
                if child.is_object() || child.is_array() {
                    if let Some(found) = find_output(child, depth + 1) {
                        return Some(found);
                    }
                }
            }
            None
        }
        Value::Array(items) => items.iter().find_map(|item| find_output(item, depth + 1)),
        _ => None,
    }
}

/// Pick a canned demo reply, disclaimer attached.
pub(crate) fn demo_reply() -> String {
    let index = clock_jitter() as usize % DEMO_REPLIES.len();
    format!("{}{}", DEMO_REPLIES[index], DEMO_DISCLAIMER)
}

/// Simulated assistant latency for demo mode: 1-3 s.
pub(crate) fn demo_delay() -> Duration {
    Duration::from_millis(1_000 + clock_jitter() % 2_000)
}

/// Cheap pseudo-randomness from the subsecond clock; plenty for picking
/// canned strings.
fn clock_jitter() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| u64::from(d.subsec_nanos()))
        .unwrap_or(0)
}
