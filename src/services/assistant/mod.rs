//! Client for the assistant webhook endpoint.
//!
//! Notes:
//! - The endpoint is a single POST webhook; the response is arbitrary JSON
//!   and the displayable text is recovered by [`reply::extract_reply`].
//! - Streaming responses are newline-delimited JSON objects with an
//!   optional `chunk` string field.

mod client;
mod error;
pub(crate) mod reply;
mod retry_policy;

pub use client::AssistantClient;
pub use error::AssistantError;
pub use reply::{extract_reply, DEMO_DISCLAIMER, FALLBACK_REPLY};
