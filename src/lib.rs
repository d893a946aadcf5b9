//! Conversation core for a webhook-backed chat client.
//!
//! The crate owns the conversation state ([`history`]), its durable JSON
//! snapshot, and the HTTP client for the single assistant webhook endpoint
//! ([`services::assistant`]). Rendering, input handling and theming belong
//! to the embedding application, which talks to this crate exclusively
//! through [`ChatStore`]: the reactive reads `conversations` /
//! `current_conversation` / `is_loading` / `is_typing` and the operations
//! `create_new_conversation` / `select_conversation` / `send_message` /
//! `delete_conversation` / `stop_generation`.
//!
//! With no endpoint configured the store still works: sends are answered
//! from a canned demo set after a simulated delay.

pub mod history;
pub mod services;

pub use history::{
    ChatStore, Conversation, ConversationStorage, Message, Role, StoreError, DEFAULT_TITLE,
    STORAGE_KEY,
};
pub use services::assistant::{AssistantClient, AssistantError, DEMO_DISCLAIMER, FALLBACK_REPLY};
pub use services::config::{load_webhook_config, WebhookConfig, PLACEHOLDER_URL};
pub use services::retry::RetryConfig;
