//! Conversation state: domain types, the durable snapshot, and the store
//! the presentation layer drives.

mod error;
mod persist;
mod store;
mod title;
mod types;

pub use error::StoreError;
pub use persist::{ConversationStorage, STORAGE_KEY};
pub use store::ChatStore;
pub use title::DEFAULT_TITLE;
pub use types::{Conversation, Message, Role};
