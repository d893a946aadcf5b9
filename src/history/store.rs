//! In-memory conversation state with a persistence mirror.
//!
//! All mutations funnel through one interior lock, and at most one send is
//! in flight store-wide. Assistant failures never escape to the caller:
//! they are logged, the busy flags drop, and the conversation keeps the
//! user turn.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::{AbortHandle, JoinHandle};

use crate::services::assistant::reply;
use crate::services::assistant::{AssistantClient, AssistantError};
use crate::services::config;

use super::error::StoreError;
use super::persist::ConversationStorage;
use super::title;
use super::types::{Conversation, Message, Role};

/// The conversation store: the only surface the presentation layer talks to.
///
/// Cloning is cheap; clones share state.
#[derive(Clone)]
pub struct ChatStore {
    inner: Arc<ChatStoreInner>,
}

struct ChatStoreInner {
    client: AssistantClient,
    storage: ConversationStorage,
    // NOTE: std::sync::Mutex — the lock is never held across an .await.
    state: Mutex<StoreState>,
    is_loading: AtomicBool,
    is_typing: AtomicBool,
    in_flight: Mutex<Option<AbortHandle>>,
}

#[derive(Default)]
struct StoreState {
    conversations: Vec<Conversation>,
    current_id: Option<String>,
}

impl ChatStore {
    /// Build a store over the given client and storage, loading the
    /// persisted conversation set.
    pub fn init(client: AssistantClient, storage: ConversationStorage) -> Self {
        let conversations = storage.load();
        log::info!("Loaded {} conversation(s)", conversations.len());

        Self {
            inner: Arc::new(ChatStoreInner {
                client,
                storage,
                state: Mutex::new(StoreState {
                    conversations,
                    current_id: None,
                }),
                is_loading: AtomicBool::new(false),
                is_typing: AtomicBool::new(false),
                in_flight: Mutex::new(None),
            }),
        }
    }

    /// Store over env-derived configuration and the default data directory.
    pub fn open_default() -> Result<Self, StoreError> {
        let webhook = config::load_webhook_config();
        let storage = ConversationStorage::open_default()?;
        Ok(Self::init(AssistantClient::new(webhook), storage))
    }

    // ---- reactive reads ---------------------------------------------------

    /// Snapshot of the conversation set, most recent first.
    pub fn conversations(&self) -> Vec<Conversation> {
        self.lock_state().conversations.clone()
    }

    pub fn current_conversation(&self) -> Option<Conversation> {
        let state = self.lock_state();
        let id = state.current_id.as_deref()?;
        state.conversations.iter().find(|c| c.id == id).cloned()
    }

    /// True while a send is in flight (single-flight guard).
    pub fn is_loading(&self) -> bool {
        self.inner.is_loading.load(Ordering::SeqCst)
    }

    /// True while the assistant request itself is pending.
    pub fn is_typing(&self) -> bool {
        self.inner.is_typing.load(Ordering::SeqCst)
    }

    // ---- operations -------------------------------------------------------

    /// Create an empty conversation, put it first, and make it current.
    pub fn create_new_conversation(&self) -> Conversation {
        let conversation = Conversation::new();
        let mut state = self.lock_state();
        state.conversations.insert(0, conversation.clone());
        state.current_id = Some(conversation.id.clone());
        self.persist(&state);
        conversation
    }

    /// Make the matching conversation current; unknown ids are ignored.
    pub fn select_conversation(&self, id: &str) {
        let mut state = self.lock_state();
        if state.conversations.iter().any(|c| c.id == id) {
            state.current_id = Some(id.to_string());
        }
    }

    /// Drop a conversation; a matching current pointer is cleared.
    pub fn delete_conversation(&self, id: &str) {
        let mut state = self.lock_state();
        state.conversations.retain(|c| c.id != id);
        if state.current_id.as_deref() == Some(id) {
            state.current_id = None;
        }
        self.persist(&state);
    }

    /// Abort the in-flight assistant request, if any.
    ///
    /// The awaiting send path observes the abort, clears the busy flags and
    /// appends nothing; the already-appended user turn stays.
    pub fn stop_generation(&self) {
        let handle = match self.inner.in_flight.lock() {
            Ok(mut slot) => slot.take(),
            Err(_) => None,
        };
        if let Some(handle) = handle {
            log::info!("Aborting in-flight assistant request");
            handle.abort();
        }
    }

    /// Append `content` as a user turn of the current conversation (one is
    /// created when none is current), then fetch and append the assistant
    /// reply.
    ///
    /// No-op when a send is already in flight anywhere in the store. All
    /// failures are absorbed here: logged, flags cleared, nothing appended.
    pub async fn send_message(&self, content: &str) {
        let content = content.trim();
        if content.is_empty() {
            return;
        }

        // Single-flight across the whole store, not per conversation.
        if self.inner.is_loading.swap(true, Ordering::SeqCst) {
            log::debug!("Send ignored: a request is already in flight");
            return;
        }

        // The user turn lands synchronously, before any suspension point.
        let conversation_id = {
            let mut state = self.lock_state();
            let index = current_index_or_new(&mut state);

            let conversation = &mut state.conversations[index];
            let first_message = conversation.messages.is_empty();
            conversation.push_message(Message::new(Role::User, content));
            if first_message {
                conversation.title = title::title_from_first_message(content);
            }
            let id = conversation.id.clone();
            self.persist(&state);
            id
        };

        self.inner.is_typing.store(true, Ordering::SeqCst);

        let task = self.spawn_reply_task(content.to_string(), conversation_id.clone());
        if let Ok(mut slot) = self.inner.in_flight.lock() {
            *slot = Some(task.abort_handle());
        }

        match task.await {
            Ok(Ok(text)) => self.append_assistant_reply(&conversation_id, text),
            Ok(Err(err)) => log::warn!("Assistant request failed: {}", err),
            Err(join_err) if join_err.is_cancelled() => {
                log::info!("Assistant request stopped before completion");
            }
            Err(join_err) => log::warn!("Assistant task failed: {}", join_err),
        }

        if let Ok(mut slot) = self.inner.in_flight.lock() {
            *slot = None;
        }
        self.inner.is_typing.store(false, Ordering::SeqCst);
        self.inner.is_loading.store(false, Ordering::SeqCst);
    }

    // ---- internals --------------------------------------------------------

    fn spawn_reply_task(
        &self,
        content: String,
        conversation_id: String,
    ) -> JoinHandle<Result<String, AssistantError>> {
        let client = self.inner.client.clone();

        tokio::spawn(async move {
            if !client.is_configured() {
                // Demo mode: simulated latency, canned answer.
                log::info!("Webhook not configured; answering in demo mode");
                tokio::time::sleep(reply::demo_delay()).await;
                return Ok(reply::demo_reply());
            }

            let response = client.send_message(&content, Some(&conversation_id)).await?;
            Ok(reply::extract_reply(&response))
        })
    }

    fn append_assistant_reply(&self, conversation_id: &str, content: String) {
        let mut state = self.lock_state();
        let Some(conversation) = state
            .conversations
            .iter_mut()
            .find(|c| c.id == conversation_id)
        else {
            log::warn!("Dropping reply for deleted conversation {conversation_id}");
            return;
        };
        conversation.push_message(Message::new(Role::Assistant, content));
        self.persist(&state);
    }

    fn persist(&self, state: &StoreState) {
        if let Err(err) = self.inner.storage.save(&state.conversations) {
            log::warn!("Failed to persist conversations: {}", err);
        }
    }

    fn lock_state(&self) -> MutexGuard<'_, StoreState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Index of the current conversation, creating and selecting a fresh one
/// when nothing valid is current (the input surface of the client does the
/// same before its first send).
fn current_index_or_new(state: &mut StoreState) -> usize {
    if let Some(id) = state.current_id.as_deref() {
        if let Some(index) = state.conversations.iter().position(|c| c.id == id) {
            return index;
        }
    }

    let conversation = Conversation::new();
    state.current_id = Some(conversation.id.clone());
    state.conversations.insert(0, conversation);
    0
}
