//! Conversation store
//!
//! The message log only grows. Every mutation goes through one of the
//! transitions below; there is no edit, delete or truncate.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::ConversationError;
use crate::state::{ChatMessage, Source};

/// First message of every conversation
pub const GREETING: &str =
    "Hello! I'm the Support Brain. You can ask me about solving errors or technical manuals.";

#[derive(Debug, Clone, PartialEq)]
pub struct Conversation {
    messages: Vec<ChatMessage>,
    pending: bool,
}

impl Conversation {
    pub fn new() -> Self {
        Self::with_greeting(GREETING)
    }

    pub fn with_greeting(greeting: impl Into<String>) -> Self {
        Self {
            messages: vec![ChatMessage::assistant(greeting, None)],
            pending: false,
        }
    }

    /// Append the user's text as typed. Whitespace-only text is refused.
    pub fn append_user_message(&mut self, text: &str) -> Result<(), ConversationError> {
        if text.trim().is_empty() {
            return Err(ConversationError::EmptyMessage);
        }
        self.messages.push(ChatMessage::user(text));
        Ok(())
    }

    pub fn append_assistant_message(&mut self, text: impl Into<String>, sources: Vec<Source>) {
        self.messages.push(ChatMessage::assistant(text, Some(sources)));
    }

    /// Append a reply that stands in for a failed request (no sources field)
    pub fn append_error_message(&mut self, text: impl Into<String>) {
        self.messages.push(ChatMessage::assistant(text, None));
    }

    pub fn set_pending(&mut self, pending: bool) {
        self.pending = pending;
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Shared, serialized access to one conversation
///
/// The UI thread reads it while a spawned request task appends to it. The lock
/// is never held across an `.await`.
#[derive(Debug, Clone, Default)]
pub struct ConversationHandle {
    inner: Arc<Mutex<Conversation>>,
}

impl ConversationHandle {
    pub fn new(conversation: Conversation) -> Self {
        Self {
            inner: Arc::new(Mutex::new(conversation)),
        }
    }

    // A panic while holding the lock cannot leave a half-applied transition
    // (each is a single push or flag write), so a poisoned lock is still usable.
    pub(crate) fn lock(&self) -> MutexGuard<'_, Conversation> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn read<R>(&self, f: impl FnOnce(&Conversation) -> R) -> R {
        f(&self.lock())
    }

    pub fn snapshot(&self) -> Vec<ChatMessage> {
        self.lock().messages().to_vec()
    }

    pub fn is_pending(&self) -> bool {
        self.lock().is_pending()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
