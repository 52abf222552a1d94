pub mod client;
pub mod config;
pub mod conversation;
pub mod coordinator;
pub mod error;
pub mod service;
pub mod state;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use client::ChatClient;
pub use config::Config;
pub use conversation::{Conversation, ConversationHandle, GREETING};
pub use coordinator::{
    PendingRequest, Rejection, RequestCoordinator, Resolution, FALLBACK_MESSAGE, TOP_K,
};
pub use error::{ConversationError, ServiceError, ServiceErrorKind};
pub use service::{AnswerService, ChatRequest, ChatResponse, HealthStatus};
pub use state::{ChatMessage, ChatRole, Source};
