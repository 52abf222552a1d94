//! Request coordinator
//!
//! Turns one submitted query into exactly one call to the answer service and
//! resolves the outcome into conversation transitions:
//!
//! ```text
//! Idle --admit--> Pending --answer--> Resolved --> Idle
//!                         \--error---> Failed ---> Idle
//! ```
//!
//! Admission is the only gate: blank input and submissions made while a
//! request is outstanding are dropped without touching the conversation.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::conversation::ConversationHandle;
use crate::error::ServiceError;
use crate::service::{AnswerService, ChatRequest, ChatResponse};

/// Number of supporting sources requested per query
pub const TOP_K: u32 = 3;

/// Reply appended when the answer service cannot be reached or misbehaves
pub const FALLBACK_MESSAGE: &str = "Error while connecting with the server. Is the backend running?";

/// Why a submission was not admitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    EmptyInput,
    AlreadyPending,
}

/// How an admitted submission ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    Resolved,
    Failed,
}

/// An admitted submission. Owns the conversation's pending flag.
///
/// `resolve` appends the reply and releases the flag. Dropping the ticket
/// unresolved (panicking or aborted task) appends the fallback reply and
/// releases the flag, so the conversation never stays pending.
#[must_use = "the conversation stays pending until the request is resolved"]
#[derive(Debug)]
pub struct PendingRequest {
    conversation: ConversationHandle,
    query: String,
    released: bool,
}

impl PendingRequest {
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn request(&self) -> ChatRequest {
        ChatRequest {
            query: self.query.clone(),
            top_k: TOP_K,
        }
    }

    pub fn resolve(mut self, result: Result<ChatResponse, ServiceError>) -> Resolution {
        let resolution = {
            let mut conversation = self.conversation.lock();
            let resolution = match result {
                Ok(response) => {
                    let (answer, sources) = response.into_parts();
                    info!(sources = sources.len(), "answer received");
                    conversation.append_assistant_message(answer, sources);
                    Resolution::Resolved
                }
                Err(err) => {
                    warn!(kind = ?err.kind, error = %err, "answer service request failed");
                    conversation.append_error_message(FALLBACK_MESSAGE);
                    Resolution::Failed
                }
            };
            conversation.set_pending(false);
            resolution
        };
        self.released = true;
        resolution
    }
}

impl Drop for PendingRequest {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        warn!(query = %self.query, "request dropped before it resolved");
        let mut conversation = self.conversation.lock();
        conversation.append_error_message(FALLBACK_MESSAGE);
        conversation.set_pending(false);
    }
}

pub struct RequestCoordinator<S> {
    service: Arc<S>,
    conversation: ConversationHandle,
}

impl<S> Clone for RequestCoordinator<S> {
    fn clone(&self) -> Self {
        Self {
            service: Arc::clone(&self.service),
            conversation: self.conversation.clone(),
        }
    }
}

impl<S: AnswerService + 'static> RequestCoordinator<S> {
    pub fn new(service: Arc<S>, conversation: ConversationHandle) -> Self {
        Self {
            service,
            conversation,
        }
    }

    pub fn conversation(&self) -> &ConversationHandle {
        &self.conversation
    }

    /// Admission control. On success the trimmed query is already in the log
    /// and the conversation is pending.
    pub fn admit(&self, raw_input: &str) -> Result<PendingRequest, Rejection> {
        let query = raw_input.trim();
        if query.is_empty() {
            debug!("ignoring blank submission");
            return Err(Rejection::EmptyInput);
        }

        let mut conversation = self.conversation.lock();
        if conversation.is_pending() {
            debug!("ignoring submission while a request is pending");
            return Err(Rejection::AlreadyPending);
        }
        conversation
            .append_user_message(query)
            .map_err(|_| Rejection::EmptyInput)?;
        conversation.set_pending(true);

        Ok(PendingRequest {
            conversation: self.conversation.clone(),
            query: query.to_string(),
            released: false,
        })
    }

    /// Send the admitted query and resolve the ticket with the outcome
    pub async fn dispatch(&self, pending: PendingRequest) -> Resolution {
        let request = pending.request();
        info!(query = %request.query, top_k = request.top_k, "sending query to answer service");
        let result = self.service.ask(&request).await;
        pending.resolve(result)
    }

    pub async fn submit(&self, raw_input: &str) -> Result<Resolution, Rejection> {
        let pending = self.admit(raw_input)?;
        Ok(self.dispatch(pending).await)
    }

    /// Admit on the caller's thread, then run the request on a background task
    pub fn spawn_submit(&self, raw_input: &str) -> Result<JoinHandle<Resolution>, Rejection> {
        let pending = self.admit(raw_input)?;
        let coordinator = self.clone();
        Ok(tokio::spawn(async move { coordinator.dispatch(pending).await }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::{Conversation, GREETING};
    use crate::state::{ChatMessage, ChatRole, Source};
    use crate::testing::{MockAnswerService, PanickingAnswerService};
    use proptest::prelude::*;
    use tokio::sync::Notify;

    fn setup() -> (Arc<MockAnswerService>, RequestCoordinator<MockAnswerService>) {
        let service = Arc::new(MockAnswerService::new());
        let coordinator = RequestCoordinator::new(
            Arc::clone(&service),
            ConversationHandle::new(Conversation::new()),
        );
        (service, coordinator)
    }

    #[tokio::test]
    async fn test_submit_appends_question_and_answer() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse::new("Hold the power button for ten seconds.", vec![]));

        let outcome = coordinator.submit("How to reset the device?").await;
        assert_eq!(outcome, Ok(Resolution::Resolved));

        let messages = coordinator.conversation().snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[0].content(), GREETING);
        assert_eq!(messages[1], ChatMessage::user("How to reset the device?"));
        assert_eq!(messages[2].role(), ChatRole::Assistant);
        assert_eq!(messages[2].content(), "Hold the power button for ten seconds.");
        assert!(!coordinator.conversation().is_pending());
    }

    #[tokio::test]
    async fn test_empty_sources_are_kept_as_empty() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse::new("Reboot it.", vec![]));

        coordinator.submit("reset?").await.unwrap();

        let last = coordinator.conversation().read(|c| c.last().cloned()).unwrap();
        assert_eq!(last, ChatMessage::assistant("Reboot it.", Some(vec![])));
    }

    #[tokio::test]
    async fn test_missing_sources_become_empty() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse {
            answer: "Reboot it.".to_string(),
            sources: None,
            processing_time: Some(0.4),
        });

        coordinator.submit("reset?").await.unwrap();

        let last = coordinator.conversation().read(|c| c.last().cloned()).unwrap();
        assert_eq!(last.sources_field(), Some(&[][..]));
    }

    #[tokio::test]
    async fn test_sources_are_attached_to_answer() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse::new(
            "Check page 12.",
            vec![Source::new("manual.pdf", 12, "...")],
        ));

        coordinator.submit("where is the fan spec?").await.unwrap();

        let last = coordinator.conversation().read(|c| c.last().cloned()).unwrap();
        assert_eq!(last.content(), "Check page 12.");
        assert_eq!(last.sources(), &[Source::new("manual.pdf", 12, "...")]);
    }

    #[tokio::test]
    async fn test_failure_appends_fallback_without_sources() {
        let (service, coordinator) = setup();
        service.queue_error(ServiceError::transport("connection refused"));

        let outcome = coordinator.submit("How to reset the device?").await;
        assert_eq!(outcome, Ok(Resolution::Failed));

        let messages = coordinator.conversation().snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[2], ChatMessage::assistant(FALLBACK_MESSAGE, None));
        assert!(!messages[2].content().contains("connection refused"));
        assert!(!coordinator.conversation().is_pending());
    }

    #[tokio::test]
    async fn test_status_and_malformed_failures_release_pending() {
        let (service, coordinator) = setup();
        service.queue_error(ServiceError::status(reqwest::StatusCode::INTERNAL_SERVER_ERROR, ""));
        service.queue_error(ServiceError::malformed("expected value at line 1"));

        assert_eq!(coordinator.submit("first").await, Ok(Resolution::Failed));
        assert!(!coordinator.conversation().is_pending());
        assert_eq!(coordinator.submit("second").await, Ok(Resolution::Failed));
        assert!(!coordinator.conversation().is_pending());
        assert_eq!(coordinator.conversation().len(), 5);
    }

    #[tokio::test]
    async fn test_blank_input_is_rejected_without_side_effects() {
        let (service, coordinator) = setup();

        assert_eq!(coordinator.submit("").await, Err(Rejection::EmptyInput));
        assert_eq!(coordinator.submit("   ").await, Err(Rejection::EmptyInput));

        assert_eq!(coordinator.conversation().len(), 1);
        assert!(!coordinator.conversation().is_pending());
        assert!(service.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_query_is_trimmed_in_log_and_request() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse::new("Clean the vents.", vec![]));

        coordinator.submit("  fix overheating  ").await.unwrap();

        let requests = service.recorded_requests();
        assert_eq!(
            requests,
            vec![ChatRequest {
                query: "fix overheating".to_string(),
                top_k: TOP_K,
            }]
        );
        assert_eq!(coordinator.conversation().snapshot()[1].content(), "fix overheating");
    }

    #[tokio::test]
    async fn test_submission_while_pending_is_ignored() {
        let gate = Arc::new(Notify::new());
        let service = Arc::new(MockAnswerService::gated(Arc::clone(&gate)));
        service.queue_response(ChatResponse::new("first answer", vec![]));
        let coordinator =
            RequestCoordinator::new(Arc::clone(&service), ConversationHandle::default());

        let first = coordinator.spawn_submit("query").unwrap();
        assert!(coordinator.conversation().is_pending());

        let second = coordinator.submit("second query").await;
        assert_eq!(second, Err(Rejection::AlreadyPending));
        assert_eq!(coordinator.conversation().len(), 2);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), Resolution::Resolved);

        let messages = coordinator.conversation().snapshot();
        assert_eq!(messages.len(), 3);
        assert_eq!(messages[1].content(), "query");
        assert_eq!(messages[2].content(), "first answer");
        assert_eq!(service.recorded_requests().len(), 1);
        assert!(!coordinator.conversation().is_pending());
    }

    #[tokio::test]
    async fn test_next_submission_allowed_after_resolution() {
        let (service, coordinator) = setup();
        service.queue_response(ChatResponse::new("one", vec![]));
        service.queue_response(ChatResponse::new("two", vec![]));

        coordinator.submit("first").await.unwrap();
        coordinator.submit("second").await.unwrap();

        let contents: Vec<String> = coordinator
            .conversation()
            .snapshot()
            .iter()
            .map(|m| m.content().to_string())
            .collect();
        assert_eq!(contents, vec![GREETING, "first", "one", "second", "two"]);
    }

    #[tokio::test]
    async fn test_dropped_ticket_releases_pending() {
        let (service, coordinator) = setup();

        let pending = coordinator.admit("how do I calibrate?").unwrap();
        assert_eq!(pending.query(), "how do I calibrate?");
        assert!(coordinator.conversation().is_pending());
        drop(pending);

        assert!(!coordinator.conversation().is_pending());
        let last = coordinator.conversation().read(|c| c.last().cloned()).unwrap();
        assert_eq!(last, ChatMessage::assistant(FALLBACK_MESSAGE, None));
        assert!(service.recorded_requests().is_empty());
    }

    #[tokio::test]
    async fn test_panicking_service_still_releases_pending() {
        let coordinator = RequestCoordinator::new(
            Arc::new(PanickingAnswerService),
            ConversationHandle::default(),
        );

        let handle = coordinator.spawn_submit("overheating").unwrap();
        assert!(handle.await.is_err());

        assert!(!coordinator.conversation().is_pending());
        assert_eq!(coordinator.conversation().len(), 3);
        assert!(coordinator.admit("again").is_ok());
    }

    proptest! {
        /// Whatever surrounds it, the query is stored and sent trimmed
        #[test]
        fn prop_query_is_trimmed(
            lead in "[ \t]{0,4}",
            body in "[a-z][a-z ]{0,20}[a-z]",
            tail in "[ \t\n]{0,4}",
        ) {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (service, coordinator) = setup();
            service.queue_response(ChatResponse::new("ok", vec![]));

            let raw = format!("{lead}{body}{tail}");
            let outcome = runtime.block_on(coordinator.submit(&raw));
            prop_assert_eq!(outcome, Ok(Resolution::Resolved));

            let requests = service.recorded_requests();
            prop_assert_eq!(&requests[0].query, &body);
            let snapshot = coordinator.conversation().snapshot();
            prop_assert_eq!(snapshot[1].content(), body.as_str());
        }

        /// Blank input never changes the conversation or reaches the service
        #[test]
        fn prop_blank_input_rejected(raw in "[ \t\n\r]{0,12}") {
            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let (service, coordinator) = setup();

            let outcome = runtime.block_on(coordinator.submit(&raw));
            prop_assert_eq!(outcome, Err(Rejection::EmptyInput));
            prop_assert_eq!(coordinator.conversation().len(), 1);
            prop_assert!(service.recorded_requests().is_empty());
        }
    }
}
