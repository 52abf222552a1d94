//! Mock answer service for tests

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use crate::error::ServiceError;
use crate::service::{AnswerService, ChatRequest, ChatResponse};

/// Returns queued responses in order and records every request
pub struct MockAnswerService {
    responses: Mutex<VecDeque<Result<ChatResponse, ServiceError>>>,
    requests: Mutex<Vec<ChatRequest>>,
    /// When set, each call waits for a permit before answering
    gate: Option<Arc<Notify>>,
}

impl MockAnswerService {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            gate: None,
        }
    }

    /// Hold every answer until `Notify::notify_one` is called on the gate
    pub fn gated(gate: Arc<Notify>) -> Self {
        Self {
            gate: Some(gate),
            ..Self::new()
        }
    }

    pub fn queue_response(&self, response: ChatResponse) {
        self.responses.lock().unwrap().push_back(Ok(response));
    }

    pub fn queue_error(&self, error: ServiceError) {
        self.responses.lock().unwrap().push_back(Err(error));
    }

    pub fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl AnswerService for MockAnswerService {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.requests.lock().unwrap().push(request.clone());
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ServiceError::transport("No mock response queued")))
    }
}

/// Service whose calls panic, standing in for a crashed request task
pub struct PanickingAnswerService;

#[async_trait]
impl AnswerService for PanickingAnswerService {
    async fn ask(&self, _request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        panic!("answer service crashed");
    }
}
