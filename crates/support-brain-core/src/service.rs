//! Answer service contract
//!
//! The wire types of the chat endpoint and the trait the coordinator calls.
//! `ChatClient` is the HTTP implementation; tests plug in mocks.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ServiceError;
use crate::state::Source;

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
    pub top_k: u32,
}

/// Successful answer. `sources` may be missing or null on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    pub answer: String,
    #[serde(default)]
    pub sources: Option<Vec<Source>>,
    /// Server-side latency in seconds, when reported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processing_time: Option<f64>,
}

impl ChatResponse {
    pub fn new(answer: impl Into<String>, sources: Vec<Source>) -> Self {
        Self {
            answer: answer.into(),
            sources: Some(sources),
            processing_time: None,
        }
    }

    /// Answer text and its citations, with a missing list read as empty
    pub fn into_parts(self) -> (String, Vec<Source>) {
        (self.answer, self.sources.unwrap_or_default())
    }
}

/// Body of `GET /health`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HealthStatus {
    pub status: String,
    #[serde(default)]
    pub service: String,
}

impl HealthStatus {
    pub fn is_ok(&self) -> bool {
        self.status.eq_ignore_ascii_case("ok")
    }
}

/// Remote answer generation
#[async_trait]
pub trait AnswerService: Send + Sync {
    /// One request, one complete answer
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError>;
}

#[async_trait]
impl<T: AnswerService + ?Sized> AnswerService for Arc<T> {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        (**self).ask(request).await
    }
}
