use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::debug;

use crate::config::Config;
use crate::error::ServiceError;
use crate::service::{AnswerService, ChatRequest, ChatResponse, HealthStatus};

/// HTTP client for the Support Brain answer service
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
    timeout: Option<Duration>,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.endpoint).with_timeout(config.timeout())
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn query(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        let url = format!("{}/api/chat", self.base_url);

        let mut builder = self.client.post(&url).json(request);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(ServiceError::status(status, &text));
        }

        let body = response.bytes().await?;
        let chat_response: ChatResponse = serde_json::from_slice(&body)?;
        if let Some(secs) = chat_response.processing_time {
            debug!(processing_time = secs, "answer service processing time");
        }
        Ok(chat_response)
    }

    pub async fn health(&self) -> Result<HealthStatus, ServiceError> {
        let url = format!("{}/health", self.base_url);

        let mut builder = self.client.get(&url);
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ServiceError::status(status, ""));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }
}

#[async_trait]
impl AnswerService for ChatClient {
    async fn ask(&self, request: &ChatRequest) -> Result<ChatResponse, ServiceError> {
        self.query(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_url_trailing_slash() {
        let client = ChatClient::new("http://localhost:8000/");
        assert_eq!(client.base_url(), "http://localhost:8000");
    }

    #[test]
    fn test_from_config() {
        let config = Config {
            endpoint: "http://brain:8000".to_string(),
            timeout_secs: Some(20),
        };
        let client = ChatClient::from_config(&config);
        assert_eq!(client.base_url(), "http://brain:8000");
        assert_eq!(client.timeout, Some(Duration::from_secs(20)));
    }
}
