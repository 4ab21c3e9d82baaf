use reqwest::Client;
use serde::{Deserialize, Serialize};
use anyhow::{Result, anyhow};
use tracing::{debug, warn};

#[derive(Serialize)]
struct ChatRequest {
    session_id: String,
    message: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    response: String,
}

/// Error body the backend sends on non-success statuses.
#[derive(Deserialize)]
struct ErrorBody {
    detail: Option<String>,
}

#[derive(Debug, Clone)]
pub struct ChatClient {
    client: Client,
    base_url: String,
}

impl ChatClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.to_string(),
        }
    }

    /// Send one chat turn and return the agent's reply.
    ///
    /// A non-success status becomes an error carrying the server's `detail`
    /// message when the body has one, or a generic description otherwise.
    pub async fn send(&self, session_id: &str, message: &str) -> Result<String> {
        let url = format!("{}/chat", self.base_url);

        let request = ChatRequest {
            session_id: session_id.to_string(),
            message: message.to_string(),
        };

        debug!(%url, "sending chat turn");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            warn!(%status, "chat request failed");
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.detail);
            return Err(match detail {
                Some(detail) => anyhow!(detail),
                None => anyhow!("Request failed with status: {}", status),
            });
        }

        let chat_response: ChatResponse = response.json().await?;
        Ok(chat_response.response)
    }

    /// Probe the backend health endpoint. Unreachable counts as unhealthy.
    pub async fn health(&self) -> bool {
        let url = format!("{}/health", self.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server;

    #[tokio::test]
    async fn send_returns_the_response_field_on_success() {
        let server =
            test_server::spawn("200 OK", r#"{"session_id":"s1","response":"Hello there"}"#).await;
        let client = ChatClient::new(&server.base_url);

        let reply = client.send("s1", "hi").await.unwrap();
        assert_eq!(reply, "Hello there");
    }

    #[tokio::test]
    async fn send_posts_session_and_message() {
        let mut server =
            test_server::spawn("200 OK", r#"{"session_id":"s1","response":"ok"}"#).await;
        let client = ChatClient::new(&server.base_url);

        client.send("abc-123", "what is RAG?").await.unwrap();

        let body = server.recorded.recv().await.unwrap();
        let body: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(body["session_id"], "abc-123");
        assert_eq!(body["message"], "what is RAG?");
    }

    #[tokio::test]
    async fn send_surfaces_the_server_detail_on_failure() {
        let server =
            test_server::spawn("422 Unprocessable Entity", r#"{"detail":"bad"}"#).await;
        let client = ChatClient::new(&server.base_url);

        let err = client.send("s1", "hi").await.unwrap_err();
        assert_eq!(err.to_string(), "bad");
    }

    #[tokio::test]
    async fn send_falls_back_to_a_generic_reason_without_detail() {
        let server = test_server::spawn("500 Internal Server Error", "oops").await;
        let client = ChatClient::new(&server.base_url);

        let err = client.send("s1", "hi").await.unwrap_err();
        assert!(err.to_string().contains("Request failed with status"));
        assert!(err.to_string().contains("500"));
    }

    #[tokio::test]
    async fn send_errors_on_a_malformed_success_body() {
        let server = test_server::spawn("200 OK", "not json").await;
        let client = ChatClient::new(&server.base_url);

        assert!(client.send("s1", "hi").await.is_err());
    }

    #[tokio::test]
    async fn send_errors_when_the_backend_is_unreachable() {
        let client = ChatClient::new(&test_server::dead_endpoint().await);

        assert!(client.send("s1", "hi").await.is_err());
    }

    #[tokio::test]
    async fn health_is_true_when_the_backend_responds() {
        let server = test_server::spawn("200 OK", r#"{"ok":true}"#).await;
        let client = ChatClient::new(&server.base_url);

        assert!(client.health().await);
    }

    #[tokio::test]
    async fn health_is_false_on_an_error_status() {
        let server = test_server::spawn("503 Service Unavailable", "").await;
        let client = ChatClient::new(&server.base_url);

        assert!(!client.health().await);
    }

    #[tokio::test]
    async fn health_is_false_when_the_backend_is_unreachable() {
        let client = ChatClient::new(&test_server::dead_endpoint().await);

        assert!(!client.health().await);
    }
}
