use std::future::Future;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

pub const CHAT_PATH: &str = "api/chat";

#[derive(Error, Debug)]
pub enum ChatError {
    #[error("Failed to get response")]
    Status(reqwest::StatusCode),

    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("invalid server URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Sends a prompt through the completion proxy and returns the generated text.
pub trait ChatBackend {
    fn call_chat(&self, input: &str) -> impl Future<Output = Result<String, ChatError>>;
}

#[derive(Debug, Serialize)]
struct ChatRequestBody<'a> {
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponseBody {
    content: String,
}

/// HTTP client for the `/api/chat` endpoint of a running proxy.
#[derive(Debug, Clone)]
pub struct ProxyClient {
    client: Client,
    endpoint: Url,
}

impl ProxyClient {
    pub fn new(server: &Url) -> Result<Self, ChatError> {
        let client = Client::builder().build()?;
        let endpoint = server.join(CHAT_PATH)?;
        Ok(Self { client, endpoint })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

impl ChatBackend for ProxyClient {
    async fn call_chat(&self, input: &str) -> Result<String, ChatError> {
        debug!("POST {} ({} chars)", self.endpoint, input.len());

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&ChatRequestBody { input })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            error!("Chat proxy responded with status {}", status);
            return Err(ChatError::Status(status));
        }

        let body = response.json::<ChatResponseBody>().await?;
        Ok(body.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    async fn spawn_proxy(app: Router) -> Url {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{}/", addr)).unwrap()
    }

    #[tokio::test]
    async fn posts_input_and_returns_content() {
        let app = Router::new().route(
            "/api/chat",
            post(|Json(body): Json<Value>| async move {
                let input = body["input"].as_str().unwrap_or_default().to_uppercase();
                Json(json!({ "content": input }))
            }),
        );
        let client = ProxyClient::new(&spawn_proxy(app).await).unwrap();

        let content = client.call_chat("summarize me").await.unwrap();
        assert_eq!(content, "SUMMARIZE ME");
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let app = Router::new().route(
            "/api/chat",
            post(|| async {
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "message": "Error processing your request" })),
                )
            }),
        );
        let client = ProxyClient::new(&spawn_proxy(app).await).unwrap();

        let err = client.call_chat("hello").await.unwrap_err();
        assert!(matches!(err, ChatError::Status(s) if s == reqwest::StatusCode::INTERNAL_SERVER_ERROR));
        assert_eq!(err.to_string(), "Failed to get response");
    }

    #[test]
    fn joins_chat_path_onto_server_url() {
        let server = Url::parse("http://127.0.0.1:3000").unwrap();
        let client = ProxyClient::new(&server).unwrap();
        assert_eq!(client.endpoint().as_str(), "http://127.0.0.1:3000/api/chat");
    }
}
