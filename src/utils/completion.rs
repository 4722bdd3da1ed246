use std::future::Future;

use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use url::Url;

pub const DEFAULT_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_MODEL: &str = "llama3-8b-8192";

#[derive(Error, Debug)]
pub enum CompletionError {
    #[error("HTTP request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error: {0}")]
    Api(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("completion API key not configured")]
    MissingCredential,

    #[error("invalid API base URL: {0}")]
    InvalidBaseUrl(#[from] url::ParseError),
}

/// Produces generated text for a single user prompt.
pub trait Completer {
    fn complete(&self, prompt: &str) -> impl Future<Output = Result<String, CompletionError>> + Send;
}

#[derive(Debug, Clone)]
pub struct CompletionConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model: String,
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: Vec<ChatMessage<'a>>,
    model: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ChoiceMessage>,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

/// Client for an OpenAI-compatible chat completions endpoint.
///
/// Constructed once at startup and shared by the request handlers. Every call
/// is a single non-streamed request; there is no retry and no cache.
#[derive(Debug, Clone)]
pub struct CompletionService {
    client: Client,
    api_key: Option<String>,
    endpoint: Url,
    model: String,
}

impl CompletionService {
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let client = Client::builder().build()?;
        let endpoint = chat_completions_url(&config.api_base)?;

        Ok(Self {
            client,
            api_key: config.api_key,
            endpoint,
            model: config.model,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Completer for CompletionService {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(CompletionError::MissingCredential)?;

        let request_body = ChatCompletionRequest {
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            model: &self.model,
        };

        debug!(
            "Sending completion request (model: {}, prompt: {} chars)",
            self.model,
            prompt.len()
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header(header::CONTENT_TYPE, "application/json")
            .header(header::ACCEPT, "application/json")
            .header(header::AUTHORIZATION, format!("Bearer {}", api_key))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CompletionError::Api(format!("HTTP Status: {} - {}", status, body)));
        }

        let response_text = response.text().await?;
        let parsed = serde_json::from_str::<ChatCompletionResponse>(&response_text)?;

        Ok(first_choice_content(parsed))
    }
}

fn first_choice_content(response: ChatCompletionResponse) -> String {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default()
}

fn chat_completions_url(api_base: &str) -> Result<Url, url::ParseError> {
    let mut base = api_base.trim_end_matches('/').to_string();
    base.push('/');
    Url::parse(&base)?.join("chat/completions")
}
