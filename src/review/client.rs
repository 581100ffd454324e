use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::net::HttpClient;

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
/// Low temperature favors literal, reproducible findings over creative ones.
const TEMPERATURE: f32 = 0.1;
const DEFAULT_MAX_TOKENS: u32 = 2000;

/// Per-model response budget; unknown models get the default.
fn max_tokens_for(model: &str) -> u32 {
    match model {
        "claude-3-haiku-20240307" => 2000,
        "claude-3-5-haiku-latest" => 4096,
        "claude-3-5-sonnet-latest" => 8192,
        "claude-sonnet-4-5" => 8192,
        _ => DEFAULT_MAX_TOKENS,
    }
}

#[derive(Debug, Error)]
pub enum ReviewApiError {
    #[error("invalid model API key (401): check your configuration")]
    Auth,

    #[error("model API access forbidden (403): check your key permissions")]
    Forbidden,

    #[error("model API rate limit reached (429): wait a few minutes and try again")]
    RateLimit,

    #[error("model API quota exhausted: check your plan and billing")]
    QuotaExceeded,

    #[error("invalid model API request ({status}): {message}")]
    InvalidRequest { status: u16, message: String },

    #[error("model API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("model reply contained no content")]
    EmptyReply,

    #[error("network failure talking to the model API: {0}")]
    Network(#[from] crate::net::NetError),

    #[error("failed to decode model API response: {0}")]
    Decode(#[from] reqwest::Error),
}

/// Seam between the pipeline and the hosted model, so tests can substitute
/// a canned backend.
#[async_trait]
pub trait CompletionApi: Send + Sync {
    async fn request_review(&self, prompt: &str, model: &str)
        -> Result<String, ReviewApiError>;
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: String,
}

/// Client for the Anthropic messages endpoint. Transport retries come from
/// the wrapped [`HttpClient`]; a received response is never retried —
/// 401/403 are immediately fatal and 429 is surfaced with its own message
/// rather than hammered again.
pub struct ClaudeClient {
    http: HttpClient,
    api_key: String,
}

impl ClaudeClient {
    pub fn new(http: HttpClient, api_key: String) -> Self {
        Self { http, api_key }
    }

    fn map_error(status: u16, body: &str) -> ReviewApiError {
        match status {
            401 => ReviewApiError::Auth,
            403 => ReviewApiError::Forbidden,
            429 => {
                if body.contains("quota") || body.contains("credit") {
                    ReviewApiError::QuotaExceeded
                } else {
                    ReviewApiError::RateLimit
                }
            }
            402 => ReviewApiError::QuotaExceeded,
            400 => ReviewApiError::InvalidRequest {
                status,
                message: body.to_string(),
            },
            _ => ReviewApiError::Api {
                status,
                message: body.to_string(),
            },
        }
    }
}

#[async_trait]
impl CompletionApi for ClaudeClient {
    #[instrument(skip(self, prompt), fields(prompt_len = prompt.len()))]
    async fn request_review(
        &self,
        prompt: &str,
        model: &str,
    ) -> Result<String, ReviewApiError> {
        let request_body = MessagesRequest {
            model,
            max_tokens: max_tokens_for(model),
            temperature: TEMPERATURE,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let request = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("Content-Type", "application/json")
            .json(&request_body);

        let response = self.http.execute(request).await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            debug!(status = status.as_u16(), "model API returned error status");
            return Err(Self::map_error(status.as_u16(), &body));
        }

        let reply = response.json::<MessagesResponse>().await?;
        let text = reply
            .content
            .into_iter()
            .next()
            .map(|block| block.text)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ReviewApiError::EmptyReply);
        }
        debug!(reply_len = text.len(), "review text received");
        Ok(text)
    }
}
