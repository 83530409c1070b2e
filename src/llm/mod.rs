
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, warn};
use url::Url;

use crate::config::Config;

const DEFAULT_TIMEOUT_SECONDS: u64 = 60;
pub(crate) const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const EXPONENTIAL_BACKOFF_BASE: u64 = 2;

/// A language model that turns a single user-role prompt into a completion.
///
/// One implementation exists per backend provider; callers depend only on
/// this trait.
pub trait TextCompletion {
    fn complete(&self, prompt: &str) -> Result<String>;
}

/// Chat client for a local Ollama instance
#[derive(Debug, Clone)]
pub struct OllamaChatClient {
    base_url: Url,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

/// Chat client for any OpenAI-compatible endpoint
#[derive(Debug, Clone)]
pub struct OpenAiCompatClient {
    base_url: Url,
    api_key: String,
    model: String,
    agent: ureq::Agent,
    retry_attempts: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_ctx: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    content: String,
}

#[derive(Debug, Serialize)]
struct OpenAiChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChatResponse {
    choices: Vec<OpenAiChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponseMessage {
    content: String,
}

fn default_agent() -> ureq::Agent {
    ureq::Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)))
        .build()
        .into()
}

impl OllamaChatClient {
    #[inline]
    pub fn new(config: &Config) -> Result<Self> {
        let base_url = config
            .ollama_url()
            .context("Failed to generate Ollama URL from config")?;

        Ok(Self {
            base_url,
            model: config.ollama.chat_model.clone(),
            agent: default_agent(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        })
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl TextCompletion for OllamaChatClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("/api/chat")
            .context("Failed to build chat URL")?;

        let request = OllamaChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            stream: false,
            options: OllamaOptions { num_ctx: 4096 },
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!("Sending chat request to {} (model {})", url, self.model);

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Chat request failed")?;

        let response: OllamaChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        Ok(response.message.content.trim().to_string())
    }
}

impl OpenAiCompatClient {
    #[inline]
    pub fn new(base_url: Url, api_key: String, model: String) -> Self {
        Self {
            base_url,
            api_key,
            model,
            agent: default_agent(),
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
        }
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.retry_attempts = attempts;
        self
    }
}

impl TextCompletion for OpenAiCompatClient {
    #[inline]
    fn complete(&self, prompt: &str) -> Result<String> {
        let url = self
            .base_url
            .join("chat/completions")
            .context("Failed to build chat completions URL")?;

        let request = OpenAiChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
        };
        let request_json =
            serde_json::to_string(&request).context("Failed to serialize chat request")?;

        debug!("Sending chat request to {} (model {})", url, self.model);

        let response_text = request_with_retry(self.retry_attempts, || {
            self.agent
                .post(url.as_str())
                .header("Content-Type", "application/json")
                .header("Authorization", &format!("Bearer {}", self.api_key))
                .send(&request_json)
                .and_then(|mut resp| resp.body_mut().read_to_string())
        })
        .context("Chat request failed")?;

        let response: OpenAiChatResponse =
            serde_json::from_str(&response_text).context("Failed to parse chat response")?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .context("Chat response contained no choices")?;

        Ok(choice.message.content.trim().to_string())
    }
}

/// Run an HTTP request with bounded retries and exponential backoff.
///
/// Server errors (5xx) and transport errors are retried; client errors
/// (4xx) are returned immediately.
pub(crate) fn request_with_retry<F>(retry_attempts: u32, mut request_fn: F) -> Result<String>
where
    F: FnMut() -> std::result::Result<String, ureq::Error>,
{
    let mut last_error = None;

    for attempt in 1..=retry_attempts {
        debug!("HTTP request attempt {}/{}", attempt, retry_attempts);

        match request_fn() {
            Ok(response_text) => {
                return Ok(response_text);
            }
            Err(error) => {
                let should_retry = match &error {
                    ureq::Error::StatusCode(status) => {
                        if *status >= 500 {
                            warn!(
                                "Server error (status {}), attempt {}/{}",
                                status, attempt, retry_attempts
                            );
                            true
                        } else {
                            return Err(anyhow::anyhow!("Client error: HTTP {}", status));
                        }
                    }
                    ureq::Error::ConnectionFailed
                    | ureq::Error::HostNotFound
                    | ureq::Error::Timeout(_)
                    | ureq::Error::Io(_) => {
                        warn!(
                            "Transport error: {}, attempt {}/{}",
                            error, attempt, retry_attempts
                        );
                        true
                    }
                    _ => false,
                };

                if !should_retry {
                    return Err(anyhow::anyhow!("Non-retryable error: {}", error));
                }

                last_error = Some(anyhow::anyhow!("Request error: {}", error));

                if attempt < retry_attempts {
                    let delay_ms = EXPONENTIAL_BACKOFF_BASE.pow(attempt - 1) * 1000;
                    let delay = Duration::from_millis(delay_ms);
                    debug!("Waiting {:?} before retry", delay);
                    std::thread::sleep(delay);
                }
            }
        }
    }

    error!("All {} retry attempts failed", retry_attempts);

    Err(last_error.unwrap_or_else(|| anyhow::anyhow!("Request failed after retries")))
}
