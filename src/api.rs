//! LLM API interaction with exponential backoff retry logic.
//!
//! Drafting calls out to third-party LLM APIs, which fail in transient ways
//! (rate limits, timeouts, overloaded backends). This module keeps that
//! plumbing in one place:
//!
//! - [`AskAsync`]: core trait defining async LLM interaction
//! - [`ChatClient`]: speaks the OpenAI-compatible and Anthropic wire formats
//! - [`RetryAsk`]: decorator that adds retry logic to any `AskAsync` implementation
//!
//! # Retry Strategy
//!
//! - Maximum 5 retry attempts
//! - Exponential backoff starting at 1 second
//! - Maximum delay capped at 30 seconds
//! - Random jitter (0-250ms) added to prevent thundering herd

use rand::{Rng, rng};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{error, info, instrument, warn};

/// Which API dialect a configured provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// api.openai.com and compatible endpoints.
    OpenAi,
    /// Anthropic's messages API.
    Claude,
    /// DeepSeek; OpenAI-compatible wire format, different house.
    DeepSeek,
}

impl Provider {
    pub fn parse(s: &str) -> Option<Provider> {
        match s.to_lowercase().as_str() {
            "openai" => Some(Provider::OpenAi),
            "claude" | "anthropic" => Some(Provider::Claude),
            "deepseek" => Some(Provider::DeepSeek),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Claude => "claude",
            Provider::DeepSeek => "deepseek",
        }
    }

    pub fn default_base(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Claude => "https://api.anthropic.com",
            Provider::DeepSeek => "https://api.deepseek.com/v1",
        }
    }

    /// Full completion endpoint for a base URL.
    pub fn endpoint(&self, base: &str) -> String {
        let base = base.trim_end_matches('/');
        match self {
            Provider::OpenAi | Provider::DeepSeek => format!("{base}/chat/completions"),
            Provider::Claude => format!("{base}/v1/messages"),
        }
    }
}

/// A completed LLM call: the text plus what it cost in tokens.
#[derive(Debug, Clone)]
pub struct ChatReply {
    pub content: String,
    pub tokens_used: u64,
}

/// Trait for async LLM interaction.
///
/// Implementors can send text to an LLM and receive a response. The
/// abstraction exists so decorators like [`RetryAsk`] compose over any
/// backend.
pub trait AskAsync {
    /// The type of response returned by the LLM.
    type Response;

    /// Send text to the LLM and receive a response.
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>>;
}

/// Wrapper that adds exponential backoff retry logic to any [`AskAsync`] implementation.
///
/// Designed to be resilient against rate limiting, network issues, and
/// temporary server errors.
///
/// # Backoff Strategy
///
/// The delay between retries follows this formula:
/// ```text
/// delay = min(base_delay * 2^(attempt-1), max_delay) + random_jitter(0..250ms)
/// ```
pub struct RetryAsk<T> {
    /// The underlying LLM client to wrap.
    inner: T,
    /// Maximum number of retry attempts before giving up.
    max_retries: usize,
    /// Initial delay between retries (doubles with each attempt).
    base_delay: StdDuration,
    /// Maximum delay cap to prevent excessive waiting.
    max_delay: StdDuration,
}

impl<T> RetryAsk<T>
where
    T: AskAsync,
{
    /// Create a new retry wrapper around an existing [`AskAsync`] implementation.
    pub fn new(inner: T, max_retries: usize, base_delay: StdDuration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
            max_delay: StdDuration::from_secs(30),
        }
    }
}

impl<T> fmt::Debug for RetryAsk<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RetryAsk")
            .field("max_retries", &self.max_retries)
            .field("base_delay", &self.base_delay)
            .field("max_delay", &self.max_delay)
            .finish()
    }
}

impl<T> AskAsync for RetryAsk<T>
where
    T: AskAsync + fmt::Debug,
{
    type Response = T::Response;

    #[instrument(level = "info", skip_all)]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let total_t0 = Instant::now();
        let mut attempt = 0usize;

        loop {
            let attempt_t0 = Instant::now();
            match self.inner.ask(text).await {
                Ok(resp) => {
                    return Ok(resp);
                }
                Err(e) => {
                    attempt += 1;
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt > self.max_retries {
                        error!(
                            attempt,
                            max = self.max_retries,
                            elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                            elapsed_ms_total = total_dt.as_millis() as u128,
                            error = %e,
                            "ask() exhausted retries"
                        );
                        return Err(e);
                    }

                    // backoff calc
                    let mut delay = self.base_delay.saturating_mul(1 << (attempt - 1));
                    if delay > self.max_delay {
                        delay = self.max_delay;
                    }
                    let jitter_ms: u64 = rng().random_range(0..=250);
                    let delay = delay + StdDuration::from_millis(jitter_ms);

                    warn!(
                        attempt,
                        max = self.max_retries,
                        elapsed_ms_attempt = attempt_dt.as_millis() as u128,
                        elapsed_ms_total = total_dt.as_millis() as u128,
                        ?delay,
                        error = %e,
                        "ask() attempt failed; backing off"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

/// The system prompt every drafting call opens with.
const SYSTEM_PROMPT: &str = "You are a professional journalist and content creator.";

const MAX_TOKENS: u32 = 4000;
const TEMPERATURE: f64 = 0.7;
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// A configured connection to one LLM provider.
#[derive(Debug)]
pub struct ChatClient {
    provider: Provider,
    api_key: String,
    api_base: String,
    model: String,
    http: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct WireMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiResponse {
    choices: Vec<OpenAiChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAiChoice {
    message: OpenAiMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAiMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    total_tokens: u64,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f64,
    system: &'a str,
    messages: Vec<WireMessage<'a>>,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    #[serde(default)]
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

impl ChatClient {
    /// Build a client for one provider. `api_base` falls back to the
    /// provider's public endpoint.
    pub fn new(
        provider: Provider,
        api_key: String,
        api_base: Option<String>,
        model: String,
    ) -> ChatClient {
        ChatClient {
            api_base: api_base.unwrap_or_else(|| provider.default_base().to_string()),
            provider,
            api_key,
            model,
            http: reqwest::Client::new(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn provider(&self) -> Provider {
        self.provider
    }

    async fn ask_openai(&self, text: &str) -> Result<ChatReply, Box<dyn Error>> {
        let request = OpenAiRequest {
            model: &self.model,
            messages: vec![
                WireMessage { role: "system", content: SYSTEM_PROMPT },
                WireMessage { role: "user", content: text },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        };

        let response = self
            .http
            .post(self.provider.endpoint(&self.api_base))
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!(
                "{} API error: {status} - {body}",
                self.provider.as_str()
            )
            .into());
        }

        let parsed: OpenAiResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or("response contained no choices")?;
        Ok(ChatReply {
            content,
            tokens_used: parsed.usage.map(|u| u.total_tokens).unwrap_or(0),
        })
    }

    async fn ask_anthropic(&self, text: &str) -> Result<ChatReply, Box<dyn Error>> {
        let request = AnthropicRequest {
            model: &self.model,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
            system: SYSTEM_PROMPT,
            messages: vec![WireMessage { role: "user", content: text }],
        };

        let response = self
            .http
            .post(self.provider.endpoint(&self.api_base))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(format!("claude API error: {status} - {body}").into());
        }

        let parsed: AnthropicResponse = response.json().await?;
        let content = parsed
            .content
            .into_iter()
            .next()
            .map(|c| c.text)
            .ok_or("response contained no content blocks")?;
        Ok(ChatReply {
            content,
            tokens_used: parsed
                .usage
                .map(|u| u.input_tokens + u.output_tokens)
                .unwrap_or(0),
        })
    }
}

impl AskAsync for ChatClient {
    type Response = ChatReply;

    #[instrument(level = "info", skip_all, fields(provider = self.provider.as_str(), model = %self.model))]
    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        let t0 = Instant::now();
        let res = match self.provider {
            Provider::OpenAi | Provider::DeepSeek => self.ask_openai(text).await,
            Provider::Claude => self.ask_anthropic(text).await,
        };
        let dt = t0.elapsed();

        match &res {
            Ok(reply) => info!(
                elapsed_ms = dt.as_millis() as u128,
                tokens = reply.tokens_used,
                "API call succeeded"
            ),
            Err(e) => warn!(elapsed_ms = dt.as_millis() as u128, error = %e, "API call failed"),
        }
        res
    }
}

/// High-level entry point: call the LLM with exponential backoff.
///
/// # Retry Behavior
///
/// - Up to 5 retry attempts
/// - Exponential backoff: 1s, 2s, 4s, 8s, 16s (capped at 30s)
/// - Random jitter added to prevent thundering herd
#[instrument(level = "info", skip_all)]
pub async fn ask_with_backoff(
    client: &ChatClient,
    prompt: &str,
) -> Result<ChatReply, Box<dyn Error>> {
    let t0 = Instant::now();
    let api = RetryAsk::new(client, 5, StdDuration::from_secs(1));
    let res = api.ask(prompt).await;
    let dt = t0.elapsed();

    match &res {
        Ok(_) => info!(
            elapsed_ms_total = dt.as_millis() as u128,
            "ask_with_backoff succeeded"
        ),
        Err(e) => {
            error!(elapsed_ms_total = dt.as_millis() as u128, error = %e, "ask_with_backoff failed")
        }
    }
    res
}

impl<T> AskAsync for &T
where
    T: AskAsync,
{
    type Response = T::Response;

    async fn ask(&self, text: &str) -> Result<Self::Response, Box<dyn Error>> {
        (*self).ask(text).await
    }
}
