use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use crate::config::{BackendConfig, ProviderConfig, ProviderKind};
use crate::error::PlanError;

const TEMPERATURE: f64 = 0.7;
const MAX_TOKENS: u32 = 2000;

/// Submit a prompt, get the model's raw text back.
#[async_trait]
pub trait LlmProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, PlanError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    message: String,
}

impl<'a> ChatRequest<'a> {
    fn new(model: &'a str, prompt: &'a str, system_instruction: &'a str) -> Self {
        ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_instruction,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
            response_format: None,
        }
    }
}

/// One chat-completions backend: where to send, who we are, how long to wait.
struct ChatEndpoint {
    client: Client,
    config: BackendConfig,
    key_env: &'static str,
}

impl ChatEndpoint {
    fn api_key(&self) -> Result<&str, PlanError> {
        self.config
            .api_key
            .as_deref()
            .ok_or_else(|| {
                PlanError::Config(format!("{} environment variable is not set", self.key_env))
            })
    }

    /// Posts the request and returns the decoded envelope of a 2xx response.
    /// The whole exchange, body included, runs under the backend deadline.
    async fn send(
        &self,
        provider: &'static str,
        api_key: &str,
        request: &ChatRequest<'_>,
    ) -> Result<ChatResponse, PlanError> {
        let url = format!("{}/chat/completions", self.config.base_url);

        let exchange = async {
            let response = self
                .client
                .post(&url)
                .header("Content-Type", "application/json")
                .bearer_auth(api_key)
                .json(request)
                .send()
                .await
                .map_err(|e| PlanError::transport(provider, e))?;

            let status = response.status();
            let body = response
                .text()
                .await
                .map_err(|e| PlanError::transport(provider, e))?;

            if !status.is_success() {
                return Err(PlanError::provider(provider, Some(status.as_u16()), &body));
            }

            serde_json::from_str::<ChatResponse>(&body).map_err(|e| {
                PlanError::provider(
                    provider,
                    Some(status.as_u16()),
                    format!("unreadable response envelope: {}", e),
                )
            })
        };

        match tokio::time::timeout(self.config.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(PlanError::timeout(
                provider,
                format!("no response within {}s", self.config.timeout.as_secs_f64()),
            )),
        }
    }
}

fn first_choice(provider: &'static str, response: ChatResponse) -> Result<String, PlanError> {
    response
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message.content.unwrap_or_default())
        .ok_or_else(|| PlanError::provider(provider, None, "no choices returned"))
}

pub struct OpenAiProvider {
    endpoint: ChatEndpoint,
}

impl OpenAiProvider {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        Self {
            endpoint: ChatEndpoint {
                client,
                config,
                key_env: ProviderKind::OpenAi.key_env(),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, PlanError> {
        let api_key = self.endpoint.api_key()?;
        let request = ChatRequest::new(&self.endpoint.config.model, prompt, system_instruction);
        let response = self.endpoint.send(self.name(), api_key, &request).await?;
        first_choice(self.name(), response)
    }
}

/// Same wire shape as OpenAI, plus JSON-object mode, and errors may come
/// back in-band on a 200.
pub struct DeepSeekProvider {
    endpoint: ChatEndpoint,
}

impl DeepSeekProvider {
    pub fn new(client: Client, config: BackendConfig) -> Self {
        Self {
            endpoint: ChatEndpoint {
                client,
                config,
                key_env: ProviderKind::DeepSeek.key_env(),
            },
        }
    }
}

#[async_trait]
impl LlmProvider for DeepSeekProvider {
    fn name(&self) -> &'static str {
        "deepseek"
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, PlanError> {
        let api_key = self.endpoint.api_key()?;
        let mut request = ChatRequest::new(&self.endpoint.config.model, prompt, system_instruction);
        request.response_format = Some(ResponseFormat {
            format_type: "json_object",
        });

        let mut response = self.endpoint.send(self.name(), api_key, &request).await?;
        if let Some(error) = response.error.take() {
            return Err(PlanError::provider(
                self.name(),
                None,
                format!("API error: {}", error.message),
            ));
        }
        first_choice(self.name(), response)
    }
}

/// Bounded exponential backoff around any backend. Only transient failures
/// (timeouts, transport errors, 429, 5xx) are retried.
pub struct RetryingProvider {
    inner: Arc<dyn LlmProvider>,
    max_retries: u32,
    base_delay: Duration,
}

impl RetryingProvider {
    pub fn new(inner: Arc<dyn LlmProvider>, max_retries: u32, base_delay: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_delay,
        }
    }
}

#[async_trait]
impl LlmProvider for RetryingProvider {
    fn name(&self) -> &'static str {
        self.inner.name()
    }

    async fn generate(&self, prompt: &str, system_instruction: &str) -> Result<String, PlanError> {
        let mut attempt = 0;
        loop {
            match self.inner.generate(prompt, system_instruction).await {
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = self.base_delay.saturating_mul(2u32.saturating_pow(attempt));
                    attempt += 1;
                    warn!(
                        "{} generation failed: {}. Retrying {}/{} in {:?}",
                        self.inner.name(),
                        e,
                        attempt,
                        self.max_retries,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                result => return result,
            }
        }
    }
}

/// Builds the one backend named by the configuration. There is no fallback
/// between backends.
pub fn build_provider(config: &ProviderConfig) -> Result<Arc<dyn LlmProvider>, PlanError> {
    let client = Client::builder()
        .build()
        .map_err(|e| PlanError::Config(format!("failed to build HTTP client: {}", e)))?;

    let active = config.active();
    if active.api_key.is_none() {
        warn!(
            "{} is not set; workout plan generation will fail until it is configured",
            config.selected.key_env()
        );
    }

    let provider: Arc<dyn LlmProvider> = match config.selected {
        ProviderKind::OpenAi => Arc::new(OpenAiProvider::new(client, active.clone())),
        ProviderKind::DeepSeek => Arc::new(DeepSeekProvider::new(client, active.clone())),
    };
    info!(
        "Using {} ({}) with a {}s timeout",
        provider.name(),
        active.model,
        active.timeout.as_secs()
    );

    if config.max_retries > 0 {
        return Ok(Arc::new(RetryingProvider::new(
            provider,
            config.max_retries,
            config.retry_base_delay,
        )));
    }
    Ok(provider)
}
