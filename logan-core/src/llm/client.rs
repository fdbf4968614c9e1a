use super::wire::{ChatRequest, ChatResponse, WireMessage, WireTool};
use super::ModelGateway;
use crate::config::{LlmConfig, Provider, ProviderConfig};
use crate::error::LlmError;
use crate::message::{Message, ModelResponse};
use crate::tool::ToolSchema;
use crate::utils::truncate;
use async_trait::async_trait;

/// Gateway for OpenAI-compatible chat completions endpoints
///
/// Handles authentication, per-request timeouts and retries with
/// exponential backoff on transient failures.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    provider: ProviderConfig,
    config: LlmConfig,
}

impl std::fmt::Debug for HttpGateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpGateway")
            .field("provider", &self.provider)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl HttpGateway {
    /// Create a new gateway.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::InvalidRequest` if the HTTP client cannot be built.
    pub fn new(provider: ProviderConfig, config: LlmConfig) -> Result<Self, LlmError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            provider,
            config,
        })
    }

    /// Resolve credentials from the environment and build a gateway.
    pub fn from_env(
        provider: Provider,
        model: Option<String>,
        config: LlmConfig,
    ) -> Result<Self, LlmError> {
        Self::new(ProviderConfig::from_env(provider, model)?, config)
    }

    pub fn provider_config(&self) -> &ProviderConfig {
        &self.provider
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    async fn complete_once(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        temperature: f32,
    ) -> Result<ModelResponse, LlmError> {
        // OpenAI's newer models reject `max_tokens`.
        let (max_tokens, max_completion_tokens) = match self.provider.provider {
            Provider::OpenAi | Provider::Azure => (None, Some(self.config.max_tokens)),
            _ => (Some(self.config.max_tokens), None),
        };

        let body = ChatRequest {
            model: &self.provider.model,
            messages: messages.iter().map(WireMessage::from).collect(),
            tools: tools.iter().map(WireTool::from).collect(),
            temperature,
            max_tokens,
            max_completion_tokens,
        };

        let mut request = self
            .http
            .post(self.provider.chat_completions_url())
            .json(&body);
        if let Some(key) = &self.provider.api_key {
            request = match self.provider.provider {
                Provider::Azure => request.header("api-key", key),
                _ => request.bearer_auth(key),
            };
        }

        let response = request.send().await.map_err(|e| self.map_transport(e))?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = truncate(&text, 500);
            return Err(if status.as_u16() == 429 {
                LlmError::RateLimit(body)
            } else {
                LlmError::Status {
                    status: status.as_u16(),
                    body,
                }
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| self.map_transport(e))?;
        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or(LlmError::NoContent)?;
        Ok(choice.message.into())
    }

    fn map_transport(&self, error: reqwest::Error) -> LlmError {
        if error.is_timeout() {
            LlmError::Timeout(self.config.timeout.as_millis() as u64)
        } else {
            error.into()
        }
    }
}

#[async_trait]
impl ModelGateway for HttpGateway {
    fn provider(&self) -> &str {
        self.provider.provider.as_str()
    }

    fn model(&self) -> &str {
        &self.provider.model
    }

    /// Run one turn with automatic retries on transient errors.
    ///
    /// Retries up to `config.max_retries` times with exponential backoff
    /// starting at `config.retry_base_delay_ms`.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        temperature: f32,
    ) -> Result<ModelResponse, LlmError> {
        let mut attempt = 0;
        loop {
            match self.complete_once(messages, tools, temperature).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() && attempt < self.config.max_retries => {
                    log::warn!(
                        "LLM request failed (attempt {}/{}): {}, retrying...",
                        attempt + 1,
                        self.config.max_retries + 1,
                        e
                    );
                    tokio::time::sleep(self.config.retry_delay(attempt)).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
