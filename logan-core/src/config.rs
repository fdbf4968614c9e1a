use crate::error::LlmError;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Configuration for a model gateway's request behaviour
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LlmConfig {
    /// Maximum tokens per request
    ///
    /// Default: 2048
    pub max_tokens: u32,

    /// Timeout for individual requests
    ///
    /// Default: 60 seconds
    pub timeout: Duration,

    /// Maximum number of retries on transient failures
    ///
    /// Default: 2
    pub max_retries: u32,

    /// Base delay for exponential backoff (milliseconds)
    ///
    /// Default: 1000ms (1 second)
    pub retry_base_delay_ms: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            timeout: Duration::from_secs(60),
            max_retries: 2,
            retry_base_delay_ms: 1000,
        }
    }
}

impl LlmConfig {
    /// Set the maximum tokens per request.
    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    /// Set the timeout for individual requests.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries on transient failures.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Set the base delay for exponential backoff (milliseconds).
    #[must_use]
    pub fn with_retry_base_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_base_delay_ms = delay_ms;
        self
    }

    /// Get the retry delay for a given attempt number (0-indexed)
    ///
    /// Uses exponential backoff: delay = base_delay * 2^attempt, capped at 60 seconds.
    pub fn retry_delay(&self, attempt: u32) -> Duration {
        const MAX_DELAY_MS: u64 = 60_000;

        let delay_ms = self
            .retry_base_delay_ms
            .saturating_mul(2u64.saturating_pow(attempt))
            .min(MAX_DELAY_MS);

        Duration::from_millis(delay_ms)
    }
}

/// Model providers reachable through an OpenAI-compatible chat endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum Provider {
    OpenAi,
    Anthropic,
    Azure,
    Ollama,
    Google,
    Grok,
    Groq,
}

impl Provider {
    /// All supported providers, in display order.
    pub const ALL: [Provider; 7] = [
        Provider::OpenAi,
        Provider::Anthropic,
        Provider::Azure,
        Provider::Ollama,
        Provider::Google,
        Provider::Grok,
        Provider::Groq,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Provider::OpenAi => "openai",
            Provider::Anthropic => "anthropic",
            Provider::Azure => "azure",
            Provider::Ollama => "ollama",
            Provider::Google => "google",
            Provider::Grok => "grok",
            Provider::Groq => "groq",
        }
    }

    /// Model used when none is configured explicitly.
    pub fn default_model(&self) -> &'static str {
        match self {
            Provider::OpenAi => "gpt-5-mini",
            Provider::Anthropic => "claude-3-5-haiku-20241022",
            Provider::Azure => "gpt-4o",
            Provider::Ollama => "llama3",
            Provider::Google => "gemini-2.5-flash",
            Provider::Grok => "grok-3",
            Provider::Groq => "openai/gpt-oss-120b",
        }
    }

    /// Base URL of the provider's OpenAI-compatible API.
    ///
    /// Azure has no fixed base URL; it comes from `AZURE_OPENAI_ENDPOINT`.
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Provider::OpenAi => "https://api.openai.com/v1",
            Provider::Anthropic => "https://api.anthropic.com/v1",
            Provider::Azure => "",
            Provider::Ollama => "http://localhost:11434/v1",
            Provider::Google => "https://generativelanguage.googleapis.com/v1beta/openai",
            Provider::Grok => "https://api.x.ai/v1",
            Provider::Groq => "https://api.groq.com/openai/v1",
        }
    }

    /// Environment variable holding the API key, if the provider needs one.
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            Provider::OpenAi => Some("OPENAI_API_KEY"),
            Provider::Anthropic => Some("ANTHROPIC_API_KEY"),
            Provider::Azure => Some("AZURE_OPENAI_API_KEY"),
            Provider::Ollama => None,
            Provider::Google => Some("GOOGLE_API_KEY"),
            Provider::Grok => Some("XAI_API_KEY"),
            Provider::Groq => Some("GROQ_API_KEY"),
        }
    }

    /// Environment variable that overrides the base URL.
    pub fn base_url_env(&self) -> Option<&'static str> {
        match self {
            Provider::Azure => Some("AZURE_OPENAI_ENDPOINT"),
            Provider::Ollama => Some("OLLAMA_BASE_URL"),
            Provider::Grok => Some("XAI_BASE_URL"),
            _ => None,
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Provider {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_lowercase();
        Provider::ALL
            .into_iter()
            .find(|p| p.as_str() == lowered)
            .ok_or_else(|| {
                let supported: Vec<&str> = Provider::ALL.iter().map(|p| p.as_str()).collect();
                LlmError::InvalidRequest(format!(
                    "Unsupported provider '{}'. Choose one of: {}",
                    s,
                    supported.join(", ")
                ))
            })
    }
}

/// Which provider and model a gateway talks to, and how to authenticate.
///
/// Agent and judge gateways each get their own instance.
#[derive(Clone)]
#[non_exhaustive]
pub struct ProviderConfig {
    pub provider: Provider,
    pub model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    /// Azure `api-version` query parameter
    pub api_version: Option<String>,
}

impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .field("api_version", &self.api_version)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a config with the provider's default model and base URL.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            model: provider.default_model().to_string(),
            base_url: provider.default_base_url().to_string(),
            api_key: None,
            api_version: None,
        }
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    #[must_use]
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Resolve credentials and endpoint overrides from the environment.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::MissingCredentials` if the provider requires an API
    /// key (or Azure endpoint) that is not set.
    pub fn from_env(provider: Provider, model: Option<String>) -> Result<Self, LlmError> {
        let mut config = Self::new(provider);
        if let Some(model) = model.filter(|m| !m.trim().is_empty()) {
            config.model = model;
        }

        if let Some(key_var) = provider.api_key_env() {
            let key = std::env::var(key_var)
                .ok()
                .filter(|k| !k.is_empty())
                .ok_or_else(|| {
                    LlmError::MissingCredentials(format!(
                        "Required environment variable '{}' is not set",
                        key_var
                    ))
                })?;
            config.api_key = Some(key);
        }

        if let Some(url_var) = provider.base_url_env() {
            if let Ok(url) = std::env::var(url_var) {
                if !url.is_empty() {
                    config.base_url = url;
                }
            }
        }

        if provider == Provider::Azure {
            if config.base_url.is_empty() {
                return Err(LlmError::MissingCredentials(
                    "Required environment variable 'AZURE_OPENAI_ENDPOINT' is not set".into(),
                ));
            }
            config.api_version = Some(
                std::env::var("AZURE_OPENAI_API_VERSION")
                    .unwrap_or_else(|_| "2024-02-01".to_string()),
            );
        }

        Ok(config)
    }

    /// Full URL of the chat completions endpoint.
    pub fn chat_completions_url(&self) -> String {
        let base = self.base_url.trim_end_matches('/');
        match self.provider {
            Provider::Azure => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base,
                self.model,
                self.api_version.as_deref().unwrap_or("2024-02-01")
            ),
            _ => format!("{}/chat/completions", base),
        }
    }
}
