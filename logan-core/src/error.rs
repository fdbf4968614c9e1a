use thiserror::Error;

/// Errors that can occur during an agent run
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AgentError {
    /// Model gateway failure during the run
    #[error("LLM client error: {0}")]
    Llm(#[from] LlmError),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl AgentError {
    /// Check if this error came from the model gateway.
    ///
    /// # Example
    ///
    /// ```
    /// use logan_core::{AgentError, LlmError};
    ///
    /// let err = AgentError::Llm(LlmError::NoContent);
    /// assert!(err.is_gateway());
    /// assert!(!AgentError::InvalidConfig("max_turns".into()).is_gateway());
    /// ```
    pub fn is_gateway(&self) -> bool {
        matches!(self, AgentError::Llm(_))
    }
}

/// Errors surfaced by a model gateway.
///
/// This is the `GatewayError` of the agent contract: network, auth and
/// rate-limit failures all end up here once retries are exhausted.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum LlmError {
    /// Transport-level failure (connect, TLS, body read)
    #[error("Network error: {0}")]
    Network(String),

    /// Request timed out
    #[error("Request timed out after {0}ms")]
    Timeout(u64),

    /// Rate limit exceeded (HTTP 429)
    #[error("Rate limit exceeded: {0}")]
    RateLimit(String),

    /// Non-success HTTP status from the provider
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    /// Credentials missing for the configured provider
    #[error("Missing credentials: {0}")]
    MissingCredentials(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Response processing error
    #[error("Failed to process response: {0}")]
    ResponseProcessing(String),

    /// No content in response
    #[error("No content in response")]
    NoContent,

    /// Other gateway error
    #[error("{0}")]
    Other(String),
}

impl LlmError {
    /// Check if this error is retryable.
    ///
    /// Returns `true` for transient errors that might succeed on retry:
    /// - Timeouts
    /// - Rate limits
    /// - Network failures
    /// - 5xx responses
    pub fn is_retryable(&self) -> bool {
        match self {
            LlmError::Timeout(_) | LlmError::RateLimit(_) | LlmError::Network(_) => true,
            LlmError::Status { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            return LlmError::Timeout(0);
        }
        if error.is_decode() {
            return LlmError::ResponseProcessing(error.to_string());
        }
        LlmError::Network(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::invalid_config(AgentError::InvalidConfig("max_turns".into()), &["configuration", "max_turns"])]
    #[case::llm(AgentError::Llm(LlmError::Timeout(5000)), &["LLM", "5000"])]
    fn test_agent_error_display(#[case] error: AgentError, #[case] expected: &[&str]) {
        let display = error.to_string();
        for s in expected {
            assert!(display.contains(s), "Expected '{}' in '{}'", s, display);
        }
    }

    #[rstest]
    #[case::timeout(LlmError::Timeout(1000), true)]
    #[case::rate_limit(LlmError::RateLimit("quota".into()), true)]
    #[case::network(LlmError::Network("reset".into()), true)]
    #[case::server_error(LlmError::Status { status: 503, body: "busy".into() }, true)]
    #[case::client_error(LlmError::Status { status: 401, body: "bad key".into() }, false)]
    #[case::missing_credentials(LlmError::MissingCredentials("OPENAI_API_KEY".into()), false)]
    #[case::no_content(LlmError::NoContent, false)]
    fn test_is_retryable(#[case] error: LlmError, #[case] expected: bool) {
        assert_eq!(error.is_retryable(), expected);
    }

    #[test]
    fn test_error_conversion() {
        let agent_err: AgentError = LlmError::NoContent.into();
        assert!(agent_err.is_gateway());
    }
}
