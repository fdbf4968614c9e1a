//! Scripted model gateway for offline tests
//!
//! [`ScriptedGateway`] replays a fixed sequence of turns and records every
//! call it receives, so agent and harness behaviour can be checked without
//! network access.
//!
//! # Example
//!
//! ```
//! use logan_core::{Message, ModelGateway, ModelResponse, ScriptedGateway};
//!
//! # async fn example() -> Result<(), logan_core::LlmError> {
//! let gateway = ScriptedGateway::new(vec![ModelResponse::text("CONCLUSION: all good")]);
//! let reply = gateway.complete(&[Message::user("hi")], &[], 0.0).await?;
//! assert_eq!(reply.content, "CONCLUSION: all good");
//! assert_eq!(gateway.call_count(), 1);
//! # Ok(())
//! # }
//! ```

use crate::error::LlmError;
use crate::llm::ModelGateway;
use crate::message::{Message, ModelResponse};
use crate::tool::ToolSchema;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard};

/// One scripted turn.
#[derive(Debug, Clone)]
pub enum ScriptStep {
    /// Return this response.
    Respond(ModelResponse),
    /// Fail with a non-retryable gateway error carrying this message.
    Fail(String),
}

impl From<ModelResponse> for ScriptStep {
    fn from(response: ModelResponse) -> Self {
        ScriptStep::Respond(response)
    }
}

/// What the gateway saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub messages: Vec<Message>,
    pub tool_names: Vec<String>,
    pub temperature: f32,
}

/// Gateway that replays scripted turns in order
///
/// Once the script is exhausted, the fallback step (if any) repeats forever;
/// without one, further calls fail with `LlmError::NoContent`.
#[derive(Debug)]
pub struct ScriptedGateway {
    provider: String,
    model: String,
    steps: Vec<ScriptStep>,
    fallback: Option<ScriptStep>,
    current_index: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedGateway {
    /// Create a gateway that returns these responses in order.
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self::from_steps(responses.into_iter().map(ScriptStep::from).collect())
    }

    pub fn from_steps(steps: Vec<ScriptStep>) -> Self {
        Self {
            provider: "mock".to_string(),
            model: "scripted".to_string(),
            steps,
            fallback: None,
            current_index: AtomicUsize::new(0),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Create a gateway that answers every call with the same step.
    pub fn repeating(step: impl Into<ScriptStep>) -> Self {
        Self::from_steps(Vec::new()).with_fallback(step)
    }

    /// Repeat `step` once the script runs out.
    #[must_use]
    pub fn with_fallback(mut self, step: impl Into<ScriptStep>) -> Self {
        self.fallback = Some(step.into());
        self
    }

    /// Override the provider/model labels reported by the gateway.
    #[must_use]
    pub fn with_identity(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.provider = provider.into();
        self.model = model.into();
        self
    }

    /// Number of `complete` calls made so far.
    pub fn call_count(&self) -> usize {
        self.current_index.load(Ordering::SeqCst)
    }

    /// Snapshot of every recorded call.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock_calls().clone()
    }

    /// Check if all scripted steps have been consumed.
    pub fn is_exhausted(&self) -> bool {
        self.call_count() >= self.steps.len()
    }

    fn lock_calls(&self) -> MutexGuard<'_, Vec<RecordedCall>> {
        match self.calls.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Scripted gateway call log poisoned - recovering");
                poisoned.into_inner()
            }
        }
    }

    fn next_step(&self) -> Option<ScriptStep> {
        let index = self.current_index.fetch_add(1, Ordering::SeqCst);
        self.steps
            .get(index)
            .cloned()
            .or_else(|| self.fallback.clone())
    }
}

#[async_trait]
impl ModelGateway for ScriptedGateway {
    fn provider(&self) -> &str {
        &self.provider
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        temperature: f32,
    ) -> Result<ModelResponse, LlmError> {
        self.lock_calls().push(RecordedCall {
            messages: messages.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            temperature,
        });

        match self.next_step() {
            Some(ScriptStep::Respond(response)) => Ok(response),
            Some(ScriptStep::Fail(message)) => Err(LlmError::Other(message)),
            None => Err(LlmError::NoContent),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::ToolCall;
    use serde_json::json;

    #[tokio::test]
    async fn test_replays_in_order_then_exhausts() {
        let gateway = ScriptedGateway::new(vec![
            ModelResponse::text("first"),
            ModelResponse::text("second"),
        ]);
        let msgs = [Message::user("q")];

        assert_eq!(gateway.complete(&msgs, &[], 0.0).await.unwrap().content, "first");
        assert_eq!(gateway.complete(&msgs, &[], 0.0).await.unwrap().content, "second");
        assert!(gateway.is_exhausted());
        assert!(matches!(
            gateway.complete(&msgs, &[], 0.0).await,
            Err(LlmError::NoContent)
        ));
        assert_eq!(gateway.call_count(), 3);
    }

    #[tokio::test]
    async fn test_repeating_never_runs_out() {
        let call = ToolCall::new("c1", "list_log_files", json!({}));
        let gateway = ScriptedGateway::repeating(ModelResponse::tool_calls(vec![call]));
        for _ in 0..5 {
            let response = gateway.complete(&[], &[], 0.3).await.unwrap();
            assert!(response.has_tool_calls());
        }
        assert_eq!(gateway.call_count(), 5);
    }

    #[tokio::test]
    async fn test_records_calls() {
        let gateway = ScriptedGateway::new(vec![ModelResponse::text("ok")])
            .with_identity("groq", "llama-3.3-70b-versatile");
        let schema = ToolSchema {
            name: "read_log_file".into(),
            description: "d".into(),
            parameters: json!({}),
        };
        gateway
            .complete(&[Message::user("q")], &[schema], 0.25)
            .await
            .unwrap();

        let calls = gateway.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].tool_names, vec!["read_log_file"]);
        assert_eq!(calls[0].temperature, 0.25);
        assert_eq!(gateway.provider(), "groq");
    }

    #[tokio::test]
    async fn test_fail_step() {
        let gateway = ScriptedGateway::from_steps(vec![ScriptStep::Fail("boom".into())]);
        let err = gateway.complete(&[], &[], 0.0).await.unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }
}
