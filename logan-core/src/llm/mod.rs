//! Model gateway abstraction and its HTTP implementation.
//!
//! The agent and the judge only see [`ModelGateway`]; [`HttpGateway`] talks
//! to any OpenAI-compatible chat completions endpoint, and
//! [`ScriptedGateway`](crate::ScriptedGateway) replays canned turns in tests.

mod client;
mod wire;

pub use client::HttpGateway;

use crate::error::LlmError;
use crate::message::{Message, ModelResponse};
use crate::tool::ToolSchema;
use async_trait::async_trait;
use std::fmt;

/// A chat model reachable by the agent or the judge.
#[async_trait]
pub trait ModelGateway: Send + Sync + fmt::Debug {
    /// Provider label used in experiment names and judge comments.
    fn provider(&self) -> &str;

    /// Model identifier used in experiment names and judge comments.
    fn model(&self) -> &str;

    /// Run one model turn over the transcript.
    ///
    /// `tools` may be empty, in which case the model can only answer in text.
    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        temperature: f32,
    ) -> Result<ModelResponse, LlmError>;
}
