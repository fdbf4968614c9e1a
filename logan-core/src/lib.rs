//! # Logan Core
//!
//! Shared building blocks for the log-analysis agent and its evaluation
//! harness.
//!
//! ## Architecture
//!
//! - **Gateway seam**: agents talk to models only through [`ModelGateway`],
//!   so tests swap in [`ScriptedGateway`] and production uses [`HttpGateway`]
//! - **Tools as values**: [`tool::Tool`] implementations live in their own
//!   crates and are collected in a [`tool::ToolRegistry`]
//! - **Transcript first**: every turn is a [`Message`]; tool calls and their
//!   results stay paired in order
//!
//! ## Example
//!
//! ```no_run
//! use logan_core::{HttpGateway, LlmConfig, Message, ModelGateway, Provider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = HttpGateway::from_env(Provider::Groq, None, LlmConfig::default())?;
//! let reply = gateway
//!     .complete(&[Message::user("Summarize: disk full on /var")], &[], 0.0)
//!     .await?;
//! println!("{}", reply.content);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod llm;
pub mod message;
pub mod mock_llm;
pub mod tool;
pub mod utils;

// Re-export public API
pub use config::{LlmConfig, Provider, ProviderConfig};
pub use error::{AgentError, LlmError};
pub use llm::{HttpGateway, ModelGateway};
pub use message::{Message, ModelResponse, Role, ToolCall};
pub use mock_llm::{RecordedCall, ScriptStep, ScriptedGateway};
pub use tool::{Tool, ToolError, ToolRegistry, ToolResult, ToolSchema};
pub use utils::{normalize_label, truncate};
