//! Log Analysis Agent
//!
//! A tool-calling agent that reads log files and answers with a fixed
//! four-section [`Report`]: conclusion, root cause, timestamp and suggested
//! fix.
//!
//! The control flow is an explicit state machine ([`AgentState`]) bounded by
//! `max_turns`; when the budget runs out the run is summarized anyway and
//! flagged as truncated.
//!
//! # Example
//!
//! ```no_run
//! use logan_core::{ModelResponse, ScriptedGateway};
//! use logan_log_agent::{LogAgent, LogAgentConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let gateway = Arc::new(ScriptedGateway::new(vec![
//!     ModelResponse::text("Nothing unusual."),
//!     ModelResponse::text("Conclusion: Nothing unusual.\nRoot Cause: none found"),
//! ]));
//! let agent = LogAgent::for_log_dir(LogAgentConfig::default(), gateway, "./logs")?;
//! let run = agent.run("Anything wrong in server.log?").await?;
//! assert_eq!(run.report.root_cause, "none found");
//! # Ok(())
//! # }
//! ```

mod agent;
mod config;
mod report;

pub use agent::{AgentRun, AgentRunState, AgentState, LogAgent};
pub use config::{LogAgentConfig, LogPrompts};
pub use report::{Report, ReportParseError, ReportSection, ReportSynthesizer};

// Re-export core types for convenience
pub use logan_core::{AgentError, ModelGateway};
