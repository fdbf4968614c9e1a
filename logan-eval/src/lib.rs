//! # Logan Eval
//!
//! Evaluation harness for the log-analysis agent.
//!
//! ## Overview
//!
//! - **Datasets**: examples with a query, expected keywords and expected
//!   report sections, loaded from JSON in creation order
//! - **Evaluators**: `contains_check`, `structure_check`, `min_score_check`
//!   and an optional `llm_judge`
//! - **Harness**: sequential, throttled runs under a system-wide lock
//! - **Results**: one JSON record per experiment, plus an aggregate summary
//!
//! ## Architecture
//!
//! ```text
//! logan-core (messages, gateways, tools)
//!     ↓
//! logan-log-agent (state machine, report)
//!     ↓
//! logan-eval (datasets, evaluators, harness)  ← this crate
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use logan_core::{HttpGateway, LlmConfig, Provider};
//! use logan_eval::{EvalConfig, EvalHarness, Evaluators, JsonFileDataset, LlmJudge};
//! use logan_log_agent::{LogAgent, LogAgentConfig};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let agent_gateway = Arc::new(HttpGateway::from_env(Provider::OpenAi, None, LlmConfig::default())?);
//! let judge_gateway = Arc::new(HttpGateway::from_env(Provider::Groq, None, LlmConfig::default())?);
//!
//! let agent = LogAgent::for_log_dir(LogAgentConfig::default(), agent_gateway, "./logs")?;
//! let evaluators = Evaluators::default().with_judge(LlmJudge::new(judge_gateway));
//!
//! let harness = EvalHarness::new(EvalConfig::default().with_results_dir("results"));
//! let outcome = harness
//!     .run(&agent, &JsonFileDataset::new("data/evaluation_dataset.json"), &evaluators)
//!     .await?;
//!
//! outcome.summary.print_summary();
//! # Ok(())
//! # }
//! ```
//!
//! ## Custom Evaluators
//!
//! Implement the [`Evaluator`] trait and add it to an [`Evaluators`] set:
//!
//! ```
//! use async_trait::async_trait;
//! use logan_eval::{Evaluator, EvaluatorScore, Example};
//! use logan_log_agent::Report;
//!
//! struct HasTimestamp;
//!
//! #[async_trait]
//! impl Evaluator for HasTimestamp {
//!     fn name(&self) -> &str {
//!         "has_timestamp"
//!     }
//!
//!     async fn evaluate(&self, report: &Report, _example: &Example) -> EvaluatorScore {
//!         let found = !report.timestamp.is_empty();
//!         EvaluatorScore::new(if found { 1.0 } else { 0.0 }, found, "")
//!     }
//! }
//! ```

pub mod config;
pub mod dataset;
pub mod evaluator;
pub mod harness;
pub mod lock;
pub mod results;
pub mod throttle;

// Re-export public API
pub use config::{ConfigError, EvalFileConfig};
pub use dataset::{
    Dataset, DatasetError, Difficulty, Example, InMemoryDataset, JsonFileDataset,
    DEFAULT_MIN_SCORE,
};
pub use evaluator::{
    ContainsCheck, Evaluator, EvaluatorScore, Evaluators, JudgeError, LlmJudge, MinScoreCheck,
    ScoringPolicy, StructureCheck,
};
pub use harness::{EvalConfig, EvalError, EvalHarness, EvalOutcome, EvalProgress, ExperimentMode};
pub use lock::{ExperimentLock, LockError};
pub use results::{
    EvaluationResult, Experiment, ExperimentIdentity, ExperimentStatus, ExperimentSummary,
    GroupStats,
};
pub use throttle::Throttle;
