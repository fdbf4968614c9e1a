//! Shared test utilities for integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use logan_core::{
    LlmError, Message, ModelGateway, ModelResponse, ScriptedGateway, ToolCall, ToolSchema,
};
use logan_eval::{EvalConfig, Example};
use logan_log_agent::{LogAgent, LogAgentConfig};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const REPORT_WITH_ROOT_CAUSE: &str = "Conclusion: One error was found in server.log.\n\
     Root Cause: The database refused the connection because it had too many clients.\n\
     Timestamp: 2024-01-15 10:23:45\n\
     Suggested Fix: Raise max_connections or add connection pooling.";

pub const REPORT_WITHOUT_ROOT_CAUSE: &str = "Conclusion: One error was found in server.log.\n\
     Timestamp: 2024-01-15 10:23:45\n\
     Suggested Fix: Raise max_connections.";

/// Wraps a gateway and sleeps before every call.
#[derive(Debug)]
pub struct DelayedGateway {
    inner: ScriptedGateway,
    delay: Duration,
}

impl DelayedGateway {
    pub fn new(inner: ScriptedGateway, delay: Duration) -> Self {
        Self { inner, delay }
    }

    pub fn call_count(&self) -> usize {
        self.inner.call_count()
    }
}

#[async_trait]
impl ModelGateway for DelayedGateway {
    fn provider(&self) -> &str {
        self.inner.provider()
    }

    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[ToolSchema],
        temperature: f32,
    ) -> Result<ModelResponse, LlmError> {
        tokio::time::sleep(self.delay).await;
        self.inner.complete(messages, tools, temperature).await
    }
}

/// Workspace for one harness test: logs, results, and a private lock file.
pub struct Fixture {
    pub logs: TempDir,
    pub scratch: TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let logs = TempDir::new().expect("create temp log dir");
        write_log(
            logs.path(),
            "server.log",
            "2024-01-15 10:23:40 INFO Server started on port 8080\n\
             2024-01-15 10:23:45 ERROR Database connection refused: too many clients\n\
             2024-01-15 10:23:46 WARN Retrying connection in 5s\n",
        );
        Self {
            logs,
            scratch: TempDir::new().expect("create scratch dir"),
        }
    }

    pub fn lock_path(&self) -> std::path::PathBuf {
        self.scratch.path().join("eval.lock")
    }

    pub fn results_dir(&self) -> std::path::PathBuf {
        self.scratch.path().join("results")
    }

    /// Harness config with no throttle and paths inside the fixture.
    pub fn eval_config(&self) -> EvalConfig {
        EvalConfig::new()
            .with_throttle(Duration::ZERO)
            .with_lock_path(self.lock_path())
            .with_results_dir(self.results_dir())
    }

    pub fn agent(&self, gateway: Arc<dyn ModelGateway>) -> LogAgent {
        LogAgent::for_log_dir(LogAgentConfig::default(), gateway, self.logs.path())
            .expect("valid agent config")
    }
}

pub fn write_log(dir: &Path, name: &str, body: &str) {
    std::fs::write(dir.join(name), body).expect("write log fixture");
}

pub fn read_server_log() -> ModelResponse {
    ModelResponse::tool_calls(vec![ToolCall::new(
        "call_1",
        "read_log_file",
        json!({"filename": "server.log", "tail_lines": 20}),
    )])
}

/// A gateway whose every run answers directly with `report`: one agent turn
/// plus the synthesis call.
pub fn answering(report: &str) -> ScriptedGateway {
    ScriptedGateway::repeating(ModelResponse::text(report))
}

/// The `server.log` example used by the end-to-end scenarios.
pub fn server_log_example() -> Example {
    Example::new("server-errors", "list errors in server.log")
        .with_expected_contains(["error"])
        .with_expected_structure(["root cause"])
        .with_min_score(0.7)
}

/// `n` simple examples with ids `ex-0..ex-{n-1}`.
pub fn examples(n: usize) -> Vec<Example> {
    (0..n)
        .map(|i| {
            Example::new(format!("ex-{}", i), format!("question {}", i))
                .with_expected_contains(["error"])
        })
        .collect()
}
