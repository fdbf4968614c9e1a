//! Shared test utilities for integration tests

#![allow(dead_code)]

use logan_core::{ModelResponse, ToolCall};
use serde_json::json;
use std::path::Path;
use tempfile::TempDir;

/// A log directory holding a small `server.log` with one error.
pub fn log_dir() -> TempDir {
    let dir = TempDir::new().expect("create temp log dir");
    write_log(
        dir.path(),
        "server.log",
        "2024-01-15 10:23:40 INFO Server started on port 8080\n\
         2024-01-15 10:23:45 ERROR Database connection refused: too many clients\n\
         2024-01-15 10:23:46 WARN Retrying connection in 5s\n",
    );
    dir
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

pub const REPORT_WITH_ROOT_CAUSE: &str = "Conclusion: One error was found in server.log.\n\
     Root Cause: The database refused the connection because it had too many clients.\n\
     Timestamp: 2024-01-15 10:23:45\n\
     Suggested Fix: Raise max_connections or add connection pooling.";

pub const REPORT_WITHOUT_ROOT_CAUSE: &str = "Conclusion: One error was found in server.log.\n\
     Timestamp: 2024-01-15 10:23:45\n\
     Suggested Fix: Raise max_connections.";
