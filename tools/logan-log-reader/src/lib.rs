//! Read-only tools over a directory of log files.
//!
//! Both tools share a [`LogRoot`], which confines every path argument to the
//! configured directory: absolute paths, `..` components and symlinks that
//! resolve outside the root are rejected before any file is opened.
//!
//! # Example
//!
//! ```no_run
//! use logan_log_reader::{log_tools, LogRoot};
//! use serde_json::json;
//!
//! # async fn example() {
//! let registry = log_tools(LogRoot::new("./logs"));
//! let text = registry
//!     .execute_to_string("read_log_file", json!({"filename": "server.log", "tail_lines": 20}))
//!     .await;
//! println!("{}", text);
//! # }
//! ```

use async_trait::async_trait;
use logan_core::tool::{Tool, ToolError, ToolRegistry, ToolResult};
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};

/// Lines returned by `read_log_file` when the model does not ask for a count.
pub const DEFAULT_TAIL_LINES: usize = 20;

/// Upper bound on `tail_lines`, regardless of what the model asks for.
pub const MAX_TAIL_LINES: usize = 1000;

/// Maximum file size to read (16MB).
const MAX_FILE_SIZE: u64 = 16 * 1024 * 1024;

/// Directory that log tools are confined to.
#[derive(Debug, Clone)]
pub struct LogRoot {
    dir: PathBuf,
}

impl LogRoot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Names of the `*.log` files directly inside the root, sorted.
    pub async fn list(&self) -> Result<Vec<String>, ToolError> {
        if !tokio::fs::metadata(&self.dir)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            return Err(ToolError::ExecutionFailed(format!(
                "{} is not a valid directory",
                self.dir.display()
            )));
        }

        let mut entries = tokio::fs::read_dir(&self.dir)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to list logs: {}", e)))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to list logs: {}", e)))?
        {
            let path = entry.path();
            let is_log = path.extension().is_some_and(|ext| ext == "log");
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_log && is_file {
                if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        Ok(names)
    }

    /// Resolve a model-supplied filename to a path inside the root.
    ///
    /// # Errors
    ///
    /// - `ToolError::InvalidInput` for empty names or non-files
    /// - `ToolError::AccessDenied` for absolute paths, `..`, or escapes
    /// - `ToolError::NotFound` if the file does not exist
    pub async fn resolve(&self, filename: &str) -> Result<PathBuf, ToolError> {
        let trimmed = filename.trim();
        if trimmed.is_empty() {
            return Err(ToolError::InvalidInput("filename must not be empty".into()));
        }

        let relative = Path::new(trimmed);
        if relative.is_absolute()
            || !relative
                .components()
                .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(ToolError::AccessDenied(format!(
                "'{}' is outside the log directory",
                trimmed
            )));
        }

        let candidate = self.dir.join(relative);
        let canonical = match tokio::fs::canonicalize(&candidate).await {
            Ok(path) => path,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(ToolError::NotFound(format!(
                    "File {} not found in {}",
                    trimmed,
                    self.dir.display()
                )));
            }
            Err(e) => {
                return Err(ToolError::ExecutionFailed(format!(
                    "Failed to resolve {}: {}",
                    trimmed, e
                )));
            }
        };

        let root = tokio::fs::canonicalize(&self.dir).await.map_err(|e| {
            ToolError::ExecutionFailed(format!(
                "Failed to resolve log directory {}: {}",
                self.dir.display(),
                e
            ))
        })?;
        if !canonical.starts_with(&root) {
            log::warn!("Rejected log path escaping the root: {}", trimmed);
            return Err(ToolError::AccessDenied(format!(
                "'{}' is outside the log directory",
                trimmed
            )));
        }

        if !canonical.is_file() {
            return Err(ToolError::InvalidInput(format!(
                "Path is not a file: {}",
                trimmed
            )));
        }

        Ok(canonical)
    }

    /// Last `lines` lines of a log file, newlines preserved.
    pub async fn tail(&self, filename: &str, lines: usize) -> Result<String, ToolError> {
        let path = self.resolve(filename).await?;

        let metadata = tokio::fs::metadata(&path).await.map_err(|e| {
            ToolError::ExecutionFailed(format!("Failed to get file metadata: {}", e))
        })?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(ToolError::InvalidInput(format!(
                "File too large ({} bytes, max {} bytes)",
                metadata.len(),
                MAX_FILE_SIZE
            )));
        }

        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed(format!("Failed to read log: {}", e)))?;
        Ok(last_lines(&String::from_utf8_lossy(&bytes), lines))
    }
}

fn last_lines(text: &str, n: usize) -> String {
    let lines: Vec<&str> = text.split_inclusive('\n').collect();
    lines[lines.len().saturating_sub(n)..].concat()
}

/// Build a registry holding both log tools over `root`.
pub fn log_tools(root: LogRoot) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(ListLogFiles::new(root.clone()))
        .register(ReadLogFile::new(root));
    registry
}

/// `list_log_files`: names of the available `.log` files.
#[derive(Debug, Clone)]
pub struct ListLogFiles {
    root: LogRoot,
}

impl ListLogFiles {
    pub fn new(root: LogRoot) -> Self {
        Self { root }
    }
}

#[async_trait]
impl Tool for ListLogFiles {
    fn name(&self) -> &str {
        "list_log_files"
    }

    fn description(&self) -> &str {
        "List all .log files in the configured log directory."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {}
        })
    }

    async fn execute(&self, _input: Value) -> Result<ToolResult, ToolError> {
        let names = self.root.list().await?;
        let content = if names.is_empty() {
            format!("No .log files found in {}", self.root.path().display())
        } else {
            names.join("\n")
        };
        Ok(ToolResult::with_metadata(
            content,
            json!({ "count": names.len() }),
        ))
    }
}

/// `read_log_file`: the tail of one log file.
#[derive(Debug, Clone)]
pub struct ReadLogFile {
    root: LogRoot,
    default_tail: usize,
}

impl ReadLogFile {
    pub fn new(root: LogRoot) -> Self {
        Self {
            root,
            default_tail: DEFAULT_TAIL_LINES,
        }
    }

    /// Lines returned when the call does not specify `tail_lines`.
    #[must_use]
    pub fn with_default_tail(mut self, lines: usize) -> Self {
        self.default_tail = lines.clamp(1, MAX_TAIL_LINES);
        self
    }
}

#[async_trait]
impl Tool for ReadLogFile {
    fn name(&self) -> &str {
        "read_log_file"
    }

    fn description(&self) -> &str {
        "Read the last N lines of a log file from the log directory. \
         Only the filename (e.g. 'server.log') is required."
    }

    fn parameters_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "filename": {
                    "type": "string",
                    "description": "Name of the log file inside the log directory"
                },
                "tail_lines": {
                    "type": "integer",
                    "description": format!(
                        "How many trailing lines to return (default {}, max {})",
                        self.default_tail, MAX_TAIL_LINES
                    )
                }
            },
            "required": ["filename"]
        })
    }

    async fn execute(&self, input: Value) -> Result<ToolResult, ToolError> {
        let filename = input
            .get("filename")
            .and_then(|v| v.as_str())
            .ok_or_else(|| ToolError::InvalidInput("Missing 'filename' field".into()))?;

        let lines = match input.get("tail_lines") {
            None | Some(Value::Null) => self.default_tail,
            Some(value) => {
                let n = value.as_u64().filter(|n| *n > 0).ok_or_else(|| {
                    ToolError::InvalidInput(format!(
                        "'tail_lines' must be a positive integer, got: {}",
                        value
                    ))
                })?;
                usize::try_from(n).unwrap_or(MAX_TAIL_LINES).min(MAX_TAIL_LINES)
            }
        };

        let content = self.root.tail(filename, lines).await?;
        Ok(ToolResult::with_metadata(
            content,
            json!({ "filename": filename, "tail_lines": lines }),
        ))
    }
}
