//! TOML configuration file for evaluation runs.
//!
//! Every field is optional; values present in the file override built-in
//! defaults, and command-line flags override the file.
//!
//! ```toml
//! [agent]
//! provider = "openai"
//! model = "gpt-4o-mini"
//! max_turns = 10
//!
//! [judge]
//! provider = "groq"
//! threshold = 0.7
//!
//! [eval]
//! project = "log-analyzer"
//! throttle_secs = 15
//! ```

use crate::evaluator::ScoringPolicy;
use logan_log_agent::{LogAgentConfig, LogPrompts};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors from loading a config file.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("Failed to read config {}: {error}", .path.display())]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config {}: {error}", .path.display())]
    Parse { path: PathBuf, error: String },
}

/// Root of the evaluation config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct EvalFileConfig {
    pub agent: AgentToml,
    pub judge: JudgeToml,
    pub eval: HarnessToml,
}

impl EvalFileConfig {
    /// Load and parse a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;
        Self::parse(&contents).map_err(|e| match e {
            ConfigError::Parse { error, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                error,
            },
            other => other,
        })
    }

    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        toml::from_str(contents).map_err(|e| ConfigError::Parse {
            path: PathBuf::new(),
            error: e.to_string(),
        })
    }
}

/// Agent model and loop settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct AgentToml {
    pub provider: Option<String>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_turns: Option<usize>,
    pub default_tail_lines: Option<usize>,
    pub log_dir: Option<PathBuf>,
    pub system_prompt: Option<String>,
    pub synthesis_prompt: Option<String>,
}

impl AgentToml {
    /// Apply file overrides to the default agent config.
    pub fn to_agent_config(&self) -> LogAgentConfig {
        let mut config = LogAgentConfig::default();

        if let Some(v) = self.temperature {
            config = config.with_temperature(v);
        }
        if let Some(v) = self.max_turns {
            config = config.with_max_turns(v);
        }
        if let Some(v) = self.default_tail_lines {
            config = config.with_default_tail_lines(v);
        }
        if self.system_prompt.is_some() || self.synthesis_prompt.is_some() {
            let mut prompts = LogPrompts::default();
            if let Some(system) = &self.system_prompt {
                prompts.system = system.clone();
            }
            if let Some(synthesis) = &self.synthesis_prompt {
                prompts.synthesis = synthesis.clone();
            }
            config = config.with_prompts(prompts);
        }
        config
    }
}

/// Judge model settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct JudgeToml {
    /// Set to false to skip the judge evaluator
    pub enabled: Option<bool>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub threshold: Option<f64>,
}

/// Harness settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[non_exhaustive]
pub struct HarnessToml {
    pub project: Option<String>,
    pub dataset: Option<PathBuf>,
    pub results_dir: Option<PathBuf>,
    pub lock_path: Option<PathBuf>,
    pub throttle_secs: Option<f64>,
    pub batch: Option<bool>,
    pub contains_weight: Option<f64>,
}

impl HarnessToml {
    pub fn scoring_policy(&self) -> ScoringPolicy {
        self.contains_weight
            .map(ScoringPolicy::new)
            .unwrap_or_default()
    }
}
