//! Configuration for the log agent.

use logan_core::AgentError;
use logan_log_reader::{DEFAULT_TAIL_LINES, MAX_TAIL_LINES};

/// Prompts used by the log agent
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct LogPrompts {
    /// System instruction for the tool-calling loop
    pub system: String,

    /// Instruction appended to the transcript for the final report
    pub synthesis: String,
}

impl LogPrompts {
    /// Validate that prompts are non-empty
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.system.trim().is_empty() {
            errors.push("system cannot be empty".to_string());
        }
        if self.synthesis.trim().is_empty() {
            errors.push("synthesis cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}

impl Default for LogPrompts {
    fn default() -> Self {
        Self {
            system: r#"You are a log analysis assistant with read-only access to a directory of log files.

Tools:
- list_log_files: list the available .log files
- read_log_file: read the last lines of one file (argument: filename, optional tail_lines)

Read the logs that are relevant to the user's question before answering. Only report what the logs actually contain; if they do not contain what was asked for, say so plainly."#
                .to_string(),

            synthesis: r#"Write the final report for the investigation above. Use exactly these four sections, each on its own line followed by its content:

Conclusion: <what the logs show, in one or two sentences>
Root Cause: <the underlying cause, or "none found">
Timestamp: <when the relevant event happened, as written in the log>
Suggested Fix: <a concrete next step>"#
                .to_string(),
        }
    }
}

/// Configuration for the log agent
#[derive(Debug, Clone)]
pub struct LogAgentConfig {
    /// Maximum number of model turns before the run is cut short and
    /// summarized as truncated
    ///
    /// Default: 10
    pub max_turns: usize,

    /// Sampling temperature for agent turns and the report
    ///
    /// Default: 0.0
    pub temperature: f32,

    /// Lines `read_log_file` returns when the model does not ask for a count
    ///
    /// Default: 20
    pub default_tail_lines: usize,

    /// Prompts configuration
    pub prompts: LogPrompts,
}

impl LogAgentConfig {
    #[must_use]
    pub fn with_max_turns(mut self, max_turns: usize) -> Self {
        self.max_turns = max_turns;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_default_tail_lines(mut self, lines: usize) -> Self {
        self.default_tail_lines = lines;
        self
    }

    #[must_use]
    pub fn with_prompts(mut self, prompts: LogPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), AgentError> {
        let mut errors = Vec::new();

        if self.max_turns == 0 {
            errors.push("max_turns must be greater than 0".to_string());
        }

        if !(0.0..=2.0).contains(&self.temperature) {
            errors.push(format!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.temperature
            ));
        }

        if self.default_tail_lines == 0 || self.default_tail_lines > MAX_TAIL_LINES {
            errors.push(format!(
                "default_tail_lines must be between 1 and {}",
                MAX_TAIL_LINES
            ));
        }

        if let Err(AgentError::InvalidConfig(prompt_errors)) = self.prompts.validate() {
            errors.push(prompt_errors);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AgentError::InvalidConfig(errors.join("; ")))
        }
    }
}

impl Default for LogAgentConfig {
    fn default() -> Self {
        Self {
            max_turns: 10,
            temperature: 0.0,
            default_tail_lines: DEFAULT_TAIL_LINES,
            prompts: LogPrompts::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = LogAgentConfig::default();
        assert_eq!(config.max_turns, 10);
        assert_eq!(config.default_tail_lines, 20);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_collects_all_errors() {
        let mut prompts = LogPrompts::default();
        prompts.synthesis = "  ".into();
        let config = LogAgentConfig::default()
            .with_max_turns(0)
            .with_temperature(3.5)
            .with_prompts(prompts);

        let err = config.validate().unwrap_err().to_string();
        assert!(err.contains("max_turns"));
        assert!(err.contains("temperature"));
        assert!(err.contains("synthesis cannot be empty"));
    }

    #[test]
    fn test_validate_tail_lines_bounds() {
        assert!(LogAgentConfig::default()
            .with_default_tail_lines(0)
            .validate()
            .is_err());
        assert!(LogAgentConfig::default()
            .with_default_tail_lines(MAX_TAIL_LINES + 1)
            .validate()
            .is_err());
    }

    #[test]
    fn test_synthesis_prompt_names_all_sections() {
        let prompt = LogPrompts::default().synthesis;
        for section in ["Conclusion:", "Root Cause:", "Timestamp:", "Suggested Fix:"] {
            assert!(prompt.contains(section), "missing {}", section);
        }
    }
}
