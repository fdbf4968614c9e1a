//! Log agent state machine.

use crate::config::LogAgentConfig;
use crate::report::{Report, ReportSynthesizer};
use logan_core::{AgentError, Message, ModelGateway, ToolCall, ToolRegistry, ToolSchema};
use logan_log_reader::{ListLogFiles, LogRoot, ReadLogFile};
use std::sync::Arc;

/// States of one agent run.
///
/// `Agent` asks the model for the next turn, `Tools` executes the calls it
/// issued, `Summarize` produces the report, and `Done` carries it out.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentState {
    Agent,
    Tools(Vec<ToolCall>),
    Summarize,
    Done(Report),
}

impl AgentState {
    pub fn name(&self) -> &'static str {
        match self {
            AgentState::Agent => "agent",
            AgentState::Tools(_) => "tools",
            AgentState::Summarize => "summarize",
            AgentState::Done(_) => "done",
        }
    }
}

/// Mutable state owned by a single run.
#[derive(Debug, Clone, Default)]
pub struct AgentRunState {
    /// Append-only conversation history
    pub transcript: Vec<Message>,
    /// Model turns taken so far, not counting the report
    pub turns: usize,
    /// Set when the turn budget ran out before the model stopped calling tools
    pub truncated: bool,
}

impl AgentRunState {
    fn new(system: &str, query: &str) -> Self {
        Self {
            transcript: vec![Message::system(system), Message::user(query)],
            turns: 0,
            truncated: false,
        }
    }
}

/// Outcome of [`LogAgent::run`].
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub report: Report,
    pub transcript: Vec<Message>,
    pub turns: usize,
    pub truncated: bool,
}

impl AgentRun {
    /// Model calls made, including the report synthesis.
    pub fn model_calls(&self) -> usize {
        self.turns + 1
    }
}

/// Tool-calling log analysis agent
///
/// Alternates model turns with tool execution until the model answers
/// without tools or `max_turns` is reached, then synthesizes a [`Report`].
/// The run makes at most `max_turns + 1` model calls.
///
/// # Example
///
/// ```no_run
/// use logan_core::{HttpGateway, LlmConfig, Provider};
/// use logan_log_agent::{LogAgent, LogAgentConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Arc::new(HttpGateway::from_env(Provider::Groq, None, LlmConfig::default())?);
/// let agent = LogAgent::for_log_dir(LogAgentConfig::default(), gateway, "./logs")?;
/// let run = agent.run("Are there any errors in server.log?").await?;
/// println!("{}", run.report.conclusion);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct LogAgent {
    config: LogAgentConfig,
    gateway: Arc<dyn ModelGateway>,
    tools: ToolRegistry,
    schemas: Vec<ToolSchema>,
    synthesizer: ReportSynthesizer,
}

impl LogAgent {
    /// Create a new agent over an explicit tool registry.
    ///
    /// # Errors
    ///
    /// Returns `AgentError::InvalidConfig` if the config fails validation.
    pub fn new(
        config: LogAgentConfig,
        gateway: Arc<dyn ModelGateway>,
        tools: ToolRegistry,
    ) -> Result<Self, AgentError> {
        config.validate()?;
        let schemas = tools.schemas();
        let synthesizer = ReportSynthesizer::new(config.prompts.synthesis.clone());
        Ok(Self {
            config,
            gateway,
            tools,
            schemas,
            synthesizer,
        })
    }

    /// Create an agent with the log tools rooted at `log_dir`.
    pub fn for_log_dir(
        config: LogAgentConfig,
        gateway: Arc<dyn ModelGateway>,
        log_dir: impl Into<std::path::PathBuf>,
    ) -> Result<Self, AgentError> {
        let root = LogRoot::new(log_dir);
        let mut tools = ToolRegistry::new();
        tools
            .register(ListLogFiles::new(root.clone()))
            .register(ReadLogFile::new(root).with_default_tail(config.default_tail_lines));
        Self::new(config, gateway, tools)
    }

    pub fn config(&self) -> &LogAgentConfig {
        &self.config
    }

    pub fn gateway(&self) -> &Arc<dyn ModelGateway> {
        &self.gateway
    }

    /// Run the state machine for one query.
    ///
    /// # Errors
    ///
    /// Only gateway failures end a run early. Tool failures are fed back to
    /// the model as tool messages.
    pub async fn run(&self, query: &str) -> Result<AgentRun, AgentError> {
        let mut state = AgentRunState::new(&self.config.prompts.system, query);
        let mut current = AgentState::Agent;

        let report = loop {
            log::debug!("State '{}' at turn {}", current.name(), state.turns);
            current = match current {
                AgentState::Agent => self.agent_turn(&mut state).await?,
                AgentState::Tools(calls) => {
                    self.execute_tools(&mut state, calls).await;
                    AgentState::Agent
                }
                AgentState::Summarize => AgentState::Done(
                    self.synthesizer
                        .synthesize(
                            self.gateway.as_ref(),
                            &mut state.transcript,
                            self.config.temperature,
                        )
                        .await?,
                ),
                AgentState::Done(report) => break report,
            };
        };

        log::info!(
            "Agent run finished after {} turn(s){}",
            state.turns,
            if state.truncated { " (truncated)" } else { "" }
        );

        Ok(AgentRun {
            report,
            transcript: state.transcript,
            turns: state.turns,
            truncated: state.truncated,
        })
    }

    async fn agent_turn(&self, state: &mut AgentRunState) -> Result<AgentState, AgentError> {
        if state.turns >= self.config.max_turns {
            log::warn!(
                "Turn budget of {} reached, summarizing early",
                self.config.max_turns
            );
            state.truncated = true;
            return Ok(AgentState::Summarize);
        }

        let response = self
            .gateway
            .complete(&state.transcript, &self.schemas, self.config.temperature)
            .await?;
        state.turns += 1;

        let calls = response.tool_calls.clone();
        state.transcript.push(response.into_message());

        if calls.is_empty() {
            Ok(AgentState::Summarize)
        } else {
            Ok(AgentState::Tools(calls))
        }
    }

    async fn execute_tools(&self, state: &mut AgentRunState, calls: Vec<ToolCall>) {
        for call in calls {
            log::debug!("Calling tool '{}' ({})", call.name, call.id);
            let output = self.tools.execute_to_string(&call.name, call.arguments).await;
            state.transcript.push(Message::tool_result(call.id, output));
        }
    }
}
