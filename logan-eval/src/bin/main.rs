//! Evaluation CLI for the log-analysis agent.
//!
//! Runs the agent over a JSON dataset and writes one experiment record per
//! example (or one per batch) into the results directory.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use logan_core::{HttpGateway, LlmConfig, ModelGateway, Provider};
use logan_eval::{
    EvalConfig, EvalFileConfig, EvalHarness, EvalOutcome, EvalProgress, Evaluators,
    ExperimentMode, JsonFileDataset, LlmJudge, ScoringPolicy,
};
use logan_log_agent::{LogAgent, LogAgentConfig};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

const DEFAULT_PROVIDER: Provider = Provider::OpenAi;
const DEFAULT_JUDGE_PROVIDER: Provider = Provider::Groq;
const DEFAULT_JUDGE_MODEL: &str = "llama-3.3-70b-versatile";
const DEFAULT_DATASET: &str = "data/evaluation_dataset.json";
const DEFAULT_LOG_DIR: &str = "./logs";
const DEFAULT_RESULTS_DIR: &str = "results";

/// Evaluation CLI for the log-analysis agent.
#[derive(Parser, Debug)]
#[command(name = "logan-eval")]
#[command(about = "Evaluate the log-analysis agent against a dataset")]
#[command(version)]
struct Args {
    /// TOML config file; command-line flags take precedence over it
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Agent provider: openai, anthropic, azure, ollama, google, grok, groq
    #[arg(long, env = "LLM_PROVIDER")]
    provider: Option<String>,

    /// Agent model (default: the provider's default model)
    #[arg(long, env = "MODEL_NAME")]
    model: Option<String>,

    /// Judge provider
    #[arg(long, env = "JUDGE_PROVIDER")]
    judge_provider: Option<String>,

    /// Judge model
    #[arg(long, env = "JUDGE_MODEL")]
    judge_model: Option<String>,

    /// Skip the llm_judge evaluator
    #[arg(long)]
    no_judge: bool,

    /// Run only the example at this index (default: all)
    #[arg(long, short = 'e')]
    example: Option<usize>,

    /// Record all examples in a single experiment
    #[arg(long, conflicts_with = "example")]
    batch: bool,

    /// Agent temperature (0.0-2.0)
    #[arg(long)]
    temperature: Option<f32>,

    /// Minimum seconds between the starts of consecutive examples
    #[arg(long, env = "EVAL_THROTTLE_SECONDS")]
    throttle: Option<f64>,

    /// Project name used as the experiment name prefix
    #[arg(long, env = "LANGSMITH_PROJECT")]
    project: Option<String>,

    /// Path to the dataset JSON file
    #[arg(long, short = 'd')]
    dataset: Option<PathBuf>,

    /// Directory containing the .log files the agent may read
    #[arg(long, env = "LOG_DIRECTORY")]
    log_dir: Option<PathBuf>,

    /// Directory for experiment records
    #[arg(long)]
    results_dir: Option<PathBuf>,

    /// Lock file guarding against concurrent experiments
    #[arg(long)]
    lock_path: Option<PathBuf>,

    /// Maximum agent turns per example
    #[arg(long)]
    max_turns: Option<usize>,

    /// Weight of contains_check in min_score_check (0.0-1.0)
    #[arg(long)]
    contains_weight: Option<f64>,

    /// Judge score needed to pass (0.0-1.0)
    #[arg(long)]
    judge_threshold: Option<f64>,

    /// LLM request timeout in seconds
    #[arg(long, default_value = "60")]
    llm_timeout: u64,

    /// Also write the summary as JSON to this file
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Fully resolved run settings: flags, then config file, then defaults.
#[derive(Debug)]
struct Settings {
    provider: Provider,
    model: Option<String>,
    judge: Option<JudgeSettings>,
    agent: LogAgentConfig,
    policy: ScoringPolicy,
    dataset: PathBuf,
    log_dir: PathBuf,
    eval: EvalConfig,
}

#[derive(Debug)]
struct JudgeSettings {
    provider: Provider,
    model: String,
    threshold: Option<f64>,
}

impl Args {
    /// Validate CLI arguments.
    fn validate(&self) -> Result<(), String> {
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(format!("temperature ({}) must be between 0.0 and 2.0", t));
            }
        }

        if let Some(t) = self.throttle {
            if !t.is_finite() || t < 0.0 {
                return Err(format!("throttle ({}) must be a non-negative number", t));
            }
        }

        if self.max_turns == Some(0) {
            return Err("max_turns must be greater than 0".to_string());
        }

        for (name, value) in [
            ("contains_weight", self.contains_weight),
            ("judge_threshold", self.judge_threshold),
        ] {
            if let Some(v) = value {
                if !(0.0..=1.0).contains(&v) {
                    return Err(format!("{} ({}) must be between 0.0 and 1.0", name, v));
                }
            }
        }

        if self.llm_timeout == 0 {
            return Err("llm_timeout must be greater than 0".to_string());
        }

        Ok(())
    }

    /// Load the config file named by `--config`, if any.
    fn file_config(&self) -> Result<EvalFileConfig, String> {
        match &self.config {
            Some(path) => {
                let config = EvalFileConfig::load(path).map_err(|e| e.to_string())?;
                log::info!("Loaded config from {}", path.display());
                Ok(config)
            }
            None => Ok(EvalFileConfig::default()),
        }
    }

    /// Build LlmConfig from CLI arguments.
    fn llm_config(&self) -> LlmConfig {
        LlmConfig::default()
            .with_timeout(Duration::from_secs(self.llm_timeout))
            .with_max_retries(2)
            .with_retry_base_delay_ms(1000)
    }

    /// Merge flags over the config file.
    fn resolve(&self, file: &EvalFileConfig) -> Result<Settings, String> {
        let provider = parse_provider(
            self.provider.as_deref().or(file.agent.provider.as_deref()),
            DEFAULT_PROVIDER,
        )?;
        let model = self.model.clone().or_else(|| file.agent.model.clone());

        let judge_enabled = !self.no_judge && file.judge.enabled.unwrap_or(true);
        let judge = if judge_enabled {
            let judge_provider = parse_provider(
                self.judge_provider
                    .as_deref()
                    .or(file.judge.provider.as_deref()),
                DEFAULT_JUDGE_PROVIDER,
            )?;
            let judge_model = self
                .judge_model
                .clone()
                .or_else(|| file.judge.model.clone())
                .unwrap_or_else(|| {
                    if judge_provider == DEFAULT_JUDGE_PROVIDER {
                        DEFAULT_JUDGE_MODEL.to_string()
                    } else {
                        judge_provider.default_model().to_string()
                    }
                });
            Some(JudgeSettings {
                provider: judge_provider,
                model: judge_model,
                threshold: self.judge_threshold.or(file.judge.threshold),
            })
        } else {
            None
        };

        let mut agent = file.agent.to_agent_config();
        if let Some(t) = self.temperature {
            agent = agent.with_temperature(t);
        }
        if let Some(n) = self.max_turns {
            agent = agent.with_max_turns(n);
        }

        let policy = match self.contains_weight {
            Some(w) => ScoringPolicy::new(w),
            None => file.eval.scoring_policy(),
        };

        let throttle = self.throttle.or(file.eval.throttle_secs);
        let mut eval = EvalConfig::new()
            .with_results_dir(
                self.results_dir
                    .clone()
                    .or_else(|| file.eval.results_dir.clone())
                    .unwrap_or_else(|| PathBuf::from(DEFAULT_RESULTS_DIR)),
            )
            .with_mode(if self.batch || file.eval.batch.unwrap_or(false) {
                ExperimentMode::Batch
            } else {
                ExperimentMode::PerExample
            });
        if let Some(secs) = throttle {
            let throttle = Duration::try_from_secs_f64(secs)
                .map_err(|e| format!("Invalid throttle {}: {}", secs, e))?;
            eval = eval.with_throttle(throttle);
        }
        if let Some(project) = self.project.clone().or_else(|| file.eval.project.clone()) {
            eval = eval.with_project(project);
        }
        if let Some(path) = self
            .lock_path
            .clone()
            .or_else(|| file.eval.lock_path.clone())
        {
            eval = eval.with_lock_path(path);
        }
        if let Some(index) = self.example {
            eval = eval.with_example(index);
        }

        Ok(Settings {
            provider,
            model,
            judge,
            agent,
            policy,
            dataset: self
                .dataset
                .clone()
                .or_else(|| file.eval.dataset.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATASET)),
            log_dir: self
                .log_dir
                .clone()
                .or_else(|| file.agent.log_dir.clone())
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            eval,
        })
    }
}

fn parse_provider(value: Option<&str>, default: Provider) -> Result<Provider, String> {
    match value {
        Some(name) => name.parse().map_err(|e: logan_core::LlmError| e.to_string()),
        None => Ok(default),
    }
}

/// Build the agent and evaluators, then run the harness.
async fn run_evaluation(settings: &Settings, llm_config: LlmConfig) -> Result<EvalOutcome, String> {
    let agent_gateway: Arc<dyn ModelGateway> = Arc::new(
        HttpGateway::from_env(settings.provider, settings.model.clone(), llm_config.clone())
            .map_err(|e| format!("Failed to create {} gateway: {}", settings.provider, e))?,
    );
    let agent = LogAgent::for_log_dir(settings.agent.clone(), agent_gateway, &settings.log_dir)
        .map_err(|e| format!("Failed to create agent: {}", e))?;

    let mut evaluators = Evaluators::rule_based(settings.policy);
    if let Some(judge) = &settings.judge {
        let gateway = HttpGateway::from_env(judge.provider, Some(judge.model.clone()), llm_config)
            .map_err(|e| {
                format!(
                    "Failed to create {} judge gateway: {} (use --no-judge to skip the judge)",
                    judge.provider, e
                )
            })?;
        let mut llm_judge = LlmJudge::new(Arc::new(gateway));
        if let Some(threshold) = judge.threshold {
            llm_judge = llm_judge.with_threshold(threshold);
        }
        evaluators = evaluators.with_judge(llm_judge);
    }

    let harness = EvalHarness::new(settings.eval.clone());
    let dataset = JsonFileDataset::new(&settings.dataset);
    run_with_progress(&harness, &agent, &dataset, &evaluators).await
}

/// Run evaluation with progress bar.
async fn run_with_progress(
    harness: &EvalHarness,
    agent: &LogAgent,
    dataset: &JsonFileDataset,
    evaluators: &Evaluators,
) -> Result<EvalOutcome, String> {
    let progress_bar = ProgressBar::new(0);
    progress_bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("#>-"),
    );

    let outcome = harness
        .run_with_progress(agent, dataset, evaluators, |progress| match progress {
            EvalProgress::Started { total } => {
                progress_bar.set_length(total as u64);
                progress_bar.set_message("Evaluating...");
            }
            EvalProgress::ExampleStarted { id, .. } => {
                progress_bar.set_message(id);
            }
            EvalProgress::ExampleCompleted {
                completed,
                index,
                passed,
                ..
            } => {
                progress_bar.set_position(completed as u64);
                if !passed {
                    progress_bar.println(format!("example {} failed", index));
                }
            }
            _ => {} // Handle future variants gracefully
        })
        .await;

    match outcome {
        Ok(outcome) => {
            progress_bar.finish_with_message("Complete");
            Ok(outcome)
        }
        Err(e) => {
            progress_bar.abandon();
            Err(e.to_string())
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Args::parse();

    // Initialize logging
    if args.verbose {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    } else {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    }

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    let settings = match args.file_config().and_then(|file| args.resolve(&file)) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    // Print configuration
    eprintln!("=== Log Analyzer Evaluation ===");
    eprintln!("Project: {}", settings.eval.project);
    eprintln!(
        "Agent: {}/{}",
        settings.provider,
        settings
            .model
            .as_deref()
            .unwrap_or(settings.provider.default_model())
    );
    match &settings.judge {
        Some(judge) => eprintln!("Judge: {}/{}", judge.provider, judge.model),
        None => eprintln!("Judge: disabled"),
    }
    eprintln!("Dataset: {}", settings.dataset.display());
    eprintln!("Log directory: {}", settings.log_dir.display());
    eprintln!(
        "Examples: {}",
        settings
            .eval
            .example
            .map(|i| i.to_string())
            .unwrap_or_else(|| "all".to_string())
    );
    eprintln!("Throttle: {:.1}s", settings.eval.throttle.as_secs_f64());
    eprintln!();

    // The run future owns the experiment lock; dropping it on Ctrl-C releases the lock.
    let result = tokio::select! {
        result = run_evaluation(&settings, args.llm_config()) => result,
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\nInterrupted; results written so far are kept");
            return ExitCode::FAILURE;
        }
    };

    match result {
        Ok(outcome) => {
            outcome.summary.print_summary();
            if let Some(dir) = &settings.eval.results_dir {
                println!("\nExperiment records written to: {}", dir.display());
            }
            if let Some(path) = &args.output_file {
                if let Err(e) = outcome.summary.write_json(path) {
                    eprintln!("Error: Failed to write output file: {}", e);
                    return ExitCode::FAILURE;
                }
                println!("Summary written to: {}", path.display());
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}
