//! Evaluation harness for sequential, throttled experiment runs.
//!
//! The [`EvalHarness`] drives a [`LogAgent`] across a dataset one example at
//! a time, scores each run with an [`Evaluators`] set, and records the results
//! under deterministic experiment names. A whole invocation holds the
//! system-wide [`ExperimentLock`].

use crate::dataset::{Dataset, DatasetError, Example};
use crate::evaluator::Evaluators;
use crate::lock::{default_lock_path, ExperimentLock, LockError};
use crate::results::{EvaluationResult, Experiment, ExperimentIdentity, ExperimentSummary};
use crate::throttle::Throttle;
use logan_log_agent::LogAgent;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;

/// Default project name used in experiment names.
pub const DEFAULT_PROJECT: &str = "log-analyzer";

/// Default minimum interval between example starts.
pub const DEFAULT_THROTTLE: Duration = Duration::from_secs(15);

/// Errors that abort an evaluation before any example runs.
///
/// Failures of individual examples are recorded in their results instead.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EvalError {
    /// Another experiment holds the lock
    #[error(transparent)]
    Lock(#[from] LockError),

    /// Failed to load dataset
    #[error("Dataset error: {0}")]
    Dataset(#[from] DatasetError),

    /// Requested example index does not exist
    #[error("Example index {index} out of range (dataset has {total} examples)")]
    ExampleOutOfRange { index: usize, total: usize },
}

impl EvalError {
    /// Whether this error means another experiment is running.
    pub fn is_contention(&self) -> bool {
        matches!(self, EvalError::Lock(LockError::Contention { .. }))
    }
}

/// Progress events emitted during evaluation.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum EvalProgress {
    /// Lock held and dataset loaded, evaluation starting.
    Started {
        /// Number of examples in scope.
        total: usize,
    },
    /// An example's agent run is about to start.
    ExampleStarted {
        index: usize,
        id: String,
        experiment: String,
    },
    /// An example finished (passed, failed, or errored).
    ExampleCompleted {
        /// Number of examples completed so far.
        completed: usize,
        total: usize,
        index: usize,
        passed: bool,
    },
}

/// How results are grouped into experiments.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExperimentMode {
    /// One experiment per example, named `...-example-{index}`
    #[default]
    PerExample,
    /// A single experiment holding every result
    Batch,
}

/// Configuration for the evaluation harness.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub struct EvalConfig {
    /// Project name, the first part of every experiment name
    pub project: String,

    pub mode: ExperimentMode,

    /// Run only the example at this index (default: all)
    pub example: Option<usize>,

    /// Minimum start-to-start interval between examples (default: 15s)
    pub throttle: Duration,

    pub lock_path: PathBuf,

    /// Where experiment records are written (default: not persisted)
    pub results_dir: Option<PathBuf>,
}

impl Default for EvalConfig {
    fn default() -> Self {
        Self {
            project: DEFAULT_PROJECT.to_string(),
            mode: ExperimentMode::default(),
            example: None,
            throttle: DEFAULT_THROTTLE,
            lock_path: default_lock_path(),
            results_dir: None,
        }
    }
}

impl EvalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = project.into();
        self
    }

    #[must_use]
    pub fn with_mode(mut self, mode: ExperimentMode) -> Self {
        self.mode = mode;
        self
    }

    /// Restrict the run to one example.
    #[must_use]
    pub fn with_example(mut self, index: usize) -> Self {
        self.example = Some(index);
        self
    }

    #[must_use]
    pub fn with_throttle(mut self, throttle: Duration) -> Self {
        self.throttle = throttle;
        self
    }

    #[must_use]
    pub fn with_lock_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.lock_path = path.into();
        self
    }

    #[must_use]
    pub fn with_results_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.results_dir = Some(dir.into());
        self
    }
}

/// Everything a harness invocation produced.
#[derive(Debug, Clone)]
pub struct EvalOutcome {
    /// Finalized experiments in creation order
    pub experiments: Vec<Experiment>,
    pub summary: ExperimentSummary,
}

/// Evaluation harness for benchmarking the log agent.
///
/// # Example
///
/// ```no_run
/// use logan_core::{HttpGateway, LlmConfig, Provider};
/// use logan_eval::{EvalConfig, EvalHarness, Evaluators, JsonFileDataset};
/// use logan_log_agent::{LogAgent, LogAgentConfig};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let gateway = Arc::new(HttpGateway::from_env(Provider::OpenAi, None, LlmConfig::default())?);
/// let agent = LogAgent::for_log_dir(LogAgentConfig::default(), gateway, "./logs")?;
///
/// let harness = EvalHarness::new(EvalConfig::default().with_results_dir("results"));
/// let dataset = JsonFileDataset::new("data/evaluation_dataset.json");
/// let outcome = harness.run(&agent, &dataset, &Evaluators::default()).await?;
///
/// outcome.summary.print_summary();
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct EvalHarness {
    config: EvalConfig,
}

impl EvalHarness {
    pub fn new(config: EvalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EvalConfig {
        &self.config
    }

    /// Run evaluation against a dataset.
    pub async fn run<D>(
        &self,
        agent: &LogAgent,
        dataset: &D,
        evaluators: &Evaluators,
    ) -> Result<EvalOutcome, EvalError>
    where
        D: Dataset,
    {
        self.run_with_progress(agent, dataset, evaluators, |_| {})
            .await
    }

    /// Run evaluation with progress callbacks.
    ///
    /// The lock is taken before the dataset is read and held until this
    /// future completes or is dropped.
    ///
    /// # Errors
    ///
    /// Only pre-flight failures are returned: lock contention, dataset
    /// errors, and an out-of-range example index. In every case no agent
    /// run has started.
    pub async fn run_with_progress<D, F>(
        &self,
        agent: &LogAgent,
        dataset: &D,
        evaluators: &Evaluators,
        on_progress: F,
    ) -> Result<EvalOutcome, EvalError>
    where
        D: Dataset,
        F: Fn(EvalProgress) + Send + Sync,
    {
        let start_time = Instant::now();
        let _lock = ExperimentLock::acquire(&self.config.lock_path)?;

        let examples = dataset.load().await?;
        let selected = self.select(examples)?;
        let total = selected.len();

        let mut identity = ExperimentIdentity::new(
            &self.config.project,
            agent.gateway().provider(),
            agent.gateway().model(),
        );
        if let Some((provider, model)) = evaluators.judge_identity() {
            identity = identity.with_judge(provider, model);
        }

        log::info!(
            "Evaluating {} examples from {} (throttle {:.0}s)",
            total,
            dataset.name(),
            self.config.throttle.as_secs_f64()
        );
        on_progress(EvalProgress::Started { total });

        let plan: Vec<(Option<usize>, Vec<(usize, Example)>)> = match self.config.mode {
            ExperimentMode::PerExample => selected
                .into_iter()
                .map(|(index, example)| (Some(index), vec![(index, example)]))
                .collect(),
            ExperimentMode::Batch => vec![(None, selected)],
        };

        let mut throttle = Throttle::new(self.config.throttle);
        let mut experiments = Vec::with_capacity(plan.len());
        let mut completed = 0;

        for (experiment_index, members) in plan {
            let mut experiment = Experiment::start(&identity, experiment_index);
            log::info!("Starting experiment {}", experiment.name);

            for (index, example) in members {
                throttle.wait_turn().await;
                on_progress(EvalProgress::ExampleStarted {
                    index,
                    id: example.id.clone(),
                    experiment: experiment.name.clone(),
                });

                let result = self
                    .evaluate_example(agent, evaluators, index, &example)
                    .await;
                let passed = result.passed;
                experiment.push(result);
                self.persist(&experiment);

                completed += 1;
                on_progress(EvalProgress::ExampleCompleted {
                    completed,
                    total,
                    index,
                    passed,
                });
            }

            experiment.complete();
            self.persist(&experiment);
            experiments.push(experiment);
        }

        let summary = ExperimentSummary::from_experiments(
            dataset.name().to_string(),
            &experiments,
            start_time.elapsed(),
        );

        Ok(EvalOutcome {
            experiments,
            summary,
        })
    }

    /// Apply the configured example index to the ordered examples.
    fn select(&self, examples: Vec<Example>) -> Result<Vec<(usize, Example)>, EvalError> {
        match self.config.example {
            Some(index) => {
                let total = examples.len();
                let example = examples
                    .into_iter()
                    .nth(index)
                    .ok_or(EvalError::ExampleOutOfRange { index, total })?;
                Ok(vec![(index, example)])
            }
            None => Ok(examples.into_iter().enumerate().collect()),
        }
    }

    /// Run the agent on one example and score it. Never fails.
    async fn evaluate_example(
        &self,
        agent: &LogAgent,
        evaluators: &Evaluators,
        index: usize,
        example: &Example,
    ) -> EvaluationResult {
        let started = Instant::now();
        log::debug!("Running example {} ({}): {}", index, example.id, example.query());

        match agent.run(example.query()).await {
            Ok(run) => {
                if run.truncated {
                    log::warn!(
                        "Example {} hit the turn budget after {} turns",
                        example.id,
                        run.turns
                    );
                }
                let scores = evaluators.evaluate_all(&run.report, example).await;
                EvaluationResult::success(example, index, run, scores, started.elapsed())
            }
            Err(e) => {
                log::warn!("Example {} failed: {}", example.id, e);
                let reason = e.to_string();
                let scores = evaluators.failed_all(&reason);
                EvaluationResult::failure(example, index, reason, scores, started.elapsed())
            }
        }
    }

    fn persist(&self, experiment: &Experiment) {
        let Some(dir) = &self.config.results_dir else {
            return;
        };
        match experiment.write_atomic(dir) {
            Ok(path) => log::debug!("Wrote {}", path.display()),
            Err(e) => log::error!(
                "Failed to write experiment {} to {}: {}",
                experiment.name,
                dir.display(),
                e
            ),
        }
    }
}
