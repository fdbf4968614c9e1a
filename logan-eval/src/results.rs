//! Evaluation results, experiment records and summaries.
//!
//! These are the output types of a harness invocation, designed for JSON
//! serialization: every [`Experiment`] is persisted as
//! `{results_dir}/{name}.json`, and an [`ExperimentSummary`] aggregates the
//! results of the whole invocation.

use crate::dataset::{Difficulty, Example};
use crate::evaluator::EvaluatorScore;
use chrono::{DateTime, Utc};
use logan_log_agent::{AgentRun, Report};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Result of evaluating a single example.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationResult {
    pub example_id: String,

    /// Position of the example in creation order
    pub example_index: usize,

    pub query: String,
    pub category: String,
    pub difficulty: Difficulty,

    /// The agent's report (None if the run failed)
    pub report: Option<Report>,

    /// Scores from each evaluator (evaluator name -> score)
    pub scores: BTreeMap<String, EvaluatorScore>,

    /// Whether every evaluator passed
    pub passed: bool,

    /// The agent hit its turn budget before answering
    pub truncated: bool,

    /// Agent turns used
    pub turns: usize,

    /// Error message if the agent run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl EvaluationResult {
    /// Create a result for a run that produced a report.
    pub fn success(
        example: &Example,
        example_index: usize,
        run: AgentRun,
        scores: BTreeMap<String, EvaluatorScore>,
        duration: Duration,
    ) -> Self {
        let passed = !scores.is_empty() && scores.values().all(|s| s.passed);
        Self {
            example_id: example.id.clone(),
            example_index,
            query: example.query().to_string(),
            category: example.metadata.category.clone(),
            difficulty: example.metadata.difficulty,
            report: Some(run.report),
            scores,
            passed,
            truncated: run.truncated,
            turns: run.turns,
            error: None,
            duration,
        }
    }

    /// Create a failed result; `scores` are the zeroed evaluator scores.
    pub fn failure(
        example: &Example,
        example_index: usize,
        error: String,
        scores: BTreeMap<String, EvaluatorScore>,
        duration: Duration,
    ) -> Self {
        Self {
            example_id: example.id.clone(),
            example_index,
            query: example.query().to_string(),
            category: example.metadata.category.clone(),
            difficulty: example.metadata.difficulty,
            report: None,
            scores,
            passed: false,
            truncated: false,
            turns: 0,
            error: Some(error),
            duration,
        }
    }

    /// Whether the agent run itself completed.
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.report.is_some()
    }

    pub fn score(&self, evaluator: &str) -> Option<f64> {
        self.scores.get(evaluator).map(|s| s.score)
    }
}

/// The (project, agent model, judge model) triple an experiment is named by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentIdentity {
    pub project: String,
    pub provider: String,
    pub model: String,
    pub judge_provider: Option<String>,
    pub judge_model: Option<String>,
}

impl ExperimentIdentity {
    pub fn new(
        project: impl Into<String>,
        provider: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            provider: provider.into(),
            model: model.into(),
            judge_provider: None,
            judge_model: None,
        }
    }

    #[must_use]
    pub fn with_judge(mut self, provider: impl Into<String>, model: impl Into<String>) -> Self {
        self.judge_provider = Some(provider.into());
        self.judge_model = Some(model.into());
        self
    }

    /// Deterministic experiment name.
    ///
    /// `{project}-{provider}-{model}-example-{index}` for a single example,
    /// `{project}-{provider}-{model}` for a batch.
    pub fn experiment_name(&self, example_index: Option<usize>) -> String {
        let base = format!("{}-{}-{}", self.project, self.provider, self.model);
        match example_index {
            Some(index) => format!("{}-example-{}", base, index),
            None => base,
        }
    }
}

/// Lifecycle of an experiment record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExperimentStatus {
    Running,
    Completed,
}

/// A named experiment and its ordered results.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experiment {
    pub name: String,
    pub project: String,
    pub provider: String,
    pub model: String,
    pub judge_provider: Option<String>,
    pub judge_model: Option<String>,
    pub status: ExperimentStatus,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
    pub results: Vec<EvaluationResult>,
}

impl Experiment {
    /// Start a new, empty experiment.
    pub fn start(identity: &ExperimentIdentity, example_index: Option<usize>) -> Self {
        Self {
            name: identity.experiment_name(example_index),
            project: identity.project.clone(),
            provider: identity.provider.clone(),
            model: identity.model.clone(),
            judge_provider: identity.judge_provider.clone(),
            judge_model: identity.judge_model.clone(),
            status: ExperimentStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            results: Vec::new(),
        }
    }

    pub fn push(&mut self, result: EvaluationResult) {
        self.results.push(result);
    }

    pub fn complete(&mut self) {
        self.status = ExperimentStatus::Completed;
        self.finished_at = Some(Utc::now());
    }

    /// File stem for this experiment's record.
    ///
    /// Model ids such as `openai/gpt-oss-120b` contain path separators, so
    /// `/`, `\` and `:` become `_`. The unaltered name is kept in the record.
    pub fn file_stem(&self) -> String {
        self.name
            .chars()
            .map(|c| match c {
                '/' | '\\' | ':' => '_',
                other => other,
            })
            .collect()
    }

    /// Path of this experiment's record inside `dir`.
    pub fn file_path(&self, dir: &Path) -> PathBuf {
        dir.join(format!("{}.json", self.file_stem()))
    }

    /// Write the record to `{dir}/{file_stem}.json`, replacing it atomically.
    pub fn write_atomic(&self, dir: &Path) -> Result<PathBuf, std::io::Error> {
        std::fs::create_dir_all(dir)?;
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;

        let path = self.file_path(dir);
        let tmp = dir.join(format!(".{}.json.tmp", self.file_stem()));
        std::fs::write(&tmp, json)?;
        std::fs::rename(&tmp, &path)?;
        Ok(path)
    }

    /// Read a record written by [`write_atomic`](Self::write_atomic).
    pub fn read(path: &Path) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}

/// Pass counts for one category or difficulty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GroupStats {
    pub total: usize,
    pub passed: usize,
}

impl GroupStats {
    pub fn pass_rate(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f64 / self.total as f64
        }
    }
}

/// Summary of a whole harness invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentSummary {
    pub dataset_name: String,

    /// Names of the experiments written, in creation order
    pub experiments: Vec<String>,

    pub total_examples: usize,
    pub passed: usize,
    pub failed: usize,

    /// Runs that errored before producing a report
    pub errored: usize,

    /// Runs that hit the turn budget
    pub truncated: usize,

    pub pass_rate: f64,

    /// Mean score for each evaluator across all results
    pub mean_scores: BTreeMap<String, f64>,

    pub by_category: BTreeMap<String, GroupStats>,
    pub by_difficulty: BTreeMap<String, GroupStats>,

    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl ExperimentSummary {
    /// Aggregate results across experiments.
    pub fn from_experiments(
        dataset_name: String,
        experiments: &[Experiment],
        total_duration: Duration,
    ) -> Self {
        let results: Vec<&EvaluationResult> =
            experiments.iter().flat_map(|e| e.results.iter()).collect();

        let total_examples = results.len();
        let passed = results.iter().filter(|r| r.passed).count();
        let errored = results.iter().filter(|r| !r.is_success()).count();
        let truncated = results.iter().filter(|r| r.truncated).count();

        // Failed runs carry zero scores and count towards the mean.
        let mut score_sums: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for result in &results {
            for (name, score) in &result.scores {
                let entry = score_sums.entry(name.clone()).or_insert((0.0, 0));
                entry.0 += score.score;
                entry.1 += 1;
            }
        }
        let mean_scores = score_sums
            .into_iter()
            .map(|(name, (sum, count))| (name, if count > 0 { sum / count as f64 } else { 0.0 }))
            .collect();

        let mut by_category: BTreeMap<String, GroupStats> = BTreeMap::new();
        let mut by_difficulty: BTreeMap<String, GroupStats> = BTreeMap::new();
        for result in &results {
            for stats in [
                by_category.entry(result.category.clone()).or_default(),
                by_difficulty
                    .entry(result.difficulty.to_string())
                    .or_default(),
            ] {
                stats.total += 1;
                if result.passed {
                    stats.passed += 1;
                }
            }
        }

        Self {
            dataset_name,
            experiments: experiments.iter().map(|e| e.name.clone()).collect(),
            total_examples,
            passed,
            failed: total_examples - passed,
            errored,
            truncated,
            pass_rate: if total_examples > 0 {
                passed as f64 / total_examples as f64
            } else {
                0.0
            },
            mean_scores,
            by_category,
            by_difficulty,
            total_duration,
        }
    }

    /// Print a summary to stdout.
    pub fn print_summary(&self) {
        println!();
        println!("=== Evaluation Summary ===");
        println!("Dataset: {}", self.dataset_name);
        match self.experiments.as_slice() {
            [single] => println!("Experiment: {}", single),
            many => println!("Experiments: {}", many.len()),
        }
        println!();
        println!(
            "Examples: {} total, {} passed, {} failed ({} errored, {} truncated)",
            self.total_examples, self.passed, self.failed, self.errored, self.truncated
        );
        println!("Pass rate: {:.1}%", self.pass_rate * 100.0);
        println!();

        if !self.mean_scores.is_empty() {
            println!("Scores:");
            for (evaluator, mean) in &self.mean_scores {
                println!("  {}: {:.3}", evaluator, mean);
            }
            println!();
        }

        print_groups("By category", &self.by_category);
        print_groups("By difficulty", &self.by_difficulty);

        println!("Duration: {:.1}s", self.total_duration.as_secs_f64());
    }

    /// Write the summary to a JSON file.
    pub fn write_json(&self, path: &Path) -> Result<(), std::io::Error> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, json)
    }
}

fn print_groups(title: &str, groups: &BTreeMap<String, GroupStats>) {
    if groups.is_empty() {
        return;
    }
    println!("{}:", title);
    for (name, stats) in groups {
        println!(
            "  {}: {}/{} ({:.0}%)",
            name,
            stats.passed,
            stats.total,
            stats.pass_rate() * 100.0
        );
    }
    println!();
}

/// Serialize Duration as seconds (f64).
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn example(id: &str, category: &str, difficulty: Difficulty) -> Example {
        Example::new(id, "list errors").with_metadata(difficulty, category)
    }

    fn score(value: f64, passed: bool) -> EvaluatorScore {
        EvaluatorScore::new(value, passed, "")
    }

    fn run(conclusion: &str) -> AgentRun {
        AgentRun {
            report: Report::from_text(&format!("Conclusion: {}", conclusion)),
            transcript: Vec::new(),
            turns: 1,
            truncated: false,
        }
    }

    fn passing(id: &str, index: usize, category: &str, difficulty: Difficulty) -> EvaluationResult {
        let scores = BTreeMap::from([
            ("contains_check".to_string(), score(1.0, true)),
            ("structure_check".to_string(), score(1.0, true)),
        ]);
        EvaluationResult::success(
            &example(id, category, difficulty),
            index,
            run("ok"),
            scores,
            Duration::from_secs(1),
        )
    }

    #[test]
    fn test_passed_requires_every_evaluator() {
        let scores = BTreeMap::from([
            ("contains_check".to_string(), score(1.0, true)),
            ("structure_check".to_string(), score(0.0, false)),
        ]);
        let result = EvaluationResult::success(
            &example("e", "general", Difficulty::Easy),
            0,
            run("ok"),
            scores,
            Duration::ZERO,
        );
        assert!(result.is_success());
        assert!(!result.passed);
    }

    #[test]
    fn test_failure_has_no_report() {
        let result = EvaluationResult::failure(
            &example("e", "general", Difficulty::Hard),
            3,
            "boom".to_string(),
            BTreeMap::from([("contains_check".to_string(), EvaluatorScore::failed("boom"))]),
            Duration::ZERO,
        );
        assert!(!result.is_success());
        assert!(!result.passed);
        assert_eq!(result.score("contains_check"), Some(0.0));
        assert_eq!(result.example_index, 3);
    }

    #[test]
    fn test_experiment_names() {
        let identity = ExperimentIdentity::new("log-analyzer", "openai", "gpt-4o-mini");
        assert_eq!(
            identity.experiment_name(Some(2)),
            "log-analyzer-openai-gpt-4o-mini-example-2"
        );
        assert_eq!(identity.experiment_name(None), "log-analyzer-openai-gpt-4o-mini");
        // Judge identity does not change the name.
        let judged = identity.clone().with_judge("groq", "llama-3.3-70b-versatile");
        assert_eq!(judged.experiment_name(Some(2)), identity.experiment_name(Some(2)));
    }

    #[test]
    fn test_model_with_slash_gets_flat_file_name() {
        let dir = TempDir::new().unwrap();
        let identity = ExperimentIdentity::new("p", "groq", "openai/gpt-oss-120b");
        let experiment = Experiment::start(&identity, Some(0));

        assert_eq!(experiment.name, "p-groq-openai/gpt-oss-120b-example-0");
        assert_eq!(experiment.file_stem(), "p-groq-openai_gpt-oss-120b-example-0");

        let path = experiment.write_atomic(dir.path()).unwrap();
        assert_eq!(path.parent(), Some(dir.path()));
        assert_eq!(Experiment::read(&path).unwrap().name, experiment.name);
    }

    #[test]
    fn test_write_atomic_replaces_record() {
        let dir = TempDir::new().unwrap();
        let identity = ExperimentIdentity::new("p", "mock", "scripted").with_judge("groq", "j");
        let mut experiment = Experiment::start(&identity, Some(0));

        let path = experiment.write_atomic(dir.path()).unwrap();
        assert_eq!(path, dir.path().join("p-mock-scripted-example-0.json"));

        experiment.push(passing("a", 0, "general", Difficulty::Easy));
        experiment.complete();
        experiment.write_atomic(dir.path()).unwrap();

        let read = Experiment::read(&path).unwrap();
        assert_eq!(read.status, ExperimentStatus::Completed);
        assert_eq!(read.results.len(), 1);
        assert_eq!(read.judge_model.as_deref(), Some("j"));
        assert!(read.finished_at.is_some());

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().ends_with(".tmp"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_summary_breakdowns() {
        let identity = ExperimentIdentity::new("p", "m", "x");
        let mut experiment = Experiment::start(&identity, None);
        experiment.push(passing("a", 0, "error_detection", Difficulty::Easy));
        experiment.push(EvaluationResult::failure(
            &example("b", "error_detection", Difficulty::Hard),
            1,
            "timeout".to_string(),
            BTreeMap::from([
                ("contains_check".to_string(), EvaluatorScore::failed("timeout")),
                ("structure_check".to_string(), EvaluatorScore::failed("timeout")),
            ]),
            Duration::ZERO,
        ));
        experiment.push(passing("c", 2, "performance", Difficulty::Easy));

        let summary = ExperimentSummary::from_experiments(
            "ds".to_string(),
            &[experiment],
            Duration::from_secs(3),
        );

        assert_eq!(summary.total_examples, 3);
        assert_eq!(summary.passed, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.errored, 1);
        assert!((summary.pass_rate - 2.0 / 3.0).abs() < 1e-9);
        assert!((summary.mean_scores["contains_check"] - 2.0 / 3.0).abs() < 1e-9);
        assert_eq!(
            summary.by_category["error_detection"],
            GroupStats { total: 2, passed: 1 }
        );
        assert_eq!(summary.by_difficulty["easy"], GroupStats { total: 2, passed: 2 });
        assert_eq!(summary.by_difficulty["hard"].pass_rate(), 0.0);
    }

    #[test]
    fn test_summary_serialization() {
        let summary =
            ExperimentSummary::from_experiments("test".to_string(), &[], Duration::from_secs(5));

        let json = serde_json::to_string(&summary).unwrap();
        let parsed: ExperimentSummary = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.dataset_name, "test");
        assert_eq!(parsed.total_duration.as_secs(), 5);
        assert_eq!(parsed.pass_rate, 0.0);
    }
}
