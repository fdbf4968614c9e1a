//! Evaluators that grade a finished agent run.
//!
//! Each evaluator maps a ([`Report`], [`Example`]) pair to an
//! [`EvaluatorScore`]. The built-in set mirrors the dataset fields:
//!
//! | Name | Checks |
//! |------|--------|
//! | `contains_check` | expected substrings appear in the report |
//! | `structure_check` | expected sections are present and non-empty |
//! | `min_score_check` | weighted mean of the two meets `min_score` |
//! | `llm_judge` | a second model grades the report 0-10 |

use crate::dataset::Example;
use async_trait::async_trait;
use logan_core::{LlmError, Message, ModelGateway};
use logan_log_agent::{Report, ReportSection};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

/// Outcome of one evaluator on one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluatorScore {
    /// Score in `[0, 1]`
    pub score: f64,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub comment: String,
}

impl EvaluatorScore {
    pub fn new(score: f64, passed: bool, comment: impl Into<String>) -> Self {
        Self {
            score,
            passed,
            comment: comment.into(),
        }
    }

    /// Zero score recorded when the run never produced a report.
    pub fn failed(reason: impl Into<String>) -> Self {
        Self::new(0.0, false, reason)
    }
}

/// Trait for evaluators.
///
/// Evaluators are stateless with respect to each other and never fail:
/// problems are expressed as a failing score with a comment.
#[async_trait]
pub trait Evaluator: Send + Sync {
    /// The name of this evaluator (used as the score key).
    fn name(&self) -> &str;

    async fn evaluate(&self, report: &Report, example: &Example) -> EvaluatorScore;
}

/// `contains_check`: fraction of expected substrings found, case-insensitive.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContainsCheck;

impl ContainsCheck {
    pub fn score(report: &Report, expected: &[String]) -> EvaluatorScore {
        if expected.is_empty() {
            return EvaluatorScore::new(1.0, true, "No expected keywords");
        }
        let text = report.full_text().to_lowercase();
        let found = expected
            .iter()
            .filter(|k| text.contains(&k.to_lowercase()))
            .count();
        EvaluatorScore::new(
            found as f64 / expected.len() as f64,
            found == expected.len(),
            format!("Found {}/{} expected keywords", found, expected.len()),
        )
    }
}

#[async_trait]
impl Evaluator for ContainsCheck {
    fn name(&self) -> &str {
        "contains_check"
    }

    async fn evaluate(&self, report: &Report, example: &Example) -> EvaluatorScore {
        Self::score(report, example.expected_contains())
    }
}

/// `structure_check`: fraction of expected sections present and non-empty.
///
/// Names that map to a report section (`root cause`, `fix`, ...) are checked
/// against that field; other names count as present when they appear in the
/// report text.
#[derive(Debug, Clone, Copy, Default)]
pub struct StructureCheck;

impl StructureCheck {
    pub fn score(report: &Report, expected: &[String]) -> EvaluatorScore {
        if expected.is_empty() {
            return EvaluatorScore::new(1.0, true, "No expected structure");
        }
        let lowered = report.full_text().to_lowercase();
        let present = expected
            .iter()
            .filter(|name| match ReportSection::from_name(name) {
                Some(section) => !report.section(section).trim().is_empty(),
                None => lowered.contains(&name.trim().to_lowercase()),
            })
            .count();
        EvaluatorScore::new(
            present as f64 / expected.len() as f64,
            present == expected.len(),
            format!(
                "Found {}/{} expected structure elements",
                present,
                expected.len()
            ),
        )
    }
}

#[async_trait]
impl Evaluator for StructureCheck {
    fn name(&self) -> &str {
        "structure_check"
    }

    async fn evaluate(&self, report: &Report, example: &Example) -> EvaluatorScore {
        Self::score(report, example.expected_structure())
    }
}

/// How contains and structure scores combine for `min_score_check`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoringPolicy {
    /// Weight of the contains score; structure gets `1 - contains_weight`.
    ///
    /// Default: 0.5
    pub contains_weight: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            contains_weight: 0.5,
        }
    }
}

impl ScoringPolicy {
    /// Create a policy, clamping the weight into `[0, 1]`.
    pub fn new(contains_weight: f64) -> Self {
        Self {
            contains_weight: contains_weight.clamp(0.0, 1.0),
        }
    }

    pub fn combine(&self, contains: f64, structure: f64) -> f64 {
        self.contains_weight * contains + (1.0 - self.contains_weight) * structure
    }
}

/// `min_score_check`: combined score compared against the example's minimum.
#[derive(Debug, Clone, Copy, Default)]
pub struct MinScoreCheck {
    policy: ScoringPolicy,
}

impl MinScoreCheck {
    pub fn new(policy: ScoringPolicy) -> Self {
        Self { policy }
    }
}

#[async_trait]
impl Evaluator for MinScoreCheck {
    fn name(&self) -> &str {
        "min_score_check"
    }

    async fn evaluate(&self, report: &Report, example: &Example) -> EvaluatorScore {
        let contains = ContainsCheck::score(report, example.expected_contains()).score;
        let structure = StructureCheck::score(report, example.expected_structure()).score;
        let combined = self.policy.combine(contains, structure);
        let passed = combined >= example.min_score();
        EvaluatorScore::new(
            combined,
            passed,
            format!(
                "Average {:.2} {} minimum {}",
                combined,
                if passed { "meets" } else { "below" },
                example.min_score()
            ),
        )
    }
}

/// Why the judge could not produce a score.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum JudgeError {
    #[error("judge gateway failed: {0}")]
    Gateway(#[from] LlmError),

    #[error("could not parse judge response: {0}")]
    Malformed(String),
}

/// Default pass threshold for `llm_judge`.
pub const DEFAULT_JUDGE_THRESHOLD: f64 = 0.7;

const JUDGE_RUBRIC: &str = r#"You are an impartial judge grading a log analysis assistant.

The assistant can only report what is in the logs. If the logs do not contain what the query asks about, a clear statement of that is a correct answer; do not penalize missing data, only poor reasoning or an unhelpful answer.

Grade the response from 0 to 10 on:
1. Relevance: does it answer the query given what the logs contain?
2. Completeness: does it give a root cause, timestamp and fix where applicable?
3. Actionability: is the suggested fix concrete and useful?

Reply with exactly two lines and nothing else:
SCORE: <0-10>
REASON: <one sentence>"#;

/// `llm_judge`: a second model grades the report.
///
/// Runs at temperature 0. A gateway failure or unparseable reply yields a
/// zero, failing score with the reason in the comment.
#[derive(Debug, Clone)]
pub struct LlmJudge {
    gateway: Arc<dyn ModelGateway>,
    threshold: f64,
}

impl LlmJudge {
    pub fn new(gateway: Arc<dyn ModelGateway>) -> Self {
        Self {
            gateway,
            threshold: DEFAULT_JUDGE_THRESHOLD,
        }
    }

    #[must_use]
    pub fn with_threshold(mut self, threshold: f64) -> Self {
        self.threshold = threshold.clamp(0.0, 1.0);
        self
    }

    pub fn provider(&self) -> &str {
        self.gateway.provider()
    }

    pub fn model(&self) -> &str {
        self.gateway.model()
    }

    fn render_prompt(report: &Report, example: &Example) -> String {
        let list = |items: &[String]| {
            if items.is_empty() {
                "(none)".to_string()
            } else {
                items.join(", ")
            }
        };
        format!(
            "Test category : {}\nDifficulty    : {}\nExpected keywords : {}\nExpected sections : {}\n\nUser query:\n{}\n\nAgent response:\n{}",
            example.metadata.category,
            example.metadata.difficulty,
            list(example.expected_contains()),
            list(example.expected_structure()),
            example.query(),
            report.full_text(),
        )
    }

    async fn judge(&self, report: &Report, example: &Example) -> Result<(f64, String), JudgeError> {
        let messages = [
            Message::system(JUDGE_RUBRIC),
            Message::user(Self::render_prompt(report, example)),
        ];
        let response = self.gateway.complete(&messages, &[], 0.0).await?;
        parse_judge_reply(&response.content)
    }
}

/// Parse `SCORE: <0-10>` / `REASON: <text>` into a `[0, 1]` score.
///
/// ```
/// use logan_eval::evaluator::parse_judge_reply;
///
/// let (score, reason) = parse_judge_reply("SCORE: 8\nREASON: Clear root cause.").unwrap();
/// assert_eq!(score, 0.8);
/// assert_eq!(reason, "Clear root cause.");
/// ```
pub fn parse_judge_reply(text: &str) -> Result<(f64, String), JudgeError> {
    let mut score = None;
    let mut reason = None;

    for line in text.lines() {
        let line = line.trim().trim_matches('*').trim();
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().trim_matches('*').trim();
        match key.trim().trim_matches('*').to_lowercase().as_str() {
            "score" if score.is_none() => {
                let number = value.split('/').next().unwrap_or("").trim();
                let raw: f64 = number
                    .parse()
                    .map_err(|_| JudgeError::Malformed(format!("score '{}' is not a number", value)))?;
                if !raw.is_finite() {
                    return Err(JudgeError::Malformed(format!("score '{}' is not finite", value)));
                }
                score = Some(raw.clamp(0.0, 10.0) / 10.0);
            }
            "reason" if reason.is_none() => reason = Some(value.to_string()),
            _ => {}
        }
    }

    let score = score.ok_or_else(|| JudgeError::Malformed("missing SCORE line".to_string()))?;
    // Two decimals, like the 0-10 scale it came from.
    let score = (score * 100.0).round() / 100.0;
    Ok((score, reason.unwrap_or_else(|| "No reason given".to_string())))
}

#[async_trait]
impl Evaluator for LlmJudge {
    fn name(&self) -> &str {
        "llm_judge"
    }

    async fn evaluate(&self, report: &Report, example: &Example) -> EvaluatorScore {
        match self.judge(report, example).await {
            Ok((score, reason)) => EvaluatorScore::new(
                score,
                score >= self.threshold,
                format!("[{}/{}] {}", self.provider(), self.model(), reason),
            ),
            Err(e) => {
                log::warn!("Judge unavailable for example {}: {}", example.id, e);
                EvaluatorScore::failed(format!("Judge error: {}", e))
            }
        }
    }
}

/// Ordered collection of evaluators.
pub struct Evaluators {
    evaluators: Vec<Box<dyn Evaluator>>,
    judge: Option<(String, String)>,
}

impl Evaluators {
    /// Create a collection with the given evaluators.
    pub fn new(evaluators: Vec<Box<dyn Evaluator>>) -> Self {
        Self {
            evaluators,
            judge: None,
        }
    }

    /// The rule-based evaluators with a custom scoring policy.
    pub fn rule_based(policy: ScoringPolicy) -> Self {
        Self::new(vec![
            Box::new(ContainsCheck),
            Box::new(StructureCheck),
            Box::new(MinScoreCheck::new(policy)),
        ])
    }

    /// Append an evaluator.
    pub fn add<E: Evaluator + 'static>(&mut self, evaluator: E) {
        self.evaluators.push(Box::new(evaluator));
    }

    /// Append the judge and remember its identity for experiment records.
    #[must_use]
    pub fn with_judge(mut self, judge: LlmJudge) -> Self {
        self.judge = Some((judge.provider().to_string(), judge.model().to_string()));
        self.add(judge);
        self
    }

    /// Judge provider and model, if a judge is registered.
    pub fn judge_identity(&self) -> Option<(&str, &str)> {
        self.judge.as_ref().map(|(p, m)| (p.as_str(), m.as_str()))
    }

    /// Evaluator names in registration order.
    pub fn names(&self) -> Vec<&str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// Run every evaluator, one after another, in registration order.
    pub async fn evaluate_all(
        &self,
        report: &Report,
        example: &Example,
    ) -> BTreeMap<String, EvaluatorScore> {
        let mut scores = BTreeMap::new();
        for evaluator in &self.evaluators {
            let score = evaluator.evaluate(report, example).await;
            log::debug!(
                "{} on {}: {:.2} ({})",
                evaluator.name(),
                example.id,
                score.score,
                if score.passed { "pass" } else { "fail" }
            );
            scores.insert(evaluator.name().to_string(), score);
        }
        scores
    }

    /// Zero scores for every evaluator, used when the run itself failed.
    pub fn failed_all(&self, reason: &str) -> BTreeMap<String, EvaluatorScore> {
        self.names()
            .into_iter()
            .map(|name| (name.to_string(), EvaluatorScore::failed(reason)))
            .collect()
    }
}

impl Default for Evaluators {
    fn default() -> Self {
        Self::rule_based(ScoringPolicy::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use logan_core::{ModelResponse, ScriptStep, ScriptedGateway};
    use rstest::rstest;

    fn report(text: &str) -> Report {
        Report::from_text(text)
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[rstest]
    #[case::all_found("ERROR: disk full", &["error", "disk"], 1.0, true)]
    #[case::half_found("ERROR: disk full", &["error", "memory"], 0.5, false)]
    #[case::none_found("all good", &["error"], 0.0, false)]
    #[case::empty_expectation("anything", &[], 1.0, true)]
    #[case::case_insensitive("Connection REFUSED", &["refused"], 1.0, true)]
    fn test_contains(
        #[case] text: &str,
        #[case] expected: &[&str],
        #[case] score: f64,
        #[case] passed: bool,
    ) {
        let result = ContainsCheck::score(&report(text), &strings(expected));
        assert_eq!(result.score, score);
        assert_eq!(result.passed, passed);
    }

    #[rstest]
    #[case::mapped_present("Root Cause: oom", &["root cause"], 1.0)]
    #[case::mapped_empty("Conclusion: ok\nRoot Cause:", &["root cause"], 0.0)]
    #[case::alias("Suggested Fix: restart", &["fix"], 1.0)]
    #[case::partial("Conclusion: ok\nTimestamp: 10:00", &["conclusion", "root_cause", "timestamp", "fix"], 0.5)]
    #[case::unmapped_in_text("Conclusion: severity is high", &["severity"], 1.0)]
    #[case::unmapped_missing("Conclusion: ok", &["severity"], 0.0)]
    #[case::empty_expectation("whatever", &[], 1.0)]
    fn test_structure(#[case] text: &str, #[case] expected: &[&str], #[case] score: f64) {
        let result = StructureCheck::score(&report(text), &strings(expected));
        assert_eq!(result.score, score);
        assert_eq!(result.passed, score == 1.0);
    }

    #[rstest]
    #[case::even(0.5, 1.0, 0.0, 0.5)]
    #[case::contains_only(1.0, 1.0, 0.0, 1.0)]
    #[case::structure_only(0.0, 1.0, 0.0, 0.0)]
    #[case::weighted(0.25, 1.0, 0.5, 0.625)]
    fn test_scoring_policy(
        #[case] weight: f64,
        #[case] contains: f64,
        #[case] structure: f64,
        #[case] expected: f64,
    ) {
        assert_eq!(ScoringPolicy::new(weight).combine(contains, structure), expected);
    }

    #[test]
    fn test_scoring_policy_clamps_weight() {
        assert_eq!(ScoringPolicy::new(3.0).contains_weight, 1.0);
        assert_eq!(ScoringPolicy::new(-1.0).contains_weight, 0.0);
    }

    #[tokio::test]
    async fn test_min_score_uses_combined_mean() {
        let example = Example::new("e", "q")
            .with_expected_contains(["error"])
            .with_expected_structure(["root cause"])
            .with_min_score(0.7);

        let result = MinScoreCheck::default()
            .evaluate(&report("Conclusion: one error"), &example)
            .await;
        assert_eq!(result.score, 0.5);
        assert!(!result.passed);
        assert!(result.comment.contains("below"));
    }

    #[rstest]
    #[case::plain("SCORE: 7\nREASON: decent", 0.7, "decent")]
    #[case::bold("**SCORE:** 10\n**REASON:** perfect", 1.0, "perfect")]
    #[case::out_of("Score: 9/10\nReason: good", 0.9, "good")]
    #[case::clamped_high("SCORE: 14", 1.0, "No reason given")]
    #[case::clamped_low("SCORE: -2\nREASON: bad", 0.0, "bad")]
    #[case::decimal("SCORE: 7.5\nREASON: ok", 0.75, "ok")]
    fn test_parse_judge_reply(#[case] text: &str, #[case] score: f64, #[case] reason: &str) {
        let (s, r) = parse_judge_reply(text).unwrap();
        assert_eq!(s, score);
        assert_eq!(r, reason);
    }

    #[rstest]
    #[case::missing("The answer looks fine.")]
    #[case::not_a_number("SCORE: high\nREASON: x")]
    fn test_parse_judge_reply_malformed(#[case] text: &str) {
        assert!(matches!(
            parse_judge_reply(text),
            Err(JudgeError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_judge_scores_and_labels_comment() {
        let gateway = Arc::new(
            ScriptedGateway::new(vec![ModelResponse::text("SCORE: 8\nREASON: Clear.")])
                .with_identity("groq", "llama-3.3-70b-versatile"),
        );
        let judge = LlmJudge::new(gateway.clone());
        let result = judge
            .evaluate(&report("Conclusion: ok"), &Example::new("e", "q"))
            .await;

        assert_eq!(result.score, 0.8);
        assert!(result.passed);
        assert_eq!(result.comment, "[groq/llama-3.3-70b-versatile] Clear.");
        assert_eq!(gateway.calls()[0].temperature, 0.0);
    }

    #[tokio::test]
    async fn test_judge_gateway_failure_is_zero() {
        let gateway = Arc::new(ScriptedGateway::from_steps(vec![ScriptStep::Fail(
            "rate limited".into(),
        )]));
        let result = LlmJudge::new(gateway)
            .evaluate(&report("Conclusion: ok"), &Example::new("e", "q"))
            .await;

        assert_eq!(result.score, 0.0);
        assert!(!result.passed);
        assert!(result.comment.starts_with("Judge error"));
        assert!(result.comment.contains("rate limited"));
    }

    #[tokio::test]
    async fn test_judge_below_threshold_fails() {
        let gateway = Arc::new(ScriptedGateway::new(vec![ModelResponse::text("SCORE: 6")]));
        let result = LlmJudge::new(gateway)
            .with_threshold(0.7)
            .evaluate(&report("x"), &Example::new("e", "q"))
            .await;
        assert_eq!(result.score, 0.6);
        assert!(!result.passed);
    }

    #[test]
    fn test_default_evaluators() {
        let evaluators = Evaluators::default();
        assert_eq!(
            evaluators.names(),
            vec!["contains_check", "structure_check", "min_score_check"]
        );
        assert!(evaluators.judge_identity().is_none());
    }

    #[test]
    fn test_with_judge_records_identity() {
        let gateway = Arc::new(ScriptedGateway::new(vec![]).with_identity("groq", "m"));
        let evaluators = Evaluators::default().with_judge(LlmJudge::new(gateway));
        assert_eq!(evaluators.names().last(), Some(&"llm_judge"));
        assert_eq!(evaluators.judge_identity(), Some(("groq", "m")));
    }

    #[test]
    fn test_failed_all_zeroes_every_evaluator() {
        let scores = Evaluators::default().failed_all("gateway down");
        assert_eq!(scores.len(), 3);
        assert!(scores.values().all(|s| s.score == 0.0 && !s.passed));
    }
}
