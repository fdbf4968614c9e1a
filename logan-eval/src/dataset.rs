//! Dataset loading for evaluation.
//!
//! Provides the [`Dataset`] trait, the [`Example`] wire format, and a JSON
//! file loader.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::fs;

/// Minimum combined score used when an example does not set one.
pub const DEFAULT_MIN_SCORE: f64 = 0.7;

/// Errors that can occur when loading datasets.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DatasetError {
    /// Failed to read dataset file
    #[error("Failed to read dataset: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse dataset
    #[error("Failed to parse dataset: {0}")]
    Parse(String),

    /// An example parsed but violates a constraint
    #[error("Invalid example {id}: {reason}")]
    Invalid { id: String, reason: String },
}

/// How hard an example is expected to be.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleInputs {
    pub query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleOutputs {
    #[serde(default)]
    pub expected_contains: Vec<String>,
    #[serde(default)]
    pub expected_structure: Vec<String>,
    #[serde(default = "default_min_score")]
    pub min_score: f64,
}

fn default_min_score() -> f64 {
    DEFAULT_MIN_SCORE
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExampleMetadata {
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_category")]
    pub category: String,
}

fn default_category() -> String {
    "general".to_string()
}

impl Default for ExampleMetadata {
    fn default() -> Self {
        Self {
            difficulty: Difficulty::default(),
            category: default_category(),
        }
    }
}

/// One evaluation case, in its persisted shape.
///
/// ```json
/// {"id": "err-1",
///  "inputs": {"query": "list errors in server.log"},
///  "outputs": {"expected_contains": ["error"], "expected_structure": ["root cause"], "min_score": 0.7},
///  "metadata": {"difficulty": "easy", "category": "error_detection"}}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Example {
    #[serde(default)]
    pub id: String,
    /// Creation time; determines example order
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    pub inputs: ExampleInputs,
    pub outputs: ExampleOutputs,
    #[serde(default)]
    pub metadata: ExampleMetadata,
}

impl Example {
    /// Build an example with default outputs and metadata.
    pub fn new(id: impl Into<String>, query: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: None,
            inputs: ExampleInputs {
                query: query.into(),
            },
            outputs: ExampleOutputs {
                expected_contains: Vec::new(),
                expected_structure: Vec::new(),
                min_score: DEFAULT_MIN_SCORE,
            },
            metadata: ExampleMetadata::default(),
        }
    }

    #[must_use]
    pub fn with_expected_contains<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.outputs.expected_contains = items.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_expected_structure<S: Into<String>>(mut self, items: impl IntoIterator<Item = S>) -> Self {
        self.outputs.expected_structure = items.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn with_min_score(mut self, min_score: f64) -> Self {
        self.outputs.min_score = min_score;
        self
    }

    #[must_use]
    pub fn with_metadata(mut self, difficulty: Difficulty, category: impl Into<String>) -> Self {
        self.metadata = ExampleMetadata {
            difficulty,
            category: category.into(),
        };
        self
    }

    #[must_use]
    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = Some(created_at);
        self
    }

    pub fn query(&self) -> &str {
        &self.inputs.query
    }

    pub fn expected_contains(&self) -> &[String] {
        &self.outputs.expected_contains
    }

    pub fn expected_structure(&self) -> &[String] {
        &self.outputs.expected_structure
    }

    pub fn min_score(&self) -> f64 {
        self.outputs.min_score
    }

    fn validate(&self) -> Result<(), DatasetError> {
        let invalid = |reason: String| DatasetError::Invalid {
            id: self.id.clone(),
            reason,
        };
        if self.inputs.query.trim().is_empty() {
            return Err(invalid("query cannot be empty".to_string()));
        }
        if !(0.0..=1.0).contains(&self.outputs.min_score) {
            return Err(invalid(format!(
                "min_score must be between 0.0 and 1.0, got {}",
                self.outputs.min_score
            )));
        }
        Ok(())
    }
}

/// Put examples in creation order and fill in missing ids.
///
/// Examples without `created_at` keep their relative order after the dated
/// ones. Ids default to `example-{position}` by file position.
pub fn order_examples(mut examples: Vec<Example>) -> Vec<Example> {
    for (position, example) in examples.iter_mut().enumerate() {
        if example.id.trim().is_empty() {
            example.id = format!("example-{}", position);
        }
    }
    examples.sort_by_key(|e| (e.created_at.is_none(), e.created_at));
    examples
}

/// Trait for evaluation datasets.
///
/// Implementations return examples already in creation order.
pub trait Dataset: Send + Sync {
    /// The name of this dataset (used in reports).
    fn name(&self) -> &str;

    /// Load, validate, and order all examples.
    fn load(&self) -> impl std::future::Future<Output = Result<Vec<Example>, DatasetError>> + Send;
}

/// Load examples from a JSON array file.
pub struct JsonFileDataset {
    path: PathBuf,
    name: String,
}

impl JsonFileDataset {
    /// Create a dataset from a JSON file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("json_dataset")
            .to_string();

        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write examples in the same JSON shape [`load`](Dataset::load) reads.
    pub async fn write(path: &Path, examples: &[Example]) -> Result<(), DatasetError> {
        let json = serde_json::to_string_pretty(examples)
            .map_err(|e| DatasetError::Parse(e.to_string()))?;
        fs::write(path, json).await?;
        Ok(())
    }
}

impl Dataset for JsonFileDataset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<Example>, DatasetError> {
        let content = fs::read_to_string(&self.path).await?;
        let examples: Vec<Example> =
            serde_json::from_str(&content).map_err(|e| DatasetError::Parse(e.to_string()))?;

        let examples = order_examples(examples);
        for example in &examples {
            example.validate()?;
        }
        log::debug!(
            "Loaded {} examples from {}",
            examples.len(),
            self.path.display()
        );
        Ok(examples)
    }
}

/// A fixed set of examples held in memory.
pub struct InMemoryDataset {
    name: String,
    examples: Vec<Example>,
}

impl InMemoryDataset {
    pub fn new(name: impl Into<String>, examples: Vec<Example>) -> Self {
        Self {
            name: name.into(),
            examples,
        }
    }
}

impl Dataset for InMemoryDataset {
    fn name(&self) -> &str {
        &self.name
    }

    async fn load(&self) -> Result<Vec<Example>, DatasetError> {
        let examples = order_examples(self.examples.clone());
        for example in &examples {
            example.validate()?;
        }
        Ok(examples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SAMPLE: &str = r#"[
        {"id": "b", "created_at": "2025-01-02T00:00:00Z",
         "inputs": {"query": "second"},
         "outputs": {"expected_contains": ["error"], "expected_structure": ["root cause"], "min_score": 0.5},
         "metadata": {"difficulty": "hard", "category": "errors"}},
        {"id": "a", "created_at": "2025-01-01T00:00:00Z",
         "inputs": {"query": "first"},
         "outputs": {"expected_contains": [], "expected_structure": []},
         "metadata": {"difficulty": "easy", "category": "summary"}}
    ]"#;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut temp = NamedTempFile::new().unwrap();
        write!(temp, "{}", content).unwrap();
        temp
    }

    #[tokio::test]
    async fn test_json_file_dataset_sorted_by_created_at() {
        let temp = write_temp(SAMPLE);
        let examples = JsonFileDataset::new(temp.path()).load().await.unwrap();

        assert_eq!(examples.len(), 2);
        assert_eq!(examples[0].id, "a");
        assert_eq!(examples[0].min_score(), DEFAULT_MIN_SCORE);
        assert_eq!(examples[1].query(), "second");
        assert_eq!(examples[1].metadata.difficulty, Difficulty::Hard);
    }

    #[tokio::test]
    async fn test_round_trip_is_lossless() {
        let temp = write_temp(SAMPLE);
        let dataset = JsonFileDataset::new(temp.path());
        let original = dataset.load().await.unwrap();

        let out = NamedTempFile::new().unwrap();
        JsonFileDataset::write(out.path(), &original).await.unwrap();
        let reloaded = JsonFileDataset::new(out.path()).load().await.unwrap();

        assert_eq!(original, reloaded);
    }

    #[test]
    fn test_undated_examples_keep_file_order_after_dated() {
        let dated = Utc.with_ymd_and_hms(2025, 3, 1, 0, 0, 0).unwrap();
        let examples = order_examples(vec![
            Example::new("", "x"),
            Example::new("", "y"),
            Example::new("dated", "z").with_created_at(dated),
        ]);
        let ids: Vec<&str> = examples.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(ids, vec!["dated", "example-0", "example-1"]);
    }

    #[rstest]
    #[case::min_score_too_high(r#"[{"inputs": {"query": "q"}, "outputs": {"min_score": 1.5}}]"#)]
    #[case::empty_query(r#"[{"inputs": {"query": "  "}, "outputs": {}}]"#)]
    #[tokio::test]
    async fn test_invalid_examples_rejected(#[case] content: &str) {
        let temp = write_temp(content);
        let result = JsonFileDataset::new(temp.path()).load().await;
        assert!(matches!(result, Err(DatasetError::Invalid { .. })));
    }

    #[tokio::test]
    async fn test_unknown_difficulty_is_parse_error() {
        let temp = write_temp(
            r#"[{"inputs": {"query": "q"}, "outputs": {}, "metadata": {"difficulty": "extreme"}}]"#,
        );
        let result = JsonFileDataset::new(temp.path()).load().await;
        assert!(matches!(result, Err(DatasetError::Parse(_))));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let result = JsonFileDataset::new("/nonexistent/dataset.json").load().await;
        assert!(matches!(result, Err(DatasetError::Io(_))));
    }

    #[test]
    fn test_dataset_name_from_file_stem() {
        let dataset = JsonFileDataset::new("data/evaluation_dataset.json");
        assert_eq!(dataset.name(), "evaluation_dataset");
    }
}
