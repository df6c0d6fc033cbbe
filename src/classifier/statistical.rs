use std::collections::HashMap;
use std::fs;
use std::path::Path;

use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{ClassificationResult, Classifier};
use crate::error::PipelineError;

pub const VECTORIZER_FILE: &str = "vectorizer.json";
pub const MODEL_FILE: &str = "model.json";

/// Trained text vectorizer: token → column mapping plus per-column inverse
/// document frequencies. Transform is tf × idf, L2-normalized.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorizerArtifact {
    pub vocabulary: HashMap<String, usize>,
    pub idf: Vec<f64>,
}

/// Trained binary logistic-regression model.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub coefficients: Vec<f64>,
    pub intercept: f64,
}

/// Wraps a pretrained vectorizer and model, both loaded once at construction.
/// Missing or corrupt artifacts make the classifier unavailable; they never
/// fail the process.
pub struct StatisticalClassifier {
    vectorizer: VectorizerArtifact,
    model: ModelArtifact,
    token_regex: Regex,
}

impl StatisticalClassifier {
    pub fn load(dir: &Path) -> Result<Self, PipelineError> {
        let vectorizer_path = dir.join(VECTORIZER_FILE);
        let model_path = dir.join(MODEL_FILE);

        if !vectorizer_path.exists() || !model_path.exists() {
            return Err(PipelineError::ModelUnavailable(format!(
                "no trained artifacts under {}",
                dir.display()
            )));
        }

        let vectorizer = read_artifact::<VectorizerArtifact>(&vectorizer_path)?;
        let model = read_artifact::<ModelArtifact>(&model_path)?;
        Ok(Self::from_parts(vectorizer, model))
    }

    pub fn from_parts(vectorizer: VectorizerArtifact, model: ModelArtifact) -> Self {
        Self {
            vectorizer,
            model,
            token_regex: Regex::new(r"\b\w\w+\b").unwrap(),
        }
    }

    /// Sparse tf-idf vector for the combined text, as (column, value) pairs.
    fn vectorize(&self, text: &str) -> Result<Vec<(usize, f64)>, PipelineError> {
        let lowered = text.to_lowercase();
        let mut counts: HashMap<usize, f64> = HashMap::new();

        for token in self.token_regex.find_iter(&lowered) {
            if let Some(&column) = self.vectorizer.vocabulary.get(token.as_str()) {
                if column >= self.vectorizer.idf.len()
                    || column >= self.model.coefficients.len()
                {
                    return Err(PipelineError::ClassificationFailure(format!(
                        "vocabulary column {column} outside model dimensions"
                    )));
                }
                *counts.entry(column).or_insert(0.0) += 1.0;
            }
        }

        let mut columns: Vec<(usize, f64)> = counts
            .into_iter()
            .map(|(column, tf)| (column, tf * self.vectorizer.idf[column]))
            .collect();

        let norm = columns.iter().map(|(_, v)| v * v).sum::<f64>().sqrt();
        if norm > 0.0 {
            for (_, value) in &mut columns {
                *value /= norm;
            }
        }

        Ok(columns)
    }
}

impl Classifier for StatisticalClassifier {
    fn predict(&self, subject: &str, body: &str) -> Result<ClassificationResult, PipelineError> {
        let text = format!("{subject} {body}");
        let columns = self.vectorize(&text)?;

        let mut z = self.model.intercept;
        for (column, value) in columns {
            z += self.model.coefficients[column] * value;
        }
        let probability = 1.0 / (1.0 + (-z).exp());

        // The model's native decision boundary, not the rule-based strict cut.
        Ok(ClassificationResult {
            is_phishing: probability >= 0.5,
            probability,
        })
    }
}

fn read_artifact<T: for<'de> Deserialize<'de>>(path: &Path) -> Result<T, PipelineError> {
    let content = fs::read_to_string(path).map_err(|e| {
        PipelineError::ModelUnavailable(format!("cannot read {}: {e}", path.display()))
    })?;
    serde_json::from_str(&content).map_err(|e| {
        PipelineError::ModelUnavailable(format!("cannot decode {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_classifier() -> StatisticalClassifier {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("verify".to_string(), 0);
        vocabulary.insert("account".to_string(), 1);
        vocabulary.insert("meeting".to_string(), 2);
        StatisticalClassifier::from_parts(
            VectorizerArtifact {
                vocabulary,
                idf: vec![1.0, 1.0, 1.0],
            },
            ModelArtifact {
                coefficients: vec![2.0, 2.0, -3.0],
                intercept: -1.0,
            },
        )
    }

    #[test]
    fn scores_phishing_vocabulary_high() {
        let classifier = sample_classifier();
        let result = classifier.predict("Please", "verify your account").unwrap();
        assert!(result.is_phishing);
        assert!(result.probability > 0.8, "got {}", result.probability);
    }

    #[test]
    fn scores_benign_vocabulary_low() {
        let classifier = sample_classifier();
        let result = classifier.predict("Weekly", "meeting agenda").unwrap();
        assert!(!result.is_phishing);
        assert!(result.probability < 0.1, "got {}", result.probability);
    }

    #[test]
    fn unknown_tokens_fall_back_to_intercept() {
        let classifier = sample_classifier();
        let result = classifier.predict("hello", "completely unrelated words").unwrap();
        let expected = 1.0 / (1.0 + 1.0f64.exp());
        assert!((result.probability - expected).abs() < 1e-12);
        assert!(!result.is_phishing);
    }

    #[test]
    fn missing_artifacts_report_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        match StatisticalClassifier::load(dir.path()) {
            Err(PipelineError::ModelUnavailable(_)) => {}
            Err(e) => panic!("expected ModelUnavailable, got {e:?}"),
            Ok(_) => panic!("expected ModelUnavailable, got a classifier"),
        }
    }

    #[test]
    fn corrupt_artifacts_report_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(VECTORIZER_FILE), "not json").unwrap();
        fs::write(dir.path().join(MODEL_FILE), "{}").unwrap();
        match StatisticalClassifier::load(dir.path()) {
            Err(PipelineError::ModelUnavailable(_)) => {}
            Err(e) => panic!("expected ModelUnavailable, got {e:?}"),
            Ok(_) => panic!("expected ModelUnavailable, got a classifier"),
        }
    }

    #[test]
    fn loads_valid_artifacts_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let sample = sample_classifier();
        fs::write(
            dir.path().join(VECTORIZER_FILE),
            serde_json::to_string(&sample.vectorizer).unwrap(),
        )
        .unwrap();
        fs::write(
            dir.path().join(MODEL_FILE),
            serde_json::to_string(&sample.model).unwrap(),
        )
        .unwrap();

        let loaded = StatisticalClassifier::load(dir.path()).unwrap();
        let a = loaded.predict("x", "verify account").unwrap();
        let b = sample.predict("x", "verify account").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn dimension_mismatch_is_a_classification_failure() {
        let mut vocabulary = HashMap::new();
        vocabulary.insert("verify".to_string(), 9);
        let classifier = StatisticalClassifier::from_parts(
            VectorizerArtifact {
                vocabulary,
                idf: vec![1.0],
            },
            ModelArtifact {
                coefficients: vec![1.0],
                intercept: 0.0,
            },
        );
        match classifier.predict("", "verify") {
            Err(PipelineError::ClassificationFailure(_)) => {}
            other => panic!("expected ClassificationFailure, got {other:?}"),
        }
    }
}
