use super::{ClassificationResult, Classifier};
use crate::error::PipelineError;
use crate::features::FeatureExtractor;

// Hand-tuned weights: link shortening and sender spoofing carry more signal
// than raw keyword density. These constants are a reproducibility contract;
// tests pin to them.
const SUSPICIOUS_WORD_WEIGHT: f64 = 0.15;
const LINK_WEIGHT: f64 = 0.20;
const SHORTENED_LINK_WEIGHT: f64 = 0.30;
const SUSPICIOUS_SENDER_WEIGHT: f64 = 0.20;
const UPPERCASE_WEIGHT: f64 = 0.15;
const UPPERCASE_RATIO_CUTOFF: f64 = 0.3;

// A purely heuristic score never claims full certainty.
const SCORE_CAP: f64 = 0.95;
const PHISHING_CUTOFF: f64 = 0.5;

/// Deterministic scorer used when no trained model is available.
pub struct RuleBasedClassifier {
    extractor: FeatureExtractor,
}

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self {
            extractor: FeatureExtractor::new(),
        }
    }

    pub fn score(&self, subject: &str, body: &str) -> ClassificationResult {
        let text = format!("{subject} {body}");
        let features = self.extractor.extract(&text);

        let shouting = if features.uppercase_ratio > UPPERCASE_RATIO_CUTOFF {
            1.0
        } else {
            0.0
        };

        let probability = (SUSPICIOUS_WORD_WEIGHT * f64::from(features.suspicious_word_count)
            + LINK_WEIGHT * f64::from(features.num_links)
            + SHORTENED_LINK_WEIGHT * f64::from(features.shortened_link_count)
            + SUSPICIOUS_SENDER_WEIGHT * f64::from(features.suspicious_sender_flag)
            + UPPERCASE_WEIGHT * shouting)
            .min(SCORE_CAP);

        ClassificationResult {
            is_phishing: probability > PHISHING_CUTOFF,
            probability,
        }
    }
}

impl Classifier for RuleBasedClassifier {
    fn predict(&self, subject: &str, body: &str) -> Result<ClassificationResult, PipelineError> {
        Ok(self.score(subject, body))
    }
}

impl Default for RuleBasedClassifier {
    fn default() -> Self {
        Self::new()
    }
}
