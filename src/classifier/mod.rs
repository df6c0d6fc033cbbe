pub mod rules;
pub mod statistical;

use std::path::Path;

use serde::Serialize;

use crate::error::PipelineError;

pub use rules::RuleBasedClassifier;
pub use statistical::StatisticalClassifier;

/// Verdict for one message. Both fields are always emitted together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ClassificationResult {
    pub is_phishing: bool,
    /// Class-1 (phishing) probability in [0, 1].
    pub probability: f64,
}

/// Shared contract across classifier variants. Input text is the subject and
/// body joined with a single space.
pub trait Classifier {
    fn predict(&self, subject: &str, body: &str) -> Result<ClassificationResult, PipelineError>;
}

/// Selects the statistical classifier when its artifacts loaded, otherwise
/// the deterministic rule-based scorer. A `classify` call never surfaces an
/// error: any statistical failure falls through to the rules for the same
/// input.
pub struct ClassifierFacade {
    statistical: Option<StatisticalClassifier>,
    rules: RuleBasedClassifier,
}

impl ClassifierFacade {
    pub fn new(model_dir: &Path) -> Self {
        let statistical = match StatisticalClassifier::load(model_dir) {
            Ok(model) => {
                log::info!("statistical model loaded from {}", model_dir.display());
                Some(model)
            }
            Err(PipelineError::ModelUnavailable(reason)) => {
                // Normal condition: run on the rule-based scorer.
                log::info!("no usable statistical model ({reason}); using rule-based detection");
                None
            }
            Err(e) => {
                log::warn!("error loading statistical model: {e}");
                None
            }
        };

        Self {
            statistical,
            rules: RuleBasedClassifier::new(),
        }
    }

    pub fn has_model(&self) -> bool {
        self.statistical.is_some()
    }

    pub fn classify(&self, subject: &str, body: &str) -> ClassificationResult {
        if let Some(model) = &self.statistical {
            match model.predict(subject, body) {
                Ok(result) => return result,
                Err(e) => {
                    log::warn!("statistical prediction failed, using rule-based fallback: {e}");
                }
            }
        }
        self.rules.score(subject, body)
    }
}

impl Classifier for ClassifierFacade {
    fn predict(&self, subject: &str, body: &str) -> Result<ClassificationResult, PipelineError> {
        Ok(self.classify(subject, body))
    }
}
