pub mod classifier;
pub mod config;
pub mod error;
pub mod features;
pub mod monitor;
pub mod normalizer;
pub mod source;
pub mod store;

pub use classifier::{
    ClassificationResult, Classifier, ClassifierFacade, RuleBasedClassifier, StatisticalClassifier,
};
pub use error::PipelineError;
pub use features::{FeatureExtractor, FeatureRecord};
pub use monitor::{Monitor, MonitorState};
pub use normalizer::EmailNormalizer;
pub use source::{DemoSource, EmailSource, RawEmail, SourceTag, SpoolSource};
pub use store::{AlertRecord, EmailRecord, EmailStore, MemoryStore, SqliteStore};
