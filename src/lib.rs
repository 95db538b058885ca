pub mod config;
pub mod config_loader;
pub mod domain_utils;
pub mod email;
pub mod features;
pub mod intent;
pub mod model_output;
pub mod orchestrator;

pub use config::{RuleSet, Thresholds, Weights};
pub use config_loader::{load_rules, RuleLoader, RuleSource};
pub use email::EmailMessage;
pub use features::{label_email, FeatureEngine, ScoreResult, SpamLabel};
pub use intent::{IntentClassifier, IntentLabel, IntentResult};
pub use model_output::ModelOutput;
pub use orchestrator::{orchestrate, DecisionSource, OrchestrateResult, SpamAction};
