pub mod classifier;
pub mod config;
pub mod escalation;
pub mod models;

pub use classifier::{extract_guest_name, normalize_text, KeywordIntentClassifier};
pub use config::{AgentConfig, CategoryKeywords, CategoryTemplate, ConfigError};
pub use escalation::EscalationPolicy;
pub use models::*;
