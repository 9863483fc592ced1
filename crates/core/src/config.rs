use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::Category;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("category {0:?} has no keywords configured")]
    MissingKeywords(Category),
    #[error("category {0:?} has no response template configured")]
    MissingTemplate(Category),
    #[error("the fallback category must not carry keywords")]
    FallbackHasKeywords,
    #[error("no escalation triggers configured")]
    NoEscalationTriggers,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryKeywords {
    pub category: Category,
    pub keywords: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryTemplate {
    pub category: Category,
    pub response: String,
    pub escalation: String,
}

/// Declarative router configuration: keyword tables, response/escalation
/// templates, and the escalation trigger set. The order of `keywords` entries
/// is the tie-break order the classifier documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    pub agent_name: String,
    pub company_name: String,
    pub keywords: Vec<CategoryKeywords>,
    pub templates: Vec<CategoryTemplate>,
    pub escalation_triggers: Vec<String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent_name: "Coral Cloud Resorts Manager".to_string(),
            company_name: "Coral Cloud Resorts".to_string(),
            keywords: vec![
                keyword_set(
                    Category::CustomerComplaint,
                    &[
                        "complaint",
                        "problem",
                        "issue",
                        "unhappy",
                        "disappointed",
                        "broken",
                        "maintenance",
                        "service",
                    ],
                ),
                keyword_set(
                    Category::ReservationLookup,
                    &[
                        "reservation",
                        "booking",
                        "room",
                        "check-in",
                        "check-out",
                        "confirmation",
                    ],
                ),
                keyword_set(
                    Category::ScheduleUpdate,
                    &[
                        "schedule",
                        "shift",
                        "employee",
                        "staff",
                        "coverage",
                        "time-off",
                    ],
                ),
                keyword_set(
                    Category::ActivityRecommendation,
                    &[
                        "activity",
                        "activities",
                        "recommend",
                        "excursion",
                        "things to do",
                        "tour",
                    ],
                ),
                keyword_set(
                    Category::PolicyInquiry,
                    &["policy", "rule", "procedure", "guideline", "cancellation"],
                ),
                keyword_set(
                    Category::EmergencyResponse,
                    &[
                        "emergency",
                        "urgent",
                        "medical",
                        "security",
                        "safety",
                        "fire",
                        "help",
                    ],
                ),
            ],
            templates: vec![
                template(
                    Category::CustomerComplaint,
                    "I sincerely apologize for the inconvenience. Let me address your concern about this matter immediately.",
                    "I'm connecting you with our senior management team to ensure this is resolved to your satisfaction.",
                ),
                template(
                    Category::ReservationLookup,
                    "I'd be happy to help you with your reservation. Let me access your booking details.",
                    "Let me transfer you to our reservations specialist for immediate assistance.",
                ),
                template(
                    Category::ScheduleUpdate,
                    "I'll help you with the scheduling matter. Let me check the current staff schedule and availability.",
                    "I'm coordinating with our HR department to resolve this scheduling issue.",
                ),
                template(
                    Category::ActivityRecommendation,
                    "I'd be glad to suggest resort activities that match your preferences.",
                    "Let me connect you with our concierge team for personalized recommendations.",
                ),
                template(
                    Category::PolicyInquiry,
                    "I'd be happy to provide you with information about our resort policies.",
                    "Let me connect you with our policy specialist for detailed information.",
                ),
                template(
                    Category::EmergencyResponse,
                    "I understand this is urgent. For immediate emergencies, please call 911. For non-emergency urgent matters, I'll connect you with our emergency response team right away.",
                    "Emergency protocols activated. Security and medical teams have been notified.",
                ),
                template(
                    Category::GeneralInquiry,
                    "Hello! I'm your Coral Cloud Resorts manager. How can I help make your stay more enjoyable today? I can assist with reservations, employee scheduling, activity recommendations, resort policies, or any other concerns you might have.",
                    "Let me connect you with the appropriate department for immediate assistance.",
                ),
            ],
            escalation_triggers: vec![
                "urgent".to_string(),
                "emergency".to_string(),
                "manager".to_string(),
                "supervisor".to_string(),
                "escalate".to_string(),
                "complain".to_string(),
            ],
        }
    }
}

impl AgentConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed reading agent config: {}", path.display()))?;
        let config: Self = serde_json::from_str(&raw)
            .with_context(|| format!("failed parsing agent config: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Startup exhaustiveness check: every routable category needs at least
    /// one keyword and a template, and the fallback category must stay
    /// keyword-free so it only wins when every score is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for category in Category::ALL {
            if category == Category::GeneralInquiry {
                continue;
            }
            let has_keywords = self
                .keywords
                .iter()
                .any(|set| set.category == category && !set.keywords.is_empty());
            if !has_keywords {
                return Err(ConfigError::MissingKeywords(category));
            }
        }

        for category in Category::ALL {
            if !self.templates.iter().any(|t| t.category == category) {
                return Err(ConfigError::MissingTemplate(category));
            }
        }

        if self
            .keywords
            .iter()
            .any(|set| set.category == Category::GeneralInquiry && !set.keywords.is_empty())
        {
            return Err(ConfigError::FallbackHasKeywords);
        }

        if self.escalation_triggers.is_empty() {
            return Err(ConfigError::NoEscalationTriggers);
        }

        Ok(())
    }

    pub fn response_template(&self, category: Category) -> &str {
        self.templates
            .iter()
            .find(|t| t.category == category)
            .map(|t| t.response.as_str())
            .unwrap_or("I understand your concern. Let me help you with that.")
    }

    pub fn escalation_template(&self, category: Category) -> &str {
        self.templates
            .iter()
            .find(|t| t.category == category)
            .map(|t| t.escalation.as_str())
            .unwrap_or("Let me connect you with the appropriate department for immediate assistance.")
    }
}

fn keyword_set(category: Category, keywords: &[&str]) -> CategoryKeywords {
    CategoryKeywords {
        category,
        keywords: keywords.iter().map(|k| k.to_string()).collect(),
    }
}

fn template(category: Category, response: &str, escalation: &str) -> CategoryTemplate {
    CategoryTemplate {
        category,
        response: response.to_string(),
        escalation: escalation.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        AgentConfig::default().validate().expect("default config");
    }

    #[test]
    fn rejects_category_without_keywords() {
        let mut config = AgentConfig::default();
        config.keywords.retain(|set| set.category != Category::PolicyInquiry);
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingKeywords(Category::PolicyInquiry))
        ));
    }

    #[test]
    fn rejects_keyworded_fallback() {
        let mut config = AgentConfig::default();
        config.keywords.push(CategoryKeywords {
            category: Category::GeneralInquiry,
            keywords: vec!["hello".to_string()],
        });
        assert!(matches!(
            config.validate(),
            Err(ConfigError::FallbackHasKeywords)
        ));
    }
}
