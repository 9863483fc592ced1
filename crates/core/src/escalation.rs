use crate::config::AgentConfig;
use crate::models::Category;

/// Secondary keyword scan that runs independently of the classifier: a
/// reservation lookup containing "urgent" still gets flagged.
#[derive(Debug, Clone)]
pub struct EscalationPolicy {
    triggers: Vec<String>,
    messages: Vec<(Category, String)>,
}

impl EscalationPolicy {
    pub fn new(config: &AgentConfig) -> Self {
        Self {
            triggers: config
                .escalation_triggers
                .iter()
                .map(|trigger| trigger.to_lowercase())
                .collect(),
            messages: config
                .templates
                .iter()
                .map(|t| (t.category, t.escalation.clone()))
                .collect(),
        }
    }

    pub fn should_escalate(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.triggers.iter().any(|trigger| lower.contains(trigger))
    }

    pub fn message_for(&self, category: Category) -> &str {
        self.messages
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, message)| message.as_str())
            .unwrap_or("Let me connect you with the appropriate department for immediate assistance.")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> EscalationPolicy {
        EscalationPolicy::new(&AgentConfig::default())
    }

    #[test]
    fn triggers_on_manager_request() {
        assert!(policy().should_escalate("I want to speak to a MANAGER right now"));
    }

    #[test]
    fn trigger_scan_is_independent_of_category() {
        // Escalation fires even on a plain reservation question.
        assert!(policy().should_escalate("urgent: where is my reservation?"));
    }

    #[test]
    fn no_trigger_no_escalation() {
        let policy = policy();
        assert!(!policy.should_escalate("My room service order is taking over an hour"));
        assert!(!policy.should_escalate(""));
    }

    #[test]
    fn trigger_check_is_pure() {
        let policy = policy();
        let text = "please escalate this";
        assert_eq!(policy.should_escalate(text), policy.should_escalate(text));
    }
}
