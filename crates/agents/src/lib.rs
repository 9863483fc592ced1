mod handlers;

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use chrono::{Duration, Utc};
use coral_core::{
    normalize_text, AgentConfig, Category, ConversationLog, ConversationTurn, EscalationPolicy,
    HandlerInput, KeywordIntentClassifier, PolicyEntry, ResponseRecord,
};
use coral_knowledge::PolicyKnowledgeBase;
use coral_observability::AppMetrics;
use coral_storage::{
    ActivityRepository, ConversationRepository, ReservationRepository, ScheduleRepository,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const LOG_TTL_HOURS: i64 = 24;
const MAX_LOGGED_TURNS: usize = 40;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageInput {
    pub session_id: Option<String>,
    pub guest_id: Option<String>,
    #[serde(flatten)]
    pub input: HandlerInput,
}

impl MessageInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            session_id: None,
            guest_id: None,
            input: HandlerInput::from_text(text),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageOutcome {
    pub session_id: String,
    #[serde(flatten)]
    pub record: ResponseRecord,
}

/// The resort manager agent: keyword classification, per-category dispatch
/// against the injected store, and an independent escalation pass. The
/// classifier table, templates, and knowledge base are fixed at construction
/// and shared read-only, so the agent is safe to call from many tasks.
#[derive(Clone)]
pub struct ResortAgent<S>
where
    S: ReservationRepository + ScheduleRepository + ActivityRepository + ConversationRepository,
{
    config: Arc<AgentConfig>,
    classifier: KeywordIntentClassifier,
    escalation: EscalationPolicy,
    knowledge: Arc<PolicyKnowledgeBase>,
    store: Arc<S>,
    metrics: Arc<AppMetrics>,
}

impl<S> ResortAgent<S>
where
    S: ReservationRepository + ScheduleRepository + ActivityRepository + ConversationRepository,
{
    pub fn new(
        config: AgentConfig,
        knowledge: Arc<PolicyKnowledgeBase>,
        store: Arc<S>,
        metrics: Arc<AppMetrics>,
    ) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            classifier: KeywordIntentClassifier::new(&config),
            escalation: EscalationPolicy::new(&config),
            config: Arc::new(config),
            knowledge,
            store,
            metrics,
        })
    }

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn classify(&self, text: &str) -> Category {
        self.classifier.classify(text)
    }

    /// Full message pipeline. Infallible by design: collaborator failures
    /// degrade to an `Error` record and history-write failures are only
    /// logged, so the caller always gets a well-formed response.
    #[instrument(skip(self, message))]
    pub async fn handle_message(&self, message: MessageInput) -> MessageOutcome {
        let started = Instant::now();
        self.metrics.inc_request();

        let mut input = message.input;
        input.text = normalize_text(&input.text);

        let classified = self.classifier.classify_scored(&input.text);
        let mut record = self.dispatch(classified.category, &input).await;

        if self.escalation.should_escalate(&input.text) {
            self.metrics.inc_escalation();
            let escalation = self.escalation.message_for(record.category).to_string();
            record.message = format!("{} {}", record.message, escalation);
            record.escalated = true;
            record.escalation_message = Some(escalation);
        }

        let session_id = message
            .session_id
            .unwrap_or_else(|| Uuid::new_v4().to_string());

        if let Err(err) = self
            .persist_turn(&session_id, message.guest_id.as_deref(), &input.text, &record)
            .await
        {
            self.metrics.inc_store_error();
            warn!(session_id = %session_id, error = %err, "failed persisting conversation turn");
        }

        self.metrics.observe_latency(started.elapsed());
        info!(
            session_id = %session_id,
            category = record.category.as_label(),
            score = classified.score,
            status = ?record.status,
            escalated = record.escalated,
            "message handled"
        );

        MessageOutcome { session_id, record }
    }

    /// The handler registry. Exhaustive over the category enum, so a handler
    /// gap is a compile error rather than a runtime surprise.
    pub async fn dispatch(&self, category: Category, input: &HandlerInput) -> ResponseRecord {
        match category {
            Category::CustomerComplaint => self.handle_customer_complaint(input),
            Category::ReservationLookup => self.handle_reservation_lookup(input).await,
            Category::ScheduleUpdate => self.handle_schedule_update(input).await,
            Category::ActivityRecommendation => self.handle_activity_recommendation(input).await,
            Category::PolicyInquiry => self.handle_policy_inquiry(input),
            Category::EmergencyResponse => self.handle_emergency_response(),
            Category::GeneralInquiry => self.handle_general_inquiry(),
        }
    }

    pub fn search_policies(&self, query: &str) -> Vec<PolicyEntry> {
        let results = self.knowledge.search(query);
        self.metrics.add_kb_hits(results.len());
        results
    }

    pub async fn purge_expired_logs(&self) -> Result<u64> {
        self.store.purge_expired(Utc::now()).await
    }

    async fn persist_turn(
        &self,
        session_id: &str,
        guest_id: Option<&str>,
        user_text: &str,
        record: &ResponseRecord,
    ) -> Result<()> {
        let mut log = self
            .store
            .load_log(session_id)
            .await?
            .unwrap_or_else(|| ConversationLog {
                session_id: session_id.to_string(),
                guest_id: None,
                expires_at: Utc::now() + Duration::hours(LOG_TTL_HOURS),
                turns: Vec::new(),
            });

        if let Some(guest_id) = guest_id {
            log.guest_id = Some(guest_id.to_string());
        }
        log.expires_at = Utc::now() + Duration::hours(LOG_TTL_HOURS);
        log.turns.push(ConversationTurn {
            at: Utc::now(),
            user_text: user_text.to_string(),
            response_message: record.message.clone(),
            category: record.category,
        });

        if log.turns.len() > MAX_LOGGED_TURNS {
            let keep_from = log.turns.len() - MAX_LOGGED_TURNS;
            log.turns = log.turns.split_off(keep_from);
        }

        self.store.upsert_log(&log).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use coral_core::RequestStatus;
    use coral_storage::MemoryStore;

    fn agent() -> ResortAgent<MemoryStore> {
        ResortAgent::new(
            AgentConfig::default(),
            Arc::new(PolicyKnowledgeBase::builtin()),
            Arc::new(MemoryStore::seeded()),
            AppMetrics::shared(),
        )
        .expect("agent should build from default config")
    }

    #[tokio::test]
    async fn reservation_scenario_finds_room_205() {
        let outcome = agent()
            .handle_message(MessageInput::from_text(
                "My name is Sarah Johnson, I need to check my reservation",
            ))
            .await;

        assert_eq!(outcome.record.category, Category::ReservationLookup);
        assert_eq!(outcome.record.status, RequestStatus::Found);
        assert_eq!(outcome.record.payload["room"], "205");
        assert!(!outcome.record.escalated);
    }

    #[tokio::test]
    async fn complaint_without_trigger_is_not_escalated() {
        let outcome = agent()
            .handle_message(MessageInput::from_text(
                "My room service order is taking over an hour",
            ))
            .await;

        assert_eq!(outcome.record.category, Category::CustomerComplaint);
        assert_eq!(outcome.record.status, RequestStatus::Acknowledged);
        assert!(!outcome.record.escalated);
        assert_eq!(outcome.record.payload["escalation_level"], "Level 1 - Front Desk");
        assert_eq!(outcome.record.payload["response_time"], "2 hours");
    }

    #[tokio::test]
    async fn emergency_with_help_escalates_independently() {
        let outcome = agent()
            .handle_message(MessageInput::from_text(
                "This is an emergency, I need help in the lobby",
            ))
            .await;

        assert_eq!(outcome.record.category, Category::EmergencyResponse);
        assert!(outcome.record.escalated);
        assert!(outcome.record.escalation_message.is_some());
    }

    #[tokio::test]
    async fn escalation_applies_outside_emergency_category() {
        let outcome = agent()
            .handle_message(MessageInput::from_text(
                "urgent: check my reservation for John Smith please",
            ))
            .await;

        assert_eq!(outcome.record.category, Category::ReservationLookup);
        assert!(outcome.record.escalated);
    }

    #[tokio::test]
    async fn empty_input_gets_general_greeting() {
        let outcome = agent().handle_message(MessageInput::from_text("")).await;

        assert_eq!(outcome.record.category, Category::GeneralInquiry);
        assert_eq!(outcome.record.status, RequestStatus::Acknowledged);
        assert!(!outcome.record.escalated);
        assert!(outcome.record.message.contains("Coral Cloud Resorts"));
    }

    #[tokio::test]
    async fn dispatch_is_idempotent_against_unchanged_store() {
        let agent = agent();
        let input = HandlerInput::from_text("My name is Sarah Johnson, about my reservation");

        let first = agent.dispatch(Category::ReservationLookup, &input).await;
        let second = agent.dispatch(Category::ReservationLookup, &input).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn purge_drops_expired_sessions_only() {
        let agent = agent();

        let live = agent
            .handle_message(MessageInput::from_text("hello there"))
            .await;
        agent
            .store
            .upsert_log(&ConversationLog {
                session_id: "stale".to_string(),
                guest_id: None,
                expires_at: Utc::now() - Duration::hours(1),
                turns: Vec::new(),
            })
            .await
            .unwrap();

        assert_eq!(agent.purge_expired_logs().await.unwrap(), 1);
        assert!(agent.store.load_log("stale").await.unwrap().is_none());
        assert!(agent.store.load_log(&live.session_id).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn conversation_turns_are_persisted_per_session() {
        let agent = agent();

        let outcome = agent
            .handle_message(MessageInput::from_text("What is your pet policy?"))
            .await;
        let second = agent
            .handle_message(MessageInput {
                session_id: Some(outcome.session_id.clone()),
                guest_id: Some("guest-42".to_string()),
                input: HandlerInput::from_text("And the cancellation policy?"),
            })
            .await;

        assert_eq!(outcome.session_id, second.session_id);
        let log = agent
            .store
            .load_log(&outcome.session_id)
            .await
            .unwrap()
            .expect("log should exist");
        assert_eq!(log.turns.len(), 2);
        assert_eq!(log.guest_id.as_deref(), Some("guest-42"));
    }
}
