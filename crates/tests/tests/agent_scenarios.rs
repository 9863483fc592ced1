use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use coral_agents::{MessageInput, ResortAgent};
use coral_core::{
    Activity, AgentConfig, Category, ConversationLog, Employee, HandlerInput, RequestStatus,
    Reservation, ShiftChange,
};
use coral_knowledge::PolicyKnowledgeBase;
use coral_observability::AppMetrics;
use coral_storage::{
    ActivityRepository, ConversationRepository, MemoryStore, ReservationRepository,
    ScheduleRepository,
};

/// A data-access port whose every call fails, for exercising the handler
/// error boundary.
#[derive(Clone, Default)]
struct FailingStore;

impl ReservationRepository for FailingStore {
    async fn find_reservation(&self, _guest: &str) -> Result<Option<Reservation>> {
        bail!("connection reset by peer")
    }

    async fn upsert_reservation(&self, _reservation: Reservation) -> Result<()> {
        bail!("connection reset by peer")
    }
}

impl ScheduleRepository for FailingStore {
    async fn get_employee(&self, _employee_id: &str) -> Result<Option<Employee>> {
        bail!("connection reset by peer")
    }

    async fn update_employee_schedule(
        &self,
        _employee_id: &str,
        _change: &ShiftChange,
    ) -> Result<Employee> {
        bail!("connection reset by peer")
    }
}

impl ActivityRepository for FailingStore {
    async fn find_activities(&self, _preference: &str) -> Result<Vec<Activity>> {
        bail!("connection reset by peer")
    }

    async fn upsert_activity(&self, _activity: Activity) -> Result<()> {
        bail!("connection reset by peer")
    }
}

impl ConversationRepository for FailingStore {
    async fn load_log(&self, _session_id: &str) -> Result<Option<ConversationLog>> {
        bail!("connection reset by peer")
    }

    async fn upsert_log(&self, _log: &ConversationLog) -> Result<()> {
        bail!("connection reset by peer")
    }

    async fn purge_expired(&self, _now: DateTime<Utc>) -> Result<u64> {
        bail!("connection reset by peer")
    }
}

fn seeded_agent() -> ResortAgent<MemoryStore> {
    ResortAgent::new(
        AgentConfig::default(),
        Arc::new(PolicyKnowledgeBase::builtin()),
        Arc::new(MemoryStore::seeded()),
        AppMetrics::shared(),
    )
    .expect("agent should build")
}

#[tokio::test]
async fn store_failure_degrades_to_error_record() {
    let agent = ResortAgent::new(
        AgentConfig::default(),
        Arc::new(PolicyKnowledgeBase::builtin()),
        Arc::new(FailingStore),
        AppMetrics::shared(),
    )
    .expect("agent should build");

    let outcome = agent
        .handle_message(MessageInput::from_text(
            "My name is Sarah Johnson, I need to check my reservation",
        ))
        .await;

    assert_eq!(outcome.record.status, RequestStatus::Error);
    assert_eq!(outcome.record.category, Category::ReservationLookup);
    assert!(outcome.record.message.contains("connection reset by peer"));
}

#[tokio::test]
async fn schedule_success_is_visible_on_reread() {
    let store = Arc::new(MemoryStore::seeded());
    let agent = ResortAgent::new(
        AgentConfig::default(),
        Arc::new(PolicyKnowledgeBase::builtin()),
        store.clone(),
        AppMetrics::shared(),
    )
    .expect("agent should build");

    let input = HandlerInput {
        employee_id: Some("EMP001".to_string()),
        shift_type: Some("Evening".to_string()),
        date: Some("2024-11-26".to_string()),
        ..HandlerInput::default()
    };

    let record = agent.dispatch(Category::ScheduleUpdate, &input).await;
    assert_eq!(record.status, RequestStatus::Success);
    assert_eq!(record.payload["shift"], "Evening");

    let employee = store.get_employee("EMP001").await.unwrap().unwrap();
    assert_eq!(employee.shift, "Evening");
    assert_eq!(employee.scheduled_date.as_deref(), Some("2024-11-26"));
}

#[tokio::test]
async fn schedule_update_requires_all_parameters() {
    let agent = seeded_agent();

    let input = HandlerInput {
        employee_id: Some("EMP001".to_string()),
        ..HandlerInput::default()
    };

    let record = agent.dispatch(Category::ScheduleUpdate, &input).await;
    assert_eq!(record.status, RequestStatus::Error);
    assert!(record.message.contains("required"));
}

#[tokio::test]
async fn no_matching_activities_is_not_found() {
    let agent = ResortAgent::new(
        AgentConfig::default(),
        Arc::new(PolicyKnowledgeBase::builtin()),
        Arc::new(MemoryStore::new()),
        AppMetrics::shared(),
    )
    .expect("agent should build");

    let input = HandlerInput {
        guest_preferences: Some("water sports".to_string()),
        ..HandlerInput::default()
    };

    let record = agent.dispatch(Category::ActivityRecommendation, &input).await;
    assert_eq!(record.status, RequestStatus::NotFound);
    assert_eq!(record.message, "No activities found for preferences.");
}

#[tokio::test]
async fn seeded_store_recommends_water_sports() {
    let agent = seeded_agent();

    let mut message =
        MessageInput::from_text("Can you recommend some activities? I love being on the water");
    message.input.guest_preferences = Some("water sports".to_string());
    let outcome = agent.handle_message(message).await;

    assert_eq!(outcome.record.category, Category::ActivityRecommendation);
    assert_eq!(outcome.record.status, RequestStatus::Found);
    assert_eq!(outcome.record.payload["count"], 3);
}

#[tokio::test]
async fn terse_policy_query_reports_match_count() {
    let agent = seeded_agent();

    let outcome = agent
        .handle_message(MessageInput::from_text("cancellation policy"))
        .await;

    assert_eq!(outcome.record.category, Category::PolicyInquiry);
    assert_eq!(outcome.record.status, RequestStatus::Acknowledged);
    assert!(outcome.record.message.contains("Found 1 matching policies."));
    assert_eq!(outcome.record.payload["count"], 1);
    assert_eq!(outcome.record.payload["escalation_level"], "Level 1 - Front Desk");
}

#[tokio::test]
async fn conversational_policy_question_falls_back() {
    let agent = seeded_agent();

    let outcome = agent
        .handle_message(MessageInput::from_text("What is your pets policy please?"))
        .await;

    assert_eq!(outcome.record.category, Category::PolicyInquiry);
    assert_eq!(outcome.record.status, RequestStatus::Acknowledged);
    assert!(outcome.record.message.contains("No policies found matching your query."));
    assert_eq!(outcome.record.payload["count"], 0);
}
