use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request categories the router can assign. Declaration order doubles as the
/// classifier tie-break order, so reordering variants changes routing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    CustomerComplaint,
    ReservationLookup,
    ScheduleUpdate,
    ActivityRecommendation,
    PolicyInquiry,
    EmergencyResponse,
    GeneralInquiry,
}

impl Category {
    pub const ALL: [Category; 7] = [
        Category::CustomerComplaint,
        Category::ReservationLookup,
        Category::ScheduleUpdate,
        Category::ActivityRecommendation,
        Category::PolicyInquiry,
        Category::EmergencyResponse,
        Category::GeneralInquiry,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            Self::CustomerComplaint => "customer_complaint",
            Self::ReservationLookup => "reservation_lookup",
            Self::ScheduleUpdate => "schedule_update",
            Self::ActivityRecommendation => "activity_recommendation",
            Self::PolicyInquiry => "policy_inquiry",
            Self::EmergencyResponse => "emergency_response",
            Self::GeneralInquiry => "general_inquiry",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "customer_complaint" | "complaint" => Some(Self::CustomerComplaint),
            "reservation_lookup" | "reservation" => Some(Self::ReservationLookup),
            "schedule_update" | "schedule" => Some(Self::ScheduleUpdate),
            "activity_recommendation" | "activity" => Some(Self::ActivityRecommendation),
            "policy_inquiry" | "policy" => Some(Self::PolicyInquiry),
            "emergency_response" | "emergency" => Some(Self::EmergencyResponse),
            "general_inquiry" | "general" => Some(Self::GeneralInquiry),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Found,
    NotFound,
    Success,
    Error,
    Acknowledged,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub score: usize,
}

/// Free-text request plus whatever structured parameters the caller already
/// knows. Handlers validate the fields they require; nothing here is parsed
/// out of the text beyond the guest-name heuristic.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HandlerInput {
    pub text: String,
    pub customer_name: Option<String>,
    pub employee_id: Option<String>,
    pub shift_type: Option<String>,
    pub date: Option<String>,
    pub guest_preferences: Option<String>,
}

impl HandlerInput {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Self::default()
        }
    }
}

/// Uniform dispatch output. Deliberately carries no timestamp so two
/// dispatches against an unchanged store compare equal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseRecord {
    pub status: RequestStatus,
    pub category: Category,
    pub message: String,
    pub payload: Value,
    pub escalated: bool,
    pub escalation_message: Option<String>,
}

impl ResponseRecord {
    pub fn new(status: RequestStatus, category: Category, message: impl Into<String>) -> Self {
        Self {
            status,
            category,
            message: message.into(),
            payload: Value::Null,
            escalated: false,
            escalation_message: None,
        }
    }

    pub fn with_payload(mut self, payload: Value) -> Self {
        self.payload = payload;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub guest_name: String,
    pub room: String,
    pub check_in: String,
    pub check_out: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub employee_id: String,
    pub name: String,
    pub department: String,
    pub shift: String,
    pub scheduled_date: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftChange {
    pub shift_type: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Activity {
    pub name: String,
    pub description: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyEntry {
    pub key: String,
    pub title: String,
    pub content: String,
    pub examples: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub at: DateTime<Utc>,
    pub user_text: String,
    pub response_message: String,
    pub category: Category,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationLog {
    pub session_id: String,
    pub guest_id: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub turns: Vec<ConversationTurn>,
}
