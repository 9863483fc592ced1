use coral_core::{
    extract_guest_name, Category, HandlerInput, RequestStatus, ResponseRecord, ShiftChange,
};
use coral_storage::{
    ActivityRepository, ConversationRepository, ReservationRepository, ScheduleRepository,
};
use serde_json::json;

use crate::ResortAgent;

const ESCALATION_LEVEL: &str = "Level 1 - Front Desk";
const RESPONSE_TIME: &str = "2 hours";
const POLICY_FALLBACK: &str = "Policy information not found. Please contact management.";

impl<S> ResortAgent<S>
where
    S: ReservationRepository + ScheduleRepository + ActivityRepository + ConversationRepository,
{
    pub(crate) async fn handle_reservation_lookup(&self, input: &HandlerInput) -> ResponseRecord {
        let guest = input
            .customer_name
            .clone()
            .unwrap_or_else(|| extract_guest_name(&input.text));

        match self.store.find_reservation(&guest).await {
            Ok(Some(reservation)) => ResponseRecord::new(
                RequestStatus::Found,
                Category::ReservationLookup,
                format!(
                    "Found reservation for {}: room {}, check-in {}, check-out {}.",
                    reservation.guest_name,
                    reservation.room,
                    reservation.check_in,
                    reservation.check_out
                ),
            )
            .with_payload(json!({
                "guest": reservation.guest_name,
                "room": reservation.room,
                "check_in": reservation.check_in,
                "check_out": reservation.check_out,
                "reservation_status": reservation.status,
            })),
            Ok(None) => ResponseRecord::new(
                RequestStatus::NotFound,
                Category::ReservationLookup,
                format!(
                    "No reservations found for {}. Please check the name or try with email or confirmation number.",
                    guest
                ),
            ),
            Err(err) => self.store_error(Category::ReservationLookup, &err),
        }
    }

    pub(crate) async fn handle_schedule_update(&self, input: &HandlerInput) -> ResponseRecord {
        let (Some(employee_id), Some(shift_type), Some(date)) = (
            input.employee_id.as_deref(),
            input.shift_type.as_deref(),
            input.date.as_deref(),
        ) else {
            return ResponseRecord::new(
                RequestStatus::Error,
                Category::ScheduleUpdate,
                "An employee id, shift type, and date are required to update a schedule.",
            );
        };

        let change = ShiftChange {
            shift_type: shift_type.to_string(),
            date: date.to_string(),
        };

        match self
            .store
            .update_employee_schedule(employee_id, &change)
            .await
        {
            Ok(employee) => ResponseRecord::new(
                RequestStatus::Success,
                Category::ScheduleUpdate,
                "Schedule updated successfully.",
            )
            .with_payload(json!({
                "employee_id": employee.employee_id,
                "employee_name": employee.name,
                "shift": change.shift_type,
                "date": change.date,
            })),
            Err(err) => self.store_error(Category::ScheduleUpdate, &err),
        }
    }

    pub(crate) async fn handle_activity_recommendation(
        &self,
        input: &HandlerInput,
    ) -> ResponseRecord {
        let preference = input
            .guest_preferences
            .clone()
            .unwrap_or_else(|| input.text.clone());

        if preference.trim().is_empty() {
            return ResponseRecord::new(
                RequestStatus::Error,
                Category::ActivityRecommendation,
                "Please share what kind of activities you enjoy so I can recommend something.",
            );
        }

        match self.store.find_activities(&preference).await {
            Ok(activities) if !activities.is_empty() => ResponseRecord::new(
                RequestStatus::Found,
                Category::ActivityRecommendation,
                format!("Found {} activities matching your preferences.", activities.len()),
            )
            .with_payload(json!({
                "activities": activities,
                "count": activities.len(),
            })),
            Ok(_) => ResponseRecord::new(
                RequestStatus::NotFound,
                Category::ActivityRecommendation,
                "No activities found for preferences.",
            ),
            Err(err) => self.store_error(Category::ActivityRecommendation, &err),
        }
    }

    /// Complaints always acknowledge with the fixed Level 1 tier and 2-hour
    /// response commitment, whatever the severity; tiered SLAs belong to the
    /// escalation path, not this handler.
    pub(crate) fn handle_customer_complaint(&self, input: &HandlerInput) -> ResponseRecord {
        let matches = self.search_policies(&input.text);
        let reference = matches
            .first()
            .map(|entry| format!("{}: {}", entry.title, entry.content))
            .unwrap_or_else(|| POLICY_FALLBACK.to_string());

        ResponseRecord::new(
            RequestStatus::Acknowledged,
            Category::CustomerComplaint,
            self.config().response_template(Category::CustomerComplaint),
        )
        .with_payload(json!({
            "policy_reference": reference,
            "matched_policies": matches,
            "escalation_level": ESCALATION_LEVEL,
            "response_time": RESPONSE_TIME,
            "next_steps": "Manager will contact guest within 2 hours",
        }))
    }

    pub(crate) fn handle_policy_inquiry(&self, input: &HandlerInput) -> ResponseRecord {
        let matches = self.search_policies(&input.text);
        let summary = if matches.is_empty() {
            "No policies found matching your query.".to_string()
        } else {
            format!("Found {} matching policies.", matches.len())
        };

        ResponseRecord::new(
            RequestStatus::Acknowledged,
            Category::PolicyInquiry,
            format!(
                "{} {}",
                self.config().response_template(Category::PolicyInquiry),
                summary
            ),
        )
        .with_payload(json!({
            "policies": matches,
            "count": matches.len(),
            "escalation_level": ESCALATION_LEVEL,
            "response_time": RESPONSE_TIME,
        }))
    }

    pub(crate) fn handle_emergency_response(&self) -> ResponseRecord {
        ResponseRecord::new(
            RequestStatus::Acknowledged,
            Category::EmergencyResponse,
            self.config().response_template(Category::EmergencyResponse),
        )
        .with_payload(json!({
            "emergency_number": "911",
            "notified_team": "emergency response",
        }))
    }

    pub(crate) fn handle_general_inquiry(&self) -> ResponseRecord {
        ResponseRecord::new(
            RequestStatus::Acknowledged,
            Category::GeneralInquiry,
            self.config().response_template(Category::GeneralInquiry),
        )
    }

    fn store_error(&self, category: Category, err: &anyhow::Error) -> ResponseRecord {
        self.metrics.inc_store_error();
        ResponseRecord::new(RequestStatus::Error, category, err.to_string())
    }
}
