use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveType {
    Annual,
    Sick,
    Personal,
    Maternity,
    Paternity,
    Bereavement,
    Unpaid,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
}

/// What a manager may answer with; `pending` is not a valid decision.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LeaveDecision {
    Approved,
    Rejected,
}

impl From<LeaveDecision> for LeaveStatus {
    fn from(d: LeaveDecision) -> Self {
        match d {
            LeaveDecision::Approved => LeaveStatus::Approved,
            LeaveDecision::Rejected => LeaveStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 1,
    "userId": 5,
    "startDate": "2025-05-01",
    "endDate": "2025-05-03",
    "type": "annual",
    "reason": "Family trip",
    "status": "pending",
    "requestDate": "2025-04-20T10:00:00Z",
    "approverId": null,
    "responseDate": null,
    "responseNotes": null
}))]
pub struct LeaveRequest {
    pub id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub status: LeaveStatus,
    #[schema(value_type = String, format = "date-time")]
    pub request_date: DateTime<Utc>,
    pub approver_id: Option<u64>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub response_date: Option<DateTime<Utc>>,
    pub response_notes: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "userId": 5,
    "startDate": "2025-05-01",
    "endDate": "2025-05-03",
    "type": "annual",
    "reason": "Family trip"
}))]
pub struct SubmitLeave {
    /// Defaults to the caller.
    pub user_id: Option<u64>,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    #[serde(rename = "type")]
    pub leave_type: LeaveType,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({"status": "approved", "notes": "Enjoy"}))]
pub struct RespondLeave {
    pub status: LeaveDecision,
    pub notes: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewLeaveRequest {
    pub user_id: u64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub leave_type: LeaveType,
    pub reason: Option<String>,
    pub request_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LeaveResolution {
    pub decision: LeaveDecision,
    pub approver_id: u64,
    pub notes: Option<String>,
    pub responded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct LeaveFilter {
    pub user_id: Option<u64>,
    pub status: Option<LeaveStatus>,
}

impl LeaveFilter {
    pub fn matches(&self, leave: &LeaveRequest) -> bool {
        self.user_id.is_none_or(|id| leave.user_id == id)
            && self.status.is_none_or(|s| leave.status == s)
    }
}

impl LeaveRequest {
    /// pending -> approved | rejected; both outcomes are terminal.
    pub fn resolve(&mut self, resolution: &LeaveResolution) -> AppResult<()> {
        if self.status != LeaveStatus::Pending {
            return Err(AppError::conflict(format!(
                "Leave request {} is already {}",
                self.id, self.status
            )));
        }

        self.status = resolution.decision.into();
        self.approver_id = Some(resolution.approver_id);
        self.response_date = Some(resolution.responded_at);
        self.response_notes = resolution.notes.clone();
        Ok(())
    }

    /// Inclusive number of calendar days covered.
    pub fn days(&self) -> i64 {
        (self.end_date - self.start_date).num_days() + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pending() -> LeaveRequest {
        LeaveRequest {
            id: 3,
            user_id: 5,
            start_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2025, 5, 3).unwrap(),
            leave_type: LeaveType::Annual,
            reason: None,
            status: LeaveStatus::Pending,
            request_date: Utc::now(),
            approver_id: None,
            response_date: None,
            response_notes: None,
        }
    }

    fn resolution(decision: LeaveDecision) -> LeaveResolution {
        LeaveResolution {
            decision,
            approver_id: 1,
            notes: Some("ok".into()),
            responded_at: Utc::now(),
        }
    }

    #[test]
    fn approving_sets_response_fields() {
        let mut leave = pending();
        leave.resolve(&resolution(LeaveDecision::Approved)).unwrap();

        assert_eq!(leave.status, LeaveStatus::Approved);
        assert_eq!(leave.approver_id, Some(1));
        assert!(leave.response_date.is_some());
        assert_eq!(leave.response_notes.as_deref(), Some("ok"));
    }

    #[test]
    fn resolved_requests_cannot_be_answered_again() {
        let mut leave = pending();
        leave.resolve(&resolution(LeaveDecision::Rejected)).unwrap();

        let err = leave.resolve(&resolution(LeaveDecision::Approved)).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
        assert_eq!(leave.status, LeaveStatus::Rejected);
    }

    #[test]
    fn days_are_inclusive() {
        assert_eq!(pending().days(), 3);
    }

    #[test]
    fn leave_type_serializes_under_type_key() {
        let json = serde_json::to_value(pending()).unwrap();
        assert_eq!(json["type"], "annual");
        assert_eq!(json["status"], "pending");
        assert_eq!(json["userId"], 5);
    }
}
