//! Persistence boundary.
//!
//! `Store` only offers persistence primitives. Rules shared by both backends
//! (attendance merge, leave transitions) live on the model types, so the
//! MySQL and in-memory implementations apply exactly the same logic.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use crate::error::AppResult;
use crate::model::attendance::{Attendance, AttendanceFilter, AttendancePatch, AttendanceUpsert};
use crate::model::leave_request::{LeaveFilter, LeaveRequest, LeaveResolution, NewLeaveRequest};
use crate::model::training::{
    AssessmentFilter, AttendeeStatus, NewAssessment, NewFeedback, NewTraining, TrainingAssessment,
    TrainingAttendee, TrainingFeedback, TrainingRecord,
};
use crate::model::user::{NewUser, User, UserFilter, UserPatch};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Offset pagination, 1-based.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub page: u64,
    pub per_page: u64,
}

impl Page {
    pub fn new(page: Option<u64>, per_page: Option<u64>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            per_page: per_page.unwrap_or(10).clamp(1, 100),
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

#[async_trait]
pub trait Store: Send + Sync {
    // users
    /// Fails with `Conflict` when username, email or employee id is taken.
    async fn insert_user(&self, user: NewUser) -> AppResult<User>;
    async fn find_user(&self, id: u64) -> AppResult<Option<User>>;
    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>>;
    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>>;
    async fn update_user(&self, id: u64, patch: &UserPatch) -> AppResult<Option<User>>;
    async fn deactivate_user(&self, id: u64) -> AppResult<bool>;
    /// Removes the user and every row that references it.
    async fn purge_user(&self, id: u64) -> AppResult<bool>;
    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> AppResult<()>;
    async fn usernames_active_since(&self, since: DateTime<Utc>) -> AppResult<Vec<String>>;

    // refresh tokens
    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()>;
    /// Returns true only if the token existed and was still active.
    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<bool>;

    // attendance
    /// Insert-or-merge keyed by (user, date), atomic per key.
    async fn upsert_attendance(&self, upsert: &AttendanceUpsert) -> AppResult<Attendance>;
    async fn find_attendance(&self, id: u64) -> AppResult<Option<Attendance>>;
    async fn find_attendance_on(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> AppResult<Option<Attendance>>;
    async fn list_attendance(&self, filter: &AttendanceFilter) -> AppResult<Vec<Attendance>>;
    async fn update_attendance(
        &self,
        id: u64,
        patch: &AttendancePatch,
    ) -> AppResult<Option<Attendance>>;

    // leave
    async fn insert_leave(&self, leave: NewLeaveRequest) -> AppResult<LeaveRequest>;
    async fn find_leave(&self, id: u64) -> AppResult<Option<LeaveRequest>>;
    async fn list_leave(
        &self,
        filter: &LeaveFilter,
        page: Page,
    ) -> AppResult<(Vec<LeaveRequest>, i64)>;
    /// Locks the row and runs `LeaveRequest::resolve`; `NotFound` / `Conflict` on failure.
    async fn resolve_leave(&self, id: u64, resolution: &LeaveResolution) -> AppResult<LeaveRequest>;

    // training
    async fn insert_training(&self, training: NewTraining) -> AppResult<TrainingRecord>;
    async fn find_training(&self, id: u64) -> AppResult<Option<TrainingRecord>>;
    async fn list_trainings(&self) -> AppResult<Vec<TrainingRecord>>;
    /// Inserts a `registered` row when absent, otherwise leaves it alone.
    async fn register_attendee(
        &self,
        training_id: u64,
        user_id: u64,
    ) -> AppResult<TrainingAttendee>;
    /// Insert-or-update keyed by (training, user).
    async fn set_attendee_status(
        &self,
        training_id: u64,
        user_id: u64,
        status: AttendeeStatus,
    ) -> AppResult<TrainingAttendee>;
    async fn list_attendees(&self, training_id: u64) -> AppResult<Vec<TrainingAttendee>>;
    async fn insert_assessment(&self, assessment: NewAssessment) -> AppResult<TrainingAssessment>;
    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
    ) -> AppResult<Vec<TrainingAssessment>>;
    /// Feedback row plus the submitter's attendee row set to `present`, in one unit.
    async fn submit_feedback(
        &self,
        feedback: NewFeedback,
    ) -> AppResult<(TrainingFeedback, TrainingAttendee)>;
    async fn list_feedback(&self, training_id: Option<u64>) -> AppResult<Vec<TrainingFeedback>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_and_bounds() {
        let p = Page::new(None, None);
        assert_eq!((p.page, p.per_page, p.offset()), (1, 10, 0));

        let p = Page::new(Some(0), Some(1000));
        assert_eq!((p.page, p.per_page), (1, 100));

        let p = Page::new(Some(3), Some(20));
        assert_eq!(p.offset(), 40);
    }

    #[test]
    fn huge_page_saturates_offset() {
        let p = Page::new(Some(u64::MAX), None);
        assert_eq!(p.offset(), u64::MAX);
    }
}
