use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};

use super::{Page, Store};
use crate::error::{AppError, AppResult};
use crate::model::attendance::{Attendance, AttendanceFilter, AttendancePatch, AttendanceUpsert};
use crate::model::leave_request::{
    LeaveFilter, LeaveRequest, LeaveResolution, LeaveStatus, NewLeaveRequest,
};
use crate::model::training::{
    AssessmentFilter, AttendeeStatus, NewAssessment, NewFeedback, NewTraining, TrainingAssessment,
    TrainingAttendee, TrainingFeedback, TrainingRecord,
};
use crate::model::user::{NewUser, User, UserFilter, UserPatch};

#[derive(Debug)]
struct RefreshToken {
    user_id: u64,
    revoked: bool,
}

#[derive(Debug, Default)]
struct State {
    next_id: u64,
    users: BTreeMap<u64, User>,
    refresh_tokens: HashMap<String, RefreshToken>,
    attendance: BTreeMap<u64, Attendance>,
    leave: BTreeMap<u64, LeaveRequest>,
    trainings: BTreeMap<u64, TrainingRecord>,
    attendees: BTreeMap<u64, TrainingAttendee>,
    assessments: BTreeMap<u64, TrainingAssessment>,
    feedback: BTreeMap<u64, TrainingFeedback>,
}

impl State {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    /// Mirrors the UNIQUE keys of the `users` table (usernames compare case-insensitively).
    fn check_user_unique(
        &self,
        skip_id: Option<u64>,
        username: &str,
        email: &str,
        employee_id: Option<&str>,
        qr_code: Option<&str>,
    ) -> AppResult<()> {
        for other in self.users.values().filter(|u| Some(u.id) != skip_id) {
            if other.username.eq_ignore_ascii_case(username) {
                return Err(AppError::conflict("Duplicate entry for username"));
            }
            if other.email.eq_ignore_ascii_case(email) {
                return Err(AppError::conflict("Duplicate entry for email"));
            }
            if employee_id.is_some() && other.employee_id.as_deref() == employee_id {
                return Err(AppError::conflict("Duplicate entry for employee id"));
            }
            if qr_code.is_some() && other.qr_code.as_deref() == qr_code {
                return Err(AppError::conflict("Duplicate entry for qr code"));
            }
        }
        Ok(())
    }

    fn require_user(&self, id: u64) -> AppResult<()> {
        if self.users.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::validation("Referenced record does not exist"))
        }
    }

    fn require_training(&self, id: u64) -> AppResult<()> {
        if self.trainings.contains_key(&id) {
            Ok(())
        } else {
            Err(AppError::validation("Referenced record does not exist"))
        }
    }

    fn attendee_mut(&mut self, training_id: u64, user_id: u64) -> Option<&mut TrainingAttendee> {
        self.attendees
            .values_mut()
            .find(|a| a.training_id == training_id && a.user_id == user_id)
    }

    fn set_attendee(
        &mut self,
        training_id: u64,
        user_id: u64,
        status: AttendeeStatus,
    ) -> TrainingAttendee {
        let now = Utc::now();
        if let Some(existing) = self.attendee_mut(training_id, user_id) {
            existing.status = status;
            existing.updated_at = now;
            return existing.clone();
        }

        let id = self.next_id();
        let row = TrainingAttendee {
            id,
            training_id,
            user_id,
            status,
            updated_at: now,
        };
        self.attendees.insert(id, row.clone());
        row
    }
}

/// In-process backend used by tests and `STORAGE_BACKEND=memory`.
///
/// Every operation holds the state lock for its whole duration, which gives
/// the same per-key atomicity the MySQL backend gets from row locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> AppResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| AppError::internal("memory store lock poisoned"))
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let mut state = self.state()?;
        state.check_user_unique(
            None,
            &new.username,
            &new.email,
            new.employee_id.as_deref(),
            new.qr_code.as_deref(),
        )?;

        let id = state.next_id();
        let user = User {
            id,
            username: new.username,
            email: new.email,
            name: new.name,
            role: new.role,
            department: new.department,
            position: new.position,
            employee_id: new.employee_id,
            qr_code: new.qr_code,
            join_date: new.join_date,
            is_active: true,
            password_hash: new.password_hash,
            last_login_at: None,
            created_at: Utc::now(),
        };
        state.users.insert(id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: u64) -> AppResult<Option<User>> {
        Ok(self.state()?.users.get(&id).cloned())
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        Ok(self
            .state()?
            .users
            .values()
            .find(|u| u.username.eq_ignore_ascii_case(username))
            .cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        Ok(self
            .state()?
            .users
            .values()
            .filter(|u| filter.matches(u))
            .cloned()
            .collect())
    }

    async fn update_user(&self, id: u64, patch: &UserPatch) -> AppResult<Option<User>> {
        let mut state = self.state()?;
        let Some(mut updated) = state.users.get(&id).cloned() else {
            return Ok(None);
        };
        patch.apply_to(&mut updated);
        state.check_user_unique(
            Some(id),
            &updated.username,
            &updated.email,
            updated.employee_id.as_deref(),
            updated.qr_code.as_deref(),
        )?;
        state.users.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn deactivate_user(&self, id: u64) -> AppResult<bool> {
        let mut state = self.state()?;
        match state.users.get_mut(&id) {
            Some(user) => {
                user.is_active = false;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn purge_user(&self, id: u64) -> AppResult<bool> {
        let mut state = self.state()?;
        if !state.users.contains_key(&id) {
            return Ok(false);
        }
        state.attendance.retain(|_, a| a.user_id != id);
        state.leave.retain(|_, l| l.user_id != id);
        state.attendees.retain(|_, a| a.user_id != id);
        state.assessments.retain(|_, a| a.user_id != id && a.assessor_id != id);
        state.feedback.retain(|_, f| f.user_id != id);
        state.refresh_tokens.retain(|_, t| t.user_id != id);
        for leave in state.leave.values_mut().filter(|l| l.approver_id == Some(id)) {
            leave.approver_id = None;
        }
        for training in state.trainings.values_mut().filter(|t| t.created_by == Some(id)) {
            training.created_by = None;
        }
        Ok(state.users.remove(&id).is_some())
    }

    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> AppResult<()> {
        if let Some(user) = self.state()?.users.get_mut(&id) {
            user.last_login_at = Some(at);
        }
        Ok(())
    }

    async fn usernames_active_since(&self, since: DateTime<Utc>) -> AppResult<Vec<String>> {
        Ok(self
            .state()?
            .users
            .values()
            .filter(|u| u.last_login_at.is_some_and(|at| at >= since))
            .map(|u| u.username.clone())
            .collect())
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        _expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.state()?.refresh_tokens.insert(
            jti.to_string(),
            RefreshToken {
                user_id,
                revoked: false,
            },
        );
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<bool> {
        let mut state = self.state()?;
        match state.refresh_tokens.get_mut(jti) {
            Some(token) if !token.revoked => {
                token.revoked = true;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn upsert_attendance(&self, upsert: &AttendanceUpsert) -> AppResult<Attendance> {
        let mut state = self.state()?;
        state.require_user(upsert.user_id)?;
        let now = Utc::now();

        let existing = state
            .attendance
            .values()
            .find(|a| a.user_id == upsert.user_id && a.date == upsert.date)
            .map(|a| a.id);

        let mut row = match existing {
            Some(id) => state.attendance[&id].clone(),
            None => {
                let id = state.next_id();
                Attendance::blank(id, upsert, now)
            }
        };
        row.merge(upsert, now)?;
        state.attendance.insert(row.id, row.clone());
        Ok(row)
    }

    async fn find_attendance(&self, id: u64) -> AppResult<Option<Attendance>> {
        Ok(self.state()?.attendance.get(&id).cloned())
    }

    async fn find_attendance_on(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> AppResult<Option<Attendance>> {
        Ok(self
            .state()?
            .attendance
            .values()
            .find(|a| a.user_id == user_id && a.date == date)
            .cloned())
    }

    async fn list_attendance(&self, filter: &AttendanceFilter) -> AppResult<Vec<Attendance>> {
        let mut rows: Vec<Attendance> = self
            .state()?
            .attendance
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.date.cmp(&a.date).then(a.user_id.cmp(&b.user_id)));
        Ok(rows)
    }

    async fn update_attendance(
        &self,
        id: u64,
        patch: &AttendancePatch,
    ) -> AppResult<Option<Attendance>> {
        let mut state = self.state()?;
        Ok(state.attendance.get_mut(&id).map(|row| {
            row.apply(patch, Utc::now());
            row.clone()
        }))
    }

    async fn insert_leave(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        let mut state = self.state()?;
        state.require_user(new.user_id)?;

        let id = state.next_id();
        let leave = LeaveRequest {
            id,
            user_id: new.user_id,
            start_date: new.start_date,
            end_date: new.end_date,
            leave_type: new.leave_type,
            reason: new.reason,
            status: LeaveStatus::Pending,
            request_date: new.request_date,
            approver_id: None,
            response_date: None,
            response_notes: None,
        };
        state.leave.insert(id, leave.clone());
        Ok(leave)
    }

    async fn find_leave(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        Ok(self.state()?.leave.get(&id).cloned())
    }

    async fn list_leave(
        &self,
        filter: &LeaveFilter,
        page: Page,
    ) -> AppResult<(Vec<LeaveRequest>, i64)> {
        let state = self.state()?;
        // newest first; ids are monotonic
        let matching: Vec<&LeaveRequest> = state
            .leave
            .values()
            .rev()
            .filter(|l| filter.matches(l))
            .collect();
        let total = matching.len() as i64;
        let data = matching
            .into_iter()
            .skip(usize::try_from(page.offset()).unwrap_or(usize::MAX))
            .take(usize::try_from(page.per_page).unwrap_or(usize::MAX))
            .cloned()
            .collect();
        Ok((data, total))
    }

    async fn resolve_leave(
        &self,
        id: u64,
        resolution: &LeaveResolution,
    ) -> AppResult<LeaveRequest> {
        let mut state = self.state()?;
        let leave = state
            .leave
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;
        leave.resolve(resolution)?;
        Ok(leave.clone())
    }

    async fn insert_training(&self, new: NewTraining) -> AppResult<TrainingRecord> {
        let mut state = self.state()?;
        state.require_user(new.created_by)?;

        let id = state.next_id();
        let training = TrainingRecord {
            id,
            title: new.title,
            description: new.description,
            trainer: new.trainer,
            location: new.location,
            training_date: new.training_date,
            duration_minutes: new.duration_minutes,
            created_by: Some(new.created_by),
            created_at: Utc::now(),
        };
        state.trainings.insert(id, training.clone());
        Ok(training)
    }

    async fn find_training(&self, id: u64) -> AppResult<Option<TrainingRecord>> {
        Ok(self.state()?.trainings.get(&id).cloned())
    }

    async fn list_trainings(&self) -> AppResult<Vec<TrainingRecord>> {
        let mut rows: Vec<TrainingRecord> = self.state()?.trainings.values().cloned().collect();
        rows.sort_by(|a, b| b.training_date.cmp(&a.training_date));
        Ok(rows)
    }

    async fn register_attendee(
        &self,
        training_id: u64,
        user_id: u64,
    ) -> AppResult<TrainingAttendee> {
        let mut state = self.state()?;
        state.require_training(training_id)?;
        state.require_user(user_id)?;
        if let Some(existing) = state.attendee_mut(training_id, user_id) {
            return Ok(existing.clone());
        }
        Ok(state.set_attendee(training_id, user_id, AttendeeStatus::Registered))
    }

    async fn set_attendee_status(
        &self,
        training_id: u64,
        user_id: u64,
        status: AttendeeStatus,
    ) -> AppResult<TrainingAttendee> {
        let mut state = self.state()?;
        state.require_training(training_id)?;
        state.require_user(user_id)?;
        Ok(state.set_attendee(training_id, user_id, status))
    }

    async fn list_attendees(&self, training_id: u64) -> AppResult<Vec<TrainingAttendee>> {
        Ok(self
            .state()?
            .attendees
            .values()
            .filter(|a| a.training_id == training_id)
            .cloned()
            .collect())
    }

    async fn insert_assessment(&self, new: NewAssessment) -> AppResult<TrainingAssessment> {
        let mut state = self.state()?;
        state.require_training(new.training_id)?;
        state.require_user(new.user_id)?;
        state.require_user(new.assessor_id)?;

        let id = state.next_id();
        let assessment = TrainingAssessment {
            id,
            training_id: new.training_id,
            user_id: new.user_id,
            assessor_id: new.assessor_id,
            scores: new.scores,
            total_score: new.scores.total(),
            status: new.scores.result(),
            comments: new.comments,
            created_at: Utc::now(),
        };
        state.assessments.insert(id, assessment.clone());
        Ok(assessment)
    }

    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
    ) -> AppResult<Vec<TrainingAssessment>> {
        Ok(self
            .state()?
            .assessments
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect())
    }

    async fn submit_feedback(
        &self,
        new: NewFeedback,
    ) -> AppResult<(TrainingFeedback, TrainingAttendee)> {
        let mut state = self.state()?;
        // both checks run before either write so a failure leaves nothing behind
        state.require_training(new.training_id)?;
        state.require_user(new.user_id)?;

        let id = state.next_id();
        let feedback = TrainingFeedback {
            id,
            training_id: new.training_id,
            user_id: new.user_id,
            answers: new.answers,
            most_valuable: new.most_valuable,
            improvements: new.improvements,
            comments: new.comments,
            submitted_at: new.submitted_at,
        };
        state.feedback.insert(id, feedback.clone());
        let attendee = state.set_attendee(new.training_id, new.user_id, AttendeeStatus::Present);
        Ok((feedback, attendee))
    }

    async fn list_feedback(&self, training_id: Option<u64>) -> AppResult<Vec<TrainingFeedback>> {
        Ok(self
            .state()?
            .feedback
            .values()
            .filter(|f| training_id.is_none_or(|id| f.training_id == id))
            .cloned()
            .collect())
    }
}
