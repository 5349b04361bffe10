use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use futures_util::StreamExt;
use sqlx::{Executor, MySql, MySqlPool};

use super::{Page, Store};
use crate::error::{AppError, AppResult};
use crate::model::attendance::{Attendance, AttendanceFilter, AttendancePatch, AttendanceUpsert};
use crate::model::leave_request::{LeaveFilter, LeaveRequest, LeaveResolution, NewLeaveRequest};
use crate::model::training::{
    AssessmentFilter, AttendeeStatus, NewAssessment, NewFeedback, NewTraining, TrainingAssessment,
    TrainingAttendee, TrainingFeedback, TrainingRecord,
};
use crate::model::user::{NewUser, User, UserFilter, UserPatch, like_pattern};
use crate::utils::db_utils::{UpdateBuilder, execute_update};

const USER_COLUMNS: &str = "id, username, email, name, role, department, position, employee_id, \
     qr_code, join_date, is_active, password_hash, last_login_at, created_at";

const ATTENDANCE_COLUMNS: &str = "id, user_id, date, check_in, check_out, status, check_in_method, \
     check_out_method, notes, created_at, updated_at";

const LEAVE_COLUMNS: &str = "id, user_id, start_date, end_date, leave_type, reason, status, \
     request_date, approver_id, response_date, response_notes";

const TRAINING_COLUMNS: &str = "id, title, description, trainer, location, training_date, \
     duration_minutes, created_by, created_at";

const ATTENDEE_COLUMNS: &str = "id, training_id, user_id, status, updated_at";

const ASSESSMENT_COLUMNS: &str = "id, training_id, user_id, assessor_id, punctuality, \
     participation, comprehension, practical_application, teamwork, communication, \
     safety_awareness, attitude, total_score, status, comments, created_at";

const FEEDBACK_COLUMNS: &str = "id, training_id, user_id, objectives_met, content_relevant, \
     trainer_effective, materials_useful, would_recommend, most_valuable, improvements, comments, \
     submitted_at";

// Helper enum for typed SQLx binding
enum FilterValue {
    U64(u64),
    Str(String),
    Date(NaiveDate),
}

/// `WHERE` clause assembled from optional filters.
#[derive(Default)]
struct Conditions {
    clauses: Vec<&'static str>,
    args: Vec<FilterValue>,
}

impl Conditions {
    fn push(&mut self, clause: &'static str, args: impl IntoIterator<Item = FilterValue>) {
        self.clauses.push(clause);
        self.args.extend(args);
    }

    fn push_clause(&mut self, clause: &'static str) {
        self.clauses.push(clause);
    }

    fn sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }
}

macro_rules! bind_filters {
    ($query:expr, $args:expr) => {{
        let mut q = $query;
        for arg in $args {
            q = match arg {
                FilterValue::U64(v) => q.bind(*v),
                FilterValue::Str(s) => q.bind(s.as_str()),
                FilterValue::Date(d) => q.bind(*d),
            };
        }
        q
    }};
}

async fn attendee_row<'e, E>(
    executor: E,
    training_id: u64,
    user_id: u64,
) -> AppResult<TrainingAttendee>
where
    E: Executor<'e, Database = MySql>,
{
    let sql = format!(
        "SELECT {ATTENDEE_COLUMNS} FROM training_attendees WHERE training_id = ? AND user_id = ?"
    );
    let row = sqlx::query_as::<_, TrainingAttendee>(&sql)
        .bind(training_id)
        .bind(user_id)
        .fetch_one(executor)
        .await?;
    Ok(row)
}

/// MySQL backend. Multi-statement writes run in a transaction and lock the
/// affected row before the domain rule is applied.
#[derive(Clone)]
pub struct MySqlStore {
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }

    async fn user_by_id(&self, id: u64) -> AppResult<User> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql).bind(id).fetch_one(&self.pool).await?)
    }

    async fn fetch_user_where(&self, column: &'static str, value: &str) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE {column} = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn leave_by_id(&self, id: u64) -> AppResult<LeaveRequest> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        Ok(sqlx::query_as::<_, LeaveRequest>(&sql).bind(id).fetch_one(&self.pool).await?)
    }

    async fn training_by_id(&self, id: u64) -> AppResult<TrainingRecord> {
        let sql = format!("SELECT {TRAINING_COLUMNS} FROM training_records WHERE id = ?");
        Ok(sqlx::query_as::<_, TrainingRecord>(&sql).bind(id).fetch_one(&self.pool).await?)
    }
}

#[async_trait]
impl Store for MySqlStore {
    async fn insert_user(&self, new: NewUser) -> AppResult<User> {
        let result = sqlx::query(
            r#"
            INSERT INTO users
                (username, email, name, role, department, position, employee_id, qr_code,
                 join_date, password_hash)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.username)
        .bind(&new.email)
        .bind(&new.name)
        .bind(new.role)
        .bind(&new.department)
        .bind(&new.position)
        .bind(&new.employee_id)
        .bind(&new.qr_code)
        .bind(new.join_date)
        .bind(&new.password_hash)
        .execute(&self.pool)
        .await?;

        self.user_by_id(result.last_insert_id()).await
    }

    async fn find_user(&self, id: u64) -> AppResult<Option<User>> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?");
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_user_by_username(&self, username: &str) -> AppResult<Option<User>> {
        self.fetch_user_where("username", username).await
    }

    async fn list_users(&self, filter: &UserFilter) -> AppResult<Vec<User>> {
        let mut conditions = Conditions::default();
        if !filter.include_inactive {
            conditions.push_clause("is_active = TRUE");
        }
        if let Some(department) = &filter.department {
            conditions.push("department = ?", [FilterValue::Str(department.clone())]);
        }
        if let Some(q) = &filter.query {
            let like = like_pattern(q);
            conditions.push(
                "(username LIKE ? OR name LIKE ? OR email LIKE ? OR employee_id LIKE ?)",
                std::iter::repeat_with(|| FilterValue::Str(like.clone())).take(4),
            );
        }

        let sql = format!("SELECT {USER_COLUMNS} FROM users{} ORDER BY id", conditions.sql());
        let query = bind_filters!(sqlx::query_as::<_, User>(&sql), &conditions.args);
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update_user(&self, id: u64, patch: &UserPatch) -> AppResult<Option<User>> {
        let update = UpdateBuilder::new("users")
            .set("username", patch.username.clone())
            .set("email", patch.email.clone())
            .set("name", patch.name.clone())
            .set("role", patch.role.map(|r| r.as_ref().to_string()))
            .set("department", patch.department.clone())
            .set("position", patch.position.clone())
            .set("employee_id", patch.employee_id.clone())
            .set("qr_code", patch.qr_code.clone())
            .set("join_date", patch.join_date)
            .set("is_active", patch.is_active)
            .set("password_hash", patch.password_hash.clone())
            .build("id", id);

        if let Some(update) = update {
            execute_update(&self.pool, update).await?;
        }
        self.find_user(id).await
    }

    async fn deactivate_user(&self, id: u64) -> AppResult<bool> {
        if self.find_user(id).await?.is_none() {
            return Ok(false);
        }
        sqlx::query("UPDATE users SET is_active = FALSE WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(true)
    }

    async fn purge_user(&self, id: u64) -> AppResult<bool> {
        let mut tx = self.pool.begin().await?;

        // children first, to satisfy the foreign keys
        for sql in [
            "DELETE FROM attendance WHERE user_id = ?",
            "DELETE FROM leave_requests WHERE user_id = ?",
            "DELETE FROM training_attendees WHERE user_id = ?",
            "DELETE FROM training_feedback WHERE user_id = ?",
            "DELETE FROM refresh_tokens WHERE user_id = ?",
        ] {
            sqlx::query(sql).bind(id).execute(&mut *tx).await?;
        }
        sqlx::query("DELETE FROM training_assessments WHERE user_id = ? OR assessor_id = ?")
            .bind(id)
            .bind(id)
            .execute(&mut *tx)
            .await?;

        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }

    async fn touch_last_login(&self, id: u64, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query("UPDATE users SET last_login_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn usernames_active_since(&self, since: DateTime<Utc>) -> AppResult<Vec<String>> {
        let mut stream = sqlx::query_as::<_, (String,)>(
            r#"
            SELECT username
            FROM users
            WHERE last_login_at >= ?
            ORDER BY last_login_at DESC
            "#,
        )
        .bind(since)
        .fetch(&self.pool);

        let mut usernames = Vec::new();
        while let Some(row) = stream.next().await {
            let (username,) = row?;
            usernames.push(username);
        }
        Ok(usernames)
    }

    async fn save_refresh_token(
        &self,
        user_id: u64,
        jti: &str,
        expires_at: DateTime<Utc>,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refresh_tokens (user_id, jti, expires_at)
            VALUES (?, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(jti)
        .bind(expires_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn revoke_refresh_token(&self, jti: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE refresh_tokens
            SET revoked = TRUE
            WHERE jti = ?
            AND revoked = FALSE
            AND expires_at > CURRENT_TIMESTAMP
            "#,
        )
        .bind(jti)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() == 1)
    }

    async fn upsert_attendance(&self, upsert: &AttendanceUpsert) -> AppResult<Attendance> {
        let mut tx = self.pool.begin().await?;

        // Claims the (user_id, date) key; a concurrent writer blocks here until we commit.
        sqlx::query(
            r#"
            INSERT INTO attendance (user_id, date, status)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(upsert.user_id)
        .bind(upsert.date)
        .bind(upsert.status)
        .execute(&mut *tx)
        .await?;

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ? FOR UPDATE"
        );
        let mut row = sqlx::query_as::<_, Attendance>(&sql)
            .bind(upsert.user_id)
            .bind(upsert.date)
            .fetch_one(&mut *tx)
            .await?;

        // an error here drops `tx`, rolling back the key claim above
        row.merge(upsert, Utc::now())?;

        sqlx::query(
            r#"
            UPDATE attendance
            SET check_in = ?, check_out = ?, status = ?, check_in_method = ?,
                check_out_method = ?, notes = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(row.check_in)
        .bind(row.check_out)
        .bind(row.status)
        .bind(row.check_in_method)
        .bind(row.check_out_method)
        .bind(&row.notes)
        .bind(row.updated_at)
        .bind(row.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row)
    }

    async fn find_attendance(&self, id: u64) -> AppResult<Option<Attendance>> {
        let sql = format!("SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE id = ?");
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_attendance_on(
        &self,
        user_id: u64,
        date: NaiveDate,
    ) -> AppResult<Option<Attendance>> {
        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance WHERE user_id = ? AND date = ?"
        );
        Ok(sqlx::query_as::<_, Attendance>(&sql)
            .bind(user_id)
            .bind(date)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_attendance(&self, filter: &AttendanceFilter) -> AppResult<Vec<Attendance>> {
        let mut conditions = Conditions::default();
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?", [FilterValue::U64(user_id)]);
        }
        if let Some(from) = filter.from {
            conditions.push("date >= ?", [FilterValue::Date(from)]);
        }
        if let Some(to) = filter.to {
            conditions.push("date <= ?", [FilterValue::Date(to)]);
        }

        let sql = format!(
            "SELECT {ATTENDANCE_COLUMNS} FROM attendance{} ORDER BY date DESC, user_id",
            conditions.sql()
        );
        let query = bind_filters!(sqlx::query_as::<_, Attendance>(&sql), &conditions.args);
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn update_attendance(
        &self,
        id: u64,
        patch: &AttendancePatch,
    ) -> AppResult<Option<Attendance>> {
        let update = UpdateBuilder::new("attendance")
            .set("check_in", patch.check_in)
            .set("check_out", patch.check_out)
            .set("status", patch.status.map(|s| s.as_ref().to_string()))
            .set("check_in_method", patch.check_in_method.map(|m| m.as_ref().to_string()))
            .set("check_out_method", patch.check_out_method.map(|m| m.as_ref().to_string()))
            .set("notes", patch.notes.clone())
            .touch("updated_at")
            .build("id", id);

        if let Some(update) = update {
            execute_update(&self.pool, update).await?;
        }
        self.find_attendance(id).await
    }

    async fn insert_leave(&self, new: NewLeaveRequest) -> AppResult<LeaveRequest> {
        let result = sqlx::query(
            r#"
            INSERT INTO leave_requests
                (user_id, start_date, end_date, leave_type, reason, status, request_date)
            VALUES (?, ?, ?, ?, ?, 'pending', ?)
            "#,
        )
        .bind(new.user_id)
        .bind(new.start_date)
        .bind(new.end_date)
        .bind(new.leave_type)
        .bind(&new.reason)
        .bind(new.request_date)
        .execute(&self.pool)
        .await?;

        self.leave_by_id(result.last_insert_id()).await
    }

    async fn find_leave(&self, id: u64) -> AppResult<Option<LeaveRequest>> {
        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ?");
        Ok(sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_leave(
        &self,
        filter: &LeaveFilter,
        page: Page,
    ) -> AppResult<(Vec<LeaveRequest>, i64)> {
        let mut conditions = Conditions::default();
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?", [FilterValue::U64(user_id)]);
        }
        if let Some(status) = filter.status {
            conditions.push("status = ?", [FilterValue::Str(status.as_ref().to_string())]);
        }
        let where_sql = conditions.sql();

        // -------------------------
        // COUNT query
        // -------------------------
        let count_sql = format!("SELECT COUNT(*) FROM leave_requests{}", where_sql);
        let count_q = bind_filters!(sqlx::query_scalar::<_, i64>(&count_sql), &conditions.args);
        let total = count_q.fetch_one(&self.pool).await?;

        // -------------------------
        // DATA query
        // -------------------------
        let data_sql = format!(
            r#"
            SELECT {LEAVE_COLUMNS}
            FROM leave_requests
            {}
            ORDER BY request_date DESC, id DESC
            LIMIT ? OFFSET ?
            "#,
            where_sql
        );
        let data_q = bind_filters!(sqlx::query_as::<_, LeaveRequest>(&data_sql), &conditions.args);
        let leaves = data_q
            .bind(page.per_page)
            .bind(page.offset())
            .fetch_all(&self.pool)
            .await?;

        Ok((leaves, total))
    }

    async fn resolve_leave(
        &self,
        id: u64,
        resolution: &LeaveResolution,
    ) -> AppResult<LeaveRequest> {
        let mut tx = self.pool.begin().await?;

        let sql = format!("SELECT {LEAVE_COLUMNS} FROM leave_requests WHERE id = ? FOR UPDATE");
        let mut leave = sqlx::query_as::<_, LeaveRequest>(&sql)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::not_found("Leave request not found"))?;

        leave.resolve(resolution)?;

        sqlx::query(
            r#"
            UPDATE leave_requests
            SET status = ?, approver_id = ?, response_date = ?, response_notes = ?
            WHERE id = ?
            "#,
        )
        .bind(leave.status)
        .bind(leave.approver_id)
        .bind(leave.response_date)
        .bind(&leave.response_notes)
        .bind(leave.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(leave)
    }

    async fn insert_training(&self, new: NewTraining) -> AppResult<TrainingRecord> {
        let result = sqlx::query(
            r#"
            INSERT INTO training_records
                (title, description, trainer, location, training_date, duration_minutes, created_by)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.title)
        .bind(&new.description)
        .bind(&new.trainer)
        .bind(&new.location)
        .bind(new.training_date)
        .bind(new.duration_minutes)
        .bind(new.created_by)
        .execute(&self.pool)
        .await?;

        self.training_by_id(result.last_insert_id()).await
    }

    async fn find_training(&self, id: u64) -> AppResult<Option<TrainingRecord>> {
        let sql = format!("SELECT {TRAINING_COLUMNS} FROM training_records WHERE id = ?");
        Ok(sqlx::query_as::<_, TrainingRecord>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_trainings(&self) -> AppResult<Vec<TrainingRecord>> {
        let sql = format!(
            "SELECT {TRAINING_COLUMNS} FROM training_records ORDER BY training_date DESC, id DESC"
        );
        Ok(sqlx::query_as::<_, TrainingRecord>(&sql).fetch_all(&self.pool).await?)
    }

    async fn register_attendee(
        &self,
        training_id: u64,
        user_id: u64,
    ) -> AppResult<TrainingAttendee> {
        sqlx::query(
            r#"
            INSERT INTO training_attendees (training_id, user_id, status)
            VALUES (?, ?, 'registered')
            ON DUPLICATE KEY UPDATE id = id
            "#,
        )
        .bind(training_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        attendee_row(&self.pool, training_id, user_id).await
    }

    async fn set_attendee_status(
        &self,
        training_id: u64,
        user_id: u64,
        status: AttendeeStatus,
    ) -> AppResult<TrainingAttendee> {
        sqlx::query(
            r#"
            INSERT INTO training_attendees (training_id, user_id, status)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(training_id)
        .bind(user_id)
        .bind(status)
        .execute(&self.pool)
        .await?;

        attendee_row(&self.pool, training_id, user_id).await
    }

    async fn list_attendees(&self, training_id: u64) -> AppResult<Vec<TrainingAttendee>> {
        let sql = format!(
            "SELECT {ATTENDEE_COLUMNS} FROM training_attendees WHERE training_id = ? ORDER BY id"
        );
        Ok(sqlx::query_as::<_, TrainingAttendee>(&sql)
            .bind(training_id)
            .fetch_all(&self.pool)
            .await?)
    }

    async fn insert_assessment(&self, new: NewAssessment) -> AppResult<TrainingAssessment> {
        let s = new.scores;
        let result = sqlx::query(
            r#"
            INSERT INTO training_assessments
                (training_id, user_id, assessor_id, punctuality, participation, comprehension,
                 practical_application, teamwork, communication, safety_awareness, attitude,
                 total_score, status, comments)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.training_id)
        .bind(new.user_id)
        .bind(new.assessor_id)
        .bind(s.punctuality)
        .bind(s.participation)
        .bind(s.comprehension)
        .bind(s.practical_application)
        .bind(s.teamwork)
        .bind(s.communication)
        .bind(s.safety_awareness)
        .bind(s.attitude)
        .bind(s.total())
        .bind(s.result())
        .bind(&new.comments)
        .execute(&self.pool)
        .await?;

        let sql = format!("SELECT {ASSESSMENT_COLUMNS} FROM training_assessments WHERE id = ?");
        Ok(sqlx::query_as::<_, TrainingAssessment>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&self.pool)
            .await?)
    }

    async fn list_assessments(
        &self,
        filter: &AssessmentFilter,
    ) -> AppResult<Vec<TrainingAssessment>> {
        let mut conditions = Conditions::default();
        if let Some(training_id) = filter.training_id {
            conditions.push("training_id = ?", [FilterValue::U64(training_id)]);
        }
        if let Some(user_id) = filter.user_id {
            conditions.push("user_id = ?", [FilterValue::U64(user_id)]);
        }

        let sql = format!(
            "SELECT {ASSESSMENT_COLUMNS} FROM training_assessments{} ORDER BY id",
            conditions.sql()
        );
        let query = bind_filters!(sqlx::query_as::<_, TrainingAssessment>(&sql), &conditions.args);
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn submit_feedback(
        &self,
        new: NewFeedback,
    ) -> AppResult<(TrainingFeedback, TrainingAttendee)> {
        let mut tx = self.pool.begin().await?;

        let a = new.answers;
        let result = sqlx::query(
            r#"
            INSERT INTO training_feedback
                (training_id, user_id, objectives_met, content_relevant, trainer_effective,
                 materials_useful, would_recommend, most_valuable, improvements, comments,
                 submitted_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.training_id)
        .bind(new.user_id)
        .bind(a.objectives_met)
        .bind(a.content_relevant)
        .bind(a.trainer_effective)
        .bind(a.materials_useful)
        .bind(a.would_recommend)
        .bind(&new.most_valuable)
        .bind(&new.improvements)
        .bind(&new.comments)
        .bind(new.submitted_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO training_attendees (training_id, user_id, status)
            VALUES (?, ?, ?)
            ON DUPLICATE KEY UPDATE status = VALUES(status), updated_at = CURRENT_TIMESTAMP
            "#,
        )
        .bind(new.training_id)
        .bind(new.user_id)
        .bind(AttendeeStatus::Present)
        .execute(&mut *tx)
        .await?;

        let sql = format!("SELECT {FEEDBACK_COLUMNS} FROM training_feedback WHERE id = ?");
        let feedback = sqlx::query_as::<_, TrainingFeedback>(&sql)
            .bind(result.last_insert_id())
            .fetch_one(&mut *tx)
            .await?;
        let attendee = attendee_row(&mut *tx, new.training_id, new.user_id).await?;

        tx.commit().await?;
        Ok((feedback, attendee))
    }

    async fn list_feedback(&self, training_id: Option<u64>) -> AppResult<Vec<TrainingFeedback>> {
        let mut conditions = Conditions::default();
        if let Some(training_id) = training_id {
            conditions.push("training_id = ?", [FilterValue::U64(training_id)]);
        }

        let sql = format!(
            "SELECT {FEEDBACK_COLUMNS} FROM training_feedback{} \
             ORDER BY submitted_at DESC, id DESC",
            conditions.sql()
        );
        let query = bind_filters!(sqlx::query_as::<_, TrainingFeedback>(&sql), &conditions.args);
        Ok(query.fetch_all(&self.pool).await?)
    }
}
