use chrono::{DateTime, Duration, Local, NaiveDate, NaiveTime, Utc};
use serde_json::json;

use super::bulk::{self, BulkSummary};
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{
    Attendance, AttendanceFilter, AttendancePatch, AttendanceStatus, AttendanceUpsert, CheckMethod,
    RecordAttendance, ensure_ordered,
};
use crate::model::user::User;
use crate::store::Store;

/// Decides whether a check-in counts as `late`.
#[derive(Debug, Clone, Copy)]
pub struct AttendancePolicy {
    pub workday_start: NaiveTime,
    pub late_grace: Duration,
}

impl AttendancePolicy {
    pub fn new(workday_start: NaiveTime, late_grace_minutes: u32) -> Self {
        Self {
            workday_start,
            late_grace: Duration::minutes(i64::from(late_grace_minutes)),
        }
    }

    pub fn status_for(&self, local_time: NaiveTime) -> AttendanceStatus {
        let (cutoff, wrapped) = self.workday_start.overflowing_add_signed(self.late_grace);
        if wrapped == 0 && local_time > cutoff {
            AttendanceStatus::Late
        } else {
            AttendanceStatus::Present
        }
    }
}

impl Default for AttendancePolicy {
    fn default() -> Self {
        Self::new(NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN), 15)
    }
}

/// Manual record, or one item of a bulk marking. Upserts by (user, date).
pub async fn record_attendance(
    store: &dyn Store,
    input: RecordAttendance,
) -> AppResult<Attendance> {
    ensure_ordered(input.check_in, input.check_out)?;

    if store.find_user(input.user_id).await?.is_none() {
        return Err(AppError::not_found(format!("User {} not found", input.user_id)));
    }

    store
        .upsert_attendance(&AttendanceUpsert {
            user_id: input.user_id,
            date: input.date,
            check_in: input.check_in,
            check_out: input.check_out,
            status: input.status,
            method: input.method.unwrap_or(CheckMethod::Manual),
            notes: input.notes,
        })
        .await
}

pub async fn bulk_record(
    store: &dyn Store,
    records: Vec<RecordAttendance>,
) -> BulkSummary<Attendance> {
    bulk::run(
        "userId",
        records,
        |r| json!(r.user_id),
        |r| record_attendance(store, r),
    )
    .await
}

pub async fn check_in(
    store: &dyn Store,
    policy: &AttendancePolicy,
    user: &User,
    method: CheckMethod,
    qr_code: Option<&str>,
    now: DateTime<Local>,
) -> AppResult<Attendance> {
    if method == CheckMethod::QrCode {
        match (qr_code, user.qr_code.as_deref()) {
            (Some(presented), Some(expected)) if presented == expected => {}
            (None, _) => {
                return Err(AppError::validation("qrCode is required for qr_code check-in"));
            }
            _ => return Err(AppError::validation("Invalid QR code")),
        }
    }

    let row = store
        .upsert_attendance(&AttendanceUpsert {
            user_id: user.id,
            date: now.date_naive(),
            check_in: Some(now.with_timezone(&Utc)),
            check_out: None,
            status: policy.status_for(now.time()),
            method,
            notes: None,
        })
        .await?;

    tracing::info!(
        user_id = user.id,
        date = %row.date,
        status = %row.status,
        %method,
        "Checked in"
    );
    Ok(row)
}

pub async fn check_out(
    store: &dyn Store,
    user_id: u64,
    method: CheckMethod,
    now: DateTime<Local>,
) -> AppResult<Attendance> {
    let row = store
        .find_attendance_on(user_id, now.date_naive())
        .await?
        .filter(|row| row.check_in.is_some())
        .ok_or_else(|| AppError::validation("No active check-in found for today"))?;

    let patch = AttendancePatch {
        check_out: Some(now.with_timezone(&Utc)),
        check_out_method: Some(method),
        ..AttendancePatch::default()
    };

    let row = store
        .update_attendance(row.id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Attendance {} not found", row.id)))?;

    tracing::info!(user_id, date = %row.date, %method, "Checked out");
    Ok(row)
}

pub async fn update_attendance(
    store: &dyn Store,
    id: u64,
    patch: AttendancePatch,
) -> AppResult<Attendance> {
    let current = store
        .find_attendance(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Attendance {id} not found")))?;

    if patch.is_empty() {
        return Ok(current);
    }

    ensure_ordered(
        patch.check_in.or(current.check_in),
        patch.check_out.or(current.check_out),
    )?;

    store
        .update_attendance(id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Attendance {id} not found")))
}

/// Managers see the whole company, everyone else only their own row.
pub async fn today(
    store: &dyn Store,
    caller: &AuthUser,
    today: NaiveDate,
) -> AppResult<Vec<Attendance>> {
    let mut filter = AttendanceFilter::on(today);
    if !caller.role.is_manager_or_admin() {
        filter.user_id = Some(caller.user_id);
    }
    store.list_attendance(&filter).await
}

pub async fn user_attendance(
    store: &dyn Store,
    user_id: u64,
    date: Option<NaiveDate>,
    start_date: Option<NaiveDate>,
    end_date: Option<NaiveDate>,
) -> AppResult<Vec<Attendance>> {
    let filter = match date {
        Some(date) => AttendanceFilter {
            user_id: Some(user_id),
            ..AttendanceFilter::on(date)
        },
        None => {
            if let (Some(start), Some(end)) = (start_date, end_date) {
                if start > end {
                    return Err(AppError::validation("startDate must not be after endDate"));
                }
            }
            AttendanceFilter {
                user_id: Some(user_id),
                from: start_date,
                to: end_date,
            }
        }
    };

    store.list_attendance(&filter).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;
    use crate::service::fixtures::seed_user;
    use crate::store::MemoryStore;
    use chrono::TimeZone;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 5, d).unwrap()
    }

    fn at(d: u32, h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 5, d, h, m, 0).unwrap()
    }

    fn local(h: u32, m: u32) -> DateTime<Local> {
        Local.with_ymd_and_hms(2025, 5, 2, h, m, 0).unwrap()
    }

    fn record(user_id: u64, date: NaiveDate, status: AttendanceStatus) -> RecordAttendance {
        RecordAttendance {
            user_id,
            date,
            check_in: None,
            check_out: None,
            status,
            method: None,
            notes: None,
        }
    }

    #[test]
    fn late_after_grace_period() {
        let policy = AttendancePolicy::default();
        let t = |h, m| NaiveTime::from_hms_opt(h, m, 0).unwrap();

        assert_eq!(policy.status_for(t(8, 30)), AttendanceStatus::Present);
        assert_eq!(policy.status_for(t(9, 15)), AttendanceStatus::Present);
        assert_eq!(policy.status_for(t(9, 16)), AttendanceStatus::Late);
    }

    #[actix_web::test]
    async fn second_submission_updates_the_same_row() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ann", Role::Employee).await;

        let mut first = record(user.id, day(1), AttendanceStatus::Present);
        first.check_in = Some(at(1, 8, 55));
        let a = record_attendance(&store, first).await.unwrap();

        let mut second = record(user.id, day(1), AttendanceStatus::HalfDay);
        second.check_out = Some(at(1, 13, 0));
        second.notes = Some("left early".into());
        let b = record_attendance(&store, second).await.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(b.status, AttendanceStatus::HalfDay);
        assert_eq!(b.check_in, Some(at(1, 8, 55)));
        assert_eq!(b.check_out, Some(at(1, 13, 0)));

        let rows = user_attendance(&store, user.id, Some(day(1)), None, None).await.unwrap();
        assert_eq!(rows.len(), 1);
    }

    #[actix_web::test]
    async fn unknown_user_is_not_found() {
        let store = MemoryStore::new();
        let err = record_attendance(&store, record(42, day(1), AttendanceStatus::Absent))
            .await
            .unwrap_err();
        assert_eq!(err, AppError::not_found("User 42 not found"));
    }

    #[actix_web::test]
    async fn check_out_before_check_in_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ann", Role::Employee).await;
        let mut input = record(user.id, day(1), AttendanceStatus::Present);
        input.check_in = Some(at(1, 9, 0));
        input.check_out = Some(at(1, 8, 0));

        assert!(matches!(record_attendance(&store, input).await, Err(AppError::Validation(_))));
        assert!(store.find_attendance_on(user.id, day(1)).await.unwrap().is_none());
    }

    #[actix_web::test]
    async fn resubmitted_check_out_before_stored_check_in_is_rejected() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "ann", Role::Employee).await;

        let mut first = record(user.id, day(1), AttendanceStatus::Present);
        first.check_in = Some(at(1, 9, 0));
        record_attendance(&store, first).await.unwrap();

        let mut second = record(user.id, day(1), AttendanceStatus::Present);
        second.check_out = Some(at(1, 7, 0));
        let err = record_attendance(&store, second).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let row = store.find_attendance_on(user.id, day(1)).await.unwrap().unwrap();
        assert_eq!(row.check_in, Some(at(1, 9, 0)));
        assert_eq!(row.check_out, None);
    }

    #[actix_web::test]
    async fn bulk_marking_keeps_going_past_missing_users() {
        let store = MemoryStore::new();
        let a = seed_user(&store, "a", Role::Employee).await;
        let b = seed_user(&store, "b", Role::Employee).await;

        let summary = bulk_record(
            &store,
            vec![
                record(a.id, day(3), AttendanceStatus::Present),
                record(999, day(3), AttendanceStatus::Present),
                record(b.id, day(3), AttendanceStatus::OnLeave),
            ],
        )
        .await;

        assert_eq!((summary.processed, summary.successful, summary.failed), (3, 2, 1));
        assert_eq!(summary.errors[0].value, json!(999));
        assert_eq!(summary.results[0].check_in_method, Some(CheckMethod::Manual));
        assert_eq!(summary.results[1].status, AttendanceStatus::OnLeave);
    }

    #[actix_web::test]
    async fn qr_check_in_requires_matching_code() {
        let store = MemoryStore::new();
        let policy = AttendancePolicy::default();
        let user = seed_user(&store, "qr", Role::Employee).await;

        let err = check_in(
            &store,
            &policy,
            &user,
            CheckMethod::QrCode,
            Some("QR-other"),
            local(8, 50),
        )
            .await
            .unwrap_err();
        assert_eq!(err, AppError::validation("Invalid QR code"));

        let row = check_in(&store, &policy, &user, CheckMethod::QrCode, Some("QR-qr"), local(8, 50))
            .await
            .unwrap();
        assert_eq!(row.status, AttendanceStatus::Present);
        assert_eq!(row.check_in_method, Some(CheckMethod::QrCode));
    }

    #[actix_web::test]
    async fn late_check_in_then_check_out() {
        let store = MemoryStore::new();
        let policy = AttendancePolicy::default();
        let user = seed_user(&store, "late", Role::Employee).await;

        let row = check_in(&store, &policy, &user, CheckMethod::Biometric, None, local(9, 40))
            .await
            .unwrap();
        assert_eq!(row.status, AttendanceStatus::Late);

        let out = check_out(&store, user.id, CheckMethod::Biometric, local(17, 30)).await.unwrap();
        assert_eq!(out.id, row.id);
        assert_eq!(out.status, AttendanceStatus::Late);
        assert_eq!(out.check_out_method, Some(CheckMethod::Biometric));
        assert!(out.check_out.is_some());
    }

    #[actix_web::test]
    async fn check_out_without_check_in_fails() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "nobody", Role::Employee).await;
        let err = check_out(&store, user.id, CheckMethod::Manual, local(17, 0)).await.unwrap_err();
        assert_eq!(err, AppError::validation("No active check-in found for today"));
    }

    #[actix_web::test]
    async fn today_is_scoped_by_role() {
        let store = MemoryStore::new();
        let boss = seed_user(&store, "boss", Role::Manager).await;
        let worker = seed_user(&store, "worker", Role::Employee).await;
        for id in [boss.id, worker.id] {
            record_attendance(&store, record(id, day(5), AttendanceStatus::Present)).await.unwrap();
        }

        let as_manager = AuthUser {
            user_id: boss.id,
            username: boss.username,
            role: Role::Manager,
        };
        let as_employee = AuthUser {
            user_id: worker.id,
            username: worker.username,
            role: Role::Employee,
        };

        assert_eq!(today(&store, &as_manager, day(5)).await.unwrap().len(), 2);
        let own = today(&store, &as_employee, day(5)).await.unwrap();
        assert_eq!(own.len(), 1);
        assert_eq!(own[0].user_id, worker.id);
    }

    #[actix_web::test]
    async fn range_queries_validate_order() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "r", Role::Employee).await;
        for d in 1..=4 {
            record_attendance(&store, record(user.id, day(d), AttendanceStatus::Present))
                .await
                .unwrap();
        }

        let rows = user_attendance(&store, user.id, None, Some(day(2)), Some(day(3)))
            .await
            .unwrap();
        assert_eq!(rows.len(), 2);

        let err = user_attendance(&store, user.id, None, Some(day(4)), Some(day(1)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[actix_web::test]
    async fn update_rejects_inverted_times_and_unknown_rows() {
        let store = MemoryStore::new();
        let user = seed_user(&store, "u", Role::Employee).await;
        let mut input = record(user.id, day(1), AttendanceStatus::Present);
        input.check_in = Some(at(1, 9, 0));
        let row = record_attendance(&store, input).await.unwrap();

        let bad = AttendancePatch {
            check_out: Some(at(1, 7, 0)),
            ..AttendancePatch::default()
        };
        assert!(matches!(
            update_attendance(&store, row.id, bad).await,
            Err(AppError::Validation(_))
        ));

        let ok = AttendancePatch {
            status: Some(AttendanceStatus::Late),
            ..AttendancePatch::default()
        };
        let updated = update_attendance(&store, row.id, ok).await.unwrap();
        assert_eq!(updated.status, AttendanceStatus::Late);

        assert!(matches!(
            update_attendance(&store, 999, AttendancePatch::default()).await,
            Err(AppError::NotFound(_))
        ));
    }
}
