use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display, EnumString};
use utoipa::ToSchema;

use crate::error::{AppError, AppResult};

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    HalfDay,
    OnLeave,
}

#[derive(
    Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize, ToSchema, EnumString, Display,
    AsRefStr,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum CheckMethod {
    QrCode,
    Biometric,
    Manual,
    GeoLocation,
}

/// One row per user per calendar date.
#[derive(Debug, Clone, PartialEq, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Attendance {
    pub id: u64,
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub check_in_method: Option<CheckMethod>,
    pub check_out_method: Option<CheckMethod>,
    pub notes: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

/// Body of `POST /attendance` and one item of the bulk variant.
#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "userId": 5,
    "date": "2025-05-01",
    "checkIn": "2025-05-01T08:55:00Z",
    "status": "present",
    "method": "manual"
}))]
pub struct RecordAttendance {
    pub user_id: u64,
    #[schema(value_type = String, format = "date")]
    pub date: NaiveDate,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    /// Defaults to `manual`.
    pub method: Option<CheckMethod>,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAttendance {
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_in: Option<DateTime<Utc>>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<AttendanceStatus>,
    pub check_in_method: Option<CheckMethod>,
    pub check_out_method: Option<CheckMethod>,
    pub notes: Option<String>,
}

impl From<UpdateAttendance> for AttendancePatch {
    fn from(u: UpdateAttendance) -> Self {
        Self {
            check_in: u.check_in,
            check_out: u.check_out,
            status: u.status,
            check_in_method: u.check_in_method,
            check_out_method: u.check_out_method,
            notes: u.notes,
        }
    }
}

/// A submission for the (user, date) natural key.
#[derive(Debug, Clone)]
pub struct AttendanceUpsert {
    pub user_id: u64,
    pub date: NaiveDate,
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: AttendanceStatus,
    pub method: CheckMethod,
    pub notes: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AttendancePatch {
    pub check_in: Option<DateTime<Utc>>,
    pub check_out: Option<DateTime<Utc>>,
    pub status: Option<AttendanceStatus>,
    pub check_in_method: Option<CheckMethod>,
    pub check_out_method: Option<CheckMethod>,
    pub notes: Option<String>,
}

impl AttendancePatch {
    pub fn is_empty(&self) -> bool {
        self.check_in.is_none()
            && self.check_out.is_none()
            && self.status.is_none()
            && self.check_in_method.is_none()
            && self.check_out_method.is_none()
            && self.notes.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct AttendanceFilter {
    pub user_id: Option<u64>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl AttendanceFilter {
    pub fn on(date: NaiveDate) -> Self {
        Self {
            user_id: None,
            from: Some(date),
            to: Some(date),
        }
    }

    pub fn matches(&self, row: &Attendance) -> bool {
        self.user_id.is_none_or(|id| row.user_id == id)
            && self.from.is_none_or(|from| row.date >= from)
            && self.to.is_none_or(|to| row.date <= to)
    }
}

/// A day's check-out may not precede its check-in.
pub fn ensure_ordered(
    check_in: Option<DateTime<Utc>>,
    check_out: Option<DateTime<Utc>>,
) -> AppResult<()> {
    match (check_in, check_out) {
        (Some(check_in), Some(check_out)) if check_out < check_in => {
            Err(AppError::validation("checkOut must not be before checkIn"))
        }
        _ => Ok(()),
    }
}

impl Attendance {
    /// Empty row for a key that has no record yet; `merge` fills it in.
    pub fn blank(id: u64, upsert: &AttendanceUpsert, now: DateTime<Utc>) -> Self {
        Self {
            id,
            user_id: upsert.user_id,
            date: upsert.date,
            check_in: None,
            check_out: None,
            status: upsert.status,
            check_in_method: None,
            check_out_method: None,
            notes: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Folds a re-submission for the same (user, date) into this row.
    /// Leaves the row untouched when the merged times would be out of order.
    pub fn merge(&mut self, upsert: &AttendanceUpsert, now: DateTime<Utc>) -> AppResult<()> {
        ensure_ordered(
            upsert.check_in.or(self.check_in),
            upsert.check_out.or(self.check_out),
        )?;

        self.status = upsert.status;

        if let Some(check_in) = upsert.check_in {
            self.check_in = Some(check_in);
            self.check_in_method = Some(upsert.method);
        }
        if let Some(check_out) = upsert.check_out {
            self.check_out = Some(check_out);
            self.check_out_method = Some(upsert.method);
        }
        if upsert.check_in.is_none()
            && upsert.check_out.is_none()
            && self.check_in_method.is_none()
        {
            self.check_in_method = Some(upsert.method);
        }
        if let Some(notes) = &upsert.notes {
            self.notes = Some(notes.clone());
        }

        self.updated_at = now;
        Ok(())
    }

    pub fn apply(&mut self, patch: &AttendancePatch, now: DateTime<Utc>) {
        if let Some(v) = patch.check_in {
            self.check_in = Some(v);
        }
        if let Some(v) = patch.check_out {
            self.check_out = Some(v);
        }
        if let Some(v) = patch.status {
            self.status = v;
        }
        if let Some(v) = patch.check_in_method {
            self.check_in_method = Some(v);
        }
        if let Some(v) = patch.check_out_method {
            self.check_out_method = Some(v);
        }
        if let Some(v) = &patch.notes {
            self.notes = Some(v.clone());
        }
        self.updated_at = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn upsert(
        check_in: Option<DateTime<Utc>>,
        check_out: Option<DateTime<Utc>>,
    ) -> AttendanceUpsert {
        AttendanceUpsert {
            user_id: 7,
            date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            check_in,
            check_out,
            status: AttendanceStatus::Present,
            method: CheckMethod::QrCode,
            notes: None,
        }
    }

    #[test]
    fn merge_keeps_fields_not_resubmitted() {
        let now = Utc::now();
        let morning = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let evening = Utc.with_ymd_and_hms(2025, 5, 1, 17, 30, 0).unwrap();

        let first = upsert(Some(morning), None);
        let mut row = Attendance::blank(1, &first, now);
        row.merge(&first, now).unwrap();

        let mut second = upsert(None, Some(evening));
        second.method = CheckMethod::Biometric;
        second.notes = Some("left early".into());
        row.merge(&second, now).unwrap();

        assert_eq!(row.check_in, Some(morning));
        assert_eq!(row.check_in_method, Some(CheckMethod::QrCode));
        assert_eq!(row.check_out, Some(evening));
        assert_eq!(row.check_out_method, Some(CheckMethod::Biometric));
        assert_eq!(row.notes.as_deref(), Some("left early"));
    }

    #[test]
    fn merge_replaces_status() {
        let now = Utc::now();
        let first = upsert(None, None);
        let mut row = Attendance::blank(1, &first, now);
        row.merge(&first, now).unwrap();
        assert_eq!(row.check_in_method, Some(CheckMethod::QrCode));

        let mut second = upsert(None, None);
        second.status = AttendanceStatus::Absent;
        second.method = CheckMethod::Manual;
        row.merge(&second, now).unwrap();

        assert_eq!(row.status, AttendanceStatus::Absent);
        // an existing method is not clobbered by a status-only submission
        assert_eq!(row.check_in_method, Some(CheckMethod::QrCode));
    }

    #[test]
    fn merge_rejects_check_out_before_stored_check_in() {
        let now = Utc::now();
        let morning = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
        let dawn = Utc.with_ymd_and_hms(2025, 5, 1, 7, 0, 0).unwrap();

        let first = upsert(Some(morning), None);
        let mut row = Attendance::blank(1, &first, now);
        row.merge(&first, now).unwrap();

        let err = row.merge(&upsert(None, Some(dawn)), now).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert_eq!(row.check_in, Some(morning));
        assert_eq!(row.check_out, None);
    }

    #[test]
    fn status_names_are_snake_case() {
        assert_eq!(AttendanceStatus::HalfDay.as_ref(), "half_day");
        assert_eq!("on_leave".parse::<AttendanceStatus>().unwrap(), AttendanceStatus::OnLeave);
        assert_eq!(CheckMethod::GeoLocation.to_string(), "geo_location");
    }
}
