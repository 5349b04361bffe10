use crate::api::BulkResponse;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::attendance::{Attendance, CheckMethod, RecordAttendance, UpdateAttendance};
use crate::service::{attendance, users};
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckInRequest {
    pub method: CheckMethod,
    /// Required when `method` is `qr_code`
    pub qr_code: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct CheckOutRequest {
    pub method: Option<CheckMethod>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkAttendance {
    pub records: Vec<RecordAttendance>,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct UserAttendanceQuery {
    /// Single day; takes precedence over the range
    #[param(value_type = Option<String>, format = "date")]
    pub date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub start_date: Option<NaiveDate>,
    #[param(value_type = Option<String>, format = "date")]
    pub end_date: Option<NaiveDate>,
}

async fn active_caller(state: &AppState, auth: &AuthUser) -> AppResult<crate::model::user::User> {
    let user = users::get_user(state.store(), auth.user_id).await?;
    if !user.is_active {
        return Err(AppError::forbidden("Account is deactivated"));
    }
    Ok(user)
}

/* =========================
Check-in
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/check-in",
    request_body = CheckInRequest,
    responses(
        (status = 200, description = "Checked in", body = Attendance),
        (status = 400, description = "Invalid or missing QR code"),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_in(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CheckInRequest>,
) -> AppResult<impl Responder> {
    let user = active_caller(&state, &auth).await?;
    let row = attendance::check_in(
        state.store(),
        &state.policy,
        &user,
        payload.method,
        payload.qr_code.as_deref(),
        Local::now(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

/* =========================
Check-out
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance/check-out",
    request_body = CheckOutRequest,
    responses(
        (status = 200, description = "Checked out", body = Attendance),
        (status = 400, description = "No active check-in found for today",
         body = Object, example = json!({
            "success": false,
            "message": "No active check-in found for today"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn check_out(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CheckOutRequest>,
) -> AppResult<impl Responder> {
    let method = payload.method.unwrap_or(CheckMethod::Manual);
    let row = attendance::check_out(state.store(), auth.user_id, method, Local::now()).await?;
    Ok(HttpResponse::Ok().json(row))
}

/* =========================
Manual record (Manager/Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/attendance",
    request_body = RecordAttendance,
    responses(
        (status = 201, description = "Attendance stored (inserted or merged into the day's row)",
         body = Attendance),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn record_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<RecordAttendance>,
) -> AppResult<impl Responder> {
    auth.require_manager_or_admin()?;
    let row = attendance::record_attendance(state.store(), payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(row))
}

#[utoipa::path(
    post,
    path = "/api/attendance/bulk",
    request_body = BulkAttendance,
    responses(
        (status = 200, description = "Per-item outcome", body = Object, example = json!({
            "success": true,
            "processed": 2,
            "successful": 1,
            "failed": 1,
            "results": [{"id": 3, "userId": 5, "status": "present"}],
            "errors": [{"userId": 99, "error": "User 99 not found"}]
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn bulk_record(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<BulkAttendance>,
) -> AppResult<impl Responder> {
    auth.require_admin()?;
    let summary = attendance::bulk_record(state.store(), payload.into_inner().records).await;
    Ok(HttpResponse::Ok().json(BulkResponse::from(summary)))
}

#[utoipa::path(
    put,
    path = "/api/attendance/{id}",
    params(("id" = u64, Path, description = "Attendance id")),
    request_body = UpdateAttendance,
    responses(
        (status = 200, description = "Updated attendance", body = Attendance),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Attendance not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn update_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateAttendance>,
) -> AppResult<impl Responder> {
    auth.require_manager_or_admin()?;
    let row = attendance::update_attendance(
        state.store(),
        path.into_inner(),
        payload.into_inner().into(),
    )
    .await?;
    Ok(HttpResponse::Ok().json(row))
}

#[utoipa::path(
    get,
    path = "/api/attendance/today",
    responses(
        (status = 200, description = "Today's rows; employees only see their own",
         body = [Attendance]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn today(auth: AuthUser, state: web::Data<AppState>) -> AppResult<impl Responder> {
    let rows = attendance::today(state.store(), &auth, Local::now().date_naive()).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/attendance/user/{userId}",
    params(
        ("userId" = u64, Path, description = "User id"),
        UserAttendanceQuery
    ),
    responses(
        (status = 200, description = "Attendance history", body = [Attendance]),
        (status = 400, description = "startDate after endDate"),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Attendance"
)]
pub async fn user_attendance(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    query: web::Query<UserAttendanceQuery>,
) -> AppResult<impl Responder> {
    let user_id = path.into_inner();
    auth.require_self_or_manager(user_id)?;

    let rows = attendance::user_attendance(
        state.store(),
        user_id,
        query.date,
        query.start_date,
        query.end_date,
    )
    .await?;
    Ok(HttpResponse::Ok().json(rows))
}
