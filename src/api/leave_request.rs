use crate::auth::auth::AuthUser;
use crate::error::AppResult;
use crate::model::leave_request::{
    LeaveFilter, LeaveRequest, LeaveStatus, RespondLeave, SubmitLeave,
};
use crate::service::leave;
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::store::Page;

#[derive(Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u64,
    #[schema(example = 10)]
    pub per_page: u64,
    #[schema(example = 1)]
    pub total: i64,
}

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct LeaveQuery {
    /// Filter by requester; ignored for employees
    pub user_id: Option<u64>,
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    /// Pagination page number (start with 1)
    pub page: Option<u64>,
    /// Items per page, at most 100
    pub per_page: Option<u64>,
}

/* =========================
Submit leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave-requests",
    request_body(
        content = SubmitLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 201, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "endDate before startDate"),
        (status = 403, description = "Submitting for someone else"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<SubmitLeave>,
) -> AppResult<impl Responder> {
    let leave = leave::submit(state.store(), &auth, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(leave))
}

/* =========================
Respond (Manager/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave-requests/{id}/respond",
    params(("id" = u64, Path, description = "Leave request id")),
    request_body = RespondLeave,
    responses(
        (status = 200, description = "Leave request resolved", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Leave request already resolved",
         body = Object, example = json!({
            "success": false,
            "message": "Leave request 3 is already approved"
        }))
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn respond_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<RespondLeave>,
) -> AppResult<impl Responder> {
    let leave = leave::respond(state.store(), &auth, path.into_inner(), payload.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave-requests/{id}",
    params(("id" = u64, Path, description = "Leave request id")),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    let leave = leave::get(state.store(), &auth, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(leave))
}

#[utoipa::path(
    get,
    path = "/api/leave-requests",
    params(LeaveQuery),
    responses(
        (status = 200, description = "Paginated leave list, newest first",
         body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<LeaveQuery>,
) -> AppResult<impl Responder> {
    let query = query.into_inner();
    let page = Page::new(query.page, query.per_page);
    let filter = LeaveFilter {
        user_id: query.user_id,
        status: query.status,
    };

    let (data, total) = leave::list(state.store(), &auth, filter, page).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page.page,
        per_page: page.per_page,
        total,
    }))
}
