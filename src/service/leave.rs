use chrono::Utc;

use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::leave_request::{
    LeaveFilter, LeaveRequest, LeaveResolution, NewLeaveRequest, RespondLeave, SubmitLeave,
};
use crate::store::{Page, Store};

/// Employees file for themselves; managers and admins may file for anyone.
pub async fn submit(
    store: &dyn Store,
    caller: &AuthUser,
    input: SubmitLeave,
) -> AppResult<LeaveRequest> {
    let user_id = input.user_id.unwrap_or(caller.user_id);
    caller.require_self_or_manager(user_id)?;

    if input.end_date < input.start_date {
        return Err(AppError::validation("endDate must not be before startDate"));
    }

    if store.find_user(user_id).await?.is_none() {
        return Err(AppError::not_found(format!("User {user_id} not found")));
    }

    let leave = store
        .insert_leave(NewLeaveRequest {
            user_id,
            start_date: input.start_date,
            end_date: input.end_date,
            leave_type: input.leave_type,
            reason: input.reason,
            request_date: Utc::now(),
        })
        .await?;

    tracing::info!(leave_id = leave.id, user_id, days = leave.days(), "Leave request submitted");
    Ok(leave)
}

pub async fn respond(
    store: &dyn Store,
    caller: &AuthUser,
    id: u64,
    input: RespondLeave,
) -> AppResult<LeaveRequest> {
    caller.require_manager_or_admin()?;

    let resolution = LeaveResolution {
        decision: input.status,
        approver_id: caller.user_id,
        notes: input.notes,
        responded_at: Utc::now(),
    };

    let leave = store.resolve_leave(id, &resolution).await?;
    tracing::info!(
        leave_id = id,
        approver_id = caller.user_id,
        status = %leave.status,
        "Leave request resolved"
    );
    Ok(leave)
}

pub async fn get(store: &dyn Store, caller: &AuthUser, id: u64) -> AppResult<LeaveRequest> {
    let leave = store
        .find_leave(id)
        .await?
        .ok_or_else(|| AppError::not_found("Leave request not found"))?;
    caller.require_self_or_manager(leave.user_id)?;
    Ok(leave)
}

/// Newest first. An employee's filter is pinned to their own id.
pub async fn list(
    store: &dyn Store,
    caller: &AuthUser,
    mut filter: LeaveFilter,
    page: Page,
) -> AppResult<(Vec<LeaveRequest>, i64)> {
    if !caller.role.is_manager_or_admin() {
        filter.user_id = Some(caller.user_id);
    }
    store.list_leave(&filter, page).await
}
