use crate::api::BulkResponse;
use crate::auth::auth::AuthUser;
use crate::error::{AppError, AppResult};
use crate::model::user::{CreateUser, UpdateUser, User};
use crate::service::users;
use crate::state::AppState;
use actix_web::{HttpResponse, Responder, web};
use serde::Deserialize;
use serde_json::json;
use utoipa::{IntoParams, ToSchema};

#[derive(Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    /// Include deactivated users
    pub include_inactive: Option<bool>,
}

#[derive(Deserialize, IntoParams)]
pub struct SearchUsersQuery {
    /// Substring of username, name, email or employee id
    pub q: Option<String>,
    /// Exact department name
    pub department: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct BulkCreateUsers {
    pub users: Vec<CreateUser>,
}

/* =========================
List users
========================= */
#[utoipa::path(
    get,
    path = "/api/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users", body = [User]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    _auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<ListUsersQuery>,
) -> AppResult<impl Responder> {
    let rows = users::list_users(state.store(), query.include_inactive.unwrap_or(false)).await?;
    Ok(HttpResponse::Ok().json(rows))
}

/* =========================
Search users
========================= */
#[utoipa::path(
    get,
    path = "/api/users/search",
    params(SearchUsersQuery),
    responses(
        (status = 200, description = "Matching active users", body = [User]),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn search_users(
    _auth: AuthUser,
    state: web::Data<AppState>,
    query: web::Query<SearchUsersQuery>,
) -> AppResult<impl Responder> {
    let query = query.into_inner();
    let rows = users::search_users(state.store(), query.q, query.department).await?;
    Ok(HttpResponse::Ok().json(rows))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User found", body = User),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn get_user(
    _auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    let user = users::get_user(state.store(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(user))
}

/* =========================
Create user (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/users",
    request_body = CreateUser,
    responses(
        (status = 201, description = "User created", body = User),
        (status = 400, description = "Invalid input"),
        (status = 403, description = "Forbidden"),
        (status = 409, description = "Username, email or employee id already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn create_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<CreateUser>,
) -> AppResult<impl Responder> {
    auth.require_admin()?;
    let user = users::create_user(state.store(), &state.usernames, payload.into_inner()).await?;
    Ok(HttpResponse::Created().json(user))
}

/* =========================
Bulk import (Admin)
========================= */
#[utoipa::path(
    post,
    path = "/api/users/bulk",
    request_body = BulkCreateUsers,
    responses(
        (status = 200, description = "Per-item outcome", body = Object, example = json!({
            "success": true,
            "processed": 2,
            "successful": 1,
            "failed": 1,
            "results": [{"id": 9, "username": "new.hire"}],
            "errors": [{"username": "jdoe", "error": "Username already taken"}]
        })),
        (status = 403, description = "Forbidden")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn bulk_create_users(
    auth: AuthUser,
    state: web::Data<AppState>,
    payload: web::Json<BulkCreateUsers>,
) -> AppResult<impl Responder> {
    auth.require_admin()?;
    let summary = users::bulk_create_users(
        state.store(),
        &state.usernames,
        payload.into_inner().users,
    )
    .await;
    Ok(HttpResponse::Ok().json(BulkResponse::from(summary)))
}

/* =========================
Update user
========================= */
/// Admins may change anything; a user may edit the non-privileged fields of
/// their own profile.
#[utoipa::path(
    put,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    request_body = UpdateUser,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found"),
        (status = 409, description = "Unique value already in use")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
    payload: web::Json<UpdateUser>,
) -> AppResult<impl Responder> {
    let id = path.into_inner();
    let payload = payload.into_inner();

    if auth.require_admin().is_err() {
        if auth.user_id != id {
            return Err(AppError::forbidden("Admin only"));
        }
        if !payload.is_self_service() {
            return Err(AppError::forbidden("Only an admin may change these fields"));
        }
    }

    let user = users::update_user(state.store(), &state.usernames, id, payload).await?;
    Ok(HttpResponse::Ok().json(user))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User deactivated", body = Object, example = json!({
            "success": true,
            "message": "User deactivated"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    auth.require_admin()?;
    users::deactivate_user(state.store(), path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "User deactivated"})))
}

#[utoipa::path(
    delete,
    path = "/api/users/{id}/permanent",
    params(("id" = u64, Path, description = "User id")),
    responses(
        (status = 200, description = "User and owned records removed",
         body = Object, example = json!({
            "success": true,
            "message": "User permanently deleted"
        })),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn purge_user(
    auth: AuthUser,
    state: web::Data<AppState>,
    path: web::Path<u64>,
) -> AppResult<impl Responder> {
    auth.require_admin()?;
    users::purge_user(state.store(), &state.usernames, path.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({"success": true, "message": "User permanently deleted"})))
}
