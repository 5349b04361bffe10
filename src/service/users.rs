use chrono::Utc;
use serde_json::json;
use uuid::Uuid;

use super::bulk::{self, BulkSummary};
use crate::auth::password::hash_password;
use crate::error::{AppError, AppResult};
use crate::model::role::Role;
use crate::model::user::{CreateUser, NewUser, UpdateUser, User, UserFilter, UserPatch};
use crate::store::Store;
use crate::utils::username_cache::UsernameCache;

fn non_blank(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn require_field(name: &str, value: &str) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::validation(format!("{name} is required")));
    }
    Ok(value.to_string())
}

fn validate_email(email: &str) -> AppResult<String> {
    let email = require_field("email", email)?;
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && domain.contains('.') => Ok(email),
        _ => Err(AppError::validation(format!("Invalid email address: {email}"))),
    }
}

/// true when the username is still free. The cache only answers "taken";
/// a miss is settled by the store.
pub async fn is_username_available(
    store: &dyn Store,
    usernames: &UsernameCache,
    username: &str,
) -> AppResult<bool> {
    if usernames.is_taken(username).await {
        return Ok(false);
    }
    Ok(store.find_user_by_username(username).await?.is_none())
}

pub async fn create_user(
    store: &dyn Store,
    usernames: &UsernameCache,
    input: CreateUser,
) -> AppResult<User> {
    let username = require_field("username", &input.username)?;
    let email = validate_email(&input.email)?;
    let name = require_field("name", &input.name)?;

    if !is_username_available(store, usernames, &username).await? {
        return Err(AppError::conflict("Username already taken"));
    }

    let password_hash = match non_blank(input.password) {
        Some(password) => Some(hash_password(&password)?),
        None => None,
    };

    let user = store
        .insert_user(NewUser {
            username,
            email,
            name,
            role: input.role.unwrap_or_default(),
            department: non_blank(input.department),
            position: non_blank(input.position),
            employee_id: non_blank(input.employee_id),
            qr_code: Some(
                non_blank(input.qr_code).unwrap_or_else(|| format!("QR-{}", Uuid::new_v4())),
            ),
            join_date: input.join_date.unwrap_or_else(|| Utc::now().date_naive()),
            password_hash,
        })
        .await?;

    usernames.mark_taken(&user.username).await;
    tracing::info!(user_id = user.id, username = %user.username, role = %user.role, "User created");
    Ok(user)
}

pub async fn bulk_create_users(
    store: &dyn Store,
    usernames: &UsernameCache,
    users: Vec<CreateUser>,
) -> BulkSummary<User> {
    bulk::run(
        "username",
        users,
        |u| json!(u.username),
        |u| create_user(store, usernames, u),
    )
    .await
}

pub async fn get_user(store: &dyn Store, id: u64) -> AppResult<User> {
    store
        .find_user(id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))
}

pub async fn list_users(store: &dyn Store, include_inactive: bool) -> AppResult<Vec<User>> {
    store
        .list_users(&UserFilter {
            include_inactive,
            ..UserFilter::default()
        })
        .await
}

pub async fn search_users(
    store: &dyn Store,
    query: Option<String>,
    department: Option<String>,
) -> AppResult<Vec<User>> {
    store
        .list_users(&UserFilter {
            include_inactive: false,
            query: non_blank(query),
            department: non_blank(department),
        })
        .await
}

pub async fn update_user(
    store: &dyn Store,
    usernames: &UsernameCache,
    id: u64,
    input: UpdateUser,
) -> AppResult<User> {
    let current = get_user(store, id).await?;

    let mut patch = UserPatch {
        email: input.email.as_deref().map(validate_email).transpose()?,
        name: input.name.as_deref().map(|n| require_field("name", n)).transpose()?,
        role: input.role,
        department: input.department,
        position: input.position,
        employee_id: non_blank(input.employee_id),
        qr_code: non_blank(input.qr_code),
        join_date: input.join_date,
        is_active: input.is_active,
        ..UserPatch::default()
    };

    if let Some(username) = input.username.as_deref() {
        let username = require_field("username", username)?;
        if !username.eq_ignore_ascii_case(&current.username)
            && !is_username_available(store, usernames, &username).await?
        {
            return Err(AppError::conflict("Username already taken"));
        }
        patch.username = Some(username);
    }

    if let Some(password) = non_blank(input.password) {
        patch.password_hash = Some(hash_password(&password)?);
    }

    if patch.is_empty() {
        return Ok(current);
    }

    let updated = store
        .update_user(id, &patch)
        .await?
        .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;

    if !updated.username.eq_ignore_ascii_case(&current.username) {
        usernames.forget(&current.username).await;
        usernames.mark_taken(&updated.username).await;
    }
    Ok(updated)
}

/// Soft delete: the row and its history stay.
pub async fn deactivate_user(store: &dyn Store, id: u64) -> AppResult<()> {
    if !store.deactivate_user(id).await? {
        return Err(AppError::not_found(format!("User {id} not found")));
    }
    tracing::info!(user_id = id, "User deactivated");
    Ok(())
}

pub async fn purge_user(store: &dyn Store, usernames: &UsernameCache, id: u64) -> AppResult<()> {
    let user = get_user(store, id).await?;
    if !store.purge_user(id).await? {
        return Err(AppError::not_found(format!("User {id} not found")));
    }
    usernames.forget(&user.username).await;
    tracing::info!(user_id = id, username = %user.username, "User permanently deleted");
    Ok(())
}

/// Registration always yields an employee.
pub fn registration(input: CreateUser) -> CreateUser {
    CreateUser {
        role: Some(Role::Employee),
        ..input
    }
}
