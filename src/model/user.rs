use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::role::Role;

#[derive(Debug, Clone, Serialize, sqlx::FromRow, ToSchema)]
#[serde(rename_all = "camelCase")]
#[schema(example = json!({
    "id": 5,
    "username": "jdoe",
    "email": "john.doe@company.com",
    "name": "John Doe",
    "role": "employee",
    "department": "Engineering",
    "position": "Developer",
    "employeeId": "EMP-005",
    "qrCode": "QR-4b0f6c1e-8f7a-4a57-9f0e-2a1c3c4d5e6f",
    "joinDate": "2024-01-01",
    "isActive": true,
    "lastLoginAt": null,
    "createdAt": "2024-01-01T08:00:00Z"
}))]
pub struct User {
    pub id: u64,
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub qr_code: Option<String>,
    #[schema(value_type = String, format = "date")]
    pub join_date: NaiveDate,
    pub is_active: bool,
    #[serde(skip)]
    pub password_hash: Option<String>,
    #[schema(value_type = Option<String>, format = "date-time")]
    pub last_login_at: Option<DateTime<Utc>>,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
}

/// Row to insert; defaults are already resolved.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub qr_code: Option<String>,
    pub join_date: NaiveDate,
    pub password_hash: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct UserPatch {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub qr_code: Option<String>,
    pub join_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.name.is_none()
            && self.role.is_none()
            && self.department.is_none()
            && self.position.is_none()
            && self.employee_id.is_none()
            && self.qr_code.is_none()
            && self.join_date.is_none()
            && self.is_active.is_none()
            && self.password_hash.is_none()
    }

    /// Applies the provided fields in place.
    pub fn apply_to(&self, user: &mut User) {
        if let Some(v) = &self.username {
            user.username = v.clone();
        }
        if let Some(v) = &self.email {
            user.email = v.clone();
        }
        if let Some(v) = &self.name {
            user.name = v.clone();
        }
        if let Some(v) = self.role {
            user.role = v;
        }
        if let Some(v) = &self.department {
            user.department = Some(v.clone());
        }
        if let Some(v) = &self.position {
            user.position = Some(v.clone());
        }
        if let Some(v) = &self.employee_id {
            user.employee_id = Some(v.clone());
        }
        if let Some(v) = &self.qr_code {
            user.qr_code = Some(v.clone());
        }
        if let Some(v) = self.join_date {
            user.join_date = v;
        }
        if let Some(v) = self.is_active {
            user.is_active = v;
        }
        if let Some(v) = &self.password_hash {
            user.password_hash = Some(v.clone());
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateUser {
    #[schema(example = "jdoe")]
    pub username: String,
    #[schema(example = "john.doe@company.com", format = "email")]
    pub email: String,
    #[schema(example = "John Doe")]
    pub name: String,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub qr_code: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub join_date: Option<NaiveDate>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUser {
    pub username: Option<String>,
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub employee_id: Option<String>,
    pub qr_code: Option<String>,
    #[schema(example = "2026-01-01", format = "date", value_type = Option<String>)]
    pub join_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
    pub password: Option<String>,
}

impl UpdateUser {
    /// Fields an employee may change on their own profile.
    pub fn is_self_service(&self) -> bool {
        self.username.is_none()
            && self.role.is_none()
            && self.employee_id.is_none()
            && self.qr_code.is_none()
            && self.join_date.is_none()
            && self.is_active.is_none()
    }
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub include_inactive: bool,
    pub query: Option<String>,
    pub department: Option<String>,
}

impl UserFilter {
    /// Case-insensitive, like the `users` table collation.
    pub fn matches(&self, user: &User) -> bool {
        if !self.include_inactive && !user.is_active {
            return false;
        }
        if let Some(department) = &self.department {
            let same = user
                .department
                .as_deref()
                .is_some_and(|d| d.to_lowercase() == department.to_lowercase());
            if !same {
                return false;
            }
        }
        match &self.query {
            Some(q) => {
                let q = q.to_lowercase();
                [
                    Some(user.username.as_str()),
                    Some(user.name.as_str()),
                    Some(user.email.as_str()),
                    user.employee_id.as_deref(),
                ]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(&q))
            }
            None => true,
        }
    }
}

/// `%q%` for a `LIKE` search, with the wildcards in `q` taken literally.
pub fn like_pattern(q: &str) -> String {
    let mut pattern = String::with_capacity(q.len() + 2);
    pattern.push('%');
    for c in q.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
