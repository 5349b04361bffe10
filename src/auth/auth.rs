use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload};
use futures::future::{Ready, ready};

use crate::error::AppError;
use crate::model::role::Role;

/// The verified caller, placed in request extensions by `auth_middleware`.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub username: String,
    pub role: Role,
}

impl FromRequest for AuthUser {
    type Error = AppError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(
            req.extensions()
                .get::<AuthUser>()
                .cloned()
                .ok_or_else(|| AppError::unauthorized("Missing token")),
        )
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), AppError> {
        if self.role == Role::Admin {
            Ok(())
        } else {
            Err(AppError::forbidden("Admin only"))
        }
    }

    pub fn require_manager_or_admin(&self) -> Result<(), AppError> {
        if self.role.is_manager_or_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Manager/Admin only"))
        }
    }

    /// Employees may only touch their own records.
    pub fn require_self_or_manager(&self, user_id: u64) -> Result<(), AppError> {
        if self.user_id == user_id || self.role.is_manager_or_admin() {
            Ok(())
        } else {
            Err(AppError::forbidden("Not allowed to access another user's records"))
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }
}
