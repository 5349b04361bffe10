use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::model::user::User;
use crate::models::{Claims, TokenType};

fn now() -> usize {
    Utc::now().timestamp().max(0) as usize
}

/// Issues and verifies bearer tokens. Built once from `Config` and shared
/// with handlers and the auth middleware through `web::Data`.
#[derive(Clone)]
pub struct JwtIdentity {
    secret: String,
    access_ttl: usize,
    refresh_ttl: usize,
}

impl JwtIdentity {
    pub fn new(secret: impl Into<String>, access_ttl: usize, refresh_ttl: usize) -> Self {
        Self {
            secret: secret.into(),
            access_ttl,
            refresh_ttl,
        }
    }

    fn issue(&self, user: &User, token_type: TokenType, ttl: usize) -> AppResult<(String, Claims)> {
        let claims = Claims {
            user_id: user.id,
            sub: user.username.clone(),
            role: user.role,
            exp: now() + ttl,
            jti: Uuid::new_v4().to_string(),
            token_type,
        };

        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| AppError::internal(format!("token encoding failed: {e}")))?;

        Ok((token, claims))
    }

    pub fn access_token(&self, user: &User) -> AppResult<String> {
        self.issue(user, TokenType::Access, self.access_ttl)
            .map(|(token, _)| token)
    }

    pub fn refresh_token(&self, user: &User) -> AppResult<(String, Claims)> {
        self.issue(user, TokenType::Refresh, self.refresh_ttl)
    }

    pub fn verify(&self, token: &str) -> Result<Claims, String> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|e| e.to_string())
    }
}

pub fn expires_at(claims: &Claims) -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(claims.exp as i64, 0).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::role::Role;

    fn user(id: u64, role: Role) -> User {
        User {
            id,
            username: format!("user{id}"),
            email: format!("user{id}@example.com"),
            name: format!("User {id}"),
            role,
            department: None,
            position: None,
            employee_id: None,
            qr_code: None,
            join_date: Utc::now().date_naive(),
            is_active: true,
            password_hash: None,
            last_login_at: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn access_token_round_trips_identity() {
        let identity = JwtIdentity::new("secret", 900, 3600);
        let token = identity.access_token(&user(5, Role::Manager)).unwrap();

        let claims = identity.verify(&token).unwrap();
        assert_eq!(claims.user_id, 5);
        assert_eq!(claims.sub, "user5");
        assert_eq!(claims.role, Role::Manager);
        assert_eq!(claims.token_type, TokenType::Access);
    }

    #[test]
    fn refresh_tokens_get_unique_ids() {
        let identity = JwtIdentity::new("secret", 900, 3600);
        let (_, a) = identity.refresh_token(&user(1, Role::Employee)).unwrap();
        let (_, b) = identity.refresh_token(&user(1, Role::Employee)).unwrap();
        assert_ne!(a.jti, b.jti);
        assert_eq!(a.token_type, TokenType::Refresh);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let issuer = JwtIdentity::new("secret", 900, 3600);
        let other = JwtIdentity::new("other", 900, 3600);
        let token = issuer.access_token(&user(1, Role::Admin)).unwrap();
        assert!(other.verify(&token).is_err());
    }
}
