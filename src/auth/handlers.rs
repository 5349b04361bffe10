use crate::{
    auth::{
        auth::AuthUser,
        jwt::{JwtIdentity, expires_at},
        password::verify_password,
    },
    error::{AppError, AppResult},
    model::user::{CreateUser, User},
    models::{LoginReqDto, LoginResponse, RegisterReq, TokenResponse, TokenType},
    service::users,
    state::AppState,
};
use actix_web::{HttpRequest, HttpResponse, web};
use chrono::Utc;
use tracing::{debug, error, info, instrument};

fn bearer(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

/// Issues an access token and a stored refresh token.
async fn issue_pair(
    state: &AppState,
    identity: &JwtIdentity,
    user: &User,
) -> AppResult<TokenResponse> {
    let access_token = identity.access_token(user)?;
    let (refresh_token, refresh_claims) = identity.refresh_token(user)?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    state
        .store()
        .save_refresh_token(user.id, &refresh_claims.jti, expires_at(&refresh_claims))
        .await?;

    Ok(TokenResponse {
        access_token,
        refresh_token,
    })
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = User),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
pub async fn register(
    state: web::Data<AppState>,
    body: web::Json<RegisterReq>,
) -> AppResult<HttpResponse> {
    let body = body.into_inner();
    if body.password.is_empty() {
        return Err(AppError::validation("Username and password must not be empty"));
    }

    let input = users::registration(CreateUser {
        username: body.username,
        email: body.email,
        name: body.name,
        role: None,
        department: body.department,
        position: body.position,
        employee_id: None,
        qr_code: None,
        join_date: None,
        password: Some(body.password),
    });

    let user = users::create_user(state.store(), &state.usernames, input).await?;
    Ok(HttpResponse::Created().json(user))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Tokens issued", body = LoginResponse),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(
    name = "auth_login",
    skip(state, identity, body),
    fields(username = %body.username)
)]
pub async fn login(
    state: web::Data<AppState>,
    identity: web::Data<JwtIdentity>,
    body: web::Json<LoginReqDto>,
) -> AppResult<HttpResponse> {
    info!("Login request received");

    if body.username.trim().is_empty() || body.password.is_empty() {
        info!("Validation failed: empty username or password");
        return Err(AppError::validation("Username or password required"));
    }

    let user = match state.store().find_user_by_username(body.username.trim()).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            info!("Invalid credentials: user inactive");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(AppError::unauthorized("Invalid credentials"));
        }
    };

    let password_ok = user
        .password_hash
        .as_deref()
        .is_some_and(|hash| verify_password(&body.password, hash));
    if !password_ok {
        info!("Invalid credentials: password mismatch");
        return Err(AppError::unauthorized("Invalid credentials"));
    }

    let tokens = issue_pair(&state, &identity, &user).await?;

    if let Err(e) = state.store().touch_last_login(user.id, Utc::now()).await {
        // login still succeeds
        error!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(LoginResponse {
        access_token: tokens.access_token,
        refresh_token: tokens.refresh_token,
        user,
    }))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Rotated token pair", body = TokenResponse),
        (status = 401, description = "Invalid, expired or revoked refresh token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: web::Data<JwtIdentity>,
) -> AppResult<HttpResponse> {
    let unauthorized = || AppError::unauthorized("Invalid refresh token");

    let token = bearer(&req).ok_or_else(unauthorized)?;
    let claims = identity.verify(token).map_err(|_| unauthorized())?;
    if claims.token_type != TokenType::Refresh {
        return Err(unauthorized());
    }

    // a replayed token fails here
    if !state.store().revoke_refresh_token(&claims.jti).await? {
        info!(user_id = claims.user_id, "Refresh token already revoked or unknown");
        return Err(unauthorized());
    }

    let user = state
        .store()
        .find_user(claims.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(unauthorized)?;

    let tokens = issue_pair(&state, &identity, &user).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    state: web::Data<AppState>,
    identity: web::Data<JwtIdentity>,
) -> HttpResponse {
    let Some(claims) = bearer(&req).and_then(|t| identity.verify(t).ok()) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens are revocable
    if claims.token_type == TokenType::Refresh {
        if let Err(e) = state.store().revoke_refresh_token(&claims.jti).await {
            error!(error = %e, "Failed to revoke refresh token");
        }
    }

    HttpResponse::NoContent().finish()
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = User),
        (status = 401, description = "Missing or invalid token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(caller: AuthUser, state: web::Data<AppState>) -> AppResult<HttpResponse> {
    let user = users::get_user(state.store(), caller.user_id).await?;
    Ok(HttpResponse::Ok().json(user))
}
