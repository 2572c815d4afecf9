use anyhow::Context;
use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use super::{error::ApiError, identity::AuthenticatedUser};
use crate::{
    app::AppState,
    auth::{MIN_PASSWORD_LEN, normalize_email},
    store::models::{NewUser, User},
};

const INVALID_CREDENTIALS: &str = "Invalid credentials";

#[derive(Debug, Deserialize)]
pub(crate) struct RegisterRequest {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginRequest {
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    password: Option<String>,
}

/// Public view of an account; the password hash never leaves the service.
#[derive(Debug, Serialize)]
pub(crate) struct UserView {
    id: Uuid,
    name: String,
    email: String,
    created_at: DateTime<Utc>,
}

impl From<User> for UserView {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct AuthResponse {
    token: String,
    user: UserView,
}

#[derive(Debug, Serialize)]
pub(crate) struct MeResponse {
    user: UserView,
}

fn validate_registration(request: RegisterRequest) -> Result<(String, String, String), ApiError> {
    let name = request.name.unwrap_or_default().trim().to_string();
    let email = normalize_email(&request.email.unwrap_or_default());
    let password = request.password.unwrap_or_default();

    if name.is_empty() || email.is_empty() || password.is_empty() {
        return Err(ApiError::validation("Name, email and password are required"));
    }
    if !looks_like_email(&email) {
        return Err(ApiError::validation("Invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok((name, email, password))
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && !domain.is_empty()
                && !domain.contains('@')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}

/// POST /api/auth/register
pub(crate) async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<AuthResponse>), ApiError> {
    let Json(request) = payload?;
    let (name, email, password) = validate_registration(request).inspect_err(|_| {
        state.telemetry().record_registration(false);
    })?;

    let hasher = state.passwords();
    let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&password))
        .await
        .context("password hashing task failed")?
        .context("failed to hash password")?;

    let Some(user) = state
        .users()
        .create_user(NewUser {
            name,
            email,
            password_hash,
        })
        .await?
    else {
        state.telemetry().record_registration(false);
        return Err(ApiError::Conflict("User already exists"));
    };

    state.telemetry().record_registration(true);
    info!(user_id = %user.id, "user registered");
    let token = state.tokens().issue(user.id);
    Ok((
        StatusCode::CREATED,
        Json(AuthResponse {
            token,
            user: user.into(),
        }),
    ))
}

/// POST /api/auth/login
pub(crate) async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<AuthResponse>, ApiError> {
    let Json(request) = payload?;
    let email = normalize_email(&request.email.unwrap_or_default());
    let password = request.password.unwrap_or_default();
    if email.is_empty() || password.is_empty() {
        state.telemetry().record_login(false);
        return Err(ApiError::validation("Email and password are required"));
    }

    let Some(user) = state.users().find_user_by_email(&email).await? else {
        state.telemetry().record_login(false);
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    };

    let hasher = state.passwords();
    let stored_hash = user.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || hasher.verify(&password, &stored_hash))
        .await
        .context("password verification task failed")?
        .with_context(|| format!("stored password hash for user {} is unreadable", user.id))?;

    if !verified {
        state.telemetry().record_login(false);
        warn!(user_id = %user.id, "login rejected");
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS));
    }

    state.telemetry().record_login(true);
    info!(user_id = %user.id, "user logged in");
    let token = state.tokens().issue(user.id);
    Ok(Json(AuthResponse {
        token,
        user: user.into(),
    }))
}

/// GET /api/auth/me
pub(crate) async fn me(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
) -> Result<Json<MeResponse>, ApiError> {
    let user = state
        .users()
        .find_user_by_id(user_id)
        .await?
        .ok_or(ApiError::Unauthorized("Not authorized, user not found"))?;
    Ok(Json(MeResponse { user: user.into() }))
}
