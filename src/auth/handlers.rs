use axum::{
    extract::{FromRef, State},
    routing::{get, post},
    Router,
};
use tracing::{info, instrument, warn};

use super::{
    dto::{AuthResponse, LoginRequest, RefreshRequest, RegisterRequest},
    extractors::AuthUser,
    jwt::JwtKeys,
    password::{hash_password, verify_password},
    validation::{is_valid_email, normalize_email, MIN_PASSWORD_LEN},
};
use crate::{
    error::{AppError, AppResult},
    response::{ApiResponse, AppJson},
    state::AppState,
    users::{dto::PublicUser, repo_types::User},
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/me", get(get_me))
}

fn issue_tokens(state: &AppState, user: User) -> AppResult<AuthResponse> {
    let keys = JwtKeys::from_ref(state);
    let access_token = keys.sign_access(&user)?;
    let refresh_token = keys.sign_refresh(&user)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: user.into(),
    })
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<RegisterRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    payload.email = normalize_email(&payload.email);
    payload.username = payload.username.trim().to_string();

    if payload.username.is_empty() {
        return Err(AppError::validation("Username is required"));
    }
    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        warn!("password too short");
        return Err(AppError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    if User::exists_with(&state.db, &payload.username, &payload.email).await? {
        warn!(email = %payload.email, "user already registered");
        return Err(AppError::Conflict(
            "User already exists with this username or email".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::register(&state.db, &payload.username, &payload.email, &hash).await?;

    info!(user_id = %user.id, role = ?user.role, active = user.is_active, "user registered");
    let message = if user.is_active {
        "Registration successful"
    } else {
        "Registration successful. An administrator must approve the account before login"
    };
    Ok(ApiResponse::created(PublicUser::from(user)).message(message))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    AppJson(mut payload): AppJson<LoginRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    payload.email = normalize_email(&payload.email);

    if !is_valid_email(&payload.email) {
        warn!(email = %payload.email, "invalid email");
        return Err(AppError::validation("Invalid email"));
    }

    let invalid = || AppError::Unauthorized("Invalid credentials".into());

    let Some(user) = User::find_by_email(&state.db, &payload.email).await? else {
        warn!(email = %payload.email, "login unknown email");
        return Err(invalid());
    };

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    if !user.is_active {
        warn!(user_id = %user.id, "login on inactive account");
        return Err(AppError::Forbidden(
            "Account is not active. Contact an administrator".into(),
        ));
    }

    info!(user_id = %user.id, "user logged in");
    Ok(ApiResponse::ok(issue_tokens(&state, user)?))
}

#[instrument(skip(state, payload))]
pub async fn refresh(
    State(state): State<AppState>,
    AppJson(payload): AppJson<RefreshRequest>,
) -> AppResult<ApiResponse<AuthResponse>> {
    let claims = JwtKeys::from_ref(&state)
        .verify_refresh(&payload.refresh_token)
        .map_err(|e| AppError::Unauthorized(e.to_string()))?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    if !user.is_active {
        return Err(AppError::Forbidden("Account is not active".into()));
    }

    Ok(ApiResponse::ok(issue_tokens(&state, user)?))
}

#[instrument(skip(state))]
pub async fn get_me(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = User::find_by_id(&state.db, auth.id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User not found".into()))?;
    Ok(ApiResponse::ok(user.into()))
}
