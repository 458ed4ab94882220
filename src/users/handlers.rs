use axum::{
    extract::State,
    routing::get,
    Router,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use super::{
    dto::{CreateUserRequest, PublicUser, UpdateUserRequest},
    repo::{NewUser, UserChanges},
    repo_types::{Role, User},
};
use crate::{
    auth::{extractors::AdminUser, password::hash_password, validation::{is_valid_email, normalize_email}},
    error::{AppError, AppResult},
    response::{ApiResponse, AppJson, AppPath},
    state::AppState,
};

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
) -> AppResult<ApiResponse<Vec<PublicUser>>> {
    let users = User::list(&state.db).await?;
    Ok(ApiResponse::list(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AdminUser(_admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<PublicUser>> {
    let user = User::find_by_id(&state.db, id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppJson(payload): AppJson<CreateUserRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    let payload = payload.normalize()?;

    if User::exists_with(&state.db, &payload.username, &payload.email).await? {
        warn!(username = %payload.username, "user already exists");
        return Err(AppError::Conflict(
            "User already exists with this username or email".into(),
        ));
    }

    let hash = hash_password(&payload.password)?;
    let user = User::create(
        &state.db,
        NewUser {
            username: &payload.username,
            email: &payload.email,
            password_hash: &hash,
            role: payload.role.unwrap_or(Role::Employee),
            is_active: true,
        },
    )
    .await?;

    info!(user_id = %user.id, created_by = %admin.id, "user created");
    Ok(ApiResponse::created(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
    AppJson(payload): AppJson<UpdateUserRequest>,
) -> AppResult<ApiResponse<PublicUser>> {
    if id == admin.id {
        if payload.is_active == Some(false) {
            return Err(AppError::validation("Cannot deactivate your own account"));
        }
        if payload.role == Some(Role::Employee) {
            return Err(AppError::validation("Cannot demote your own account"));
        }
    }

    let email = match payload.email {
        Some(e) => {
            let e = normalize_email(&e);
            if !is_valid_email(&e) {
                return Err(AppError::validation("Invalid email"));
            }
            Some(e)
        }
        None => None,
    };
    let username = payload
        .username
        .map(|u| u.trim().to_string())
        .filter(|u| !u.is_empty());

    let user = User::update(
        &state.db,
        id,
        UserChanges {
            username,
            email,
            role: payload.role,
            is_active: payload.is_active,
        },
    )
    .await?
    .ok_or(AppError::NotFound("User"))?;

    info!(user_id = %user.id, updated_by = %admin.id, "user updated");
    Ok(ApiResponse::ok(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    AppPath(id): AppPath<Uuid>,
) -> AppResult<ApiResponse<Option<()>>> {
    if id == admin.id {
        return Err(AppError::validation("Cannot delete your own account"));
    }
    if !User::delete(&state.db, id).await? {
        return Err(AppError::NotFound("User"));
    }
    info!(user_id = %id, deleted_by = %admin.id, "user deleted");
    Ok(ApiResponse::ok(None).message("User deleted successfully"))
}
