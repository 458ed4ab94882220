use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use tracing::warn;
use uuid::Uuid;

use super::{
    claims::{Claims, TokenKind},
    jwt::JwtKeys,
};
use crate::{
    error::AppError,
    state::AppState,
    users::repo_types::{AccessState, Role, User},
};

/// Authenticated caller, taken from a Bearer access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
    pub username: String,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Same as [`AuthUser`] but rejects non-admins with 403.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

fn access_claims(parts: &Parts, state: &AppState) -> Result<Claims, AppError> {
    let header = parts
        .headers
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing Authorization header".into()))?;

    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .ok_or_else(|| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let claims = JwtKeys::from_ref(state).verify(token).map_err(|_| {
        warn!("invalid or expired token");
        AppError::Unauthorized("Invalid or expired token".into())
    })?;

    if claims.kind != TokenKind::Access {
        return Err(AppError::Unauthorized("Access token required".into()));
    }
    Ok(claims)
}

/// Build the caller from the stored row rather than the token, so
/// deactivation, role changes and renames apply to tokens already issued.
fn admit(id: Uuid, stored: Option<AccessState>) -> Result<AuthUser, AppError> {
    match stored {
        Some(AccessState {
            is_active: true,
            role,
            username,
        }) => Ok(AuthUser { id, role, username }),
        Some(_) => Err(AppError::Forbidden("Account is not active".into())),
        None => Err(AppError::Unauthorized("User not found".into())),
    }
}

fn require_admin(user: AuthUser) -> Result<AdminUser, AppError> {
    if !user.is_admin() {
        return Err(AppError::Forbidden("Admin access required".into()));
    }
    Ok(AdminUser(user))
}

async fn ensure_active(state: &AppState, claims: Claims) -> Result<AuthUser, AppError> {
    let stored = User::access_state(&state.db, claims.sub).await?;
    admit(claims.sub, stored)
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        ensure_active(state, claims).await
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let claims = access_claims(parts, state)?;
        require_admin(ensure_active(state, claims).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(is_active: bool, role: Role, username: &str) -> Option<AccessState> {
        Some(AccessState {
            is_active,
            role,
            username: username.into(),
        })
    }

    #[test]
    fn username_comes_from_the_stored_row() {
        let id = Uuid::new_v4();
        let user = admit(id, stored(true, Role::Employee, "renamed")).unwrap();
        assert_eq!(user.id, id);
        assert_eq!(user.username, "renamed");
    }

    #[test]
    fn inactive_and_missing_users_are_rejected() {
        let id = Uuid::new_v4();
        let err = admit(id, stored(false, Role::Admin, "ann")).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
        let err = admit(id, None).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn admin_check_uses_the_stored_role() {
        let id = Uuid::new_v4();
        let promoted = admit(id, stored(true, Role::Admin, "ann")).unwrap();
        assert!(require_admin(promoted).is_ok());

        let demoted = admit(id, stored(true, Role::Employee, "ann")).unwrap();
        let err = require_admin(demoted).unwrap_err();
        assert!(matches!(err, AppError::Forbidden(m) if m == "Admin access required"));
    }
}
