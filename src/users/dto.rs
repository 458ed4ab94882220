use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use super::repo_types::{Role, User};
use crate::auth::validation::{is_valid_email, normalize_email, MIN_PASSWORD_LEN};
use crate::error::AppError;

/// Public part of the user returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl From<User> for PublicUser {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            username: u.username,
            email: u.email,
            role: u.role,
            is_active: u.is_active,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
    pub role: Option<Role>,
}

impl CreateUserRequest {
    pub fn normalize(mut self) -> Result<Self, AppError> {
        self.username = self.username.trim().to_string();
        self.email = normalize_email(&self.email);
        if self.username.is_empty() {
            return Err(AppError::validation("Username is required"));
        }
        if !is_valid_email(&self.email) {
            return Err(AppError::validation("Invalid email"));
        }
        if self.password.len() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(format!(
                "Password must be at least {MIN_PASSWORD_LEN} characters"
            )));
        }
        Ok(self)
    }
}

/// Passwords cannot be changed through this request; unknown fields such as
/// `password` are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}
