use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;

/// Error type returned by every handler. Rendered as
/// `{"success": false, "message": ...}` with the matching status code.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("{0}")]
    Validation(String),

    #[error("Insufficient stock. Available: {available}")]
    InsufficientStock { available: i32, requested: i32 },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{0}")]
    Forbidden(String),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("{0}")]
    Conflict(String),

    #[error("No active admin users found")]
    NoRecipients,

    #[error("{0}")]
    Mail(String),

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub message: String,
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_)
            | AppError::InsufficientStock { .. }
            | AppError::Conflict(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) | AppError::NoRecipients => StatusCode::NOT_FOUND,
            AppError::Mail(_) => StatusCode::BAD_GATEWAY,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            AppError::Internal(e) => {
                error!(error = ?e, "internal error");
                "Internal server error".to_string()
            }
            other => other.to_string(),
        };
        (
            status,
            Json(ErrorBody {
                success: false,
                message,
            }),
        )
            .into_response()
    }
}

impl From<sqlx::Error> for AppError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::RowNotFound => AppError::NotFound("Resource"),
            sqlx::Error::Database(db) => match db.code().as_deref() {
                // unique_violation
                Some("23505") => AppError::Conflict(duplicate_message(db.constraint())),
                // check_violation
                Some("23514") => AppError::Validation(format!(
                    "Value violates constraint {}",
                    db.constraint().unwrap_or("check")
                )),
                _ => AppError::Internal(e.into()),
            },
            _ => AppError::Internal(e.into()),
        }
    }
}

fn duplicate_message(constraint: Option<&str>) -> String {
    match constraint {
        Some(c) if c.contains("sku") => "Product with this SKU already exists".into(),
        Some(c) if c.contains("email") => "User already exists with this email".into(),
        Some(c) if c.contains("username") => "User already exists with this username".into(),
        _ => "Duplicate value".into(),
    }
}

impl From<JsonRejection> for AppError {
    fn from(r: JsonRejection) -> Self {
        AppError::Validation(format!("Invalid JSON body: {}", r.body_text()))
    }
}

impl From<PathRejection> for AppError {
    fn from(r: PathRejection) -> Self {
        AppError::Validation(format!("Invalid path parameter: {}", r.body_text()))
    }
}

impl From<QueryRejection> for AppError {
    fn from(r: QueryRejection) -> Self {
        AppError::Validation(format!("Invalid query string: {}", r.body_text()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn insufficient_stock_is_bad_request_with_available_count() {
        let resp = AppError::InsufficientStock {
            available: 3,
            requested: 5,
        }
        .into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body = body_json(resp).await;
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Insufficient stock. Available: 3");
    }

    #[tokio::test]
    async fn internal_errors_do_not_leak_their_cause() {
        let resp = AppError::Internal(anyhow::anyhow!("connection refused on 10.0.0.7")).into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body["message"], "Internal server error");
    }

    #[test]
    fn not_found_names_the_resource() {
        let err = AppError::NotFound("Product");
        assert_eq!(err.to_string(), "Product not found");
        assert_eq!(err.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn duplicate_messages_follow_constraint_names() {
        assert_eq!(
            duplicate_message(Some("products_sku_key")),
            "Product with this SKU already exists"
        );
        assert_eq!(
            duplicate_message(Some("users_email_key")),
            "User already exists with this email"
        );
        assert_eq!(duplicate_message(None), "Duplicate value");
    }

    #[test]
    fn row_not_found_maps_to_404() {
        assert_eq!(AppError::from(sqlx::Error::RowNotFound).status(), StatusCode::NOT_FOUND);
    }
}
