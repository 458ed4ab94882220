pub mod alerts;
mod dto;
mod handlers;
pub mod mailer;
pub mod summary;
pub mod templates;

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
