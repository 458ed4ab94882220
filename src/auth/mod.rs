use crate::state::AppState;
use axum::Router;

mod claims;
mod dto;
pub mod extractors;
mod handlers;
pub mod jwt;
pub mod password;
pub mod validation;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
