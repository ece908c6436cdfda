use crate::state::AppState;
use axum::Router;

mod claims;
pub mod cookies;
mod dto;
pub(crate) mod extractors;
pub mod handlers;
pub mod jwt;
#[cfg(test)]
pub mod memory;
pub mod oauth;
mod password;
pub mod repo;
pub mod repo_types;
pub mod services;

pub fn router() -> Router<AppState> {
    Router::new()
        .merge(handlers::jwt_routes())
        .merge(handlers::provider_routes())
        .merge(handlers::me_routes())
}
