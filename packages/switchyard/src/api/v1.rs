use axum::{Router, routing::get};

use crate::{api::State, rate_limit};

pub mod health;
pub mod user;

pub fn router() -> Router<State> {
    Router::new()
        .nest("/user", user::router())
        .route("/health", get(health::handle))
        .layer(rate_limit::standard())
}
