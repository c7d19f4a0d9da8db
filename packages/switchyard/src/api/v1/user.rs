//! Current user endpoints.

use axum::{
    Router,
    routing::{get, post},
};

use crate::api::State;

pub mod change_current_organization;
pub mod current_organization;

pub fn router() -> Router<State> {
    Router::new()
        .route(
            "/change-current-organization",
            post(change_current_organization::handle),
        )
        .route("/current-organization", get(current_organization::handle))
}
