use axum::{http::StatusCode, response::IntoResponse};
use tracing::info;

/// Health check endpoint.
///
/// The service holds no connections, so being able to answer is the whole
/// check.
#[tracing::instrument]
pub async fn handle() -> PingResponse {
    info!("health.ping.success");
    PingResponse::Success
}

#[derive(Debug)]
pub enum PingResponse {
    Success,
}

impl IntoResponse for PingResponse {
    fn into_response(self) -> axum::response::Response {
        match self {
            PingResponse::Success => StatusCode::OK.into_response(),
        }
    }
}
