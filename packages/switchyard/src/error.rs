//! Normalized API errors.
//!
//! Every failure that reaches a client is turned into an [`ApiError`], which
//! renders as the JSON body described by [`ErrorResponse`] with a matching
//! status code. Internal code works with [`color_eyre::Report`]; handlers
//! convert at the boundary with [`ApiError::normalize`].

use axum::{
    Json,
    extract::rejection::RawFormRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use clients::switchyard::v1::{ErrorBody, ErrorResponse};
use color_eyre::Report;
use derive_more::{Debug, Display};
use serde::Serialize;
use serde_json::{Map, Value};
use tracing::{error, warn};

use crate::{api::RequestId, auth::UserId, form::FieldErrors};

/// A failure, shaped for returning to the client.
#[derive(Debug, Display)]
#[display("{status}: {message}")]
pub struct ApiError {
    message: String,
    status: StatusCode,
    label: Option<String>,
    additional_data: Map<String, Value>,
    trace_id: Option<String>,

    #[debug("{:?}", cause.as_ref().map(|cause| cause.to_string()))]
    cause: Option<Report>,
}

impl ApiError {
    /// Message shown for failures we don't want to describe to clients.
    pub const UNEXPECTED_MESSAGE: &'static str =
        "Something went wrong. Please try again. If the issue persists, please contact support.";

    pub fn new(message: impl Into<String>, status: StatusCode) -> Self {
        Self {
            message: message.into(),
            status,
            label: None,
            additional_data: Map::new(),
            trace_id: None,
            cause: None,
        }
    }

    /// The session is missing, invalid, or expired.
    pub fn unauthenticated() -> Self {
        Self::new(
            "You must be signed in to perform this action.",
            StatusCode::UNAUTHORIZED,
        )
        .with_label("Auth")
    }

    /// The submitted fields failed validation.
    pub fn validation(errors: FieldErrors) -> Self {
        Self::new("The request is invalid.", StatusCode::BAD_REQUEST)
            .with_label("Request validation")
            .with_data("validationErrors", errors)
    }

    /// The request body could not be read as a form.
    pub fn form_rejection(rejection: RawFormRejection) -> Self {
        Self::new(rejection.body_text(), rejection.status()).with_label("Request validation")
    }

    /// A server-side failure whose message is safe to show.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message, StatusCode::INTERNAL_SERVER_ERROR).with_label("Unknown")
    }

    /// Normalize an arbitrary failure. The cause is kept for logging but never
    /// shown to the client.
    pub fn normalize(cause: Report) -> Self {
        Self::internal(Self::UNEXPECTED_MESSAGE).with_cause(cause)
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Attach structured context. Values that fail to serialize are recorded
    /// as `null`.
    pub fn with_data(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        let value = serde_json::to_value(value).unwrap_or(Value::Null);
        self.additional_data.insert(key.into(), value);
        self
    }

    /// Record the acting user.
    pub fn with_user(self, user_id: UserId) -> Self {
        self.with_data("userId", user_id)
    }

    pub fn with_cause(mut self, cause: Report) -> Self {
        self.cause = Some(cause);
        self
    }

    pub fn with_trace_id(mut self, trace_id: Option<RequestId>) -> Self {
        self.trace_id = trace_id.map(|id| id.to_string());
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Log the error at a level matching its status.
    pub fn log(&self, event: &str) {
        let status = self.status.as_u16();
        if self.status.is_server_error() {
            error!(status, message = %self.message, cause = ?self.cause, "{event}");
        } else {
            warn!(status, message = %self.message, "{event}");
        }
    }

    fn into_body(self) -> ErrorResponse {
        let additional_data = if self.additional_data.is_empty() {
            None
        } else {
            Some(Value::Object(self.additional_data))
        };
        ErrorBody::new(self.message, self.label, additional_data, self.trace_id).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self.into_body())).into_response()
    }
}
