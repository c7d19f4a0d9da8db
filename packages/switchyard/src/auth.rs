use aerosol::axum::Dep;
use axum::{extract::FromRequestParts, http::request::Parts};
use derive_more::{Debug, Display};
use serde::{Deserialize, Serialize};
use time::{Duration, OffsetDateTime};
use tracing::{error, warn};
use uuid::Uuid;

use crate::{
    api::{self, RequestId},
    cookies::SessionCookie,
    error::ApiError,
};

pub use clients::switchyard::v1::OrganizationId;

/// An ID uniquely identifying a user.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Display, Deserialize, Serialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }

    /// Generate a new random user ID.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

/// Session context for an authenticated user.
///
/// The session is carried by the signed [`SessionCookie`]; this type can be
/// extracted from requests using Axum's extractor system, which verifies the
/// cookie signature and expiration before the handler is called.
///
/// Handlers only ever read the session. Minting sessions is the job of
/// whatever performs the sign-in; see [`SessionCookie::issue`].
#[derive(Clone, Eq, PartialEq, Debug, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionContext {
    /// The acting user.
    pub user_id: UserId,

    /// The user's email address, if the sign-in provider supplied one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[debug(skip)]
    pub email: Option<String>,

    /// When the session stops being accepted.
    #[serde(with = "time::serde::timestamp")]
    pub expires_at: OffsetDateTime,
}

impl SessionContext {
    /// Create a session for the user that is valid for `ttl` from now.
    pub fn new(user_id: UserId, email: Option<String>, ttl: Duration) -> Self {
        Self {
            user_id,
            email,
            expires_at: OffsetDateTime::now_utc() + ttl,
        }
    }

    /// Check whether the session has expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at <= OffsetDateTime::now_utc()
    }
}

impl FromRequestParts<api::State> for SessionContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &api::State,
    ) -> Result<Self, Self::Rejection> {
        let trace_id = parts.extensions.get::<RequestId>().cloned();

        let Dep(sessions) = Dep::<SessionCookie>::from_request_parts(parts, state)
            .await
            .map_err(|_| {
                error!("auth.session.not_configured");
                ApiError::internal("Session handling is not configured")
                    .with_trace_id(trace_id.clone())
            })?;

        match sessions.parse(&parts.headers) {
            Some(session) if session.is_expired() => {
                warn!(user_id = %session.user_id, "auth.session.expired");
                Err(ApiError::unauthenticated().with_trace_id(trace_id))
            }
            Some(session) => Ok(session),
            None => {
                warn!("auth.session.missing");
                Err(ApiError::unauthenticated().with_trace_id(trace_id))
            }
        }
    }
}
