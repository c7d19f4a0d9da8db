//! API endpoint handlers for the service.
//!
//! ## Dependency injection
//!
//! We use [`aerosol`][^1] to manage dependencies and inject them into handlers.
//! Reference [`State`] for the list of dependencies; note that when providing
//! dependencies that are in this required list you need to provide them in
//! reverse order of the list.
//!
//! Items that are in the list can be extracted in handlers using the
//! [`Dep`](aerosol::axum::Dep) extractor.
//!
//! [^1]: https://docs.rs/aerosol
//!
//! ## Response types
//!
//! Handlers return a response enum that implements
//! [`IntoResponse`](axum::response::IntoResponse) rather than a generic
//! response type, so that the set of possible answers for each endpoint is
//! visible in one place. Failures are always rendered through
//! [`ApiError`](crate::error::ApiError).

use std::time::{Duration, Instant};

use aerosol::Aero;
use axum::{
    Router,
    extract::{DefaultBodyLimit, Request},
    http::{HeaderValue, Method, StatusCode, header},
    middleware::Next,
    response::Response,
};
use derive_more::{Debug, Display};
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    limit::RequestBodyLimitLayer,
    timeout::TimeoutLayer,
};
use tracing::Instrument;
use uuid::Uuid;

pub mod v1;

/// Requests are small form submissions; anything slower than this is stuck.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Body size limit. Form submissions carry two short fields.
const MAX_BODY_SIZE: usize = 64 * 1024;

/// Header carrying the request ID in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

pub type State = Aero![
    crate::cookies::SessionCookie,
    crate::cookies::SelectedOrganizationCookie,
    crate::redirect::RedirectPolicy,
];

/// The ID assigned to a request by [`trace_request`].
///
/// Available to handlers and extractors as a request extension.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[debug("{_0:?}")]
pub struct RequestId(String);

impl RequestId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

pub fn router(state: State, allowed_origins: Vec<HeaderValue>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(RequestBodyLimitLayer::new(MAX_BODY_SIZE))
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            REQUEST_TIMEOUT,
        ));

    // Browsers only send the session cookie cross-origin when credentials are
    // allowed, which in turn requires explicit origins, methods, and headers.
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::HEAD, Method::POST])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers([header::LOCATION, header::HeaderName::from_static(REQUEST_ID_HEADER)])
        .allow_credentials(true);

    Router::new()
        .nest("/api/v1", v1::router())
        .layer(DefaultBodyLimit::max(MAX_BODY_SIZE))
        .layer(middleware)
        .layer(cors)
        .layer(axum::middleware::from_fn(trace_request))
        .with_state(state)
}

async fn trace_request(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|id| id.to_str().map(|id| id.to_string()).ok())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    request.extensions_mut().insert(RequestId::new(id.clone()));

    let start = Instant::now();
    let url = request.uri().to_string();
    let method = request.method().to_string();

    let span = tracing::info_span!("http.request", %id, %url, %method);
    async move {
        let mut response = next.run(request).await;
        let status = response.status();
        let duration = start.elapsed();
        tracing::info!(%id, %url, %method, %status, ?duration, "http.request.response");

        if let Ok(id) = HeaderValue::from_str(&id) {
            response.headers_mut().insert(REQUEST_ID_HEADER, id);
        }
        response
    }
    .instrument(span)
    .await
}
