//! Change the current organization endpoint.
//!
//! Records the selected organization in a signed cookie. Navigating callers
//! (plain form posts) send `redirectTo` and get a redirect back; fetchers
//! omit it and get a JSON acknowledgment so the page doesn't navigate.

use aerosol::axum::Dep;
use axum::{
    Extension, Json,
    extract::{RawForm, rejection::RawFormRejection},
    http::{
        HeaderValue, StatusCode,
        header::{LOCATION, SET_COOKIE},
    },
    response::IntoResponse,
};
use clients::switchyard::v1::{ChangeOrganizationRequest, ChangeOrganizationResponse};
use tracing::info;

use crate::{
    api::RequestId,
    auth::SessionContext,
    cookies::SelectedOrganizationCookie,
    error::ApiError,
    form,
    redirect::RedirectPolicy,
};

/// Change the current user's organization.
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn handle(
    Dep(selection): Dep<SelectedOrganizationCookie>,
    Dep(redirects): Dep<RedirectPolicy>,
    Extension(request_id): Extension<RequestId>,
    session: SessionContext,
    body: Result<RawForm, RawFormRejection>,
) -> Response {
    match change(&selection, &redirects, body) {
        Ok(response) => response,
        Err(error) => {
            let error = error
                .with_user(session.user_id)
                .with_trace_id(Some(request_id));
            error.log("user.change_organization.error");
            Response::Error(error)
        }
    }
}

fn change(
    selection: &SelectedOrganizationCookie,
    redirects: &RedirectPolicy,
    body: Result<RawForm, RawFormRejection>,
) -> Result<Response, ApiError> {
    let RawForm(body) = body.map_err(ApiError::form_rejection)?;
    let request = form::parse_data::<ChangeOrganizationRequest>(&body)?;
    let organization_id = request.organization_id;

    let cookie = selection
        .serialize(&organization_id)
        .map_err(ApiError::normalize)?;

    match request.redirect_to.as_deref() {
        Some(redirect_to) => {
            let target = redirects.sanitize(Some(redirect_to));
            let location = HeaderValue::from_str(&target).or_else(|_| {
                HeaderValue::from_str(redirects.default_location()).map_err(|error| {
                    ApiError::normalize(error.into()).with_data("redirectTo", redirect_to)
                })
            })?;
            info!(
                %organization_id,
                location = ?location,
                "user.change_organization.redirect"
            );
            Ok(Response::Redirect { location, cookie })
        }
        None => {
            info!(%organization_id, "user.change_organization.success");
            Ok(Response::Changed {
                body: ChangeOrganizationResponse::success(organization_id),
                cookie,
            })
        }
    }
}

#[derive(Debug)]
pub enum Response {
    Redirect {
        location: HeaderValue,
        cookie: HeaderValue,
    },
    Changed {
        body: ChangeOrganizationResponse,
        cookie: HeaderValue,
    },
    Error(ApiError),
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Redirect { location, cookie } => {
                (StatusCode::FOUND, [(LOCATION, location), (SET_COOKIE, cookie)]).into_response()
            }
            Response::Changed { body, cookie } => {
                (StatusCode::OK, [(SET_COOKIE, cookie)], Json(body)).into_response()
            }
            Response::Error(error) => error.into_response(),
        }
    }
}
