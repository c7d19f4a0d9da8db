use aerosol::axum::Dep;
use axum::{Json, http::HeaderMap, response::IntoResponse};
use clients::switchyard::v1::CurrentOrganizationResponse;
use tracing::info;

use crate::{auth::SessionContext, cookies::SelectedOrganizationCookie};

/// Report the organization recorded by the selection cookie.
///
/// A missing or incorrectly signed cookie reads as no selection.
#[tracing::instrument(skip_all, fields(user_id = %session.user_id))]
pub async fn handle(
    Dep(selection): Dep<SelectedOrganizationCookie>,
    session: SessionContext,
    headers: HeaderMap,
) -> Response {
    let organization_id = selection.parse(&headers);
    info!(?organization_id, "user.current_organization.success");
    Response::Success(CurrentOrganizationResponse::new(organization_id))
}

#[derive(Debug)]
pub enum Response {
    Success(CurrentOrganizationResponse),
}

impl IntoResponse for Response {
    fn into_response(self) -> axum::response::Response {
        match self {
            Response::Success(body) => Json(body).into_response(),
        }
    }
}
