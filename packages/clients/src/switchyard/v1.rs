//! Switchyard v1 API types and client.

use bon::Builder;
use derive_more::{Debug, Display};
use serde::{Deserialize, Serialize};

#[cfg(feature = "client")]
mod client;

#[cfg(feature = "client")]
pub use client::{Client, SelectionCookie, SwitchOutcome};

/// Name of the cookie carrying the signed session.
pub const SESSION_COOKIE: &str = "__session";

/// Name of the cookie carrying the signed selected organization.
pub const SELECTED_ORGANIZATION_COOKIE: &str = "selected-organization-id";

/// An opaque organization identifier.
///
/// The service does not interpret the value; it is whatever the caller
/// submits, passed through unchanged.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug, Display, Serialize, Deserialize)]
#[debug("{_0:?}")]
#[serde(transparent)]
pub struct OrganizationId(String);

impl OrganizationId {
    /// Create an identifier from arbitrary text.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// View the identifier as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&OrganizationId> for OrganizationId {
    fn from(id: &OrganizationId) -> Self {
        id.clone()
    }
}

impl From<&str> for OrganizationId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for OrganizationId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for OrganizationId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Form body for changing the current organization.
///
/// When `redirect_to` is set the server answers with a redirect; otherwise it
/// answers with [`ChangeOrganizationResponse`].
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ChangeOrganizationRequest {
    /// The organization to select.
    #[builder(into)]
    pub organization_id: OrganizationId,

    /// Where to send the browser afterwards.
    #[builder(into)]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redirect_to: Option<String>,
}

/// Acknowledgment for non-navigating callers.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ChangeOrganizationResponse {
    pub success: bool,
    pub organization_id: OrganizationId,
}

impl ChangeOrganizationResponse {
    /// A successful acknowledgment for the given organization.
    pub fn success(organization_id: impl Into<OrganizationId>) -> Self {
        Self {
            success: true,
            organization_id: organization_id.into(),
        }
    }
}

/// The organization currently recorded in the selection cookie.
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct CurrentOrganizationResponse {
    pub organization_id: Option<OrganizationId>,
}

impl CurrentOrganizationResponse {
    pub fn new(organization_id: Option<OrganizationId>) -> Self {
        Self { organization_id }
    }
}

/// The JSON body returned for every failed request.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[non_exhaustive]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

/// Details of a failed request.
#[derive(Clone, PartialEq, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub struct ErrorBody {
    /// A message suitable for showing to the user.
    pub message: String,

    /// A short category for the failure, e.g. "Request validation".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,

    /// Structured context about the failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub additional_data: Option<serde_json::Value>,

    /// The request ID, for correlating with server logs.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl ErrorBody {
    pub fn new(
        message: impl Into<String>,
        label: Option<String>,
        additional_data: Option<serde_json::Value>,
        trace_id: Option<String>,
    ) -> Self {
        Self {
            message: message.into(),
            label,
            additional_data,
            trace_id,
        }
    }
}

impl From<ErrorBody> for ErrorResponse {
    fn from(error: ErrorBody) -> Self {
        Self { error }
    }
}
