//! HTTP client for the Switchyard v1 API.

use std::sync::Arc;

use color_eyre::{
    Result, Section, SectionExt,
    eyre::{Context, OptionExt, eyre},
};
use cookie::Cookie;
use derive_more::{Debug, Display};
use http::header::{COOKIE, LOCATION, SET_COOKIE};
use reqwest::{Response, StatusCode, redirect::Policy};
use tap::Pipe;
use tracing::instrument;
use url::Url;

use super::{
    ChangeOrganizationRequest, ChangeOrganizationResponse, CurrentOrganizationResponse,
    OrganizationId, SELECTED_ORGANIZATION_COOKIE, SESSION_COOKIE,
};
use crate::{ContentType, Token};

/// Client for the Switchyard API.
///
/// The client never follows redirects: the redirect issued when changing
/// organizations is part of the API contract and is surfaced to the caller
/// as [`SwitchOutcome::Redirected`].
///
/// ## Cloning
///
/// This type is cheaply cloneable, and clones share the underlying HTTP
/// connection pool.
#[derive(Clone, Debug, Display)]
#[display("{base}")]
pub struct Client {
    #[debug("{:?}", base.as_str())]
    base: Arc<Url>,

    #[debug(skip)]
    http: reqwest::Client,

    session: Token,
}

/// The selection cookie issued by the server.
#[derive(Clone, PartialEq, Eq, Debug, Display)]
#[display("{name}={value}")]
#[debug("{name}={value}")]
pub struct SelectionCookie {
    name: String,
    value: String,
}

impl SelectionCookie {
    /// Parse the cookie out of a `Set-Cookie` header value.
    pub fn parse(set_cookie: &str) -> Result<Self> {
        let cookie = Cookie::parse_encoded(set_cookie.to_string()).context("parse set-cookie")?;
        if cookie.name() != SELECTED_ORGANIZATION_COOKIE {
            return Err(eyre!("unexpected cookie: {}", cookie.name()));
        }
        Ok(Self {
            name: cookie.name().to_string(),
            value: cookie.value().to_string(),
        })
    }

    /// The decoded (still signed) cookie value.
    pub fn value(&self) -> &str {
        &self.value
    }

    /// Render the cookie as a `name=value` pair for a `Cookie` request header.
    pub fn to_request_pair(&self) -> String {
        Cookie::new(self.name.clone(), self.value.clone())
            .encoded()
            .to_string()
    }
}

/// The result of changing the current organization.
#[derive(Clone, PartialEq, Eq, Debug)]
pub enum SwitchOutcome {
    /// The server redirected the caller; sent when a redirect target was given.
    Redirected {
        location: String,
        cookie: SelectionCookie,
    },

    /// The server acknowledged the change without navigating.
    Acknowledged {
        response: ChangeOrganizationResponse,
        cookie: SelectionCookie,
    },
}

impl SwitchOutcome {
    /// The selection cookie issued in either case.
    pub fn cookie(&self) -> &SelectionCookie {
        match self {
            SwitchOutcome::Redirected { cookie, .. } => cookie,
            SwitchOutcome::Acknowledged { cookie, .. } => cookie,
        }
    }
}

impl Client {
    /// Create a new client with the given base URL and session token.
    pub fn new(base: Url, session: Token) -> Result<Self> {
        let http = reqwest::Client::builder()
            .redirect(Policy::none())
            .build()
            .context("build http client")?;

        Ok(Self {
            base: Arc::new(base),
            http,
            session,
        })
    }

    /// Check that the service is reachable.
    #[instrument(skip(self))]
    pub async fn ping(&self) -> Result<()> {
        let url = self.base.join("api/v1/health")?;
        let response = self.http.get(url).send().await.context("request")?;
        match response.status() {
            StatusCode::OK => Ok(()),
            _ => unexpected(response).await,
        }
    }

    /// Change the current organization.
    #[instrument(skip(self))]
    pub async fn change_current_organization(
        &self,
        request: &ChangeOrganizationRequest,
    ) -> Result<SwitchOutcome> {
        let url = self.base.join("api/v1/user/change-current-organization")?;
        let response = self
            .http
            .post(url)
            .header(COOKIE, self.session_pair())
            .header(ContentType::ACCEPT, ContentType::Json.value())
            .header(ContentType::HEADER, ContentType::Form.value())
            .body(encode_form(request))
            .send()
            .await
            .context("send")?;

        match response.status() {
            StatusCode::FOUND => {
                let cookie = selection_cookie(&response)?;
                let location = response
                    .headers()
                    .get(LOCATION)
                    .ok_or_eyre("redirect without location")?
                    .to_str()
                    .context("location is not UTF8")?
                    .to_string();
                Ok(SwitchOutcome::Redirected { location, cookie })
            }
            StatusCode::OK if is_json(&response) => {
                let cookie = selection_cookie(&response)?;
                let response = response
                    .json::<ChangeOrganizationResponse>()
                    .await
                    .context("parse")?;
                Ok(SwitchOutcome::Acknowledged { response, cookie })
            }
            _ => unexpected(response).await,
        }
    }

    /// Read the organization recorded in the given selection cookie.
    #[instrument(skip(self))]
    pub async fn current_organization(
        &self,
        selection: Option<&SelectionCookie>,
    ) -> Result<Option<OrganizationId>> {
        let url = self.base.join("api/v1/user/current-organization")?;
        let cookies = match selection {
            Some(selection) => format!("{}; {}", self.session_pair(), selection.to_request_pair()),
            None => self.session_pair(),
        };
        let response = self
            .http
            .get(url)
            .header(COOKIE, cookies)
            .send()
            .await
            .context("send")?;

        match response.status() {
            StatusCode::OK => response
                .json::<CurrentOrganizationResponse>()
                .await
                .context("parse")?
                .organization_id
                .pipe(Ok),
            _ => unexpected(response).await,
        }
    }

    fn session_pair(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.session.expose())
    }
}

/// Encode the request as an urlencoded form body.
fn encode_form(request: &ChangeOrganizationRequest) -> String {
    let mut form = url::form_urlencoded::Serializer::new(String::new());
    form.append_pair("organizationId", request.organization_id.as_str());
    if let Some(redirect_to) = &request.redirect_to {
        form.append_pair("redirectTo", redirect_to);
    }
    form.finish()
}

fn is_json(response: &Response) -> bool {
    response
        .headers()
        .get(ContentType::HEADER)
        .is_some_and(|content_type| content_type == ContentType::Json)
}

fn selection_cookie(response: &Response) -> Result<SelectionCookie> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|value| SelectionCookie::parse(value).ok())
        .ok_or_eyre("response did not set the selection cookie")
}

async fn unexpected<T>(response: Response) -> Result<T> {
    let status = response.status();
    let url = response.url().to_string();
    let request_id = request_id(&response);
    let body = response.text().await.unwrap_or_default();
    Err(eyre!("unexpected status code: {status}"))
        .with_section(|| url.header("Url:"))
        .with_section(|| body.header("Body:"))
        .with_section(|| request_id.header("Request ID:"))
}

/// Extract the request ID from a response header.
fn request_id(response: &Response) -> String {
    response
        .headers()
        .get("x-request-id")
        .and_then(|v| v.to_str().ok())
        .map(String::from)
        .unwrap_or_else(|| String::from("<not set>"))
}
