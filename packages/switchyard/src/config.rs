//! Runtime configuration.
//!
//! Every option can be given as a flag or through the environment, so the
//! server can be configured the same way locally and in deployment.

use aerosol::Aero;
use clap::Parser;
use color_eyre::{Result, eyre::Context};
use derive_more::Debug;
use http::HeaderValue;
use time::Duration;

use crate::{
    api,
    auth::UserId,
    cookies::{CookieKey, SelectedOrganizationCookie, SessionCookie},
    redirect::{DEFAULT_REDIRECT, RedirectPolicy},
};

/// Options for signing and verifying cookies.
#[derive(Parser, Clone, Debug)]
pub struct CookieConfig {
    /// Secret used to sign cookies (at least 32 bytes)
    #[arg(long, env = "SWITCHYARD_COOKIE_SECRET")]
    #[debug(ignore)]
    pub cookie_secret: String,

    /// Issue cookies without the `Secure` attribute, for local development
    /// over plain HTTP
    #[arg(long, env = "SWITCHYARD_INSECURE_COOKIES")]
    pub insecure_cookies: bool,
}

impl CookieConfig {
    pub fn key(&self) -> Result<CookieKey> {
        CookieKey::from_secret(&self.cookie_secret).context("derive cookie key")
    }

    pub fn secure(&self) -> bool {
        !self.insecure_cookies
    }

    pub fn sessions(&self) -> Result<SessionCookie> {
        Ok(SessionCookie::new(self.key()?, self.secure()))
    }

    pub fn selection(&self) -> Result<SelectedOrganizationCookie> {
        Ok(SelectedOrganizationCookie::new(self.key()?, self.secure()))
    }
}

#[derive(Parser, Clone, Debug)]
pub struct ServeConfig {
    /// Port to listen on
    #[arg(long, env = "PORT", default_value = "3000")]
    pub port: u16,

    /// Host to bind to
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[command(flatten)]
    pub cookies: CookieConfig,

    /// Where to send callers whose redirect target is missing or unsafe
    #[arg(long, env = "SWITCHYARD_DEFAULT_REDIRECT", default_value = DEFAULT_REDIRECT)]
    pub default_redirect: String,

    /// Origins allowed to call the API with credentials
    #[arg(
        long = "allowed-origin",
        env = "SWITCHYARD_ALLOWED_ORIGINS",
        value_delimiter = ','
    )]
    pub allowed_origins: Vec<String>,
}

impl ServeConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Construct the application state.
    ///
    /// Dependencies are provided in reverse order of [`api::State`].
    pub fn state(&self) -> Result<api::State> {
        let redirects =
            RedirectPolicy::new(&self.default_redirect).context("configure default redirect")?;
        let selection = self.cookies.selection()?;
        let sessions = self.cookies.sessions()?;
        Ok(Aero::new().with(redirects).with(selection).with(sessions))
    }

    pub fn allowed_origins(&self) -> Result<Vec<HeaderValue>> {
        self.allowed_origins
            .iter()
            .map(|origin| {
                HeaderValue::from_str(origin.trim())
                    .with_context(|| format!("parse allowed origin: {origin:?}"))
            })
            .collect()
    }
}

/// Options for minting a session cookie by hand.
#[derive(Parser, Clone, Debug)]
pub struct IssueSessionConfig {
    #[command(flatten)]
    pub cookies: CookieConfig,

    /// The user the session belongs to; a random ID is used when omitted
    #[arg(long)]
    pub user_id: Option<uuid::Uuid>,

    /// The user's email address
    #[arg(long)]
    pub email: Option<String>,

    /// How long the session is valid, in hours
    #[arg(long, default_value = "24")]
    pub ttl_hours: i64,
}

impl IssueSessionConfig {
    pub fn user_id(&self) -> UserId {
        self.user_id
            .map(UserId::from_uuid)
            .unwrap_or_else(UserId::generate)
    }

    pub fn ttl(&self) -> Duration {
        Duration::hours(self.ttl_hours)
    }
}
