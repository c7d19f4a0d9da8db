//! Signed cookies.
//!
//! Both cookies the service understands are signed with HMAC-SHA256 using a
//! key derived from the configured secret:
//!
//! - [`SessionCookie`] carries the [`SessionContext`] of the acting user.
//! - [`SelectedOrganizationCookie`] records the organization the user most
//!   recently switched to.
//!
//! Signing (as opposed to encrypting) is deterministic: the same value always
//! produces the same cookie, which means re-selecting an organization is
//! idempotent on the wire.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use clients::{
    Token,
    switchyard::v1::{SELECTED_ORGANIZATION_COOKIE, SESSION_COOKIE},
};
use color_eyre::{
    Result,
    eyre::{Context, OptionExt, bail},
};
use cookie::{Cookie, CookieJar, Key, SameSite};
use derive_more::Debug;
use http::{HeaderMap, HeaderValue, header::COOKIE};
use rand::RngCore;
use tap::Pipe;
use time::Duration;

use crate::auth::{OrganizationId, SessionContext};

/// The key used to sign and verify cookies.
#[derive(Clone, Debug)]
#[debug("CookieKey([redacted])")]
pub struct CookieKey(Key);

impl CookieKey {
    /// Secrets shorter than this are rejected.
    pub const MIN_SECRET_LEN: usize = 32;

    /// Derive a signing key from a secret.
    pub fn from_secret(secret: impl AsRef<[u8]>) -> Result<Self> {
        let secret = secret.as_ref();
        if secret.len() < Self::MIN_SECRET_LEN {
            bail!(
                "cookie secret must be at least {} bytes, got {}",
                Self::MIN_SECRET_LEN,
                secret.len()
            );
        }
        Ok(Self(Key::derive_from(secret)))
    }

    /// Generate a new random secret suitable for [`CookieKey::from_secret`].
    pub fn generate_secret() -> String {
        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        hex::encode(bytes)
    }

    /// Sign the cookie's value, keeping its attributes.
    fn sign(&self, cookie: Cookie<'static>) -> Result<Cookie<'static>> {
        let name = cookie.name().to_string();
        let mut jar = CookieJar::new();
        jar.signed_mut(&self.0).add(cookie);
        jar.get(&name)
            .cloned()
            .ok_or_eyre("signed cookie missing from jar")
    }

    /// Verify the cookie's signature, returning it with the plain value.
    fn verify(&self, cookie: Cookie<'static>) -> Option<Cookie<'static>> {
        let name = cookie.name().to_string();
        let mut jar = CookieJar::new();
        jar.add_original(cookie);
        jar.signed(&self.0).get(&name)
    }

    /// Find the first cookie with the given name whose signature verifies.
    fn find_verified(&self, headers: &HeaderMap, name: &str) -> Option<Cookie<'static>> {
        request_cookies(headers)
            .filter(|cookie| cookie.name() == name)
            .find_map(|cookie| self.verify(cookie))
    }
}

/// Iterate the cookies sent in the request's `Cookie` headers.
///
/// Values are percent-decoded; malformed pairs are skipped.
pub fn request_cookies(headers: &HeaderMap) -> impl Iterator<Item = Cookie<'static>> + '_ {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| Cookie::split_parse_encoded(value.to_string()))
        .filter_map(Result::ok)
}

/// Codec for the selected-organization cookie.
#[derive(Clone, Debug)]
pub struct SelectedOrganizationCookie {
    key: CookieKey,
    secure: bool,
}

impl SelectedOrganizationCookie {
    /// The name of the cookie.
    pub const NAME: &'static str = SELECTED_ORGANIZATION_COOKIE;

    /// How long browsers keep the selection.
    pub const MAX_AGE: Duration = Duration::days(365);

    pub fn new(key: CookieKey, secure: bool) -> Self {
        Self { key, secure }
    }

    /// Build the signed cookie recording the organization.
    pub fn build(&self, organization_id: &OrganizationId) -> Result<Cookie<'static>> {
        Cookie::build((Self::NAME, organization_id.as_str().to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(Self::MAX_AGE)
            .build()
            .pipe(|cookie| self.key.sign(cookie))
    }

    /// Render the `Set-Cookie` header value recording the organization.
    pub fn serialize(&self, organization_id: &OrganizationId) -> Result<HeaderValue> {
        let cookie = self.build(organization_id)?;
        HeaderValue::from_str(&cookie.encoded().to_string()).context("encode set-cookie header")
    }

    /// Read the selected organization from the request, if a correctly signed
    /// cookie is present.
    pub fn parse(&self, headers: &HeaderMap) -> Option<OrganizationId> {
        self.key
            .find_verified(headers, Self::NAME)
            .map(|cookie| OrganizationId::new(cookie.value()))
    }
}

/// Codec for the session cookie.
#[derive(Clone, Debug)]
pub struct SessionCookie {
    key: CookieKey,
    secure: bool,
}

impl SessionCookie {
    /// The name of the cookie.
    pub const NAME: &'static str = SESSION_COOKIE;

    pub fn new(key: CookieKey, secure: bool) -> Self {
        Self { key, secure }
    }

    /// Issue the signed cookie value for the session.
    ///
    /// The value only contains characters that are valid in a cookie without
    /// further encoding, so it can be sent as-is in a `Cookie` header.
    pub fn issue(&self, session: &SessionContext) -> Result<Token> {
        let cookie = self.build(session)?;
        Ok(Token::from(cookie.value()))
    }

    fn build(&self, session: &SessionContext) -> Result<Cookie<'static>> {
        let payload = serde_json::to_vec(session).context("encode session")?;
        let max_age = session.expires_at - time::OffsetDateTime::now_utc();
        Cookie::build((Self::NAME, URL_SAFE_NO_PAD.encode(payload)))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure)
            .max_age(max_age.max(Duration::ZERO))
            .build()
            .pipe(|cookie| self.key.sign(cookie))
    }

    /// Read the session from the request, if a correctly signed cookie is
    /// present. Expiration is not checked here.
    pub fn parse(&self, headers: &HeaderMap) -> Option<SessionContext> {
        let cookie = self.key.find_verified(headers, Self::NAME)?;
        let payload = URL_SAFE_NO_PAD.decode(cookie.value()).ok()?;
        serde_json::from_slice(&payload).ok()
    }
}
