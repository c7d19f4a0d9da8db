//! Open-redirect protection.
//!
//! Redirect targets supplied by clients are only honored when they are
//! same-origin relative paths. Anything else (absolute URLs,
//! protocol-relative URLs, backslash tricks) is replaced with a configured
//! default. Targets are used verbatim; no trimming or normalization.

use color_eyre::{Result, eyre::bail};

/// The default location used when a requested target is rejected.
pub const DEFAULT_REDIRECT: &str = "/";

/// Check whether a target is a safe same-origin path.
pub fn is_safe(to: &str) -> bool {
    to.starts_with('/')
        && !to.starts_with("//")
        && !to.starts_with("/\\")
        && !to.chars().any(|c| c.is_ascii_control())
}

/// Sanitize a redirect target, falling back to `default` when it is missing,
/// empty, or unsafe.
pub fn safe_redirect<'a>(to: Option<&'a str>, default: &'a str) -> &'a str {
    match to {
        Some(to) if is_safe(to) => to,
        _ => default,
    }
}

/// The redirect policy in effect for the service.
#[derive(Clone, Debug)]
pub struct RedirectPolicy {
    default: String,
}

impl RedirectPolicy {
    /// Create a policy with the given fallback location, which must itself be
    /// safe.
    pub fn new(default: impl Into<String>) -> Result<Self> {
        let default = default.into();
        if !is_safe(&default) {
            bail!("default redirect must be a same-origin path: {default:?}");
        }
        Ok(Self { default })
    }

    /// The fallback location.
    pub fn default_location(&self) -> &str {
        &self.default
    }

    /// Sanitize a client-supplied target.
    pub fn sanitize(&self, to: Option<&str>) -> String {
        safe_redirect(to, &self.default).to_string()
    }
}

impl Default for RedirectPolicy {
    fn default() -> Self {
        Self {
            default: String::from(DEFAULT_REDIRECT),
        }
    }
}
