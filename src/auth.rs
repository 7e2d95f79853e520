//! Authentication hooks.
//!
//! junction does not know what a session, a ticket or a token is. A route can
//! be bound to an [`AuthenticationProvider`] together with a predicate that
//! decides whether the route needs authentication at all; the serving layer
//! asks the route, and the route asks the provider.
//!
//! [`CookieAuthenticationProvider`] covers the common case of a session
//! cookie plus a login page. Anything else implements the trait:
//!
//! ```rust
//! use async_trait::async_trait;
//! use junction::{AuthenticationProvider, AuthenticationResult, Request, Response, Route};
//!
//! struct SessionCookie;
//!
//! #[async_trait]
//! impl AuthenticationProvider for SessionCookie {
//!     async fn authenticate(&self, request: &Request, _route: &Route) -> AuthenticationResult {
//!         request.cookie("session").is_some().into()
//!     }
//!
//!     fn failed_authentication_response(&self, _request: &Request) -> Response {
//!         Response::found("/login")
//!     }
//! }
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use tracing::trace;
use uuid::Uuid;

use crate::error::Error;
use crate::registry::RouteRegistry;
use crate::request::Request;
use crate::response::Response;
use crate::route::Route;

/// Outcome of authenticating one request against one route.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum AuthenticationResult {
    AuthenticationSucceeded,
    AuthenticationFailed,
}

impl AuthenticationResult {
    pub fn succeeded(self) -> bool {
        self == Self::AuthenticationSucceeded
    }
}

impl From<bool> for AuthenticationResult {
    fn from(ok: bool) -> Self {
        if ok { Self::AuthenticationSucceeded } else { Self::AuthenticationFailed }
    }
}

/// Decides whether a request is allowed through to a route's handler.
#[async_trait]
pub trait AuthenticationProvider: Send + Sync {
    async fn authenticate(&self, request: &Request, route: &Route) -> AuthenticationResult;

    /// What to send back when [`authenticate`](Self::authenticate) fails:
    /// a `401`, a redirect to a login page, and so on.
    fn failed_authentication_response(&self, request: &Request) -> Response;
}

/// Decides, per route, whether the bound provider must be consulted.
pub type AuthenticationPredicate = Arc<dyn Fn(&Route) -> bool + Send + Sync + 'static>;

/// Provider and predicate as bound to a route.
#[derive(Clone)]
pub(crate) struct Authentication {
    pub(crate) provider: Arc<dyn AuthenticationProvider>,
    pub(crate) must_authenticate: AuthenticationPredicate,
}

// ── CookieAuthenticationProvider ──────────────────────────────────────────────

/// Query field [`CookieAuthenticationProvider::append_return_url`] uses.
pub const DEFAULT_RETURN_URL_FIELD: &str = "ReturnURL";

/// Authenticates requests by a session cookie whose value a caller-supplied
/// validator accepts (decrypts, looks up, checks expiry).
///
/// On failure it answers `401 Unauthorized`, or, once a redirect target is
/// set, redirects: `302 Found` for `GET`, `303 See Other` for everything
/// else, so a failed `POST` is not replayed against the login page.
///
/// ```rust
/// # fn main() -> Result<(), junction::Error> {
/// use junction::{CookieAuthenticationProvider, Request, Route, RouteRegistry};
///
/// let registry = RouteRegistry::new()
///     .route(Route::with_random_id("login", "account/login").respond_with(|_req: Request| async { "login" }))?;
///
/// let provider = CookieAuthenticationProvider::new("session", |ticket| ticket == "valid")
///     .redirect_to_route(&registry, "login")?
///     .append_return_url();
///
/// let registry = registry.route(
///     Route::with_random_id("admin", "admin")
///         .authenticate_with(provider)
///         .respond_with(|_req: Request| async { "admin" }),
/// )?;
/// # assert_eq!(registry.len(), 2);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct CookieAuthenticationProvider {
    cookie_name: String,
    validate: Arc<dyn Fn(&str) -> bool + Send + Sync + 'static>,
    redirect: Option<String>,
    return_url_field: Option<String>,
}

impl CookieAuthenticationProvider {
    /// Fails with `401 Unauthorized` until a redirect target is set.
    pub fn new<F>(cookie_name: impl Into<String>, validate: F) -> Self
    where
        F: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            cookie_name: cookie_name.into(),
            validate: Arc::new(validate),
            redirect: None,
            return_url_field: None,
        }
    }

    /// Redirects failed requests to the route named `name`.
    ///
    /// The route must already be registered; lookup fails the same way
    /// [`RouteRegistry::find_by_name`] does.
    pub fn redirect_to_route(self, registry: &RouteRegistry, name: &str) -> Result<Self, Error> {
        let route = registry.find_by_name(name)?;
        Ok(self.redirect_to(route.resolved_relative_url()))
    }

    /// Redirects failed requests to the route with `id`.
    pub fn redirect_to_route_id(self, registry: &RouteRegistry, id: Uuid) -> Result<Self, Error> {
        let route = registry.find_by_id(id).ok_or_else(|| Error::RouteNotFound(id.to_string()))?;
        Ok(self.redirect_to(route.resolved_relative_url()))
    }

    /// Redirects failed requests to `relative_url`, taken from the site root.
    pub fn redirect_to(mut self, relative_url: &str) -> Self {
        self.redirect = Some(format!("/{}", relative_url.trim_start_matches('/')));
        self
    }

    /// Appends the rejected request's path and query to the redirect as
    /// `ReturnURL=...`.
    pub fn append_return_url(self) -> Self {
        self.append_return_url_as(DEFAULT_RETURN_URL_FIELD)
    }

    pub fn append_return_url_as(mut self, field: impl Into<String>) -> Self {
        self.return_url_field = Some(field.into());
        self
    }

    pub fn cookie_name(&self) -> &str { &self.cookie_name }

    /// Where a failed request is sent, `None` meaning `401`.
    pub fn redirect_location(&self, request: &Request) -> Option<String> {
        let mut location = self.redirect.clone()?;
        if let Some(field) = &self.return_url_field {
            let return_url: String = url::form_urlencoded::byte_serialize(request.path_and_query().as_bytes()).collect();
            location.push(if location.contains('?') { '&' } else { '?' });
            location.push_str(field);
            location.push('=');
            location.push_str(&return_url);
        }
        Some(location)
    }
}

#[async_trait]
impl AuthenticationProvider for CookieAuthenticationProvider {
    async fn authenticate(&self, request: &Request, route: &Route) -> AuthenticationResult {
        let Some(ticket) = request.cookie(&self.cookie_name) else {
            trace!(route = route.name(), cookie = %self.cookie_name, "authentication cookie missing");
            return AuthenticationResult::AuthenticationFailed;
        };
        (self.validate)(ticket).into()
    }

    fn failed_authentication_response(&self, request: &Request) -> Response {
        match self.redirect_location(request) {
            None => Response::unauthorized(),
            Some(location) if request.method().eq_ignore_ascii_case("GET") => Response::found(&location),
            Some(location) => Response::see_other(&location),
        }
    }
}

impl std::fmt::Debug for CookieAuthenticationProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CookieAuthenticationProvider")
            .field("cookie_name", &self.cookie_name)
            .field("redirect", &self.redirect)
            .field("return_url_field", &self.return_url_field)
            .finish_non_exhaustive()
    }
}
