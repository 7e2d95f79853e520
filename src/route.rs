//! Routes.
//!
//! A [`Route`] is an identity (id, name, resolved relative URL), an ordered
//! list of [`Restriction`]s, a response handler and an optional
//! authentication binding. Build it, then hand it to a
//! [`RouteRegistry`](crate::RouteRegistry); once registered it is only ever
//! read.
//!
//! ```rust
//! use junction::{Comparer, Method, Request, Response, Route};
//!
//! # fn build() -> Result<Route, junction::Error> {
//! let route = Route::with_random_id("user", "users/profile")
//!     .restrict_by_methods([Method::Get, Method::Head])?
//!     .restrict_by_url_fragments(["/users/profile"], Comparer::CaseInsensitivePlain)?
//!     .respond_with(profile);
//! # Ok(route)
//! # }
//!
//! async fn profile(_req: Request) -> Response {
//!     Response::text("profile")
//! }
//! ```

use std::fmt;
use std::sync::Arc;

use tracing::trace;
use uuid::Uuid;

use crate::auth::{Authentication, AuthenticationProvider, AuthenticationResult};
use crate::comparer::Comparer;
use crate::error::Error;
use crate::handler::{self, BoxedHandler, Handler};
use crate::method::Method;
use crate::request::Request;
use crate::response::Response;
use crate::restriction::{
    CookieRestriction, MethodRestriction, RefererUrlFragmentRestriction,
    RefererUrlPathAndQueryRestriction, Restriction, RestrictionKind, UrlFragmentRestriction,
    UrlQueryStringRestriction, UrlSchemeRestriction,
};

/// A uniquely identified, named unit of dispatch.
pub struct Route {
    id: Uuid,
    name: String,
    resolved_relative_url: String,
    restrictions: Vec<Restriction>,
    handler: Option<BoxedHandler>,
    authentication: Option<Authentication>,
}

impl Route {
    pub fn new(name: impl Into<String>, id: Uuid, resolved_relative_url: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            resolved_relative_url: resolved_relative_url.into(),
            restrictions: Vec::new(),
            handler: None,
            authentication: None,
        }
    }

    /// Same as [`Route::new`] with a fresh random (v4) id.
    pub fn with_random_id(name: impl Into<String>, resolved_relative_url: impl Into<String>) -> Self {
        Self::new(name, Uuid::new_v4(), resolved_relative_url)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn name(&self) -> &str { &self.name }
    pub fn resolved_relative_url(&self) -> &str { &self.resolved_relative_url }

    // ── Restrictions ──────────────────────────────────────────────────────────

    /// Appends a restriction. Restrictions of the same kind accumulate; each
    /// one is its own AND term.
    pub fn add_restriction(&mut self, restriction: impl Into<Restriction>) -> &mut Self {
        self.restrictions.push(restriction.into());
        self
    }

    /// Chaining form of [`add_restriction`](Self::add_restriction).
    pub fn restrict(mut self, restriction: impl Into<Restriction>) -> Self {
        self.add_restriction(restriction);
        self
    }

    pub fn restrict_by_methods(self, methods: impl IntoIterator<Item = Method>) -> Result<Self, Error> {
        let r = MethodRestriction::new(methods.into_iter().map(Method::as_str))?;
        Ok(self.restrict(r))
    }

    pub fn restrict_by_url_scheme(self, scheme: &str, comparer: Comparer) -> Result<Self, Error> {
        Ok(self.restrict(UrlSchemeRestriction::new(scheme, comparer)?))
    }

    pub fn restrict_by_url_fragments<I, S>(self, fragments: I, comparer: Comparer) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.restrict(UrlFragmentRestriction::new(fragments, comparer)?))
    }

    pub fn restrict_by_query_string(
        self,
        field: &str,
        field_comparer: Comparer,
        value: &str,
        value_comparer: Comparer,
    ) -> Result<Self, Error> {
        let r = UrlQueryStringRestriction::new(field, field_comparer, value, value_comparer)?;
        Ok(self.restrict(r))
    }

    pub fn restrict_by_cookie(
        self,
        name: &str,
        name_comparer: Comparer,
        value: &str,
        value_comparer: Comparer,
    ) -> Result<Self, Error> {
        let r = CookieRestriction::new(name, name_comparer, value, value_comparer)?;
        Ok(self.restrict(r))
    }

    pub fn restrict_by_referer_url_fragments<I, S>(self, fragments: I, comparer: Comparer) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Ok(self.restrict(RefererUrlFragmentRestriction::new(fragments, comparer)?))
    }

    pub fn restrict_by_referer_url_path_and_query(self, path_and_query: &str, comparer: Comparer) -> Result<Self, Error> {
        Ok(self.restrict(RefererUrlPathAndQueryRestriction::new(path_and_query, comparer)?))
    }

    /// All restrictions, in attachment order.
    pub fn restrictions(&self) -> &[Restriction] { &self.restrictions }

    /// All restrictions of one kind, in attachment order.
    ///
    /// ```rust
    /// # use junction::{Comparer, CookieRestriction, Route};
    /// # fn main() -> Result<(), junction::Error> {
    /// let route = Route::with_random_id("name", "relative")
    ///     .restrict_by_cookie("name", Comparer::CaseSensitivePlain, "value", Comparer::CaseSensitivePlain)?;
    ///
    /// let cookies: Vec<&CookieRestriction> = route.restrictions_of().collect();
    /// assert_eq!(cookies.len(), 1);
    /// assert_eq!(cookies[0].name(), "name");
    /// # Ok(())
    /// # }
    /// ```
    pub fn restrictions_of<T: RestrictionKind>(&self) -> impl Iterator<Item = &T> {
        self.restrictions.iter().filter_map(T::from_restriction)
    }

    pub fn clear_restrictions(&mut self) -> &mut Self {
        self.restrictions.clear();
        self
    }

    pub fn clear_restrictions_of<T: RestrictionKind>(&mut self) -> &mut Self {
        self.restrictions.retain(|r| T::from_restriction(r).is_none());
        self
    }

    /// True when every restriction matches. Restrictions run in attachment
    /// order and evaluation stops at the first one that doesn't match. A
    /// route with no restrictions matches every request.
    pub async fn matches_request(&self, request: &Request) -> bool {
        for (index, restriction) in self.restrictions.iter().enumerate() {
            if !restriction.matches_request(request).await {
                trace!(route = %self.name, index, kind = restriction.kind(), "restriction did not match");
                return false;
            }
        }
        true
    }

    // ── Response ──────────────────────────────────────────────────────────────

    /// Binds the response handler. A second call replaces the first.
    pub fn respond_with(mut self, handler: impl Handler) -> Self {
        self.set_handler(handler);
        self
    }

    pub fn set_handler(&mut self, handler: impl Handler) -> &mut Self {
        self.handler = Some(handler::boxed(handler));
        self
    }

    pub fn has_handler(&self) -> bool { self.handler.is_some() }

    /// Runs the bound handler.
    pub async fn respond(&self, request: Request) -> Result<Response, Error> {
        let handler = self.handler.as_ref()
            .ok_or_else(|| Error::MissingHandler { name: self.name.clone() })?;
        Ok(handler(request).await)
    }

    // ── Authentication ────────────────────────────────────────────────────────

    /// Binds `provider`, consulted only for routes where `must_authenticate`
    /// returns true.
    pub fn authenticate<P, F>(mut self, provider: P, must_authenticate: F) -> Self
    where
        P: AuthenticationProvider + 'static,
        F: Fn(&Route) -> bool + Send + Sync + 'static,
    {
        self.set_authentication(Arc::new(provider), Arc::new(must_authenticate));
        self
    }

    /// Binds `provider` for every request to this route.
    pub fn authenticate_with<P: AuthenticationProvider + 'static>(self, provider: P) -> Self {
        self.authenticate(provider, |_: &Route| true)
    }

    /// Shared-provider form of [`authenticate`](Self::authenticate), for
    /// collaborators that bind one provider to many routes.
    pub fn set_authentication(
        &mut self,
        provider: Arc<dyn AuthenticationProvider>,
        must_authenticate: crate::auth::AuthenticationPredicate,
    ) -> &mut Self {
        self.authentication = Some(Authentication { provider, must_authenticate });
        self
    }

    pub fn requires_authentication(&self) -> bool {
        self.authentication.as_ref().is_some_and(|a| (a.must_authenticate)(self))
    }

    /// Succeeds outright when no provider is bound or the predicate says this
    /// route needs none; otherwise returns the provider's verdict.
    pub async fn authenticate_request(&self, request: &Request) -> AuthenticationResult {
        match &self.authentication {
            Some(auth) if (auth.must_authenticate)(self) => {
                auth.provider.authenticate(request, self).await
            }
            _ => AuthenticationResult::AuthenticationSucceeded,
        }
    }

    /// The bound provider's failure response, or `401` without one.
    pub fn failed_authentication_response(&self, request: &Request) -> Response {
        match &self.authentication {
            Some(auth) => auth.provider.failed_authentication_response(request),
            None => Response::unauthorized(),
        }
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("resolved_relative_url", &self.resolved_relative_url)
            .field("restrictions", &self.restrictions)
            .field("has_handler", &self.handler.is_some())
            .field("authenticated", &self.authentication.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use async_trait::async_trait;
    use bytes::Bytes;
    use http::StatusCode;

    use super::*;
    use crate::restriction::RequestRestriction;

    fn request(method: &str, uri: &str) -> Request {
        http::Request::builder()
            .method(method)
            .uri(uri)
            .body(Bytes::new())
            .unwrap()
            .into()
    }

    #[derive(Debug)]
    struct Counting {
        result: bool,
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl RequestRestriction for Counting {
        async fn matches_request(&self, _request: &Request) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
        }
    }

    #[tokio::test]
    async fn method_restriction_rejects_other_methods() {
        let route = Route::with_random_id("name", "relative")
            .restrict_by_methods([Method::Get])
            .unwrap();

        assert!(route.matches_request(&request("GET", "/")).await);
        assert!(!route.matches_request(&request("POST", "/")).await);
    }

    #[tokio::test]
    async fn no_restrictions_matches_everything() {
        let route = Route::with_random_id("name", "relative");
        assert!(route.matches_request(&request("DELETE", "/anything")).await);
    }

    #[tokio::test]
    async fn evaluation_stops_at_first_failure() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let route = Route::with_random_id("name", "relative")
            .restrict(Restriction::custom(Counting { result: false, calls: Arc::clone(&first) }))
            .restrict(Restriction::custom(Counting { result: true, calls: Arc::clone(&second) }));

        assert!(!route.matches_request(&request("GET", "/")).await);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn restrictions_are_anded() {
        let route = Route::with_random_id("name", "relative")
            .restrict_by_methods([Method::Get]).unwrap()
            .restrict_by_query_string("f", Comparer::CaseSensitivePlain, "v", Comparer::CaseSensitivePlain).unwrap();

        assert!(route.matches_request(&request("GET", "/?f=v")).await);
        assert!(!route.matches_request(&request("GET", "/?f=w")).await);
        assert!(!route.matches_request(&request("POST", "/?f=v")).await);
    }

    #[tokio::test]
    async fn separate_method_restrictions_are_separate_terms() {
        let route = Route::with_random_id("name", "relative")
            .restrict_by_methods([Method::Get]).unwrap()
            .restrict_by_methods([Method::Post]).unwrap();

        assert_eq!(route.restrictions_of::<MethodRestriction>().count(), 2);
        assert!(!route.matches_request(&request("GET", "/")).await);
        assert!(!route.matches_request(&request("POST", "/")).await);
    }

    #[test]
    fn restrictions_of_filters_by_kind_in_order() {
        let mut route = Route::with_random_id("name", "relative")
            .restrict_by_cookie("a", Comparer::CaseSensitivePlain, "1", Comparer::CaseSensitivePlain).unwrap()
            .restrict_by_methods([Method::Get]).unwrap()
            .restrict_by_cookie("b", Comparer::CaseSensitiveRegex, "2", Comparer::CaseInsensitiveRegex).unwrap();

        let cookies: Vec<_> = route.restrictions_of::<CookieRestriction>().collect();
        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name(), "a");
        assert_eq!(cookies[1].name(), "b");
        assert_eq!(cookies[1].name_comparer(), Comparer::CaseSensitiveRegex);
        assert_eq!(cookies[1].value_comparer(), Comparer::CaseInsensitiveRegex);

        route.clear_restrictions_of::<CookieRestriction>();
        assert_eq!(route.restrictions().len(), 1);
        route.clear_restrictions();
        assert!(route.restrictions().is_empty());
    }

    #[tokio::test]
    async fn last_handler_wins() {
        let route = Route::with_random_id("name", "relative")
            .respond_with(|_req: Request| async { "first" })
            .respond_with(|_req: Request| async { StatusCode::ACCEPTED });

        let response = route.respond(request("GET", "/")).await.unwrap();
        assert_eq!(response.status_code(), StatusCode::ACCEPTED);
    }

    #[tokio::test]
    async fn respond_without_handler_fails() {
        let route = Route::with_random_id("orphan", "relative");
        let err = route.respond(request("GET", "/")).await.unwrap_err();
        assert!(matches!(err, Error::MissingHandler { ref name } if name == "orphan"));
    }

    struct Deny {
        calls: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AuthenticationProvider for Deny {
        async fn authenticate(&self, _request: &Request, _route: &Route) -> AuthenticationResult {
            self.calls.fetch_add(1, Ordering::SeqCst);
            AuthenticationResult::AuthenticationFailed
        }

        fn failed_authentication_response(&self, _request: &Request) -> Response {
            Response::found("/login")
        }
    }

    #[tokio::test]
    async fn authentication_without_provider_succeeds() {
        let route = Route::with_random_id("name", "relative");
        let req = request("GET", "/");
        assert_eq!(route.authenticate_request(&req).await, AuthenticationResult::AuthenticationSucceeded);
        assert_eq!(route.failed_authentication_response(&req).status_code(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn authentication_delegates_to_provider() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = Route::with_random_id("name", "relative")
            .authenticate_with(Deny { calls: Arc::clone(&calls) });
        let req = request("GET", "/");

        assert!(route.requires_authentication());
        assert_eq!(route.authenticate_request(&req).await, AuthenticationResult::AuthenticationFailed);
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let failed = route.failed_authentication_response(&req);
        assert_eq!(failed.status_code(), StatusCode::FOUND);
        assert_eq!(failed.header("location"), Some("/login"));
    }

    #[tokio::test]
    async fn predicate_can_waive_authentication() {
        let calls = Arc::new(AtomicUsize::new(0));
        let route = Route::with_random_id("public", "relative")
            .authenticate(Deny { calls: Arc::clone(&calls) }, |route: &Route| route.name() != "public");

        assert!(!route.requires_authentication());
        assert!(route.authenticate_request(&request("GET", "/")).await.succeeded());
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
