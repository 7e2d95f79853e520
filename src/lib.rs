//! # junction
//!
//! Restriction-based HTTP routing. A route is not a path pattern: it is a
//! list of restrictions (method, scheme, path fragment, query field, cookie,
//! referer) that must all hold for a request to land on it.
//!
//! ## The model
//!
//! - [`Comparer`]: how two strings are compared. Case-sensitive or not,
//!   plain equality or regex.
//! - [`Restriction`]: one predicate over one request attribute, built with
//!   a comparer. Invalid patterns fail here, at construction.
//! - [`Route`]: id, name, restrictions (AND, in order, short-circuit),
//!   a response handler, optional authentication.
//! - [`RouteRegistry`]: unique ids, unique names unless told otherwise,
//!   first-match-wins dispatch in registration order.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use junction::{Comparer, Method, Request, Response, Route, RouteRegistry, Server};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), junction::Error> {
//!     let registry = RouteRegistry::new()
//!         .route(
//!             Route::with_random_id("search", "search")
//!                 .restrict_by_methods([Method::Get])?
//!                 .restrict_by_url_fragments(["/search"], Comparer::CaseInsensitivePlain)?
//!                 .restrict_by_query_string("q", Comparer::CaseSensitivePlain, ".+", Comparer::CaseSensitiveRegex)?
//!                 .respond_with(search),
//!         )?
//!         .route(
//!             Route::with_random_id("home", "")
//!                 .restrict_by_methods([Method::Get, Method::Head])?
//!                 .restrict_by_url_fragments(["/"], Comparer::CaseSensitivePlain)?
//!                 .respond_with(home),
//!         )?;
//!
//!     Server::bind("0.0.0.0:3000")?.serve(registry).await
//! }
//!
//! async fn search(req: Request) -> Response {
//!     let q = req.query_pairs().find(|(k, _)| k == "q").map(|(_, v)| v.into_owned());
//!     Response::text(format!("results for {}", q.unwrap_or_default()))
//! }
//!
//! async fn home(_req: Request) -> &'static str {
//!     "home"
//! }
//! ```

mod auth;
mod comparer;
mod error;
mod handler;
mod method;
mod registry;
mod request;
mod response;
mod restriction;
mod route;
mod server;

pub use auth::{
    AuthenticationPredicate, AuthenticationProvider, AuthenticationResult,
    CookieAuthenticationProvider, DEFAULT_RETURN_URL_FIELD,
};
pub use comparer::{Comparer, CompiledValue};
pub use error::Error;
pub use handler::Handler;
pub use method::Method;
pub use registry::{MatchResult, MatchResultType, RouteRegistry};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use restriction::{
    CookieRestriction, MethodRestriction, RefererUrlFragmentRestriction,
    RefererUrlPathAndQueryRestriction, RequestRestriction, Restriction, RestrictionKind,
    UrlFragmentRestriction, UrlQueryStringRestriction, UrlSchemeRestriction,
};
pub use route::Route;
pub use server::{Server, dispatch};
