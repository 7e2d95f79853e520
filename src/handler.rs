//! Response handlers.
//!
//! A route's handler runs only after the route has matched and the request
//! has passed authentication. Closures and async functions taking a
//! [`Request`] are handlers; so is any type that implements [`Handler`]
//! itself, which is how a handler carries its own state:
//!
//! ```rust
//! use std::future::{Ready, ready};
//! use junction::{Handler, Request, Response, Route};
//!
//! struct Static(&'static str);
//!
//! impl Handler for Static {
//!     type Output = Response;
//!     type Future = Ready<Response>;
//!
//!     fn call(&self, _request: Request) -> Self::Future {
//!         ready(Response::text(self.0))
//!     }
//! }
//!
//! let route = Route::with_random_id("robots", "robots.txt")
//!     .respond_with(Static("User-agent: *"));
//! assert!(route.has_handler());
//! ```

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::request::Request;
use crate::response::{IntoResponse, Response};

pub(crate) type BoxFuture = Pin<Box<dyn Future<Output = Response> + Send + 'static>>;

/// What a route stores: any [`Handler`], erased to one signature.
pub(crate) type BoxedHandler = Arc<dyn Fn(Request) -> BoxFuture + Send + Sync + 'static>;

/// Produces the response for a matched, authenticated request.
pub trait Handler: Send + Sync + 'static {
    type Output: IntoResponse;
    type Future: Future<Output = Self::Output> + Send + 'static;

    fn call(&self, request: Request) -> Self::Future;
}

impl<F, Fut> Handler for F
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future + Send + 'static,
    Fut::Output: IntoResponse,
{
    type Output = Fut::Output;
    type Future = Fut;

    fn call(&self, request: Request) -> Fut {
        self(request)
    }
}

pub(crate) fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(move |request| {
        let fut = handler.call(request);
        Box::pin(async move { fut.await.into_response() })
    })
}
