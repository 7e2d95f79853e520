//! Outgoing HTTP response type and the [`IntoResponse`] conversion trait.
//!
//! The routing core never looks inside a [`Response`]. Handlers build one,
//! authentication providers build one when a request is turned away, and the
//! serving adapter hands it to hyper.

use bytes::Bytes;
use http::header::{CONTENT_TYPE, LOCATION};
use http::{HeaderName, HeaderValue, StatusCode};
use http_body_util::Full;
use tracing::warn;

// ── Response ─────────────────────────────────────────────────────────────────

/// An outgoing HTTP response.
///
/// ```rust
/// use http::StatusCode;
/// use junction::Response;
///
/// Response::json(br#"{"id":1}"#.to_vec());
/// Response::text("hello");
/// Response::status(StatusCode::NO_CONTENT);
///
/// Response::builder()
///     .status(StatusCode::CREATED)
///     .header("location", "/users/42")
///     .json(br#"{"id":42}"#.to_vec());
/// ```
#[derive(Debug)]
pub struct Response {
    inner: http::Response<Full<Bytes>>,
}

impl Response {
    /// `200 OK`, `application/json`.
    pub fn json(body: impl Into<Bytes>) -> Self {
        Self::builder().json(body)
    }

    /// `200 OK`, `text/plain; charset=utf-8`.
    pub fn text(body: impl Into<String>) -> Self {
        Self::builder().text(body)
    }

    /// Response with no body.
    pub fn status(code: StatusCode) -> Self {
        Self::builder().status(code).no_body()
    }

    /// `401 Unauthorized`.
    pub fn unauthorized() -> Self {
        Self::status(StatusCode::UNAUTHORIZED)
    }

    /// `302 Found` redirect.
    pub fn found(location: &str) -> Self {
        Self::builder().status(StatusCode::FOUND).header(LOCATION.as_str(), location).no_body()
    }

    /// `303 See Other` redirect.
    pub fn see_other(location: &str) -> Self {
        Self::builder().status(StatusCode::SEE_OTHER).header(LOCATION.as_str(), location).no_body()
    }

    /// Builder for responses that need a custom status or extra headers.
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder { headers: Vec::new(), status: StatusCode::OK }
    }

    pub fn status_code(&self) -> StatusCode { self.inner.status() }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.inner.headers().get(name).and_then(|v| v.to_str().ok())
    }

    /// The underlying `http::Response`, ready for hyper.
    pub fn into_http(self) -> http::Response<Full<Bytes>> {
        self.inner
    }
}

// ── ResponseBuilder ───────────────────────────────────────────────────────────

/// Fluent builder for [`Response`].
///
/// Obtain via [`Response::builder()`]. Defaults to `200 OK`. Terminated by a
/// typed body method.
pub struct ResponseBuilder {
    headers: Vec<(HeaderName, HeaderValue)>,
    status: StatusCode,
}

impl ResponseBuilder {
    pub fn status(mut self, code: StatusCode) -> Self {
        self.status = code;
        self
    }

    /// Adds a header. Names or values that are not valid HTTP are dropped with
    /// a warning rather than failing the response.
    pub fn header(mut self, name: &str, value: &str) -> Self {
        match (HeaderName::try_from(name), HeaderValue::try_from(value)) {
            (Ok(name), Ok(value)) => self.headers.push((name, value)),
            _ => warn!(name, "dropping invalid response header"),
        }
        self
    }

    pub fn json(self, body: impl Into<Bytes>) -> Response {
        self.finish(Some("application/json"), body.into())
    }

    pub fn text(self, body: impl Into<String>) -> Response {
        self.finish(Some("text/plain; charset=utf-8"), Bytes::from(body.into()))
    }

    /// Terminate with an arbitrary content type (`text/html`, `text/css`, ...).
    /// A content type that is not a valid header value is dropped with a
    /// warning, like [`header`](Self::header).
    pub fn bytes(self, content_type: &str, body: impl Into<Bytes>) -> Response {
        self.finish(Some(content_type), body.into())
    }

    pub fn no_body(self) -> Response {
        self.finish(None, Bytes::new())
    }

    fn finish(self, content_type: Option<&str>, body: Bytes) -> Response {
        let mut inner = http::Response::new(Full::new(body));
        *inner.status_mut() = self.status;
        let headers = inner.headers_mut();
        if let Some(ct) = content_type {
            match HeaderValue::try_from(ct) {
                Ok(value) => { headers.insert(CONTENT_TYPE, value); }
                Err(_) => warn!(content_type = ct, "dropping invalid content type"),
            }
        }
        for (name, value) in self.headers {
            headers.append(name, value);
        }
        Response { inner }
    }
}

// ── IntoResponse ──────────────────────────────────────────────────────────────

/// Conversion into an HTTP [`Response`].
///
/// Implement on your own types to return them directly from handlers.
pub trait IntoResponse {
    fn into_response(self) -> Response;
}

impl IntoResponse for Response {
    fn into_response(self) -> Response { self }
}

impl IntoResponse for &'static str {
    fn into_response(self) -> Response { Response::text(self) }
}

impl IntoResponse for String {
    fn into_response(self) -> Response { Response::text(self) }
}

/// Return a bare status from a handler: `return StatusCode::NOT_FOUND`
impl IntoResponse for StatusCode {
    fn into_response(self) -> Response { Response::status(self) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_content_type_is_dropped() {
        let response = Response::builder().bytes("text/html\n", "x");

        assert_eq!(response.status_code(), StatusCode::OK);
        assert_eq!(response.header("content-type"), None);
        assert_eq!(Response::builder().bytes("text/css", "x").header("content-type"), Some("text/css"));
    }

    #[test]
    fn invalid_header_is_dropped() {
        let response = Response::builder().header("x-ok", "1").header("bad name", "2").no_body();

        assert_eq!(response.header("x-ok"), Some("1"));
        assert_eq!(response.into_http().headers().len(), 1);
    }
}
