//! Incoming HTTP request type.
//!
//! Restrictions only read from a request. Everything here is an accessor;
//! nothing mutates after construction.

use std::borrow::Cow;

use bytes::Bytes;
use http::header::{COOKIE, HOST, REFERER};
use http::{HeaderMap, Uri};
use tracing::trace;
use url::Url;

/// An incoming HTTP request.
///
/// Build one from any `http::Request` whose body converts into [`Bytes`]:
///
/// ```rust
/// use junction::Request;
///
/// let req: Request = http::Request::builder()
///     .method("POST")
///     .uri("https://example.com/users?page=2")
///     .header("cookie", "session=abc")
///     .body(Vec::<u8>::new())
///     .unwrap()
///     .into();
///
/// assert_eq!(req.scheme(), "https");
/// assert_eq!(req.path(), "/users");
/// assert_eq!(req.cookie("session"), Some("abc"));
/// ```
#[derive(Debug)]
pub struct Request {
    method: http::Method,
    uri: Uri,
    scheme: String,
    host: Option<String>,
    headers: HeaderMap,
    body: Bytes,
}

impl Request {
    /// Origin-form URIs (`/path?query`, what servers actually receive) carry
    /// no scheme or authority: the scheme defaults to `http` and the host
    /// comes from the `Host` header. Either way the host keeps its port.
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let scheme = parts.uri.scheme_str().unwrap_or("http").to_ascii_lowercase();
        let host = parts.uri.authority().map(|authority| match authority.port() {
            Some(port) => format!("{}:{}", authority.host(), port.as_str()),
            None => authority.host().to_owned(),
        });
        let host = host.or_else(|| {
            parts.headers.get(HOST)
                .and_then(|v| v.to_str().ok())
                .map(str::to_owned)
        });
        Self {
            method: parts.method,
            uri: parts.uri,
            scheme,
            host,
            headers: parts.headers,
            body,
        }
    }

    pub fn method(&self) -> &str { self.method.as_str() }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn scheme(&self) -> &str { &self.scheme }
    pub fn host(&self) -> Option<&str> { self.host.as_deref() }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn query(&self) -> Option<&str> { self.uri.query() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Path plus `?query` when a query is present, e.g. `/users?page=2`.
    pub fn path_and_query(&self) -> &str {
        self.uri.path_and_query().map_or("/", |pq| pq.as_str())
    }

    /// First value of a header. Names are case-insensitive; values that are
    /// not visible ASCII are skipped.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Decoded `name=value` pairs of the query string, in order.
    pub fn query_pairs(&self) -> impl Iterator<Item = (Cow<'_, str>, Cow<'_, str>)> {
        url::form_urlencoded::parse(self.query().unwrap_or("").as_bytes())
    }

    /// Every cookie across all `Cookie` headers, in order.
    pub fn cookies(&self) -> impl Iterator<Item = (&str, &str)> {
        self.headers.get_all(COOKIE).iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|v| v.split(';'))
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.trim(), value.trim().trim_matches('"')))
            })
    }

    /// Value of the first cookie named exactly `name`.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies().find(|(k, _)| *k == name).map(|(_, v)| v)
    }

    /// The `Referer` header as an absolute URL.
    ///
    /// `None` when the header is missing or is not an absolute URL.
    pub fn referer(&self) -> Option<Url> {
        let raw = self.header(REFERER.as_str())?;
        match Url::parse(raw) {
            Ok(url) => Some(url),
            Err(e) => {
                trace!(referer = raw, "ignoring unparseable referer: {e}");
                None
            }
        }
    }
}

impl<B: Into<Bytes>> From<http::Request<B>> for Request {
    fn from(req: http::Request<B>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body.into())
    }
}
