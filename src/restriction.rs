//! Request restrictions.
//!
//! A restriction is an immutable predicate over one attribute of a request.
//! A [`Route`](crate::Route) matches only when every restriction attached to
//! it matches. Variants that hold a set (methods, fragments) match when any
//! member of the set matches.
//!
//! Restrictions are pure: a request they cannot evaluate (no `Referer`, an
//! unparseable one, a missing cookie) does not match. They never error at
//! match time. Construction is where configuration problems surface, as
//! [`Error::EmptyRestriction`] or [`Error::InvalidPattern`].

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::comparer::{Comparer, CompiledValue};
use crate::error::Error;
use crate::request::Request;

// ── Custom restrictions ───────────────────────────────────────────────────────

/// A collaborator-supplied restriction.
///
/// Use this for predicates that need to await something (a lookup, a feature
/// flag service) or that inspect parts of the request the built-in variants
/// don't cover.
#[async_trait]
pub trait RequestRestriction: Send + Sync + fmt::Debug {
    async fn matches_request(&self, request: &Request) -> bool;
}

// ── Restriction ───────────────────────────────────────────────────────────────

/// Any restriction a route can hold.
#[derive(Clone, Debug)]
pub enum Restriction {
    Method(MethodRestriction),
    UrlScheme(UrlSchemeRestriction),
    UrlFragment(UrlFragmentRestriction),
    UrlQueryString(UrlQueryStringRestriction),
    Cookie(CookieRestriction),
    RefererUrlFragment(RefererUrlFragmentRestriction),
    RefererUrlPathAndQuery(RefererUrlPathAndQueryRestriction),
    Custom(Arc<dyn RequestRestriction>),
}

impl Restriction {
    /// Wraps a collaborator predicate.
    pub fn custom(restriction: impl RequestRestriction + 'static) -> Self {
        Self::Custom(Arc::new(restriction))
    }

    pub async fn matches_request(&self, request: &Request) -> bool {
        match self {
            Self::Method(r)                 => r.matches_request(request),
            Self::UrlScheme(r)              => r.matches_request(request),
            Self::UrlFragment(r)            => r.matches_request(request),
            Self::UrlQueryString(r)         => r.matches_request(request),
            Self::Cookie(r)                 => r.matches_request(request),
            Self::RefererUrlFragment(r)     => r.matches_request(request),
            Self::RefererUrlPathAndQuery(r) => r.matches_request(request),
            Self::Custom(r)                 => r.matches_request(request).await,
        }
    }

    /// Short variant name, for logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Method(_)                 => "method",
            Self::UrlScheme(_)              => "url-scheme",
            Self::UrlFragment(_)            => "url-fragment",
            Self::UrlQueryString(_)         => "url-query-string",
            Self::Cookie(_)                 => "cookie",
            Self::RefererUrlFragment(_)     => "referer-url-fragment",
            Self::RefererUrlPathAndQuery(_) => "referer-url-path-and-query",
            Self::Custom(_)                 => "custom",
        }
    }
}

/// Custom restrictions compare by identity; everything else by value.
impl PartialEq for Restriction {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Method(a), Self::Method(b))                                 => a == b,
            (Self::UrlScheme(a), Self::UrlScheme(b))                           => a == b,
            (Self::UrlFragment(a), Self::UrlFragment(b))                       => a == b,
            (Self::UrlQueryString(a), Self::UrlQueryString(b))                 => a == b,
            (Self::Cookie(a), Self::Cookie(b))                                 => a == b,
            (Self::RefererUrlFragment(a), Self::RefererUrlFragment(b))         => a == b,
            (Self::RefererUrlPathAndQuery(a), Self::RefererUrlPathAndQuery(b)) => a == b,
            (Self::Custom(a), Self::Custom(b))                                 => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl Eq for Restriction {}

/// Typed access to one restriction variant, used by
/// [`Route::restrictions_of`](crate::Route::restrictions_of).
pub trait RestrictionKind: Sized + 'static {
    fn from_restriction(restriction: &Restriction) -> Option<&Self>;
}

macro_rules! restriction_kind {
    ($($variant:ident => $ty:ty),* $(,)?) => {$(
        impl RestrictionKind for $ty {
            fn from_restriction(restriction: &Restriction) -> Option<&Self> {
                match restriction {
                    Restriction::$variant(r) => Some(r),
                    _ => None,
                }
            }
        }

        impl From<$ty> for Restriction {
            fn from(r: $ty) -> Self { Restriction::$variant(r) }
        }
    )*};
}

restriction_kind! {
    Method                 => MethodRestriction,
    UrlScheme              => UrlSchemeRestriction,
    UrlFragment            => UrlFragmentRestriction,
    UrlQueryString         => UrlQueryStringRestriction,
    Cookie                 => CookieRestriction,
    RefererUrlFragment     => RefererUrlFragmentRestriction,
    RefererUrlPathAndQuery => RefererUrlPathAndQueryRestriction,
}

fn compile_all<I, S>(kind: &'static str, values: I, comparer: Comparer) -> Result<Vec<CompiledValue>, Error>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let compiled = values.into_iter()
        .map(|v| comparer.compile(v))
        .collect::<Result<Vec<_>, _>>()?;
    if compiled.is_empty() {
        return Err(Error::EmptyRestriction(kind));
    }
    Ok(compiled)
}

// ── Method ────────────────────────────────────────────────────────────────────

/// Matches when the request method is any of a set of tokens, ignoring ASCII
/// case.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MethodRestriction {
    // Uppercased, sorted, deduplicated: equality is set equality.
    methods: Vec<String>,
}

impl MethodRestriction {
    pub fn new<I, S>(methods: I) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut methods: Vec<String> = methods.into_iter()
            .map(|m| m.into().to_ascii_uppercase())
            .collect();
        methods.sort();
        methods.dedup();
        if methods.is_empty() {
            return Err(Error::EmptyRestriction("method"));
        }
        Ok(Self { methods })
    }

    pub fn methods(&self) -> &[String] { &self.methods }

    pub fn matches_request(&self, request: &Request) -> bool {
        self.methods.iter().any(|m| m.eq_ignore_ascii_case(request.method()))
    }
}

// ── URL scheme ────────────────────────────────────────────────────────────────

/// Matches the request URL scheme (`http`, `https`).
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UrlSchemeRestriction {
    scheme: CompiledValue,
}

impl UrlSchemeRestriction {
    pub fn new(scheme: impl Into<String>, comparer: Comparer) -> Result<Self, Error> {
        Ok(Self { scheme: comparer.compile(scheme)? })
    }

    pub fn scheme(&self) -> &str { self.scheme.expected() }
    pub fn comparer(&self) -> Comparer { self.scheme.comparer() }

    pub fn matches_request(&self, request: &Request) -> bool {
        self.scheme.matches(request.scheme())
    }
}

// ── URL fragment ──────────────────────────────────────────────────────────────

/// Matches the request path against any of a set of fragments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UrlFragmentRestriction {
    fragments: Vec<CompiledValue>,
    comparer: Comparer,
}

impl UrlFragmentRestriction {
    pub fn new<I, S>(fragments: I, comparer: Comparer) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = compile_all("url fragment", fragments, comparer)?;
        Ok(Self { fragments, comparer })
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(CompiledValue::expected)
    }

    pub fn comparer(&self) -> Comparer { self.comparer }

    pub fn matches_request(&self, request: &Request) -> bool {
        let path = request.path();
        self.fragments.iter().any(|f| f.matches(path))
    }
}

// ── Query string ──────────────────────────────────────────────────────────────

/// Matches when one query parameter matches both a field and a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct UrlQueryStringRestriction {
    field: CompiledValue,
    value: CompiledValue,
}

impl UrlQueryStringRestriction {
    pub fn new(
        field: impl Into<String>,
        field_comparer: Comparer,
        value: impl Into<String>,
        value_comparer: Comparer,
    ) -> Result<Self, Error> {
        Ok(Self {
            field: field_comparer.compile(field)?,
            value: value_comparer.compile(value)?,
        })
    }

    pub fn field(&self) -> &str { self.field.expected() }
    pub fn field_comparer(&self) -> Comparer { self.field.comparer() }
    pub fn value(&self) -> &str { self.value.expected() }
    pub fn value_comparer(&self) -> Comparer { self.value.comparer() }

    pub fn matches_request(&self, request: &Request) -> bool {
        request.query_pairs().any(|(k, v)| self.field.matches(&k) && self.value.matches(&v))
    }
}

// ── Cookie ────────────────────────────────────────────────────────────────────

/// Matches when one request cookie matches both a name and a value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CookieRestriction {
    name: CompiledValue,
    value: CompiledValue,
}

impl CookieRestriction {
    pub fn new(
        name: impl Into<String>,
        name_comparer: Comparer,
        value: impl Into<String>,
        value_comparer: Comparer,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name_comparer.compile(name)?,
            value: value_comparer.compile(value)?,
        })
    }

    pub fn name(&self) -> &str { self.name.expected() }
    pub fn name_comparer(&self) -> Comparer { self.name.comparer() }
    pub fn value(&self) -> &str { self.value.expected() }
    pub fn value_comparer(&self) -> Comparer { self.value.comparer() }

    pub fn matches_request(&self, request: &Request) -> bool {
        request.cookies().any(|(k, v)| self.name.matches(k) && self.value.matches(v))
    }
}

// ── Referer ───────────────────────────────────────────────────────────────────

/// Matches the path of the `Referer` URL against any of a set of fragments.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefererUrlFragmentRestriction {
    fragments: Vec<CompiledValue>,
    comparer: Comparer,
}

impl RefererUrlFragmentRestriction {
    pub fn new<I, S>(fragments: I, comparer: Comparer) -> Result<Self, Error>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let fragments = compile_all("referer url fragment", fragments, comparer)?;
        Ok(Self { fragments, comparer })
    }

    pub fn fragments(&self) -> impl Iterator<Item = &str> {
        self.fragments.iter().map(CompiledValue::expected)
    }

    pub fn comparer(&self) -> Comparer { self.comparer }

    pub fn matches_request(&self, request: &Request) -> bool {
        let Some(referer) = request.referer() else { return false };
        self.fragments.iter().any(|f| f.matches(referer.path()))
    }
}

/// Matches the full path and query of the `Referer` URL, e.g. `/search?q=x`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RefererUrlPathAndQueryRestriction {
    path_and_query: CompiledValue,
}

impl RefererUrlPathAndQueryRestriction {
    pub fn new(path_and_query: impl Into<String>, comparer: Comparer) -> Result<Self, Error> {
        Ok(Self { path_and_query: comparer.compile(path_and_query)? })
    }

    pub fn path_and_query(&self) -> &str { self.path_and_query.expected() }
    pub fn comparer(&self) -> Comparer { self.path_and_query.comparer() }

    pub fn matches_request(&self, request: &Request) -> bool {
        let Some(referer) = request.referer() else { return false };
        match referer.query() {
            Some(query) => self.path_and_query.matches(&format!("{}?{query}", referer.path())),
            None        => self.path_and_query.matches(referer.path()),
        }
    }
}
