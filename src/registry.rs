//! The route registry.
//!
//! Build it once at startup, then share it read-only (behind an `Arc`)
//! across every request task. Registration takes `&mut self`; matching takes
//! `&self`, so the two phases cannot interleave.
//!
//! Dispatch is first-match-wins in registration order. Register specific
//! routes before general ones.

use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::Error;
use crate::request::Request;
use crate::route::Route;

/// Ordered collection of routes with unique ids and, by default, unique names.
#[derive(Debug, Default)]
pub struct RouteRegistry {
    routes: Vec<Route>,
    allow_duplicate_names: bool,
}

impl RouteRegistry {
    /// An empty registry that rejects duplicate route names.
    pub fn new() -> Self {
        Self::default()
    }

    /// An empty registry that accepts several routes with the same name.
    /// Ids stay unique regardless.
    pub fn allowing_duplicate_names() -> Self {
        Self { routes: Vec::new(), allow_duplicate_names: true }
    }

    pub fn allows_duplicate_names(&self) -> bool { self.allow_duplicate_names }

    /// Appends `route`, after checking its id and name against every route
    /// already registered.
    pub fn register(&mut self, route: Route) -> Result<(), Error> {
        if self.routes.iter().any(|r| r.id() == route.id()) {
            return Err(Error::DuplicateId(route.id()));
        }
        if !self.allow_duplicate_names && self.routes.iter().any(|r| r.name() == route.name()) {
            return Err(Error::DuplicateName(route.name().to_owned()));
        }

        debug!(
            id = %route.id(),
            name = route.name(),
            url = route.resolved_relative_url(),
            restrictions = route.restrictions().len(),
            "route registered",
        );
        self.routes.push(route);
        Ok(())
    }

    /// Chaining form of [`register`](Self::register).
    pub fn route(mut self, route: Route) -> Result<Self, Error> {
        self.register(route)?;
        Ok(self)
    }

    pub fn find_by_id(&self, id: Uuid) -> Option<&Route> {
        self.routes.iter().find(|r| r.id() == id)
    }

    /// The one route named `name`.
    ///
    /// Fails with [`Error::RouteNotFound`] when there is none and with
    /// [`Error::AmbiguousRoute`] when duplicates are allowed and there are
    /// several.
    pub fn find_by_name(&self, name: &str) -> Result<&Route, Error> {
        let mut named = self.routes_named(name);
        match (named.next(), named.next()) {
            (Some(route), None) => Ok(route),
            (None, _)           => Err(Error::RouteNotFound(name.to_owned())),
            (Some(_), Some(_))  => Err(Error::AmbiguousRoute(name.to_owned())),
        }
    }

    /// Every route named `name`, in registration order.
    pub fn routes_named<'a, 'n>(&'a self, name: &'n str) -> impl Iterator<Item = &'a Route> + use<'a, 'n> {
        self.routes.iter().filter(move |r| r.name() == name)
    }

    /// Every route, in registration order.
    pub fn routes(&self) -> &[Route] { &self.routes }
    pub fn len(&self) -> usize { self.routes.len() }
    pub fn is_empty(&self) -> bool { self.routes.is_empty() }

    /// The first route, in registration order, whose restrictions all match.
    pub async fn match_request(&self, request: &Request) -> MatchResult<'_> {
        for route in &self.routes {
            trace!(route = route.name(), "evaluating route");
            if route.matches_request(request).await {
                debug!(method = request.method(), path = request.path(), route = route.name(), "route matched");
                return MatchResult::Matched(route);
            }
        }
        debug!(method = request.method(), path = request.path(), "no route matched");
        MatchResult::NotMatched
    }
}

// ── MatchResult ───────────────────────────────────────────────────────────────

/// Outcome of [`RouteRegistry::match_request`].
#[derive(Clone, Copy, Debug)]
pub enum MatchResult<'a> {
    Matched(&'a Route),
    NotMatched,
}

/// Tag of a [`MatchResult`], without the route.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MatchResultType {
    RouteMatched,
    RouteNotMatched,
}

impl<'a> MatchResult<'a> {
    pub fn result_type(&self) -> MatchResultType {
        match self {
            Self::Matched(_) => MatchResultType::RouteMatched,
            Self::NotMatched => MatchResultType::RouteNotMatched,
        }
    }

    pub fn route(&self) -> Option<&'a Route> {
        match self {
            Self::Matched(route) => Some(*route),
            Self::NotMatched     => None,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, Self::Matched(_))
    }
}
