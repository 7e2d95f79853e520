//! Unified error type.

use uuid::Uuid;

/// The error type returned by junction's fallible operations.
///
/// Matching never fails: a restriction that cannot evaluate a request simply
/// does not match. `Error` covers the three places things can go wrong:
/// building routes, looking them up, and the serving adapter's I/O.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    // ── Configuration ─────────────────────────────────────────────────────────
    #[error("{0} restriction needs at least one value")]
    EmptyRestriction(&'static str),

    #[error("invalid pattern `{pattern}`: {source}")]
    InvalidPattern {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("a route with id {0} is already registered")]
    DuplicateId(Uuid),

    #[error("a route named `{0}` is already registered")]
    DuplicateName(String),

    #[error("invalid socket address `{0}`")]
    InvalidAddress(String),

    // ── Lookup ────────────────────────────────────────────────────────────────
    #[error("route named `{0}` was not found")]
    RouteNotFound(String),

    #[error("more than one route exists with name `{0}`")]
    AmbiguousRoute(String),

    // ── Dispatch ──────────────────────────────────────────────────────────────
    #[error("route `{name}` has no response handler")]
    MissingHandler { name: String },

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}
