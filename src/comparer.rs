//! String comparison strategies used by restrictions.
//!
//! A [`Comparer`] answers one question: does the value pulled from a request
//! match the value a route expects? Two axes, four variants:
//!
//! | | plain | pattern |
//! |---|---|---|
//! | **case-sensitive** | [`CaseSensitivePlain`](Comparer::CaseSensitivePlain) | [`CaseSensitiveRegex`](Comparer::CaseSensitiveRegex) |
//! | **case-insensitive** | [`CaseInsensitivePlain`](Comparer::CaseInsensitivePlain) | [`CaseInsensitiveRegex`](Comparer::CaseInsensitiveRegex) |
//!
//! Patterns are used exactly as supplied. `"users"` matches `/api/users/42`;
//! write `"^/users$"` when you mean the whole string.

use std::fmt;

use regex::{Regex, RegexBuilder};
use tracing::warn;

use crate::error::Error;

/// A string-equality strategy.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Comparer {
    CaseSensitivePlain,
    CaseInsensitivePlain,
    CaseSensitiveRegex,
    CaseInsensitiveRegex,
}

impl Comparer {
    /// Compares `actual` against `expected` under this strategy.
    ///
    /// Pattern variants compile `expected` on every call. Restrictions avoid
    /// that by holding a [`CompiledValue`]; this method is for ad-hoc checks.
    /// An invalid pattern never matches.
    pub fn matches(self, expected: &str, actual: &str) -> bool {
        match self {
            Self::CaseSensitivePlain   => expected == actual,
            Self::CaseInsensitivePlain => eq_ignore_case(expected, actual),
            Self::CaseSensitiveRegex | Self::CaseInsensitiveRegex => {
                match self.build_regex(expected) {
                    Ok(re) => re.is_match(actual),
                    Err(e) => {
                        warn!(pattern = expected, "invalid comparer pattern: {e}");
                        false
                    }
                }
            }
        }
    }

    /// Binds `expected` to this strategy, compiling it up front when the
    /// strategy is a pattern.
    pub fn compile(self, expected: impl Into<String>) -> Result<CompiledValue, Error> {
        let expected = expected.into();
        let regex = if self.is_pattern() {
            let re = self.build_regex(&expected).map_err(|source| Error::InvalidPattern {
                pattern: expected.clone(),
                source,
            })?;
            Some(re)
        } else {
            None
        };
        Ok(CompiledValue { expected, comparer: self, regex })
    }

    pub fn is_pattern(self) -> bool {
        matches!(self, Self::CaseSensitiveRegex | Self::CaseInsensitiveRegex)
    }

    pub fn is_case_sensitive(self) -> bool {
        matches!(self, Self::CaseSensitivePlain | Self::CaseSensitiveRegex)
    }

    fn build_regex(self, pattern: &str) -> Result<Regex, regex::Error> {
        RegexBuilder::new(pattern)
            .case_insensitive(!self.is_case_sensitive())
            .build()
    }
}

fn eq_ignore_case(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    a.to_lowercase() == b.to_lowercase()
}

// ── CompiledValue ─────────────────────────────────────────────────────────────

/// An expected value bound to the [`Comparer`] that checks it.
///
/// Equality looks at the expected string and the comparer only; the compiled
/// regex is derived from those two and never compared.
#[derive(Clone)]
pub struct CompiledValue {
    expected: String,
    comparer: Comparer,
    regex: Option<Regex>,
}

impl CompiledValue {
    pub fn expected(&self) -> &str { &self.expected }
    pub fn comparer(&self) -> Comparer { self.comparer }

    pub fn matches(&self, actual: &str) -> bool {
        match &self.regex {
            Some(re) => re.is_match(actual),
            None     => self.comparer.matches(&self.expected, actual),
        }
    }
}

impl PartialEq for CompiledValue {
    fn eq(&self, other: &Self) -> bool {
        self.comparer == other.comparer && self.expected == other.expected
    }
}

impl Eq for CompiledValue {}

impl fmt::Debug for CompiledValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}({:?})", self.comparer, self.expected)
    }
}
