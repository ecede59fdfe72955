//! Route matching logic.
//!
//! # Responsibilities
//! - Match path prefixes on segment boundaries
//! - Compute the path remainder after a matched prefix
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - `/api/products` matches `/api/products` and `/api/products/42`, never `/api/productsX`
//! - A prefix ending in `/` matches everything below it
//! - No regex to guarantee O(n) matching

/// Matches the request path prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPrefixMatcher {
    prefix: String,
}

impl PathPrefixMatcher {
    /// Create a new path prefix matcher.
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Returns true if `path` lies under this prefix.
    pub fn matches_path(&self, path: &str) -> bool {
        self.remainder(path).is_some()
    }

    /// The part of `path` after the prefix, always starting with `/`.
    ///
    /// Returns `None` when the path does not match.
    pub fn remainder<'a>(&self, path: &'a str) -> Option<&'a str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if self.prefix.ends_with('/') {
            // The separator belongs to the prefix; hand it back to the remainder.
            return Some(&path[self.prefix.len() - 1..]);
        }
        if rest.is_empty() {
            Some("/")
        } else if rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }
}
