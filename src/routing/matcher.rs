//! Path matching logic.
//!
//! # Responsibilities
//! - Exact path match
//! - Raw prefix match (`starts_with`)
//! - Segment prefix match (`/cohort` matches `/cohort` and `/cohort/42`, not `/cohorts`)
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex to guarantee O(n) matching
//! - Query strings are never part of the matched path

use serde::Serialize;

use crate::config::schema::{MatchKind, PathMatchConfig};

/// A compiled path condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "path", rename_all = "snake_case")]
pub enum PathPattern {
    Exact(String),
    Prefix(String),
    Segment(String),
}

impl PathPattern {
    /// Returns true if the path satisfies this condition.
    pub fn matches(&self, path: &str) -> bool {
        match self {
            PathPattern::Exact(p) => path == p,
            PathPattern::Prefix(p) => path.starts_with(p.as_str()),
            PathPattern::Segment(p) => segment_prefix(path, p).is_some(),
        }
    }

    /// The literal path this pattern is built around.
    pub fn literal(&self) -> &str {
        match self {
            PathPattern::Exact(p) | PathPattern::Prefix(p) | PathPattern::Segment(p) => p,
        }
    }

    /// Portion of `path` after the matched literal, for prefix patterns.
    pub fn remainder<'a>(&self, path: &'a str) -> Option<&'a str> {
        match self {
            PathPattern::Exact(p) => (path == p).then_some(""),
            PathPattern::Prefix(p) => path.strip_prefix(p.as_str()),
            PathPattern::Segment(p) => segment_prefix(path, p),
        }
    }
}

impl From<&PathMatchConfig> for PathPattern {
    fn from(config: &PathMatchConfig) -> Self {
        let path = config.path.clone();
        match config.kind {
            MatchKind::Exact => PathPattern::Exact(path),
            MatchKind::Prefix => PathPattern::Prefix(path),
            MatchKind::Segment => PathPattern::Segment(path),
        }
    }
}

/// Returns the rest of `path` when `prefix` matches on a segment boundary.
pub fn segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    let prefix = prefix.trim_end_matches('/');
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() || rest.starts_with('/') {
        Some(rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exact_matcher() {
        let matcher = PathPattern::Exact("/favicon.ico".into());
        assert!(matcher.matches("/favicon.ico"));
        assert!(!matcher.matches("/favicon.ico/x"));
        assert!(!matcher.matches("/favicon"));
    }

    #[test]
    fn test_prefix_matcher() {
        let matcher = PathPattern::Prefix("/_next/static/".into());
        assert!(matcher.matches("/_next/static/chunks/app.js"));
        assert!(!matcher.matches("/_next/image"));
        assert_eq!(matcher.remainder("/_next/static/a.js"), Some("a.js"));
    }

    #[test]
    fn test_segment_matcher() {
        let matcher = PathPattern::Segment("/cohorts".into());
        assert!(matcher.matches("/cohorts"));
        assert!(matcher.matches("/cohorts/42"));
        assert!(!matcher.matches("/cohortsx"));
        assert!(!matcher.matches("/cohort"));
        assert_eq!(matcher.remainder("/cohorts/42/edit"), Some("/42/edit"));
    }

    #[test]
    fn test_segment_matcher_on_root_prefix() {
        // "/" trims to "", so every absolute path is under it.
        assert_eq!(segment_prefix("/anything", "/"), Some("/anything"));
        assert_eq!(segment_prefix("/tenant", "/tenant/"), Some(""));
    }
}
