//! Ordered tenant path table.
//!
//! Maps an incoming application path to the tenant-relative path that is
//! appended after `/<prefix>/<subdomain>`. First matching rule wins; a path
//! no rule matches is kept as it is.

use serde::Serialize;

use crate::config::schema::{PathMatchConfig, RuleAction, RuleConfig};
use crate::routing::matcher::PathPattern;

/// A compiled path rule.
#[derive(Debug, Clone, Serialize)]
pub struct PathRule {
    pub name: String,
    pub pattern: PathPattern,
    pub action: RuleAction,
}

impl PathRule {
    /// Apply the rule, returning the mapped path if the rule matches.
    pub fn apply(&self, path: &str) -> Option<String> {
        let rest = self.pattern.remainder(path)?;
        let mapped = match &self.action {
            RuleAction::Rewrite { to } => to.clone(),
            RuleAction::ReplacePrefix { with } => format!("{}{}", with.trim_end_matches('/'), rest),
            RuleAction::Keep => path.to_string(),
        };
        Some(mapped)
    }
}

impl From<&RuleConfig> for PathRule {
    fn from(config: &RuleConfig) -> Self {
        let pattern = PathPattern::from(&PathMatchConfig::new(config.kind, config.path.clone()));
        Self {
            name: config.name.clone(),
            pattern,
            action: config.action.clone(),
        }
    }
}

/// Result of running a path through the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MappedPath {
    pub path: String,
    /// Name of the rule that matched, `None` for the fallback.
    pub rule: Option<String>,
}

/// Immutable, ordered list of path rules.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct RuleTable {
    rules: Vec<PathRule>,
}

impl RuleTable {
    pub fn from_config(configs: &[RuleConfig]) -> Self {
        Self {
            rules: configs.iter().map(PathRule::from).collect(),
        }
    }

    pub fn map(&self, path: &str) -> MappedPath {
        for rule in &self.rules {
            if let Some(mapped) = rule.apply(path) {
                return MappedPath {
                    path: mapped,
                    rule: Some(rule.name.clone()),
                };
            }
        }

        MappedPath {
            path: path.to_string(),
            rule: None,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &PathRule> {
        self.rules.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::TenancyConfig;

    fn table() -> RuleTable {
        RuleTable::from_config(&TenancyConfig::default().rules)
    }

    #[test]
    fn test_default_table() {
        let table = table();
        let cases = [
            ("/", "/login", Some("root")),
            ("/login", "/login", Some("login")),
            ("/dashboard", "/dashboard", Some("dashboard")),
            ("/cohorts", "/cohort", Some("cohorts")),
            ("/cohorts/42", "/cohort/42", Some("cohorts")),
            ("/cohort/42", "/cohort/42", Some("cohort")),
            ("/assessment/7/results", "/assessment/7/results", Some("assessment")),
            ("/unknown/path", "/unknown/path", None),
            ("/cohortsx", "/cohortsx", None),
        ];

        for (input, expected, rule) in cases {
            let mapped = table.map(input);
            assert_eq!(mapped.path, expected, "mapping {input}");
            assert_eq!(mapped.rule.as_deref(), rule, "rule for {input}");
        }
    }

    #[test]
    fn test_first_match_wins() {
        let configs = vec![
            RuleConfig {
                name: "first".into(),
                kind: Default::default(),
                path: "/reports".into(),
                action: RuleAction::Rewrite { to: "/a".into() },
            },
            RuleConfig {
                name: "second".into(),
                kind: Default::default(),
                path: "/reports".into(),
                action: RuleAction::Rewrite { to: "/b".into() },
            },
        ];
        let mapped = RuleTable::from_config(&configs).map("/reports/1");
        assert_eq!(mapped.path, "/a");
        assert_eq!(mapped.rule.as_deref(), Some("first"));
    }
}
