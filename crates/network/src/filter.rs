//! Structured list filters.
//!
//! Filters are built from `(field, operator, value)` predicates and rendered
//! into the provider's `eq` filter syntax with values quoted, so names
//! containing spaces, quotes or other special characters cannot change the
//! meaning of the expression. All predicates are ANDed.
//!
//! The list API does not allow `=` and `eq` in the same expression, so exact
//! equality is rendered as an anchored, escaped regular expression.

use std::fmt;

use regex::Regex;
use serde::Serialize;

/// Comparison applied by a predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    /// Exact string equality.
    Equal,
    /// RE2 regular expression matching the whole field.
    Regexp,
}

/// A single `field <op> value` predicate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub field: String,
    pub op: Operator,
    pub value: String,
}

/// A conjunction of predicates. The empty filter matches everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    predicates: Vec<Predicate>,
}

impl Filter {
    /// A filter matching every resource.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Filter on exact equality.
    #[must_use]
    pub fn eq(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::none().and_eq(field, value)
    }

    /// Filter on a regular expression.
    #[must_use]
    pub fn regexp(field: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self::none().and_regexp(field, pattern)
    }

    /// Add an exact equality predicate.
    #[must_use]
    pub fn and_eq(self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.and(field.into(), Operator::Equal, value.into())
    }

    /// Add a regular expression predicate.
    #[must_use]
    pub fn and_regexp(self, field: impl Into<String>, pattern: impl Into<String>) -> Self {
        self.and(field.into(), Operator::Regexp, pattern.into())
    }

    fn and(mut self, field: String, op: Operator, value: String) -> Self {
        self.predicates.push(Predicate { field, op, value });
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }

    #[must_use]
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Evaluate the filter against a resource's JSON representation.
    ///
    /// Field names are the provider's (camelCase) names. A missing field
    /// never matches; an invalid pattern never matches.
    #[must_use]
    pub fn matches<R: Serialize>(&self, resource: &R) -> bool {
        let Ok(value) = serde_json::to_value(resource) else {
            return false;
        };

        self.predicates.iter().all(|p| {
            let field = match value.get(&p.field) {
                Some(serde_json::Value::String(s)) => s.clone(),
                Some(serde_json::Value::Null) | None => return false,
                Some(other) => other.to_string(),
            };
            match p.op {
                Operator::Equal => field == p.value,
                Operator::Regexp => Regex::new(&format!("^(?:{})$", p.value))
                    .is_ok_and(|re| re.is_match(&field)),
            }
        })
    }
}

fn quote(value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

impl fmt::Display for Filter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, p) in self.predicates.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            let pattern = match p.op {
                Operator::Equal => format!("^{}$", regex::escape(&p.value)),
                Operator::Regexp => p.value.clone(),
            };
            write!(f, "({} eq {})", p.field, quote(&pattern))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_render_combined_filter() {
        let filter = Filter::regexp("description", "k8s-node-route").and_eq("name", "my_route");
        let rendered = filter.to_string();
        assert_eq!(rendered, r#"(description eq "k8s-node-route") (name eq "^my_route$")"#);
        assert!(!rendered.contains(" = "));
    }

    #[test]
    fn test_render_equal_escapes_regex_metacharacters() {
        let filter = Filter::eq("name", "node.1");
        assert_eq!(filter.to_string(), r#"(name eq "^node\\.1$")"#);
        assert!(Filter::eq("name", "node.1").matches(&json!({"name": "node.1"})));
        assert!(!Filter::eq("name", "node.1").matches(&json!({"name": "nodeX1"})));
    }

    #[test]
    fn test_render_escapes_quotes() {
        let filter = Filter::eq("name", r#"evil" OR name = "x"#);
        assert_eq!(filter.to_string(), r#"(name eq "^evil\" OR name = \"x$")"#);
    }

    #[test]
    fn test_empty_filter_renders_and_matches_everything() {
        assert_eq!(Filter::none().to_string(), "");
        assert!(Filter::none().matches(&json!({"name": "anything"})));
    }

    #[test]
    fn test_matches_regexp_is_anchored() {
        let filter = Filter::regexp("description", "k8s-node-route");
        assert!(filter.matches(&json!({"description": "k8s-node-route"})));
        assert!(!filter.matches(&json!({"description": "not-k8s-node-route"})));
        assert!(!filter.matches(&json!({"name": "no-description"})));
    }

    #[test]
    fn test_matches_all_predicates() {
        let filter = Filter::eq("name", "a").and_regexp("network", ".*/my-network");
        assert!(filter.matches(&json!({"name": "a", "network": "projects/p/global/networks/my-network"})));
        assert!(!filter.matches(&json!({"name": "b", "network": "projects/p/global/networks/my-network"})));
    }
}
