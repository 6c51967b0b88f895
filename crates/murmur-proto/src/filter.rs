//! Filter expression IR.

use serde::{Deserialize, Serialize};

use crate::value::Value;

/// Filter expression evaluated by the storage layer.
///
/// Leaves compare one document field (dot-separated path) against literals;
/// `And`/`Or` combine any number of sub-expressions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum FilterExpr {
    /// Field equals value.
    Eq { field: String, value: Value },
    /// Field not equals value.
    Ne { field: String, value: Value },
    /// Field less than value.
    Lt { field: String, value: Value },
    /// Field less than or equal to value.
    Le { field: String, value: Value },
    /// Field greater than value.
    Gt { field: String, value: Value },
    /// Field greater than or equal to value.
    Ge { field: String, value: Value },
    /// Field is in a set of values.
    In { field: String, values: Vec<Value> },
    /// Field is not in a set of values.
    NotIn { field: String, values: Vec<Value> },
    /// Field contains `term`, ignoring case.
    Contains { field: String, term: String },
    /// All conditions must be true.
    And { exprs: Vec<FilterExpr> },
    /// At least one condition must be true.
    Or { exprs: Vec<FilterExpr> },
}

impl FilterExpr {
    /// Create an equality filter.
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a not-equal filter.
    pub fn ne(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ne {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than filter.
    pub fn lt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Lt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a less-than-or-equal filter.
    pub fn le(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Le {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than filter.
    pub fn gt(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Gt {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create a greater-than-or-equal filter.
    pub fn ge(field: impl Into<String>, value: impl Into<Value>) -> Self {
        FilterExpr::Ge {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Create an IN filter.
    pub fn in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::In {
            field: field.into(),
            values,
        }
    }

    /// Create a NOT IN filter.
    pub fn not_in_values(field: impl Into<String>, values: Vec<Value>) -> Self {
        FilterExpr::NotIn {
            field: field.into(),
            values,
        }
    }

    /// Create a case-insensitive substring filter.
    pub fn contains(field: impl Into<String>, term: impl Into<String>) -> Self {
        FilterExpr::Contains {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Create an AND filter.
    pub fn and(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::And { exprs }
    }

    /// Create an OR filter.
    pub fn or(exprs: Vec<FilterExpr>) -> Self {
        FilterExpr::Or { exprs }
    }

    /// Combine with another expression under a logical AND.
    ///
    /// Nested `And` nodes are flattened so the result is a single `And`.
    pub fn and_with(self, other: FilterExpr) -> Self {
        let mut exprs = match self {
            FilterExpr::And { exprs } => exprs,
            expr => vec![expr],
        };
        match other {
            FilterExpr::And { exprs: rhs } => exprs.extend(rhs),
            expr => exprs.push(expr),
        }
        FilterExpr::And { exprs }
    }

    /// AND `expr` into an optional accumulator.
    pub fn merge(acc: Option<FilterExpr>, expr: FilterExpr) -> Option<FilterExpr> {
        Some(match acc {
            Some(existing) => existing.and_with(expr),
            None => expr,
        })
    }

    /// The field a leaf expression tests, `None` for combinators.
    pub fn field(&self) -> Option<&str> {
        match self {
            FilterExpr::Eq { field, .. }
            | FilterExpr::Ne { field, .. }
            | FilterExpr::Lt { field, .. }
            | FilterExpr::Le { field, .. }
            | FilterExpr::Gt { field, .. }
            | FilterExpr::Ge { field, .. }
            | FilterExpr::In { field, .. }
            | FilterExpr::NotIn { field, .. }
            | FilterExpr::Contains { field, .. } => Some(field),
            FilterExpr::And { .. } | FilterExpr::Or { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_with_flattens() {
        let expr = FilterExpr::eq("status", "active")
            .and_with(FilterExpr::gt("age", 18))
            .and_with(FilterExpr::and(vec![
                FilterExpr::ne("role", "admin"),
                FilterExpr::contains("name", "al"),
            ]));

        match expr {
            FilterExpr::And { exprs } => {
                assert_eq!(exprs.len(), 4);
                assert_eq!(exprs[0].field(), Some("status"));
                assert_eq!(exprs[3].field(), Some("name"));
            }
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_merge_into_empty() {
        let merged = FilterExpr::merge(None, FilterExpr::eq("a", 1));
        assert_eq!(merged, Some(FilterExpr::eq("a", 1)));

        let merged = FilterExpr::merge(merged, FilterExpr::eq("b", 2));
        assert_eq!(
            merged,
            Some(FilterExpr::and(vec![FilterExpr::eq("a", 1), FilterExpr::eq("b", 2)]))
        );
    }

    #[test]
    fn test_or_is_kept_as_single_node() {
        let search = FilterExpr::or(vec![
            FilterExpr::contains("name", "x"),
            FilterExpr::contains("email", "x"),
        ]);
        let expr = FilterExpr::eq("status", "active").and_with(search.clone());

        match expr {
            FilterExpr::And { exprs } => assert_eq!(exprs[1], search),
            other => panic!("expected And, got {other:?}"),
        }
    }

    #[test]
    fn test_json_shape() {
        let expr = FilterExpr::ge("age", 18);
        let json = serde_json::to_value(&expr).unwrap();
        assert_eq!(json, serde_json::json!({"op": "ge", "field": "age", "value": 18}));
    }
}
