//! Sort, projection and the resolved query descriptor.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::filter::FilterExpr;
use crate::pagination::PageWindow;

/// Field used when a request carries no `sort` parameter.
pub const DEFAULT_SORT_FIELD: &str = "createdAt";

/// Order specification for sorting results.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderSpec {
    /// Field to order by.
    pub field: String,
    /// Sort direction.
    pub direction: OrderDirection,
}

impl OrderSpec {
    /// Create an ascending order spec.
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Asc,
        }
    }

    /// Create a descending order spec.
    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            direction: OrderDirection::Desc,
        }
    }

    /// The order applied when the request does not ask for one:
    /// most recently created first.
    pub fn default_order() -> Vec<OrderSpec> {
        vec![OrderSpec::desc(DEFAULT_SORT_FIELD)]
    }

    /// Parse a comma-separated sort spec such as `"a,-b"`.
    ///
    /// A `-` prefix sorts descending, `+` (or nothing) ascending. Empty
    /// segments and names with whitespace are rejected.
    pub fn parse_list(spec: &str) -> Result<Vec<OrderSpec>> {
        let mut order = Vec::new();
        for segment in spec.split(',') {
            let segment = segment.trim();
            let (name, direction) = match segment.strip_prefix('-') {
                Some(rest) => (rest, OrderDirection::Desc),
                None => (segment.strip_prefix('+').unwrap_or(segment), OrderDirection::Asc),
            };
            validate_field_name(name, "sort")?;
            order.push(OrderSpec {
                field: name.to_string(),
                direction,
            });
        }
        Ok(order)
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderDirection {
    /// Ascending order.
    Asc,
    /// Descending order.
    Desc,
}

/// Restriction of which document fields are returned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "fields", rename_all = "lowercase")]
pub enum Projection {
    /// Return only these fields (plus `_id`).
    Include(Vec<String>),
    /// Return every field except these.
    Exclude(Vec<String>),
}

impl Projection {
    /// Parse a comma-separated field list such as `"name,email"` or
    /// `"-password,-__v"`. Include and exclude entries cannot be mixed.
    pub fn parse(spec: &str) -> Result<Projection> {
        let mut include = Vec::new();
        let mut exclude = Vec::new();
        for segment in spec.split(',') {
            let segment = segment.trim();
            match segment.strip_prefix('-') {
                Some(name) => {
                    validate_field_name(name, "fields")?;
                    exclude.push(name.to_string());
                }
                None => {
                    validate_field_name(segment, "fields")?;
                    include.push(segment.to_string());
                }
            }
        }

        match (include.is_empty(), exclude.is_empty()) {
            (false, true) => Ok(Projection::Include(include)),
            (true, false) => Ok(Projection::Exclude(exclude)),
            _ => Err(Error::invalid(
                "fields cannot mix included and excluded names",
            )),
        }
    }
}

fn validate_field_name(name: &str, param: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::invalid(format!("{param} contains an empty field name")));
    }
    if name.chars().any(char::is_whitespace) || name.starts_with(['-', '+']) {
        return Err(Error::invalid(format!("{param} has malformed field name '{name}'")));
    }
    Ok(())
}

/// Fully resolved query: what the builder hands to the storage layer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueryDescriptor {
    /// Accumulated filter (search and field predicates).
    pub filter: Option<FilterExpr>,
    /// Ordering specification; empty means storage order.
    pub order_by: Vec<OrderSpec>,
    /// Page window, if pagination was requested.
    pub window: Option<PageWindow>,
    /// Projection, if the request restricted fields.
    pub projection: Option<Projection>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_composite_sort() {
        let order = OrderSpec::parse_list("a,-b").unwrap();
        assert_eq!(order, vec![OrderSpec::asc("a"), OrderSpec::desc("b")]);

        let order = OrderSpec::parse_list(" +name , -createdAt ").unwrap();
        assert_eq!(order, vec![OrderSpec::asc("name"), OrderSpec::desc("createdAt")]);
    }

    #[test]
    fn test_parse_sort_rejects_malformed() {
        assert!(OrderSpec::parse_list("a,,b").is_err());
        assert!(OrderSpec::parse_list("-").is_err());
        assert!(OrderSpec::parse_list("first name").is_err());
        assert!(OrderSpec::parse_list("--a").is_err());
    }

    #[test]
    fn test_default_order() {
        assert_eq!(OrderSpec::default_order(), vec![OrderSpec::desc("createdAt")]);
    }

    #[test]
    fn test_parse_projection() {
        assert_eq!(
            Projection::parse("name,email").unwrap(),
            Projection::Include(vec!["name".into(), "email".into()])
        );
        assert_eq!(
            Projection::parse("-password").unwrap(),
            Projection::Exclude(vec!["password".into()])
        );
    }

    #[test]
    fn test_projection_rejects_mixed_and_empty() {
        let err = Projection::parse("name,-password").unwrap_err();
        assert!(err.to_string().contains("mix"));
        assert!(Projection::parse("name,").is_err());
    }
}
