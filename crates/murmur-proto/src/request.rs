//! Raw query parameters as decoded from a URL query string.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::error::{Error, Result};

/// Free-text search parameter.
pub const SEARCH_TERM: &str = "searchTerm";
/// Projection parameter.
pub const FIELDS: &str = "fields";
/// Sort parameter.
pub const SORT: &str = "sort";
/// Page number parameter.
pub const PAGE: &str = "page";
/// Page size parameter.
pub const LIMIT: &str = "limit";

/// Keys that control the query itself and never become field predicates.
pub const RESERVED_KEYS: [&str; 5] = [SEARCH_TERM, SORT, LIMIT, PAGE, FIELDS];

/// Returns true if `key` is one of [`RESERVED_KEYS`].
pub fn is_reserved(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// One decoded query parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryParam {
    /// `key=value`
    Single(String),
    /// `key=a&key=b` or `key[]=a&key[]=b`
    Multi(Vec<String>),
    /// `key[gte]=1&key[lt]=9`
    Operators(BTreeMap<String, String>),
}

impl QueryParam {
    /// The value when the parameter appeared exactly once.
    pub fn as_single(&self) -> Option<&str> {
        match self {
            QueryParam::Single(s) => Some(s),
            _ => None,
        }
    }
}

/// Comparison operator accepted in bracket syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Ne,
    Gt,
    Gte,
    Lt,
    Lte,
    In,
    Nin,
}

impl FilterOp {
    /// Parse an operator token. Unknown tokens are rejected.
    pub fn parse(field: &str, token: &str) -> Result<FilterOp> {
        match token {
            "eq" => Ok(FilterOp::Eq),
            "ne" => Ok(FilterOp::Ne),
            "gt" => Ok(FilterOp::Gt),
            "gte" => Ok(FilterOp::Gte),
            "lt" => Ok(FilterOp::Lt),
            "lte" => Ok(FilterOp::Lte),
            "in" => Ok(FilterOp::In),
            "nin" => Ok(FilterOp::Nin),
            other => Err(Error::invalid(format!(
                "unknown operator '{other}' on field '{field}'"
            ))),
        }
    }

    /// The token for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
            FilterOp::Ne => "ne",
            FilterOp::Gt => "gt",
            FilterOp::Gte => "gte",
            FilterOp::Lt => "lt",
            FilterOp::Lte => "lte",
            FilterOp::In => "in",
            FilterOp::Nin => "nin",
        }
    }
}

impl fmt::Display for FilterOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Untyped query parameters keyed by name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    params: BTreeMap<String, QueryParam>,
}

impl QueryRequest {
    /// Create an empty request.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a request from decoded `(key, value)` pairs in arrival order.
    ///
    /// Bracket keys (`age[gte]`) become operator maps, `tag[]` and repeated
    /// keys become lists. A key used both plainly and with operators, a
    /// repeated operator, or a malformed bracket is rejected.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut request = Self::new();
        for (key, value) in pairs {
            request.push(key.as_ref(), value.into())?;
        }
        Ok(request)
    }

    /// Add one decoded pair.
    pub fn push(&mut self, raw_key: &str, value: String) -> Result<()> {
        let (field, op) = split_bracket_key(raw_key)?;

        match op {
            None => self.push_plain(field, value),
            Some("") => self.push_list(field, value),
            Some(op) => self.push_operator(field, op, value),
        }
    }

    /// Builder-style insert of a plain `key=value`, replacing any prior value.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.insert(key.into(), QueryParam::Single(value.into()));
        self
    }

    fn push_plain(&mut self, field: &str, value: String) -> Result<()> {
        match self.params.get_mut(field) {
            None => {
                self.params.insert(field.to_string(), QueryParam::Single(value));
            }
            Some(QueryParam::Single(first)) => {
                let first = std::mem::take(first);
                self.params
                    .insert(field.to_string(), QueryParam::Multi(vec![first, value]));
            }
            Some(QueryParam::Multi(values)) => values.push(value),
            Some(QueryParam::Operators(_)) => return Err(mixed_forms(field)),
        }
        Ok(())
    }

    fn push_list(&mut self, field: &str, value: String) -> Result<()> {
        match self.params.get_mut(field) {
            None => {
                self.params
                    .insert(field.to_string(), QueryParam::Multi(vec![value]));
            }
            Some(QueryParam::Operators(_)) => return Err(mixed_forms(field)),
            Some(_) => return self.push_plain(field, value),
        }
        Ok(())
    }

    fn push_operator(&mut self, field: &str, op: &str, value: String) -> Result<()> {
        if is_reserved(field) {
            return Err(Error::invalid(format!(
                "'{field}' does not accept operators"
            )));
        }

        let ops = match self
            .params
            .entry(field.to_string())
            .or_insert_with(|| QueryParam::Operators(BTreeMap::new()))
        {
            QueryParam::Operators(ops) => ops,
            _ => return Err(mixed_forms(field)),
        };

        if ops.insert(op.to_string(), value).is_some() {
            return Err(Error::invalid(format!(
                "operator '{op}' repeated on field '{field}'"
            )));
        }
        Ok(())
    }

    /// Look up a parameter.
    pub fn get(&self, key: &str) -> Option<&QueryParam> {
        self.params.get(key)
    }

    /// Look up a single-valued parameter.
    ///
    /// A repeated reserved key (`page=1&page=2`) yields its last value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.params.get(key)? {
            QueryParam::Single(s) => Some(s),
            QueryParam::Multi(values) => values.last().map(String::as_str),
            QueryParam::Operators(_) => None,
        }
    }

    /// Parameters that are not reserved keys, in key order.
    pub fn filterable(&self) -> impl Iterator<Item = (&str, &QueryParam)> {
        self.params
            .iter()
            .filter(|(key, _)| !is_reserved(key))
            .map(|(key, param)| (key.as_str(), param))
    }

    /// Whether the request carries `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    /// Remove a parameter, returning it.
    pub fn remove(&mut self, key: &str) -> Option<QueryParam> {
        self.params.remove(key)
    }

    /// Number of distinct keys.
    pub fn len(&self) -> usize {
        self.params.len()
    }

    /// Whether there are no parameters.
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

fn mixed_forms(field: &str) -> Error {
    Error::invalid(format!(
        "field '{field}' mixes plain values and operators"
    ))
}

/// Split `name[op]` into `("name", Some("op"))`; plain keys return `None`.
fn split_bracket_key(raw: &str) -> Result<(&str, Option<&str>)> {
    let Some(open) = raw.find('[') else {
        if raw.contains(']') {
            return Err(Error::invalid(format!("malformed parameter '{raw}'")));
        }
        return Ok((raw, None));
    };

    let field = &raw[..open];
    let rest = &raw[open + 1..];
    let op = rest
        .strip_suffix(']')
        .filter(|op| !op.contains(['[', ']']))
        .ok_or_else(|| Error::invalid(format!("malformed parameter '{raw}'")))?;

    if field.is_empty() {
        return Err(Error::invalid(format!("parameter '{raw}' has no field name")));
    }
    Ok((field, Some(op)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_and_repeated_keys() {
        let request = QueryRequest::from_pairs([
            ("status", "active"),
            ("tag", "rust"),
            ("tag", "web"),
        ])
        .unwrap();

        assert_eq!(
            request.get("status"),
            Some(&QueryParam::Single("active".into()))
        );
        assert_eq!(
            request.get("tag"),
            Some(&QueryParam::Multi(vec!["rust".into(), "web".into()]))
        );
    }

    #[test]
    fn test_bracket_operators() {
        let request =
            QueryRequest::from_pairs([("age[gte]", "18"), ("age[lt]", "30")]).unwrap();

        match request.get("age") {
            Some(QueryParam::Operators(ops)) => {
                assert_eq!(ops.get("gte").map(String::as_str), Some("18"));
                assert_eq!(ops.get("lt").map(String::as_str), Some("30"));
            }
            other => panic!("expected operators, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_brackets_build_list() {
        let request = QueryRequest::from_pairs([("id[]", "a"), ("id[]", "b")]).unwrap();
        assert_eq!(
            request.get("id"),
            Some(&QueryParam::Multi(vec!["a".into(), "b".into()]))
        );
    }

    #[test]
    fn test_malformed_brackets_rejected() {
        assert!(QueryRequest::from_pairs([("age[gte", "1")]).is_err());
        assert!(QueryRequest::from_pairs([("age]", "1")]).is_err());
        assert!(QueryRequest::from_pairs([("[gte]", "1")]).is_err());
        assert!(QueryRequest::from_pairs([("a[b][c]", "1")]).is_err());
    }

    #[test]
    fn test_mixed_forms_rejected() {
        let err = QueryRequest::from_pairs([("age", "3"), ("age[gt]", "1")]).unwrap_err();
        assert!(err.to_string().contains("mixes"));

        assert!(QueryRequest::from_pairs([("age[gt]", "1"), ("age", "3")]).is_err());
        assert!(QueryRequest::from_pairs([("age[gt]", "1"), ("age[gt]", "2")]).is_err());
    }

    #[test]
    fn test_reserved_keys_are_not_filterable() {
        let request = QueryRequest::from_pairs([
            ("searchTerm", "x"),
            ("sort", "y"),
            ("page", "2"),
            ("limit", "5"),
            ("fields", "name"),
            ("status", "active"),
        ])
        .unwrap();

        let keys: Vec<&str> = request.filterable().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["status"]);
        assert_eq!(request.get_str("sort"), Some("y"));
    }

    #[test]
    fn test_reserved_keys_reject_operators() {
        assert!(QueryRequest::from_pairs([("page[gt]", "1")]).is_err());
    }

    #[test]
    fn test_repeated_reserved_key_uses_last() {
        let request = QueryRequest::from_pairs([("page", "1"), ("page", "3")]).unwrap();
        assert_eq!(request.get_str("page"), Some("3"));
    }

    #[test]
    fn test_filter_op_parse() {
        assert_eq!(FilterOp::parse("age", "gte").unwrap(), FilterOp::Gte);
        assert_eq!(FilterOp::Nin.to_string(), "nin");
        let err = FilterOp::parse("age", "bogus").unwrap_err();
        assert_eq!(
            err,
            Error::InvalidQuery("unknown operator 'bogus' on field 'age'".into())
        );
    }
}
