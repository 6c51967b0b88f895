//! Filter evaluation against stored documents.
//!
//! This module provides the `FilterEvaluator` that evaluates filter
//! expressions from the query IR against JSON documents.

use std::cmp::Ordering;
use std::collections::HashSet;

use murmur_proto::{FilterExpr, Value};
use serde_json::Value as Json;

use crate::handle::Document;

/// Extract all field names referenced in a filter expression.
pub fn extract_filter_fields(filter: &FilterExpr) -> HashSet<String> {
    let mut fields = HashSet::new();
    extract_filter_fields_inner(filter, &mut fields);
    fields
}

fn extract_filter_fields_inner(filter: &FilterExpr, fields: &mut HashSet<String>) {
    match filter {
        FilterExpr::And { exprs } | FilterExpr::Or { exprs } => {
            for expr in exprs {
                extract_filter_fields_inner(expr, fields);
            }
        }
        leaf => {
            if let Some(field) = leaf.field() {
                fields.insert(field.to_string());
            }
        }
    }
}

/// Look up a dot-separated path inside a document.
pub fn lookup<'a>(doc: &'a Document, path: &str) -> Option<&'a Json> {
    let mut segments = path.split('.');
    let mut current = doc.get(segments.next()?)?;
    for segment in segments {
        current = current.as_object()?.get(segment)?;
    }
    Some(current)
}

/// Evaluates filter expressions against documents.
pub struct FilterEvaluator;

impl FilterEvaluator {
    /// Evaluate a filter expression against a document.
    ///
    /// Returns `true` if the document matches.
    pub fn evaluate(filter: &FilterExpr, doc: &Document) -> bool {
        match filter {
            FilterExpr::Eq { field, value } => Self::field_equals(doc, field, value),
            FilterExpr::Ne { field, value } => !Self::field_equals(doc, field, value),
            FilterExpr::Lt { field, value } => {
                Self::compare_field(doc, field, value, Ordering::is_lt)
            }
            FilterExpr::Le { field, value } => {
                Self::compare_field(doc, field, value, Ordering::is_le)
            }
            FilterExpr::Gt { field, value } => {
                Self::compare_field(doc, field, value, Ordering::is_gt)
            }
            FilterExpr::Ge { field, value } => {
                Self::compare_field(doc, field, value, Ordering::is_ge)
            }
            FilterExpr::In { field, values } => {
                values.iter().any(|v| Self::field_equals(doc, field, v))
            }
            FilterExpr::NotIn { field, values } => {
                !values.iter().any(|v| Self::field_equals(doc, field, v))
            }
            FilterExpr::Contains { field, term } => {
                let needle = term.to_lowercase();
                match lookup(doc, field) {
                    Some(fv) => Self::any_element(fv, |v| match v {
                        Json::String(s) => s.to_lowercase().contains(&needle),
                        _ => false,
                    }),
                    None => false,
                }
            }
            FilterExpr::And { exprs } => exprs.iter().all(|e| Self::evaluate(e, doc)),
            FilterExpr::Or { exprs } => exprs.iter().any(|e| Self::evaluate(e, doc)),
        }
    }

    /// Equality with missing-field and array semantics.
    ///
    /// A missing field equals `null`; an array field equals a literal when
    /// any element does.
    fn field_equals(doc: &Document, field: &str, value: &Value) -> bool {
        match lookup(doc, field) {
            Some(fv) => Self::any_element(fv, |v| Self::values_equal(v, value)),
            None => value.is_null(),
        }
    }

    /// Ordered comparison. Missing fields and incomparable types never match.
    fn compare_field<F>(doc: &Document, field: &str, value: &Value, accept: F) -> bool
    where
        F: Fn(Ordering) -> bool,
    {
        match lookup(doc, field) {
            Some(fv) => Self::any_element(fv, |v| {
                Self::compare_values(v, value).map(&accept).unwrap_or(false)
            }),
            None => false,
        }
    }

    /// Apply `pred` to a scalar, or to each element of an array.
    fn any_element<F>(value: &Json, pred: F) -> bool
    where
        F: Fn(&Json) -> bool,
    {
        match value {
            Json::Array(items) => items.iter().any(&pred),
            other => pred(other),
        }
    }

    /// Check if a stored value equals a literal, casting string literals
    /// to the stored type.
    fn values_equal(stored: &Json, literal: &Value) -> bool {
        match (stored, literal) {
            (Json::Null, Value::Null) => true,
            (Json::Bool(b), lit) => lit.as_bool() == Some(*b),
            (Json::Number(n), lit) => match (n.as_f64(), lit.as_f64()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
            (Json::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }

    /// Compare a stored value with a literal, returning their ordering if
    /// comparable.
    fn compare_values(stored: &Json, literal: &Value) -> Option<Ordering> {
        match (stored, literal) {
            (Json::Number(n), lit) => n.as_f64()?.partial_cmp(&lit.as_f64()?),
            (Json::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
            (Json::Bool(a), lit) => Some(a.cmp(&lit.as_bool()?)),
            _ => None, // Incompatible types
        }
    }
}
