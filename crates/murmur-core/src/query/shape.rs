//! Ordering and projection of result documents.

use std::cmp::Ordering;

use murmur_proto::{OrderDirection, OrderSpec, Projection};
use serde_json::Value as Json;

use super::filter::lookup;
use crate::handle::Document;

/// Field that every projection keeps.
pub const ID_FIELD: &str = "_id";

/// Rank of a JSON type in the cross-type sort order.
fn type_rank(value: Option<&Json>) -> u8 {
    match value {
        None | Some(Json::Null) => 0,
        Some(Json::Bool(_)) => 1,
        Some(Json::Number(_)) => 2,
        Some(Json::String(_)) => 3,
        Some(Json::Array(_)) => 4,
        Some(Json::Object(_)) => 5,
    }
}

/// Total order over optional JSON values.
///
/// Missing and null sort first, then booleans, numbers, strings, arrays and
/// objects.
pub fn compare_json(a: Option<&Json>, b: Option<&Json>) -> Ordering {
    match (a, b) {
        (Some(Json::Bool(x)), Some(Json::Bool(y))) => x.cmp(y),
        (Some(Json::Number(x)), Some(Json::Number(y))) => {
            let x = x.as_f64().unwrap_or(f64::NAN);
            let y = y.as_f64().unwrap_or(f64::NAN);
            x.total_cmp(&y)
        }
        (Some(Json::String(x)), Some(Json::String(y))) => x.cmp(y),
        (Some(Json::Array(x)), Some(Json::Array(y))) => {
            for (l, r) in x.iter().zip(y.iter()) {
                let ord = compare_json(Some(l), Some(r));
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            x.len().cmp(&y.len())
        }
        (Some(Json::Object(x)), Some(Json::Object(y))) => x.len().cmp(&y.len()),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

/// Compare two documents under a composite order.
pub fn compare_documents(a: &Document, b: &Document, order: &[OrderSpec]) -> Ordering {
    for spec in order {
        let ord = compare_json(lookup(a, &spec.field), lookup(b, &spec.field));
        let ord = match spec.direction {
            OrderDirection::Asc => ord,
            OrderDirection::Desc => ord.reverse(),
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }
    Ordering::Equal
}

/// Sort documents in place. The sort is stable, so documents that compare
/// equal keep their incoming (storage) order.
pub fn sort_documents(docs: &mut [Document], order: &[OrderSpec]) {
    if order.is_empty() {
        return;
    }
    docs.sort_by(|a, b| compare_documents(a, b, order));
}

/// Apply a projection to one document.
pub fn project(doc: Document, projection: &Projection) -> Document {
    match projection {
        Projection::Include(fields) => {
            let mut out = Document::new();
            if let Some(id) = doc.get(ID_FIELD) {
                out.insert(ID_FIELD.to_string(), id.clone());
            }
            for field in fields {
                if let Some(value) = lookup(&doc, field) {
                    insert_path(&mut out, field, value.clone());
                }
            }
            out
        }
        Projection::Exclude(fields) => {
            let mut out = doc;
            for field in fields {
                remove_path(&mut out, field);
            }
            out
        }
    }
}

fn insert_path(doc: &mut Document, path: &str, value: Json) {
    match path.split_once('.') {
        None => {
            doc.insert(path.to_string(), value);
        }
        Some((head, rest)) => {
            let entry = doc
                .entry(head.to_string())
                .or_insert_with(|| Json::Object(Document::new()));
            if let Json::Object(child) = entry {
                insert_path(child, rest, value);
            }
        }
    }
}

fn remove_path(doc: &mut Document, path: &str) {
    match path.split_once('.') {
        None => {
            doc.remove(path);
        }
        Some((head, rest)) => {
            if let Some(Json::Object(child)) = doc.get_mut(head) {
                remove_path(child, rest);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Json) -> Document {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_composite_sort() {
        let mut docs = vec![
            doc(json!({"a": 2, "b": 0})),
            doc(json!({"a": 1, "b": 1})),
            doc(json!({"a": 1, "b": 2})),
        ];
        sort_documents(&mut docs, &OrderSpec::parse_list("a,-b").unwrap());

        let pairs: Vec<(i64, i64)> = docs
            .iter()
            .map(|d| (d["a"].as_i64().unwrap(), d["b"].as_i64().unwrap()))
            .collect();
        assert_eq!(pairs, vec![(1, 2), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_sort_is_stable_on_ties() {
        let mut docs = vec![
            doc(json!({"k": 1, "seq": 0})),
            doc(json!({"k": 0, "seq": 1})),
            doc(json!({"k": 1, "seq": 2})),
            doc(json!({"k": 0, "seq": 3})),
        ];
        sort_documents(&mut docs, &[OrderSpec::desc("k")]);

        let seq: Vec<i64> = docs.iter().map(|d| d["seq"].as_i64().unwrap()).collect();
        assert_eq!(seq, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_missing_sorts_first_ascending() {
        let mut docs = vec![
            doc(json!({"n": "b"})),
            doc(json!({})),
            doc(json!({"n": 3})),
        ];
        sort_documents(&mut docs, &[OrderSpec::asc("n")]);

        assert!(docs[0].get("n").is_none());
        assert_eq!(docs[1]["n"], json!(3));
        assert_eq!(docs[2]["n"], json!("b"));
    }

    #[test]
    fn test_include_projection_keeps_id() {
        let d = doc(json!({
            "_id": "x",
            "name": "Al",
            "email": "a@b",
            "profile": {"city": "Oslo", "zip": "0150"}
        }));
        let out = project(
            d,
            &Projection::Include(vec!["name".into(), "profile.city".into(), "nope".into()]),
        );

        assert_eq!(
            Json::Object(out),
            json!({"_id": "x", "name": "Al", "profile": {"city": "Oslo"}})
        );
    }

    #[test]
    fn test_exclude_projection() {
        let d = doc(json!({
            "_id": "x",
            "name": "Al",
            "password": "h",
            "profile": {"city": "Oslo", "zip": "0150"}
        }));
        let out = project(
            d,
            &Projection::Exclude(vec!["password".into(), "profile.zip".into()]),
        );

        assert_eq!(
            Json::Object(out),
            json!({"_id": "x", "name": "Al", "profile": {"city": "Oslo"}})
        );
    }
}
