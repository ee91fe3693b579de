//! Query structures shared between the resolver pipeline and the database
//! collaborator: filters, ordering, and unique lookups.
//!
//! Filters form a small condition tree. Access-control filter fragments are
//! merged by AND-ing them with the caller's `where`, so a caller can narrow
//! but never widen the visible row set.

use crate::db::Item;
use crate::error::{Result, StrataError};
use crate::fields::FieldKind;
use crate::schema::List;
use serde_json::Value;
use std::cmp::Ordering;

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
    Cond {
        field: String,
        op: CondOp,
        value: Value,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CondOp {
    Equals,
    NotEquals,
    In,
    NotIn,
    Lt,
    Lte,
    Gt,
    Gte,
    Contains,
    StartsWith,
    EndsWith,
}

impl Filter {
    pub fn equals(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Filter::Cond {
            field: field.into(),
            op: CondOp::Equals,
            value: value.into(),
        }
    }

    /// AND-combines two filters. Used to merge access filter fragments into
    /// the caller-supplied `where`.
    pub fn and(self, other: Filter) -> Filter {
        match self {
            Filter::And(mut parts) => {
                parts.push(other);
                Filter::And(parts)
            }
            first => Filter::And(vec![first, other]),
        }
    }

    /// AND-combines an optional caller filter with an optional access
    /// fragment.
    pub fn merge(caller: Option<Filter>, fragment: Option<Filter>) -> Option<Filter> {
        match (caller, fragment) {
            (Some(a), Some(b)) => Some(a.and(b)),
            (Some(a), None) => Some(a),
            (None, Some(b)) => Some(b),
            (None, None) => None,
        }
    }

    /// Evaluates the filter against an item. This is what the in-memory
    /// database client uses; SQL-backed clients translate the tree instead.
    pub fn matches(&self, item: &Item) -> bool {
        match self {
            Filter::And(parts) => parts.iter().all(|f| f.matches(item)),
            Filter::Or(parts) => parts.iter().any(|f| f.matches(item)),
            Filter::Not(inner) => !inner.matches(item),
            Filter::Cond { field, op, value } => {
                let actual = item.get(field).unwrap_or(&Value::Null);
                cond_matches(actual, *op, value)
            }
        }
    }
}

fn cond_matches(actual: &Value, op: CondOp, expected: &Value) -> bool {
    match op {
        CondOp::Equals => actual == expected,
        CondOp::NotEquals => actual != expected,
        CondOp::In => expected
            .as_array()
            .is_some_and(|vs| vs.iter().any(|v| v == actual)),
        CondOp::NotIn => !expected
            .as_array()
            .is_some_and(|vs| vs.iter().any(|v| v == actual)),
        CondOp::Lt => compare_values(actual, expected) == Some(Ordering::Less),
        CondOp::Lte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Less | Ordering::Equal)
        ),
        CondOp::Gt => compare_values(actual, expected) == Some(Ordering::Greater),
        CondOp::Gte => matches!(
            compare_values(actual, expected),
            Some(Ordering::Greater | Ordering::Equal)
        ),
        CondOp::Contains => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.contains(e),
            _ => false,
        },
        CondOp::StartsWith => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.starts_with(e),
            _ => false,
        },
        CondOp::EndsWith => match (actual.as_str(), expected.as_str()) {
            (Some(a), Some(e)) => a.ends_with(e),
            _ => false,
        },
    }
}

/// Orders two JSON values. Numbers compare numerically, strings lexically
/// (RFC 3339 timestamps sort correctly this way). Mixed types do not compare.
pub fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64().partial_cmp(&y.as_f64()),
        (Value::String(x), Value::String(y)) => Some(x.cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        _ => None,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A unique lookup: `id` or any field configured `is_unique`.
#[derive(Debug, Clone, PartialEq)]
pub struct UniqueWhere {
    pub field: String,
    pub value: Value,
}

/// Arguments for a findMany-shaped database call.
#[derive(Debug, Clone, Default)]
pub struct QueryArgs {
    pub filter: Option<Filter>,
    pub order_by: Vec<OrderBy>,
    pub take: Option<usize>,
    pub skip: usize,
}

/// Parses a GraphQL `where` input object into a filter tree, validating
/// field names and filterability against the list.
pub fn parse_where(list: &List, input: &Value) -> Result<Filter> {
    let obj = input.as_object().ok_or_else(|| {
        StrataError::Validation(format!("{}: where must be an object", list.key))
    })?;

    let mut parts = Vec::new();
    for (key, value) in obj {
        match key.as_str() {
            "AND" | "OR" => {
                let children = value
                    .as_array()
                    .ok_or_else(|| {
                        StrataError::Validation(format!("{}: {} must be a list", list.key, key))
                    })?
                    .iter()
                    .map(|v| parse_where(list, v))
                    .collect::<Result<Vec<_>>>()?;
                if key == "AND" {
                    parts.push(Filter::And(children));
                } else {
                    parts.push(Filter::Or(children));
                }
            }
            "NOT" => {
                parts.push(Filter::Not(Box::new(parse_where(list, value)?)));
            }
            "id" => {
                parts.push(parse_field_conditions(&list.key, "id", value)?);
            }
            name => {
                let field = list.fields.get(name).ok_or_else(|| {
                    StrataError::Validation(format!(
                        "{}: unknown field '{}' in where",
                        list.key, name
                    ))
                })?;
                if !field.is_filterable {
                    return Err(StrataError::Validation(format!(
                        "{}: field '{}' is not filterable",
                        list.key, name
                    )));
                }
                parts.push(parse_field_conditions(&list.key, name, value)?);
            }
        }
    }

    Ok(match parts.len() {
        1 => parts.pop().unwrap(),
        _ => Filter::And(parts),
    })
}

fn parse_field_conditions(list_key: &str, field: &str, input: &Value) -> Result<Filter> {
    let obj = input.as_object().ok_or_else(|| {
        StrataError::Validation(format!(
            "{}: conditions for '{}' must be an object",
            list_key, field
        ))
    })?;

    let mut conds = Vec::new();
    for (op_name, value) in obj {
        let op = match op_name.as_str() {
            "equals" => CondOp::Equals,
            "not" => CondOp::NotEquals,
            "in" => CondOp::In,
            "notIn" => CondOp::NotIn,
            "lt" => CondOp::Lt,
            "lte" => CondOp::Lte,
            "gt" => CondOp::Gt,
            "gte" => CondOp::Gte,
            "contains" => CondOp::Contains,
            "startsWith" => CondOp::StartsWith,
            "endsWith" => CondOp::EndsWith,
            other => {
                return Err(StrataError::Validation(format!(
                    "{}: unknown filter operator '{}' on '{}'",
                    list_key, other, field
                )));
            }
        };
        conds.push(Filter::Cond {
            field: field.to_string(),
            op,
            value: value.clone(),
        });
    }

    Ok(match conds.len() {
        1 => conds.pop().unwrap(),
        _ => Filter::And(conds),
    })
}

/// Parses a `whereUnique` input: `id` or a unique field, exactly one key.
pub fn parse_unique_where(list: &List, input: &Value) -> Result<UniqueWhere> {
    let obj = input.as_object().ok_or_else(|| {
        StrataError::Validation(format!("{}: where must be an object", list.key))
    })?;
    if obj.len() != 1 {
        return Err(StrataError::Validation(format!(
            "{}: unique where must name exactly one field",
            list.key
        )));
    }
    let (name, value) = obj.iter().next().unwrap();
    if name != "id" {
        let field = list.fields.get(name).ok_or_else(|| {
            StrataError::Validation(format!(
                "{}: unknown field '{}' in unique where",
                list.key, name
            ))
        })?;
        if !field.is_unique {
            return Err(StrataError::Validation(format!(
                "{}: field '{}' is not unique",
                list.key, name
            )));
        }
    }
    Ok(UniqueWhere {
        field: name.clone(),
        value: value.clone(),
    })
}

/// Parses an orderBy chain: a list of single-key `{ field: asc|desc }`
/// objects, applied in order.
pub fn parse_order_by(list: &List, input: &Value) -> Result<Vec<OrderBy>> {
    let entries = match input {
        Value::Array(entries) => entries.clone(),
        Value::Object(_) => vec![input.clone()],
        _ => {
            return Err(StrataError::Validation(format!(
                "{}: orderBy must be a list of objects",
                list.key
            )));
        }
    };

    let mut order = Vec::new();
    for entry in &entries {
        let obj = entry.as_object().ok_or_else(|| {
            StrataError::Validation(format!("{}: orderBy entries must be objects", list.key))
        })?;
        if obj.len() != 1 {
            return Err(StrataError::Validation(format!(
                "{}: orderBy entries must name exactly one field",
                list.key
            )));
        }
        let (name, dir) = obj.iter().next().unwrap();
        if name != "id" {
            let field = list.fields.get(name).ok_or_else(|| {
                StrataError::Validation(format!(
                    "{}: unknown field '{}' in orderBy",
                    list.key, name
                ))
            })?;
            if !field.is_orderable {
                return Err(StrataError::Validation(format!(
                    "{}: field '{}' is not orderable",
                    list.key, name
                )));
            }
            // to-many relationships have no single column to order on
            if matches!(field.kind, FieldKind::Relationship { many: true, .. }) {
                return Err(StrataError::Validation(format!(
                    "{}: cannot order by to-many field '{}'",
                    list.key, name
                )));
            }
        }
        let direction = match dir.as_str() {
            Some("asc") => Direction::Asc,
            Some("desc") => Direction::Desc,
            _ => {
                return Err(StrataError::Validation(format!(
                    "{}: orderBy direction must be 'asc' or 'desc'",
                    list.key
                )));
            }
        };
        order.push(OrderBy {
            field: name.clone(),
            direction,
        });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn item(v: Value) -> Item {
        v.as_object().unwrap().clone()
    }

    #[test]
    fn test_cond_equals() {
        let f = Filter::equals("name", "Ada");
        assert!(f.matches(&item(json!({"name": "Ada"}))));
        assert!(!f.matches(&item(json!({"name": "Grace"}))));
        assert!(!f.matches(&item(json!({}))));
    }

    #[test]
    fn test_and_or_not() {
        let f = Filter::And(vec![
            Filter::equals("a", 1),
            Filter::Or(vec![Filter::equals("b", 2), Filter::equals("b", 3)]),
        ]);
        assert!(f.matches(&item(json!({"a": 1, "b": 3}))));
        assert!(!f.matches(&item(json!({"a": 1, "b": 4}))));

        let n = Filter::Not(Box::new(Filter::equals("a", 1)));
        assert!(n.matches(&item(json!({"a": 2}))));
    }

    #[test]
    fn test_string_operators() {
        let f = Filter::Cond {
            field: "title".to_string(),
            op: CondOp::Contains,
            value: json!("cms"),
        };
        assert!(f.matches(&item(json!({"title": "headless cms core"}))));
        assert!(!f.matches(&item(json!({"title": "other"}))));
    }

    #[test]
    fn test_numeric_comparisons() {
        let f = Filter::Cond {
            field: "views".to_string(),
            op: CondOp::Gte,
            value: json!(10),
        };
        assert!(f.matches(&item(json!({"views": 10}))));
        assert!(f.matches(&item(json!({"views": 11}))));
        assert!(!f.matches(&item(json!({"views": 9}))));
    }

    #[test]
    fn test_merge_is_and() {
        let caller = Filter::equals("a", 1);
        let fragment = Filter::equals("b", 2);
        let merged = Filter::merge(Some(caller), Some(fragment)).unwrap();
        assert!(merged.matches(&item(json!({"a": 1, "b": 2}))));
        assert!(!merged.matches(&item(json!({"a": 1, "b": 3}))));
    }
}
